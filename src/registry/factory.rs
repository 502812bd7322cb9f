use std::{collections::BTreeMap, sync::Arc};

use crate::registry::{
    error::RegistryError,
    types::{Part, PartId, PartKind, PartSignature, ParamType, ParamValue},
};

/// Everything a factory needs to materialize one part.
#[derive(Debug, Clone)]
pub struct PartSeed<'a> {
    pub id: PartId,
    pub kind: &'a PartKind,
    pub concrete_kind: &'a PartKind,
    pub signature_index: usize,
    pub signature: &'a PartSignature,
    pub values: &'a [ParamValue],
    pub instrument: &'a str,
}

pub type PartFactory = Arc<dyn Fn(&PartSeed<'_>) -> Result<Part, RegistryError> + Send + Sync>;

pub fn default_part(seed: &PartSeed<'_>) -> Part {
    Part {
        id: seed.id,
        kind: seed.kind.clone(),
        concrete_kind: seed.concrete_kind.clone(),
        signature: seed.signature_index,
        values: seed.values.to_vec(),
        instrument: seed.instrument.to_string(),
        attributes: BTreeMap::new(),
    }
}

/// Constructor table keyed by (concrete kind, parameter-type tuple).
#[derive(Clone, Default)]
pub struct FactoryTable {
    factories: BTreeMap<(PartKind, Vec<ParamType>), PartFactory>,
}

impl FactoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        kind: impl Into<PartKind>,
        param_types: Vec<ParamType>,
        factory: PartFactory,
    ) -> Option<PartFactory> {
        self.factories.insert((kind.into(), param_types), factory)
    }

    pub fn build(&self, seed: &PartSeed<'_>) -> Result<Part, RegistryError> {
        let key = (seed.concrete_kind.clone(), seed.signature.param_types.clone());
        match self.factories.get(&key) {
            Some(factory) => factory(seed),
            None => Ok(default_part(seed)),
        }
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
