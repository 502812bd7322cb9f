use std::{collections::BTreeMap, sync::Arc};

use serde::Deserialize;

use crate::{
    change_graph::error::{ChangeGraphError, configuration_error},
    registry::{PartId, PartRegistry},
    state::{StateTag, StateView},
    taxonomy::Change,
    types::Interaction,
};

/// What a production sees when deciding on one binding.
pub struct ProductionContext<'a> {
    pub registry: &'a PartRegistry,
    pub states: &'a StateView,
    pub change: &'a Change,
}

impl ProductionContext<'_> {
    pub fn state_of(&self, part: PartId) -> Option<&StateTag> {
        self.states.get(part).map(|condition| &condition.state)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartBinding {
    pub masculine: PartId,
    pub feminine: PartId,
}

/// Edge behavior: yields an interaction for a binding or declines.
pub trait Production: Send + Sync {
    fn produce(&self, context: &ProductionContext<'_>, binding: &PartBinding)
    -> Option<Interaction>;
}

pub type ProductionFactory =
    Arc<dyn Fn(&serde_json::Value) -> Result<Arc<dyn Production>, ChangeGraphError> + Send + Sync>;

struct Always;

impl Production for Always {
    fn produce(
        &self,
        context: &ProductionContext<'_>,
        binding: &PartBinding,
    ) -> Option<Interaction> {
        Some(Interaction::new(
            context.change.name.clone(),
            binding.masculine,
            binding.feminine,
        ))
    }
}

#[derive(Debug, Default, Deserialize)]
struct RequiresState {
    #[serde(default)]
    masculine: Vec<StateTag>,
    #[serde(default)]
    feminine: Vec<StateTag>,
}

impl RequiresState {
    fn admits(allowed: &[StateTag], state: Option<&StateTag>) -> bool {
        allowed.is_empty() || state.is_some_and(|state| allowed.contains(state))
    }
}

impl Production for RequiresState {
    fn produce(
        &self,
        context: &ProductionContext<'_>,
        binding: &PartBinding,
    ) -> Option<Interaction> {
        if !Self::admits(&self.masculine, context.state_of(binding.masculine))
            || !Self::admits(&self.feminine, context.state_of(binding.feminine))
        {
            return None;
        }
        Some(Interaction::new(
            context.change.name.clone(),
            binding.masculine,
            binding.feminine,
        ))
    }
}

/// Productions addressable by name from instrument wiring.
#[derive(Clone)]
pub struct ProductionTable {
    factories: BTreeMap<String, ProductionFactory>,
}

impl Default for ProductionTable {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ProductionTable {
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut table = Self::empty();
        table.register(
            "always",
            Arc::new(|_params: &serde_json::Value| Ok(Arc::new(Always) as Arc<dyn Production>)),
        );
        table.register(
            "requires_state",
            Arc::new(|params: &serde_json::Value| {
                let production: RequiresState = if params.is_null() {
                    RequiresState::default()
                } else {
                    serde_json::from_value(params.clone()).map_err(|err| {
                        configuration_error(format!("invalid requires_state params: {}", err))
                    })?
                };
                Ok(Arc::new(production) as Arc<dyn Production>)
            }),
        );
        table
    }

    pub fn register(&mut self, name: &str, factory: ProductionFactory) -> Option<ProductionFactory> {
        self.factories.insert(name.to_string(), factory)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn instantiate(
        &self,
        name: &str,
        params: &serde_json::Value,
    ) -> Result<Arc<dyn Production>, ChangeGraphError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| configuration_error(format!("unknown production '{}'", name)))?;
        factory(params)
    }
}
