use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use crate::registry::{
    error::{RegistryError, ambiguous_result, configuration_error, internal_error},
    factory::{FactoryTable, PartFactory, PartSeed},
    key::KeySpace,
    kinds::KindTable,
    query::PartQuery,
    types::{KindEntry, ParamType, ParamValue, Part, PartId, PartKind, PartSignature, SignatureSpec},
};

const INT_RANGE_ESTIMATE: u64 = 8;
const SYMBOL_RANGE_ESTIMATE: u64 = 4;

struct SignatureSlot {
    signature: PartSignature,
    keys: KeySpace,
    by_key: BTreeMap<u64, Vec<PartId>>,
    /// Tuples whose ordinals exceeded the range estimate.
    overflow: BTreeMap<Vec<ParamValue>, PartId>,
}

impl SignatureSlot {
    fn new(signature: PartSignature) -> Self {
        let keys = KeySpace::new(signature.ranges.clone());
        Self {
            signature,
            keys,
            by_key: BTreeMap::new(),
            overflow: BTreeMap::new(),
        }
    }
}

/// Parameterized factory/lookup store for the parts of one instrument.
///
/// Identity is (concrete kind, signature, parameter tuple). Lookups replay the
/// mixed-radix key but always confirm the actual tuple, so a range estimate
/// that proves too small only costs a secondary-map lookup.
pub struct PartRegistry {
    instrument: String,
    kinds: KindTable,
    substitutions: BTreeMap<PartKind, PartKind>,
    slots: BTreeMap<PartKind, Vec<SignatureSlot>>,
    factories: FactoryTable,
    parts: Vec<Part>,
    frozen: bool,
}

impl fmt::Debug for PartRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartRegistry")
            .field("instrument", &self.instrument)
            .field("kinds", &self.kinds.len())
            .field("parts", &self.parts.len())
            .field("frozen", &self.frozen)
            .finish()
    }
}

impl PartRegistry {
    pub fn new(instrument: impl Into<String>, kinds: KindTable) -> Self {
        Self {
            instrument: instrument.into(),
            kinds,
            substitutions: BTreeMap::new(),
            slots: BTreeMap::new(),
            factories: FactoryTable::new(),
            parts: Vec::new(),
            frozen: false,
        }
    }

    pub fn with_kinds(
        instrument: impl Into<String>,
        entries: impl IntoIterator<Item = KindEntry>,
    ) -> Result<Self, RegistryError> {
        let mut kinds = KindTable::new();
        for entry in entries {
            kinds.declare(entry)?;
        }
        Ok(Self::new(instrument, kinds))
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn kinds(&self) -> &KindTable {
        &self.kinds
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Ends bootstrap; the registry is append-only until here and read-only after.
    pub fn freeze(&mut self) {
        self.frozen = true;
        tracing::debug!(
            target: "registry",
            instrument = %self.instrument,
            parts = self.parts.len(),
            "registry_frozen"
        );
    }

    pub fn substitute(
        &mut self,
        abstract_kind: impl Into<PartKind>,
        concrete_kind: impl Into<PartKind>,
    ) -> Result<(), RegistryError> {
        let abstract_kind = abstract_kind.into();
        let concrete_kind = concrete_kind.into();
        self.ensure_mutable()?;
        self.kinds.require(&abstract_kind)?;
        self.kinds.require(&concrete_kind)?;
        if !self.kinds.is_kind_of(&concrete_kind, &abstract_kind) {
            return Err(configuration_error(format!(
                "substitute '{}' is not a kind of '{}'",
                concrete_kind, abstract_kind
            )));
        }
        if abstract_kind == concrete_kind {
            return Err(configuration_error(format!(
                "kind '{}' cannot substitute itself",
                abstract_kind
            )));
        }
        self.substitutions.insert(abstract_kind, concrete_kind);
        Ok(())
    }

    pub fn register_factory(
        &mut self,
        kind: impl Into<PartKind>,
        param_types: Vec<ParamType>,
        factory: PartFactory,
    ) -> Result<(), RegistryError> {
        self.ensure_mutable()?;
        let kind = kind.into();
        self.kinds.require(&kind)?;
        if self.factories.register(kind.clone(), param_types, factory).is_some() {
            return Err(configuration_error(format!(
                "factory for '{}' registered twice with the same signature",
                kind
            )));
        }
        Ok(())
    }

    /// Resolves an abstract kind to the concrete kind this instrument builds.
    pub fn resolve_concrete_kind(&self, kind: &PartKind) -> Result<PartKind, RegistryError> {
        let mut current = kind.clone();
        let mut visited = BTreeSet::new();
        while let Some(next) = self.substitutions.get(&current) {
            if !visited.insert(current.clone()) {
                return Err(configuration_error(format!(
                    "kind substitution cycle through '{}'",
                    current
                )));
            }
            current = next.clone();
        }
        Ok(current)
    }

    pub fn create_part(
        &mut self,
        kind: impl Into<PartKind>,
        signature: Option<SignatureSpec>,
        values: Vec<ParamValue>,
    ) -> Result<PartId, RegistryError> {
        let kind = kind.into();
        self.ensure_mutable()?;
        let concrete = self.resolve_concrete_kind(&kind)?;
        let cardinality = self.kinds.require(&concrete)?.cardinality;

        let slot_index = self.select_slot(&concrete, signature.as_ref(), &values)?;
        let parts = &self.parts;
        let slot = self
            .slots
            .get_mut(&concrete)
            .and_then(|slots| slots.get_mut(slot_index))
            .ok_or_else(|| internal_error(format!("signature slot missing for '{}'", concrete)))?;
        check_values(&slot.signature, &values)?;

        let ordinals = slot.keys.intern(&values);
        let key = slot.keys.encode(&ordinals);
        let existing = match key {
            Some(key) => slot.by_key.get(&key).and_then(|bucket| {
                bucket
                    .iter()
                    .copied()
                    .find(|id| parts.get(id.index()).is_some_and(|part| part.values == values))
            }),
            None => slot.overflow.get(&values).copied(),
        };
        if let Some(id) = existing {
            return Ok(id);
        }

        if let Some(limit) = cardinality {
            let current = self
                .parts
                .iter()
                .filter(|part| part.concrete_kind == concrete)
                .count();
            if current >= limit {
                return Err(configuration_error(format!(
                    "kind '{}' exceeds declared cardinality {}",
                    concrete, limit
                )));
            }
        }

        let id = PartId(
            u32::try_from(self.parts.len())
                .map_err(|_| internal_error("part arena exhausted"))?,
        );
        let slot = self.slot(&concrete, slot_index)?;
        let seed = PartSeed {
            id,
            kind: &kind,
            concrete_kind: &concrete,
            signature_index: slot_index,
            signature: &slot.signature,
            values: &values,
            instrument: &self.instrument,
        };
        let part = self.factories.build(&seed)?;
        if part.id != id || part.values != values || part.concrete_kind != concrete {
            return Err(configuration_error(format!(
                "factory for '{}' altered part identity",
                concrete
            )));
        }

        tracing::trace!(
            target: "registry",
            part_id = %id,
            kind = %kind,
            concrete_kind = %concrete,
            key = ?key,
            "part_created"
        );
        self.parts.push(part);

        let slot = self.slot_mut(&concrete, slot_index)?;
        match key {
            Some(key) => slot.by_key.entry(key).or_default().push(id),
            None => {
                slot.overflow.insert(values, id);
            }
        }
        Ok(id)
    }

    pub fn part(&self, id: PartId) -> Option<&Part> {
        self.parts.get(id.index())
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn signatures(&self, kind: &PartKind) -> Vec<&PartSignature> {
        self.slots
            .get(kind)
            .map(|slots| slots.iter().map(|slot| &slot.signature).collect())
            .unwrap_or_default()
    }

    /// Parts whose concrete kind is `kind` (after substitution) or one of its
    /// descendants, in creation order.
    pub fn parts_of_kind(&self, kind: &PartKind) -> Vec<&Part> {
        let resolved = self.resolve_concrete_kind(kind).unwrap_or_else(|_| kind.clone());
        self.parts
            .iter()
            .filter(|part| {
                self.kinds.is_kind_of(&part.concrete_kind, kind)
                    || self.kinds.is_kind_of(&part.concrete_kind, &resolved)
            })
            .collect()
    }

    /// Unique lookup; more than one match is an ambiguity error.
    pub fn find_part(
        &self,
        kind: &PartKind,
        query: &PartQuery,
    ) -> Result<Option<&Part>, RegistryError> {
        let matches = self.find_parts(kind, query)?;
        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.into_iter().next()),
            count => Err(ambiguous_result(format!(
                "{} parts of kind '{}' match a uniqueness-required lookup",
                count, kind
            ))),
        }
    }

    pub fn find_parts(
        &self,
        kind: &PartKind,
        query: &PartQuery,
    ) -> Result<Vec<&Part>, RegistryError> {
        let concrete = self.resolve_concrete_kind(kind)?;
        let Some(slots) = self.slots.get(&concrete) else {
            return Ok(Vec::new());
        };

        if query.is_exact()
            && let Some(values) = query.values.as_ref()
        {
            let mut found = Vec::new();
            for slot in slots {
                if let Some(signature) = query.signature.as_ref()
                    && signature != &slot.signature.param_types
                {
                    continue;
                }
                if !types_match(&slot.signature, values) {
                    continue;
                }
                if let Some(id) = self.lookup_in_slot(slot, values) {
                    found.push(&self.parts[id.index()]);
                }
            }
            return Ok(found);
        }

        Ok(self
            .parts
            .iter()
            .filter(|part| part.concrete_kind == concrete)
            .filter(|part| {
                slots
                    .get(part.signature)
                    .is_some_and(|slot| query.accepts(part, &slot.signature.param_types))
            })
            .collect())
    }

    pub fn find_parts_sorted_by<F>(
        &self,
        kind: &PartKind,
        query: &PartQuery,
        mut compare: F,
    ) -> Result<Vec<&Part>, RegistryError>
    where
        F: FnMut(&Part, &Part) -> Ordering,
    {
        let mut parts = self.find_parts(kind, query)?;
        parts.sort_by(|lhs, rhs| compare(lhs, rhs));
        Ok(parts)
    }

    pub fn find<'a>(&'a self, kind: impl Into<PartKind>) -> PartFinder<'a> {
        PartFinder {
            registry: self,
            kind: kind.into(),
            query: PartQuery::any(),
        }
    }

    fn lookup_in_slot(&self, slot: &SignatureSlot, values: &[ParamValue]) -> Option<PartId> {
        let ordinals = slot.keys.lookup(values)?;
        match slot.keys.encode(&ordinals) {
            Some(key) => slot.by_key.get(&key)?.iter().copied().find(|id| {
                self.parts
                    .get(id.index())
                    .is_some_and(|part| part.values == values)
            }),
            None => slot.overflow.get(values).copied(),
        }
    }

    fn select_slot(
        &mut self,
        concrete: &PartKind,
        signature: Option<&SignatureSpec>,
        values: &[ParamValue],
    ) -> Result<usize, RegistryError> {
        let value_types: Vec<ParamType> = values.iter().map(ParamValue::param_type).collect();
        let slots = self.slots.entry(concrete.clone()).or_default();

        if let Some(spec) = signature {
            validate_spec(concrete, spec)?;
            if let Some(index) = slots
                .iter()
                .position(|slot| slot.signature.param_types == spec.param_types)
            {
                return Ok(index);
            }
            slots.push(SignatureSlot::new(PartSignature {
                kind: concrete.clone(),
                param_types: spec.param_types.clone(),
                ranges: spec.ranges.clone(),
            }));
            tracing::debug!(
                target: "registry",
                kind = %concrete,
                param_types = ?spec.param_types,
                ranges = ?spec.ranges,
                "signature_registered"
            );
            return Ok(slots.len() - 1);
        }

        match slots.len() {
            0 => {
                let ranges = values.iter().map(estimate_range).collect::<Vec<_>>();
                slots.push(SignatureSlot::new(PartSignature {
                    kind: concrete.clone(),
                    param_types: value_types,
                    ranges,
                }));
                tracing::debug!(
                    target: "registry",
                    kind = %concrete,
                    "signature_inferred"
                );
                Ok(0)
            }
            1 => Ok(0),
            _ => {
                let candidates: Vec<usize> = slots
                    .iter()
                    .enumerate()
                    .filter(|(_, slot)| slot.signature.param_types == value_types)
                    .map(|(index, _)| index)
                    .collect();
                match candidates.as_slice() {
                    [index] => Ok(*index),
                    _ => Err(configuration_error(format!(
                        "kind '{}' has {} constructors and none was selected",
                        concrete,
                        slots.len()
                    ))),
                }
            }
        }
    }

    fn slot(&self, kind: &PartKind, index: usize) -> Result<&SignatureSlot, RegistryError> {
        self.slots
            .get(kind)
            .and_then(|slots| slots.get(index))
            .ok_or_else(|| internal_error(format!("signature slot missing for '{}'", kind)))
    }

    fn slot_mut(
        &mut self,
        kind: &PartKind,
        index: usize,
    ) -> Result<&mut SignatureSlot, RegistryError> {
        self.slots
            .get_mut(kind)
            .and_then(|slots| slots.get_mut(index))
            .ok_or_else(|| internal_error(format!("signature slot missing for '{}'", kind)))
    }

    fn ensure_mutable(&self) -> Result<(), RegistryError> {
        if self.frozen {
            return Err(configuration_error(format!(
                "registry of '{}' is frozen after bootstrap",
                self.instrument
            )));
        }
        Ok(())
    }
}

/// Fluent front-end over [`PartQuery`].
pub struct PartFinder<'a> {
    registry: &'a PartRegistry,
    kind: PartKind,
    query: PartQuery,
}

impl<'a> PartFinder<'a> {
    pub fn with_values<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        self.query.values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_signature(mut self, param_types: Vec<ParamType>) -> Self {
        self.query = self.query.with_signature(param_types);
        self
    }

    pub fn at(mut self, index: usize, matcher: crate::registry::query::ParamMatcher) -> Self {
        self.query = self.query.at(index, matcher);
        self
    }

    pub fn one(&self) -> Result<Option<&'a Part>, RegistryError> {
        self.registry.find_part(&self.kind, &self.query)
    }

    pub fn all(&self) -> Result<Vec<&'a Part>, RegistryError> {
        self.registry.find_parts(&self.kind, &self.query)
    }

    pub fn sorted_by<F>(&self, compare: F) -> Result<Vec<&'a Part>, RegistryError>
    where
        F: FnMut(&Part, &Part) -> Ordering,
    {
        self.registry
            .find_parts_sorted_by(&self.kind, &self.query, compare)
    }
}

fn validate_spec(kind: &PartKind, spec: &SignatureSpec) -> Result<(), RegistryError> {
    if spec.param_types.len() != spec.ranges.len() {
        return Err(configuration_error(format!(
            "signature of '{}' declares {} parameter types but {} ranges",
            kind,
            spec.param_types.len(),
            spec.ranges.len()
        )));
    }
    if spec.ranges.contains(&0) {
        return Err(configuration_error(format!(
            "signature of '{}' declares an empty range",
            kind
        )));
    }
    Ok(())
}

fn check_values(signature: &PartSignature, values: &[ParamValue]) -> Result<(), RegistryError> {
    if values.len() != signature.ranges.len() {
        return Err(configuration_error(format!(
            "kind '{}' expects {} parameters, got {}",
            signature.kind,
            signature.ranges.len(),
            values.len()
        )));
    }
    if !types_match(signature, values) {
        return Err(configuration_error(format!(
            "parameter types for '{}' do not match signature {:?}",
            signature.kind, signature.param_types
        )));
    }
    Ok(())
}

fn types_match(signature: &PartSignature, values: &[ParamValue]) -> bool {
    values.len() == signature.param_types.len()
        && values
            .iter()
            .zip(&signature.param_types)
            .all(|(value, expected)| value.param_type() == *expected)
}

fn estimate_range(value: &ParamValue) -> u64 {
    match value {
        ParamValue::Bool(_) => 2,
        ParamValue::Int(number) => u64::try_from(*number)
            .map(|ordinal| ordinal.saturating_add(1).max(INT_RANGE_ESTIMATE))
            .unwrap_or(INT_RANGE_ESTIMATE),
        ParamValue::Symbol(_) => SYMBOL_RANGE_ESTIMATE,
    }
}
