use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use crate::{
    registry::{KindTable, PartKind},
    state::{
        error::{StateError, configuration_error},
        machine::StateMachine,
        types::{InteractionKind, StateTag},
    },
};

/// State machines of one instrument, bound to part kinds.
#[derive(Debug, Clone, Default)]
pub struct StateMachineSet {
    machines: BTreeMap<String, Arc<StateMachine>>,
    bindings: BTreeMap<PartKind, String>,
    starts: BTreeMap<PartKind, BTreeSet<StateTag>>,
}

impl StateMachineSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, machine: StateMachine) -> Result<(), StateError> {
        if self.machines.contains_key(machine.name()) {
            return Err(configuration_error(format!(
                "state machine '{}' registered twice",
                machine.name()
            )));
        }
        self.machines
            .insert(machine.name().to_string(), Arc::new(machine));
        Ok(())
    }

    pub fn bind(&mut self, kind: PartKind, machine: &str) -> Result<(), StateError> {
        if !self.machines.contains_key(machine) {
            return Err(configuration_error(format!(
                "part kind '{}' bound to unknown state machine '{}'",
                kind, machine
            )));
        }
        self.bindings.insert(kind, machine.to_string());
        Ok(())
    }

    /// Records a state some part of `kind` starts in, so totality checks
    /// walk from it as well as from the machine's initial state.
    pub fn add_start(&mut self, kind: PartKind, state: StateTag) {
        self.starts.entry(kind).or_default().insert(state);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<StateMachine>> {
        self.machines.get(name)
    }

    /// Machine bound to `kind` or to its nearest ancestor.
    pub fn machine_for(&self, kinds: &KindTable, kind: &PartKind) -> Option<&Arc<StateMachine>> {
        if let Some(name) = self.bindings.get(kind) {
            return self.machines.get(name);
        }
        kinds
            .lineage(kind)
            .find_map(|ancestor| self.bindings.get(ancestor))
            .and_then(|name| self.machines.get(name))
    }

    pub fn require(
        &self,
        kinds: &KindTable,
        kind: &PartKind,
    ) -> Result<&Arc<StateMachine>, StateError> {
        self.machine_for(kinds, kind).ok_or_else(|| {
            configuration_error(format!("part kind '{}' has no state machine", kind))
        })
    }

    pub fn initial_state(&self, kinds: &KindTable, kind: &PartKind) -> Result<StateTag, StateError> {
        self.require(kinds, kind)
            .map(|machine| machine.initial().clone())
    }

    /// Checks that `applied` is total over the states reachable for `kind`,
    /// starting from the machine's initial state and every recorded start.
    pub fn verify_totality(
        &self,
        kinds: &KindTable,
        kind: &PartKind,
        applied: &BTreeSet<InteractionKind>,
    ) -> Result<BTreeSet<StateTag>, StateError> {
        let machine = self.require(kinds, kind)?;
        let starts = self.starts.get(kind).into_iter().flatten();
        machine.verify_totality_from(starts, applied).map_err(|err| {
            configuration_error(format!("part kind '{}': {}", kind, err.message))
        })
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }
}
