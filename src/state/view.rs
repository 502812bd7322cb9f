use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use crate::{registry::PartId, state::types::PartCondition};

/// Copy-on-write view of part conditions.
///
/// Forks share the base; writes land in a private overlay until the view is
/// collapsed with `into_states`.
#[derive(Debug, Clone, Default)]
pub struct StateView {
    base: Arc<BTreeMap<PartId, PartCondition>>,
    overlay: BTreeMap<PartId, PartCondition>,
}

impl StateView {
    pub fn new(states: BTreeMap<PartId, PartCondition>) -> Self {
        Self {
            base: Arc::new(states),
            overlay: BTreeMap::new(),
        }
    }

    /// New view whose base is this view's current content.
    pub fn fork(&self) -> Self {
        if self.overlay.is_empty() {
            return Self {
                base: Arc::clone(&self.base),
                overlay: BTreeMap::new(),
            };
        }
        Self::new(self.to_states())
    }

    pub fn get(&self, part: PartId) -> Option<&PartCondition> {
        self.overlay.get(&part).or_else(|| self.base.get(&part))
    }

    pub fn set(&mut self, part: PartId, condition: PartCondition) {
        if self.base.get(&part) == Some(&condition) {
            self.overlay.remove(&part);
        } else {
            self.overlay.insert(part, condition);
        }
    }

    /// Parts whose condition differs from the base.
    pub fn touched(&self) -> BTreeSet<PartId> {
        self.overlay.keys().copied().collect()
    }

    pub fn is_touched(&self) -> bool {
        !self.overlay.is_empty()
    }

    pub fn to_states(&self) -> BTreeMap<PartId, PartCondition> {
        let mut states = (*self.base).clone();
        states.extend(
            self.overlay
                .iter()
                .map(|(part, condition)| (*part, condition.clone())),
        );
        states
    }

    pub fn into_states(self) -> BTreeMap<PartId, PartCondition> {
        let Self { base, overlay } = self;
        let mut states = Arc::try_unwrap(base).unwrap_or_else(|shared| (*shared).clone());
        states.extend(overlay);
        states
    }
}
