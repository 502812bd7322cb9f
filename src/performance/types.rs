use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::{
    registry::PartId,
    state::PartCondition,
    types::{InstanceIndex, Instruction, Ticks},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(pub usize);

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "snapshot#{}", self.0)
    }
}

/// Aggregate part conditions at one instance. `instance: None` is the rest
/// position before the first instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub instance: Option<InstanceIndex>,
    pub start: Ticks,
    pub states: BTreeMap<PartId, PartCondition>,
}

impl Snapshot {
    pub fn new(
        instance: Option<InstanceIndex>,
        start: Ticks,
        states: BTreeMap<PartId, PartCondition>,
    ) -> Self {
        Self {
            instance,
            start,
            states,
        }
    }

    pub fn condition(&self, part: PartId) -> Option<&PartCondition> {
        self.states.get(&part)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceEdge {
    pub from: SnapshotId,
    pub to: SnapshotId,
    pub instruction: Instruction,
    #[serde(default)]
    pub score: f64,
}
