use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::registry::PartId;

/// Global position of an instance in the score, starting at 0.
pub type InstanceIndex = usize;
/// Score time.
pub type Ticks = u64;

/// A change instantiated against one masculine and one feminine part.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Interaction {
    pub change: String,
    pub masculine: PartId,
    pub feminine: PartId,
    /// Score element this interaction answers.
    #[serde(default)]
    pub element: Option<String>,
    /// Fallback changes folded in when the parts settled.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallbacks: Vec<String>,
}

impl Interaction {
    pub fn new(change: impl Into<String>, masculine: PartId, feminine: PartId) -> Self {
        Self {
            change: change.into(),
            masculine,
            feminine,
            element: None,
            fallbacks: Vec::new(),
        }
    }

    pub fn parts(&self) -> [PartId; 2] {
        [self.masculine, self.feminine]
    }
}

/// Interactions chosen to satisfy one instance.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Instruction {
    pub instance: InstanceIndex,
    pub interactions: Vec<Interaction>,
}

impl Instruction {
    pub fn new(instance: InstanceIndex, interactions: Vec<Interaction>) -> Self {
        Self {
            instance,
            interactions,
        }
    }

    pub fn parts(&self) -> BTreeSet<PartId> {
        self.interactions
            .iter()
            .flat_map(Interaction::parts)
            .collect()
    }

    pub fn changes(&self) -> impl Iterator<Item = &str> {
        self.interactions
            .iter()
            .map(|interaction| interaction.change.as_str())
    }
}
