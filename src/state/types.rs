use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateTag(String);

impl StateTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StateTag {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for StateTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Interactions are named after the change that produced them.
pub type InteractionKind = String;

/// Composite condition of one part: its state tag plus the last two changes
/// applied to it, which the change graph needs to pick admissible edges.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartCondition {
    pub state: StateTag,
    #[serde(default)]
    pub last_change: Option<String>,
    #[serde(default)]
    pub previous_change: Option<String>,
}

impl PartCondition {
    pub fn at_rest(state: StateTag) -> Self {
        Self {
            state,
            last_change: None,
            previous_change: None,
        }
    }

    pub fn after(&self, change: &str, state: StateTag) -> Self {
        Self {
            state,
            last_change: Some(change.to_string()),
            previous_change: self.last_change.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub next: StateTag,
    /// Interaction applied instantly after this one, e.g. a hammer-on
    /// settling into a plain press.
    #[serde(default)]
    pub fallback: Option<InteractionKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionSpec {
    pub from: StateTag,
    pub on: InteractionKind,
    pub to: StateTag,
    #[serde(default)]
    pub fallback: Option<InteractionKind>,
}

impl TransitionSpec {
    pub fn new(from: &str, on: &str, to: &str) -> Self {
        Self {
            from: StateTag::new(from),
            on: on.to_string(),
            to: StateTag::new(to),
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: &str) -> Self {
        self.fallback = Some(fallback.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMachineSpec {
    pub name: String,
    pub initial: StateTag,
    pub transitions: Vec<TransitionSpec>,
}

/// Result of applying an interaction plus any fallbacks it triggers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settled {
    pub state: StateTag,
    pub applied: Vec<InteractionKind>,
}
