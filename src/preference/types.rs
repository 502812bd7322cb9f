use serde::{Deserialize, Serialize};

use crate::{
    registry::PartRegistry,
    state::StateView,
    types::{InstanceIndex, Instruction},
};

/// Recursion depth a preference belongs to, coarsest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Score,
    Phrase,
    Note,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceOp {
    /// Drops a candidate outright.
    Admit,
    /// Weighted contribution to a candidate's rank.
    Score,
    /// Retroactive score over a completed phrase.
    Review,
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceSpec {
    pub name: String,
    pub kind: String,
    #[serde(default = "default_scope")]
    pub scope: Scope,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub params: serde_json::Value,
}

fn default_scope() -> Scope {
    Scope::Note
}

impl PreferenceSpec {
    pub fn new(name: &str, kind: &str, scope: Scope) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            scope,
            weight: default_weight(),
            params: serde_json::Value::Null,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = params;
        self
    }
}

/// Bundle of prospective edges: one candidate instruction with the states it
/// leaves and the states it produces.
#[derive(Clone, Copy)]
pub struct Connective<'a> {
    pub registry: &'a PartRegistry,
    pub instance: InstanceIndex,
    pub instruction: &'a Instruction,
    pub before: &'a StateView,
    pub after: &'a StateView,
}

/// Anything the stack can rank.
pub trait AsConnective {
    fn connective(&self) -> Connective<'_>;
}

/// Completed phrase handed to review preferences, in score order.
#[derive(Clone, Copy)]
pub struct PhrasePath<'a> {
    pub registry: &'a PartRegistry,
    pub instructions: &'a [Instruction],
}
