use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use crate::{
    preference::{
        error::{PreferenceError, configuration_error},
        types::{Connective, PhrasePath, PreferenceOp, PreferenceSpec},
    },
    registry::{ParamValue, PartKind},
};

pub type AdmitFn = Arc<dyn Fn(&PreferenceSpec, &Connective<'_>) -> bool + Send + Sync>;
pub type ScoreFn = Arc<dyn Fn(&PreferenceSpec, &Connective<'_>) -> f64 + Send + Sync>;
pub type ReviewFn = Arc<dyn Fn(&PreferenceSpec, &PhrasePath<'_>) -> f64 + Send + Sync>;

#[derive(Clone)]
pub enum Behavior {
    Admit(AdmitFn),
    Score(ScoreFn),
    Review(ReviewFn),
}

impl Behavior {
    pub fn op(&self) -> PreferenceOp {
        match self {
            Self::Admit(_) => PreferenceOp::Admit,
            Self::Score(_) => PreferenceOp::Score,
            Self::Review(_) => PreferenceOp::Review,
        }
    }
}

/// Function table keyed by (preference kind, operation).
#[derive(Clone, Default)]
pub struct PreferenceTable {
    behaviors: BTreeMap<(String, PreferenceOp), Behavior>,
}

impl PreferenceTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut table = Self::empty();
        table.register("max_interactions", Behavior::Admit(Arc::new(max_interactions)));
        table.register("fewest_parts", Behavior::Score(Arc::new(fewest_parts)));
        table.register("prefer_part", Behavior::Score(Arc::new(prefer_part)));
        table.register(
            "avoid_state_change",
            Behavior::Score(Arc::new(avoid_state_change)),
        );
        table.register(
            "consistent_binding",
            Behavior::Review(Arc::new(consistent_binding)),
        );
        table
    }

    pub fn register(&mut self, kind: &str, behavior: Behavior) -> Option<Behavior> {
        self.behaviors
            .insert((kind.to_string(), behavior.op()), behavior)
    }

    pub fn get(&self, kind: &str, op: PreferenceOp) -> Option<&Behavior> {
        self.behaviors.get(&(kind.to_string(), op))
    }

    pub fn knows(&self, kind: &str) -> bool {
        self.behaviors
            .keys()
            .any(|(registered, _)| registered == kind)
    }

    pub fn require(&self, spec: &PreferenceSpec) -> Result<(), PreferenceError> {
        if !self.knows(&spec.kind) {
            return Err(configuration_error(format!(
                "preference '{}' has unknown kind '{}'",
                spec.name, spec.kind
            )));
        }
        if !spec.weight.is_finite() {
            return Err(configuration_error(format!(
                "preference '{}' weight must be finite",
                spec.name
            )));
        }
        Ok(())
    }
}

fn param_u64(spec: &PreferenceSpec, key: &str) -> Option<u64> {
    spec.params.get(key).and_then(serde_json::Value::as_u64)
}

fn max_interactions(spec: &PreferenceSpec, connective: &Connective<'_>) -> bool {
    let max = param_u64(spec, "max").unwrap_or(u64::MAX);
    connective.instruction.interactions.len() as u64 <= max
}

fn fewest_parts(_spec: &PreferenceSpec, connective: &Connective<'_>) -> f64 {
    -(connective.instruction.parts().len() as f64)
}

/// `{ kind, at?, value? }`: rewards masculine parts of `kind`, optionally with
/// parameter `at` equal to `value`.
fn prefer_part(spec: &PreferenceSpec, connective: &Connective<'_>) -> f64 {
    let Some(kind) = spec.params.get("kind").and_then(serde_json::Value::as_str) else {
        return 0.0;
    };
    let kind = PartKind::new(kind);
    let at = param_u64(spec, "at").map(|at| at as usize);
    let value: Option<ParamValue> = spec
        .params
        .get("value")
        .and_then(|value| serde_json::from_value(value.clone()).ok());

    let registry = connective.registry;
    connective
        .instruction
        .interactions
        .iter()
        .filter_map(|interaction| registry.part(interaction.masculine))
        .filter(|part| registry.kinds().is_kind_of(&part.concrete_kind, &kind))
        .filter(|part| match (at, value.as_ref()) {
            (Some(at), Some(value)) => part.value(at) == Some(value),
            _ => true,
        })
        .count() as f64
}

fn avoid_state_change(_spec: &PreferenceSpec, connective: &Connective<'_>) -> f64 {
    let changed = connective
        .instruction
        .parts()
        .into_iter()
        .filter(|part| {
            let before = connective.before.get(*part).map(|condition| &condition.state);
            let after = connective.after.get(*part).map(|condition| &condition.state);
            before != after
        })
        .count();
    -(changed as f64)
}

/// Penalizes a phrase for answering the same change with different
/// masculine parts.
fn consistent_binding(_spec: &PreferenceSpec, path: &PhrasePath<'_>) -> f64 {
    let mut bindings: BTreeMap<&str, BTreeSet<_>> = BTreeMap::new();
    for interaction in path
        .instructions
        .iter()
        .flat_map(|instruction| instruction.interactions.iter())
    {
        bindings
            .entry(interaction.change.as_str())
            .or_default()
            .insert(interaction.masculine);
    }
    -(bindings
        .values()
        .map(|parts| parts.len().saturating_sub(1))
        .sum::<usize>() as f64)
}
