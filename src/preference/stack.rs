use std::sync::Arc;

use crate::preference::{
    error::{PreferenceError, configuration_error},
    table::{Behavior, PreferenceTable},
    types::{AsConnective, PhrasePath, PreferenceOp, PreferenceSpec, Scope},
};

#[derive(Debug, Clone)]
struct ActivePreference {
    spec: PreferenceSpec,
    inherited: bool,
}

/// Preferences active at one recursion depth: everything inherited from the
/// enclosing levels plus the level's own.
#[derive(Clone)]
pub struct PreferenceStack {
    table: Arc<PreferenceTable>,
    level: Scope,
    entries: Vec<ActivePreference>,
}

#[derive(Debug, Clone)]
pub struct Ranked<T> {
    pub item: T,
    pub score: f64,
}

impl PreferenceStack {
    pub fn root(table: Arc<PreferenceTable>) -> Self {
        Self {
            table,
            level: Scope::Score,
            entries: Vec::new(),
        }
    }

    /// Stack for a nested level. Own preferences may not be coarser than the
    /// level that declares them.
    pub fn child(&self, level: Scope, own: &[PreferenceSpec]) -> Result<Self, PreferenceError> {
        if level < self.level {
            return Err(configuration_error(format!(
                "{:?} level cannot nest inside {:?}",
                level, self.level
            )));
        }

        let mut entries: Vec<ActivePreference> = self
            .entries
            .iter()
            .map(|entry| ActivePreference {
                spec: entry.spec.clone(),
                inherited: true,
            })
            .collect();
        for spec in own {
            self.table.require(spec)?;
            if spec.scope < level {
                return Err(configuration_error(format!(
                    "preference '{}' has {:?} scope but is declared at {:?} level",
                    spec.name, spec.scope, level
                )));
            }
            entries.push(ActivePreference {
                spec: spec.clone(),
                inherited: false,
            });
        }

        Ok(Self {
            table: Arc::clone(&self.table),
            level,
            entries,
        })
    }

    /// Same stack with this level's own preferences dropped.
    pub fn without_own(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
            level: self.level,
            entries: self
                .entries
                .iter()
                .filter(|entry| entry.inherited)
                .cloned()
                .collect(),
        }
    }

    pub fn level(&self) -> Scope {
        self.level
    }

    pub fn has_own(&self) -> bool {
        self.entries.iter().any(|entry| !entry.inherited)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.spec.name.as_str())
    }

    /// Filters with Admit behaviors, scores with weighted Score behaviors and
    /// keeps the best `beam`. Ties keep input order.
    pub fn rank<T: AsConnective>(&self, candidates: Vec<T>, beam: usize) -> Vec<Ranked<T>> {
        let mut ranked: Vec<Ranked<T>> = candidates
            .into_iter()
            .filter(|candidate| self.admits(candidate))
            .map(|candidate| {
                let score = self.score(&candidate);
                Ranked {
                    item: candidate,
                    score,
                }
            })
            .collect();
        ranked.sort_by(|lhs, rhs| rhs.score.total_cmp(&lhs.score));
        ranked.truncate(beam.max(1));
        ranked
    }

    pub fn admits<T: AsConnective>(&self, candidate: &T) -> bool {
        let connective = candidate.connective();
        self.entries.iter().all(|entry| {
            match self.table.get(&entry.spec.kind, PreferenceOp::Admit) {
                Some(Behavior::Admit(admit)) => admit(&entry.spec, &connective),
                _ => true,
            }
        })
    }

    pub fn score<T: AsConnective>(&self, candidate: &T) -> f64 {
        let connective = candidate.connective();
        self.entries
            .iter()
            .filter_map(|entry| match self.table.get(&entry.spec.kind, PreferenceOp::Score) {
                Some(Behavior::Score(score)) => Some(entry.spec.weight * score(&entry.spec, &connective)),
                _ => None,
            })
            .sum()
    }

    /// Retroactive score from this level's own Review preferences.
    pub fn review(&self, path: &PhrasePath<'_>) -> f64 {
        self.entries
            .iter()
            .filter(|entry| !entry.inherited)
            .filter_map(|entry| match self.table.get(&entry.spec.kind, PreferenceOp::Review) {
                Some(Behavior::Review(review)) => Some(entry.spec.weight * review(&entry.spec, path)),
                _ => None,
            })
            .sum()
    }

    pub fn has_review(&self) -> bool {
        self.entries.iter().any(|entry| {
            !entry.inherited
                && self
                    .table
                    .get(&entry.spec.kind, PreferenceOp::Review)
                    .is_some()
        })
    }
}
