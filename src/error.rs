use thiserror::Error;

use crate::{
    change_graph::ChangeGraphError, instrument::InstrumentError, performance::PerformanceError,
    planner::PlannerError, preference::PreferenceError, registry::RegistryError,
    score::ScoreError, state::StateError, taxonomy::TaxonomyError,
};

/// Any failure surfaced by the crate's public entry points.
#[derive(Debug, Error)]
pub enum PerformerError {
    #[error("registry: {0}")]
    Registry(#[from] RegistryError),
    #[error("taxonomy: {0}")]
    Taxonomy(#[from] TaxonomyError),
    #[error("state model: {0}")]
    State(#[from] StateError),
    #[error("change graph: {0}")]
    ChangeGraph(#[from] ChangeGraphError),
    #[error("preference: {0}")]
    Preference(#[from] PreferenceError),
    #[error("performance graph: {0}")]
    Performance(#[from] PerformanceError),
    #[error("score: {0}")]
    Score(#[from] ScoreError),
    #[error("instrument: {0}")]
    Instrument(#[from] InstrumentError),
    #[error("planner: {0}")]
    Planner(#[from] PlannerError),
}

impl PerformerError {
    /// True when the score cannot be performed, as opposed to a broken
    /// configuration or an internal fault.
    pub fn is_unperformable(&self) -> bool {
        matches!(self, Self::Planner(err) if err.is_unperformable())
    }
}
