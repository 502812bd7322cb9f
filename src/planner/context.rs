use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{config::PlannerConfig, instrument::Instrument, preference::PreferenceTable};

/// Explicit state of one planning session, shared read-only with workers.
pub struct PlanningContext {
    session_id: Uuid,
    instrument: Arc<Instrument>,
    preferences: Arc<PreferenceTable>,
    config: PlannerConfig,
    cancel: CancellationToken,
}

impl PlanningContext {
    pub fn new(instrument: Arc<Instrument>, config: PlannerConfig) -> Self {
        Self::with_preferences(
            instrument,
            config,
            Arc::new(PreferenceTable::with_builtins()),
        )
    }

    pub fn with_preferences(
        instrument: Arc<Instrument>,
        config: PlannerConfig,
        preferences: Arc<PreferenceTable>,
    ) -> Self {
        Self::for_session(Uuid::now_v7(), instrument, config, preferences)
    }

    /// Runs under an existing session id, such as the one logging was
    /// initialized with.
    pub fn for_session(
        session_id: Uuid,
        instrument: Arc<Instrument>,
        config: PlannerConfig,
        preferences: Arc<PreferenceTable>,
    ) -> Self {
        tracing::info!(
            target: "planner",
            session_id = %session_id,
            instrument = instrument.name(),
            beam_width = config.beam_width,
            workers = config.workers,
            "planning_session_started"
        );
        Self {
            session_id,
            instrument,
            preferences,
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn preferences(&self) -> &Arc<PreferenceTable> {
        &self.preferences
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stops in-flight exploration at its next iteration boundary.
    pub fn shutdown(&self) {
        if !self.cancel.is_cancelled() {
            self.cancel.cancel();
            tracing::info!(
                target: "planner",
                session_id = %self.session_id,
                "planning_session_shutdown"
            );
        }
    }
}
