use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::InstanceIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannerPhase {
    Imagining,
    Realizing,
    Adjusting,
    Filtering,
    Done,
    Failed,
}

impl PlannerPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Imagining => "imagining",
            Self::Realizing => "realizing",
            Self::Adjusting => "adjusting",
            Self::Filtering => "filtering",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PlannerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn enter(phrase: &str, instance: Option<InstanceIndex>, phase: PlannerPhase) {
    tracing::trace!(
        target: "planner",
        phrase = phrase,
        instance = ?instance,
        phase = phase.as_str(),
        "phase_entered"
    );
}
