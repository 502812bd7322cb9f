mod adjust;
pub mod checkpoint;
pub mod context;
pub mod error;
mod explorer;
pub mod facade;
mod imagine;
mod parallel;
pub mod phase;
mod realize;

pub use checkpoint::{
    CheckpointStore, FrontierEntry, PERSISTENCE_VERSION, PlanningCheckpoint, PlanningCursor,
};
pub use context::PlanningContext;
pub use error::{PlannerError, PlannerErrorKind};
pub use facade::Planner;
pub use phase::PlannerPhase;
