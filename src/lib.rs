pub mod change_graph;
pub mod cli;
pub mod config;
pub mod error;
pub mod instrument;
pub mod logging;
pub mod performance;
pub mod planner;
pub mod preference;
pub mod registry;
pub mod score;
pub mod state;
pub mod taxonomy;
pub mod types;

pub use error::PerformerError;
pub use instrument::Instrument;
pub use planner::{Planner, PlanningContext};
pub use score::Score;
