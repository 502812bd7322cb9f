pub mod document;
pub mod error;
pub mod interpreter;
pub mod types;

pub use document::{JsonScoreFile, Score};
pub use error::{ScoreError, ScoreErrorKind};
pub use interpreter::{BufferedInterpreter, Interpreter};
pub use types::{
    Demand, Instance, NodeBody, PartSelector, ScoreElement, ScoreLevel, ScoreNode,
};
