use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreErrorKind {
    Configuration,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreError {
    pub kind: ScoreErrorKind,
    pub message: String,
}

impl ScoreError {
    pub fn new(kind: ScoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ScoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ScoreError {}

pub fn configuration_error(message: impl Into<String>) -> ScoreError {
    ScoreError::new(ScoreErrorKind::Configuration, message)
}

pub fn internal_error(message: impl Into<String>) -> ScoreError {
    ScoreError::new(ScoreErrorKind::Internal, message)
}
