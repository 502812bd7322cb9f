use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceErrorKind {
    InvariantViolation,
    NotFound,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceError {
    pub kind: PerformanceErrorKind,
    pub message: String,
}

impl PerformanceError {
    pub fn new(kind: PerformanceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for PerformanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for PerformanceError {}

pub fn invariant_violation(message: impl Into<String>) -> PerformanceError {
    PerformanceError::new(PerformanceErrorKind::InvariantViolation, message)
}

pub fn internal_error(message: impl Into<String>) -> PerformanceError {
    PerformanceError::new(PerformanceErrorKind::Internal, message)
}

pub fn not_found(message: impl Into<String>) -> PerformanceError {
    PerformanceError::new(PerformanceErrorKind::NotFound, message)
}
