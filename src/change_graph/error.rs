use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeGraphErrorKind {
    Configuration,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeGraphError {
    pub kind: ChangeGraphErrorKind,
    pub message: String,
}

impl ChangeGraphError {
    pub fn new(kind: ChangeGraphErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ChangeGraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ChangeGraphError {}

pub fn configuration_error(message: impl Into<String>) -> ChangeGraphError {
    ChangeGraphError::new(ChangeGraphErrorKind::Configuration, message)
}

pub fn internal_error(message: impl Into<String>) -> ChangeGraphError {
    ChangeGraphError::new(ChangeGraphErrorKind::Internal, message)
}
