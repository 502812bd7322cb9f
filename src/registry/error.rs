use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryErrorKind {
    Configuration,
    Ambiguous,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryError {
    pub kind: RegistryErrorKind,
    pub message: String,
}

impl RegistryError {
    pub fn new(kind: RegistryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RegistryError {}

pub fn configuration_error(message: impl Into<String>) -> RegistryError {
    RegistryError::new(RegistryErrorKind::Configuration, message)
}

pub fn ambiguous_result(message: impl Into<String>) -> RegistryError {
    RegistryError::new(RegistryErrorKind::Ambiguous, message)
}

pub fn internal_error(message: impl Into<String>) -> RegistryError {
    RegistryError::new(RegistryErrorKind::Internal, message)
}
