use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceErrorKind {
    Configuration,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceError {
    pub kind: PreferenceErrorKind,
    pub message: String,
}

impl PreferenceError {
    pub fn new(kind: PreferenceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for PreferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for PreferenceError {}

pub fn configuration_error(message: impl Into<String>) -> PreferenceError {
    PreferenceError::new(PreferenceErrorKind::Configuration, message)
}

pub fn internal_error(message: impl Into<String>) -> PreferenceError {
    PreferenceError::new(PreferenceErrorKind::Internal, message)
}
