use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxonomyErrorKind {
    Configuration,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyError {
    pub kind: TaxonomyErrorKind,
    pub message: String,
}

impl TaxonomyError {
    pub fn new(kind: TaxonomyErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for TaxonomyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TaxonomyError {}

pub fn configuration_error(message: impl Into<String>) -> TaxonomyError {
    TaxonomyError::new(TaxonomyErrorKind::Configuration, message)
}

pub fn internal_error(message: impl Into<String>) -> TaxonomyError {
    TaxonomyError::new(TaxonomyErrorKind::Internal, message)
}
