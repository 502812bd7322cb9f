use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    change_graph::{ChangeGraphError, ChangeGraphErrorKind},
    registry::{RegistryError, RegistryErrorKind},
    state::{StateError, StateErrorKind},
    taxonomy::{TaxonomyError, TaxonomyErrorKind},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentErrorKind {
    Configuration,
    Ambiguous,
    Io,
    Internal,
}

/// Bootstrap failure tagged with the stage that raised it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentError {
    pub kind: InstrumentErrorKind,
    pub stage: String,
    pub message: String,
}

impl InstrumentError {
    pub fn new(kind: InstrumentErrorKind, stage: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            stage: stage.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for InstrumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.stage, self.message)
    }
}

impl std::error::Error for InstrumentError {}

pub fn configuration_error(stage: &str, message: impl Into<String>) -> InstrumentError {
    InstrumentError::new(InstrumentErrorKind::Configuration, stage, message)
}

pub fn io_error(stage: &str, message: impl Into<String>) -> InstrumentError {
    InstrumentError::new(InstrumentErrorKind::Io, stage, message)
}

impl From<RegistryError> for InstrumentError {
    fn from(err: RegistryError) -> Self {
        let kind = match err.kind {
            RegistryErrorKind::Configuration => InstrumentErrorKind::Configuration,
            RegistryErrorKind::Ambiguous => InstrumentErrorKind::Ambiguous,
            RegistryErrorKind::Internal => InstrumentErrorKind::Internal,
        };
        Self::new(kind, "registry", err.message)
    }
}

impl From<TaxonomyError> for InstrumentError {
    fn from(err: TaxonomyError) -> Self {
        let kind = match err.kind {
            TaxonomyErrorKind::Configuration => InstrumentErrorKind::Configuration,
            TaxonomyErrorKind::Internal => InstrumentErrorKind::Internal,
        };
        Self::new(kind, "taxonomy", err.message)
    }
}

impl From<StateError> for InstrumentError {
    fn from(err: StateError) -> Self {
        let kind = match err.kind {
            StateErrorKind::Configuration => InstrumentErrorKind::Configuration,
            StateErrorKind::Internal => InstrumentErrorKind::Internal,
        };
        Self::new(kind, "state", err.message)
    }
}

impl From<ChangeGraphError> for InstrumentError {
    fn from(err: ChangeGraphError) -> Self {
        let kind = match err.kind {
            ChangeGraphErrorKind::Configuration => InstrumentErrorKind::Configuration,
            ChangeGraphErrorKind::Internal => InstrumentErrorKind::Internal,
        };
        Self::new(kind, "change_graph", err.message)
    }
}
