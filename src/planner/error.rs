use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    performance::PerformanceError,
    preference::{PreferenceError, PreferenceErrorKind},
    state::{StateError, StateErrorKind},
    types::InstanceIndex,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannerErrorKind {
    Configuration,
    Unperformable,
    Timeout,
    Cancelled,
    Persistence,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerError {
    pub kind: PlannerErrorKind,
    pub message: String,
    #[serde(default)]
    pub instance: Option<InstanceIndex>,
    /// Innermost score node the failure is scoped to.
    #[serde(default)]
    pub phrase: Option<String>,
}

impl PlannerError {
    pub fn new(kind: PlannerErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            instance: None,
            phrase: None,
        }
    }

    pub fn is_unperformable(&self) -> bool {
        self.kind == PlannerErrorKind::Unperformable
    }

    pub(crate) fn scoped_to(mut self, phrase: &str) -> Self {
        if self.phrase.is_none() {
            self.phrase = Some(phrase.to_string());
        }
        self
    }
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.phrase, self.instance) {
            (Some(phrase), Some(instance)) => {
                write!(f, "{} (phrase '{}', instance {})", self.message, phrase, instance)
            }
            (Some(phrase), None) => write!(f, "{} (phrase '{}')", self.message, phrase),
            (None, Some(instance)) => write!(f, "{} (instance {})", self.message, instance),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for PlannerError {}

pub fn configuration_error(message: impl Into<String>) -> PlannerError {
    PlannerError::new(PlannerErrorKind::Configuration, message)
}

pub fn unperformable(
    instance: Option<InstanceIndex>,
    phrase: &str,
    message: impl Into<String>,
) -> PlannerError {
    let mut err = PlannerError::new(PlannerErrorKind::Unperformable, message);
    err.instance = instance;
    err.phrase = Some(phrase.to_string());
    err
}

pub fn timeout(instance: InstanceIndex, phrase: &str) -> PlannerError {
    let mut err = PlannerError::new(PlannerErrorKind::Timeout, "phrase exploration timed out");
    err.instance = Some(instance);
    err.phrase = Some(phrase.to_string());
    err
}

pub fn cancelled(message: impl Into<String>) -> PlannerError {
    PlannerError::new(PlannerErrorKind::Cancelled, message)
}

pub fn persistence_error(message: impl Into<String>) -> PlannerError {
    PlannerError::new(PlannerErrorKind::Persistence, message)
}

pub fn internal_error(message: impl Into<String>) -> PlannerError {
    PlannerError::new(PlannerErrorKind::Internal, message)
}

impl From<StateError> for PlannerError {
    fn from(err: StateError) -> Self {
        match err.kind {
            StateErrorKind::Configuration => configuration_error(err.message),
            StateErrorKind::Internal => internal_error(err.message),
        }
    }
}

impl From<PreferenceError> for PlannerError {
    fn from(err: PreferenceError) -> Self {
        match err.kind {
            PreferenceErrorKind::Configuration => configuration_error(err.message),
            PreferenceErrorKind::Internal => internal_error(err.message),
        }
    }
}

impl From<PerformanceError> for PlannerError {
    fn from(err: PerformanceError) -> Self {
        internal_error(err.message)
    }
}
