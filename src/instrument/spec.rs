use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    change_graph::EdgeSpec,
    instrument::error::{InstrumentError, configuration_error, io_error},
    registry::{ParamValue, PartKind, SignatureSpec},
    state::{StateMachineSpec, StateTag},
    taxonomy::{ChangeSpec, TagSpec},
};

fn default_true() -> bool {
    true
}

/// Row of the part-kind table plus the kind's constructor and machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindSpec {
    pub kind: PartKind,
    #[serde(default)]
    pub parent: Option<PartKind>,
    #[serde(default)]
    pub cardinality: Option<usize>,
    #[serde(default)]
    pub signature: Option<SignatureSpec>,
    #[serde(default)]
    pub state_machine: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionSpec {
    #[serde(rename = "abstract")]
    pub abstract_kind: PartKind,
    pub concrete: PartKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartSpec {
    pub kind: PartKind,
    #[serde(default)]
    pub values: Vec<ParamValue>,
    #[serde(default)]
    pub initial_state: Option<StateTag>,
}

impl PartSpec {
    pub fn new<I, V>(kind: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        Self {
            kind: PartKind::new(kind),
            values: values.into_iter().map(Into::into).collect(),
            initial_state: None,
        }
    }
}

/// Instrument definition supplied as data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSpec {
    pub name: String,
    /// Start from the shared baseline tag vocabulary.
    #[serde(default = "default_true")]
    pub standard_tags: bool,
    #[serde(default)]
    pub tags: Vec<TagSpec>,
    pub kinds: Vec<KindSpec>,
    #[serde(default)]
    pub substitutions: Vec<SubstitutionSpec>,
    #[serde(default)]
    pub state_machines: Vec<StateMachineSpec>,
    #[serde(default)]
    pub parts: Vec<PartSpec>,
    #[serde(default)]
    pub changes: Vec<ChangeSpec>,
    #[serde(default)]
    pub wiring: Vec<EdgeSpec>,
}

impl InstrumentSpec {
    pub fn load(path: &Path) -> Result<Self, InstrumentError> {
        let content = fs::read_to_string(path).map_err(|err| {
            io_error(
                "load",
                format!("failed to read instrument '{}': {err}", path.display()),
            )
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, InstrumentError> {
        json5::from_str(content).map_err(|err| {
            configuration_error("load", format!("failed to parse instrument: {err}"))
        })
    }
}
