use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartKind(String);

impl PartKind {
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PartKind {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PartKind {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for PartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Arena handle of a part inside one instrument's registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartId(pub u32);

impl PartId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "part#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    Int,
    Bool,
    Symbol,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Symbol(String),
}

impl ParamValue {
    pub fn param_type(&self) -> ParamType {
        match self {
            Self::Bool(_) => ParamType::Bool,
            Self::Int(_) => ParamType::Int,
            Self::Symbol(_) => ParamType::Symbol,
        }
    }

    pub fn symbol(value: impl Into<String>) -> Self {
        Self::Symbol(value.into())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Symbol(value.to_string())
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Symbol(value) => f.write_str(value),
        }
    }
}

/// Constructor description supplied by callers: parameter types plus the
/// cardinality estimate of each position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureSpec {
    pub param_types: Vec<ParamType>,
    pub ranges: Vec<u64>,
}

impl SignatureSpec {
    pub fn new(param_types: Vec<ParamType>, ranges: Vec<u64>) -> Self {
        Self {
            param_types,
            ranges,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartSignature {
    pub kind: PartKind,
    pub param_types: Vec<ParamType>,
    pub ranges: Vec<u64>,
}

impl PartSignature {
    pub fn arity(&self) -> usize {
        self.param_types.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub id: PartId,
    /// Kind requested at creation, before substitution.
    pub kind: PartKind,
    pub concrete_kind: PartKind,
    pub signature: usize,
    pub values: Vec<ParamValue>,
    pub instrument: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Part {
    pub fn value(&self, index: usize) -> Option<&ParamValue> {
        self.values.get(index)
    }

    pub fn label(&self) -> String {
        let values: Vec<String> = self.values.iter().map(ToString::to_string).collect();
        format!("{}({})", self.concrete_kind, values.join(","))
    }
}

/// Row of the static part-kind table: (kind, parent group, cardinality).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindEntry {
    pub kind: PartKind,
    #[serde(default)]
    pub parent: Option<PartKind>,
    #[serde(default)]
    pub cardinality: Option<usize>,
}

impl KindEntry {
    pub fn root(kind: impl Into<PartKind>) -> Self {
        Self {
            kind: kind.into(),
            parent: None,
            cardinality: None,
        }
    }

    pub fn child(kind: impl Into<PartKind>, parent: impl Into<PartKind>) -> Self {
        Self {
            kind: kind.into(),
            parent: Some(parent.into()),
            cardinality: None,
        }
    }

    pub fn with_cardinality(mut self, cardinality: usize) -> Self {
        self.cardinality = Some(cardinality);
        self
    }
}
