use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{change_graph::production::Production, taxonomy::Change};

/// Vertex handle; `VertexId::NULL` is the "no active change" vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VertexId(pub usize);

impl VertexId {
    pub const NULL: VertexId = VertexId(0);

    pub fn is_null(self) -> bool {
        self == Self::NULL
    }
}

#[derive(Debug, Clone)]
pub enum Vertex {
    Null,
    Change(Arc<Change>),
}

impl Vertex {
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Null => None,
            Self::Change(change) => Some(&change.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EdgeKind {
    PossibleNext,
    Fallback,
    /// Admissible only when the change applied before the source vertex was
    /// `after` (`None` meaning nothing was).
    Conditional {
        #[serde(default)]
        after: Option<String>,
    },
}

impl EdgeKind {
    pub(crate) fn precedence(&self) -> u8 {
        match self {
            Self::PossibleNext | Self::Conditional { .. } => 0,
            Self::Fallback => 1,
        }
    }
}

fn default_production() -> String {
    "always".to_string()
}

/// Instrument wiring row. `from: None` leaves the Null vertex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSpec {
    #[serde(default)]
    pub from: Option<String>,
    pub to: String,
    #[serde(default = "default_kind")]
    pub kind: EdgeKind,
    #[serde(default = "default_production")]
    pub production: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

fn default_kind() -> EdgeKind {
    EdgeKind::PossibleNext
}

impl EdgeSpec {
    pub fn new(from: Option<&str>, to: &str, kind: EdgeKind) -> Self {
        Self {
            from: from.map(str::to_string),
            to: to.to_string(),
            kind,
            production: default_production(),
            params: serde_json::Value::Null,
        }
    }

    pub fn with_production(mut self, production: &str, params: serde_json::Value) -> Self {
        self.production = production.to_string();
        self.params = params;
        self
    }
}

#[derive(Clone)]
pub struct ChangeEdge {
    pub from: VertexId,
    pub to: VertexId,
    pub kind: EdgeKind,
    pub production_name: String,
    pub production: Arc<dyn Production>,
}

impl fmt::Debug for ChangeEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeEdge")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("kind", &self.kind)
            .field("production", &self.production_name)
            .finish()
    }
}
