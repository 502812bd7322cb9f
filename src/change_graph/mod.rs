pub mod error;
pub mod graph;
pub mod production;
pub mod types;

pub use error::{ChangeGraphError, ChangeGraphErrorKind};
pub use graph::ChangeGraph;
pub use production::{
    PartBinding, Production, ProductionContext, ProductionFactory, ProductionTable,
};
pub use types::{ChangeEdge, EdgeKind, EdgeSpec, Vertex, VertexId};
