pub mod error;
mod fingerprint;
pub mod fragment;
pub mod graph;
pub mod types;

pub use error::{PerformanceError, PerformanceErrorKind};
pub use fragment::{Committed, Fragment};
pub use graph::{Absorbed, Interned, PerformanceGraph};
pub use types::{PerformanceEdge, Snapshot, SnapshotId};
