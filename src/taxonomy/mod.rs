pub mod change;
pub mod error;
pub mod tags;

pub use change::{Change, ChangeCatalog, ChangeSpec, Coordination};
pub use error::{TaxonomyError, TaxonomyErrorKind};
pub use tags::{Tag, TagCategory, TagId, TagLattice, TagSet, TagSpec};
