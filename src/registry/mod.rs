pub mod error;
pub mod factory;
mod key;
pub mod kinds;
pub mod query;
pub mod registry;
pub mod types;

pub use error::{RegistryError, RegistryErrorKind};
pub use factory::{FactoryTable, PartFactory, PartSeed, default_part};
pub use kinds::KindTable;
pub use query::{ParamMatcher, PartQuery};
pub use registry::{PartFinder, PartRegistry};
pub use types::{
    KindEntry, ParamType, ParamValue, Part, PartId, PartKind, PartSignature, SignatureSpec,
};
