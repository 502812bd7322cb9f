pub mod bootstrap;
pub mod error;
pub mod spec;

pub use bootstrap::Instrument;
pub use error::{InstrumentError, InstrumentErrorKind};
pub use spec::{InstrumentSpec, KindSpec, PartSpec, SubstitutionSpec};
