pub mod error;
pub mod stack;
pub mod table;
pub mod types;

pub use error::{PreferenceError, PreferenceErrorKind};
pub use stack::{PreferenceStack, Ranked};
pub use table::{AdmitFn, Behavior, PreferenceTable, ReviewFn, ScoreFn};
pub use types::{AsConnective, Connective, PhrasePath, PreferenceOp, PreferenceSpec, Scope};
