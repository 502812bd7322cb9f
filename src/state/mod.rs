pub mod error;
pub mod machine;
pub mod set;
pub mod types;
pub mod view;

pub use error::{StateError, StateErrorKind};
pub use machine::StateMachine;
pub use set::StateMachineSet;
pub use types::{
    InteractionKind, PartCondition, Settled, StateMachineSpec, StateTag, Transition,
    TransitionSpec,
};
pub use view::StateView;
