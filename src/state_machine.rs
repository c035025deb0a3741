//! Core conversation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions: the
//! message log and the step timeline are only ever changed by `transition`.

pub mod event;
pub mod state;
pub(crate) mod transition;


pub use event::Event;
pub use state::{ConvState, Message, Role, SessionPhase, Step, StepStatus};
pub use transition::{transition, TransitionError};
