//! Client-side consumer for the agent orchestrator's event stream
//!
//! A newline-delimited stream of `token` and `component` records is decoded
//! into two views: the assistant's growing answer and a timeline of agent
//! steps that are created, revised in place, and completed.

pub mod api;
pub mod config;
pub mod event;
pub mod frame;
pub mod session;
pub mod state_machine;
pub mod title;
pub mod transport;

pub use session::{SessionController, SessionOutcome};
pub use state_machine::{ConvState, Message, Role, SessionPhase, Step, StepStatus};
