//! Pure state transition function
//!
//! Given the same state and event, `transition` always produces the same new
//! state. It never mutates its input; readers holding an older snapshot keep
//! seeing a consistent value.

use super::state::{ConvState, Message, Role, SessionPhase, Step};
use super::Event;
use crate::event::StepUpdate;
use crate::title::normalize_title;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("A request is already in flight (cancel it first)")]
    AgentBusy,
    #[error("Invalid transition: {event} while {phase:?}")]
    InvalidTransition {
        phase: SessionPhase,
        event: &'static str,
    },
}

/// Pure transition function
///
/// # Errors
///
/// Returns [`TransitionError::AgentBusy`] for a submission while a request is
/// in flight, and [`TransitionError::InvalidTransition`] for any event the
/// current phase does not accept.
pub fn transition(state: &ConvState, event: Event) -> Result<ConvState, TransitionError> {
    use SessionPhase::{Cancelled, Done, Errored, Idle, Sending, Streaming};

    match (state.phase, event) {
        // ============================================================
        // Submission
        // ============================================================
        (Idle | Done | Errored | Cancelled, Event::Submit { text, seed }) => {
            let mut next = state.clone();
            next.messages.push(Message::user(text));
            next.steps.clear();
            next.step_index.clear();
            next.step_index.insert(seed.id.clone(), 0);
            next.steps.push(seed);
            next.open_turn = None;
            next.error = None;
            next.phase = Sending;
            Ok(next)
        }

        (Sending | Streaming, Event::Submit { .. }) => Err(TransitionError::AgentBusy),

        // ============================================================
        // Streaming
        // ============================================================
        (Sending, Event::StreamOpened) => {
            let mut next = state.clone();
            open_assistant_turn(&mut next);
            next.phase = Streaming;
            Ok(next)
        }

        (Streaming, Event::Token(text)) => {
            let mut next = state.clone();
            append_token(&mut next, &text);
            Ok(next)
        }

        (
            Streaming,
            Event::Component {
                update,
                fallback_id,
                received_at,
            },
        ) => {
            let mut next = state.clone();
            upsert_step(&mut next, update, fallback_id, received_at);
            Ok(next)
        }

        // ============================================================
        // Termination
        // ============================================================
        (Streaming, Event::StreamEnded) => {
            let mut next = state.clone();
            seal_turn(&mut next, TurnOutcome::Completed);
            next.phase = Done;
            Ok(next)
        }

        (Sending | Streaming, Event::TransportFailed { message }) => {
            let mut next = state.clone();
            seal_turn(&mut next, TurnOutcome::Failed);
            next.error = Some(message);
            next.phase = Errored;
            Ok(next)
        }

        // Cancellation keeps whatever was applied so far
        (Sending | Streaming, Event::Cancelled) => {
            let mut next = state.clone();
            next.open_turn = None;
            next.phase = Cancelled;
            Ok(next)
        }

        (phase, event) => Err(TransitionError::InvalidTransition {
            phase,
            event: event.name(),
        }),
    }
}

// ============================================================================
// Conversation operations
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnOutcome {
    Completed,
    Failed,
}

fn open_assistant_turn(state: &mut ConvState) {
    state.messages.push(Message::assistant(String::new()));
    state.open_turn = Some(state.messages.len() - 1);
}

fn append_token(state: &mut ConvState, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(message) = state.open_turn.and_then(|pos| state.messages.get_mut(pos)) {
        message.content.push_str(text);
    }
}

fn upsert_step(
    state: &mut ConvState,
    update: StepUpdate,
    fallback_id: String,
    received_at: DateTime<Utc>,
) {
    let title = normalize_title(&update.title);

    if let Some(&pos) = update.id.as_ref().and_then(|id| state.step_index.get(id)) {
        let step = &mut state.steps[pos];
        step.title = title;
        step.status = update.status;
        step.payload.extend(update.payload);
        return;
    }

    let id = update.id.unwrap_or(fallback_id);
    state.step_index.insert(id.clone(), state.steps.len());
    state.steps.push(Step {
        id,
        title,
        kind: update.kind,
        payload: update.payload,
        status: update.status,
        created_at: received_at,
    });
}

/// Close the open assistant turn. A failed turn that produced no text leaves
/// no empty bubble behind.
fn seal_turn(state: &mut ConvState, outcome: TurnOutcome) {
    let Some(pos) = state.open_turn.take() else {
        return;
    };
    let empty = state
        .messages
        .get(pos)
        .is_some_and(|m| m.role == Role::Assistant && m.content.is_empty());
    if outcome == TurnOutcome::Failed && empty {
        state.messages.remove(pos);
    }
}
