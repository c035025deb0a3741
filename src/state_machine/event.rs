//! Events that drive conversation transitions

use super::state::{Step, StepStatus};
use crate::event::{StepUpdate, DEFAULT_STEP_KIND};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Title of the synthetic step seeded on every submission
pub const REQUEST_RECEIVED_TITLE: &str = "Orchestrator: Received request";

/// Events that trigger state transitions.
///
/// Anything impure (generated ids, clock reads) is captured when the event is
/// built, so [`transition`](super::transition) stays deterministic.
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    Submit {
        text: String,
        seed: Step,
    },
    Cancelled,

    // Transport events
    StreamOpened,
    StreamEnded,
    TransportFailed {
        message: String,
    },

    // Decoded records
    Token(String),
    Component {
        update: StepUpdate,
        /// Used only when `update.id` is absent
        fallback_id: String,
        received_at: DateTime<Utc>,
    },
}

impl Event {
    /// User submission, stamped with the "request received" step
    pub fn submit(text: impl Into<String>) -> Self {
        let now = Utc::now();
        let seed = Step {
            id: format!("init-{}", now.timestamp_millis()),
            title: REQUEST_RECEIVED_TITLE.to_string(),
            kind: DEFAULT_STEP_KIND.to_string(),
            payload: Map::from_iter([
                ("message".to_string(), Value::from("Processing user query...")),
                ("timestamp".to_string(), Value::from(now.to_rfc3339())),
            ]),
            status: StepStatus::Completed,
            created_at: now,
        };
        Event::Submit {
            text: text.into(),
            seed,
        }
    }

    pub fn component(update: StepUpdate) -> Self {
        Event::Component {
            update,
            fallback_id: uuid::Uuid::new_v4().to_string(),
            received_at: Utc::now(),
        }
    }

    pub fn transport_failed(message: impl Into<String>) -> Self {
        Event::TransportFailed {
            message: message.into(),
        }
    }

    /// Short name for logging
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Event::Submit { .. } => "submit",
            Event::Cancelled => "cancelled",
            Event::StreamOpened => "stream_opened",
            Event::StreamEnded => "stream_ended",
            Event::TransportFailed { .. } => "transport_failed",
            Event::Token(_) => "token",
            Event::Component { .. } => "component",
        }
    }
}
