//! Conversation state types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

// ============================================================================
// Messages
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One chat bubble
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ============================================================================
// Timeline steps
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Started,
    #[default]
    Completed,
}

impl StepStatus {
    /// Map the wire status string. Only `started` marks a step in progress.
    #[must_use]
    pub fn from_wire(value: &str) -> Self {
        match value {
            "started" => StepStatus::Started,
            _ => StepStatus::Completed,
        }
    }
}

/// One entry in the agent-action timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub title: String,
    pub kind: String,
    pub payload: Map<String, Value>,
    pub status: StepStatus,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Session phase
// ============================================================================

/// Lifecycle of the current (or most recent) submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    Sending,
    Streaming,
    Done,
    Errored,
    Cancelled,
}

impl SessionPhase {
    /// A request is in flight
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, SessionPhase::Sending | SessionPhase::Streaming)
    }
}

// ============================================================================
// Conversation snapshot
// ============================================================================

/// Everything a consumer renders. Each transition produces a new value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConvState {
    pub messages: Vec<Message>,
    pub steps: Vec<Step>,
    pub phase: SessionPhase,
    pub error: Option<String>,
    /// Step id -> position in `steps`
    #[serde(skip)]
    pub(crate) step_index: HashMap<String, usize>,
    /// Position of the assistant message receiving tokens
    #[serde(skip)]
    pub(crate) open_turn: Option<usize>,
}

impl ConvState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn loading(&self) -> bool {
        self.phase.is_active()
    }

    #[must_use]
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.step_index.get(id).map(|&pos| &self.steps[pos])
    }

    /// The assistant message currently receiving tokens
    #[must_use]
    pub fn open_message(&self) -> Option<&Message> {
        self.open_turn.map(|pos| &self.messages[pos])
    }

    /// Content of the last assistant message, if any
    #[must_use]
    pub fn last_assistant_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
    }
}
