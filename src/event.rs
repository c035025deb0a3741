//! Classification of decoded records into stream events
//!
//! A record that is not valid JSON is a decode error; the caller logs it and
//! moves on. Valid JSON with an unknown or missing discriminant is ignored so
//! newer servers can add event kinds without breaking this client.

use crate::state_machine::StepStatus;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Title used when a component event carries none
pub const DEFAULT_STEP_TITLE: &str = "Processing...";

/// Step kind used when a component event carries none (structured data)
pub const DEFAULT_STEP_KIND: &str = "json";

/// A classified event from the wire
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Incremental assistant text
    Token(String),
    /// Creation or revision of a timeline step
    Component(StepUpdate),
}

/// Step descriptor with wire defaults applied
#[derive(Debug, Clone, PartialEq)]
pub struct StepUpdate {
    pub id: Option<String>,
    pub kind: String,
    /// Raw title as sent; normalized when applied to the timeline
    pub title: String,
    pub payload: Map<String, Value>,
    pub status: StepStatus,
}

impl StepUpdate {
    /// Descriptor with every optional field left at its default
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            id: None,
            kind: DEFAULT_STEP_KIND.to_string(),
            title: title.into(),
            payload: Map::new(),
            status: StepStatus::Completed,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: StepStatus) -> Self {
        self.status = status;
        self
    }
}

/// Record-level decode failure
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("record is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),
    #[error("malformed component descriptor: {0}")]
    Component(#[source] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct WireComponent {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    data: Option<Map<String, Value>>,
}

impl From<WireComponent> for StepUpdate {
    fn from(wire: WireComponent) -> Self {
        let payload = wire.data.unwrap_or_default();
        let status = payload
            .get("status")
            .and_then(Value::as_str)
            .map_or(StepStatus::Completed, StepStatus::from_wire);
        Self {
            // An empty id names nothing; the step is anonymous
            id: wire.id.filter(|id| !id.is_empty()),
            kind: wire.kind.unwrap_or_else(|| DEFAULT_STEP_KIND.to_string()),
            title: wire.title.unwrap_or_else(|| DEFAULT_STEP_TITLE.to_string()),
            payload,
            status,
        }
    }
}

/// Decode and classify one record.
///
/// # Errors
///
/// Returns a [`DecodeError`] when the record is not JSON or its component
/// descriptor has the wrong shape. `Ok(None)` means the record was valid but
/// carries nothing to apply.
pub fn interpret(record: &str) -> Result<Option<StreamEvent>, DecodeError> {
    let value: Value = serde_json::from_str(record).map_err(DecodeError::Json)?;

    let Some(kind) = value.get("type").and_then(Value::as_str) else {
        return Ok(None);
    };

    match kind {
        "token" => Ok(value
            .get("content")
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
            .map(|text| StreamEvent::Token(text.to_string()))),
        "component" => match value.get("component") {
            None | Some(Value::Null) => Ok(None),
            Some(component) => {
                let wire = WireComponent::deserialize(component).map_err(DecodeError::Component)?;
                Ok(Some(StreamEvent::Component(wire.into())))
            }
        },
        _ => Ok(None),
    }
}

/// [`interpret`], with decode failures reported as diagnostics instead of errors
pub fn interpret_logged(record: &str) -> Option<StreamEvent> {
    match interpret(record) {
        Ok(Some(event)) => Some(event),
        Ok(None) => {
            tracing::debug!(record = %record, "Ignoring record with nothing to apply");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, record = %record, "Failed to parse stream record");
            None
        }
    }
}
