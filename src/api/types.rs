//! API request and response types

use serde::{Deserialize, Serialize};

/// Chat request, as sent by clients and forwarded upstream
#[derive(Debug, Deserialize, Serialize)]
pub struct RelayRequest {
    #[serde(default)]
    pub message: Option<String>,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}
