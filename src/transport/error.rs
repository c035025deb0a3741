//! Transport error types

use thiserror::Error;

/// Terminal failure of the outbound call
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connect, message)
    }

    /// Non-success HTTP status, phrased as `HTTP 502: Bad Gateway`
    #[must_use]
    pub fn status(code: u16, reason: Option<&str>) -> Self {
        Self::new(
            TransportErrorKind::Status(code),
            format!("HTTP {code}: {}", reason.unwrap_or("Unknown")),
        )
    }

    pub fn not_streaming(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::NotStreaming, message)
    }

    pub fn read(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Read, message)
    }
}

/// Error classification for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Request could not be sent (refused, DNS, TLS)
    Connect,
    /// Response status was not 2xx
    Status(u16),
    /// 2xx response that is an error document rather than an event stream
    NotStreaming,
    /// Body failed after streaming began
    Read,
}
