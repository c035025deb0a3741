//! HTTP relay between chat clients and the orchestrator
//!
//! Forwards one request per call and pipes the orchestrator's event stream
//! back unbuffered.

mod handlers;
mod types;

pub use handlers::create_router;
pub use types::{ErrorResponse, RelayRequest};

use crate::config::RelayConfig;
use reqwest::Client;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub client: Client,
    pub upstream_url: Arc<str>,
}

impl AppState {
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn new(config: &RelayConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self {
            client,
            upstream_url: config.chat_url().into(),
        })
    }
}
