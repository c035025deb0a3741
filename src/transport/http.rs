//! HTTP transport over reqwest

use super::{ByteStream, ChatTransport, TransportError};
use crate::config::ClientConfig;
use async_trait::async_trait;
use futures::stream::{StreamExt, TryStreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

/// POSTs `{"message": ...}` to the chat endpoint and streams the reply.
///
/// A single attempt is made; failures are returned, never retried.
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    /// # Errors
    ///
    /// Fails if the underlying HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        // No overall timeout: a healthy stream may stay open for minutes
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| TransportError::connect(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn open(&self, message: &str) -> Result<ByteStream, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ChatRequest { message })
            .send()
            .await
            .map_err(|e| TransportError::connect(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(status = %status, body = %body, "Chat endpoint returned an error");
            return Err(TransportError::status(
                status.as_u16(),
                status.canonical_reason(),
            ));
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));
        if is_json {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::not_streaming(format!(
                "Expected an event stream, got JSON: {body}"
            )));
        }

        Ok(response
            .bytes_stream()
            .map_ok(|chunk| chunk.to_vec())
            .map_err(|e| TransportError::read(e.to_string()))
            .boxed())
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
