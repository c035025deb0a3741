//! Outbound chat transport
//!
//! One call per submission: send the user's message, get back the response
//! body as a stream of byte chunks.

mod error;
mod http;

pub use error::{TransportError, TransportErrorKind};
pub use http::HttpTransport;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use std::sync::Arc;
use std::time::Instant;

/// Response body, chunked however the network delivered it
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, TransportError>>;

/// Issues the outbound call for a submission
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send `message` and return the response body once headers are accepted
    async fn open(&self, message: &str) -> Result<ByteStream, TransportError>;

    /// Where requests go, for diagnostics
    fn endpoint(&self) -> &str;
}

#[async_trait]
impl<T: ChatTransport + ?Sized> ChatTransport for Arc<T> {
    async fn open(&self, message: &str) -> Result<ByteStream, TransportError> {
        (**self).open(message).await
    }

    fn endpoint(&self) -> &str {
        (**self).endpoint()
    }
}

/// Logging wrapper for transports
pub struct LoggingTransport<T> {
    inner: T,
}

impl<T: ChatTransport> LoggingTransport<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<T: ChatTransport> ChatTransport for LoggingTransport<T> {
    async fn open(&self, message: &str) -> Result<ByteStream, TransportError> {
        let start = Instant::now();
        let result = self.inner.open(message).await;
        let duration = start.elapsed();

        match result {
            Ok(body) => {
                tracing::info!(
                    endpoint = %self.inner.endpoint(),
                    duration_ms = %duration.as_millis(),
                    "Chat stream opened"
                );
                let endpoint = self.inner.endpoint().to_string();
                let mut bytes = 0usize;
                let mut chunks = 0usize;
                Ok(body
                    .inspect(move |chunk| match chunk {
                        Ok(data) => {
                            bytes += data.len();
                            chunks += 1;
                            tracing::trace!(endpoint = %endpoint, chunks, bytes, "Chunk received");
                        }
                        Err(e) => {
                            tracing::warn!(endpoint = %endpoint, error = %e, "Chat stream failed");
                        }
                    })
                    .boxed())
            }
            Err(e) => {
                tracing::error!(
                    endpoint = %self.inner.endpoint(),
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    "Chat request failed"
                );
                Err(e)
            }
        }
    }

    fn endpoint(&self) -> &str {
        self.inner.endpoint()
    }
}
