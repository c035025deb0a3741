//! Mock transport for testing
//!
//! Scripted responses let the controller run end to end without a network.

use crate::transport::{ByteStream, ChatTransport, TransportError};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::Mutex;

// ============================================================================
// Mock Transport
// ============================================================================

/// One scripted reply to `open`
pub enum MockResponse {
    /// Body chunks, delivered in order
    Stream {
        chunks: Vec<Result<Vec<u8>, TransportError>>,
        /// Keep the body open after the last chunk instead of ending it
        hold_open: bool,
    },
    /// `open` fails
    Error(TransportError),
    /// `open` never resolves
    Hang,
}

impl MockResponse {
    pub fn lines(lines: &[&str]) -> Self {
        let body: String = lines.iter().map(|l| format!("{l}\n")).collect();
        Self::chunks(&[body.as_bytes()])
    }

    pub fn chunks(chunks: &[&[u8]]) -> Self {
        MockResponse::Stream {
            chunks: chunks.iter().map(|c| Ok(c.to_vec())).collect(),
            hold_open: false,
        }
    }

    #[must_use]
    pub fn held_open(self) -> Self {
        match self {
            MockResponse::Stream { chunks, .. } => MockResponse::Stream {
                chunks,
                hold_open: true,
            },
            other => other,
        }
    }

    #[must_use]
    pub fn then_fail(self, error: TransportError) -> Self {
        match self {
            MockResponse::Stream {
                mut chunks,
                hold_open,
            } => {
                chunks.push(Err(error));
                MockResponse::Stream { chunks, hold_open }
            }
            other => other,
        }
    }
}

/// Transport that replays queued responses
pub struct MockTransport {
    responses: Mutex<VecDeque<MockResponse>>,
    /// Record of all messages sent
    pub requests: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_response(self, response: MockResponse) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn recorded_requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn open(&self, message: &str) -> Result<ByteStream, TransportError> {
        self.requests.lock().unwrap().push(message.to_string());
        let response = self.responses.lock().unwrap().pop_front();
        match response {
            Some(MockResponse::Stream { chunks, hold_open }) => {
                let body = stream::iter(chunks);
                if hold_open {
                    Ok(body.chain(stream::pending()).boxed())
                } else {
                    Ok(body.boxed())
                }
            }
            Some(MockResponse::Error(e)) => Err(e),
            Some(MockResponse::Hang) => std::future::pending().await,
            None => Err(TransportError::connect("No mock response queued")),
        }
    }

    fn endpoint(&self) -> &str {
        "mock://chat"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SessionController, SessionOutcome};
    use crate::state_machine::{ConvState, Message, Role, SessionPhase, StepStatus};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    const BOM_STREAM: &str = concat!(
        r#"data: {"type":"component","component":{"id":"s1","title":"Executing: get-bom","data":{"status":"started"}}}"#,
        "\n",
        r#"data: {"type":"token","content":"The "}"#,
        "\n\n",
        r#"data: {"type":"token","content":"BOM is..."}"#,
        "\n",
        r#"data: {"type":"component","component":{"id":"s1","title":"Completed: get-bom","data":{"status":"completed"}}}"#,
        "\n",
        "data: [DONE]\n",
    );

    async fn wait_until(
        controller: &SessionController<MockTransport>,
        predicate: impl FnMut(&ConvState) -> bool,
    ) {
        let mut rx = controller.subscribe();
        timeout(Duration::from_secs(5), rx.wait_for(predicate))
            .await
            .expect("timed out waiting for state")
            .expect("state channel closed");
    }

    #[tokio::test]
    async fn test_bom_scenario_across_odd_chunk_boundaries() {
        let bytes = BOM_STREAM.as_bytes();
        let pieces: Vec<&[u8]> = bytes.chunks(7).collect();
        let transport = MockTransport::new().with_response(MockResponse::chunks(&pieces));
        let controller = SessionController::new(transport);

        let outcome = controller.submit("What is the BOM for part X?").await;
        assert_eq!(outcome, SessionOutcome::Completed);

        let state = controller.snapshot();
        assert_eq!(state.phase, SessionPhase::Done);
        assert!(!state.loading());
        assert_eq!(state.error, None);
        assert_eq!(
            state.messages,
            vec![
                Message::user("What is the BOM for part X?"),
                Message::assistant("The BOM is..."),
            ]
        );
        // Seed step plus the single upserted tool step
        assert_eq!(state.steps.len(), 2);
        let step = state.step("s1").unwrap();
        assert_eq!(step.title, "BOM Agent: BOM retrieval complete");
        assert_eq!(step.status, StepStatus::Completed);
        assert_eq!(
            controller.transport.recorded_requests(),
            vec!["What is the BOM for part X?".to_string()]
        );
    }

    #[tokio::test]
    async fn test_malformed_record_does_not_break_tokens() {
        let transport = MockTransport::new().with_response(MockResponse::lines(&[
            r#"{"type":"token","content":"f1"}"#,
            "<garbage>",
            r#"{"type":"mystery","content":"ignored"}"#,
            r#"{"type":"token","content":"f2"}"#,
        ]));
        let controller = SessionController::new(transport);

        assert_eq!(controller.submit("q").await, SessionOutcome::Completed);
        assert_eq!(controller.snapshot().last_assistant_text(), Some("f1f2"));
    }

    #[tokio::test]
    async fn test_open_failure_leaves_no_empty_bubble() {
        let transport = MockTransport::new().with_response(MockResponse::Error(
            TransportError::status(502, Some("Bad Gateway")),
        ));
        let controller = SessionController::new(transport);

        let outcome = controller.submit("q").await;
        assert_eq!(outcome, SessionOutcome::Failed("HTTP 502: Bad Gateway".to_string()));

        let state = controller.snapshot();
        assert_eq!(state.messages, vec![Message::user("q")]);
        assert_eq!(state.error.as_deref(), Some("HTTP 502: Bad Gateway"));
        assert_eq!(state.phase, SessionPhase::Errored);
        assert!(!state.loading());
    }

    #[tokio::test]
    async fn test_stream_failure_without_tokens_drops_bubble() {
        let transport = MockTransport::new().with_response(
            MockResponse::lines(&[r#"{"type":"component","component":{"title":"Executing: tavily"}}"#])
                .then_fail(TransportError::read("connection reset")),
        );
        let controller = SessionController::new(transport);

        let outcome = controller.submit("q").await;
        assert_eq!(outcome, SessionOutcome::Failed("connection reset".to_string()));
        let state = controller.snapshot();
        assert!(state.messages.iter().all(|m| m.role == Role::User));
        // Steps applied before the failure are kept
        assert_eq!(state.steps.len(), 2);
    }

    #[tokio::test]
    async fn test_stream_failure_after_tokens_keeps_text() {
        let transport = MockTransport::new().with_response(
            MockResponse::lines(&[r#"{"type":"token","content":"partial"}"#])
                .then_fail(TransportError::read("connection reset")),
        );
        let controller = SessionController::new(transport);

        controller.submit("q").await;
        let state = controller.snapshot();
        assert_eq!(state.last_assistant_text(), Some("partial"));
        assert_eq!(state.error.as_deref(), Some("connection reset"));
    }

    #[tokio::test]
    async fn test_blank_input_is_rejected() {
        let controller = SessionController::new(MockTransport::new());
        assert_eq!(controller.submit("   ").await, SessionOutcome::Rejected);
        assert_eq!(controller.snapshot(), ConvState::new());
        assert!(controller.transport.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_mid_stream_is_silent() {
        let transport = MockTransport::new().with_response(
            MockResponse::lines(&[r#"{"type":"token","content":"half"}"#]).held_open(),
        );
        let controller = Arc::new(SessionController::new(transport));

        let task = tokio::spawn({
            let controller = controller.clone();
            async move { controller.submit("q").await }
        });

        wait_until(&controller, |s| s.last_assistant_text() == Some("half")).await;
        controller.cancel();

        let outcome = timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
        assert_eq!(outcome, SessionOutcome::Cancelled);

        let state = controller.snapshot();
        assert_eq!(state.phase, SessionPhase::Cancelled);
        assert_eq!(state.error, None);
        assert!(!state.loading());
        assert_eq!(state.last_assistant_text(), Some("half"));
    }

    #[tokio::test]
    async fn test_cancel_while_sending() {
        let transport = MockTransport::new().with_response(MockResponse::Hang);
        let controller = Arc::new(SessionController::new(transport));

        let task = tokio::spawn({
            let controller = controller.clone();
            async move { controller.submit("q").await }
        });

        wait_until(&controller, |s| s.phase == SessionPhase::Sending).await;
        controller.cancel();

        let outcome = timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
        assert_eq!(outcome, SessionOutcome::Cancelled);
        assert_eq!(controller.snapshot().messages, vec![Message::user("q")]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancel_as_soon_as_loading_is_visible() {
        for _ in 0..50 {
            let transport = MockTransport::new().with_response(MockResponse::Hang);
            let controller = Arc::new(SessionController::new(transport));

            // Cancels from another worker the moment the submission shows up
            let mut rx = controller.subscribe();
            let canceller = tokio::spawn({
                let controller = controller.clone();
                async move {
                    if rx.wait_for(ConvState::loading).await.is_ok() {
                        controller.cancel();
                    }
                }
            });

            let outcome = timeout(Duration::from_secs(5), controller.submit("q"))
                .await
                .expect("cancel was lost");
            assert_eq!(outcome, SessionOutcome::Cancelled);
            canceller.await.unwrap();
            assert_eq!(controller.snapshot().phase, SessionPhase::Cancelled);
        }
    }

    #[tokio::test]
    async fn test_submit_while_streaming_is_rejected() {
        let transport = MockTransport::new().with_response(
            MockResponse::lines(&[r#"{"type":"token","content":"busy"}"#]).held_open(),
        );
        let controller = Arc::new(SessionController::new(transport));

        let task = tokio::spawn({
            let controller = controller.clone();
            async move { controller.submit("first").await }
        });
        wait_until(&controller, |s| s.phase == SessionPhase::Streaming).await;

        assert_eq!(controller.submit("second").await, SessionOutcome::Rejected);
        assert_eq!(controller.transport.recorded_requests().len(), 1);

        controller.cancel();
        timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_cancel_when_idle_is_noop() {
        let controller = SessionController::new(MockTransport::new());
        controller.cancel();
        assert_eq!(controller.snapshot().phase, SessionPhase::Idle);
    }

    #[tokio::test]
    async fn test_follow_up_submission_after_error() {
        let transport = MockTransport::new()
            .with_response(MockResponse::Error(TransportError::connect("refused")))
            .with_response(MockResponse::lines(&[r#"{"type":"token","content":"ok"}"#]));
        let controller = SessionController::new(transport);

        assert!(matches!(controller.submit("one").await, SessionOutcome::Failed(_)));
        assert_eq!(controller.submit("two").await, SessionOutcome::Completed);

        let state = controller.snapshot();
        assert_eq!(state.error, None);
        assert_eq!(
            state.messages,
            vec![Message::user("one"), Message::user("two"), Message::assistant("ok")]
        );
    }

    #[tokio::test]
    async fn test_subscribers_see_text_grow_monotonically() {
        let transport = MockTransport::new().with_response(MockResponse::lines(&[
            r#"{"type":"token","content":"a"}"#,
            r#"{"type":"token","content":"b"}"#,
            r#"{"type":"token","content":"c"}"#,
        ]));
        let controller = Arc::new(SessionController::new(transport));
        let mut rx = controller.subscribe();

        let watcher = tokio::spawn(async move {
            let mut seen = Vec::new();
            while rx.changed().await.is_ok() {
                let state = rx.borrow_and_update().clone();
                if let Some(text) = state.last_assistant_text() {
                    seen.push(text.to_string());
                }
                if !state.loading() && state.phase != SessionPhase::Idle {
                    break;
                }
            }
            seen
        });

        controller.submit("q").await;
        let seen = timeout(Duration::from_secs(5), watcher).await.unwrap().unwrap();
        for pair in seen.windows(2) {
            assert!(pair[1].starts_with(pair[0].as_str()), "text shrank: {seen:?}");
        }
        assert_eq!(seen.last().map(String::as_str), Some("abc"));
    }
}
