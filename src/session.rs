//! Session controller
//!
//! Drives one submission at a time: issues the outbound call, feeds the
//! response body through frame decoding and event interpretation, and applies
//! each event to the conversation in arrival order. Consumers watch
//! [`ConvState`] snapshots through a `watch` channel.

#[cfg(test)]
pub(crate) mod testing;

use crate::event::{interpret_logged, StreamEvent};
use crate::frame::Frames;
use crate::state_machine::{transition, ConvState, Event, TransitionError};
use crate::transport::{ByteStream, ChatTransport};
use futures::StreamExt;
use std::sync::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// How a submission ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Transport closed normally
    Completed,
    /// Transport failed; the message is also in `ConvState::error`
    Failed(String),
    /// Cancelled by the consumer; not an error
    Cancelled,
    /// Blank input or a request already in flight; nothing changed
    Rejected,
}

pub struct SessionController<T: ChatTransport> {
    transport: T,
    state_tx: watch::Sender<ConvState>,
    /// Token for the in-flight request, if any
    cancel_token: Mutex<Option<CancellationToken>>,
}

impl<T: ChatTransport> SessionController<T> {
    pub fn new(transport: T) -> Self {
        let (state_tx, _) = watch::channel(ConvState::new());
        Self {
            transport,
            state_tx,
            cancel_token: Mutex::new(None),
        }
    }

    /// Receiver that observes every applied snapshot
    pub fn subscribe(&self) -> watch::Receiver<ConvState> {
        self.state_tx.subscribe()
    }

    /// Current snapshot
    pub fn snapshot(&self) -> ConvState {
        self.state_tx.borrow().clone()
    }

    /// Abort the in-flight request. No-op when idle.
    pub fn cancel(&self) {
        if let Some(token) = self.lock_token().take() {
            tracing::info!("Cancelling chat request");
            token.cancel();
        }
    }

    /// Run one submission to completion.
    ///
    /// Returns once the stream ends, fails, or is cancelled.
    pub async fn submit(&self, text: &str) -> SessionOutcome {
        if text.trim().is_empty() {
            return SessionOutcome::Rejected;
        }

        // The token goes in while the lock is held, so a cancel issued as
        // soon as `loading` is visible always finds it
        let cancel = {
            let mut slot = self.lock_token();
            if let Err(e) = self.apply(Event::submit(text)) {
                tracing::warn!(error = %e, "Submission rejected");
                return SessionOutcome::Rejected;
            }
            let cancel = CancellationToken::new();
            *slot = Some(cancel.clone());
            cancel
        };
        tracing::info!(endpoint = %self.transport.endpoint(), "Sending chat request");

        let outcome = self.run(text, &cancel).await;

        let finished = match &outcome {
            SessionOutcome::Completed => Event::StreamEnded,
            SessionOutcome::Failed(message) => Event::transport_failed(message.clone()),
            SessionOutcome::Cancelled | SessionOutcome::Rejected => Event::Cancelled,
        };
        {
            // Cleared together with the phase change, so a follow-up
            // submission's token is never touched
            let mut slot = self.lock_token();
            *slot = None;
            self.apply_logged(finished);
        }

        tracing::info!(outcome = ?outcome, "Chat request finished");
        outcome
    }

    async fn run(&self, text: &str, cancel: &CancellationToken) -> SessionOutcome {
        let body: ByteStream = tokio::select! {
            biased;

            () = cancel.cancelled() => return SessionOutcome::Cancelled,

            result = self.transport.open(text) => match result {
                Ok(body) => body,
                Err(e) => return SessionOutcome::Failed(e.message),
            },
        };

        self.apply_logged(Event::StreamOpened);

        let mut frames = Frames::new(body);
        loop {
            let next = tokio::select! {
                biased;

                () = cancel.cancelled() => return SessionOutcome::Cancelled,

                next = frames.next() => next,
            };

            match next {
                Some(Ok(record)) => {
                    let Some(event) = interpret_logged(&record) else {
                        continue;
                    };
                    self.apply_logged(match event {
                        StreamEvent::Token(text) => Event::Token(text),
                        StreamEvent::Component(update) => Event::component(update),
                    });
                }
                Some(Err(e)) => return SessionOutcome::Failed(e.message),
                None => return SessionOutcome::Completed,
            }
        }
    }

    /// Apply one event atomically with respect to other writers
    fn apply(&self, event: Event) -> Result<(), TransitionError> {
        let mut outcome = Ok(());
        self.state_tx.send_if_modified(|state| match transition(state, event) {
            Ok(next) => {
                *state = next;
                true
            }
            Err(e) => {
                outcome = Err(e);
                false
            }
        });
        outcome
    }

    fn apply_logged(&self, event: Event) {
        let name = event.name();
        if let Err(e) = self.apply(event) {
            tracing::error!(event = name, error = %e, "Dropping event");
        }
    }

    fn lock_token(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.cancel_token
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
