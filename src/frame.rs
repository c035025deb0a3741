//! Frame decoding for the newline-delimited event stream
//!
//! Turns a byte stream that arrives at arbitrary chunk boundaries into
//! discrete text records. The pending buffer holds raw bytes so a chunk that
//! ends inside a multi-byte UTF-8 sequence decodes the same as an unsplit one.

use futures::stream::{Stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Literal terminator line. A no-op, not end-of-stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Optional framing marker stripped from the front of a record.
pub const DATA_PREFIX: &str = "data: ";

const RECORD_SEPARATOR: u8 = b'\n';

/// Incremental line splitter that owns the pending (incomplete) fragment
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, returning every record it completed.
    ///
    /// The trailing fragment after the last separator stays buffered until a
    /// later chunk completes it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        if chunk.is_empty() {
            return Vec::new();
        }
        self.buffer.extend_from_slice(chunk);

        let mut records = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == RECORD_SEPARATOR) {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line[..pos]);
            if let Some(record) = clean_record(&text) {
                records.push(record.to_string());
            }
        }
        records
    }

    /// Number of bytes waiting for a separator
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// End of transport. A partial trailing record is not recoverable and is
    /// discarded.
    pub fn finish(self) {
        if self.buffer.is_empty() {
            return;
        }
        let text = String::from_utf8_lossy(&self.buffer);
        if clean_record(&text).is_some() {
            tracing::debug!(
                bytes = self.buffer.len(),
                "Discarding incomplete trailing record"
            );
        }
    }
}

/// Normalize one line into a record for the interpreter.
///
/// Returns `None` for blank lines and the terminator sentinel, with or
/// without the framing marker.
#[must_use]
pub fn clean_record(line: &str) -> Option<&str> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.trim().is_empty() || line == DONE_SENTINEL {
        return None;
    }
    let payload = line.strip_prefix(DATA_PREFIX).unwrap_or(line);
    if payload.trim().is_empty() || payload.trim() == DONE_SENTINEL {
        return None;
    }
    Some(payload)
}

/// Lazy record sequence over a chunk stream.
///
/// Records are yielded strictly in receipt order. A chunk error is passed
/// through as-is; the end of the chunk stream ends the sequence.
pub struct Frames<S> {
    chunks: S,
    decoder: Option<FrameDecoder>,
    ready: VecDeque<String>,
}

impl<S> Frames<S> {
    pub fn new(chunks: S) -> Self {
        Self {
            chunks,
            decoder: Some(FrameDecoder::new()),
            ready: VecDeque::new(),
        }
    }
}

impl<S, E> Stream for Frames<S>
where
    S: Stream<Item = Result<Vec<u8>, E>> + Unpin,
{
    type Item = Result<String, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            if let Some(record) = this.ready.pop_front() {
                return Poll::Ready(Some(Ok(record)));
            }
            let Some(decoder) = this.decoder.as_mut() else {
                return Poll::Ready(None);
            };
            match futures::ready!(this.chunks.poll_next_unpin(cx)) {
                Some(Ok(chunk)) => this.ready.extend(decoder.push(&chunk)),
                Some(Err(e)) => return Poll::Ready(Some(Err(e))),
                None => {
                    if let Some(decoder) = this.decoder.take() {
                        decoder.finish();
                    }
                }
            }
        }
    }
}
