//! Chunk delivery to the caller.

use tokio::sync::mpsc;

use crate::error::{Result, SkaldError};

/// Receives streamed fragments.
///
/// `on_chunk(text, false)` is called once per fragment in arrival order,
/// then exactly once with `("", true)` as the completion signal — also
/// for empty streams. An error returned from `on_chunk` is isolated from
/// the producer: it is reported via [`on_error`] and relaying continues.
///
/// [`on_error`]: ChunkSink::on_error
pub trait ChunkSink: Send + Sync {
    fn on_chunk(&self, text: &str, is_final: bool) -> Result<()>;

    /// Called when a sink callback fails, and once with the terminal
    /// error when all stream attempts are exhausted.
    fn on_error(&self, _error: &SkaldError) {}
}

/// Event emitted by [`ChannelSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Chunk { text: String, is_final: bool },
    Error(String),
}

/// [`ChunkSink`] forwarding events over an unbounded channel, for
/// callers that consume the stream from another task.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<StreamEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StreamEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ChunkSink for ChannelSink {
    fn on_chunk(&self, text: &str, is_final: bool) -> Result<()> {
        self.tx
            .send(StreamEvent::Chunk {
                text: text.to_string(),
                is_final,
            })
            .map_err(|_| SkaldError::stream("chunk receiver dropped"))
    }

    fn on_error(&self, error: &SkaldError) {
        let _ = self.tx.send(StreamEvent::Error(error.to_string()));
    }
}
