//! Stream session bookkeeping.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use uuid::Uuid;

/// Lifecycle of one streaming exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Starting,
    Streaming,
    Interrupted,
    Completed,
    Failed,
}

/// Cooperative interruption signal.
///
/// Polled at chunk boundaries; also wakes a pending backoff sleep so
/// interruption latency is not bounded by the longest pending delay.
#[derive(Debug, Default)]
pub struct InterruptFlag {
    flag: AtomicBool,
    notify: Notify,
}

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Sleep for `duration` unless interrupted first. Returns whether
    /// the flag was set on wake-up.
    pub async fn sleep(&self, duration: Duration) -> bool {
        // Register the waiter before checking the flag so a trigger
        // between the check and the select cannot be lost.
        let notified = self.notify.notified();
        if self.is_set() {
            return true;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = notified => {}
        }
        self.is_set()
    }
}

/// Bookkeeping for one logical streaming request/response exchange.
#[derive(Debug)]
pub struct StreamSession {
    pub stream_id: Uuid,
    pub state: SessionState,
    pub attempt: u32,
    pub accumulated: String,
    pub interrupt: Arc<InterruptFlag>,
}

impl StreamSession {
    pub fn new() -> Self {
        Self {
            stream_id: Uuid::new_v4(),
            state: SessionState::Idle,
            attempt: 0,
            accumulated: String::new(),
            interrupt: Arc::new(InterruptFlag::new()),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Starting | SessionState::Streaming)
    }
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}
