//! Failure counters.
//!
//! Every coordinator owns its own sink; nothing here is process-global.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::error::ErrorCategory;

/// Destination for failure bookkeeping. Injectable so tests can assert
/// call counts without shared global state.
pub trait StatsSink: Send + Sync {
    /// A failure was observed and classified.
    fn record_error(&self, category: ErrorCategory, retryable: bool);
    /// A retry was scheduled.
    fn record_retry(&self);
}

/// Default [`StatsSink`]: thread-safe counters with an explicit reset.
#[derive(Debug, Default)]
pub struct ErrorStats {
    total_errors: AtomicU64,
    total_retries: AtomicU64,
    retryable_errors: AtomicU64,
    non_retryable_errors: AtomicU64,
    by_category: Mutex<HashMap<ErrorCategory, u64>>,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub total_errors: u64,
    pub total_retries: u64,
    pub retryable_errors: u64,
    pub non_retryable_errors: u64,
    pub by_category: HashMap<ErrorCategory, u64>,
}

impl ErrorStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_errors: self.total_errors.load(Ordering::Relaxed),
            total_retries: self.total_retries.load(Ordering::Relaxed),
            retryable_errors: self.retryable_errors.load(Ordering::Relaxed),
            non_retryable_errors: self.non_retryable_errors.load(Ordering::Relaxed),
            by_category: self
                .by_category
                .lock()
                .map(|map| map.clone())
                .unwrap_or_default(),
        }
    }

    /// Clear every counter.
    pub fn reset(&self) {
        self.total_errors.store(0, Ordering::Relaxed);
        self.total_retries.store(0, Ordering::Relaxed);
        self.retryable_errors.store(0, Ordering::Relaxed);
        self.non_retryable_errors.store(0, Ordering::Relaxed);
        if let Ok(mut map) = self.by_category.lock() {
            map.clear();
        }
    }
}

impl StatsSink for ErrorStats {
    fn record_error(&self, category: ErrorCategory, retryable: bool) {
        self.total_errors.fetch_add(1, Ordering::Relaxed);
        if retryable {
            self.retryable_errors.fetch_add(1, Ordering::Relaxed);
        } else {
            self.non_retryable_errors.fetch_add(1, Ordering::Relaxed);
        }
        if let Ok(mut map) = self.by_category.lock() {
            *map.entry(category).or_insert(0) += 1;
        }
    }

    fn record_retry(&self) {
        self.total_retries.fetch_add(1, Ordering::Relaxed);
    }
}
