//! Generic run-with-retry wrapper.

use std::future::Future;
use std::sync::Arc;

use tracing::{error, warn};

use crate::error::{Classifier, ErrorCategory, Result, SkaldError};

use super::stats::{ErrorStats, StatsSink};
use super::RetryPolicy;

/// Classified failure handed back by [`RetryCoordinator::safe_execute`].
#[derive(Debug)]
pub struct ErrorInfo {
    pub category: ErrorCategory,
    pub message: String,
    pub source: SkaldError,
}

/// Runs operations with classification-driven retry.
///
/// Non-retryable failures are returned to the caller unchanged; retryable
/// ones are retried with exponential backoff until the policy is
/// exhausted, at which point they surface wrapped in
/// [`SkaldError::RetriesExhausted`].
pub struct RetryCoordinator {
    policy: RetryPolicy,
    classifier: Classifier,
    sink: Arc<dyn StatsSink>,
}

impl RetryCoordinator {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_sink(policy, Arc::new(ErrorStats::new()))
    }

    /// Coordinator reporting into an injected sink.
    pub fn with_sink(policy: RetryPolicy, sink: Arc<dyn StatsSink>) -> Self {
        Self {
            policy,
            classifier: Classifier::new(),
            sink,
        }
    }

    /// Replace the default classifier (e.g. to add heuristic rules).
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Run `operation`, retrying retryable failures.
    ///
    /// `max_retries` overrides the policy's count for this call.
    pub async fn execute_with_retry<F, Fut, T>(
        &self,
        mut operation: F,
        max_retries: Option<u32>,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_retries = max_retries.unwrap_or(self.policy.max_retries);
        let mut attempt = 0u32;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let classified = self.classifier.classify(&err);
                    let retryable = classified.category.is_retryable();
                    self.sink.record_error(classified.category, retryable);

                    if !retryable {
                        error!(
                            category = %classified.category,
                            "non-retryable error: {}", classified.message
                        );
                        return Err(err);
                    }

                    if attempt >= max_retries {
                        error!(
                            category = %classified.category,
                            retries = attempt,
                            "retries exhausted: {}", classified.message
                        );
                        return Err(SkaldError::RetriesExhausted {
                            category: classified.category,
                            retries: attempt,
                            source: Box::new(err),
                        });
                    }

                    self.sink.record_retry();
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = max_retries + 1,
                        delay_ms = delay.as_millis() as u64,
                        category = %classified.category,
                        "retrying after error: {}", classified.message
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Run `operation` once, capturing any failure as [`ErrorInfo`]
    /// instead of propagating it.
    pub async fn safe_execute<Fut, T>(&self, operation: Fut) -> std::result::Result<T, ErrorInfo>
    where
        Fut: Future<Output = Result<T>>,
    {
        match operation.await {
            Ok(value) => Ok(value),
            Err(err) => {
                let classified = self.classifier.classify(&err);
                self.sink
                    .record_error(classified.category, classified.category.is_retryable());
                Err(ErrorInfo {
                    category: classified.category,
                    message: classified.message,
                    source: err,
                })
            }
        }
    }
}
