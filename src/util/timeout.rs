//! Timeout helper.

use std::future::Future;
use std::time::Duration;

use crate::error::SkaldError;

/// Wrap a future with a hard timeout.
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T, SkaldError>>,
) -> Result<T, SkaldError> {
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(SkaldError::Timeout(duration.as_millis() as u64)),
    }
}
