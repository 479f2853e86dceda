//! Tests for the retry coordinator.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use skald::error::{ErrorCategory, SkaldError};
use skald::retry::{ErrorStats, RetryCoordinator, RetryPolicy};

fn fast_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(100),
        backoff_factor: 2.0,
    }
}

fn connection_error() -> SkaldError {
    SkaldError::Io(std::io::Error::new(
        std::io::ErrorKind::ConnectionRefused,
        "connection refused",
    ))
}

#[tokio::test(start_paused = true)]
async fn retryable_errors_are_retried_until_success() {
    let coordinator = RetryCoordinator::new(fast_policy(4));
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_for_op = attempts.clone();

    let result = coordinator
        .execute_with_retry(
            || {
                let attempts = attempts_for_op.clone();
                async move {
                    if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(connection_error())
                    } else {
                        Ok("ok")
                    }
                }
            },
            None,
        )
        .await;

    assert_eq!(result.unwrap(), "ok");
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn non_retryable_errors_are_returned_unchanged_after_one_attempt() {
    let stats = Arc::new(ErrorStats::new());
    let coordinator = RetryCoordinator::with_sink(fast_policy(5), stats.clone());
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_for_op = attempts.clone();

    let result: Result<(), _> = coordinator
        .execute_with_retry(
            || {
                let attempts = attempts_for_op.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(SkaldError::Authentication("bad-key".into()))
                }
            },
            None,
        )
        .await;

    match result {
        Err(SkaldError::Authentication(message)) => assert_eq!(message, "bad-key"),
        other => panic!("expected the original authentication error, got {other:?}"),
    }
    assert_eq!(attempts.load(Ordering::SeqCst), 1);

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.total_errors, 1);
    assert_eq!(snapshot.total_retries, 0);
    assert_eq!(snapshot.non_retryable_errors, 1);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_surface_category_and_count() {
    let stats = Arc::new(ErrorStats::new());
    let coordinator = RetryCoordinator::with_sink(fast_policy(2), stats.clone());

    let result: Result<(), _> = coordinator
        .execute_with_retry(|| async { Err(connection_error()) }, None)
        .await;

    match result {
        Err(SkaldError::RetriesExhausted {
            category,
            retries,
            source,
        }) => {
            assert_eq!(category, ErrorCategory::Connection);
            assert_eq!(retries, 2);
            assert!(matches!(*source, SkaldError::Io(_)));
        }
        other => panic!("expected retries-exhausted, got {other:?}"),
    }

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.total_errors, 3);
    assert_eq!(snapshot.total_retries, 2);
    assert_eq!(snapshot.retryable_errors, 3);
    assert_eq!(snapshot.by_category[&ErrorCategory::Connection], 3);
}

#[tokio::test(start_paused = true)]
async fn backoff_delays_follow_the_policy() {
    let coordinator = RetryCoordinator::new(RetryPolicy {
        max_retries: 2,
        base_delay: Duration::from_secs(1),
        max_delay: Duration::from_secs(10),
        backoff_factor: 2.0,
    });

    let start = tokio::time::Instant::now();
    let result: Result<(), _> = coordinator
        .execute_with_retry(|| async { Err(connection_error()) }, None)
        .await;

    assert!(result.is_err());
    // 1s after the first failure, 2s after the second.
    assert_eq!(start.elapsed(), Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn per_call_override_trumps_the_policy_count() {
    let coordinator = RetryCoordinator::new(fast_policy(5));
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_for_op = attempts.clone();

    let result: Result<(), _> = coordinator
        .execute_with_retry(
            || {
                let attempts = attempts_for_op.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(connection_error())
                }
            },
            Some(1),
        )
        .await;

    assert!(matches!(
        result,
        Err(SkaldError::RetriesExhausted { retries: 1, .. })
    ));
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn safe_execute_never_propagates() {
    let stats = Arc::new(ErrorStats::new());
    let coordinator = RetryCoordinator::with_sink(fast_policy(3), stats.clone());

    let ok = coordinator.safe_execute(async { Ok::<_, SkaldError>(21) }).await;
    assert_eq!(ok.unwrap(), 21);

    let err = coordinator
        .safe_execute(async { Err::<(), _>(SkaldError::api(503, "down")) })
        .await
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::Server);
    assert!(err.message.contains("Server error"));
    assert!(matches!(err.source, SkaldError::Api { status: 503, .. }));

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.total_errors, 1);
    assert_eq!(snapshot.total_retries, 0);
}

#[tokio::test]
async fn stats_reset_clears_counters() {
    let stats = Arc::new(ErrorStats::new());
    let coordinator = RetryCoordinator::with_sink(fast_policy(0), stats.clone());

    let _ = coordinator
        .safe_execute(async { Err::<(), _>(SkaldError::Cancelled) })
        .await;
    assert_eq!(stats.snapshot().total_errors, 1);

    stats.reset();
    assert_eq!(stats.snapshot().total_errors, 0);
    assert!(stats.snapshot().by_category.is_empty());
}
