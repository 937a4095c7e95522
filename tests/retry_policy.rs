use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use govdata_dashboard::error::FetchError;
use govdata_dashboard::retry::{run_with_retry, RetryPolicy};

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_delay: Duration::from_millis(1),
    }
}

fn no_response() -> FetchError {
    FetchError::NoResponse {
        context: "search datasets",
        source: "connect timeout".into(),
    }
}

#[tokio::test]
async fn first_attempt_success_makes_a_single_call() {
    let calls = AtomicU32::new(0);

    let result = run_with_retry(fast_policy(3), FetchError::is_retryable, || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, FetchError>(42u64) }
    })
    .await;

    assert_eq!(result.expect("first attempt should succeed"), 42);
    assert_eq!(calls.load(Ordering::SeqCst), 1, "no retries expected");
}

#[tokio::test]
async fn transient_failures_are_retried_until_success() {
    let calls = AtomicU32::new(0);

    let result = run_with_retry(fast_policy(3), FetchError::is_retryable, || {
        let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            if attempt < 3 {
                Err(no_response())
            } else {
                Ok(attempt)
            }
        }
    })
    .await;

    assert_eq!(result.expect("third attempt should succeed"), 3);
    assert_eq!(
        calls.load(Ordering::SeqCst),
        3,
        "two transient failures then one success means three calls"
    );
}

#[tokio::test]
async fn non_retryable_failure_short_circuits() {
    let calls = AtomicU32::new(0);

    let result: Result<u64, _> = run_with_retry(fast_policy(5), FetchError::is_retryable, || {
        calls.fetch_add(1, Ordering::SeqCst);
        async {
            Err(FetchError::Status {
                context: "search datasets",
                status: 404,
            })
        }
    })
    .await;

    let exhausted = result.expect_err("a 4xx must not be retried");
    assert_eq!(
        exhausted.attempts, 1,
        "exactly one attempt for a permanent failure"
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn budget_exhaustion_reports_attempt_count_and_last_error() {
    let calls = AtomicU32::new(0);

    let result: Result<u64, _> = run_with_retry(fast_policy(3), FetchError::is_retryable, || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err(no_response()) }
    })
    .await;

    let exhausted = result.expect_err("the budget of 3 attempts must be spent");
    assert_eq!(exhausted.attempts, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(
        exhausted.source.is_retryable(),
        "the reported source is the transient error that kept failing"
    );
}

#[tokio::test]
async fn zero_attempt_budget_still_runs_the_operation_once() {
    let calls = AtomicU32::new(0);

    let result: Result<u64, _> = run_with_retry(fast_policy(0), FetchError::is_retryable, || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err(no_response()) }
    })
    .await;

    let exhausted = result.expect_err("operation keeps failing");
    assert_eq!(exhausted.attempts, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
