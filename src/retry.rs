//! Bounded exponential backoff for fallible async operations.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tracing::debug;

/// Attempt budget and backoff shape for one class of operation.
///
/// `max_attempts` counts total attempts including the first call, so a value
/// of 3 allows at most two waits. Values below 1 behave as 1.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
        }
    }
}

/// Terminal failure of a retried operation: the last underlying error plus
/// how many attempts were spent on it.
#[derive(Debug, Error)]
#[error("operation failed after {attempts} attempt(s)")]
pub struct RetriesExhausted<E>
where
    E: std::error::Error + 'static,
{
    pub attempts: u32,
    #[source]
    pub source: E,
}

/// Run `operation` until it succeeds, the error is not retryable, or the
/// attempt budget is spent.
///
/// Between attempts the loop sleeps for the current delay plus a random
/// jitter of up to half the delay, then doubles the delay.
pub async fn run_with_retry<T, E, F, Fut, R>(
    policy: RetryPolicy,
    is_retryable: R,
    mut operation: F,
) -> Result<T, RetriesExhausted<E>>
where
    E: std::error::Error + 'static,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut delay = policy.initial_delay;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(source) => {
                if attempt >= max_attempts || !is_retryable(&source) {
                    return Err(RetriesExhausted {
                        attempts: attempt,
                        source,
                    });
                }
                let jitter = delay.mul_f64(rand::random::<f64>() * 0.5);
                let wait = delay + jitter;
                debug!(
                    attempt,
                    wait_ms = wait.as_millis() as u64,
                    error = %source,
                    "[RETRY] Backing off before next attempt"
                );
                sleep(wait).await;
                delay *= 2;
            }
        }
    }
}
