//! Bounded retry wrapper
//!
//! Sole mechanism for transient error tolerance in the engine. Attempts
//! are separated by a short fixed pause, enough for a contending writer
//! to finish its commit; longer stalls are the store's busy timeout's job.

use dubsync_common::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info};

/// Pause between attempts.
const RETRY_DELAY: Duration = Duration::from_millis(50);

/// Invoke `op` up to `max_attempts` times, returning the first success.
///
/// Logging per attempt: the first failure at error level (that one is the
/// surprise), intermediate failures at info, and exhaustion at error with
/// `context`. The final error is returned to the caller, never swallowed.
///
/// Validation errors are not retried: malformed input stays malformed no
/// matter how often it is re-submitted.
pub async fn with_retry<T, F, Fut>(max_attempts: u32, context: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt, context, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => {
                if matches!(err, Error::Validation(_)) {
                    error!(attempt, context, error = %err, "Operation failed on invalid input, not retrying");
                    return Err(err);
                }
                if attempt == 1 {
                    error!(attempt, context, error = %err, "Operation failed, will retry");
                } else if attempt < max_attempts {
                    info!(attempt, context, error = %err, "Retry attempt failed");
                }
                last_error = Some(err);
                if attempt < max_attempts {
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    }

    let err = last_error
        .unwrap_or_else(|| Error::Internal("with_retry invoked with zero attempts".to_string()));
    error!(max_attempts, context, error = %err, "Operation failed after all attempts");
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_first_attempt_without_noise() {
        let result = with_retry(10, "test op", || async { Ok::<i32, Error>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let attempts = AtomicU32::new(0);
        let result = with_retry(10, "test op", || {
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(Error::Internal("transient".to_string()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhaustion_returns_the_final_error() {
        let attempts = AtomicU32::new(0);
        let result: Result<()> = with_retry(4, "doomed op", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::Internal("still broken".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(Error::Internal(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn validation_errors_are_not_retried() {
        let attempts = AtomicU32::new(0);
        let result: Result<()> = with_retry(10, "caller bug", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::Validation("bad input".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
