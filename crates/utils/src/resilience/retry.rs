//! Retry loop for fallible async operations.

use super::config::RetryConfig;
use std::future::Future;
use ticketry_core::{Error, Result};
use tokio::time::sleep;

/// Execute an operation with retry logic.
///
/// Returns the first success, the first non-retryable error, or the last
/// error once `max_retries` retries have been spent.
pub async fn retry<F, Fut, T>(config: &RetryConfig, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = None;

    for attempt in 0..=config.max_retries {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::debug!(retries = attempt, "operation succeeded after retrying");
                }
                return Ok(result);
            }
            Err(error) => {
                if attempt < config.max_retries && config.should_retry(&error) {
                    let delay = config.calculate_delay(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = config.max_attempts(),
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "operation failed, retrying"
                    );
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                    last_error = Some(error);
                } else {
                    return Err(error);
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| Error::configuration("retry loop ended unexpectedly")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn quick(max_retries: usize) -> RetryConfig {
        RetryConfig::for_conflicts(max_retries).with_fixed_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_succeeds_after_conflicts_within_budget() -> Result<()> {
        let calls = AtomicUsize::new(0);
        let value = retry(&quick(3), || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 3 {
                Err(Error::conflict("TGT-1", "update"))
            } else {
                Ok(42)
            }
        })
        .await?;

        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let calls = AtomicUsize::new(0);
        let result: Result<()> = retry(&quick(2), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::conflict("TGT-1", "update"))
        })
        .await;

        assert!(result.unwrap_err().is_conflict());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_returns_immediately() {
        let calls = AtomicUsize::new(0);
        let result: Result<()> = retry(&quick(5), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::backend("sql", "replace", "disk full"))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
