//! Retry and time-bound helpers shared by the HTTP providers

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::error::BackendError;

/// Retry `operation` with exponential backoff while `should_retry` allows it
pub(crate) async fn retry_with_backoff<F, Fut, T, E>(
    max_retries: u32,
    base_delay: Duration,
    should_retry: impl Fn(&E) -> bool,
    operation: F,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt < max_retries && should_retry(&e) => {
                let delay = backoff_delay(base_delay, attempt);
                tracing::warn!(
                    "Request failed (attempt {}/{}): {}, retrying in {:?}",
                    attempt + 1,
                    max_retries + 1,
                    e,
                    delay
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Exponent capped at 2^16 so large retry counts cannot overflow
fn backoff_delay(base_delay: Duration, attempt: u32) -> Duration {
    base_delay.saturating_mul(2u32.saturating_pow(attempt.min(16)))
}

/// Bound a backend call; elapsing maps to [`BackendError::Timeout`]
pub(crate) async fn with_timeout<T>(
    timeout: Duration,
    call: impl Future<Output = Result<T, BackendError>>,
) -> Result<T, BackendError> {
    tokio::time::timeout(timeout, call)
        .await
        .unwrap_or(Err(BackendError::Timeout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, BackendError> = retry_with_backoff(
            3,
            Duration::from_millis(1),
            BackendError::is_retryable,
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(BackendError::Provider("busy".to_string()))
                } else {
                    Ok(n)
                }
            },
        )
        .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_returns_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), BackendError> = retry_with_backoff(
            3,
            Duration::from_millis(1),
            BackendError::is_retryable,
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(BackendError::EmptyResponse)
            },
        )
        .await;

        assert_eq!(result, Err(BackendError::EmptyResponse));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_delay_is_capped() {
        let base = Duration::from_millis(10);
        assert_eq!(backoff_delay(base, 0), base);
        assert_eq!(backoff_delay(base, 3), base * 8);
        assert_eq!(backoff_delay(base, 40), backoff_delay(base, 16));
    }

    #[tokio::test]
    async fn test_many_retries_do_not_overflow() {
        let calls = AtomicU32::new(0);
        let result: Result<(), BackendError> = retry_with_backoff(
            40,
            Duration::ZERO,
            BackendError::is_retryable,
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(BackendError::Provider("down".to_string()))
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 41);
    }

    #[tokio::test]
    async fn test_timeout_maps_to_backend_timeout() {
        let result = with_timeout(Duration::from_millis(10), async {
            sleep(Duration::from_secs(5)).await;
            Ok::<_, BackendError>("late")
        })
        .await;

        assert_eq!(result, Err(BackendError::Timeout));
    }
}
