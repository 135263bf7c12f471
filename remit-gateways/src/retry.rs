//! Bounded retry with exponential backoff for gateway initiation.
//!
//! Only transport failures are retried; a decline is final.

use std::future::Future;
use std::time::Duration;

use remit_types::GatewayError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Delay before the given retry (attempt is zero-based).
    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

/// Runs `op` up to `policy.max_attempts` times, backing off between
/// transport failures. Non-retryable errors return immediately.
pub async fn with_backoff<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, GatewayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt + 1 < policy.max_attempts => {
                tracing::warn!(attempt, error = %err, "gateway call failed, retrying");
                tokio::time::sleep(policy.delay(attempt)).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_transient_failures_retried() {
        let calls = AtomicU32::new(0);
        let result = with_backoff(fast_policy(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(GatewayError::Transport("connection reset".into()))
                } else {
                    Ok("handle")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "handle");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_decline_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_backoff(fast_policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(GatewayError::Declined("card expired".into())) }
        })
        .await;

        assert!(matches!(result, Err(GatewayError::Declined(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_backoff(fast_policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(GatewayError::Transport("timeout".into())) }
        })
        .await;

        assert!(matches!(result, Err(GatewayError::Transport(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
