//! Retry policy engine
//!
//! Runs an async operation up to `max_attempts` times with exponential
//! backoff. Retriable: transport errors, per-attempt timeouts, provider
//! rate limiting. Non-retriable errors abort immediately. Cancellation is
//! observed during sleeps and in-flight attempts and aborts promptly.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cancel::CancelFlag;
use crate::llm::LlmError;

/// Backoff and attempt bounds for one retriable operation
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_factor: f64,
    /// Cap on a single backoff sleep
    pub max_delay: Duration,
    /// Per-attempt timeout
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(60),
            attempt_timeout: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retrying after the given 1-based attempt, with up to
    /// 10% jitter
    pub fn delay_after_attempt(&self, attempt: u32) -> Duration {
        let exp = (attempt.saturating_sub(1)) as i32;
        let raw = self.base_delay.as_secs_f64() * self.backoff_factor.powi(exp);
        let capped = raw.min(self.max_delay.as_secs_f64());
        let jitter = rand::rng().random_range(0.0..=0.1);
        Duration::from_secs_f64(capped * (1.0 + jitter))
    }
}

/// How a retried operation ultimately failed
#[derive(Debug, Error)]
pub enum RetryError {
    #[error("Cancelled while retrying")]
    Cancelled,

    #[error("All {attempts} attempts failed: {source}")]
    Exhausted { attempts: u32, source: LlmError },

    /// A non-retriable error; no further attempts were made
    #[error(transparent)]
    Fatal(LlmError),
}

/// Execute `op` under the policy
///
/// `op` is called with the 1-based attempt number. A per-attempt timeout
/// counts as a retriable failure. The cancel flag is raced against both the
/// in-flight attempt and the backoff sleep.
pub async fn execute<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancelFlag,
    op: F,
) -> Result<T, RetryError>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled);
        }

        // Biased: a finished attempt beats a simultaneous cancel, so work
        // that already completed is never thrown away
        let outcome = tokio::select! {
            biased;
            result = tokio::time::timeout(policy.attempt_timeout, op(attempt)) => {
                match result {
                    Ok(inner) => inner,
                    Err(_) => Err(LlmError::Timeout(policy.attempt_timeout)),
                }
            }
            _ = cancel.cancelled() => return Err(RetryError::Cancelled),
        };

        match outcome {
            Ok(value) => {
                debug!(attempt, "Attempt succeeded");
                return Ok(value);
            }
            Err(e) if !e.is_retryable() => {
                debug!(attempt, error = %e, "Non-retriable error, aborting");
                return Err(RetryError::Fatal(e));
            }
            Err(e) if attempt == max_attempts => {
                warn!(attempt, error = %e, "Final attempt failed");
                return Err(RetryError::Exhausted {
                    attempts: max_attempts,
                    source: e,
                });
            }
            Err(e) => {
                // Respect the provider's retry-after when it exceeds our backoff
                let mut delay = policy.delay_after_attempt(attempt);
                if let Some(retry_after) = e.retry_after() {
                    delay = delay.max(retry_after);
                }
                warn!(attempt, error = %e, ?delay, "Attempt failed, backing off");
                tokio::select! {
                    _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    unreachable!("loop returns on the final attempt")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(5),
            backoff_factor: 2.0,
            max_delay: Duration::from_millis(50),
            attempt_timeout: Duration::from_secs(5),
        }
    }

    fn transport_error() -> LlmError {
        LlmError::ApiError {
            status: 503,
            message: "unavailable".to_string(),
        }
    }

    #[tokio::test]
    async fn test_succeeds_first_attempt() {
        let cancel = CancelFlag::new();
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();

        let result = execute(&fast_policy(3), &cancel, move |_| {
            let calls = calls2.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, LlmError>(42)
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let cancel = CancelFlag::new();
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();

        let result = execute(&fast_policy(3), &cancel, move |attempt| {
            let calls = calls2.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if attempt < 3 {
                    Err(transport_error())
                } else {
                    Ok("ok")
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausts_attempts() {
        let cancel = CancelFlag::new();
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();

        let result: Result<(), _> = execute(&fast_policy(3), &cancel, move |_| {
            let calls = calls2.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(transport_error())
            }
        })
        .await;

        assert!(matches!(
            result,
            Err(RetryError::Exhausted { attempts: 3, .. })
        ));
        // At most max_attempts, at least once
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retriable_aborts_immediately() {
        let cancel = CancelFlag::new();
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();

        let result: Result<(), _> = execute(&fast_policy(3), &cancel, move |_| {
            let calls = calls2.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(LlmError::InvalidResponse("garbage".to_string()))
            }
        })
        .await;

        assert!(matches!(result, Err(RetryError::Fatal(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_retriable() {
        let cancel = CancelFlag::new();
        let policy = RetryPolicy {
            attempt_timeout: Duration::from_millis(10),
            ..fast_policy(2)
        };
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();

        let result: Result<(), _> = execute(&policy, &cancel, move |_| {
            let calls = calls2.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            }
        })
        .await;

        assert!(matches!(
            result,
            Err(RetryError::Exhausted {
                attempts: 2,
                source: LlmError::Timeout(_)
            })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancel_during_backoff_returns_promptly() {
        let cancel = Arc::new(CancelFlag::new());
        let policy = RetryPolicy {
            base_delay: Duration::from_secs(60),
            max_delay: Duration::from_secs(60),
            ..fast_policy(3)
        };

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                cancel.cancel();
            })
        };

        let started = std::time::Instant::now();
        let result: Result<(), _> = execute(&policy, &cancel, |_| async {
            Err(transport_error())
        })
        .await;
        canceller.await.unwrap();

        assert!(matches!(result, Err(RetryError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let cancel = CancelFlag::new();
        cancel.cancel();

        let result: Result<(), _> =
            execute(&fast_policy(3), &cancel, |_| async { Ok(()) }).await;
        assert!(matches!(result, Err(RetryError::Cancelled)));
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(5),
            attempt_timeout: Duration::from_secs(300),
        };
        let d1 = policy.delay_after_attempt(1);
        let d3 = policy.delay_after_attempt(3);
        let d10 = policy.delay_after_attempt(10);
        // 1s, 4s, capped at 5s (each with ≤10% jitter)
        assert!(d1 >= Duration::from_secs(1) && d1 <= Duration::from_millis(1100));
        assert!(d3 >= Duration::from_secs(4) && d3 <= Duration::from_millis(4400));
        assert!(d10 >= Duration::from_secs(5) && d10 <= Duration::from_millis(5500));
    }
}
