//! Bounded retry with exponential backoff for side-effect writes.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::error::AppError;

/// Classifies a failure as worth repeating.
pub trait Retryable {
    /// Returns true when the same call may succeed after a delay.
    fn is_transient(&self) -> bool;
}

impl Retryable for AppError {
    fn is_transient(&self) -> bool {
        Self::is_transient(self)
    }
}

/// Final failure of a retried operation.
#[derive(Debug)]
pub struct RetryFailure<E> {
    /// Attempts made, including the first.
    pub attempts: u32,
    /// Error returned by the last attempt.
    pub error: E,
}

/// Retry policy with exponential backoff.
///
/// The delay before retry `n` (0-indexed) is `initial_delay * 2^n`. Only
/// errors classified as transient are retried; anything else fails on the
/// first attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }
}

impl RetryPolicy {
    /// Create a policy. A `max_attempts` of zero is treated as one.
    #[must_use]
    pub const fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: if max_attempts == 0 { 1 } else { max_attempts },
            initial_delay,
        }
    }

    /// Total attempts allowed, including the first.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait before the given retry (0-indexed).
    #[must_use]
    pub fn delay_for_attempt(&self, retry: u32) -> Duration {
        self.initial_delay
            .saturating_mul(2u32.saturating_pow(retry))
    }

    /// Run `op` until it succeeds, fails permanently, or the attempt budget is spent.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut>(&self, op: F) -> Result<T, RetryFailure<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        self.run_observed(op, |_, _| {}).await
    }

    /// Same as [`RetryPolicy::run`], calling `on_backoff(attempt, delay)` before each sleep.
    pub async fn run_observed<T, E, F, Fut, B>(
        &self,
        mut op: F,
        mut on_backoff: B,
    ) -> Result<T, RetryFailure<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
        B: FnMut(u32, Duration),
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_transient() && attempt < self.max_attempts => {
                    let delay = self.delay_for_attempt(attempt - 1);
                    tracing::warn!(
                        attempt = attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Transient failure, retrying"
                    );
                    on_backoff(attempt, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    return Err(RetryFailure {
                        attempts: attempt,
                        error,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_exponential_backoff() {
        let policy = RetryPolicy::new(5, Duration::from_millis(1000));

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(4000));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(8000));
    }

    #[test]
    fn test_zero_attempts_means_one() {
        let policy = RetryPolicy::new(0, Duration::from_millis(10));
        assert_eq!(policy.max_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_uses_every_attempt() {
        let policy = RetryPolicy::default();
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        let result: Result<(), _> = policy
            .run(|_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(AppError::RateLimited)
                }
            })
            .await;

        let failure = result.unwrap_err();
        assert_eq!(failure.attempts, 3);
        assert!(matches!(failure.error, AppError::RateLimited));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_is_not_retried() {
        let policy = RetryPolicy::default();
        let calls = Arc::new(AtomicU32::new(0));
        let start = tokio::time::Instant::now();

        let counter = calls.clone();
        let result: Result<(), _> = policy
            .run(|_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(AppError::Database("connection refused".to_string()))
                }
            })
            .await;

        assert_eq!(result.unwrap_err().attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_delays_double() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1000));
        let mut delays = Vec::new();
        let start = tokio::time::Instant::now();

        let result = policy
            .run_observed(
                |attempt| async move {
                    if attempt < 3 {
                        Err(AppError::ExternalService("status 429".to_string()))
                    } else {
                        Ok(attempt)
                    }
                },
                |_, delay| delays.push(delay),
            )
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(
            delays,
            vec![Duration::from_millis(1000), Duration::from_millis(2000)]
        );
        assert!(start.elapsed() >= Duration::from_millis(3000));
    }
}
