//! Bounded retry for judge calls
//!
//! The judge gets at most one retry, and never past the request deadline:
//! - Every attempt is capped at `attempt_timeout` and at the deadline
//! - The retry is skipped when backoff would cross the deadline
//! - Backoff carries ±25% jitter

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout_at, Instant};

use crate::config::HybridConfig;
use crate::errors::{Result, RetrievalError};

/// Default attempts: the first call plus a single retry
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Retry policy for the effectiveness judge
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    attempt_timeout: Duration,
    backoff: Duration,
    enable_jitter: bool,
}

impl RetryPolicy {
    pub fn new(attempt_timeout: Duration, backoff: Duration) -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            attempt_timeout,
            backoff,
            enable_jitter: true,
        }
    }

    pub fn from_config(config: &HybridConfig) -> Self {
        Self::new(config.scorer_attempt_timeout(), config.retry_backoff())
    }

    /// Disable retries entirely
    pub fn no_retry(attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            attempt_timeout,
            backoff: Duration::ZERO,
            enable_jitter: false,
        }
    }

    /// Run `operation` until it succeeds, fails permanently, runs out of
    /// attempts, or would overrun `deadline`.
    pub async fn execute<F, Fut, T>(&self, deadline: Instant, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let attempt_deadline = (Instant::now() + self.attempt_timeout).min(deadline);
            let outcome = match timeout_at(attempt_deadline, operation()).await {
                Ok(result) => result,
                Err(_) => Err(RetrievalError::ScorerTimeout {
                    duration_ms: self.attempt_timeout.as_millis() as u64,
                }),
            };

            let error = match outcome {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !self.is_retryable(&error) || attempt >= self.max_attempts {
                return Err(error);
            }

            let delay = self.calculate_delay();
            if Instant::now() + delay >= deadline {
                return Err(error);
            }

            tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, error = %error, "retrying judge call");
            sleep(delay).await;
        }
    }

    fn calculate_delay(&self) -> Duration {
        let delay_ms = self.backoff.as_millis() as u64;

        let final_delay = if self.enable_jitter && delay_ms > 0 {
            let jitter = (delay_ms / 4) as i64;
            let random_jitter = (rand::random::<f64>() * 2.0 - 1.0) * jitter as f64;
            ((delay_ms as i64) + random_jitter as i64).max(0) as u64
        } else {
            delay_ms
        };

        Duration::from_millis(final_delay)
    }

    /// Judge failures are transient; a non-deterministic judge may also
    /// answer well-formed on the second try.
    fn is_retryable(&self, error: &RetrievalError) -> bool {
        error.is_scorer_failure() || matches!(error, RetrievalError::HttpError(_))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }
}
