//! Bounded retry with exponential backoff for provider calls.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::ProviderError;

/// Retry and timeout settings applied to every provider call.
///
/// Retry state (attempt counter, current backoff) lives on the stack of a
/// single [`RetryPolicy::run`] call; the policy itself is immutable and shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound on any single delay.
    pub max_backoff: Duration,
    /// Factor applied to the delay after each retry.
    pub multiplier: u32,
    /// Deadline for a single attempt.
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(10),
            multiplier: 2,
            call_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set the total number of attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the initial and maximum backoff.
    #[must_use]
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Set the per-attempt deadline.
    #[must_use]
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Delay before retry number `retry` (0-based).
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(self.multiplier.saturating_pow(retry))
            .min(self.max_backoff)
    }

    /// Run `call` until it succeeds, fails with a non-transient error, or the
    /// attempts are used up. Each attempt is bounded by `call_timeout`; an
    /// attempt that exceeds it counts as a transient timeout.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let result = match tokio::time::timeout(self.call_timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout {
                    message: format!("{operation} exceeded {:?}", self.call_timeout),
                }),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_transient() => {
                    debug!(operation, error = %err, "non-retryable provider error");
                    return Err(err);
                }
                Err(err) if attempt >= attempts => {
                    debug!(operation, attempts, error = %err, "retry attempts exhausted");
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.backoff(attempt - 1);
                    debug!(
                        operation,
                        attempt,
                        max_attempts = attempts,
                        backoff_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "retrying provider call after backoff"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
