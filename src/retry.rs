//! Retry with exponential backoff and jitter.
//!
//! Operations report failures as [`ArchiveError`]; only errors whose
//! [`kind`](ArchiveError::kind) is transient are retried. The wait between
//! attempts races against a [`CancellationToken`] so a shutdown never has to
//! sit out a long backoff.

use crate::error::{ArchiveError, FailureKind};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Upper bound for any single backoff delay.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

const JITTER_MIN: f64 = 0.75;
const JITTER_MAX: f64 = 1.25;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: MAX_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay: MAX_RETRY_DELAY,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Run `operation` with this policy's attempt count and base delay.
    pub async fn execute<T, F, Fut>(
        &self,
        operation: F,
        cancel: &CancellationToken,
    ) -> Result<T, ArchiveError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ArchiveError>>,
    {
        self.execute_with(operation, self.max_attempts, self.base_delay, cancel)
            .await
    }

    /// Variant of [`execute`](Self::execute) for operations that only have
    /// side effects.
    #[allow(dead_code)]
    pub async fn execute_unit<F, Fut>(
        &self,
        operation: F,
        cancel: &CancellationToken,
    ) -> Result<(), ArchiveError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), ArchiveError>>,
    {
        self.execute(operation, cancel).await
    }

    /// Run `operation` with an explicit attempt count and base delay.
    ///
    /// Returns the first success, the first permanent error, the last
    /// transient error once `max_attempts` is exhausted, or
    /// [`ArchiveError::Cancelled`] if `cancel` fires while waiting.
    pub async fn execute_with<T, F, Fut>(
        &self,
        mut operation: F,
        max_attempts: u32,
        base_delay: Duration,
        cancel: &CancellationToken,
    ) -> Result<T, ArchiveError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ArchiveError>>,
    {
        let max_attempts = max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let err = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        log::info!("Operation succeeded on attempt {}", attempt);
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            match err.kind() {
                FailureKind::Cancelled => return Err(err),
                FailureKind::Permanent => {
                    log::error!("Operation failed with a permanent error: {}", err);
                    return Err(err);
                }
                FailureKind::Transient if attempt >= max_attempts => {
                    log::error!("Operation failed after {} attempts: {}", attempt, err);
                    return Err(err);
                }
                FailureKind::Transient => {}
            }

            let delay = backoff_delay(attempt, base_delay, self.max_delay, jitter());
            log::warn!(
                "Attempt {}/{} failed, retrying in {}ms: {}",
                attempt,
                max_attempts,
                delay.as_millis(),
                err
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    log::info!("Retry wait cancelled after attempt {}", attempt);
                    return Err(ArchiveError::Cancelled);
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

fn jitter() -> f64 {
    rand::rng().random_range(JITTER_MIN..=JITTER_MAX)
}

/// `min(max_delay, base * 2^(attempt-1) * jitter)`.
pub fn backoff_delay(attempt: u32, base: Duration, max_delay: Duration, jitter: f64) -> Duration {
    let exponent = attempt.saturating_sub(1).min(62) as i32;
    let ms = base.as_millis() as f64 * 2f64.powi(exponent) * jitter;
    let capped = ms.min(max_delay.as_millis() as f64).max(0.0);
    Duration::from_millis(capped as u64)
}
