//! Retry policies.
//!
//! [`RetryPolicy`] wraps a single platform call and waits a fixed delay that
//! depends on how the failure was classified. [`RetryWindow`] wraps a whole
//! copy-job unit (submit, poll, merge) and allows a small number of
//! failures inside a sliding window.

use std::future::Future;
use std::time::Duration;

use shift_core::{FailureClass, ShiftConfig, ShiftError, ShiftResult};
use tokio::time::{sleep, Instant};
use tracing::warn;

/// Per-call retry policy with a fixed delay per failure class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_attempts: u32,
    pub transient_delay: Duration,
    pub throttled_delay: Duration,
    pub unknown_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ShiftConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &ShiftConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            transient_delay: Duration::from_millis(config.transient_delay_ms),
            throttled_delay: Duration::from_millis(config.throttled_delay_ms),
            unknown_delay: Duration::from_millis(config.unknown_delay_ms),
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 0,
            ..Self::default()
        }
    }

    /// Delay before retrying a failure of `class`, `None` if it is not retried.
    pub fn delay_for(&self, class: FailureClass) -> Option<Duration> {
        match class {
            FailureClass::Transient => Some(self.transient_delay),
            FailureClass::Throttled => Some(self.throttled_delay),
            FailureClass::Unknown => Some(self.unknown_delay),
            FailureClass::Permanent => None,
        }
    }

    /// Run `operation` until it succeeds, fails permanently, or has failed
    /// more than `max_attempts` times.
    pub async fn attempt<T, F, Fut>(&self, label: &str, mut operation: F) -> ShiftResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ShiftResult<T>>,
    {
        let mut failures = 0u32;

        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let Some(delay) = self.delay_for(err.class()) else {
                return Err(err);
            };

            failures += 1;
            if failures > self.max_attempts {
                return Err(ShiftError::RetryExhausted {
                    attempts: failures,
                    source: Box::new(err),
                });
            }

            warn!(
                operation = label,
                attempt = failures,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retrying"
            );
            sleep(delay).await;
        }
    }
}

/// Windowed retry for a whole copy-job unit.
///
/// Failures are counted until `reset_after` passes without a new one; once
/// `max_attempts` failures accumulate the unit fails. Validation errors are
/// returned immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryWindow {
    pub max_attempts: u32,
    pub delay: Duration,
    pub reset_after: Duration,
}

impl Default for RetryWindow {
    fn default() -> Self {
        Self::from_config(&ShiftConfig::default())
    }
}

impl RetryWindow {
    pub fn from_config(config: &ShiftConfig) -> Self {
        Self {
            max_attempts: config.job_attempts,
            delay: Duration::from_millis(config.job_retry_delay_ms),
            reset_after: Duration::from_millis(config.job_retry_window_ms),
        }
    }

    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> ShiftResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ShiftResult<T>>,
    {
        let mut failures = 0u32;
        let mut last_failure: Option<Instant> = None;

        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_validation() => return Err(err),
                Err(err) => err,
            };

            let now = Instant::now();
            if last_failure.is_some_and(|at| now.duration_since(at) >= self.reset_after) {
                failures = 0;
            }
            failures += 1;
            last_failure = Some(now);

            if failures >= self.max_attempts {
                return Err(ShiftError::RetryExhausted {
                    attempts: failures,
                    source: Box::new(err),
                });
            }

            warn!(
                operation = label,
                attempt = failures,
                error = %err,
                "resubmitting"
            );
            sleep(self.delay).await;
        }
    }
}
