//! Retry logic with exponential backoff
//!
//! Wraps a single backend call with bounded retries:
//! - Exponential backoff: 1s, 2s, 4s, 8s, 16s maximum (non-decreasing, no jitter)
//! - A rate-limited attempt waits at least the backend's `Retry-After`,
//!   capped at the per-attempt timeout
//! - Per-attempt timeout
//! - Non-retryable errors end the run immediately
//!
//! The executor never returns an error. A run ends in
//! [`RetryOutcome::Succeeded`] or [`RetryOutcome::Exhausted`], the explicit
//! failure marker the dispatcher turns into an error outcome.

use crate::error::LlmError;
use crate::logging::{log_debug, log_warn};

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Retry policy configuration for backend calls
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Maximum delay between attempts
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Timeout for an individual attempt
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(16),
            backoff_multiplier: 2.0,
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    /// Policy that makes exactly one attempt.
    pub fn single_attempt(request_timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            request_timeout,
            ..Self::default()
        }
    }
}

/// Terminal result of a retried call
#[derive(Debug)]
pub enum RetryOutcome<T> {
    /// An attempt produced a value.
    Succeeded {
        value: T,
        attempts: u32,
        total_backoff: Duration,
    },
    /// Attempts ran out, or a non-retryable error stopped the run.
    Exhausted {
        error: LlmError,
        attempts: u32,
        total_backoff: Duration,
    },
}

impl<T> RetryOutcome<T> {
    /// Number of times the operation was invoked.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Succeeded { attempts, .. } | Self::Exhausted { attempts, .. } => *attempts,
        }
    }

    /// Total time spent sleeping between attempts.
    pub fn total_backoff(&self) -> Duration {
        match self {
            Self::Succeeded { total_backoff, .. } | Self::Exhausted { total_backoff, .. } => {
                *total_backoff
            }
        }
    }

    /// Convert into a plain `Result`, dropping the attempt bookkeeping.
    pub fn into_result(self) -> Result<T, LlmError> {
        match self {
            Self::Succeeded { value, .. } => Ok(value),
            Self::Exhausted { error, .. } => Err(error),
        }
    }
}

/// Per-run bookkeeping, discarded once the run ends
struct RetryState {
    attempt: u32,
    accumulated_delay: Duration,
    schedule: ExponentialBackoff,
}

/// Executes an operation under a [`RetryPolicy`]
///
/// Stateless between runs, so one executor may be shared by any number of
/// concurrent workers.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    /// Create a new retry executor with the given policy
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or `max_attempts` is reached. Attempts are strictly sequential.
    pub async fn run<F, Fut, T>(&self, label: &str, operation: F) -> RetryOutcome<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let started = Instant::now();
        let mut state = RetryState {
            attempt: 0,
            accumulated_delay: Duration::ZERO,
            schedule: self.schedule(),
        };

        loop {
            state.attempt += 1;
            log_debug!(
                call = %label,
                attempt = state.attempt,
                max_attempts = max_attempts,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Starting attempt"
            );

            let error = match self.attempt(&operation).await {
                Ok(value) => {
                    log_debug!(
                        call = %label,
                        attempt = state.attempt,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Attempt succeeded"
                    );
                    return RetryOutcome::Succeeded {
                        value,
                        attempts: state.attempt,
                        total_backoff: state.accumulated_delay,
                    };
                }
                Err(error) => error,
            };

            if !error.is_retryable() || state.attempt >= max_attempts {
                log_warn!(
                    call = %label,
                    attempts = state.attempt,
                    retryable = error.is_retryable(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %error,
                    "Giving up after final attempt"
                );
                return RetryOutcome::Exhausted {
                    error,
                    attempts: state.attempt,
                    total_backoff: state.accumulated_delay,
                };
            }

            let backoff = state
                .schedule
                .next_backoff()
                .unwrap_or(self.policy.max_delay);
            let delay = self.retry_delay(&error, backoff);
            log_warn!(
                call = %label,
                attempt = state.attempt,
                max_attempts = max_attempts,
                delay_ms = delay.as_millis() as u64,
                elapsed_ms = started.elapsed().as_millis() as u64,
                error = %error,
                "Attempt failed, retrying after delay"
            );
            sleep(delay).await;
            state.accumulated_delay += delay;
        }
    }

    /// The delays that would separate the first `count` retries.
    pub fn backoff_delays(&self, count: usize) -> Vec<Duration> {
        let mut schedule = self.schedule();
        (0..count)
            .map(|_| schedule.next_backoff().unwrap_or(self.policy.max_delay))
            .collect()
    }

    /// Backoff delay, stretched to the server's hint after a rate limit.
    fn retry_delay(&self, error: &LlmError, backoff: Duration) -> Duration {
        match error {
            LlmError::RateLimitExceeded {
                retry_after_seconds,
            } => {
                let hinted = Duration::from_secs(*retry_after_seconds)
                    .min(self.policy.request_timeout);
                backoff.max(hinted)
            }
            _ => backoff,
        }
    }

    async fn attempt<F, Fut, T>(&self, operation: &F) -> Result<T, LlmError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        match tokio::time::timeout(self.policy.request_timeout, operation()).await {
            Ok(result) => result,
            Err(_elapsed) => Err(LlmError::timeout(self.policy.request_timeout)),
        }
    }

    /// Deterministic schedule: initial * multiplier^n, capped at max_delay.
    fn schedule(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.policy.initial_delay)
            .with_multiplier(self.policy.backoff_multiplier.max(1.0))
            .with_randomization_factor(0.0)
            .with_max_interval(self.policy.max_delay)
            .with_max_elapsed_time(None)
            .build()
    }
}
