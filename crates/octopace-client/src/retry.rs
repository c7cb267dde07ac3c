//! Retry decisions and exponential backoff
//!
//! Attempts are numbered from 1. After failed attempt `n`, the call is
//! retried when `n <= retries` and the error's status is not excluded. The
//! delay before retry `n` is `min_timeout * factor^(n-1)`, capped by
//! `max_timeout` when one is set.

use std::time::Duration;

use octopace_core::config::RetryConfig;
use octopace_core::ports::ErrorStatus;

/// Default number of retries after the first attempt
pub const DEFAULT_RETRIES: u32 = 3;
/// Default backoff multiplier
pub const DEFAULT_FACTOR: f64 = 2.0;
/// Default delay before the first retry
pub const DEFAULT_MIN_TIMEOUT: Duration = Duration::from_millis(1000);

/// Decides whether and when a failed call is retried
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    retries: u32,
    factor: f64,
    min_timeout: Duration,
    max_timeout: Option<Duration>,
    do_not_retry: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETRIES, DEFAULT_FACTOR, DEFAULT_MIN_TIMEOUT)
    }
}

impl RetryPolicy {
    pub fn new(retries: u32, factor: f64, min_timeout: Duration) -> Self {
        Self {
            retries,
            factor,
            min_timeout,
            max_timeout: None,
            do_not_retry: Vec::new(),
        }
    }

    /// A policy that never retries
    pub fn none() -> Self {
        Self::new(0, DEFAULT_FACTOR, Duration::ZERO)
    }

    /// Caps any single backoff delay
    pub fn with_max_timeout(mut self, max_timeout: Duration) -> Self {
        self.max_timeout = Some(max_timeout);
        self
    }

    /// Statuses that fail immediately instead of being retried
    pub fn with_do_not_retry(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.do_not_retry = statuses.into_iter().collect();
        self
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        let mut policy = Self::new(config.retries, config.factor, config.min_timeout())
            .with_do_not_retry(config.do_not_retry.iter().copied());
        policy.max_timeout = config.max_timeout();
        policy
    }

    /// Maximum number of retries
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Maximum number of invocations, first attempt included
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Whether failed attempt number `attempt` (1-based) is retried
    pub fn should_retry<E: ErrorStatus + ?Sized>(&self, attempt: u32, error: &E) -> bool {
        if attempt > self.retries {
            return false;
        }
        match error.status() {
            Some(status) => !self.do_not_retry.contains(&status),
            None => true,
        }
    }

    /// Backoff before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let scale = self.factor.powi(exponent);
        let nanos = (self.min_timeout.as_nanos() as f64 * scale).round();
        // Overflow and NaN saturate to the cap, or to Duration::MAX.
        let delay = if nanos.is_nan() || nanos >= u64::MAX as f64 {
            Duration::MAX
        } else if nanos <= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(nanos as u64)
        };
        match self.max_timeout {
            Some(max) => delay.min(max),
            None => delay,
        }
    }
}

/// Result of a single attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded,
    /// The attempt failed; `retrying` tells whether another one follows
    Failed { retrying: bool },
}

/// Record of one invocation made by a call wrapper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryAttempt {
    /// 1-based attempt number
    pub number: u32,
    /// Backoff slept before this attempt (zero for the first)
    pub backoff: Duration,
    /// Time spent waiting on pacing gates before this attempt
    pub throttle_wait: Duration,
    pub outcome: AttemptOutcome,
}

impl RetryAttempt {
    pub fn succeeded(&self) -> bool {
        self.outcome == AttemptOutcome::Succeeded
    }
}
