// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry schedule for the executor pipeline's worker wrapper.

use crate::error::JobError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Predicate deciding whether a given error should be retried at all, on top
/// of the attempt-count bound already enforced by [`RetryPolicy::can_retry`].
pub type ShouldRetry = Arc<dyn Fn(&JobError) -> bool + Send + Sync>;

/// How many times, and how long to wait between, the executor pipeline
/// re-invokes a failing worker.
#[derive(Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub exponential_backoff: bool,
    pub max_delay: Duration,
    should_retry: ShouldRetry,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("exponential_backoff", &self.exponential_backoff)
            .field("max_delay", &self.max_delay)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_millis(100),
            exponential_backoff: true,
            max_delay: Duration::from_secs(30),
            should_retry: Arc::new(|_| true),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            ..Self::default()
        }
    }

    crate::setters! {
        set { exponential_backoff: bool, max_delay: Duration }
    }

    /// Replace the retry predicate. `Cancelled` bypasses this predicate
    /// entirely — it is never retried regardless of what this returns.
    pub fn should_retry(mut self, f: impl Fn(&JobError) -> bool + Send + Sync + 'static) -> Self {
        self.should_retry = Arc::new(f);
        self
    }

    /// Whether attempt number `attempt` (0-indexed, the attempt that just
    /// failed with `error`) should be followed by another attempt.
    pub fn can_retry(&self, error: &JobError, attempt: u32) -> bool {
        if error.is_cancelled() {
            return false;
        }
        attempt < self.max_retries && (self.should_retry)(error)
    }

    /// Delay before re-entering the worker after attempt `attempt` (0-indexed)
    /// has failed.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if !self.exponential_backoff {
            return self.base_delay;
        }
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
