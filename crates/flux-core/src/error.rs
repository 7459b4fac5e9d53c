// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error kinds surfaced to dispatch callers, via [`JobHandle`](crate::job_handle::JobHandle)
//! or synchronously from `dispatch` itself.

use std::sync::Arc;
use std::time::Duration;

/// Runtime errors produced by the job pipeline.
///
/// `Worker` wraps whatever a `process()` implementation returns; it is kept
/// as a boxed `std::error::Error` rather than a generic parameter so that
/// `JobError` stays a single concrete type usable across executor impls.
#[derive(Debug, Clone, thiserror::Error)]
pub enum JobError {
    #[error("no executor registered for job type {0}")]
    ExecutorNotFound(&'static str),

    #[error("job cancelled")]
    Cancelled,

    #[error("job timed out after {0:?}")]
    Timeout(Duration),

    #[error("worker failed: {0}")]
    Worker(Arc<dyn std::error::Error + Send + Sync>),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("unknown queued job type {0:?}")]
    UnknownQueuedType(String),

    #[error("invalid queued payload for {type_name:?}: {reason}")]
    InvalidQueuedPayload { type_name: String, reason: String },
}

impl JobError {
    pub fn worker(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        JobError::Worker(Arc::new(err))
    }

    /// Cancellation is never retryable, regardless of a `RetryPolicy`'s own
    /// `should_retry` predicate.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, JobError::Cancelled)
    }
}
