// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-job-type worker contract.

use async_trait::async_trait;
use flux_core::{DomainEvent, Job, JobError, JobHandle};

/// A process-lived, process-wide worker for one job type.
///
/// Registered once per type with the dispatcher; `process` is invoked by the
/// pipeline once for every attempt (including retries), so implementations
/// should be idempotent where the underlying operation allows it.
#[async_trait]
pub trait Executor<TResult, TEvent: DomainEvent>: Send + Sync {
    async fn process(
        &self,
        job: &Job<TResult, TEvent>,
        handle: &JobHandle<TResult>,
    ) -> Result<TResult, JobError>;
}

/// Adapts a plain async closure into an [`Executor`], for jobs simple enough
/// not to warrant a dedicated type.
pub struct FnExecutor<F> {
    f: F,
}

impl<F> FnExecutor<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut, TResult, TEvent> Executor<TResult, TEvent> for FnExecutor<F>
where
    F: Fn(&Job<TResult, TEvent>, &JobHandle<TResult>) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<TResult, JobError>> + Send,
    TResult: Send + Sync,
    TEvent: DomainEvent,
{
    async fn process(
        &self,
        job: &Job<TResult, TEvent>,
        handle: &JobHandle<TResult>,
    ) -> Result<TResult, JobError> {
        (self.f)(job, handle).await
    }
}
