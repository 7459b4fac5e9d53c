// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The eight-step pipeline every dispatched job runs through: cache read,
//! worker with retry/timeout/cancel, cache write, domain event, completion.

use crate::executor::Executor;
use flux_adapters::{CacheProvider, Observer};
use flux_core::{Bus, DataSource, DomainEvent, Envelope, Job, JobError, JobHandle};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Settle delay between a handle completing and its progress stream closing,
/// giving a slow consumer a last chance to drain in-flight updates.
const PROGRESS_SETTLE_DELAY: Duration = Duration::from_millis(50);

/// Runs the executor pipeline for every dispatched job.
///
/// One `JobPipeline` is shared by every job type dispatched through a given
/// dispatcher; it is generic over neither `TResult` nor `TEvent` — those are
/// supplied per call to [`JobPipeline::run`]. A misbehaving [`Observer`] is
/// never allowed to take down a job: every hook call is wrapped with
/// `catch_unwind` and a panic is logged, not propagated.
pub struct JobPipeline {
    cache: Arc<dyn CacheProvider>,
    observer: Option<Arc<dyn Observer>>,
    active: parking_lot::Mutex<HashSet<String>>,
}

impl JobPipeline {
    pub fn new(cache: Arc<dyn CacheProvider>) -> Self {
        Self {
            cache,
            observer: None,
            active: parking_lot::Mutex::new(HashSet::new()),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn is_active(&self, job_id: &str) -> bool {
        self.active.lock().contains(job_id)
    }

    fn observe(&self, f: impl FnOnce(&dyn Observer)) {
        if let Some(observer) = &self.observer {
            let observer = observer.as_ref();
            let call = std::panic::AssertUnwindSafe(|| f(observer));
            if let Err(payload) = std::panic::catch_unwind(call) {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                tracing::error!(panic = %message, "observer hook panicked, ignoring");
            }
        }
    }

    /// Run the full pipeline for one job. Returns once the handle has reached
    /// a terminal state and its progress stream has been closed; callers
    /// typically `tokio::spawn` this rather than awaiting it inline.
    pub async fn run<TResult, TEvent, E>(
        &self,
        job: Job<TResult, TEvent>,
        handle: JobHandle<TResult>,
        executor: Arc<E>,
    ) where
        TResult: Clone + Send + Sync + serde::Serialize + serde::de::DeserializeOwned + 'static,
        TEvent: DomainEvent + Clone,
        E: Executor<TResult, TEvent> + ?Sized + 'static,
    {
        let job_id = job.id.to_string();
        let type_name = std::any::type_name::<TResult>();
        self.active.lock().insert(job_id.clone());
        self.observe(|o| o.on_job_start(&job_id, type_name));
        tracing::debug!(job_id = %job_id, type_name, "executor pipeline starting");

        let bus = job.bus.clone().unwrap_or_else(Bus::<Envelope<TEvent>>::global);
        let start = std::time::Instant::now();

        if let CacheOutcome::Done = self.read_cache(&job, &handle, &bus, &job_id).await {
            tracing::debug!(job_id = %job_id, elapsed_ms = start.elapsed().as_millis() as u64, "served from cache, no revalidation");
            self.finish(&job, &handle, &job_id).await;
            return;
        }

        let outcome = self.run_worker(&job, &handle, executor.as_ref()).await;
        match outcome {
            Ok(value) => {
                self.write_cache(&job, &value).await;
                let event = job.make_event(&value, DataSource::Fresh);
                bus.emit(&Envelope::Domain(event));
                self.observe(|o| o.on_event("domain", &job_id));
                self.observe(|o| o.on_job_success(&job_id, DataSource::Fresh));
                handle.complete(value, DataSource::Fresh);
                tracing::info!(job_id = %job_id, type_name, elapsed_ms = start.elapsed().as_millis() as u64, "job succeeded");
            }
            Err(err) => {
                self.observe(|o| o.on_job_error(&job_id, &err));
                tracing::warn!(job_id = %job_id, type_name, error = %err, "job failed");
                handle.complete_error(err);
            }
        }

        self.finish(&job, &handle, &job_id).await;
    }

    async fn read_cache<TResult, TEvent>(
        &self,
        job: &Job<TResult, TEvent>,
        handle: &JobHandle<TResult>,
        bus: &Bus<Envelope<TEvent>>,
        job_id: &str,
    ) -> CacheOutcome
    where
        TResult: Clone + Send + Sync + serde::de::DeserializeOwned,
        TEvent: DomainEvent,
    {
        if job.force_refresh() {
            return CacheOutcome::Miss;
        }
        let Some(key) = job.cache_key().map(str::to_string) else {
            return CacheOutcome::Miss;
        };
        let read = match self.cache.read(&key).await {
            Ok(read) => read,
            Err(err) => {
                tracing::warn!(job_id, error = %err, "cache read failed, treating as miss");
                return CacheOutcome::Miss;
            }
        };
        let Some(raw) = read else {
            return CacheOutcome::Miss;
        };
        let cached = match serde_json::from_value::<TResult>(raw) {
            Ok(cached) => cached,
            Err(err) => {
                tracing::warn!(job_id, error = %err, "cached value failed to deserialize, treating as miss");
                return CacheOutcome::Miss;
            }
        };

        let event = job.make_event(&cached, DataSource::Cached);
        bus.emit(&Envelope::Domain(event));
        self.observe(|o| o.on_event("domain", job_id));
        self.observe(|o| o.on_job_success(job_id, DataSource::Cached));
        handle.complete(cached, DataSource::Cached);

        if job.revalidate() {
            CacheOutcome::Miss
        } else {
            CacheOutcome::Done
        }
    }

    async fn write_cache<TResult, TEvent>(&self, job: &Job<TResult, TEvent>, value: &TResult)
    where
        TResult: serde::Serialize,
        TEvent: DomainEvent,
    {
        let Some(key) = job.cache_key() else {
            return;
        };
        let Ok(serialized) = serde_json::to_value(value) else {
            tracing::warn!(key, "worker result failed to serialize for cache write, skipping");
            return;
        };
        if let Err(err) = self.cache.write(key, serialized, job.cache_ttl()).await {
            tracing::warn!(key, error = %err, "cache write failed, ignoring");
        }
    }

    async fn run_worker<TResult, TEvent, E>(
        &self,
        job: &Job<TResult, TEvent>,
        handle: &JobHandle<TResult>,
        executor: &E,
    ) -> Result<TResult, JobError>
    where
        TEvent: DomainEvent,
        E: Executor<TResult, TEvent> + ?Sized,
    {
        let mut attempt = 0u32;
        loop {
            if let Some(token) = &job.cancellation_token {
                token.throw_if_cancelled()?;
            }

            let outcome = self.run_attempt(job, handle, executor).await;

            if let Some(token) = &job.cancellation_token {
                token.throw_if_cancelled()?;
            }

            match outcome {
                Ok(value) => return Ok(value),
                Err(err) if err.is_cancelled() => return Err(err),
                Err(err) => {
                    let can_retry = job
                        .retry_policy
                        .as_ref()
                        .map(|policy| policy.can_retry(&err, attempt))
                        .unwrap_or(false);
                    if !can_retry {
                        return Err(err);
                    }
                    let delay = job
                        .retry_policy
                        .as_ref()
                        .map(|policy| policy.delay_for(attempt))
                        .unwrap_or_default();
                    tracing::debug!(job_id = %job.id, attempt, delay_ms = delay.as_millis() as u64, "retrying after worker failure");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// One call to `process`, wrapped with a timeout (if set) and a
    /// cancellation race (if a token is set). Mid-flight cancellation wins
    /// the race against a still-running `process` future; the listener is
    /// always unregistered before returning.
    async fn run_attempt<TResult, TEvent, E>(
        &self,
        job: &Job<TResult, TEvent>,
        handle: &JobHandle<TResult>,
        executor: &E,
    ) -> Result<TResult, JobError>
    where
        TEvent: DomainEvent,
        E: Executor<TResult, TEvent> + ?Sized,
    {
        let attempt = async {
            match &job.cancellation_token {
                Some(token) => {
                    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
                    let tx = parking_lot::Mutex::new(Some(tx));
                    let subscription = token.on_cancel(move || {
                        if let Some(tx) = tx.lock().take() {
                            let _ = tx.send(());
                        }
                    });
                    let result = tokio::select! {
                        res = executor.process(job, handle) => res,
                        _ = rx => Err(JobError::Cancelled),
                    };
                    subscription.unregister();
                    result
                }
                None => executor.process(job, handle).await,
            }
        };

        match job.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, attempt).await {
                Ok(result) => result,
                Err(_) => Err(JobError::Timeout(timeout)),
            },
            None => attempt.await,
        }
    }

    async fn finish<TResult, TEvent>(
        &self,
        _job: &Job<TResult, TEvent>,
        handle: &JobHandle<TResult>,
        job_id: &str,
    ) where
        TEvent: DomainEvent,
    {
        // Cancel listeners are already unregistered per-attempt in `run_attempt`.
        self.active.lock().remove(job_id);
        tokio::time::sleep(PROGRESS_SETTLE_DELAY).await;
        handle.close_progress();
    }
}

enum CacheOutcome {
    Done,
    Miss,
}
