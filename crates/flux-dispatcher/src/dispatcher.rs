// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Routes a dispatched job to its executor, and — for offline-capable jobs —
//! to the persisted queue and the replay engine instead.

use crate::network_job::NetworkJobRegistry;
use crate::queue_manager::QueueManager;
use crate::registry::ExecutorRegistry;
use flux_adapters::ConnectivityProvider;
use flux_core::{Bus, DataSource, DomainEvent, Envelope, Job, JobError, JobHandle, JobStartedEvent, JobSuccessEvent, NetworkSyncFailureEvent};
use flux_executor::{Executor, JobPipeline};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio_stream::StreamExt;

/// Delay between consecutive offline-queue replay failures, to avoid a tight
/// retry loop against a connection that just came back up flaky.
const REPLAY_BACKOFF: Duration = Duration::from_secs(2);

/// Routes jobs to executors, and offline-capable jobs through the persisted
/// queue when disconnected. One dispatcher fixes a single application event
/// type `TEvent`; `TResult` varies per call to [`Dispatcher::dispatch`].
pub struct Dispatcher<TEvent: DomainEvent + Clone> {
    pipeline: Arc<JobPipeline>,
    executors: ExecutorRegistry<TEvent>,
    network_jobs: NetworkJobRegistry<TEvent>,
    connectivity: Option<Arc<dyn ConnectivityProvider>>,
    queue: Option<Arc<QueueManager>>,
    is_processing_queue: Arc<AtomicBool>,
}

impl<TEvent: DomainEvent + Clone> Dispatcher<TEvent> {
    pub fn new(pipeline: Arc<JobPipeline>) -> Self {
        Self {
            pipeline,
            executors: ExecutorRegistry::new(),
            network_jobs: NetworkJobRegistry::new(),
            connectivity: None,
            queue: None,
            is_processing_queue: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_connectivity(mut self, connectivity: Arc<dyn ConnectivityProvider>) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    pub fn with_queue(mut self, queue: Arc<QueueManager>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn register<TResult, E>(&self, executor: Arc<E>)
    where
        TResult: 'static,
        E: Executor<TResult, TEvent> + 'static,
    {
        self.executors.register::<TResult, E>(executor);
    }

    pub fn register_network_job(&self, type_name: impl Into<String>, factory: Arc<dyn crate::network_job::NetworkJobFactory<TEvent>>) {
        self.network_jobs.register(type_name, factory);
    }

    pub fn is_job_active(&self, job_id: &str) -> bool {
        self.pipeline.is_active(job_id)
    }

    /// Route a plain job to its registered executor. Returns `ExecutorNotFound`
    /// synchronously, before the job ever reaches the pipeline, if no executor
    /// is registered for `TResult`.
    pub fn dispatch<TResult>(&self, job: Job<TResult, TEvent>, handle: JobHandle<TResult>) -> Result<String, JobError>
    where
        TResult: Clone + Send + Sync + serde::Serialize + serde::de::DeserializeOwned + 'static,
    {
        let job_id = job.id.to_string();
        let executor = self
            .executors
            .lookup::<TResult>()
            .ok_or(JobError::ExecutorNotFound(std::any::type_name::<TResult>()))?;
        let pipeline = Arc::clone(&self.pipeline);
        tokio::spawn(async move {
            pipeline.run(job, handle, executor).await;
        });
        Ok(job_id)
    }

    /// Route a network-action job: executed immediately if online, otherwise
    /// queued with an optimistic result and replayed later.
    ///
    /// `optimistic` is the value reported to the caller right away; `job` is
    /// the real unit of work, dispatched immediately when online or handed to
    /// the offline queue (serialized via `payload`) when not.
    pub async fn dispatch_network_action<TResult>(
        &self,
        type_name: &'static str,
        payload: serde_json::Value,
        optimistic: TResult,
        job: Job<TResult, TEvent>,
        handle: JobHandle<TResult>,
    ) -> Result<String, JobError>
    where
        TResult: Clone + Send + Sync + serde::Serialize + serde::de::DeserializeOwned + 'static,
    {
        let job_id = job.id.to_string();
        let connected = self.connectivity.as_ref().map(|c| c.is_connected()).unwrap_or(true);
        if connected {
            return self.dispatch(job, handle);
        }

        let Some(queue) = &self.queue else {
            tracing::warn!(job_id = %job_id, type_name, "offline with no queue manager configured, executing best-effort");
            return self.dispatch(job, handle);
        };

        queue.queue_action(&job_id, type_name, payload, chrono::Utc::now()).await?;

        let bus = job.bus.clone().unwrap_or_else(Bus::<Envelope<TEvent>>::global);
        bus.emit(&Envelope::JobStarted(JobStartedEvent { correlation_id: job_id.clone(), timestamp: SystemTime::now() }));

        let optimistic_value =
            serde_json::to_value(&optimistic).map_err(|err| JobError::Cache(err.to_string()))?;
        bus.emit(&Envelope::JobSuccess(JobSuccessEvent {
            correlation_id: job_id.clone(),
            data: optimistic_value,
            source: DataSource::Optimistic,
            timestamp: SystemTime::now(),
        }));
        handle.complete(optimistic, DataSource::Optimistic);

        tracing::debug!(job_id = %job_id, type_name, "queued network action while offline");
        Ok(job_id)
    }

    /// Spawn the background tasks that drive offline-queue replay: an initial
    /// drain attempt, then one more on every connectivity transition to
    /// online. Requires the dispatcher to already be wrapped in an `Arc`.
    pub fn spawn_auto_replay(self: &Arc<Self>) {
        if self.queue.is_none() {
            return;
        }
        let initial = Arc::clone(self);
        tokio::spawn(async move { initial.process_offline_queue().await });

        if let Some(connectivity) = self.connectivity.clone() {
            let watcher = Arc::clone(self);
            tokio::spawn(async move {
                let mut changes = connectivity.on_change();
                while let Some(online) = changes.next().await {
                    if online {
                        watcher.process_offline_queue().await;
                    }
                }
            });
        }
    }

    /// Drain the offline queue strictly serially, guarded by a single-writer
    /// flag so a connectivity flap never starts a second concurrent drain.
    pub async fn process_offline_queue(self: &Arc<Self>) {
        if self.is_processing_queue.swap(true, Ordering::SeqCst) {
            return;
        }
        let Some(queue) = self.queue.clone() else {
            self.is_processing_queue.store(false, Ordering::SeqCst);
            return;
        };

        loop {
            let entry = match queue.claim_next_pending_job().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(err) => {
                    tracing::error!(error = %err, "failed to claim next queued job, stopping replay");
                    break;
                }
            };

            let Some(factory) = self.network_jobs.lookup(&entry.type_name) else {
                tracing::error!(type_name = %entry.type_name, id = %entry.id, "unknown queued job type, dropping entry");
                let _ = queue.remove_and_cleanup(&entry).await;
                continue;
            };

            match factory.replay(&entry, Arc::clone(self)).await {
                Ok(()) => {
                    let _ = queue.remove_and_cleanup(&entry).await;
                }
                Err(err) => {
                    let retry_count = entry.retry_count + 1;
                    let poisoned = entry.is_poisoned_after_failure(flux_core::DEFAULT_MAX_RETRIES);
                    let bus = Bus::<Envelope<TEvent>>::global();
                    bus.emit(&Envelope::NetworkSyncFailure(NetworkSyncFailureEvent {
                        correlation_id: entry.id.clone(),
                        error: err.to_string(),
                        retry_count,
                        is_poisoned: poisoned,
                        timestamp: SystemTime::now(),
                    }));

                    if poisoned {
                        factory.emit_inverse_event(&entry, &bus).await;
                        let _ = queue.remove_and_cleanup(&entry).await;
                        tracing::error!(id = %entry.id, type_name = %entry.type_name, retry_count, "queued job poisoned after repeated replay failures");
                    } else {
                        let mut updated = entry.clone();
                        updated.status = flux_core::QueueEntryStatus::Pending;
                        updated.retry_count = retry_count;
                        updated.last_error = Some(err.to_string());
                        if let Err(update_err) = queue.update(updated).await {
                            tracing::error!(error = %update_err, "failed to persist replay failure, dropping entry to avoid an infinite loop");
                            let _ = queue.remove_and_cleanup(&entry).await;
                        }
                    }
                    tokio::time::sleep(REPLAY_BACKOFF).await;
                }
            }
        }

        self.is_processing_queue.store(false, Ordering::SeqCst);
    }
}
