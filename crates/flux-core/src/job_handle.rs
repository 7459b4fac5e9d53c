// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Caller-visible handle returned from a dispatch: a one-shot outcome plus a
//! progress stream.
//!
//! `complete`/`complete_error` are idempotent by design — cache-first and
//! SWR both rely on the *first* completion winning and every later one being
//! a silent no-op, rather than racing the cache path against the worker.

use crate::data_source::DataSource;
use crate::error::JobError;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio_stream::wrappers::ReceiverStream;

const PROGRESS_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone)]
pub enum JobOutcome<T> {
    Ok { data: T, source: DataSource },
    Err(JobError),
}

/// One update on a job's progress stream.
#[derive(Debug, Clone, Default)]
pub struct ProgressUpdate {
    pub value: f32,
    pub message: Option<String>,
    pub current_step: Option<u32>,
    pub total_steps: Option<u32>,
}

struct Shared<T> {
    outcome: Mutex<Option<JobOutcome<T>>>,
    notify: Notify,
    completion_listeners: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
    progress_tx: Mutex<Option<mpsc::Sender<ProgressUpdate>>>,
    progress_rx: Mutex<Option<mpsc::Receiver<ProgressUpdate>>>,
}

/// A one-shot result plus a progress stream for one dispatched job.
///
/// Cheap to clone: every clone shares the same underlying state, so the
/// executor pipeline, the dispatcher, and the original caller can each hold
/// a copy without coordinating ownership.
pub struct JobHandle<T> {
    pub job_id: Arc<str>,
    shared: Arc<Shared<T>>,
}

impl<T> Clone for JobHandle<T> {
    fn clone(&self) -> Self {
        Self {
            job_id: Arc::clone(&self.job_id),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> JobHandle<T> {
    pub fn new(job_id: impl Into<String>) -> Self {
        let (progress_tx, progress_rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
        Self {
            job_id: Arc::from(job_id.into()),
            shared: Arc::new(Shared {
                outcome: Mutex::new(None),
                notify: Notify::new(),
                completion_listeners: Mutex::new(Vec::new()),
                progress_tx: Mutex::new(Some(progress_tx)),
                progress_rx: Mutex::new(Some(progress_rx)),
            }),
        }
    }

    /// Take the progress stream. Returns `None` on a second call — only one
    /// consumer may drain a handle's progress updates.
    pub fn take_progress_stream(&self) -> Option<ReceiverStream<ProgressUpdate>> {
        self.shared.progress_rx.lock().take().map(ReceiverStream::new)
    }

    pub fn is_completed(&self) -> bool {
        self.shared.outcome.lock().is_some()
    }

    /// Idempotent: only the first call (by either path) takes effect.
    pub fn complete(&self, data: T, source: DataSource) {
        self.finish(JobOutcome::Ok { data, source });
    }

    /// Idempotent: only the first call (by either path) takes effect.
    pub fn complete_error(&self, err: JobError) {
        self.finish(JobOutcome::Err(err));
    }

    fn finish(&self, outcome: JobOutcome<T>) {
        {
            let mut guard = self.shared.outcome.lock();
            if guard.is_some() {
                return;
            }
            *guard = Some(outcome);
        }
        self.shared.notify.notify_waiters();
        let listeners = std::mem::take(&mut *self.shared.completion_listeners.lock());
        for listener in listeners {
            listener();
        }
    }

    /// Run `f` once, the moment this handle completes. Runs synchronously
    /// and immediately if the handle is already completed. Used by the
    /// orchestrator to drop a job id from its active set without requiring
    /// every caller to await the handle's result.
    pub fn on_complete(&self, f: impl FnOnce() + Send + 'static) {
        let mut listeners = self.shared.completion_listeners.lock();
        if self.shared.outcome.lock().is_some() {
            drop(listeners);
            f();
            return;
        }
        listeners.push(Box::new(f));
    }

    /// Clamped into `[0, 1]`. Dropped silently if the progress stream's
    /// consumer has gone away or the buffer is full.
    pub fn report_progress(
        &self,
        value: f32,
        message: Option<String>,
        current_step: Option<u32>,
        total_steps: Option<u32>,
    ) {
        let clamped = value.clamp(0.0, 1.0);
        if let Some(tx) = self.shared.progress_tx.lock().as_ref() {
            let _ = tx.try_send(ProgressUpdate {
                value: clamped,
                message,
                current_step,
                total_steps,
            });
        }
    }

    /// `current / total`, or `0` if `total` is zero.
    pub fn report_step(&self, current: u32, total: u32) {
        let value = if total == 0 {
            0.0
        } else {
            current as f32 / total as f32
        };
        self.report_progress(value, None, Some(current), Some(total));
    }

    /// Drop the progress sender, ending the consumer's stream with `None`.
    /// Called by the executor pipeline once a job has fully settled.
    pub fn close_progress(&self) {
        self.shared.progress_tx.lock().take();
    }
}

impl<T: Clone> JobHandle<T> {
    /// Await the job's terminal outcome. Safe to call from multiple clones
    /// of the same handle; every caller observes the same outcome.
    pub async fn result(&self) -> Result<(T, DataSource), JobError> {
        loop {
            let notified = self.shared.notify.notified();
            if let Some(outcome) = self.shared.outcome.lock().as_ref().cloned() {
                return match outcome {
                    JobOutcome::Ok { data, source } => Ok((data, source)),
                    JobOutcome::Err(e) => Err(e),
                };
            }
            notified.await;
        }
    }
}

#[cfg(test)]
#[path = "job_handle_tests.rs"]
mod tests;
