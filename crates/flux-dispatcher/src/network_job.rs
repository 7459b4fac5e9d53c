// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconstructing a queued job from its persisted payload during replay.
//!
//! A [`NetworkJobFactory`] is registered once per network-action job type,
//! keyed by the same `type_name` string stored on the queue entry. Unlike
//! [`crate::registry::ExecutorRegistry`], which is indexed by `TResult` and
//! downcast at a call site that already knows the concrete type, a replayed
//! entry arrives with nothing but a string and a JSON blob — so the factory
//! trait itself must be object-safe and type-erased from the start.

use crate::Dispatcher;
use async_trait::async_trait;
use flux_core::{Bus, DomainEvent, Envelope, JobError, JobId, NetworkQueueEntry};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

/// Rebuilds one network-action job type from its queued payload and carries
/// it through to a terminal outcome.
#[async_trait]
pub trait NetworkJobFactory<TEvent: DomainEvent + Clone>: Send + Sync {
    /// Reconstruct the job from `entry` and run it through `dispatcher` to
    /// completion, returning once a terminal outcome is known. This subsumes
    /// the "wait for a terminal event with matching correlation id" step:
    /// awaiting the freshly dispatched job's own handle observes exactly the
    /// same terminal state a correlation-id-matched bus subscription would,
    /// without needing to erase `TResult` a second time. The rebuilt job
    /// carries `entry.id` as its job id, so the correlation id survives the
    /// round trip through persisted storage.
    async fn replay(&self, entry: &NetworkQueueEntry, dispatcher: Arc<Dispatcher<TEvent>>) -> Result<(), JobError>;

    /// Emit the job's inverse event (if it has one) onto `bus`, used once an
    /// entry has been poisoned and will not be retried again.
    async fn emit_inverse_event(&self, entry: &NetworkQueueEntry, bus: &Bus<Envelope<TEvent>>);
}

/// Adapts a plain "build a job from its payload" closure into a
/// [`NetworkJobFactory`] for one concrete `TResult`.
pub struct TypedNetworkJobFactory<TResult, TEvent, F> {
    build: F,
    _marker: PhantomData<fn() -> (TResult, TEvent)>,
}

impl<TResult, TEvent, F> TypedNetworkJobFactory<TResult, TEvent, F> {
    pub fn new(build: F) -> Self {
        Self { build, _marker: PhantomData }
    }
}

#[async_trait]
impl<TResult, TEvent, F> NetworkJobFactory<TEvent> for TypedNetworkJobFactory<TResult, TEvent, F>
where
    TResult: Clone + Send + Sync + serde::Serialize + serde::de::DeserializeOwned + 'static,
    TEvent: DomainEvent + Clone,
    F: Fn(serde_json::Value) -> Result<flux_core::Job<TResult, TEvent>, JobError> + Send + Sync,
{
    async fn replay(&self, entry: &NetworkQueueEntry, dispatcher: Arc<Dispatcher<TEvent>>) -> Result<(), JobError> {
        let mut job = (self.build)(entry.payload.clone())?;
        job.id = JobId::from(entry.id.clone());
        let handle: flux_core::JobHandle<TResult> = flux_core::JobHandle::new(job.id.as_str());
        dispatcher.dispatch(job, handle.clone())?;
        handle.result().await.map(|_| ())
    }

    async fn emit_inverse_event(&self, entry: &NetworkQueueEntry, bus: &Bus<Envelope<TEvent>>) {
        let Ok(job) = (self.build)(entry.payload.clone()) else {
            return;
        };
        if let Some(event) = job.make_inverse_event() {
            bus.emit(&Envelope::Domain(event));
        }
    }
}

/// `type_name -> factory` map used to reconstruct queued jobs during replay.
pub struct NetworkJobRegistry<TEvent: DomainEvent + Clone> {
    factories: RwLock<HashMap<String, Arc<dyn NetworkJobFactory<TEvent>>>>,
}

impl<TEvent: DomainEvent + Clone> Default for NetworkJobRegistry<TEvent> {
    fn default() -> Self {
        Self { factories: RwLock::new(HashMap::new()) }
    }
}

impl<TEvent: DomainEvent + Clone> NetworkJobRegistry<TEvent> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, type_name: impl Into<String>, factory: Arc<dyn NetworkJobFactory<TEvent>>) {
        self.factories.write().insert(type_name.into(), factory);
    }

    pub fn lookup(&self, type_name: &str) -> Option<Arc<dyn NetworkJobFactory<TEvent>>> {
        self.factories.read().get(type_name).cloned()
    }
}
