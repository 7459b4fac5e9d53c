// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The base a UI-surface-scoped state holder composes with: owns `S`,
//! subscribes to a bus, routes events to a delegate, and tracks which jobs
//! it dispatched are still in flight.
//!
//! Rust has no implementation inheritance, so where the teacher's runtime
//! would subclass a base class, this is composition: an application type
//! holds an `OrchestratorBase<S, TEvent>` field and implements
//! [`OrchestratorDelegate`] for its own `on_event` logic, mirroring the
//! `Observer` hook pattern already used by `flux_executor::JobPipeline` —
//! a user-supplied callback trait, invoked through a panic-isolating
//! wrapper so one bad subscriber never takes down event delivery.

use crate::circuit_breaker::CircuitBreaker;
use flux_core::{Bus, DomainEvent, Envelope, Job, JobError, JobHandle, Subscription};
use flux_dispatcher::Dispatcher;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Override point for events delivered to an orchestrator's bus subscription.
///
/// Never allowed to crash the orchestrator: [`OrchestratorBase`] wraps every
/// call in `catch_unwind` and logs a panic rather than propagating it, the
/// same isolation `JobPipeline` gives `Observer`.
pub trait OrchestratorDelegate<TEvent: DomainEvent>: Send + Sync {
    fn on_event(&self, event: &Envelope<TEvent>);
}

struct Shared<S, TEvent: DomainEvent + Clone> {
    state: RwLock<S>,
    state_tx: watch::Sender<S>,
    bus: Bus<Envelope<TEvent>>,
    dispatcher: RwLock<Option<Arc<Dispatcher<TEvent>>>>,
    active_jobs: Mutex<HashSet<String>>,
    circuit_breaker: CircuitBreaker,
    delegate: RwLock<Option<Arc<dyn OrchestratorDelegate<TEvent>>>>,
    disposed: AtomicBool,
}

impl<S, TEvent: DomainEvent + Clone> Shared<S, TEvent> {
    fn handle_event(&self, event: &Envelope<TEvent>) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        if !self.circuit_breaker.allow(event.kind_tag()) {
            return;
        }
        let Some(delegate) = self.delegate.read().clone() else {
            return;
        };
        let call = std::panic::AssertUnwindSafe(|| delegate.on_event(event));
        if let Err(payload) = std::panic::catch_unwind(call) {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            tracing::error!(panic = %message, "orchestrator delegate on_event panicked, ignoring");
        }
    }
}

/// Owns state `S`, dispatches jobs of one application event type `TEvent`,
/// and routes bus events to an optional [`OrchestratorDelegate`].
pub struct OrchestratorBase<S, TEvent: DomainEvent + Clone> {
    shared: Arc<Shared<S, TEvent>>,
    subscription: Mutex<Option<Subscription<Envelope<TEvent>>>>,
}

impl<S, TEvent> OrchestratorBase<S, TEvent>
where
    S: Clone + Send + Sync + 'static,
    TEvent: DomainEvent + Clone,
{
    /// Subscribes to the process-wide bus for `TEvent`.
    pub fn new(initial_state: S) -> Self {
        Self::with_bus(initial_state, Bus::global())
    }

    /// Subscribes to a caller-owned scoped bus instead of the global one.
    pub fn with_bus(initial_state: S, bus: Bus<Envelope<TEvent>>) -> Self {
        let (state_tx, _rx) = watch::channel(initial_state.clone());
        let shared = Arc::new(Shared {
            state: RwLock::new(initial_state),
            state_tx,
            bus: bus.clone(),
            dispatcher: RwLock::new(None),
            active_jobs: Mutex::new(HashSet::new()),
            circuit_breaker: CircuitBreaker::default(),
            delegate: RwLock::new(None),
            disposed: AtomicBool::new(false),
        });

        let routed = Arc::clone(&shared);
        let subscription = bus
            .subscribe(move |event: &Envelope<TEvent>| routed.handle_event(event))
            .ok();

        Self {
            shared,
            subscription: Mutex::new(subscription),
        }
    }

    pub fn with_dispatcher(self, dispatcher: Arc<Dispatcher<TEvent>>) -> Self {
        *self.shared.dispatcher.write() = Some(dispatcher);
        self
    }

    pub fn with_delegate(self, delegate: Arc<dyn OrchestratorDelegate<TEvent>>) -> Self {
        *self.shared.delegate.write() = Some(delegate);
        self
    }

    pub fn with_circuit_breaker_limit(self, kind: &'static str, limit: u32) -> Self {
        self.shared.circuit_breaker.set_limit(kind, limit);
        self
    }

    /// Change the circuit breaker's default per-second limit, applied to any
    /// event kind without its own override via
    /// [`with_circuit_breaker_limit`](Self::with_circuit_breaker_limit).
    pub fn with_default_event_limit(self, limit: u32) -> Self {
        self.shared.circuit_breaker.set_default_limit(limit);
        self
    }

    pub fn state(&self) -> S
    where
        S: Clone,
    {
        self.shared.state.read().clone()
    }

    /// A stream of every state pushed via [`OrchestratorBase::emit`], starting
    /// from the current state. Each call opens an independent receiver.
    pub fn subscribe_state(&self) -> WatchStream<S> {
        WatchStream::new(self.shared.state_tx.subscribe())
    }

    /// Update `state` and push it to every live `subscribe_state` stream.
    /// A no-op after [`dispose`](OrchestratorBase::dispose).
    pub fn emit(&self, new_state: S) {
        if self.shared.disposed.load(Ordering::SeqCst) {
            return;
        }
        *self.shared.state.write() = new_state.clone();
        let _ = self.shared.state_tx.send(new_state);
    }

    /// Dispatch `job` through the configured dispatcher, attaching this
    /// orchestrator's bus and tracking the job id as active until the
    /// returned handle completes.
    ///
    /// Always returns a handle, even if no dispatcher is configured or the
    /// dispatcher rejects the job synchronously (e.g. no executor
    /// registered) — the failure surfaces through the handle instead of as
    /// an immediate error, so fire-and-forget callers that never await
    /// never see an uncaught error.
    pub fn dispatch<TResult>(&self, mut job: Job<TResult, TEvent>) -> JobHandle<TResult>
    where
        TResult: Clone + Send + Sync + serde::Serialize + serde::de::DeserializeOwned + 'static,
    {
        job.bus = Some(self.shared.bus.clone());
        let handle: JobHandle<TResult> = JobHandle::new(job.id.as_str());
        let job_id = job.id.to_string();

        self.shared.active_jobs.lock().insert(job_id.clone());
        let shared = Arc::clone(&self.shared);
        handle.on_complete(move || {
            shared.active_jobs.lock().remove(&job_id);
        });

        let dispatcher = self.shared.dispatcher.read().clone();
        match dispatcher {
            Some(dispatcher) => {
                if let Err(err) = dispatcher.dispatch(job, handle.clone()) {
                    handle.complete_error(err);
                }
            }
            None => handle.complete_error(JobError::Cache("no dispatcher configured on this orchestrator".to_string())),
        }
        handle
    }

    /// Stop tracking `id` as active. Does not cancel the underlying job;
    /// callers must hold and cancel its `CancellationToken` separately.
    pub fn cancel_job(&self, id: &str) {
        self.shared.active_jobs.lock().remove(id);
    }

    pub fn is_job_running(&self, id: &str) -> bool {
        self.shared.active_jobs.lock().contains(id)
    }

    /// Cancel the bus subscription, stop accepting state updates, and clear
    /// active-job tracking. Idempotent.
    pub fn dispose(&self) {
        self.shared.disposed.store(true, Ordering::SeqCst);
        if let Some(subscription) = self.subscription.lock().take() {
            subscription.unsubscribe();
        }
        self.shared.active_jobs.lock().clear();
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
