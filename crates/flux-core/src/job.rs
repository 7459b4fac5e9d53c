// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The typed work request passed to `orchestrator.dispatch`.

use crate::cache_policy::DataStrategy;
use crate::cancellation::CancellationToken;
use crate::clock::Clock;
use crate::data_source::DataSource;
use crate::event::{DomainEvent, Envelope};
use crate::id::JobId;
use crate::retry::RetryPolicy;
use flux_bus::Bus;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// A typed command: `TResult` is what the worker produces, `TEvent` is the
/// application's domain event type emitted once a result is available.
///
/// `make_event` and `make_inverse_event` are boxed closures rather than a
/// trait, so a job can be built inline at a dispatch call site instead of
/// requiring a dedicated type per job.
pub struct Job<TResult, TEvent: DomainEvent> {
    pub id: JobId,
    pub timeout: Option<Duration>,
    pub cancellation_token: Option<CancellationToken>,
    pub retry_policy: Option<RetryPolicy>,
    pub metadata: HashMap<String, String>,
    /// Attached by the orchestrator immediately before dispatch; not set by
    /// job authors directly.
    pub bus: Option<Bus<Envelope<TEvent>>>,
    pub strategy: Option<DataStrategy<serde_json::Value>>,
    make_event: Arc<dyn Fn(&TResult, DataSource) -> TEvent + Send + Sync>,
    make_inverse_event: Option<Arc<dyn Fn() -> TEvent + Send + Sync>>,
}

impl<TResult, TEvent: DomainEvent> Job<TResult, TEvent> {
    pub fn new(
        prefix: &str,
        clock: &impl Clock,
        make_event: impl Fn(&TResult, DataSource) -> TEvent + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: JobId::generate(prefix, clock),
            timeout: None,
            cancellation_token: None,
            retry_policy: None,
            metadata: HashMap::new(),
            bus: None,
            strategy: None,
            make_event: Arc::new(make_event),
            make_inverse_event: None,
        }
    }

    crate::setters! {
        option { timeout: Duration, cancellation_token: CancellationToken, retry_policy: RetryPolicy }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_strategy(mut self, strategy: DataStrategy<serde_json::Value>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_inverse_event(
        mut self,
        make_inverse_event: impl Fn() -> TEvent + Send + Sync + 'static,
    ) -> Self {
        self.make_inverse_event = Some(Arc::new(make_inverse_event));
        self
    }

    /// Attach the delivery bus. Called by the orchestrator immediately
    /// before handing the job to the dispatcher (invariant I3).
    pub fn with_bus(mut self, bus: Bus<Envelope<TEvent>>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn cache_key(&self) -> Option<&str> {
        self.strategy
            .as_ref()
            .and_then(|s| s.cache_policy.as_ref())
            .map(|p| p.key.as_str())
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        self.strategy.as_ref().and_then(|s| s.cache_policy.as_ref()).and_then(|p| p.ttl)
    }

    pub fn revalidate(&self) -> bool {
        self.strategy
            .as_ref()
            .and_then(|s| s.cache_policy.as_ref())
            .map(|p| p.revalidate)
            .unwrap_or(false)
    }

    pub fn force_refresh(&self) -> bool {
        self.strategy
            .as_ref()
            .and_then(|s| s.cache_policy.as_ref())
            .map(|p| p.force_refresh)
            .unwrap_or(false)
    }

    pub fn make_event(&self, result: &TResult, source: DataSource) -> TEvent {
        (self.make_event)(result, source)
    }

    pub fn make_inverse_event(&self) -> Option<TEvent> {
        self.make_inverse_event.as_ref().map(|f| f())
    }

    pub fn has_inverse_event(&self) -> bool {
        self.make_inverse_event.is_some()
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
