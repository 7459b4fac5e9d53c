// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event envelope carried on the [`Bus`](flux_bus::Bus).
//!
//! Domain events are user-defined per application; this runtime only
//! contributes the framework-level events needed for offline queuing and
//! replay. [`Envelope<E>`] is the single payload type a `Bus` instance
//! actually carries, so one orchestrator's bus mixes its own domain event
//! type `E` with these framework variants without either side knowing about
//! the other.

use crate::data_source::DataSource;
use std::time::SystemTime;

/// Implemented by an application's own domain event enum/struct.
///
/// `correlation_id` must equal the id of the job that produced the event;
/// `timestamp` is when the event was constructed, not when it is delivered.
pub trait DomainEvent: Send + Sync + 'static {
    fn correlation_id(&self) -> &str;
    fn timestamp(&self) -> SystemTime;
}

/// Emitted by queue replay whenever a replay attempt fails, whether or not
/// the entry was poisoned by this failure.
#[derive(Debug, Clone, serde::Serialize)]
pub struct NetworkSyncFailureEvent {
    pub correlation_id: String,
    pub error: String,
    pub retry_count: u32,
    pub is_poisoned: bool,
    pub timestamp: SystemTime,
}

/// Emitted immediately after a `NetworkAction` job is queued while offline,
/// ahead of the matching [`JobSuccessEvent`]. Kept for adapters that model
/// job lifecycle as a start/end pair rather than a single result event.
#[derive(Debug, Clone, serde::Serialize)]
pub struct JobStartedEvent {
    pub correlation_id: String,
    pub timestamp: SystemTime,
}

/// Emitted with the optimistic result right after queuing a `NetworkAction`
/// offline, and again (with `source = Fresh`) when a replayed job succeeds.
/// The payload is serialised rather than generic because it crosses the
/// boundary between a user's job type and the framework's bus plumbing.
#[derive(Debug, Clone, serde::Serialize)]
pub struct JobSuccessEvent {
    pub correlation_id: String,
    pub data: serde_json::Value,
    pub source: DataSource,
    pub timestamp: SystemTime,
}

/// Internal diagnostic snapshot of the executor registry. Not part of the
/// user-facing event surface; observers may still see it on the bus.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExecutorRegistrySnapshotEvent {
    pub registered_types: Vec<&'static str>,
    pub timestamp: SystemTime,
}

/// Everything that can travel over one application's bus: its own domain
/// events plus the handful the runtime itself emits.
#[derive(Debug, Clone)]
pub enum Envelope<E> {
    Domain(E),
    NetworkSyncFailure(NetworkSyncFailureEvent),
    JobStarted(JobStartedEvent),
    JobSuccess(JobSuccessEvent),
    ExecutorRegistrySnapshot(ExecutorRegistrySnapshotEvent),
}

impl<E: DomainEvent> Envelope<E> {
    pub fn correlation_id(&self) -> &str {
        match self {
            Envelope::Domain(e) => e.correlation_id(),
            Envelope::NetworkSyncFailure(e) => &e.correlation_id,
            Envelope::JobStarted(e) => &e.correlation_id,
            Envelope::JobSuccess(e) => &e.correlation_id,
            Envelope::ExecutorRegistrySnapshot(_) => "",
        }
    }

    pub fn as_domain(&self) -> Option<&E> {
        match self {
            Envelope::Domain(e) => Some(e),
            _ => None,
        }
    }

    /// A stable, low-cardinality tag used as the circuit breaker's rate-limit
    /// key. Domain events share one tag (`"domain"`) by default: the
    /// orchestrator base keys per-type limits on the *kind* of envelope, not
    /// the application's internal event taxonomy.
    pub fn kind_tag(&self) -> &'static str {
        match self {
            Envelope::Domain(_) => "domain",
            Envelope::NetworkSyncFailure(_) => "network-sync-failure",
            Envelope::JobStarted(_) => "job-started",
            Envelope::JobSuccess(_) => "job-success",
            Envelope::ExecutorRegistrySnapshot(_) => "executor-registry-snapshot",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ping(String, SystemTime);
    impl DomainEvent for Ping {
        fn correlation_id(&self) -> &str {
            &self.0
        }
        fn timestamp(&self) -> SystemTime {
            self.1
        }
    }

    #[test]
    fn correlation_id_dispatches_through_variants() {
        let env: Envelope<Ping> = Envelope::Domain(Ping("job-1".into(), SystemTime::now()));
        assert_eq!(env.correlation_id(), "job-1");

        let env: Envelope<Ping> = Envelope::NetworkSyncFailure(NetworkSyncFailureEvent {
            correlation_id: "job-2".into(),
            error: "boom".into(),
            retry_count: 1,
            is_poisoned: false,
            timestamp: SystemTime::now(),
        });
        assert_eq!(env.correlation_id(), "job-2");
    }

    #[test]
    fn as_domain_only_matches_domain_variant() {
        let env: Envelope<Ping> = Envelope::Domain(Ping("job-1".into(), SystemTime::now()));
        assert!(env.as_domain().is_some());

        let env: Envelope<Ping> = Envelope::ExecutorRegistrySnapshot(ExecutorRegistrySnapshotEvent {
            registered_types: vec![],
            timestamp: SystemTime::now(),
        });
        assert!(env.as_domain().is_none());
    }

    #[test]
    fn kind_tag_is_stable_per_variant() {
        let env: Envelope<Ping> = Envelope::JobStarted(JobStartedEvent {
            correlation_id: "job-3".into(),
            timestamp: SystemTime::now(),
        });
        assert_eq!(env.kind_tag(), "job-started");
    }
}
