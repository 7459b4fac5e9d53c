// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory adapter implementations for tests and examples. Never used in
//! production — each one trades durability and real I/O for predictability.

use crate::cache::{CacheError, CacheProvider};
use crate::connectivity::{ConnectivityProvider, ConnectivityStream};
use crate::file_safety::{FileSafetyDelegate, FileSafetyError};
use crate::observer::Observer;
use crate::queue_storage::{QueueStorage, QueueStorageError};
use async_trait::async_trait;
use flux_core::{DataSource, JobError, NetworkQueueEntry, QueueEntryStatus};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;

/// An in-process cache with real TTL expiry, backed by a plain `HashMap`.
#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, (serde_json::Value, Option<Instant>)>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test helper: seed a value with no expiry.
    pub fn seed(&self, key: impl Into<String>, value: serde_json::Value) {
        self.entries.lock().insert(key.into(), (value, None));
    }
}

#[async_trait]
impl CacheProvider for InMemoryCache {
    async fn read(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some((_, Some(expires_at))) if Instant::now() >= *expires_at => {
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn write(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let expires_at = ttl.map(|d| Instant::now() + d);
        self.entries.lock().insert(key.to_string(), (value, expires_at));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.lock().remove(key);
        Ok(())
    }

    async fn delete_matching(&self, predicate: &(dyn Fn(&str) -> bool + Send + Sync)) -> Result<(), CacheError> {
        self.entries.lock().retain(|k, _| !predicate(k));
        Ok(())
    }
}

/// A connectivity fixture whose state is flipped directly by tests rather
/// than observed from a real platform API.
pub struct StaticConnectivity {
    tx: watch::Sender<bool>,
}

impl StaticConnectivity {
    pub fn new(connected: bool) -> Self {
        let (tx, _rx) = watch::channel(connected);
        Self { tx }
    }

    pub fn set_connected(&self, connected: bool) {
        let _ = self.tx.send(connected);
    }
}

impl ConnectivityProvider for StaticConnectivity {
    fn is_connected(&self) -> bool {
        *self.tx.subscribe().borrow()
    }

    fn on_change(&self) -> ConnectivityStream {
        Box::pin(WatchStream::new(self.tx.subscribe()).skip(1))
    }
}

/// A queue store backed by a `Vec` guarded by a single lock; `claim_next_pending`
/// holds that lock for its whole read-modify-write, which is what makes the
/// Pending → Processing transition atomic.
#[derive(Default)]
pub struct InMemoryQueueStorage {
    entries: Mutex<Vec<NetworkQueueEntry>>,
}

impl InMemoryQueueStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueueStorage for InMemoryQueueStorage {
    async fn push(&self, entry: NetworkQueueEntry) -> Result<(), QueueStorageError> {
        self.entries.lock().push(entry);
        Ok(())
    }

    async fn claim_next_pending(&self) -> Result<Option<NetworkQueueEntry>, QueueStorageError> {
        let mut entries = self.entries.lock();
        let next = entries
            .iter_mut()
            .filter(|e| e.status == QueueEntryStatus::Pending)
            .min_by_key(|e| e.timestamp);
        match next {
            Some(entry) => {
                entry.status = QueueEntryStatus::Processing;
                Ok(Some(entry.clone()))
            }
            None => Ok(None),
        }
    }

    async fn update(&self, entry: NetworkQueueEntry) -> Result<(), QueueStorageError> {
        let mut entries = self.entries.lock();
        if let Some(slot) = entries.iter_mut().find(|e| e.id == entry.id) {
            *slot = entry;
            Ok(())
        } else {
            Err(QueueStorageError(format!("no such queue entry: {}", entry.id)))
        }
    }

    async fn remove(&self, id: &str) -> Result<(), QueueStorageError> {
        self.entries.lock().retain(|e| e.id != id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<NetworkQueueEntry>, QueueStorageError> {
        Ok(self.entries.lock().clone())
    }
}

/// Returns every payload unchanged; tracks what it was called with so tests
/// can assert secure/cleanup pairing.
#[derive(Default)]
pub struct NoopFileSafety {
    pub secured: Mutex<Vec<serde_json::Value>>,
    pub cleaned: Mutex<Vec<serde_json::Value>>,
}

impl NoopFileSafety {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FileSafetyDelegate for NoopFileSafety {
    async fn secure_files(&self, payload: serde_json::Value) -> Result<serde_json::Value, FileSafetyError> {
        self.secured.lock().push(payload.clone());
        Ok(payload)
    }

    async fn cleanup_files(&self, payload: &serde_json::Value) -> Result<(), FileSafetyError> {
        self.cleaned.lock().push(payload.clone());
        Ok(())
    }
}

/// Records every hook call as a short string, in order, for assertions like
/// "job started before it succeeded".
#[derive(Default)]
pub struct RecordingObserver {
    log: Arc<Mutex<Vec<String>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<String> {
        self.log.lock().clone()
    }
}

impl Observer for RecordingObserver {
    fn on_job_start(&self, job_id: &str, type_name: &str) {
        self.log.lock().push(format!("start:{job_id}:{type_name}"));
    }

    fn on_job_success(&self, job_id: &str, source: DataSource) {
        self.log.lock().push(format!("success:{job_id}:{source}"));
    }

    fn on_job_error(&self, job_id: &str, error: &JobError) {
        self.log.lock().push(format!("error:{job_id}:{error}"));
    }

    fn on_event(&self, kind_tag: &str, correlation_id: &str) {
        self.log.lock().push(format!("event:{kind_tag}:{correlation_id}"));
    }
}

#[cfg(test)]
#[path = "fixtures_tests.rs"]
mod tests;
