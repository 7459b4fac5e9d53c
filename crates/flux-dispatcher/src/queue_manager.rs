// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wraps a [`QueueStorage`] with the file-safety pairing and error mapping
//! the dispatcher needs; owns none of the replay control flow itself.

use chrono::{DateTime, Utc};
use flux_adapters::{FileSafetyDelegate, QueueStorage};
use flux_core::{JobError, NetworkQueueEntry};
use std::sync::Arc;

pub struct QueueManager {
    storage: Arc<dyn QueueStorage>,
    file_safety: Option<Arc<dyn FileSafetyDelegate>>,
}

impl QueueManager {
    pub fn new(storage: Arc<dyn QueueStorage>) -> Self {
        Self { storage, file_safety: None }
    }

    pub fn with_file_safety(mut self, file_safety: Arc<dyn FileSafetyDelegate>) -> Self {
        self.file_safety = Some(file_safety);
        self
    }

    pub fn storage(&self) -> &Arc<dyn QueueStorage> {
        &self.storage
    }

    /// Secure any transient file references in `payload`, then persist a new
    /// `Pending` entry.
    pub async fn queue_action(
        &self,
        id: &str,
        type_name: &str,
        mut payload: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<(), JobError> {
        if let Some(file_safety) = &self.file_safety {
            payload = file_safety
                .secure_files(payload)
                .await
                .map_err(|err| JobError::Cache(err.to_string()))?;
        }
        let entry = NetworkQueueEntry::new(id, type_name, payload, now);
        self.storage.push(entry).await.map_err(|err| JobError::Cache(err.to_string()))
    }

    pub async fn claim_next_pending_job(&self) -> Result<Option<NetworkQueueEntry>, JobError> {
        self.storage.claim_next_pending().await.map_err(|err| JobError::Cache(err.to_string()))
    }

    pub async fn update(&self, entry: NetworkQueueEntry) -> Result<(), JobError> {
        self.storage.update(entry).await.map_err(|err| JobError::Cache(err.to_string()))
    }

    /// Remove an entry, releasing any durable file copies `secure_files` made
    /// for it. Used both when a replay succeeds and when an entry is poisoned.
    pub async fn remove_and_cleanup(&self, entry: &NetworkQueueEntry) -> Result<(), JobError> {
        if let Some(file_safety) = &self.file_safety {
            let _ = file_safety.cleanup_files(&entry.payload).await;
        }
        self.storage.remove(&entry.id).await.map_err(|err| JobError::Cache(err.to_string()))
    }
}
