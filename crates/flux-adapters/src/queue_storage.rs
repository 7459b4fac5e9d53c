// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted offline-queue storage contract.

use async_trait::async_trait;
use flux_core::NetworkQueueEntry;

#[derive(Debug, Clone, thiserror::Error)]
#[error("queue storage error: {0}")]
pub struct QueueStorageError(pub String);

/// CRUD over [`NetworkQueueEntry`] with stable FIFO ordering.
///
/// `claim_next_pending` is the only sanctioned way to move an entry from
/// `Pending` to `Processing`; implementations must make that transition
/// atomic so two concurrent callers never claim the same entry.
#[async_trait]
pub trait QueueStorage: Send + Sync {
    async fn push(&self, entry: NetworkQueueEntry) -> Result<(), QueueStorageError>;
    async fn claim_next_pending(&self) -> Result<Option<NetworkQueueEntry>, QueueStorageError>;
    async fn update(&self, entry: NetworkQueueEntry) -> Result<(), QueueStorageError>;
    async fn remove(&self, id: &str) -> Result<(), QueueStorageError>;
    async fn list(&self) -> Result<Vec<NetworkQueueEntry>, QueueStorageError>;
    async fn len(&self) -> Result<usize, QueueStorageError> {
        Ok(self.list().await?.len())
    }
}
