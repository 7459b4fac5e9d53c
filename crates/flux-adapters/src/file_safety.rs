// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transient-to-durable file path rewriting for queued jobs.

use async_trait::async_trait;

#[derive(Debug, Clone, thiserror::Error)]
#[error("file safety error: {0}")]
pub struct FileSafetyError(pub String);

/// Copies any transient file paths referenced inside a queued job's payload
/// to durable locations before the payload is persisted, and removes those
/// durable copies once the job has finished replaying.
#[async_trait]
pub trait FileSafetyDelegate: Send + Sync {
    async fn secure_files(&self, payload: serde_json::Value) -> Result<serde_json::Value, FileSafetyError>;
    async fn cleanup_files(&self, payload: &serde_json::Value) -> Result<(), FileSafetyError>;
}
