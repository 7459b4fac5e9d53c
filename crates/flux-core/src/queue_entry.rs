// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The persisted, storage-agnostic shape of one offline-queued job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of replay failures before an entry is poisoned.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueEntryStatus {
    Pending,
    Processing,
    Poisoned,
}

crate::simple_display! {
    QueueEntryStatus {
        Pending => "pending",
        Processing => "processing",
        Poisoned => "poisoned",
    }
}

/// One entry in the offline queue. Ordering is by `timestamp` ascending
/// (FIFO); `id` doubles as the correlation id used to match replay results
/// back to this entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkQueueEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub status: QueueEntryStatus,
    pub retry_count: u32,
    pub last_error: Option<String>,
}

impl NetworkQueueEntry {
    pub fn new(id: impl Into<String>, type_name: impl Into<String>, payload: serde_json::Value, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
            payload,
            timestamp,
            status: QueueEntryStatus::Pending,
            retry_count: 0,
            last_error: None,
        }
    }

    pub fn is_poisoned_after_failure(&self, max_retries: u32) -> bool {
        self.retry_count + 1 >= max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entry_starts_pending_with_zero_retries() {
        let entry = NetworkQueueEntry::new("q-1", "SendMessage", serde_json::json!({}), Utc::now());
        assert_eq!(entry.status, QueueEntryStatus::Pending);
        assert_eq!(entry.retry_count, 0);
        assert!(entry.last_error.is_none());
    }

    #[test]
    fn is_poisoned_after_failure_compares_against_default_max_retries() {
        let mut entry = NetworkQueueEntry::new("q-1", "SendMessage", serde_json::json!({}), Utc::now());
        entry.retry_count = DEFAULT_MAX_RETRIES - 1;
        assert!(entry.is_poisoned_after_failure(DEFAULT_MAX_RETRIES));
    }

    #[test]
    fn serializes_with_camel_case_field_names() {
        let entry = NetworkQueueEntry::new("q-1", "SendMessage", serde_json::json!({"text": "hi"}), Utc::now());
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("retryCount").is_some());
        assert!(json.get("lastError").is_some());
        assert!(json.get("type").is_some());
    }

    #[test]
    fn status_display_is_lowercase() {
        assert_eq!(QueueEntryStatus::Processing.to_string(), "processing");
    }
}
