// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cache backend contract.

use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Clone, thiserror::Error)]
#[error("cache error: {0}")]
pub struct CacheError(pub String);

/// A request-scoped cache with TTL and predicate-based invalidation.
///
/// A miss and an expired entry are indistinguishable to callers: both read
/// as `Ok(None)`. Failures surface as `Err`; the executor pipeline treats
/// them as a miss on read and ignores them on write (see the error handling
/// table).
#[async_trait]
pub trait CacheProvider: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError>;
    async fn write(
        &self,
        key: &str,
        value: serde_json::Value,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
    /// Delete every entry whose key matches `predicate`.
    async fn delete_matching(&self, predicate: &(dyn Fn(&str) -> bool + Send + Sync)) -> Result<(), CacheError>;
}
