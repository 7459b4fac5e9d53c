// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cache-first vs. stale-while-revalidate policy for a dispatched job.

use std::time::Duration;

/// How a job's result should interact with the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    pub key: String,
    pub ttl: Option<Duration>,
    /// `true` = stale-while-revalidate (return cached, then refresh).
    /// `false` = cache-first (return cached, skip the worker entirely).
    pub revalidate: bool,
    /// Skip the cache read entirely, as if there were no hit.
    pub force_refresh: bool,
}

impl CachePolicy {
    pub fn cache_first(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ttl: None,
            revalidate: false,
            force_refresh: false,
        }
    }

    pub fn stale_while_revalidate(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ttl: None,
            revalidate: true,
            force_refresh: false,
        }
    }

    crate::setters! {
        option { ttl: Duration }
        set { revalidate: bool, force_refresh: bool }
    }
}

/// A job's optional placeholder value paired with its optional cache policy.
///
/// The placeholder is carried for legacy/adapter compatibility; the EventJob
/// pipeline this runtime implements never emits a generic placeholder event
/// from it (see the executor pipeline's cache-read step).
#[derive(Debug, Clone, Default)]
pub struct DataStrategy<TPlaceholder = ()> {
    pub placeholder: Option<TPlaceholder>,
    pub cache_policy: Option<CachePolicy>,
}

impl<TPlaceholder> DataStrategy<TPlaceholder> {
    pub fn new() -> Self {
        Self {
            placeholder: None,
            cache_policy: None,
        }
    }

    pub fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = Some(policy);
        self
    }

    pub fn with_placeholder(mut self, placeholder: TPlaceholder) -> Self {
        self.placeholder = Some(placeholder);
        self
    }
}
