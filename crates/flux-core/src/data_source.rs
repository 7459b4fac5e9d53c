// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Where a result came from.

/// Discriminant attached to every result and domain event, telling the
/// listener whether what it received is durable, provisional, or an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataSource {
    /// Produced by a worker invocation that ran to completion.
    Fresh,
    /// Read from the cache without running the worker.
    Cached,
    /// A caller-synthesised placeholder for an offline-queued action.
    Optimistic,
    /// The worker failed; only used where an event still needs to carry a source.
    Failed,
}

crate::simple_display! {
    DataSource {
        Fresh => "fresh",
        Cached => "cached",
        Optimistic => "optimistic",
        Failed => "failed",
    }
}
