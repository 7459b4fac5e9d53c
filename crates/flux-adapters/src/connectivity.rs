// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Platform connectivity contract.

use std::pin::Pin;
use tokio_stream::Stream;

#[derive(Debug, Clone, thiserror::Error)]
#[error("connectivity error: {0}")]
pub struct ConnectivityError(pub String);

pub type ConnectivityStream = Pin<Box<dyn Stream<Item = bool> + Send>>;

/// Network reachability: a snapshot plus a change stream the dispatcher
/// watches to trigger offline-queue replay.
pub trait ConnectivityProvider: Send + Sync {
    fn is_connected(&self) -> bool;
    fn on_change(&self) -> ConnectivityStream;
}
