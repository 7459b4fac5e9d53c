// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-way cancellation latch with listener callbacks.
//!
//! Unlike `tokio_util::sync::CancellationToken`, callers here need a listener
//! that fires *immediately* if registered after cancellation already
//! happened — the executor pipeline relies on this to unwind cleanly no
//! matter when it attaches its cleanup hook relative to the cancel call.

use crate::error::JobError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

type Listener = Box<dyn FnOnce() + Send>;

struct Inner {
    cancelled: AtomicBool,
    next_id: AtomicU64,
    listeners: Mutex<Vec<(u64, Listener)>>,
}

/// A shared, cloneable cancellation flag.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by [`CancellationToken::on_cancel`]; drop or call
/// [`unregister`](CancelSubscription::unregister) to remove the listener
/// before it fires.
pub struct CancelSubscription {
    id: u64,
    token: Weak<Inner>,
}

impl CancelSubscription {
    pub fn unregister(&self) {
        if let Some(inner) = self.token.upgrade() {
            inner.listeners.lock().retain(|(id, _)| *id != self.id);
        }
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                next_id: AtomicU64::new(0),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `Err(JobError::Cancelled)` if cancellation has fired.
    pub fn throw_if_cancelled(&self) -> Result<(), JobError> {
        if self.is_cancelled() {
            Err(JobError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Idempotent: the first call fires every registered listener exactly
    /// once and clears the list; later calls are no-ops.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        let fired: Vec<(u64, Listener)> = std::mem::take(&mut *self.inner.listeners.lock());
        for (_, listener) in fired {
            listener();
        }
    }

    /// Register `f` to run when cancellation fires. If the token is already
    /// cancelled, `f` runs synchronously before this call returns.
    pub fn on_cancel(&self, f: impl FnOnce() + Send + 'static) -> CancelSubscription {
        if self.is_cancelled() {
            f();
            return CancelSubscription {
                id: 0,
                token: Weak::new(),
            };
        }
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner.listeners.lock().push((id, Box::new(f)));
        CancelSubscription {
            id,
            token: Arc::downgrade(&self.inner),
        }
    }
}

#[cfg(test)]
#[path = "cancellation_tests.rs"]
mod tests;
