// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A small synchronous fan-out bus.
//!
//! [`Bus<T>`] delivers values of a single payload type `T` to every listener
//! subscribed at emit time, in subscription order. Delivery is synchronous:
//! [`Bus::emit`] does not return until every listener has run, and a listener
//! that panics takes down the caller like any other panic — callers that
//! need isolation should catch inside their own listener.
//!
//! One process may host several independent buses over different payload
//! types; [`Bus::global`] keys a lazily-created singleton per `T` so callers
//! that only need "the one bus for this event type" never have to thread a
//! handle through their call stack.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Inner<T> {
    disposed: AtomicBool,
    next_id: AtomicU64,
    listeners: Mutex<Vec<(u64, Listener<T>)>>,
}

/// A synchronous, multi-listener broadcast channel for values of type `T`.
///
/// Cheap to clone: all clones share the same listener list.
pub struct Bus<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Bus<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Default for Bus<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Returned by [`Bus::subscribe`] once the bus has been disposed.
#[derive(Debug, Clone, thiserror::Error)]
#[error("bus has been disposed")]
pub struct BusDisposedError;

/// A live registration on a [`Bus`]. Dropping this does not unsubscribe;
/// call [`Subscription::unsubscribe`] explicitly.
pub struct Subscription<T> {
    id: u64,
    bus: Weak<Inner<T>>,
}

impl<T> Subscription<T> {
    /// Remove the listener from the bus. A no-op if the bus was already
    /// disposed or the listener already removed.
    pub fn unsubscribe(&self) {
        if let Some(inner) = self.bus.upgrade() {
            inner.listeners.lock().retain(|(id, _)| *id != self.id);
        }
    }
}

impl<T: 'static> Bus<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                disposed: AtomicBool::new(false),
                next_id: AtomicU64::new(0),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    /// The process-wide bus for payload type `T`, created on first access.
    ///
    /// Distinct payload types get distinct buses; the same `T` always
    /// resolves to the same underlying bus for the lifetime of the process.
    #[allow(clippy::expect_used)]
    pub fn global() -> Self
    where
        T: Send + Sync,
    {
        static REGISTRY: OnceLock<Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>> =
            OnceLock::new();
        let registry = REGISTRY.get_or_init(|| Mutex::new(HashMap::new()));
        let mut guard = registry.lock();
        let entry = guard
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Bus::<T>::new()) as Box<dyn Any + Send + Sync>);
        // The `TypeId` key guarantees this entry was inserted as `Bus<T>`.
        entry
            .downcast_ref::<Bus<T>>()
            .expect("flux-bus: global bus registry type mismatch")
            .clone()
    }

    /// Register a listener. Listeners run in subscription order on [`emit`](Bus::emit).
    pub fn subscribe(
        &self,
        listener: impl Fn(&T) + Send + Sync + 'static,
    ) -> Result<Subscription<T>, BusDisposedError> {
        if self.inner.disposed.load(Ordering::SeqCst) {
            return Err(BusDisposedError);
        }
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner
            .listeners
            .lock()
            .push((id, Arc::new(listener)));
        Ok(Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
        })
    }

    /// Deliver `value` to every currently-subscribed listener.
    ///
    /// A no-op after [`dispose`](Bus::dispose). Listeners are snapshotted
    /// before delivery, so a listener that subscribes or unsubscribes during
    /// `emit` affects only the *next* emit, never the one in progress.
    pub fn emit(&self, value: &T) {
        if self.inner.disposed.load(Ordering::SeqCst) {
            return;
        }
        let snapshot: Vec<Listener<T>> = {
            let guard = self.inner.listeners.lock();
            guard.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        for listener in snapshot {
            listener(value);
        }
    }

    /// Number of currently-registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    /// Permanently disable the bus: drops all listeners and rejects further
    /// subscriptions. Emits after disposal are silently dropped.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
        self.inner.listeners.lock().clear();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
