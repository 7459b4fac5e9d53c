// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Type-indexed executor registry.
//!
//! One dispatcher fixes a single application event type `TEvent`; the result
//! type `TResult` still varies per job, so executors are stored behind `Any`
//! and downcast back to a concrete `Arc<dyn Executor<TResult, TEvent>>` at the
//! `dispatch` call site, where `TResult` is already known from the job being
//! dispatched.

use flux_core::DomainEvent;
use flux_executor::Executor;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

struct Entry {
    type_name: &'static str,
    executor: Box<dyn Any + Send + Sync>,
}

/// Executors registered for one dispatcher, keyed by the `TResult` type they
/// produce.
pub struct ExecutorRegistry<TEvent> {
    entries: RwLock<HashMap<TypeId, Entry>>,
    _marker: std::marker::PhantomData<fn() -> TEvent>,
}

impl<TEvent: DomainEvent> Default for ExecutorRegistry<TEvent> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            _marker: std::marker::PhantomData,
        }
    }
}

impl<TEvent: DomainEvent> ExecutorRegistry<TEvent> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<TResult, E>(&self, executor: Arc<E>)
    where
        TResult: 'static,
        E: Executor<TResult, TEvent> + 'static,
    {
        let erased: Arc<dyn Executor<TResult, TEvent>> = executor;
        self.entries.write().insert(
            TypeId::of::<TResult>(),
            Entry {
                type_name: std::any::type_name::<TResult>(),
                executor: Box::new(erased),
            },
        );
    }

    pub fn lookup<TResult: 'static>(&self) -> Option<Arc<dyn Executor<TResult, TEvent>>> {
        self.entries
            .read()
            .get(&TypeId::of::<TResult>())
            .and_then(|entry| entry.executor.downcast_ref::<Arc<dyn Executor<TResult, TEvent>>>())
            .cloned()
    }

    pub fn is_registered<TResult: 'static>(&self) -> bool {
        self.entries.read().contains_key(&TypeId::of::<TResult>())
    }

    pub fn registered_type_names(&self) -> Vec<&'static str> {
        self.entries.read().values().map(|e| e.type_name).collect()
    }
}
