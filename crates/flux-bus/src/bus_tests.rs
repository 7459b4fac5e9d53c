// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn emit_delivers_to_all_listeners_in_order() {
    let bus: Bus<u32> = Bus::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let a = Arc::clone(&seen);
    bus.subscribe(move |v: &u32| a.lock().push(("a", *v))).unwrap();
    let b = Arc::clone(&seen);
    bus.subscribe(move |v: &u32| b.lock().push(("b", *v))).unwrap();

    bus.emit(&7);

    assert_eq!(*seen.lock(), vec![("a", 7), ("b", 7)]);
}

#[test]
fn unsubscribe_stops_future_delivery() {
    let bus: Bus<u32> = Bus::new();
    let count = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&count);
    let sub = bus.subscribe(move |_| { c.fetch_add(1, Ordering::SeqCst); }).unwrap();

    bus.emit(&1);
    sub.unsubscribe();
    bus.emit(&2);

    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn dispose_rejects_new_subscriptions_and_drops_existing() {
    let bus: Bus<u32> = Bus::new();
    let count = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&count);
    bus.subscribe(move |_| { c.fetch_add(1, Ordering::SeqCst); }).unwrap();

    bus.dispose();
    bus.emit(&1);

    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert!(bus.subscribe(|_: &u32| {}).is_err());
}

#[test]
fn listener_subscribing_during_emit_is_not_called_until_next_emit() {
    let bus: Bus<u32> = Bus::new();
    let count = Arc::new(AtomicUsize::new(0));
    let bus_clone = bus.clone();
    let c = Arc::clone(&count);
    bus.subscribe(move |_| {
        let cc = Arc::clone(&c);
        bus_clone.subscribe(move |_| { cc.fetch_add(1, Ordering::SeqCst); }).unwrap();
    }).unwrap();

    bus.emit(&1);
    assert_eq!(count.load(Ordering::SeqCst), 0);
    bus.emit(&2);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn global_returns_the_same_bus_for_the_same_payload_type() {
    #[derive(Debug)]
    struct Marker;
    let a: Bus<Marker> = Bus::global();
    let b: Bus<Marker> = Bus::global();
    assert_eq!(a.listener_count(), 0);
    a.subscribe(|_| {}).unwrap();
    assert_eq!(b.listener_count(), 1);
}
