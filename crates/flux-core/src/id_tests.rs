// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::{FakeClock, SystemClock};
use proptest::prelude::*;
use std::collections::HashSet;

#[test]
fn generate_uses_prefix_timestamp_and_hex_suffix() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_732_650_123_456);
    let id = JobId::generate("fetch", &clock);
    let s = id.as_str();
    let parts: Vec<&str> = s.split('-').collect();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0], "fetch");
    assert_eq!(parts[1], "1732650123456000");
    assert_eq!(parts[2].len(), 6);
    assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn empty_prefix_falls_back_to_default() {
    let clock = FakeClock::new();
    let id = JobId::generate("", &clock);
    assert_eq!(id.prefix(), DEFAULT_PREFIX);
}

#[test]
fn ids_are_unique_across_many_generations_at_the_same_instant() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_000);
    let mut seen = HashSet::new();
    for _ in 0..256 {
        let id = JobId::generate("job", &clock);
        assert!(seen.insert(id.as_str().to_string()), "duplicate id generated");
    }
}

#[test]
fn display_matches_as_str() {
    let id = JobId::from("job-1-abcdef");
    assert_eq!(id.to_string(), "job-1-abcdef");
}

#[test]
fn system_clock_ids_are_well_formed() {
    let clock = SystemClock;
    let id = JobId::generate("sys", &clock);
    assert!(id.as_str().starts_with("sys-"));
}

proptest! {
    // P12: ids generated at arbitrary, possibly-colliding timestamps never collide.
    #[test]
    fn generated_ids_never_collide(epoch_mss in proptest::collection::vec(0u64..10_000, 1..200)) {
        let clock = FakeClock::new();
        let mut seen = HashSet::new();
        for ms in epoch_mss {
            clock.set_epoch_ms(ms);
            let id = JobId::generate("job", &clock);
            prop_assert!(seen.insert(id.as_str().to_string()));
        }
    }
}
