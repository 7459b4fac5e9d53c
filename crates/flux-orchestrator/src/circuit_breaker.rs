// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-event-type runaway-loop protection.
//!
//! Grounded on the same idiom as `oj_core::job::MAX_STEP_VISITS` — a bounded
//! counter that trips a breaker rather than letting a misbehaving producer
//! spin the runtime forever — generalized here to a sliding 1-second window
//! per envelope kind instead of a fixed per-step visit count.
//!
//! Uses [`tokio::time::Instant`] rather than [`std::time::Instant`] so tests
//! can drive the window under `#[tokio::test(start_paused = true)]` without
//! real sleeps.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

const WINDOW: Duration = Duration::from_secs(1);

/// Default per-type limit when no override is configured.
pub const DEFAULT_LIMIT_PER_SECOND: u32 = 50;

struct Window {
    start: Instant,
    count: u32,
    tripped_logged: bool,
}

/// A sliding 1-second window counter keyed by [`Envelope::kind_tag`](flux_core::Envelope::kind_tag).
///
/// `allow` returns `false` once a kind's count exceeds its limit for the
/// remainder of the current window; the drop is logged exactly once per
/// window, at the moment the limit is first crossed.
pub struct CircuitBreaker {
    default_limit: RwLock<u32>,
    overrides: RwLock<HashMap<&'static str, u32>>,
    windows: Mutex<HashMap<&'static str, Window>>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT_PER_SECOND)
    }
}

impl CircuitBreaker {
    pub fn new(default_limit: u32) -> Self {
        Self {
            default_limit: RwLock::new(default_limit),
            overrides: RwLock::new(HashMap::new()),
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Override the per-second limit for one event kind.
    pub fn set_limit(&self, kind: &'static str, limit: u32) {
        self.overrides.write().insert(kind, limit);
    }

    /// Change the limit applied to kinds with no per-kind override.
    pub fn set_default_limit(&self, limit: u32) {
        *self.default_limit.write() = limit;
    }

    fn limit_for(&self, kind: &'static str) -> u32 {
        self.overrides
            .read()
            .get(kind)
            .copied()
            .unwrap_or(*self.default_limit.read())
    }

    /// Record one observed event of `kind` and report whether it should be
    /// delivered. Resets the window when more than a second has elapsed
    /// since the window started.
    pub fn allow(&self, kind: &'static str) -> bool {
        let now = Instant::now();
        let limit = self.limit_for(kind);
        let mut windows = self.windows.lock();
        let window = windows.entry(kind).or_insert_with(|| Window {
            start: now,
            count: 0,
            tripped_logged: false,
        });
        if now.duration_since(window.start) > WINDOW {
            window.start = now;
            window.count = 0;
            window.tripped_logged = false;
        }
        window.count += 1;
        if window.count > limit {
            if !window.tripped_logged {
                tracing::warn!(kind, limit, "circuit breaker tripped, dropping events of this type for the rest of the window");
                window.tripped_logged = true;
            }
            false
        } else {
            true
        }
    }
}

#[cfg(test)]
#[path = "circuit_breaker_tests.rs"]
mod tests;
