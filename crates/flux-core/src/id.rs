// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job identifier generation.
//!
//! Ids look like `job-1732650123456789-a1b2c3`: a caller-supplied prefix, the
//! microsecond epoch timestamp at creation, and six hex digits of randomness
//! to break ties between ids minted in the same microsecond. The timestamp
//! component keeps ids roughly sortable by creation order without requiring
//! a shared counter.

use crate::clock::Clock;
use rand::RngCore;
use std::fmt;

/// Default prefix used when a caller does not supply one.
pub const DEFAULT_PREFIX: &str = "job";

/// A generated job identifier. Thin wrapper over `String` so call sites can't
/// confuse a job id with an arbitrary string without an explicit conversion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Generate a new id using `clock` for the timestamp component.
    pub fn generate(prefix: &str, clock: &impl Clock) -> Self {
        let prefix = if prefix.is_empty() { DEFAULT_PREFIX } else { prefix };
        let micros = clock.epoch_micros();
        let mut entropy = [0u8; 3];
        rand::thread_rng().fill_bytes(&mut entropy);
        let suffix = u32::from(entropy[0]) << 16 | u32::from(entropy[1]) << 8 | u32::from(entropy[2]);
        JobId(format!("{prefix}-{micros}-{suffix:06x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The prefix segment, i.e. everything before the first `-`.
    pub fn prefix(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        JobId(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        JobId(s.to_string())
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for JobId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
