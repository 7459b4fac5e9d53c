// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opt-in logging of job lifecycle and bus traffic.

use flux_core::{DataSource, JobError};

/// All hooks default to no-ops, so an implementation only needs to override
/// what it actually wants to observe. The executor pipeline isolates panics
/// from observer calls — a misbehaving observer is logged, never propagated.
pub trait Observer: Send + Sync {
    fn on_job_start(&self, job_id: &str, type_name: &str) {
        let _ = (job_id, type_name);
    }

    fn on_job_success(&self, job_id: &str, source: DataSource) {
        let _ = (job_id, source);
    }

    fn on_job_error(&self, job_id: &str, error: &JobError) {
        let _ = (job_id, error);
    }

    fn on_event(&self, kind_tag: &str, correlation_id: &str) {
        let _ = (kind_tag, correlation_id);
    }
}
