// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::cache_policy::CachePolicy;
use crate::clock::FakeClock;
use std::time::SystemTime;

#[derive(Debug, Clone)]
struct UsersLoaded {
    correlation_id: String,
    users: Vec<String>,
    source: DataSource,
}

impl DomainEvent for UsersLoaded {
    fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
    fn timestamp(&self) -> SystemTime {
        SystemTime::now()
    }
}

fn make_job(clock: &FakeClock) -> Job<Vec<String>, UsersLoaded> {
    Job::new("job", clock, |result: &Vec<String>, source| UsersLoaded {
        correlation_id: "placeholder".into(),
        users: result.clone(),
        source,
    })
}

#[test]
fn new_generates_an_id_and_has_no_strategy() {
    let clock = FakeClock::new();
    let job = make_job(&clock);
    assert!(job.id.as_str().starts_with("job-"));
    assert!(job.cache_key().is_none());
    assert!(!job.revalidate());
    assert!(!job.force_refresh());
}

#[test]
fn strategy_accessors_read_through_to_cache_policy() {
    let clock = FakeClock::new();
    let job = make_job(&clock).with_strategy(
        DataStrategy::new().with_cache_policy(CachePolicy::stale_while_revalidate("users")),
    );
    assert_eq!(job.cache_key(), Some("users"));
    assert!(job.revalidate());
    assert!(!job.force_refresh());
}

#[test]
fn make_event_invokes_the_stored_closure() {
    let clock = FakeClock::new();
    let job = make_job(&clock);
    let event = job.make_event(&vec!["alice".to_string()], DataSource::Fresh);
    assert_eq!(event.users, vec!["alice".to_string()]);
    assert_eq!(event.source, DataSource::Fresh);
}

#[test]
fn inverse_event_is_absent_unless_configured() {
    let clock = FakeClock::new();
    let job = make_job(&clock);
    assert!(!job.has_inverse_event());
    assert!(job.make_inverse_event().is_none());

    let job = make_job(&clock).with_inverse_event(|| UsersLoaded {
        correlation_id: "rollback".into(),
        users: vec![],
        source: DataSource::Failed,
    });
    assert!(job.has_inverse_event());
    assert!(job.make_inverse_event().is_some());
}

#[test]
fn setters_configure_timeout_and_retry() {
    let clock = FakeClock::new();
    let job = make_job(&clock)
        .timeout(std::time::Duration::from_secs(5))
        .retry_policy(RetryPolicy::new(3, std::time::Duration::from_millis(10)));
    assert_eq!(job.timeout, Some(std::time::Duration::from_secs(5)));
    assert!(job.retry_policy.is_some());
}
