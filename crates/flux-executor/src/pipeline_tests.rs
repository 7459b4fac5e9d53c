// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use async_trait::async_trait;
use flux_adapters::fixtures::InMemoryCache;
use flux_adapters::fixtures::RecordingObserver;
use flux_core::{CachePolicy, DataStrategy, FakeClock, JobError};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
struct Count(u32);

#[derive(Debug, Clone)]
enum TestEvent {
    Loaded { correlation_id: String, value: u32, source: DataSource, at: SystemTime },
}

impl DomainEvent for TestEvent {
    fn correlation_id(&self) -> &str {
        match self {
            TestEvent::Loaded { correlation_id, .. } => correlation_id,
        }
    }
    fn timestamp(&self) -> SystemTime {
        match self {
            TestEvent::Loaded { at, .. } => *at,
        }
    }
}

fn make_event(result: &Count, source: DataSource) -> TestEvent {
    TestEvent::Loaded {
        correlation_id: "placeholder".into(),
        value: result.0,
        source,
        at: SystemTime::now(),
    }
}

fn new_job(strategy: Option<DataStrategy<serde_json::Value>>) -> Job<Count, TestEvent> {
    let clock = FakeClock::new();
    let mut job = Job::new("test", &clock, make_event);
    if let Some(strategy) = strategy {
        job = job.with_strategy(strategy);
    }
    job
}

struct AlwaysOk(u32);

#[async_trait]
impl Executor<Count, TestEvent> for AlwaysOk {
    async fn process(
        &self,
        _job: &Job<Count, TestEvent>,
        _handle: &JobHandle<Count>,
    ) -> Result<Count, JobError> {
        Ok(Count(self.0))
    }
}

struct FailsNTimes {
    remaining: AtomicU32,
    value: u32,
}

#[async_trait]
impl Executor<Count, TestEvent> for FailsNTimes {
    async fn process(
        &self,
        _job: &Job<Count, TestEvent>,
        _handle: &JobHandle<Count>,
    ) -> Result<Count, JobError> {
        if self.remaining.fetch_sub(1, Ordering::SeqCst) > 0 {
            return Err(JobError::worker(std::io::Error::other("transient")));
        }
        Ok(Count(self.value))
    }
}

struct NeverFinishes;

#[async_trait]
impl Executor<Count, TestEvent> for NeverFinishes {
    async fn process(
        &self,
        _job: &Job<Count, TestEvent>,
        _handle: &JobHandle<Count>,
    ) -> Result<Count, JobError> {
        std::future::pending().await
    }
}

fn events_of(bus: &Bus<Envelope<TestEvent>>) -> Arc<parking_lot::Mutex<Vec<DataSource>>> {
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    bus.subscribe(move |env: &Envelope<TestEvent>| {
        if let Some(TestEvent::Loaded { source, .. }) = env.as_domain() {
            sink.lock().push(*source);
        }
    })
    .expect("bus not disposed");
    seen
}

#[tokio::test]
async fn cache_first_hit_never_calls_the_worker() {
    let cache = Arc::new(InMemoryCache::new());
    cache.seed("k", serde_json::json!(7));
    let strategy = DataStrategy::default().with_cache_policy(CachePolicy::cache_first("k"));
    let job = new_job(Some(strategy)).with_bus(Bus::new());
    let bus = job.bus.clone().unwrap();
    let seen = events_of(&bus);
    let handle: JobHandle<Count> = JobHandle::new(job.id.as_str());

    let pipeline = JobPipeline::new(cache);
    let executor = Arc::new(AlwaysOk(999));
    pipeline.run(job, handle.clone(), executor).await;

    let (value, source) = handle.result().await.unwrap();
    assert_eq!(value, Count(7));
    assert_eq!(source, DataSource::Cached);
    assert_eq!(*seen.lock(), vec![DataSource::Cached]);
}

#[tokio::test]
async fn swr_hit_serves_cached_then_revalidates_to_fresh() {
    let cache = Arc::new(InMemoryCache::new());
    cache.seed("k", serde_json::json!(1));
    let strategy = DataStrategy::default().with_cache_policy(CachePolicy::stale_while_revalidate("k"));
    let job = new_job(Some(strategy)).with_bus(Bus::new());
    let bus = job.bus.clone().unwrap();
    let seen = events_of(&bus);
    let handle: JobHandle<Count> = JobHandle::new(job.id.as_str());

    let pipeline = JobPipeline::new(cache);
    let executor = Arc::new(AlwaysOk(42));
    pipeline.run(job, handle.clone(), executor).await;

    // First completion wins: the caller observes the cached value.
    let (value, source) = handle.result().await.unwrap();
    assert_eq!(value, Count(1));
    assert_eq!(source, DataSource::Cached);
    assert_eq!(*seen.lock(), vec![DataSource::Cached, DataSource::Fresh]);
}

#[tokio::test]
async fn cache_miss_runs_the_worker_and_writes_back() {
    let cache = Arc::new(InMemoryCache::new());
    let strategy = DataStrategy::default().with_cache_policy(CachePolicy::cache_first("k"));
    let job = new_job(Some(strategy)).with_bus(Bus::new());
    let handle: JobHandle<Count> = JobHandle::new(job.id.as_str());

    let pipeline = JobPipeline::new(Arc::clone(&cache));
    let executor = Arc::new(AlwaysOk(5));
    pipeline.run(job, handle.clone(), executor).await;

    let (value, source) = handle.result().await.unwrap();
    assert_eq!(value, Count(5));
    assert_eq!(source, DataSource::Fresh);
    assert_eq!(cache.read("k").await.unwrap(), Some(serde_json::json!(5)));
}

#[tokio::test]
async fn force_refresh_skips_the_cache_read_entirely() {
    let cache = Arc::new(InMemoryCache::new());
    cache.seed("k", serde_json::json!(1));
    let mut policy = CachePolicy::cache_first("k");
    policy.force_refresh = true;
    let strategy = DataStrategy::default().with_cache_policy(policy);
    let job = new_job(Some(strategy)).with_bus(Bus::new());
    let bus = job.bus.clone().unwrap();
    let seen = events_of(&bus);
    let handle: JobHandle<Count> = JobHandle::new(job.id.as_str());

    let pipeline = JobPipeline::new(cache);
    let executor = Arc::new(AlwaysOk(99));
    pipeline.run(job, handle.clone(), executor).await;

    let (value, source) = handle.result().await.unwrap();
    assert_eq!(value, Count(99));
    assert_eq!(source, DataSource::Fresh);
    assert_eq!(*seen.lock(), vec![DataSource::Fresh]);
}

#[tokio::test]
async fn worker_retries_transient_failures_then_succeeds() {
    let cache = Arc::new(InMemoryCache::new());
    let job = new_job(None)
        .with_bus(Bus::new())
        .retry_policy(flux_core::RetryPolicy::new(3, Duration::from_millis(1)).exponential_backoff(false));
    let handle: JobHandle<Count> = JobHandle::new(job.id.as_str());

    let pipeline = JobPipeline::new(cache);
    let executor = Arc::new(FailsNTimes { remaining: AtomicU32::new(2), value: 11 });
    pipeline.run(job, handle.clone(), executor).await;

    let (value, _source) = handle.result().await.unwrap();
    assert_eq!(value, Count(11));
}

#[tokio::test]
async fn exhausting_retries_surfaces_the_last_error() {
    let cache = Arc::new(InMemoryCache::new());
    let job = new_job(None)
        .with_bus(Bus::new())
        .retry_policy(flux_core::RetryPolicy::new(1, Duration::from_millis(1)).exponential_backoff(false));
    let handle: JobHandle<Count> = JobHandle::new(job.id.as_str());

    let observer = Arc::new(RecordingObserver::new());
    let pipeline = JobPipeline::new(cache).with_observer(observer.clone());
    let executor = Arc::new(FailsNTimes { remaining: AtomicU32::new(5), value: 0 });
    pipeline.run(job, handle.clone(), executor).await;

    assert!(handle.result().await.is_err());
    assert!(observer.entries().iter().any(|e| e.starts_with("error:")));
}

#[tokio::test]
async fn timeout_fails_a_worker_that_never_completes() {
    let cache = Arc::new(InMemoryCache::new());
    let job = new_job(None).with_bus(Bus::new()).timeout(Duration::from_millis(5));
    let handle: JobHandle<Count> = JobHandle::new(job.id.as_str());

    let pipeline = JobPipeline::new(cache);
    let executor = Arc::new(NeverFinishes);
    pipeline.run(job, handle.clone(), executor).await;

    let err = handle.result().await.unwrap_err();
    assert!(matches!(err, JobError::Timeout(_)));
}

#[tokio::test]
async fn cancelling_before_any_attempt_short_circuits_the_worker() {
    let cache = Arc::new(InMemoryCache::new());
    let token = flux_core::CancellationToken::new();
    token.cancel();
    let job = new_job(None).with_bus(Bus::new()).cancellation_token(token);
    let handle: JobHandle<Count> = JobHandle::new(job.id.as_str());

    let pipeline = JobPipeline::new(cache);
    let executor = Arc::new(AlwaysOk(1));
    pipeline.run(job, handle.clone(), executor).await;

    let err = handle.result().await.unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn cancelling_mid_flight_wins_the_race_against_the_worker() {
    let cache = Arc::new(InMemoryCache::new());
    let token = flux_core::CancellationToken::new();
    let job = new_job(None).with_bus(Bus::new()).cancellation_token(token.clone());
    let handle: JobHandle<Count> = JobHandle::new(job.id.as_str());

    let pipeline = JobPipeline::new(cache);
    let executor = Arc::new(NeverFinishes);
    let run = tokio::spawn(async move {
        pipeline.run(job, handle.clone(), executor).await;
        handle.result().await
    });

    tokio::time::sleep(Duration::from_millis(10)).await;
    token.cancel();
    let err = run.await.unwrap().unwrap_err();
    assert!(err.is_cancelled());
}
