//! Integration tests for the FIFO `BasicThreadPool`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::{const_mutex, Mutex};
use slot_scheduler::config::PoolConfig;
use slot_scheduler::core::{
    BasicThreadPool, InMemoryTraceSink, Job, PoolState, TraceEvent, TracePhase, TraceSink,
};
use slot_scheduler::table::Handle;

fn basic_pool(workers: usize) -> BasicThreadPool {
    BasicThreadPool::new(PoolConfig::new().with_worker_count(workers)).unwrap()
}

fn noop(_job: &mut Job) {}

static SEQUENCE: Mutex<Vec<u16>> = const_mutex(Vec::new());

fn record_sequence(job: &mut Job) {
    SEQUENCE.lock().push(job.data::<u16>());
}

#[test]
fn test_single_worker_preserves_submission_order() {
    let pool = basic_pool(1);
    for i in 0..32_u16 {
        pool.submit(Job::with_data(record_sequence, i));
    }
    pool.start();
    pool.wait();

    let expected: Vec<u16> = (0..32).collect();
    assert_eq!(*SEQUENCE.lock(), expected);
}

static TOTAL: AtomicUsize = AtomicUsize::new(0);

fn add_payload(job: &mut Job) {
    let (a, b): (u32, u32) = job.data();
    TOTAL.fetch_add((a + b) as usize, Ordering::SeqCst);
}

#[test]
fn test_many_workers_drain_every_job() {
    let pool = basic_pool(4);
    pool.start();
    for i in 0..200_u32 {
        pool.submit(Job::with_data(add_payload, (i, 1_u32)));
    }
    pool.wait();

    // sum of 0..200 plus one per job
    assert_eq!(TOTAL.load(Ordering::SeqCst), 19_900 + 200);
    let stats = pool.stats();
    assert_eq!(stats.submitted_jobs, 200);
    assert_eq!(stats.completed_jobs, 200);
    assert_eq!(stats.open_jobs, 0);
    assert_eq!(stats.locked_jobs, 0);
}

static IGNORED_PARENT_RUNS: AtomicUsize = AtomicUsize::new(0);

fn count_ignored_parent(_job: &mut Job) {
    IGNORED_PARENT_RUNS.fetch_add(1, Ordering::SeqCst);
}

#[test]
fn test_parent_handles_are_ignored() {
    let pool = basic_pool(2);
    let bogus = Handle::from_raw_parts(7, 7);
    pool.submit(Job::new(count_ignored_parent).with_parent(bogus));
    pool.start();
    pool.wait();
    assert_eq!(IGNORED_PARENT_RUNS.load(Ordering::SeqCst), 1);
}

#[test]
fn test_paused_pool_holds_jobs() {
    let pool = basic_pool(2);
    pool.submit(Job::new(noop));
    pool.submit(Job::new(noop));
    thread::sleep(Duration::from_millis(10));
    assert_eq!(pool.open_jobs(), 2);
    assert_eq!(pool.stats().completed_jobs, 0);

    pool.start();
    pool.wait();
    assert_eq!(pool.open_jobs(), 0);
}

fn slow(_job: &mut Job) {
    thread::sleep(Duration::from_millis(20));
}

#[test]
fn test_stop_discards_queued_jobs() {
    let pool = basic_pool(1);
    for _ in 0..50 {
        pool.submit(Job::new(slow));
    }
    pool.start();
    pool.stop();
    pool.wait();
    pool.shutdown();
    assert_eq!(pool.state(), PoolState::Stopped);
    assert!(pool.stats().completed_jobs < 50);
}

fn explode(_job: &mut Job) {
    panic!("basic job exploded");
}

#[test]
fn test_panics_are_contained() {
    let pool = basic_pool(1);
    pool.submit(Job::new(explode));
    pool.submit(Job::new(noop));
    pool.start();
    pool.wait();
    let stats = pool.stats();
    assert_eq!(stats.panicked_jobs, 1);
    assert_eq!(stats.completed_jobs, 1);
}

#[test]
fn test_trace_events_use_submission_sequence() {
    let sink = InMemoryTraceSink::new(16);
    let shared: Arc<dyn TraceSink> = Arc::new(sink.clone());
    let pool =
        BasicThreadPool::with_trace_sink(PoolConfig::new().with_worker_count(1), shared).unwrap();

    assert_eq!(pool.submit(Job::new(noop)), 1);
    assert_eq!(pool.submit(Job::new(noop)), 2);
    pool.start();
    pool.wait();

    let begins: Vec<_> = sink
        .events()
        .into_iter()
        .filter(|e| e.phase == TracePhase::Begin)
        .map(|e| e.name)
        .collect();
    assert_eq!(begins, vec!["job #1", "job #2"]);
}

struct FailingSink;

impl TraceSink for FailingSink {
    fn record(&self, _event: TraceEvent) {
        panic!("sink unavailable");
    }
}

#[test]
fn test_failing_trace_sink_is_ignored() {
    let pool =
        BasicThreadPool::with_trace_sink(PoolConfig::new().with_worker_count(1), Arc::new(FailingSink))
            .unwrap();
    pool.submit(Job::new(noop));
    pool.submit(Job::new(noop));
    pool.start();
    pool.wait();

    let stats = pool.stats();
    assert_eq!(stats.completed_jobs, 2);
    assert_eq!(stats.panicked_jobs, 0);
    assert_eq!(stats.running_jobs, 0);
}
