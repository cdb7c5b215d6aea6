//! Worker pools executing [`Job`] records on dedicated OS threads.
//!
//! Two scheduling policies share the job record, the lifecycle and the
//! worker plumbing in this module:
//!
//! - [`ThreadPool`] keeps jobs in a [`SlotTable`](crate::table::SlotTable)
//!   and runs a job only after every prerequisite naming it as parent has
//!   finished.
//! - [`BasicThreadPool`] runs jobs strictly in submission order through a
//!   blocking channel, ignoring parents.
//!
//! Both start `Paused`: jobs queue up but no worker touches them until
//! `start()`. `stop()` is terminal and idempotent.
//!
//! # Example
//!
//! ```
//! use slot_scheduler::config::PoolConfig;
//! use slot_scheduler::core::{Job, ThreadPool};
//!
//! fn noop(_job: &mut Job) {}
//!
//! let pool = ThreadPool::new(PoolConfig::new().with_worker_count(2)).unwrap();
//! let parent = pool.submit_locked(Job::new(noop));
//! pool.submit(Job::new(noop).with_parent(parent));
//! pool.unlock(parent);
//! pool.start();
//! pool.wait();
//! assert_eq!(pool.pending_jobs(), 0);
//! ```

mod basic;
mod dependency;

use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, warn};

use crate::config::PoolConfig;
use crate::core::job::Job;
use crate::core::trace::{build_trace_event, TraceEvent, TracePhase, TraceSink};

pub use basic::BasicThreadPool;
pub use dependency::ThreadPool;

/// Category attached to every trace event emitted by the pools.
pub const JOB_TRACE_CATEGORY: &str = "job";

/// Pool lifecycle. Transitions only move forward: `Paused → Active → Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolState {
    /// Jobs may be queued but workers stay idle.
    Paused,
    /// Workers consume ready jobs.
    Active,
    /// Terminal: workers finish their current job and exit.
    Stopped,
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Paused => "paused",
            Self::Active => "active",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Point-in-time view of a pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of worker threads.
    pub worker_count: usize,
    /// Jobs ready to run.
    pub open_jobs: usize,
    /// Jobs held back until their dependencies finish (always 0 for the basic pool).
    pub locked_jobs: usize,
    /// Job bodies executing right now.
    pub running_jobs: usize,
    /// Total jobs submitted.
    pub submitted_jobs: u64,
    /// Total jobs whose body returned (or that had no body).
    pub completed_jobs: u64,
    /// Total jobs whose body panicked.
    pub panicked_jobs: u64,
}

/// Internal lifetime counters (lock-free).
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub submitted: AtomicU64,
    pub completed: AtomicU64,
    pub panicked: AtomicU64,
}

impl PoolCounters {
    fn fill(&self, stats: &mut PoolStats) {
        stats.submitted_jobs = self.submitted.load(Ordering::Relaxed);
        stats.completed_jobs = self.completed.load(Ordering::Relaxed);
        stats.panicked_jobs = self.panicked.load(Ordering::Relaxed);
    }
}

/// Optional trace sink shared by a pool's workers.
pub(crate) type SharedTraceSink = Option<Arc<dyn TraceSink>>;

fn trace_instant(trace: &SharedTraceSink, label: impl FnOnce() -> String) {
    if let Some(sink) = trace {
        let event = build_trace_event(label(), JOB_TRACE_CATEGORY, TracePhase::Instant);
        record_event(sink.as_ref(), event);
    }
}

/// Hand `event` to `sink`. A sink that panics loses the event; the panic
/// never reaches the submitter or the worker.
fn record_event(sink: &dyn TraceSink, event: TraceEvent) {
    let phase = event.phase;
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| sink.record(event))) {
        warn!(
            ?phase,
            reason = panic_message(payload.as_ref()),
            "Trace sink panicked; event dropped"
        );
    }
}

/// Run one job body outside any pool lock.
///
/// A panicking body is contained here so the worker survives and the job
/// still counts as finished.
fn execute_job(
    job: &mut Job,
    worker_id: usize,
    counters: &PoolCounters,
    trace: &SharedTraceSink,
    label: impl FnOnce() -> String,
) {
    let label = trace.as_ref().map(|_| label());
    if let (Some(sink), Some(name)) = (trace, &label) {
        record_event(
            sink.as_ref(),
            build_trace_event(name.as_str(), JOB_TRACE_CATEGORY, TracePhase::Begin),
        );
    }

    match panic::catch_unwind(AssertUnwindSafe(|| job.run())) {
        Ok(_) => {
            counters.completed.fetch_add(1, Ordering::Relaxed);
        }
        Err(payload) => {
            counters.panicked.fetch_add(1, Ordering::Relaxed);
            error!(
                worker_id = worker_id,
                reason = panic_message(payload.as_ref()),
                "Job panicked; treating it as finished"
            );
        }
    }

    if let (Some(sink), Some(name)) = (trace, label) {
        record_event(
            sink.as_ref(),
            build_trace_event(name, JOB_TRACE_CATEGORY, TracePhase::End),
        );
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Spawn one named worker thread.
fn spawn_worker<F>(config: &PoolConfig, worker_id: usize, body: F) -> io::Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(format!("{}-{worker_id}", config.thread_name_prefix))
        .stack_size(config.thread_stack_size)
        .spawn(body)
}

/// Join worker threads, reporting any that panicked.
fn join_workers(workers: Vec<JoinHandle<()>>) {
    let current = thread::current().id();
    for (worker_id, worker) in workers.into_iter().enumerate() {
        if worker.thread().id() == current {
            // a job tore its own pool down; the thread exits once the job returns
            continue;
        }
        match worker.join() {
            Ok(()) => debug!(worker_id = worker_id, "Worker joined successfully"),
            Err(_) => warn!(worker_id = worker_id, "Worker panicked"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_state_display() {
        assert_eq!(PoolState::Paused.to_string(), "paused");
        assert_eq!(PoolState::Active.to_string(), "active");
        assert_eq!(PoolState::Stopped.to_string(), "stopped");
    }

    #[test]
    fn test_pool_stats_default() {
        let stats = PoolStats::default();
        assert_eq!(stats.worker_count, 0);
        assert_eq!(stats.completed_jobs, 0);
    }

    #[test]
    fn test_counters_fill() {
        let counters = PoolCounters::default();
        counters.submitted.fetch_add(10, Ordering::Relaxed);
        counters.completed.fetch_add(7, Ordering::Relaxed);
        counters.panicked.fetch_add(1, Ordering::Relaxed);

        let mut stats = PoolStats::default();
        counters.fill(&mut stats);
        assert_eq!(stats.submitted_jobs, 10);
        assert_eq!(stats.completed_jobs, 7);
        assert_eq!(stats.panicked_jobs, 1);
    }

    #[test]
    fn test_execute_job_contains_panics() {
        fn explode(_job: &mut Job) {
            panic!("boom");
        }
        let counters = PoolCounters::default();
        let mut job = Job::new(explode);
        execute_job(&mut job, 0, &counters, &None, String::new);
        assert_eq!(counters.panicked.load(Ordering::Relaxed), 1);
        assert_eq!(counters.completed.load(Ordering::Relaxed), 0);
    }

    struct FailingSink;

    impl TraceSink for FailingSink {
        fn record(&self, _event: TraceEvent) {
            panic!("sink unavailable");
        }
    }

    #[test]
    fn test_failing_sink_does_not_disturb_job() {
        fn count(job: &mut Job) {
            let n: u32 = job.data();
            job.set_data(n + 1);
        }
        let counters = PoolCounters::default();
        let trace: SharedTraceSink = Some(Arc::new(FailingSink));
        let mut job = Job::with_data(count, 1_u32);

        trace_instant(&trace, || "job".to_string());
        execute_job(&mut job, 0, &counters, &trace, || "job".to_string());

        assert_eq!(job.data::<u32>(), 2);
        assert_eq!(counters.completed.load(Ordering::Relaxed), 1);
        assert_eq!(counters.panicked.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn std::any::Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn std::any::Any + Send> = Box::new(3_u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
