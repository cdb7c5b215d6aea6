//! Dependency-aware pool: jobs live in a slot table and run once their
//! prerequisites have finished.
//!
//! # Design
//!
//! - **One lock**: table, ready queue and locked set sit behind a single
//!   `parking_lot::Mutex`; job bodies always run with it released
//! - **No polling**: idle workers park on the `work` Condvar, `wait()` parks
//!   on the `drained` Condvar
//! - **Reclaim on dequeue**: a job's slot is freed before its body runs, so a
//!   body never holds a live handle to itself

use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info};

use crate::config::PoolConfig;
use crate::core::error::SchedulerError;
use crate::core::job::Job;
use crate::core::trace::TraceSink;
use crate::table::{Handle, SlotTable};

use super::{
    execute_job, join_workers, spawn_worker, trace_instant, PoolCounters, PoolState, PoolStats,
    SharedTraceSink,
};

/// Everything guarded by the pool mutex.
struct Inner {
    state: PoolState,
    jobs: SlotTable<Job>,
    /// Handles eligible to run, in FIFO order.
    ready: VecDeque<Handle>,
    /// Handles whose pending-dependency counter is still above zero.
    locked: BTreeSet<Handle>,
    /// Job bodies executing outside the lock.
    running: usize,
}

impl Inner {
    fn new() -> Self {
        Self {
            state: PoolState::Paused,
            jobs: SlotTable::new(),
            ready: VecDeque::new(),
            locked: BTreeSet::new(),
            running: 0,
        }
    }

    fn has_work(&self) -> bool {
        self.state == PoolState::Active && !self.ready.is_empty()
    }

    fn is_drained(&self) -> bool {
        self.state == PoolState::Stopped || (self.jobs.is_empty() && self.running == 0)
    }

    /// Record a new child against `parent`, if the parent is still stored.
    fn add_dependency(&mut self, parent: Handle) {
        if !parent.is_valid() {
            return;
        }
        if let Some(job) = self.jobs.get_mut(parent) {
            job.pending_dependencies += 1;
        }
    }

    /// Drop one pending dependency of `handle`. Returns `true` when the job
    /// left the locked set for the ready queue.
    fn release(&mut self, handle: Handle) -> bool {
        let Some(job) = self.jobs.get_mut(handle) else {
            return false;
        };
        job.pending_dependencies -= 1;
        if job.pending_dependencies <= 0 && self.locked.remove(&handle) {
            self.ready.push_back(handle);
            return true;
        }
        false
    }

    /// Pop the next ready job and reclaim its slot. Handles invalidated by
    /// `clear()` are skipped.
    fn next_job(&mut self) -> Option<(Handle, Job)> {
        while let Some(handle) = self.ready.pop_front() {
            if let Some(job) = self.jobs.take(handle) {
                return Some((handle, job));
            }
        }
        None
    }
}

struct Shared {
    inner: Mutex<Inner>,
    /// Signalled when a job becomes ready or the state changes.
    work: Condvar,
    /// Signalled when the pool drains or stops.
    drained: Condvar,
    counters: PoolCounters,
    trace: SharedTraceSink,
}

impl Shared {
    fn stop(&self) {
        {
            let mut inner = self.inner.lock();
            if inner.state == PoolState::Stopped {
                return;
            }
            inner.state = PoolState::Stopped;
        }
        info!("ThreadPool stopped");
        self.work.notify_all();
        self.drained.notify_all();
    }
}

/// Thread pool that honors job dependencies.
///
/// Submitting a job with a parent adds one to the parent's pending-dependency
/// counter; when the child's body returns the counter drops by one. A parent
/// submitted with [`ThreadPool::submit_locked`] only becomes ready once its
/// counter reaches zero, which happens after [`ThreadPool::unlock`] and after
/// every child has finished.
///
/// Ready jobs run in strict FIFO order on whichever worker is idle.
pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
}

impl ThreadPool {
    /// Create a paused pool with `config.worker_count` worker threads.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::InvalidConfig` if the configuration is invalid
    /// - `SchedulerError::WorkerSpawn` if a worker thread cannot be started
    pub fn new(config: PoolConfig) -> Result<Self, SchedulerError> {
        Self::build(&config, None)
    }

    /// Create a paused pool that records job timelines into `sink`.
    ///
    /// # Errors
    ///
    /// Same as [`ThreadPool::new`].
    pub fn with_trace_sink(
        config: PoolConfig,
        sink: Arc<dyn TraceSink>,
    ) -> Result<Self, SchedulerError> {
        Self::build(&config, Some(sink))
    }

    fn build(config: &PoolConfig, trace: SharedTraceSink) -> Result<Self, SchedulerError> {
        config.validate().map_err(SchedulerError::InvalidConfig)?;

        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner::new()),
            work: Condvar::new(),
            drained: Condvar::new(),
            counters: PoolCounters::default(),
            trace,
        });

        let mut workers = Vec::with_capacity(config.worker_count);
        for worker_id in 0..config.worker_count {
            let worker_shared = Arc::clone(&shared);
            match spawn_worker(config, worker_id, move || worker_loop(&worker_shared, worker_id)) {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    shared.stop();
                    join_workers(workers);
                    return Err(SchedulerError::WorkerSpawn(e.to_string()));
                }
            }
        }

        info!(worker_count = config.worker_count, "ThreadPool initialized");

        Ok(Self {
            shared,
            workers: Mutex::new(workers),
            worker_count: config.worker_count,
        })
    }

    /// Store `job` and queue it as ready.
    ///
    /// If the job names a parent that still exists, the parent's
    /// pending-dependency counter goes up by one.
    pub fn submit(&self, job: Job) -> Handle {
        self.insert(job, false)
    }

    /// Store `job` with its counter pre-set to one and park it in the locked
    /// set. It becomes ready after [`ThreadPool::unlock`] and after every
    /// child submitted against it has finished.
    pub fn submit_locked(&self, job: Job) -> Handle {
        self.insert(job, true)
    }

    fn insert(&self, mut job: Job, locked: bool) -> Handle {
        job.pending_dependencies = i32::from(locked);
        let parent = job.parent;

        let handle = {
            let mut inner = self.shared.inner.lock();
            let handle = inner.jobs.insert(job);
            inner.add_dependency(parent);
            if locked {
                inner.locked.insert(handle);
            } else {
                inner.ready.push_back(handle);
            }
            handle
        };

        if !locked {
            self.shared.work.notify_one();
        }
        self.shared.counters.submitted.fetch_add(1, Ordering::Relaxed);
        trace_instant(&self.shared.trace, || job_label(handle));
        debug!(
            slot = handle.index(),
            generation = handle.generation(),
            locked = locked,
            "Job submitted"
        );
        handle
    }

    /// Drop one pending dependency of `handle`; once the counter reaches zero
    /// a locked job moves to the ready queue. No-op for a handle that no
    /// longer exists.
    pub fn unlock(&self, handle: Handle) {
        let released = self.shared.inner.lock().release(handle);
        if released {
            self.shared.work.notify_one();
        }
    }

    /// Let workers consume ready jobs. Ignored once stopped.
    pub fn start(&self) {
        let mut inner = self.shared.inner.lock();
        match inner.state {
            PoolState::Paused => {
                inner.state = PoolState::Active;
                drop(inner);
                info!("ThreadPool started");
                self.shared.work.notify_all();
            }
            PoolState::Active => {}
            PoolState::Stopped => debug!("start() on a stopped ThreadPool ignored"),
        }
    }

    /// Enter the terminal state and wake every worker so it can exit. Jobs
    /// still queued never run. Calling it again has no effect.
    pub fn stop(&self) {
        self.shared.stop();
    }

    /// Block until the pool is stopped, or until the job table is empty and
    /// no job body is still running.
    pub fn wait(&self) {
        let mut inner = self.shared.inner.lock();
        self.shared.drained.wait_while(&mut inner, |inner| !inner.is_drained());
    }

    /// Discard every queued and locked job. Running bodies are unaffected.
    pub fn clear(&self) {
        let mut inner = self.shared.inner.lock();
        let discarded = inner.jobs.len();
        inner.jobs.clear();
        inner.ready.clear();
        inner.locked.clear();
        let drained = inner.is_drained();
        drop(inner);

        debug!(discarded = discarded, "ThreadPool cleared");
        if drained {
            self.shared.drained.notify_all();
        }
    }

    /// Stop the pool and join every worker thread.
    pub fn shutdown(&self) {
        self.stop();
        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        if workers.is_empty() {
            return;
        }
        let worker_count = workers.len();
        join_workers(workers);
        info!(worker_count = worker_count, "ThreadPool shut down complete");
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> PoolState {
        self.shared.inner.lock().state
    }

    /// Number of jobs in the ready queue.
    #[must_use]
    pub fn open_jobs(&self) -> usize {
        self.shared.inner.lock().ready.len()
    }

    /// Number of jobs stored in the table (ready plus locked).
    #[must_use]
    pub fn pending_jobs(&self) -> usize {
        self.shared.inner.lock().jobs.len()
    }

    /// Number of jobs waiting on dependencies.
    #[must_use]
    pub fn locked_jobs(&self) -> usize {
        self.shared.inner.lock().locked.len()
    }

    /// Whether `handle` still refers to a queued or locked job.
    #[must_use]
    pub fn contains(&self, handle: Handle) -> bool {
        self.shared.inner.lock().jobs.exists(handle)
    }

    /// Pending-dependency counter of a stored job.
    #[must_use]
    pub fn pending_dependencies(&self, handle: Handle) -> Option<i32> {
        self.shared
            .inner
            .lock()
            .jobs
            .get(handle)
            .map(Job::pending_dependencies)
    }

    /// Number of worker threads.
    #[must_use]
    pub const fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Get current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let mut stats = {
            let inner = self.shared.inner.lock();
            PoolStats {
                worker_count: self.worker_count,
                open_jobs: inner.ready.len(),
                locked_jobs: inner.locked.len(),
                running_jobs: inner.running,
                ..PoolStats::default()
            }
        };
        self.shared.counters.fill(&mut stats);
        stats
    }
}

impl fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPool")
            .field("worker_count", &self.worker_count)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn job_label(handle: Handle) -> String {
    format!("job {}v{}", handle.index(), handle.generation())
}

fn worker_loop(shared: &Shared, worker_id: usize) {
    debug!(worker_id = worker_id, "Worker thread started");

    loop {
        let (handle, mut job) = {
            let mut inner = shared.inner.lock();
            shared
                .work
                .wait_while(&mut inner, |inner| inner.state != PoolState::Stopped && !inner.has_work());
            if inner.state == PoolState::Stopped {
                break;
            }
            let Some(next) = inner.next_job() else {
                continue;
            };
            inner.running += 1;
            next
        };

        // the body may rewrite its record; notify the parent declared at submission
        let parent = job.parent;
        debug!(
            worker_id = worker_id,
            slot = handle.index(),
            generation = handle.generation(),
            "Worker executing job"
        );
        execute_job(&mut job, worker_id, &shared.counters, &shared.trace, || {
            job_label(handle)
        });

        let mut inner = shared.inner.lock();
        inner.running -= 1;
        if parent.is_valid() && inner.release(parent) {
            shared.work.notify_one();
        }
        if inner.is_drained() {
            shared.drained.notify_all();
        }
    }

    debug!(worker_id = worker_id, "Worker thread exiting");
}
