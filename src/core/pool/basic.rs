//! FIFO pool without dependency tracking.
//!
//! Jobs travel through an unbounded `crossbeam-channel`; there is no slot
//! table and no handle. Workers block on `recv()` and stopping the pool drops
//! the only sender, which unblocks every idle worker.

use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, info};

use crate::config::PoolConfig;
use crate::core::error::SchedulerError;
use crate::core::job::Job;
use crate::core::trace::TraceSink;

use super::{
    execute_job, join_workers, spawn_worker, trace_instant, PoolCounters, PoolState, PoolStats,
    SharedTraceSink,
};

struct BasicInner {
    state: PoolState,
    /// Accepted jobs that have not finished yet (queued or running).
    outstanding: usize,
    running: usize,
}

impl BasicInner {
    const fn is_drained(&self) -> bool {
        matches!(self.state, PoolState::Stopped) || self.outstanding == 0
    }
}

struct BasicShared {
    inner: Mutex<BasicInner>,
    /// Holds workers back while the pool is paused.
    gate: Condvar,
    drained: Condvar,
    counters: PoolCounters,
    trace: SharedTraceSink,
}

/// Thread pool that runs jobs in submission order, ignoring parents.
///
/// Uses the same [`Job`] record and lifecycle as
/// [`ThreadPool`](super::ThreadPool).
pub struct BasicThreadPool {
    shared: Arc<BasicShared>,
    /// `None` once stopped.
    job_tx: Mutex<Option<Sender<(u64, Job)>>>,
    job_rx: Receiver<(u64, Job)>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
}

impl BasicThreadPool {
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
    /// Same as [`BasicThreadPool::new`].
    pub fn with_trace_sink(
        config: PoolConfig,
        sink: Arc<dyn TraceSink>,
    ) -> Result<Self, SchedulerError> {
        Self::build(&config, Some(sink))
    }

    fn build(config: &PoolConfig, trace: SharedTraceSink) -> Result<Self, SchedulerError> {
        config.validate().map_err(SchedulerError::InvalidConfig)?;

        let (job_tx, job_rx) = unbounded::<(u64, Job)>();
        let shared = Arc::new(BasicShared {
            inner: Mutex::new(BasicInner {
                state: PoolState::Paused,
                outstanding: 0,
                running: 0,
            }),
            gate: Condvar::new(),
            drained: Condvar::new(),
            counters: PoolCounters::default(),
            trace,
        });

        let pool = Self {
            shared,
            job_tx: Mutex::new(Some(job_tx)),
            job_rx,
            workers: Mutex::new(Vec::with_capacity(config.worker_count)),
            worker_count: config.worker_count,
        };

        for worker_id in 0..config.worker_count {
            let worker_shared = Arc::clone(&pool.shared);
            let worker_rx = pool.job_rx.clone();
            let worker = spawn_worker(config, worker_id, move || {
                basic_worker_loop(&worker_shared, &worker_rx, worker_id);
            })
            .map_err(|e| SchedulerError::WorkerSpawn(e.to_string()))?;
            pool.workers.lock().push(worker);
        }

        info!(worker_count = config.worker_count, "BasicThreadPool initialized");
        Ok(pool)
    }

    /// Queue `job` behind everything submitted before it. Returns the job's
    /// submission sequence number, starting at 1.
    ///
    /// After `stop()` the job is accepted but never runs.
    pub fn submit(&self, job: Job) -> u64 {
        let sequence = self.shared.counters.submitted.fetch_add(1, Ordering::Relaxed) + 1;
        trace_instant(&self.shared.trace, || format!("job #{sequence}"));

        let tx = self.job_tx.lock();
        let Some(tx) = tx.as_ref() else {
            debug!(sequence = sequence, "Job submitted to a stopped BasicThreadPool dropped");
            return sequence;
        };
        self.shared.inner.lock().outstanding += 1;
        if tx.send((sequence, job)).is_err() {
            self.finish_without_running();
        }
        debug!(sequence = sequence, "Job submitted");
        sequence
    }

    fn finish_without_running(&self) {
        let mut inner = self.shared.inner.lock();
        inner.outstanding = inner.outstanding.saturating_sub(1);
        if inner.is_drained() {
            self.shared.drained.notify_all();
        }
    }

    /// Let workers consume queued jobs. Ignored once stopped.
    pub fn start(&self) {
        let mut inner = self.shared.inner.lock();
        if inner.state == PoolState::Paused {
            inner.state = PoolState::Active;
            drop(inner);
            info!("BasicThreadPool started");
            self.shared.gate.notify_all();
        }
    }

    /// Enter the terminal state. Queued jobs are discarded by the workers.
    pub fn stop(&self) {
        {
            let mut inner = self.shared.inner.lock();
            if inner.state == PoolState::Stopped {
                return;
            }
            inner.state = PoolState::Stopped;
        }
        // dropping the sender disconnects the channel once it is empty
        self.job_tx.lock().take();
        info!("BasicThreadPool stopped");
        self.shared.gate.notify_all();
        self.shared.drained.notify_all();
    }

    /// Block until the pool is stopped or every accepted job has finished.
    pub fn wait(&self) {
        let mut inner = self.shared.inner.lock();
        self.shared.drained.wait_while(&mut inner, |inner| !inner.is_drained());
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
        info!(worker_count = worker_count, "BasicThreadPool shut down complete");
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> PoolState {
        self.shared.inner.lock().state
    }

    /// Number of jobs waiting in the channel.
    #[must_use]
    pub fn open_jobs(&self) -> usize {
        self.job_rx.len()
    }

    /// Number of worker threads.
    #[must_use]
    pub const fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Get current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let mut stats = PoolStats {
            worker_count: self.worker_count,
            open_jobs: self.job_rx.len(),
            running_jobs: self.shared.inner.lock().running,
            ..PoolStats::default()
        };
        self.shared.counters.fill(&mut stats);
        stats
    }
}

impl fmt::Debug for BasicThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicThreadPool")
            .field("worker_count", &self.worker_count)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Drop for BasicThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn basic_worker_loop(shared: &BasicShared, job_rx: &Receiver<(u64, Job)>, worker_id: usize) {
    debug!(worker_id = worker_id, "Worker thread started");

    loop {
        {
            let mut inner = shared.inner.lock();
            shared
                .gate
                .wait_while(&mut inner, |inner| inner.state == PoolState::Paused);
            if inner.state == PoolState::Stopped {
                break;
            }
        }

        let Ok((sequence, mut job)) = job_rx.recv() else {
            break;
        };

        {
            let mut inner = shared.inner.lock();
            if inner.state == PoolState::Stopped {
                break;
            }
            inner.running += 1;
        }

        debug!(worker_id = worker_id, sequence = sequence, "Worker executing job");
        execute_job(&mut job, worker_id, &shared.counters, &shared.trace, || {
            format!("job #{sequence}")
        });

        let mut inner = shared.inner.lock();
        inner.running -= 1;
        inner.outstanding = inner.outstanding.saturating_sub(1);
        if inner.is_drained() {
            shared.drained.notify_all();
        }
    }

    debug!(worker_id = worker_id, "Worker thread exiting");
}
