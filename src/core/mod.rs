//! Job record, worker pools and trace sinks.

pub mod error;
pub mod job;
pub mod pool;
pub mod trace;

pub use error::{AppResult, SchedulerError};
pub use job::{Job, JobFn, JobPayload, CACHE_LINE_SIZE, JOB_DATA_LEN};
pub use pool::{BasicThreadPool, PoolState, PoolStats, ThreadPool, JOB_TRACE_CATEGORY};
pub use trace::{build_trace_event, InMemoryTraceSink, TraceEvent, TracePhase, TraceSink};
