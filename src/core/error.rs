//! Error types for scheduler operations.

use thiserror::Error;

/// Errors produced while building or driving a pool.
///
/// Stale handles are not errors: table and pool lookups report them through
/// `bool`/`Option` results.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The OS refused to start a worker thread.
    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
