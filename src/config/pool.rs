//! Pool and scheduler configuration structures.

use std::collections::HashMap;
use std::env;

use serde::{Deserialize, Serialize};

/// Smallest worker stack accepted by [`PoolConfig::validate`].
pub const MIN_THREAD_STACK_SIZE: usize = 64 * 1024;

const DEFAULT_THREAD_STACK_SIZE: usize = 2 * 1024 * 1024;
const DEFAULT_THREAD_NAME_PREFIX: &str = "slot-worker";

const ENV_WORKERS: &str = "SLOT_SCHEDULER_WORKERS";
const ENV_THREAD_PREFIX: &str = "SLOT_SCHEDULER_THREAD_PREFIX";
const ENV_STACK_SIZE: &str = "SLOT_SCHEDULER_STACK_SIZE";

/// Worker pool configuration.
///
/// ```
/// use slot_scheduler::config::PoolConfig;
///
/// let cfg = PoolConfig::new()
///     .with_worker_count(4)
///     .with_thread_name_prefix("render");
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of worker threads. Zero builds a pool that only queues.
    pub worker_count: usize,
    /// Worker threads are named `{prefix}-{index}`.
    pub thread_name_prefix: String,
    /// Stack size of each worker thread, in bytes.
    pub thread_stack_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get(),
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.into(),
            thread_stack_size: DEFAULT_THREAD_STACK_SIZE,
        }
    }
}

impl PoolConfig {
    /// Defaults: one worker per logical CPU, 2 MiB stacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of worker threads.
    #[must_use]
    pub const fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Set the worker thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Set the worker thread stack size in bytes.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, bytes: usize) -> Self {
        self.thread_stack_size = bytes;
        self
    }

    /// Build from the environment, after loading `.env` if present.
    ///
    /// Reads `SLOT_SCHEDULER_WORKERS`, `SLOT_SCHEDULER_THREAD_PREFIX` and
    /// `SLOT_SCHEDULER_STACK_SIZE`; missing or unparsable values keep their
    /// defaults.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();
        Self {
            worker_count: env_parse(ENV_WORKERS).unwrap_or(defaults.worker_count),
            thread_name_prefix: env_opt(ENV_THREAD_PREFIX).unwrap_or(defaults.thread_name_prefix),
            thread_stack_size: env_parse(ENV_STACK_SIZE).unwrap_or(defaults.thread_stack_size),
        }
    }

    /// Validate pool configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.thread_name_prefix.trim().is_empty() {
            return Err("thread_name_prefix must not be empty".into());
        }
        if self.thread_stack_size < MIN_THREAD_STACK_SIZE {
            return Err(format!(
                "thread_stack_size must be at least {MIN_THREAD_STACK_SIZE} bytes"
            ));
        }
        Ok(())
    }
}

/// Root scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Map of pool name to configuration.
    pub pools: HashMap<String, PoolConfig>,
}

impl SchedulerConfig {
    /// Validate all pools and ensure at least one pool exists.
    ///
    /// # Errors
    ///
    /// Names the offending pool when one is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.pools.is_empty() {
            return Err("at least one pool must be defined".into());
        }
        for (name, pool) in &self.pools {
            pool.validate()
                .map_err(|e| format!("pool `{name}` invalid: {e}"))?;
        }
        Ok(())
    }

    /// Parse scheduler configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self =
            serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_opt(key).and_then(|v| v.trim().parse().ok())
}
