//! Builders to construct named thread pools from configuration.

use std::collections::HashMap;

use anyhow::Context;
use tracing::info;

use crate::config::SchedulerConfig;
use crate::core::{AppResult, SchedulerError, ThreadPool};

/// Build one paused [`ThreadPool`] per named pool in `cfg`.
///
/// # Errors
///
/// - `SchedulerError::InvalidConfig` if the configuration is invalid
/// - `SchedulerError::WorkerSpawn` if a worker thread cannot be started
pub fn build_pools(cfg: &SchedulerConfig) -> Result<HashMap<String, ThreadPool>, SchedulerError> {
    cfg.validate().map_err(SchedulerError::InvalidConfig)?;

    let mut pools = HashMap::with_capacity(cfg.pools.len());
    for (name, pool_cfg) in &cfg.pools {
        let pool = ThreadPool::new(pool_cfg.clone())?;
        info!(pool = %name, worker_count = pool.worker_count(), "Pool built");
        pools.insert(name.clone(), pool);
    }

    Ok(pools)
}

/// Parse a JSON scheduler configuration and build its pools.
///
/// # Errors
///
/// Returns the parse, validation or spawn failure with context attached.
pub fn build_pools_from_json(input: &str) -> AppResult<HashMap<String, ThreadPool>> {
    let cfg = SchedulerConfig::from_json_str(input)
        .map_err(anyhow::Error::msg)
        .context("loading scheduler configuration")?;
    build_pools(&cfg).context("building thread pools")
}
