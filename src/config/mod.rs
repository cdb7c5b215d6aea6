//! Configuration models for pools and named pool sets.

pub mod pool;

pub use pool::{PoolConfig, SchedulerConfig, MIN_THREAD_STACK_SIZE};
