//! # Slot Scheduler
//!
//! A dependency-aware job scheduler built on a generation-checked slot table.
//!
//! Jobs are small fixed-size records (one cache line) holding a plain function
//! pointer, an optional parent handle and a few bytes of inline payload. A
//! worker pool runs them on dedicated OS threads; a job submitted against a
//! parent delays that parent until the child has finished.
//!
//! ## Key Features
//!
//! - **Slot tables**: O(1) insert, remove and lookup through `(index, generation)`
//!   handles, with values kept contiguous for cache-friendly iteration
//! - **Dependency counting**: locked jobs become ready once `unlock()` has been
//!   called and every child has run
//! - **Two policies, one record**: [`core::ThreadPool`] honors parents,
//!   [`core::BasicThreadPool`] runs strictly in submission order
//! - **Job timelines**: optional trace sinks exporting Chrome trace-event JSON
//!
//! ## ThreadPool
//!
//! ```rust
//! use slot_scheduler::config::PoolConfig;
//! use slot_scheduler::core::{Job, ThreadPool};
//!
//! fn step(job: &mut Job) {
//!     let value: u32 = job.data();
//!     job.set_data(value + 1);
//! }
//!
//! let pool = ThreadPool::new(PoolConfig::new().with_worker_count(4))?;
//! let root = pool.submit_locked(Job::with_data(step, 0_u32));
//! for i in 0..8_u32 {
//!     pool.submit(Job::with_data(step, i).with_parent(root));
//! }
//! pool.unlock(root);
//! pool.start();
//! pool.wait();
//! assert_eq!(pool.stats().completed_jobs, 9);
//! # Ok::<(), slot_scheduler::core::SchedulerError>(())
//! ```
//!
//! ## SlotTable
//!
//! ```rust
//! use slot_scheduler::table::SlotTable;
//!
//! let mut table = SlotTable::new();
//! let a = table.insert("a");
//! let b = table.insert("b");
//! assert!(table.remove(a));
//! assert!(!table.exists(a));
//! assert_eq!(table.get(b), Some(&"b"));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Job record, worker pools and trace sinks.
pub mod core;
/// Configuration models for pools and named pool sets.
pub mod config;
/// Builders to construct pools from configuration.
pub mod builders;
/// Generation-checked slot tables and handles.
pub mod table;
/// Shared utilities.
pub mod util;
