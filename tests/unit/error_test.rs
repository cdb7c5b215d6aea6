//! Tests for error types

use slot_scheduler::builders::build_pools_from_json;
use slot_scheduler::config::PoolConfig;
use slot_scheduler::core::{SchedulerError, ThreadPool};

#[test]
fn test_invalid_config_error() {
    let err = SchedulerError::InvalidConfig("bad prefix".to_string());
    assert_eq!(format!("{}", err), "invalid configuration: bad prefix");
}

#[test]
fn test_worker_spawn_error() {
    let err = SchedulerError::WorkerSpawn("out of threads".to_string());
    assert_eq!(format!("{}", err), "failed to spawn worker thread: out of threads");
}

#[test]
fn test_pool_rejects_tiny_stack() {
    let result = ThreadPool::new(PoolConfig::new().with_thread_stack_size(512));
    match result {
        Err(SchedulerError::InvalidConfig(msg)) => assert!(msg.contains("thread_stack_size")),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("tiny stack accepted"),
    }
}

#[test]
fn test_anyhow_context_names_the_stage() {
    let err = build_pools_from_json("not json").unwrap_err();
    let rendered = format!("{err:#}");
    assert!(rendered.starts_with("loading scheduler configuration"));
    assert!(rendered.contains("parse error"));

    let err = build_pools_from_json(r#"{"pools": {"main": {"thread_name_prefix": ""}}}"#)
        .unwrap_err();
    assert!(format!("{err:#}").contains("pool `main` invalid"));
}
