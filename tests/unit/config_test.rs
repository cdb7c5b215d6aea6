//! Tests for configuration validation

use slot_scheduler::config::{PoolConfig, SchedulerConfig, MIN_THREAD_STACK_SIZE};

#[test]
fn test_pool_config_validation() {
    let valid = PoolConfig {
        worker_count: 4,
        thread_name_prefix: "io".to_string(),
        thread_stack_size: MIN_THREAD_STACK_SIZE,
    };
    assert!(valid.validate().is_ok());
}

#[test]
fn test_pool_config_invalid_stack() {
    let invalid = PoolConfig {
        worker_count: 4,
        thread_name_prefix: "io".to_string(),
        thread_stack_size: MIN_THREAD_STACK_SIZE - 1,
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_pool_config_builder() {
    let cfg = PoolConfig::new()
        .with_worker_count(3)
        .with_thread_name_prefix("render")
        .with_thread_stack_size(1 << 20);
    assert_eq!(cfg.worker_count, 3);
    assert_eq!(cfg.thread_name_prefix, "render");
    assert_eq!(cfg.thread_stack_size, 1 << 20);
}

#[test]
fn test_scheduler_config_requires_pools() {
    let cfg = SchedulerConfig {
        pools: Default::default(),
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_scheduler_config_from_json() {
    let json = r#"{
        "pools": {
            "physics": {"worker_count": 2, "thread_name_prefix": "physics"},
            "audio": {"worker_count": 1}
        }
    }"#;
    let cfg = SchedulerConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.pools.len(), 2);
    assert_eq!(cfg.pools["physics"].thread_name_prefix, "physics");
    assert_eq!(cfg.pools["audio"].thread_name_prefix, "slot-worker");
}

#[test]
fn test_scheduler_config_rejects_bad_pool() {
    let json = r#"{"pools": {"tiny": {"thread_stack_size": 16}}}"#;
    let err = SchedulerConfig::from_json_str(json).unwrap_err();
    assert!(err.contains("tiny"));
}

#[test]
fn test_pool_config_round_trips_through_json() {
    let cfg = PoolConfig::new().with_worker_count(5);
    let json = serde_json::to_string(&cfg).unwrap();
    let back: PoolConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, cfg);
}

#[test]
fn test_pool_config_from_env() {
    std::env::set_var("SLOT_SCHEDULER_WORKERS", "3");
    std::env::set_var("SLOT_SCHEDULER_THREAD_PREFIX", "env-pool");
    std::env::set_var("SLOT_SCHEDULER_STACK_SIZE", "not-a-number");

    let cfg = PoolConfig::from_env();
    assert_eq!(cfg.worker_count, 3);
    assert_eq!(cfg.thread_name_prefix, "env-pool");
    assert_eq!(cfg.thread_stack_size, PoolConfig::default().thread_stack_size);

    std::env::remove_var("SLOT_SCHEDULER_WORKERS");
    std::env::remove_var("SLOT_SCHEDULER_THREAD_PREFIX");
    std::env::remove_var("SLOT_SCHEDULER_STACK_SIZE");
}
