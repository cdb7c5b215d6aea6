//! Tests for telemetry helpers

use std::thread;

use slot_scheduler::util::{current_thread_label, init_tracing};

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    tracing::info!("telemetry initialized twice");
}

#[test]
fn test_thread_label_uses_name() {
    let label = thread::Builder::new()
        .name("labelled".to_string())
        .spawn(current_thread_label)
        .unwrap()
        .join()
        .unwrap();
    assert_eq!(label, "labelled");
}

#[test]
fn test_thread_label_falls_back_to_id() {
    let label = thread::Builder::new()
        .spawn(current_thread_label)
        .unwrap()
        .join()
        .unwrap();
    assert!(label.starts_with("ThreadId("));
}
