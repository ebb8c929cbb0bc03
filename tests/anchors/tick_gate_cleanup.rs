//! Anchor: the tick-in-progress flag is released by a drop guard.

use crate::anchor_utils::{non_test_part, read_source};

#[test]
fn test_tick_gate_is_released_on_every_exit_path() {
    let source = read_source("src/scheduler.rs");
    let body = non_test_part(&source);
    assert!(body.contains("impl Drop for TickGuard"));
    assert!(
        body.contains("TickGuard::try_acquire(&self.in_progress)"),
        "fire() must take the gate through the guard"
    );
    assert!(
        body.contains("MissedTickBehavior::Skip"),
        "missed firings must be dropped, not replayed in a burst"
    );
}

#[test]
fn test_tick_panic_is_contained_and_escalation_logged_once() {
    let scheduler = read_source("src/scheduler.rs");
    let body = non_test_part(&scheduler);
    assert!(
        body.contains(".catch_unwind().await"),
        "a panicking tick must not end the schedule"
    );
    assert_eq!(
        body.matches("tracing::error!").count(),
        1,
        "the scheduler logs only contained panics; escalation belongs to the classifier"
    );
    let classifier = read_source("src/classifier.rs");
    assert_eq!(non_test_part(&classifier).matches("tracing::error!").count(), 1);
}
