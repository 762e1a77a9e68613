//! Tests for the lock-retry wrapper around package-manager commands.

mod helpers;

use std::time::Duration;

use helpers::{ALWAYS, MockExecutor, MockFailure};
use rsmachine::RsmachineError;
use rsmachine::executor::retry::{RetryPolicy, run_with_lock_retry};

fn fast_policy(attempts: u32) -> RetryPolicy {
    RetryPolicy {
        attempts,
        delay: Duration::ZERO,
    }
}

#[test]
fn test_lock_released_after_two_failures_succeeds_on_third_call() {
    let executor = MockExecutor::failing("swupd", MockFailure::Lock, 2);

    let result = run_with_lock_retry(&executor, "swupd bundle-add containers-basic ", &fast_policy(6));

    assert!(result.is_ok());
    assert_eq!(executor.call_count(), 3, "two lock failures plus one success");
}

#[test]
fn test_permanent_lock_fails_after_exactly_the_configured_ceiling() {
    let executor = MockExecutor::failing("swupd", MockFailure::Lock, ALWAYS);

    let err = run_with_lock_retry(&executor, "swupd bundle-add containers-basic ", &fast_policy(4))
        .unwrap_err();

    assert_eq!(executor.call_count(), 4);
    let typed = err.downcast_ref::<RsmachineError>().expect("typed error");
    assert!(typed.is_lock_contention(), "last lock error is surfaced: {}", typed);
}

#[test]
fn test_non_lock_failure_is_not_retried() {
    let executor = MockExecutor::failing("swupd", MockFailure::Execution, ALWAYS);

    let err = run_with_lock_retry(&executor, "swupd bundle-add containers-basic ", &fast_policy(6))
        .unwrap_err();

    assert_eq!(executor.call_count(), 1, "non-lock errors surface immediately");
    assert!(matches!(
        err.downcast_ref::<RsmachineError>(),
        Some(RsmachineError::Execution { .. })
    ));
}

#[test]
fn test_transport_failure_is_not_retried() {
    let executor = MockExecutor::failing("swupd", MockFailure::Transport, ALWAYS);

    let err = run_with_lock_retry(&executor, "swupd bundle-add containers-basic ", &fast_policy(6))
        .unwrap_err();

    assert_eq!(executor.call_count(), 1);
    assert!(matches!(
        err.downcast_ref::<RsmachineError>(),
        Some(RsmachineError::Transport { .. })
    ));
}

#[test]
fn test_immediate_success_makes_one_call() {
    let executor = MockExecutor::acknowledging();

    run_with_lock_retry(&executor, "swupd bundle-add containers-basic ", &fast_policy(6)).unwrap();

    assert_eq!(executor.call_count(), 1);
}
