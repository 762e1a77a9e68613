//! Lock-retry wrapper for remote package-manager commands.
//!
//! Package managers hold an exclusive lock on their database; on a freshly
//! booted host a background update frequently holds it for a while. This
//! module retries a command for as long as the failure is classified as
//! lock contention, up to a bounded number of attempts. Every other failure
//! is surfaced immediately. This is the only retry policy in the crate.

use std::thread;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, warn};

use crate::error::RsmachineError;

use super::RemoteExecutor;

/// Bounded retry policy for lock-contended package-manager commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub attempts: u32,
    /// Wait between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 6,
            delay: Duration::from_secs(5),
        }
    }
}

/// Executes `command` via the executor, retrying on lock contention.
///
/// Retries only when the failure downcasts to
/// [`RsmachineError::LockContention`]; any other error is returned
/// immediately without retry. When every attempt hits the lock, the last
/// lock error is surfaced.
pub fn run_with_lock_retry(
    executor: &dyn RemoteExecutor,
    command: &str,
    policy: &RetryPolicy,
) -> Result<String> {
    if policy.attempts == 0 {
        return Err(RsmachineError::Validation(
            "retry policy must allow at least one attempt".to_string(),
        )
        .into());
    }

    let mut last_err = None;
    for attempt in 1..=policy.attempts {
        match executor.execute(command) {
            Ok(output) => {
                if attempt > 1 {
                    debug!("package manager lock released after {} attempt(s)", attempt);
                }
                return Ok(output);
            }
            Err(err) => {
                let is_lock = err
                    .downcast_ref::<RsmachineError>()
                    .is_some_and(RsmachineError::is_lock_contention);
                if !is_lock {
                    return Err(err);
                }
                warn!(
                    "package manager lock held (attempt {}/{}): {}",
                    attempt, policy.attempts, command
                );
                last_err = Some(err);
                if attempt < policy.attempts {
                    thread::sleep(policy.delay);
                }
            }
        }
    }

    Err(last_err.expect("at least one attempt was made"))
}
