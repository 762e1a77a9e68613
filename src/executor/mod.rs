//! Remote command execution abstraction for rsmachine.
//!
//! This module provides:
//! - [`RemoteExecutor`]: Trait for executing command strings on the target host
//! - [`SshExecutor`]: Production implementation driving the local `ssh` client
//! - [`retry`]: Lock-retry wrapper for remote package-manager invocations
//!
//! Implementations must classify failures distinguishably: lock contention
//! from the remote package manager is reported as
//! [`RsmachineError::LockContention`](crate::error::RsmachineError) so the
//! retry wrapper can tell it apart from other failures.

mod ssh;

pub mod retry;

use anyhow::Result;

pub use ssh::SshExecutor;

/// Error signatures the remote package manager emits while its lock is held
/// by another process. Matched against the combined remote output.
pub(crate) const LOCK_SIGNATURES: &[&str] = &[
    "Failed to get lock",
    "Could not get lock",
    "another instance of swupd is running",
];

/// Returns true if remote command output carries a package-manager
/// lock-contention signature.
pub(crate) fn is_lock_contention_output(output: &str) -> bool {
    LOCK_SIGNATURES.iter().any(|sig| output.contains(sig))
}

/// Trait for executing commands on the remote host.
///
/// Implementations must be `Send + Sync` so an executor can be shared
/// behind `Arc<dyn RemoteExecutor>` between the driver, the provisioner
/// strategy, and its composed helpers. The command channel itself is owned
/// by one in-flight command at a time; callers issue commands strictly one
/// after another.
pub trait RemoteExecutor: Send + Sync {
    /// Executes a command string on the remote host, returning captured
    /// stdout on success.
    ///
    /// Failures are typed: transport failures surface as
    /// `RsmachineError::Transport`, lock contention as
    /// `RsmachineError::LockContention`, and other non-zero exits as
    /// `RsmachineError::Execution`.
    fn execute(&self, command: &str) -> Result<String>;

    /// Returns true if this executor only logs commands instead of
    /// delivering them. Steps that read local inputs or interpret remote
    /// output may short-circuit when set.
    fn dry_run(&self) -> bool {
        false
    }
}
