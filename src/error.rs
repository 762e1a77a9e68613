//! Domain-specific error types for rsmachine.
//!
//! This module defines `RsmachineError`, a `thiserror`-based enum that
//! provides typed error variants for common failure modes. Public API
//! functions return `Result<T, RsmachineError>` for programmatic error
//! handling, while trait boundaries continue to use `anyhow::Result`.
//!
//! `RsmachineError` implements `Into<anyhow::Error>`, so the `?` operator
//! converts it automatically at trait boundaries that return `anyhow::Result`.
//!
//! Two variants carry special semantics: `LockContention` is the only error
//! the lock-retry wrapper will retry, and `Step` annotates a sequence
//! failure with the provisioning state it occurred in while preserving the
//! originating error as its source.

use crate::provision::ProvisionState;

/// Domain-specific error type for rsmachine.
///
/// Provides typed variants for common failure modes, enabling callers
/// to match on error kinds programmatically rather than parsing error
/// message strings.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RsmachineError {
    /// A validation constraint was violated.
    #[error("validation error: {0}")]
    Validation(String),

    /// A configuration file could not be loaded or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The remote session could not deliver or complete a command
    /// (spawn failure, connection loss, authentication failure).
    #[error("transport error: {command}: {reason}")]
    Transport {
        /// The command that was being delivered.
        command: String,
        /// Human-readable reason for the transport failure.
        reason: String,
    },

    /// The remote package manager's lock is held by another process.
    ///
    /// This is the only retryable error in the crate; see
    /// [`crate::executor::retry::run_with_lock_retry`].
    #[error("package manager lock held: {command}")]
    LockContention {
        /// The package-manager command that hit the lock.
        command: String,
    },

    /// A remote command completed but exited non-zero (non-lock failure).
    #[error("remote command failed: {command}: {status}")]
    Execution {
        /// The command that was executed.
        command: String,
        /// Exit status or a description of the failure.
        status: String,
    },

    /// The shipped engine-config template failed to parse.
    ///
    /// Always a programming defect, never caused by user input.
    #[error("template error: {0}")]
    Template(String),

    /// The engine-config context was incomplete at render time
    /// (e.g., missing remote auth paths).
    #[error("render error: {0}")]
    Render(String),

    /// A provisioning sequence step failed, annotated with the state
    /// the sequence was in. The originating error is preserved as the
    /// source, unchanged.
    #[error("provisioning failed at state {state}: {source}")]
    Step {
        /// The provisioning state in which the failure occurred.
        state: ProvisionState,
        /// The originating step error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl RsmachineError {
    /// Returns true if this error is package-manager lock contention.
    ///
    /// The lock-retry wrapper uses this to decide whether a failed
    /// package-manager invocation may be retried.
    pub fn is_lock_contention(&self) -> bool {
        matches!(self, Self::LockContention { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display() {
        let err = RsmachineError::Validation("machine name must not be empty".to_string());
        assert_eq!(err.to_string(), "validation error: machine name must not be empty");
    }

    #[test]
    fn test_transport_display() {
        let err = RsmachineError::Transport {
            command: "hostnamectl set-hostname devbox".to_string(),
            reason: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "transport error: hostnamectl set-hostname devbox: connection refused"
        );
    }

    #[test]
    fn test_lock_contention_display_and_predicate() {
        let err = RsmachineError::LockContention {
            command: "swupd bundle-add containers-basic ".to_string(),
        };
        assert!(err.is_lock_contention());
        assert_eq!(
            err.to_string(),
            "package manager lock held: swupd bundle-add containers-basic "
        );
    }

    #[test]
    fn test_execution_is_not_lock_contention() {
        let err = RsmachineError::Execution {
            command: "swupd bundle-add containers-basic ".to_string(),
            status: "exit status: 1".to_string(),
        };
        assert!(!err.is_lock_contention());
    }

    #[test]
    fn test_step_display_names_state() {
        let source = RsmachineError::Execution {
            command: "docker swarm join".to_string(),
            status: "exit status: 1".to_string(),
        };
        let err = RsmachineError::Step {
            state: ProvisionState::SwarmConfigured,
            source: Box::new(source),
        };
        let display = err.to_string();
        assert!(display.contains("swarm-configured"), "got: {}", display);
        assert!(display.contains("docker swarm join"), "got: {}", display);
    }

    #[test]
    fn test_into_anyhow_error() {
        let err = RsmachineError::Validation("test".to_string());
        let anyhow_err: anyhow::Error = err.into();
        let downcast = anyhow_err.downcast_ref::<RsmachineError>();
        assert!(downcast.is_some());
        assert!(matches!(downcast.unwrap(), RsmachineError::Validation(_)));
    }
}
