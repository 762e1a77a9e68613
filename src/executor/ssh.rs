//! SSH-based remote executor implementation.
//!
//! This module provides [`SshExecutor`], which delivers command strings to
//! the target host through the local `ssh` client binary. Output is captured
//! and classified: the OpenSSH client reserves exit status 255 for transport
//! failures, everything else is the remote command's own exit status.

use std::process::Command;

use anyhow::{Context, Result};
use tracing::{debug, trace};
use which::which;

use crate::config::SshConfig;
use crate::error::RsmachineError;

use super::{RemoteExecutor, is_lock_contention_output};

/// Exit status the OpenSSH client uses for its own failures
/// (connection refused, authentication failure, host unreachable).
const SSH_TRANSPORT_EXIT_CODE: i32 = 255;

/// Remote executor that drives the local `ssh` client.
///
/// When `dry_run` is true, commands are logged but not delivered, and
/// `execute()` returns an empty output.
pub struct SshExecutor {
    user: String,
    host: String,
    port: u16,
    identity_file: Option<camino::Utf8PathBuf>,
    dry_run: bool,
}

impl SshExecutor {
    pub fn new(config: &SshConfig, dry_run: bool) -> Self {
        Self {
            user: config.user.clone(),
            host: config.host.clone(),
            port: config.port,
            identity_file: config.identity_file.clone(),
            dry_run,
        }
    }

    /// Builds the ssh client argument list for delivering `command`.
    ///
    /// `BatchMode=yes` keeps the client from prompting interactively; a
    /// provisioning run has no terminal to answer on.
    fn build_args(&self, command: &str) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-p".to_string(),
            self.port.to_string(),
        ];
        if let Some(identity) = &self.identity_file {
            args.push("-i".to_string());
            args.push(identity.to_string());
        }
        args.push(format!("{}@{}", self.user, self.host));
        args.push(command.to_string());
        args
    }
}

impl RemoteExecutor for SshExecutor {
    fn execute(&self, command: &str) -> Result<String> {
        if self.dry_run {
            tracing::info!("dry run: {}", command);
            return Ok(String::new());
        }

        let ssh = which("ssh").context("ssh client not found in PATH")?;
        trace!("ssh client found: {}", ssh.to_string_lossy());

        let args = self.build_args(command);
        debug!("remote command: {}@{}: {}", self.user, self.host, command);

        let output = Command::new(ssh).args(&args).output().map_err(|e| {
            RsmachineError::Transport {
                command: command.to_string(),
                reason: format!("failed to run ssh client: {}", e),
            }
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            trace!("remote command succeeded: {}", command);
            return Ok(stdout);
        }

        if output.status.code() == Some(SSH_TRANSPORT_EXIT_CODE) {
            return Err(RsmachineError::Transport {
                command: command.to_string(),
                reason: stderr.trim().to_string(),
            }
            .into());
        }

        // The lock signature can land on either stream depending on the
        // package manager's version.
        if is_lock_contention_output(&stderr) || is_lock_contention_output(&stdout) {
            return Err(RsmachineError::LockContention {
                command: command.to_string(),
            }
            .into());
        }

        Err(RsmachineError::Execution {
            command: command.to_string(),
            status: format!("{}: {}", output.status, stderr.trim()),
        }
        .into())
    }

    fn dry_run(&self) -> bool {
        self.dry_run
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ssh_config(identity: Option<&str>) -> SshConfig {
        SshConfig {
            user: "core".to_string(),
            host: "192.0.2.10".to_string(),
            port: 2222,
            identity_file: identity.map(Into::into),
        }
    }

    #[test]
    fn test_build_args_without_identity() {
        let executor = SshExecutor::new(&ssh_config(None), false);
        let args = executor.build_args("uptime");
        assert_eq!(
            args,
            vec![
                "-o",
                "StrictHostKeyChecking=no",
                "-o",
                "BatchMode=yes",
                "-p",
                "2222",
                "core@192.0.2.10",
                "uptime",
            ]
        );
    }

    #[test]
    fn test_build_args_with_identity() {
        let executor = SshExecutor::new(&ssh_config(Some("/home/core/.ssh/id_ed25519")), false);
        let args = executor.build_args("uptime");
        let identity_pos = args.iter().position(|a| a == "-i").expect("-i flag present");
        assert_eq!(args[identity_pos + 1], "/home/core/.ssh/id_ed25519");
        assert_eq!(args.last().unwrap(), "uptime");
    }

    #[test]
    fn test_dry_run_skips_ssh_lookup() {
        let executor = SshExecutor::new(&ssh_config(None), true);
        let output = executor
            .execute("definitely-not-delivered")
            .expect("dry run should not require ssh to reach anything");
        assert!(output.is_empty());
        assert!(executor.dry_run());
    }
}
