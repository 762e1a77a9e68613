//! Shared systemd-based host behavior.
//!
//! Strategies for systemd distributions compose [`SystemdSupport`] for the
//! behavior they have in common: driving services through `systemctl`,
//! creating remote directories, and deploying files. Composition keeps each
//! strategy's surface explicit; there is no method promotion from a base
//! provisioner.

use std::sync::Arc;

use anyhow::Result;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use camino::Utf8Path;
use tracing::debug;

use crate::executor::RemoteExecutor;

use super::pkgaction::ServiceAction;

/// Remote drop-in file consumed by the engine's systemd unit.
pub const DAEMON_OPTIONS_FILE: &str = "/etc/systemd/system/docker.service.d/10-machine.conf";

/// Remote directory holding the deployed TLS material.
pub const DOCKER_OPTIONS_DIR: &str = "/etc/docker";

/// Composed helper for systemd hosts.
pub struct SystemdSupport {
    executor: Arc<dyn RemoteExecutor>,
}

impl SystemdSupport {
    pub fn new(executor: Arc<dyn RemoteExecutor>) -> Self {
        Self { executor }
    }

    /// Applies a service action to the named unit.
    ///
    /// `DaemonReload` ignores the unit name; it reloads the manager
    /// configuration as a whole.
    pub fn service(&self, name: &str, action: ServiceAction) -> Result<()> {
        let command = match action {
            ServiceAction::DaemonReload => "sudo systemctl daemon-reload".to_string(),
            _ => format!("sudo systemctl -f {} {}", action, name),
        };
        debug!("service: action={} name={}", action, name);
        self.executor.execute(&command)?;
        Ok(())
    }

    /// Reloads the systemd manager configuration.
    pub fn daemon_reload(&self) -> Result<()> {
        self.service("", ServiceAction::DaemonReload)
    }

    /// Ensures a remote directory exists.
    pub fn ensure_directory(&self, path: &Utf8Path) -> Result<()> {
        self.executor
            .execute(&format!("sudo mkdir -p {}", path))?;
        Ok(())
    }

    /// Deploys file content to a remote path with the given mode.
    ///
    /// Content travels base64-encoded inside the command string, so
    /// arbitrary bytes survive the shell on both ends. The transfer is a
    /// single remote command; partial writes abort the run like any other
    /// step failure.
    pub fn write_remote_file(&self, path: &Utf8Path, content: &str, mode: &str) -> Result<()> {
        debug!("deploying remote file: {} (mode {})", path, mode);
        let encoded = BASE64.encode(content.as_bytes());
        let command = format!(
            "printf '%s' {} | base64 -d | sudo tee {} >/dev/null && sudo chmod {} {}",
            encoded, path, mode, path
        );
        self.executor.execute(&command)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct RecordingExecutor {
        commands: Mutex<Vec<String>>,
    }

    impl RecordingExecutor {
        fn new() -> Self {
            Self {
                commands: Mutex::new(Vec::new()),
            }
        }

        fn commands(&self) -> Vec<String> {
            self.commands.lock().unwrap().clone()
        }
    }

    impl RemoteExecutor for RecordingExecutor {
        fn execute(&self, command: &str) -> Result<String> {
            self.commands.lock().unwrap().push(command.to_string());
            Ok(String::new())
        }
    }

    #[test]
    fn test_service_enable_uses_systemctl_verb() {
        let executor = Arc::new(RecordingExecutor::new());
        let systemd = SystemdSupport::new(executor.clone());
        systemd.service("docker", ServiceAction::Enable).unwrap();
        assert_eq!(executor.commands(), vec!["sudo systemctl -f enable docker"]);
    }

    #[test]
    fn test_daemon_reload_has_no_unit_argument() {
        let executor = Arc::new(RecordingExecutor::new());
        let systemd = SystemdSupport::new(executor.clone());
        systemd.daemon_reload().unwrap();
        assert_eq!(executor.commands(), vec!["sudo systemctl daemon-reload"]);
    }

    #[test]
    fn test_ensure_directory() {
        let executor = Arc::new(RecordingExecutor::new());
        let systemd = SystemdSupport::new(executor.clone());
        systemd
            .ensure_directory(Utf8Path::new("/etc/systemd/system/docker.service.d"))
            .unwrap();
        assert_eq!(
            executor.commands(),
            vec!["sudo mkdir -p /etc/systemd/system/docker.service.d"]
        );
    }

    #[test]
    fn test_write_remote_file_encodes_content() {
        let executor = Arc::new(RecordingExecutor::new());
        let systemd = SystemdSupport::new(executor.clone());
        systemd
            .write_remote_file(Utf8Path::new("/etc/docker/ca.pem"), "cert body", "0644")
            .unwrap();

        let commands = executor.commands();
        assert_eq!(commands.len(), 1);
        let command = &commands[0];
        assert!(command.contains(&BASE64.encode("cert body")), "got: {}", command);
        assert!(!command.contains("cert body"), "content must not appear raw");
        assert!(command.contains("sudo tee /etc/docker/ca.pem"));
        assert!(command.contains("sudo chmod 0644 /etc/docker/ca.pem"));
    }
}
