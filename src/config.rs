//! Machine profile loading and validation.
//!
//! A profile is a YAML document describing one remote machine: how to reach
//! it over SSH, what the container engine should look like once provisioned,
//! where the TLS material lives locally, and whether the host should join a
//! swarm cluster. Profiles are fully validated before any remote command is
//! issued.

use std::fs::File;
use std::io::BufReader;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use url::Url;

use crate::error::RsmachineError;

/// Default TCP port the engine listens on for TLS connections.
pub const DEFAULT_ENGINE_PORT: u16 = 2376;

/// Default swupd bundle providing the container runtime.
pub const DEFAULT_INSTALL_BUNDLE: &str = "containers-basic";

fn default_engine_port() -> u16 {
    DEFAULT_ENGINE_PORT
}

fn default_install_bundle() -> String {
    DEFAULT_INSTALL_BUNDLE.to_string()
}

fn default_ssh_user() -> String {
    "root".to_string()
}

fn default_ssh_port() -> u16 {
    22
}

fn default_driver_name() -> String {
    "unknown".to_string()
}

/// Top-level machine profile.
#[derive(Debug, Deserialize)]
pub struct Profile {
    /// Machine identity (name and originating driver)
    pub machine: MachineConfig,
    /// SSH transport settings for reaching the host
    pub ssh: SshConfig,
    /// Container engine settings (defaults apply when omitted)
    #[serde(default)]
    pub engine: EngineOptions,
    /// Local TLS certificate material to deploy
    pub auth: AuthOptions,
    /// Swarm cluster membership (disabled when omitted)
    #[serde(default)]
    pub swarm: SwarmOptions,
    /// Override OS detection with an explicit os-release ID
    #[serde(default)]
    pub os: Option<String>,
}

/// Machine identity settings.
#[derive(Debug, Deserialize)]
pub struct MachineConfig {
    /// Hostname to assign to the remote machine
    pub name: String,
    /// Name of the driver that created the machine, recorded as a
    /// `provider=<driver>` engine label
    #[serde(default = "default_driver_name")]
    pub driver: String,
}

/// SSH transport settings.
#[derive(Debug, Deserialize)]
pub struct SshConfig {
    /// Remote user to connect as
    #[serde(default = "default_ssh_user")]
    pub user: String,
    /// Remote host address
    pub host: String,
    /// Remote SSH port
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    /// Private key for authentication (agent-based auth when omitted)
    #[serde(default)]
    pub identity_file: Option<Utf8PathBuf>,
}

/// Container engine settings rendered into the daemon options file.
///
/// List fields are rendered in declaration order; the order is part of the
/// generated file's byte content and must be preserved end to end.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct EngineOptions {
    /// TCP port the engine listens on
    #[serde(default = "default_engine_port")]
    pub port: u16,
    /// Engine labels (`key=value`)
    #[serde(default)]
    pub labels: Vec<String>,
    /// Registries the engine may pull from without TLS verification
    #[serde(default)]
    pub insecure_registries: Vec<String>,
    /// Registry mirror URLs
    #[serde(default)]
    pub registry_mirrors: Vec<String>,
    /// Additional daemon flags, passed through as `--<flag>`
    #[serde(default)]
    pub arbitrary_flags: Vec<String>,
    /// Environment variables (`KEY=value`) for the engine service
    #[serde(default)]
    pub env: Vec<String>,
    /// Package-manager bundle that provides the runtime
    #[serde(default = "default_install_bundle")]
    pub install_bundle: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_ENGINE_PORT,
            labels: Vec::new(),
            insecure_registries: Vec::new(),
            registry_mirrors: Vec::new(),
            arbitrary_flags: Vec::new(),
            env: Vec::new(),
            install_bundle: DEFAULT_INSTALL_BUNDLE.to_string(),
        }
    }
}

/// TLS certificate material for the engine.
///
/// The `*_remote` fields are not part of the profile: they start empty and
/// are filled in by the provisioning sequence once the remote locations are
/// known (the auth options are replaced wholesale at that point, never
/// merged). Rendering the engine config requires the remote paths to be
/// present.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct AuthOptions {
    /// Local path to the CA certificate
    pub ca_cert: Utf8PathBuf,
    /// Local path to the server certificate
    pub server_cert: Utf8PathBuf,
    /// Local path to the server private key
    pub server_key: Utf8PathBuf,
    /// Remote path the CA certificate is deployed to
    #[serde(skip)]
    pub ca_cert_remote: Utf8PathBuf,
    /// Remote path the server certificate is deployed to
    #[serde(skip)]
    pub server_cert_remote: Utf8PathBuf,
    /// Remote path the server key is deployed to
    #[serde(skip)]
    pub server_key_remote: Utf8PathBuf,
}

impl AuthOptions {
    /// Returns a copy with the remote paths rewritten to live under `dir`.
    ///
    /// This is the `AuthPrepared` rewrite: the returned value replaces the
    /// previous auth options for every later step.
    #[must_use]
    pub fn with_remote_paths(&self, dir: &Utf8Path) -> Self {
        Self {
            ca_cert_remote: dir.join("ca.pem"),
            server_cert_remote: dir.join("server.pem"),
            server_key_remote: dir.join("server-key.pem"),
            ..self.clone()
        }
    }

    /// Returns true if all remote deployment paths have been assigned.
    pub fn has_remote_paths(&self) -> bool {
        !self.ca_cert_remote.as_str().is_empty()
            && !self.server_cert_remote.as_str().is_empty()
            && !self.server_key_remote.as_str().is_empty()
    }
}

/// Swarm cluster membership settings.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct SwarmOptions {
    /// Whether the host should join a swarm after the engine is configured
    #[serde(default)]
    pub enabled: bool,
    /// Address of the swarm manager to join
    #[serde(default)]
    pub address: String,
    /// Join token issued by the swarm manager
    #[serde(default)]
    pub join_token: String,
}

impl Profile {
    /// Validates the profile before any remote command is issued.
    ///
    /// Checks shape only: referenced local files are read later, by the
    /// steps that need them.
    pub fn validate(&self) -> Result<(), RsmachineError> {
        validate_machine_name(&self.machine.name)?;

        if self.ssh.host.trim().is_empty() {
            return Err(RsmachineError::Validation(
                "ssh host must not be empty".to_string(),
            ));
        }

        validate_auth(&self.auth)?;
        validate_engine(&self.engine)?;
        validate_swarm(&self.swarm)?;

        if let Some(os) = &self.os
            && os.trim().is_empty()
        {
            return Err(RsmachineError::Validation(
                "os override must not be empty when specified".to_string(),
            ));
        }

        Ok(())
    }
}

/// Validates that the machine name is usable as a hostname.
fn validate_machine_name(name: &str) -> Result<(), RsmachineError> {
    if name.is_empty() {
        return Err(RsmachineError::Validation(
            "machine name must not be empty".to_string(),
        ));
    }
    let valid = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
    if !valid || name.starts_with('-') {
        return Err(RsmachineError::Validation(format!(
            "machine name '{}' is not a valid hostname",
            name
        )));
    }
    Ok(())
}

fn validate_auth(auth: &AuthOptions) -> Result<(), RsmachineError> {
    let required = [
        ("auth.ca_cert", &auth.ca_cert),
        ("auth.server_cert", &auth.server_cert),
        ("auth.server_key", &auth.server_key),
    ];
    for (field, path) in required {
        if path.as_str().is_empty() {
            return Err(RsmachineError::Validation(format!(
                "{} must not be empty",
                field
            )));
        }
    }
    Ok(())
}

fn validate_engine(engine: &EngineOptions) -> Result<(), RsmachineError> {
    for label in &engine.labels {
        if !label.contains('=') {
            return Err(RsmachineError::Validation(format!(
                "engine label '{}' must be of the form key=value",
                label
            )));
        }
    }

    for entry in &engine.env {
        if !entry.contains('=') {
            return Err(RsmachineError::Validation(format!(
                "engine env entry '{}' must be of the form KEY=value",
                entry
            )));
        }
    }

    for mirror in &engine.registry_mirrors {
        let url = Url::parse(mirror).map_err(|e| {
            RsmachineError::Validation(format!("registry mirror '{}' is not a valid URL: {}", mirror, e))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(RsmachineError::Validation(format!(
                "registry mirror '{}' must use http or https",
                mirror
            )));
        }
    }

    for registry in &engine.insecure_registries {
        if registry.trim().is_empty() {
            return Err(RsmachineError::Validation(
                "insecure registry entries must not be empty".to_string(),
            ));
        }
    }

    if engine.install_bundle.trim().is_empty() {
        return Err(RsmachineError::Validation(
            "engine install_bundle must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_swarm(swarm: &SwarmOptions) -> Result<(), RsmachineError> {
    if !swarm.enabled {
        return Ok(());
    }
    if swarm.address.trim().is_empty() {
        return Err(RsmachineError::Validation(
            "swarm.address is required when swarm is enabled".to_string(),
        ));
    }
    if swarm.join_token.trim().is_empty() {
        return Err(RsmachineError::Validation(
            "swarm.join_token is required when swarm is enabled".to_string(),
        ));
    }
    Ok(())
}

/// Loads a machine profile from a YAML file.
pub fn load_profile(path: &Utf8Path) -> Result<Profile> {
    let file = File::open(path).with_context(|| format!("failed to load file: {}", path))?;
    let reader = BufReader::new(file);
    let profile: Profile = serde_yaml::from_reader(reader)
        .map_err(|e| RsmachineError::Config(format!("failed to parse yaml: {}: {}", path, e)))?;
    Ok(profile)
}
