//! Provisioner strategies for remote container-runtime bootstrap.
//!
//! This module provides the trait and implementations for OS-specific
//! provisioning strategies. A strategy knows how to set the hostname,
//! drive the host's package manager, generate the engine configuration,
//! and run the end-to-end provisioning sequence. Strategies are selected
//! through an explicit [`registry::ProvisionerRegistry`] keyed by the
//! host's os-release ID.

pub mod clearlinux;
pub mod engine;
pub mod osrelease;
pub mod pkgaction;
pub mod registry;
pub mod systemd;

use std::sync::Arc;

use anyhow::Result;
use camino::Utf8PathBuf;
use strum::Display;
use tracing::{debug, info};

use crate::config::{AuthOptions, EngineOptions, SwarmOptions};
use crate::driver::Driver;
use crate::error::RsmachineError;
use crate::executor::RemoteExecutor;

use pkgaction::PackageAction;
use registry::ProvisionerRegistry;

/// Rendered engine configuration and the remote path it must be written to.
///
/// The exact byte content is part of the compatibility surface:
/// re-provisioning an already-configured host with unchanged inputs must
/// regenerate identical content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerOptions {
    /// Rendered configuration text
    pub engine_options: String,
    /// Remote path of the daemon options file
    pub engine_options_path: Utf8PathBuf,
}

/// States of the provisioning sequence, in strict linear order.
///
/// Each transition is a blocking step that must fully succeed before the
/// next begins; a step failure aborts the run in that state with no
/// partial rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ProvisionState {
    Init,
    HostnameSet,
    PackageDirReady,
    BasePackageInstalled,
    AuthPrepared,
    AuthConfigured,
    SwarmConfigured,
    ServiceEnabled,
    Done,
}

/// Ordered record of the states a provisioning run passed through.
///
/// A successful run ends with [`ProvisionState::Done`]; a failed run never
/// produces a report; the error names the state it aborted in.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProvisionReport {
    pub completed: Vec<ProvisionState>,
}

impl ProvisionReport {
    /// Returns true if the run reached the terminal `Done` state.
    pub fn is_done(&self) -> bool {
        self.completed.last() == Some(&ProvisionState::Done)
    }
}

/// An OS-specific provisioning strategy.
///
/// One implementation exists per OS family; shared systemd behavior lives
/// in the composed [`systemd::SystemdSupport`] helper rather than a base
/// type. Exactly one strategy instance is active per provisioning run and
/// the sequence threads its state explicitly; implementations must not
/// share mutable option state across runs.
pub trait Provisioner: std::fmt::Debug {
    /// Human-readable strategy name.
    fn name(&self) -> &'static str;

    /// Sets the remote hostname.
    fn set_hostname(&self, hostname: &str) -> Result<()>;

    /// Applies a package action to the named package, translating the
    /// generic intent into the host package manager's syntax.
    fn package(&self, name: &str, action: PackageAction) -> Result<()>;

    /// Renders the engine configuration for the given context.
    ///
    /// Auth options must already carry remote paths (see
    /// [`AuthOptions::with_remote_paths`]).
    fn generate_docker_options(
        &self,
        docker_port: u16,
        auth: &AuthOptions,
        engine: &EngineOptions,
    ) -> Result<DockerOptions>;

    /// Runs the end-to-end provisioning sequence.
    fn provision(
        &self,
        swarm: SwarmOptions,
        auth: AuthOptions,
        engine: EngineOptions,
    ) -> Result<ProvisionReport>;
}

/// Constructor signature registered for each OS family.
pub type ProvisionerFactory =
    fn(Arc<dyn Driver>, Arc<dyn RemoteExecutor>) -> Box<dyn Provisioner>;

/// Selects the provisioner strategy for the target host.
///
/// Uses `os_override` when given; otherwise detects the OS by reading the
/// remote os-release file. The registry is consulted exactly once per run.
pub fn detect_provisioner(
    registry: &ProvisionerRegistry,
    driver: Arc<dyn Driver>,
    executor: Arc<dyn RemoteExecutor>,
    os_override: Option<&str>,
) -> Result<Box<dyn Provisioner>> {
    let os_id = match os_override {
        Some(id) => {
            debug!("skipping OS detection, using override: {}", id);
            id.to_string()
        }
        None => {
            let release = osrelease::detect(executor.as_ref())?;
            info!("detected remote OS: {}", release.id);
            release.id
        }
    };

    let factory = registry.lookup(&os_id).ok_or_else(|| {
        RsmachineError::Validation(format!(
            "no provisioner registered for OS '{}' (known: {})",
            os_id,
            registry.ids().collect::<Vec<_>>().join(", ")
        ))
    })?;

    Ok(factory(driver, executor))
}
