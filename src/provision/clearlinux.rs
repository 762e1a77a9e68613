//! Clear Linux provisioner strategy.
//!
//! Drives swupd for package management and systemd for the engine service.
//! The provisioning sequence is an explicit state-passing pipeline: every
//! step receives the options it needs and returns what the next step
//! consumes, with failures annotated by the state they occurred in.

use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info};

use crate::config::{AuthOptions, DEFAULT_INSTALL_BUNDLE, EngineOptions, SwarmOptions};
use crate::driver::Driver;
use crate::error::RsmachineError;
use crate::executor::retry::{RetryPolicy, run_with_lock_retry};
use crate::executor::RemoteExecutor;

use super::engine::{self, EngineConfigContext};
use super::pkgaction::{PackageAction, ServiceAction};
use super::registry::ProvisionerRegistry;
use super::systemd::{self, SystemdSupport};
use super::{DockerOptions, ProvisionReport, ProvisionState, Provisioner};

/// os-release ID this strategy registers under.
pub const OS_RELEASE_ID: &str = "clear-linux-os";

/// Registers this strategy with the given registry.
///
/// Called explicitly by startup code; there is no registration at module
/// load time.
pub fn register(registry: &mut ProvisionerRegistry) -> Result<(), RsmachineError> {
    registry.register(OS_RELEASE_ID, ClearLinuxProvisioner::boxed)
}

/// Maps a package action onto the swupd command for the (aliased) package.
///
/// swupd has no remove-keeping-configuration concept: no verb is assigned
/// for `Remove`, and callers get a typed error instead of a command with a
/// missing action verb. `Purge` is the removal verb.
///
/// The trailing space is intentional: callers append flags to the command.
pub fn swupd_package_command(
    action: PackageAction,
    name: &str,
) -> Result<String, RsmachineError> {
    let fragment = match action {
        PackageAction::Install | PackageAction::Upgrade => "bundle-add",
        PackageAction::Purge => "bundle-remove",
        PackageAction::Remove => {
            return Err(RsmachineError::Validation(
                "package action 'remove' has no swupd command assigned; \
                use 'purge' to remove a bundle"
                    .to_string(),
            ));
        }
    };
    Ok(format!("swupd {} {} ", fragment, alias_bundle(name)))
}

/// Rewrites logical package names to the Clear Linux bundle that provides
/// them.
fn alias_bundle(name: &str) -> &str {
    match name {
        "docker" => DEFAULT_INSTALL_BUNDLE,
        _ => name,
    }
}

/// Provisioner strategy for Clear Linux hosts.
pub struct ClearLinuxProvisioner {
    driver: Arc<dyn Driver>,
    executor: Arc<dyn RemoteExecutor>,
    systemd: SystemdSupport,
    retry: RetryPolicy,
}

impl std::fmt::Debug for ClearLinuxProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClearLinuxProvisioner").finish_non_exhaustive()
    }
}

impl ClearLinuxProvisioner {
    pub fn new(driver: Arc<dyn Driver>, executor: Arc<dyn RemoteExecutor>) -> Self {
        let systemd = SystemdSupport::new(executor.clone());
        Self {
            driver,
            executor,
            systemd,
            retry: RetryPolicy::default(),
        }
    }

    /// Registry constructor.
    pub fn boxed(driver: Arc<dyn Driver>, executor: Arc<dyn RemoteExecutor>) -> Box<dyn Provisioner> {
        Box::new(Self::new(driver, executor))
    }

    /// Replaces the lock-retry policy for package-manager commands.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Runs one sequence step, recording the state on success and
    /// annotating the error with it on failure. The originating error is
    /// preserved as the source, unchanged.
    fn step<T>(
        &self,
        report: &mut ProvisionReport,
        state: ProvisionState,
        f: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        debug!("entering provisioning state: {}", state);
        let value = f().map_err(|e| RsmachineError::Step {
            state,
            source: e.into(),
        })?;
        report.completed.push(state);
        Ok(value)
    }

    /// Deploys local certificate material to its remote path.
    fn deploy_cert(&self, local: &Utf8Path, remote: &Utf8Path, mode: &str) -> Result<()> {
        if self.executor.dry_run() {
            info!("dry run: would deploy {} to {}", local, remote);
            return Ok(());
        }
        let content = fs::read_to_string(local)
            .with_context(|| format!("failed to read certificate material: {}", local))?;
        self.systemd.write_remote_file(remote, &content, mode)
    }

    /// Deploys TLS material and the rendered daemon options file.
    fn configure_auth(&self, auth: &AuthOptions, engine_opts: &EngineOptions) -> Result<()> {
        debug!("deploying certificate material");
        self.deploy_cert(&auth.ca_cert, &auth.ca_cert_remote, "0644")?;
        self.deploy_cert(&auth.server_cert, &auth.server_cert_remote, "0644")?;
        self.deploy_cert(&auth.server_key, &auth.server_key_remote, "0600")?;

        let options = self.generate_docker_options(engine_opts.port, auth, engine_opts)?;
        self.systemd.write_remote_file(
            &options.engine_options_path,
            &options.engine_options,
            "0644",
        )?;
        self.systemd.daemon_reload()
    }

    /// Joins the swarm cluster when the profile requests it.
    fn configure_swarm(&self, swarm: &SwarmOptions) -> Result<()> {
        if !swarm.enabled {
            debug!("swarm not requested, skipping cluster configuration");
            return Ok(());
        }
        let command = format!(
            "sudo docker swarm join --token {} {}",
            swarm.join_token, swarm.address
        );
        self.executor.execute(&command)?;
        Ok(())
    }
}

impl Provisioner for ClearLinuxProvisioner {
    fn name(&self) -> &'static str {
        "ClearLinux"
    }

    fn set_hostname(&self, hostname: &str) -> Result<()> {
        debug!("setting hostname: {}", hostname);
        self.executor
            .execute(&format!("sudo hostnamectl set-hostname {}", hostname))?;
        Ok(())
    }

    fn package(&self, name: &str, action: PackageAction) -> Result<()> {
        let command = swupd_package_command(action, name)?;
        debug!("package: action={} name={}", action, alias_bundle(name));
        run_with_lock_retry(self.executor.as_ref(), &command, &self.retry)?;
        Ok(())
    }

    fn generate_docker_options(
        &self,
        docker_port: u16,
        auth: &AuthOptions,
        engine_opts: &EngineOptions,
    ) -> Result<DockerOptions> {
        let mut engine_opts = engine_opts.clone();
        engine_opts
            .labels
            .push(format!("provider={}", self.driver.driver_name()));

        let docker_version = engine::docker_client_version(self.executor.as_ref())?;

        let ctx = EngineConfigContext {
            docker_port,
            auth,
            engine: &engine_opts,
            docker_version: &docker_version,
        };
        let rendered = engine::render_engine_config(&ctx)?;

        Ok(DockerOptions {
            engine_options: rendered,
            engine_options_path: Utf8PathBuf::from(systemd::DAEMON_OPTIONS_FILE),
        })
    }

    fn provision(
        &self,
        swarm: SwarmOptions,
        auth: AuthOptions,
        engine_opts: EngineOptions,
    ) -> Result<ProvisionReport> {
        let mut report = ProvisionReport::default();
        report.completed.push(ProvisionState::Init);

        self.step(&mut report, ProvisionState::HostnameSet, || {
            self.set_hostname(self.driver.machine_name())
        })?;

        let options_dir = Utf8Path::new(systemd::DAEMON_OPTIONS_FILE)
            .parent()
            .expect("daemon options file has a parent directory");
        self.step(&mut report, ProvisionState::PackageDirReady, || {
            self.systemd.ensure_directory(options_dir)
        })?;

        info!("installing base package: name={}", engine_opts.install_bundle);
        self.step(&mut report, ProvisionState::BasePackageInstalled, || {
            self.package(&engine_opts.install_bundle, PackageAction::Install)
        })?;

        // Replace, never merge: later steps only ever see the rewritten
        // auth options.
        let auth = self.step(&mut report, ProvisionState::AuthPrepared, || {
            Ok(auth.with_remote_paths(Utf8Path::new(systemd::DOCKER_OPTIONS_DIR)))
        })?;

        self.step(&mut report, ProvisionState::AuthConfigured, || {
            self.configure_auth(&auth, &engine_opts)
        })?;

        self.step(&mut report, ProvisionState::SwarmConfigured, || {
            self.configure_swarm(&swarm)
        })?;

        self.step(&mut report, ProvisionState::ServiceEnabled, || {
            self.systemd.service("docker", ServiceAction::Enable)
        })?;

        report.completed.push(ProvisionState::Done);
        info!(
            "provisioning completed for machine '{}'",
            self.driver.machine_name()
        );
        Ok(report)
    }
}
