pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod executor;
pub mod provision;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{FmtSubscriber, filter::LevelFilter};

use crate::driver::ProfileDriver;
use crate::executor::{RemoteExecutor, SshExecutor};
use crate::provision::registry::ProvisionerRegistry;
use crate::provision::{ProvisionReport, clearlinux, detect_provisioner};

pub use error::RsmachineError;

pub fn init_logging(log_level: cli::LogLevel) -> Result<()> {
    let filter = match log_level {
        cli::LogLevel::Trace => LevelFilter::TRACE,
        cli::LogLevel::Debug => LevelFilter::DEBUG,
        cli::LogLevel::Info => LevelFilter::INFO,
        cli::LogLevel::Warn => LevelFilter::WARN,
        cli::LogLevel::Error => LevelFilter::ERROR,
    };

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder().with_max_level(filter).finish(),
    )
    .context("failed to set global default tracing subscriber")
}

/// Provisions the machine described by the profile.
///
/// Loads and validates the profile, builds the driver and SSH executor,
/// selects the strategy through the registry, and runs the provisioning
/// sequence. In dry-run mode OS detection cannot read the remote
/// os-release file, so the profile's `os` override applies or the default
/// strategy is assumed.
pub fn run_provision(opts: &cli::ProvisionArgs) -> Result<ProvisionReport> {
    let profile = config::load_profile(opts.file.as_path())
        .with_context(|| format!("failed to load profile from {}", opts.file))?;
    profile.validate().context("profile validation failed")?;

    let driver = Arc::new(ProfileDriver::new(&profile.machine));
    let executor: Arc<dyn RemoteExecutor> = Arc::new(SshExecutor::new(&profile.ssh, opts.dry_run));
    let registry = ProvisionerRegistry::with_defaults();

    let os_override = match (&profile.os, opts.dry_run) {
        (Some(id), _) => Some(id.as_str()),
        (None, true) => {
            info!("dry run: assuming OS '{}'", clearlinux::OS_RELEASE_ID);
            Some(clearlinux::OS_RELEASE_ID)
        }
        (None, false) => None,
    };

    let provisioner = detect_provisioner(&registry, driver, executor, os_override)?;
    info!("provisioning '{}' with {} strategy", profile.machine.name, provisioner.name());

    let report = provisioner.provision(profile.swarm, profile.auth, profile.engine)?;
    info!("provisioning run reached state: {}", report.completed.last().expect("report is never empty"));
    Ok(report)
}

pub fn run_validate(opts: &cli::ValidateArgs) -> Result<()> {
    let profile = config::load_profile(opts.file.as_path())?;
    profile.validate().context("profile validation failed")?;
    info!("validation successful:\n{:#?}", profile);
    Ok(())
}
