//! Engine configuration rendering.
//!
//! Renders the systemd drop-in that configures the container engine from an
//! explicit context value. Rendering is deterministic: list fields iterate
//! in declaration order and the only conditional (whether the legacy
//! `daemon` subcommand is emitted) is computed in Rust before the template
//! runs. Re-rendering an unchanged context produces byte-identical output.

use anyhow::Result;
use regex::Regex;
use tera::Tera;
use tracing::debug;

use crate::config::{AuthOptions, EngineOptions};
use crate::error::RsmachineError;
use crate::executor::RemoteExecutor;

/// First engine version that dropped the `docker daemon` subcommand in
/// favor of the `dockerd` binary. The boundary is inclusive: this version
/// and later omit the subcommand token.
pub const LEGACY_DAEMON_BOUNDARY: &str = "1.12.0";

/// Command used to query the installed engine version.
const DOCKER_VERSION_COMMAND: &str = "docker --version";

/// Systemd drop-in template for the engine service.
///
/// The `Environment=` line quotes each entry individually; quoting happens
/// during context assembly so the template itself only iterates.
const ENGINE_CONFIG_TEMPLATE: &str = r#"[Service]
Environment=TMPDIR=/var/tmp
ExecStart=
ExecStart=/usr/bin/dockerd {{ daemon_arg }}--host=unix:///var/run/docker.sock --host=tcp://0.0.0.0:{{ docker_port }} --tlsverify --tlscacert {{ ca_cert }} --tlscert {{ server_cert }} --tlskey {{ server_key }}{% for label in labels %} --label {{ label }}{% endfor %}{% for registry in insecure_registries %} --insecure-registry {{ registry }}{% endfor %}{% for mirror in registry_mirrors %} --registry-mirror {{ mirror }}{% endfor %}{% for flag in arbitrary_flags %} --{{ flag }}{% endfor %} \$DOCKER_OPTS \$DOCKER_OPT_BIP \$DOCKER_OPT_MTU \$DOCKER_OPT_IPMASQ
Environment={% for entry in env %}{{ entry }} {% endfor %}
"#;

/// Immutable snapshot of everything the template needs.
///
/// Assembled once per provisioning run, immediately before rendering, and
/// discarded afterwards.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfigContext<'a> {
    /// TCP port the engine listens on
    pub docker_port: u16,
    /// Auth options carrying the remote certificate paths
    pub auth: &'a AuthOptions,
    /// Engine options (labels, registries, mirrors, flags, env)
    pub engine: &'a EngineOptions,
    /// Installed engine version, drives the legacy subcommand conditional
    pub docker_version: &'a str,
}

/// Renders the engine configuration text for the given context.
///
/// Fails with `RsmachineError::Render` when the context is incomplete
/// (auth options without remote paths) and `RsmachineError::Template` when
/// the shipped template itself is defective. Neither is retryable.
pub fn render_engine_config(ctx: &EngineConfigContext<'_>) -> Result<String, RsmachineError> {
    if !ctx.auth.has_remote_paths() {
        return Err(RsmachineError::Render(
            "auth options are missing remote certificate paths; \
            rewrite them with AuthOptions::with_remote_paths first"
                .to_string(),
        ));
    }

    let daemon_arg = if version_gte(ctx.docker_version, LEGACY_DAEMON_BOUNDARY) {
        ""
    } else {
        "daemon "
    };

    let env_quoted: Vec<String> = ctx.engine.env.iter().map(|e| format!("{:?}", e)).collect();

    let mut tera = Tera::default();
    tera.add_raw_template("engine-config", ENGINE_CONFIG_TEMPLATE)
        .map_err(|e| RsmachineError::Template(format!("engine config template: {}", e)))?;

    let mut context = tera::Context::new();
    context.insert("daemon_arg", daemon_arg);
    context.insert("docker_port", &ctx.docker_port);
    context.insert("ca_cert", ctx.auth.ca_cert_remote.as_str());
    context.insert("server_cert", ctx.auth.server_cert_remote.as_str());
    context.insert("server_key", ctx.auth.server_key_remote.as_str());
    context.insert("labels", &ctx.engine.labels);
    context.insert("insecure_registries", &ctx.engine.insecure_registries);
    context.insert("registry_mirrors", &ctx.engine.registry_mirrors);
    context.insert("arbitrary_flags", &ctx.engine.arbitrary_flags);
    context.insert("env", &env_quoted);

    tera.render("engine-config", &context)
        .map_err(|e| RsmachineError::Template(format!("engine config render: {}", e)))
}

/// Queries the installed engine version over the remote session.
///
/// In dry-run mode the remote output is empty, so the boundary version is
/// assumed (modern start command, no legacy subcommand).
pub fn docker_client_version(executor: &dyn RemoteExecutor) -> Result<String> {
    if executor.dry_run() {
        debug!("dry run: assuming engine version {}", LEGACY_DAEMON_BOUNDARY);
        return Ok(LEGACY_DAEMON_BOUNDARY.to_string());
    }

    let output = executor.execute(DOCKER_VERSION_COMMAND)?;
    let version = parse_docker_version(&output)?;
    debug!("installed engine version: {}", version);
    Ok(version)
}

/// Extracts the version number from `docker --version` output
/// (e.g. `Docker version 1.12.0, build 8eab29e`).
fn parse_docker_version(output: &str) -> Result<String, RsmachineError> {
    let re = Regex::new(r"Docker version ([0-9]+\.[0-9]+\.[0-9]+[^,\s]*)")
        .expect("version pattern is valid");
    re.captures(output)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| RsmachineError::Execution {
            command: DOCKER_VERSION_COMMAND.to_string(),
            status: format!("unrecognized version output: {}", output.trim()),
        })
}

/// Compares dotted version strings numerically, component by component.
///
/// Non-numeric suffixes within a component (`0-rc1`) are ignored; missing
/// components compare as zero, so `1.12` equals `1.12.0`.
pub fn version_gte(version: &str, boundary: &str) -> bool {
    let a: Vec<u64> = version.split('.').map(numeric_prefix).collect();
    let b: Vec<u64> = boundary.split('.').map(numeric_prefix).collect();
    for i in 0..a.len().max(b.len()) {
        let left = a.get(i).copied().unwrap_or(0);
        let right = b.get(i).copied().unwrap_or(0);
        if left != right {
            return left > right;
        }
    }
    true
}

fn numeric_prefix(component: &str) -> u64 {
    let digits: String = component.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_gte_boundary_is_inclusive() {
        assert!(!version_gte("1.11.0", LEGACY_DAEMON_BOUNDARY));
        assert!(!version_gte("1.11.9", LEGACY_DAEMON_BOUNDARY));
        assert!(version_gte("1.12.0", LEGACY_DAEMON_BOUNDARY));
        assert!(version_gte("1.12.1", LEGACY_DAEMON_BOUNDARY));
        assert!(version_gte("17.03.0", LEGACY_DAEMON_BOUNDARY));
    }

    #[test]
    fn test_version_gte_compares_numerically_not_lexically() {
        assert!(!version_gte("1.9.1", "1.12.0"));
        assert!(version_gte("1.12.0", "1.9.1"));
    }

    #[test]
    fn test_version_gte_short_versions_compare_as_zero_padded() {
        assert!(version_gte("1.12", "1.12.0"));
        assert!(!version_gte("1.12", "1.12.1"));
    }

    #[test]
    fn test_version_gte_ignores_prerelease_suffix() {
        assert!(version_gte("1.12.0-rc2", "1.12.0"));
    }

    #[test]
    fn test_parse_docker_version() {
        let version =
            parse_docker_version("Docker version 1.12.0, build 8eab29e\n").unwrap();
        assert_eq!(version, "1.12.0");
    }

    #[test]
    fn test_parse_docker_version_rejects_garbage() {
        let err = parse_docker_version("command not found\n").unwrap_err();
        assert!(matches!(err, RsmachineError::Execution { .. }));
    }
}
