//! Generic package and service action intents.
//!
//! These enums carry no state: they are pure inputs to the per-strategy
//! translation that maps them onto a concrete package manager or service
//! manager command.

use serde::{Deserialize, Serialize};
use strum::Display;

/// Generic intent over a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PackageAction {
    /// Install the package
    Install,
    /// Upgrade the package to the latest version
    Upgrade,
    /// Remove the package, keeping its configuration
    Remove,
    /// Remove the package and its configuration
    Purge,
}

/// Generic intent over a system service, rendered as the `systemctl` verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
    Enable,
    Disable,
    DaemonReload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_action_display() {
        assert_eq!(PackageAction::Install.to_string(), "install");
        assert_eq!(PackageAction::Purge.to_string(), "purge");
    }

    #[test]
    fn test_service_action_display_matches_systemctl_verbs() {
        assert_eq!(ServiceAction::Enable.to_string(), "enable");
        assert_eq!(ServiceAction::DaemonReload.to_string(), "daemon-reload");
    }
}
