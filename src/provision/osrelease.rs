//! Remote OS detection via the os-release file.
//!
//! Reads `/etc/os-release` over the remote session and parses the fields
//! relevant for strategy selection. The `ID` field is the registry lookup
//! key; it is immutable once detected and consulted exactly once per run.

use anyhow::Result;

use crate::error::RsmachineError;
use crate::executor::RemoteExecutor;

/// Command issued to read the os-release file.
const OS_RELEASE_COMMAND: &str = "cat /etc/os-release";

/// Parsed os-release fields relevant for provisioner dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsRelease {
    /// Distribution family identifier (e.g. `clear-linux-os`)
    pub id: String,
    /// Distribution version, when present
    pub version_id: Option<String>,
    /// Human-readable name, when present
    pub pretty_name: Option<String>,
}

/// Reads and parses the remote os-release file.
pub fn detect(executor: &dyn RemoteExecutor) -> Result<OsRelease> {
    let output = executor.execute(OS_RELEASE_COMMAND)?;
    Ok(parse_os_release(&output)?)
}

/// Parses os-release `KEY=VALUE` text.
///
/// Values may be wrapped in single or double quotes; comment and blank
/// lines are skipped. A missing `ID` field is an error since dispatch
/// depends on it.
pub fn parse_os_release(text: &str) -> Result<OsRelease, RsmachineError> {
    let mut id = None;
    let mut version_id = None;
    let mut pretty_name = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = unquote(value);
        match key {
            "ID" => id = Some(value.to_string()),
            "VERSION_ID" => version_id = Some(value.to_string()),
            "PRETTY_NAME" => pretty_name = Some(value.to_string()),
            _ => {}
        }
    }

    let id = id.filter(|v| !v.is_empty()).ok_or_else(|| {
        RsmachineError::Validation("os-release output is missing the ID field".to_string())
    })?;

    Ok(OsRelease {
        id,
        version_id,
        pretty_name,
    })
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAR_LINUX_OS_RELEASE: &str = r#"NAME="Clear Linux OS"
VERSION=1
ID=clear-linux-os
ID_LIKE=clear-linux-os
VERSION_ID=35000
PRETTY_NAME="Clear Linux OS"
ANSI_COLOR="1;35"
HOME_URL="https://clearlinux.org"
"#;

    #[test]
    fn test_parse_clear_linux_os_release() {
        let release = parse_os_release(CLEAR_LINUX_OS_RELEASE).unwrap();
        assert_eq!(release.id, "clear-linux-os");
        assert_eq!(release.version_id.as_deref(), Some("35000"));
        assert_eq!(release.pretty_name.as_deref(), Some("Clear Linux OS"));
    }

    #[test]
    fn test_parse_single_quoted_values() {
        let release = parse_os_release("ID='debian'\nVERSION_ID='12'\n").unwrap();
        assert_eq!(release.id, "debian");
        assert_eq!(release.version_id.as_deref(), Some("12"));
    }

    #[test]
    fn test_parse_skips_comments_and_blank_lines() {
        let release = parse_os_release("# comment\n\nID=fedora\n").unwrap();
        assert_eq!(release.id, "fedora");
        assert!(release.version_id.is_none());
    }

    #[test]
    fn test_parse_missing_id_is_an_error() {
        let err = parse_os_release("NAME=\"Some OS\"\n").unwrap_err();
        assert!(err.to_string().contains("missing the ID field"));
    }

    #[test]
    fn test_parse_empty_id_is_an_error() {
        assert!(parse_os_release("ID=\"\"\n").is_err());
    }
}
