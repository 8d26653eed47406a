//! Host OS version used to gate effects and options

use std::fmt;
use tracing::warn;

/// Comparable `(major, minor, build)` version tuple
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct OsVersion {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
}

impl OsVersion {
    pub const fn new(major: u32, minor: u32, build: u32) -> Self {
        Self { major, minor, build }
    }

    /// Parse "10.0.22631" or "Microsoft Windows [Version 10.0.22631.4317]"
    pub fn parse(text: &str) -> Option<Self> {
        let start = text.find(|c: char| c.is_ascii_digit())?;
        let digits: String = text[start..]
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        let mut parts = digits.split('.').map(|p| p.parse::<u32>().ok());
        Some(Self {
            major: parts.next()??,
            minor: parts.next()??,
            build: parts.next()??,
        })
    }

    /// Windows 10 and 11 both report major version 10
    pub fn is_nt10(&self) -> bool {
        self.major == 10
    }
}

impl fmt::Display for OsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)
    }
}

pub trait CapabilityProbe: Send + Sync {
    fn capabilities(&self) -> OsVersion;
}

/// Fixed version, for tests and `--os-version`
#[derive(Debug, Clone, Copy)]
pub struct StaticProbe(pub OsVersion);

impl CapabilityProbe for StaticProbe {
    fn capabilities(&self) -> OsVersion {
        self.0
    }
}

/// Reads the running OS version once at construction
#[derive(Debug, Clone, Copy)]
pub struct SystemProbe {
    version: OsVersion,
}

impl SystemProbe {
    pub fn detect() -> Self {
        let version = read_os_version().unwrap_or_else(|e| {
            warn!(error = %e, "Could not determine OS version, gated features disabled");
            OsVersion::default()
        });
        tracing::info!(version = %version, "Detected OS version");
        Self { version }
    }
}

impl CapabilityProbe for SystemProbe {
    fn capabilities(&self) -> OsVersion {
        self.version
    }
}

#[cfg(windows)]
fn read_os_version() -> anyhow::Result<OsVersion> {
    use anyhow::Context;
    use winreg::RegKey;
    use winreg::enums::HKEY_LOCAL_MACHINE;

    let key = RegKey::predef(HKEY_LOCAL_MACHINE)
        .open_subkey(r"SOFTWARE\Microsoft\Windows NT\CurrentVersion")
        .context("Failed to open CurrentVersion registry key")?;
    let major: u32 = key
        .get_value("CurrentMajorVersionNumber")
        .context("Failed to read CurrentMajorVersionNumber")?;
    let minor: u32 = key
        .get_value("CurrentMinorVersionNumber")
        .context("Failed to read CurrentMinorVersionNumber")?;
    let build: String = key
        .get_value("CurrentBuildNumber")
        .context("Failed to read CurrentBuildNumber")?;
    let build = build
        .trim()
        .parse()
        .with_context(|| format!("Invalid CurrentBuildNumber '{build}'"))?;
    Ok(OsVersion::new(major, minor, build))
}

#[cfg(not(windows))]
fn read_os_version() -> anyhow::Result<OsVersion> {
    anyhow::bail!("OS version query is only available on Windows")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain() {
        assert_eq!(OsVersion::parse("10.0.19041"), Some(OsVersion::new(10, 0, 19041)));
    }

    #[test]
    fn test_parse_ver_output() {
        assert_eq!(
            OsVersion::parse("\r\nMicrosoft Windows [Version 10.0.22631.4317]\r\n"),
            Some(OsVersion::new(10, 0, 22631))
        );
    }

    #[test]
    fn test_parse_rejects_short() {
        assert_eq!(OsVersion::parse("10.0"), None);
        assert_eq!(OsVersion::parse("no digits"), None);
    }

    #[test]
    fn test_ordering() {
        assert!(OsVersion::new(10, 0, 22000) > OsVersion::new(10, 0, 19041));
        assert!(OsVersion::new(10, 0, 1) < OsVersion::new(11, 0, 0));
    }
}
