//! Host platform identification.
//!
//! Node.js distributes one archive per OS and CPU pair, and the resolver
//! binary is built per OS, so both the download and the resolver backend
//! are chosen from a [`Platform`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Platform identifier combining OS and architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    /// Operating system.
    pub os: Os,
    /// CPU architecture.
    pub arch: Arch,
}

impl Platform {
    /// Create a new platform.
    #[must_use]
    pub const fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Detect the platform this process runs on.
    pub fn current() -> Result<Self> {
        let os = Os::parse(std::env::consts::OS).ok_or_else(|| {
            Error::platform(format!("operating system '{}'", std::env::consts::OS))
        })?;
        let arch = Arch::parse(std::env::consts::ARCH).ok_or_else(|| {
            Error::platform(format!("architecture '{}'", std::env::consts::ARCH))
        })?;
        Ok(Self { os, arch })
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

/// Operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    /// macOS.
    Darwin,
    /// Linux.
    Linux,
}

impl Os {
    /// Parse from string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "darwin" | "macos" => Some(Self::Darwin),
            "linux" => Some(Self::Linux),
            _ => None,
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Darwin => write!(f, "darwin"),
            Self::Linux => write!(f, "linux"),
        }
    }
}

/// CPU architecture, named the way Node.js release archives name it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    /// 64-bit ARM (`aarch64`).
    Arm64,
    /// `x86_64`.
    X64,
}

impl Arch {
    /// Parse from string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "arm64" | "aarch64" => Some(Self::Arm64),
            "x64" | "x86_64" | "amd64" => Some(Self::X64),
            _ => None,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arm64 => write!(f, "arm64"),
            Self::X64 => write!(f, "x64"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_and_arch_parse_and_display() {
        let p = Platform::new(Os::parse("linux").unwrap(), Arch::parse("x86_64").unwrap());
        assert_eq!(p, Platform::new(Os::Linux, Arch::X64));
        assert_eq!(p.to_string(), "linux-x64");

        let p = Platform::new(Os::parse("macos").unwrap(), Arch::parse("aarch64").unwrap());
        assert_eq!(p.to_string(), "darwin-arm64");

        assert!(Os::parse("windows").is_none());
        assert!(Arch::parse("riscv64").is_none());
    }

    #[test]
    #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
    fn test_current_platform() {
        assert_eq!(
            Platform::current().unwrap(),
            Platform::new(Os::Linux, Arch::X64)
        );
    }
}
