//! Host platform detection and naming.
//!
//! Two vocabularies are derived from the same host facts and must stay apart:
//! - the compatibility key (`{os}-{arch}`, e.g. "darwin-arm64"), checked
//!   against the hosts that have prebuilt toolchains
//! - the download name (e.g. "linux-x86"), which is baked into published
//!   artifact file names and does not carry the architecture

use std::fmt;

use crate::{Error, Result};

/// Hosts with a published prebuilt toolchain.
pub const SUPPORTED_HOSTS: &[&str] = &["linux-x64", "win32-x64", "darwin-x64", "darwin-arm64"];

/// Operating system family.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OsFamily {
    /// Linux.
    Linux,
    /// Windows ("win32").
    Windows,
    /// macOS ("darwin").
    Darwin,
    /// Anything else, by its raw name.
    Other(String),
}

impl OsFamily {
    /// Get the OS family of the running host.
    #[must_use]
    pub fn current() -> Self {
        match std::env::consts::OS {
            "linux" => Self::Linux,
            "windows" => Self::Windows,
            "macos" => Self::Darwin,
            other => Self::Other(other.to_string()),
        }
    }

    /// Parse from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "linux" => Self::Linux,
            "win32" | "windows" => Self::Windows,
            "darwin" | "macos" | "osx" => Self::Darwin,
            other => Self::Other(other.to_string()),
        }
    }

    /// Name of the OS family inside artifact file names.
    pub fn download_name(&self) -> Result<&'static str> {
        match self {
            Self::Linux => Ok("linux-x86"),
            Self::Windows => Ok("windows-x86"),
            Self::Darwin => Ok("darwin-x86"),
            Self::Other(os) => Err(Error::unsupported_platform(os.clone())),
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::Windows => write!(f, "win32"),
            Self::Darwin => write!(f, "darwin"),
            Self::Other(os) => write!(f, "{os}"),
        }
    }
}

/// CPU architecture.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Arch {
    /// 64-bit x86.
    X64,
    /// 64-bit ARM.
    Arm64,
    /// 32-bit x86.
    Ia32,
    /// Anything else, by its raw name.
    Other(String),
}

impl Arch {
    /// Get the architecture of the running host.
    #[must_use]
    pub fn current() -> Self {
        match std::env::consts::ARCH {
            "x86_64" => Self::X64,
            "aarch64" => Self::Arm64,
            "x86" => Self::Ia32,
            other => Self::Other(other.to_string()),
        }
    }

    /// Parse from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "x64" | "x86_64" | "amd64" => Self::X64,
            "arm64" | "aarch64" => Self::Arm64,
            "ia32" | "x86" | "i686" => Self::Ia32,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X64 => write!(f, "x64"),
            Self::Arm64 => write!(f, "arm64"),
            Self::Ia32 => write!(f, "ia32"),
            Self::Other(arch) => write!(f, "{arch}"),
        }
    }
}

/// Host platform: OS family plus CPU architecture.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Platform {
    /// Operating system family.
    pub os: OsFamily,
    /// CPU architecture.
    pub arch: Arch,
}

impl Platform {
    /// Create a new platform.
    #[must_use]
    pub fn new(os: OsFamily, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Get the current platform.
    #[must_use]
    pub fn current() -> Self {
        Self::new(OsFamily::current(), Arch::current())
    }

    /// Parse a compatibility key such as "darwin-arm64".
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let (os, arch) = s.trim().split_once('-')?;
        if os.is_empty() || arch.is_empty() || arch.contains('-') {
            return None;
        }
        Some(Self::new(OsFamily::parse(os), Arch::parse(arch)))
    }

    /// The `{os}-{arch}` key used for the compatibility gate.
    #[must_use]
    pub fn compatibility_key(&self) -> String {
        self.to_string()
    }

    /// Fail unless this host has a published prebuilt toolchain.
    pub fn check_compatibility(&self) -> Result<()> {
        let host = self.compatibility_key();
        if SUPPORTED_HOSTS.contains(&host.as_str()) {
            Ok(())
        } else {
            Err(Error::unsupported_host(host))
        }
    }

    /// Platform name used in cache keys and download URLs.
    pub fn download_name(&self) -> Result<&'static str> {
        self.os.download_name()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}
