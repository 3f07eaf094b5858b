//! Host platform resolution for release artifact naming.
//!
//! Release archives are published per (os, arch) pair using Go-style names
//! (`linux`/`amd64` rather than `linux`/`x86_64`), so the host platform is
//! mapped once at startup and carried through artifact naming.

use crate::error::ProvisionError;
use std::fmt;

/// Operating systems with published release artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Darwin,
    Linux,
    Windows,
}

impl Os {
    /// Name used in release archive filenames.
    pub fn artifact_name(self) -> &'static str {
        match self {
            Self::Darwin => "darwin",
            Self::Linux => "linux",
            Self::Windows => "windows",
        }
    }
}

/// Architectures with published release artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    Amd64,
    Arm64,
    X86,
}

impl Arch {
    /// Name used in release archive filenames.
    pub fn artifact_name(self) -> &'static str {
        match self {
            Self::Amd64 => "amd64",
            Self::Arm64 => "arm64",
            Self::X86 => "386",
        }
    }
}

/// A resolved (os, arch) pair. Constructed once per process and immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformTarget {
    pub os: Os,
    pub arch: Arch,
}

impl PlatformTarget {
    /// Resolve the running host to a release target.
    ///
    /// Fails with [`ProvisionError::UnsupportedPlatform`] when the host has
    /// no mapping, or for the windows/arm64 pair, which has no published
    /// artifact.
    pub fn resolve() -> Result<Self, ProvisionError> {
        Self::resolve_from(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Internal: resolve from explicit strings (for testing).
    pub(crate) fn resolve_from(os: &str, arch: &str) -> Result<Self, ProvisionError> {
        let unsupported = || ProvisionError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        };

        let mapped_os = match os {
            "macos" | "darwin" => Os::Darwin,
            "linux" => Os::Linux,
            "windows" => Os::Windows,
            _ => return Err(unsupported()),
        };

        let mapped_arch = match arch {
            "x86_64" | "amd64" => Arch::Amd64,
            "aarch64" | "arm64" => Arch::Arm64,
            "x86" | "i386" | "i686" => Arch::X86,
            _ => return Err(unsupported()),
        };

        // No windows/arm64 artifact is published.
        if mapped_os == Os::Windows && mapped_arch == Arch::Arm64 {
            return Err(unsupported());
        }

        Ok(Self {
            os: mapped_os,
            arch: mapped_arch,
        })
    }
}

impl fmt::Display for PlatformTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            self.os.artifact_name(),
            self.arch.artifact_name()
        )
    }
}
