//! Release artifact locations for a pinned tool version.
//!
//! Everything here is pure string composition over a fixed release
//! repository layout:
//!
//! - archive: `<name>_<version>_<os>_<arch>.<tar.gz|zip>`
//! - binary URL: `<base>/<repo>/releases/download/v<version>/<archive>`
//! - manifest URL: `<base>/<repo>/releases/download/v<version>/checksums.txt`

use crate::archive::ArchiveKind;
use crate::platform::{Os, PlatformTarget};

/// Default release host.
pub const DEFAULT_BASE_URL: &str = "https://github.com";

/// Identity of the tool being provisioned: which repository publishes it
/// and which version this launcher is pinned to.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    /// Binary name as it appears inside release archives.
    pub name: String,
    /// Release repository in `owner/name` form.
    pub repo: String,
    /// Pinned release version, without the `v` tag prefix.
    pub version: String,
    /// Release host, overridable for tests.
    pub base_url: String,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, repo: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            repo: repo.into(),
            version: version.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point at a different release host (used by tests to hit a mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Archive filename for a platform, e.g. `rulegen_1.4.2_linux_amd64.tar.gz`.
    pub fn archive_name(&self, target: PlatformTarget) -> String {
        format!(
            "{}_{}_{}_{}.{}",
            self.name,
            self.version,
            target.os.artifact_name(),
            target.arch.artifact_name(),
            ArchiveKind::for_target(target).extension()
        )
    }

    /// Download URL for the platform archive.
    pub fn binary_url(&self, target: PlatformTarget) -> String {
        format!(
            "{}/{}/releases/download/v{}/{}",
            self.base_url,
            self.repo,
            self.version,
            self.archive_name(target)
        )
    }

    /// Download URL for the checksums manifest (platform-independent).
    pub fn checksums_url(&self) -> String {
        format!(
            "{}/{}/releases/download/v{}/checksums.txt",
            self.base_url, self.repo, self.version
        )
    }

    /// Human-facing release page, printed as the manual-download fallback
    /// when provisioning fails.
    pub fn release_page_url(&self) -> String {
        format!("{}/{}/releases/tag/v{}", self.base_url, self.repo, self.version)
    }

    /// Executable filename for a platform (`.exe` suffix on windows).
    pub fn binary_filename(&self, os: Os) -> String {
        match os {
            Os::Windows => format!("{}.exe", self.name),
            _ => self.name.clone(),
        }
    }
}
