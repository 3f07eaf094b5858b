//! Failure taxonomy for binary provisioning.
//!
//! Each variant is a distinct failure class with its own remediation story:
//! an unsupported platform or a checksum mismatch is never retried, while a
//! download failure is only surfaced after the downloader has exhausted its
//! own retry budget.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The host OS/architecture has no release artifact.
    #[error("unsupported platform: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    /// All download attempts failed; `cause` is the last underlying error.
    #[error("download of {label} failed after {attempts} attempt(s): {cause}")]
    Download {
        label: String,
        attempts: u32,
        cause: String,
    },

    /// The archive's digest does not match the published manifest. Treated
    /// as a supply-chain integrity failure, never silently accepted.
    #[error("checksum verification failed for {filename}: {detail}")]
    ChecksumMismatch { filename: String, detail: String },

    /// The archive does not contain the expected executable, which points
    /// at a release packaging defect.
    #[error("cannot extract '{executable}' from {archive}: {detail}")]
    Extraction {
        archive: PathBuf,
        executable: String,
        detail: String,
    },

    /// Local filesystem failure around the cache or staging area.
    #[error("cache I/O failure at {path}: {source}")]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ProvisionError {
    pub(crate) fn cache_io(path: &Path, source: std::io::Error) -> Self {
        Self::CacheIo {
            path: path.to_path_buf(),
            source,
        }
    }
}
