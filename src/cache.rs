//! Persistent record of which tool version is currently cached.
//!
//! The cache holds the extracted executable plus a sibling plain-text
//! marker file with the last successfully installed version. Persistence
//! sits behind the [`VersionStore`] trait so tests can substitute
//! in-memory state for the on-disk marker.

use crate::error::ProvisionError;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Key-value persistence for the installed-version record.
pub trait VersionStore {
    /// Last recorded version, or `None` when nothing was ever recorded.
    fn read(&self) -> Result<Option<String>, ProvisionError>;

    /// Overwrite the record with `version`.
    fn write(&self, version: &str) -> Result<(), ProvisionError>;
}

/// Plain-text marker file alongside the cached binary.
#[derive(Debug, Clone)]
pub struct MarkerFile {
    path: PathBuf,
}

impl MarkerFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VersionStore for MarkerFile {
    fn read(&self) -> Result<Option<String>, ProvisionError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content.trim().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ProvisionError::cache_io(&self.path, e)),
        }
    }

    fn write(&self, version: &str) -> Result<(), ProvisionError> {
        let dir = self.path.parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(dir) = dir {
            std::fs::create_dir_all(dir).map_err(|e| ProvisionError::cache_io(dir, e))?;
        }

        // Temp file + rename: a torn write must never leave a marker that
        // matches a version whose binary is absent.
        let mut tmp = tempfile::NamedTempFile::new_in(dir.unwrap_or_else(|| Path::new(".")))
            .map_err(|e| ProvisionError::cache_io(&self.path, e))?;
        tmp.write_all(version.as_bytes())
            .map_err(|e| ProvisionError::cache_io(&self.path, e))?;
        tmp.persist(&self.path)
            .map_err(|e| ProvisionError::cache_io(&self.path, e.error))?;
        Ok(())
    }
}

/// Per-user cache root for a tool, created if absent. Independent of
/// version: re-provisioning replaces files in place rather than growing
/// one directory per version.
pub fn cache_dir(tool_name: &str) -> Result<PathBuf, ProvisionError> {
    let root = dirs::cache_dir().ok_or_else(|| {
        ProvisionError::cache_io(
            Path::new("~"),
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no per-user cache directory on this system",
            ),
        )
    })?;

    let dir = root.join(tool_name);
    std::fs::create_dir_all(&dir).map_err(|e| ProvisionError::cache_io(&dir, e))?;
    Ok(dir)
}
