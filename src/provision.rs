//! Idempotent end-to-end binary provisioning.
//!
//! `ensure_binary()` is the single entry point the launcher calls before
//! every invocation. The flow is strictly sequential: resolve platform,
//! check cache, and on a miss download the checksums manifest and archive,
//! verify, extract, and record the version — in that order. The version
//! marker is written only after the binary is fully in place, so two
//! processes racing on a cold cache can at worst re-do work (later writer
//! wins); neither can mark a partial install as current.

use crate::archive::{self, ArchiveKind};
use crate::cache::{self, MarkerFile, VersionStore};
use crate::checksum;
use crate::download::{self, RetryPolicy};
use crate::error::ProvisionError;
use crate::output;
use crate::platform::PlatformTarget;
use crate::release::ToolSpec;
use std::path::{Path, PathBuf};

/// When set, the launcher prefers a locally built binary sitting next to
/// the launcher executable over the cache/download path.
pub const DEV_MODE_ENV: &str = "RULEGEN_DEV";

/// Filename of the version marker inside the cache directory.
const VERSION_MARKER: &str = "version";

/// Everything the provisioner needs, resolved once at startup. The
/// dev-mode override is read from the environment here rather than ad hoc
/// mid-flow.
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    pub tool: ToolSpec,
    pub cache_dir: PathBuf,
    /// Locally built binary to use instead of provisioning, when present.
    pub dev_binary: Option<PathBuf>,
    pub retry: RetryPolicy,
}

impl ProvisionConfig {
    /// Resolve launcher configuration from the host environment.
    pub fn from_env(tool: ToolSpec) -> Result<Self, ProvisionError> {
        let cache_dir = cache::cache_dir(&tool.name)?;
        let dev_binary = if std::env::var_os(DEV_MODE_ENV).is_some() {
            dev_binary_candidate(&tool)
        } else {
            None
        };

        Ok(Self {
            tool,
            cache_dir,
            dev_binary,
            retry: RetryPolicy::default(),
        })
    }
}

/// A binary named like the tool, adjacent to the launcher's own
/// executable. Best-effort: any lookup failure just disables the override.
fn dev_binary_candidate(tool: &ToolSpec) -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let name = if cfg!(windows) {
        format!("{}.exe", tool.name)
    } else {
        tool.name.clone()
    };
    let candidate = exe.parent()?.join(name);
    candidate.is_file().then_some(candidate)
}

/// Orchestrates platform resolution, cache checks, download, verification,
/// and extraction behind one idempotent operation.
pub struct Provisioner<S: VersionStore = MarkerFile> {
    config: ProvisionConfig,
    store: S,
}

impl Provisioner<MarkerFile> {
    /// Provisioner backed by the on-disk marker file in the cache directory.
    pub fn new(config: ProvisionConfig) -> Self {
        let store = MarkerFile::new(config.cache_dir.join(VERSION_MARKER));
        Self { config, store }
    }
}

impl<S: VersionStore> Provisioner<S> {
    /// Provisioner with an injected version store.
    pub fn with_store(config: ProvisionConfig, store: S) -> Self {
        Self { config, store }
    }

    /// Ensure a valid, current tool binary is present and return its path.
    ///
    /// When the cache already holds the pinned version this performs zero
    /// network I/O and returns the same path every time.
    pub fn ensure_binary(&self) -> Result<PathBuf, ProvisionError> {
        self.ensure_binary_for(PlatformTarget::resolve()?)
    }

    /// Like [`ensure_binary`](Self::ensure_binary) with an explicit target
    /// (the host target in production; fixed targets in tests).
    pub fn ensure_binary_for(&self, target: PlatformTarget) -> Result<PathBuf, ProvisionError> {
        if let Some(dev) = &self.config.dev_binary {
            output::detail(&format!("using development binary {}", dev.display()));
            return Ok(dev.clone());
        }

        let binary_path = self
            .config
            .cache_dir
            .join(self.config.tool.binary_filename(target.os));

        if self.cache_is_valid(&binary_path)? {
            return Ok(binary_path);
        }

        self.provision(target, &binary_path)?;
        Ok(binary_path)
    }

    /// A cached binary is reusable when it exists, is non-empty, carries
    /// execute permission (where applicable), and the marker matches the
    /// pinned version exactly.
    fn cache_is_valid(&self, binary_path: &Path) -> Result<bool, ProvisionError> {
        let Ok(meta) = std::fs::metadata(binary_path) else {
            return Ok(false);
        };
        if !meta.is_file() || meta.len() == 0 {
            return Ok(false);
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if meta.permissions().mode() & 0o111 == 0 {
                return Ok(false);
            }
        }

        Ok(self.store.read()?.as_deref() == Some(self.config.tool.version.as_str()))
    }

    fn provision(&self, target: PlatformTarget, binary_path: &Path) -> Result<(), ProvisionError> {
        let tool = &self.config.tool;
        output::info(&format!(
            "provisioning {} v{} for {}",
            tool.name, tool.version, target
        ));

        std::fs::create_dir_all(&self.config.cache_dir)
            .map_err(|e| ProvisionError::cache_io(&self.config.cache_dir, e))?;

        // Staging directory on the same filesystem as the cache; removed
        // together with the archive on every exit path.
        let staging = tempfile::tempdir_in(&self.config.cache_dir)
            .map_err(|e| ProvisionError::cache_io(&self.config.cache_dir, e))?;

        // The manifest is a small text payload, fetched through the same
        // retrying downloader as the archive itself.
        let manifest_path = staging.path().join("checksums.txt");
        download::fetch_with_retry(
            &tool.checksums_url(),
            &manifest_path,
            "checksums manifest",
            self.config.retry,
        )?;
        let manifest = std::fs::read_to_string(&manifest_path)
            .map_err(|e| ProvisionError::cache_io(&manifest_path, e))?;

        let archive_name = tool.archive_name(target);
        let archive_path = staging.path().join(&archive_name);
        download::fetch_with_retry(
            &tool.binary_url(target),
            &archive_path,
            &archive_name,
            self.config.retry,
        )?;

        let actual = checksum::digest_of(&archive_path)?;
        match checksum::expected_digest(&manifest, &archive_name) {
            Some(expected) if expected == actual => {}
            Some(expected) => {
                return Err(ProvisionError::ChecksumMismatch {
                    filename: archive_name,
                    detail: format!("expected {expected}, got {actual}"),
                });
            }
            None => {
                return Err(ProvisionError::ChecksumMismatch {
                    filename: archive_name,
                    detail: "no entry in checksums manifest".to_string(),
                });
            }
        }

        archive::extract_executable(
            &archive_path,
            ArchiveKind::for_target(target),
            &tool.binary_filename(target.os),
            binary_path,
        )?;
        set_executable(binary_path)?;

        // Marker last: nothing may ever look current before the binary is
        // fully in place.
        self.store.write(&tool.version)?;

        output::info(&format!(
            "{} v{} installed to {}",
            tool.name,
            tool.version,
            binary_path.display()
        ));
        Ok(())
    }
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<(), ProvisionError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .map_err(|e| ProvisionError::cache_io(path, e))
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<(), ProvisionError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Arch, Os};
    use std::cell::RefCell;
    use std::time::Duration;

    const LINUX_AMD64: PlatformTarget = PlatformTarget {
        os: Os::Linux,
        arch: Arch::Amd64,
    };

    /// In-memory substitute for the on-disk marker.
    struct MemoryStore(RefCell<Option<String>>);

    impl MemoryStore {
        fn holding(version: &str) -> Self {
            Self(RefCell::new(Some(version.to_string())))
        }
    }

    impl VersionStore for MemoryStore {
        fn read(&self) -> Result<Option<String>, ProvisionError> {
            Ok(self.0.borrow().clone())
        }

        fn write(&self, version: &str) -> Result<(), ProvisionError> {
            *self.0.borrow_mut() = Some(version.to_string());
            Ok(())
        }
    }

    fn config_in(dir: &Path) -> ProvisionConfig {
        ProvisionConfig {
            // Unreachable base URL: any network attempt fails immediately.
            tool: ToolSpec::new("rulegen", "rulegen-dev/rulegen", "1.0.0")
                .with_base_url("http://127.0.0.1:1"),
            cache_dir: dir.to_path_buf(),
            dev_binary: None,
            retry: RetryPolicy {
                max_attempts: 1,
                initial_delay: Duration::from_millis(1),
                delay_cap: Duration::from_millis(1),
            },
        }
    }

    fn seed_cached_binary(dir: &Path) -> PathBuf {
        let path = dir.join("rulegen");
        std::fs::write(&path, b"#!/bin/sh\nexit 0\n").unwrap();
        set_executable(&path).unwrap();
        path
    }

    #[test]
    fn test_valid_cache_hit_needs_no_network() {
        let temp = tempfile::tempdir().unwrap();
        let expected = seed_cached_binary(temp.path());

        let provisioner =
            Provisioner::with_store(config_in(temp.path()), MemoryStore::holding("1.0.0"));

        // Base URL is unreachable, so success proves no network was touched.
        let path = provisioner.ensure_binary_for(LINUX_AMD64).unwrap();
        assert_eq!(path, expected);
    }

    #[test]
    fn test_stale_marker_version_forces_reprovision() {
        let temp = tempfile::tempdir().unwrap();
        seed_cached_binary(temp.path());

        let provisioner =
            Provisioner::with_store(config_in(temp.path()), MemoryStore::holding("0.9.0"));

        let err = provisioner.ensure_binary_for(LINUX_AMD64).unwrap_err();
        assert!(matches!(err, ProvisionError::Download { .. }));
    }

    #[test]
    fn test_missing_binary_forces_reprovision_despite_marker() {
        let temp = tempfile::tempdir().unwrap();

        let provisioner =
            Provisioner::with_store(config_in(temp.path()), MemoryStore::holding("1.0.0"));

        let err = provisioner.ensure_binary_for(LINUX_AMD64).unwrap_err();
        assert!(matches!(err, ProvisionError::Download { .. }));
    }

    #[test]
    fn test_empty_binary_is_not_a_cache_hit() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("rulegen");
        std::fs::write(&path, b"").unwrap();
        set_executable(&path).unwrap();

        let provisioner =
            Provisioner::with_store(config_in(temp.path()), MemoryStore::holding("1.0.0"));

        let err = provisioner.ensure_binary_for(LINUX_AMD64).unwrap_err();
        assert!(matches!(err, ProvisionError::Download { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_executable_binary_is_not_a_cache_hit() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("rulegen");
        std::fs::write(&path, b"#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let provisioner =
            Provisioner::with_store(config_in(temp.path()), MemoryStore::holding("1.0.0"));

        let err = provisioner.ensure_binary_for(LINUX_AMD64).unwrap_err();
        assert!(matches!(err, ProvisionError::Download { .. }));
    }

    #[test]
    fn test_dev_binary_short_circuits_everything() {
        let temp = tempfile::tempdir().unwrap();
        let dev = temp.path().join("local-rulegen");
        std::fs::write(&dev, b"local build").unwrap();

        let mut config = config_in(temp.path());
        config.dev_binary = Some(dev.clone());

        let provisioner = Provisioner::with_store(config, MemoryStore(RefCell::new(None)));
        let path = provisioner.ensure_binary_for(LINUX_AMD64).unwrap();
        assert_eq!(path, dev);
    }

    #[test]
    fn test_repeated_cache_hits_return_same_path() {
        let temp = tempfile::tempdir().unwrap();
        seed_cached_binary(temp.path());

        let provisioner =
            Provisioner::with_store(config_in(temp.path()), MemoryStore::holding("1.0.0"));

        let first = provisioner.ensure_binary_for(LINUX_AMD64).unwrap();
        let second = provisioner.ensure_binary_for(LINUX_AMD64).unwrap();
        assert_eq!(first, second);
    }
}
