//! Self-provisioning launcher for the rulegen CLI.
//!
//! The published launcher is a thin shim: on startup it makes sure the real
//! `rulegen` release binary for the running platform is present in the
//! per-user cache, then executes it with the launcher's own arguments and
//! propagates its exit code.
//!
//! Provisioning is idempotent and verified end to end:
//!
//! 1. Resolve the host platform to a release (os, arch) pair.
//! 2. Check the cache: a matching version marker plus an executable,
//!    non-empty binary means no network I/O at all.
//! 3. Otherwise download the checksums manifest and the platform archive
//!    (bounded retries with exponential backoff), verify the archive's
//!    SHA-256 against the manifest, extract the executable, and only then
//!    record the installed version.
//!
//! A corrupted or tampered archive is never installed: checksum
//! verification happens before anything touches the cache path, and the
//! version marker is written last so a torn install can never look current.

pub mod archive;
pub mod cache;
pub mod checksum;
pub mod download;
pub mod error;
pub mod output;
pub mod platform;
pub mod provision;
pub mod release;

pub use error::ProvisionError;
pub use platform::{Arch, Os, PlatformTarget};
pub use provision::{ProvisionConfig, Provisioner};
pub use release::ToolSpec;
