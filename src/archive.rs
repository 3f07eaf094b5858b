//! Extraction of a single executable from release archives.
//!
//! Release archives are zip on windows and gzipped tar everywhere else.
//! Only one entry matters: the tool executable, which may sit under a
//! nested directory prefix inside the archive. The selected entry is
//! streamed to a temporary file and renamed over the destination, so an
//! interrupted extraction never leaves a half-written binary.

use crate::error::ProvisionError;
use crate::platform::{Os, PlatformTarget};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

/// Archive container formats used by releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
}

impl ArchiveKind {
    /// Format published for a platform: zip on windows, tar.gz otherwise.
    pub fn for_target(target: PlatformTarget) -> Self {
        match target.os {
            Os::Windows => Self::Zip,
            _ => Self::TarGz,
        }
    }

    /// Filename extension, without a leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::TarGz => "tar.gz",
        }
    }
}

/// Extract the first entry whose name ends with `executable_name` into
/// `dest`.
///
/// No matching entry means the release packaging does not line up with
/// what this launcher expects, which fails rather than being silently
/// tolerated.
pub fn extract_executable(
    archive: &Path,
    kind: ArchiveKind,
    executable_name: &str,
    dest: &Path,
) -> Result<(), ProvisionError> {
    let err = |detail: String| ProvisionError::Extraction {
        archive: archive.to_path_buf(),
        executable: executable_name.to_string(),
        detail,
    };

    let dest_dir = dest.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = dest_dir {
        std::fs::create_dir_all(dir).map_err(|e| ProvisionError::cache_io(dir, e))?;
    }

    let mut tmp = tempfile::NamedTempFile::new_in(dest_dir.unwrap_or_else(|| Path::new(".")))
        .map_err(|e| ProvisionError::cache_io(dest, e))?;

    let found = match kind {
        ArchiveKind::Zip => copy_zip_entry(archive, executable_name, tmp.as_file_mut())
            .map_err(&err)?,
        ArchiveKind::TarGz => copy_tar_entry(archive, executable_name, tmp.as_file_mut())
            .map_err(&err)?,
    };

    if !found {
        return Err(err("no matching entry".to_string()));
    }

    tmp.persist(dest)
        .map_err(|e| ProvisionError::cache_io(dest, e.error))?;
    Ok(())
}

fn copy_zip_entry(archive: &Path, name: &str, out: &mut File) -> Result<bool, String> {
    let file = File::open(archive).map_err(|e| format!("cannot open archive: {}", e))?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| format!("zip read error: {}", e))?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|e| format!("zip entry error: {}", e))?;
        if !entry.is_file() {
            continue;
        }
        if entry.name().ends_with(name) {
            io::copy(&mut entry, out).map_err(|e| format!("write error: {}", e))?;
            return Ok(true);
        }
    }

    Ok(false)
}

fn copy_tar_entry(archive: &Path, name: &str, out: &mut File) -> Result<bool, String> {
    let file = File::open(archive).map_err(|e| format!("cannot open archive: {}", e))?;
    let decoder = GzDecoder::new(BufReader::new(file));
    let mut tar = tar::Archive::new(decoder);

    for entry in tar.entries().map_err(|e| format!("tar read error: {}", e))? {
        let mut entry = entry.map_err(|e| format!("tar entry error: {}", e))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .map(|p| p.to_string_lossy().ends_with(name))
            .unwrap_or(false);
        if matches {
            io::copy(&mut entry, out).map_err(|e| format!("write error: {}", e))?;
            return Ok(true);
        }
    }

    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Arch;
    use std::io::Write;

    fn write_tar_gz(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);

        for (name, content) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append_data(&mut header, name, *content).unwrap();
        }

        let encoder = builder.into_inner().unwrap();
        encoder.finish().unwrap();
    }

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();

        for (name, content) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_kind_for_target() {
        let windows = PlatformTarget {
            os: Os::Windows,
            arch: Arch::Amd64,
        };
        let linux = PlatformTarget {
            os: Os::Linux,
            arch: Arch::Arm64,
        };
        let darwin = PlatformTarget {
            os: Os::Darwin,
            arch: Arch::Amd64,
        };

        assert_eq!(ArchiveKind::for_target(windows), ArchiveKind::Zip);
        assert_eq!(ArchiveKind::for_target(linux), ArchiveKind::TarGz);
        assert_eq!(ArchiveKind::for_target(darwin), ArchiveKind::TarGz);
    }

    #[test]
    fn test_extract_from_tar_gz() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("pkg.tar.gz");
        let dest = temp.path().join("out/rulegen");

        write_tar_gz(&archive, &[("rulegen", b"#!/bin/sh\necho tool\n")]);

        extract_executable(&archive, ArchiveKind::TarGz, "rulegen", &dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"#!/bin/sh\necho tool\n");
    }

    #[test]
    fn test_extract_tar_entry_under_nested_prefix() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("pkg.tar.gz");
        let dest = temp.path().join("rulegen");

        write_tar_gz(
            &archive,
            &[
                ("pkg_1.0.0/README.md", b"docs"),
                ("pkg_1.0.0/bin/rulegen", b"binary-bytes"),
            ],
        );

        extract_executable(&archive, ArchiveKind::TarGz, "rulegen", &dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"binary-bytes");
    }

    #[test]
    fn test_extract_from_zip() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("pkg.zip");
        let dest = temp.path().join("rulegen.exe");

        write_zip(
            &archive,
            &[("dist/rulegen.exe", b"MZ fake exe"), ("LICENSE", b"mit")],
        );

        extract_executable(&archive, ArchiveKind::Zip, "rulegen.exe", &dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"MZ fake exe");
    }

    #[test]
    fn test_no_matching_entry_fails() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("pkg.tar.gz");
        let dest = temp.path().join("rulegen");

        write_tar_gz(&archive, &[("something-else", b"not the tool")]);

        let err = extract_executable(&archive, ArchiveKind::TarGz, "rulegen", &dest).unwrap_err();
        match &err {
            ProvisionError::Extraction { detail, .. } => {
                assert_eq!(detail, "no matching entry");
            }
            other => panic!("expected Extraction error, got {other}"),
        }
        assert!(!dest.exists());
    }

    #[test]
    fn test_no_matching_entry_in_zip_fails() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("pkg.zip");
        let dest = temp.path().join("rulegen.exe");

        write_zip(&archive, &[("README.md", b"docs only")]);

        let err = extract_executable(&archive, ArchiveKind::Zip, "rulegen.exe", &dest).unwrap_err();
        assert!(matches!(err, ProvisionError::Extraction { .. }));
    }

    #[test]
    fn test_corrupt_archive_reports_detail() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("pkg.tar.gz");
        let dest = temp.path().join("rulegen");

        std::fs::write(&archive, b"this is not a gzip stream").unwrap();

        let err = extract_executable(&archive, ArchiveKind::TarGz, "rulegen", &dest).unwrap_err();
        assert!(matches!(err, ProvisionError::Extraction { .. }));
    }

    #[test]
    fn test_extract_replaces_existing_destination() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("pkg.tar.gz");
        let dest = temp.path().join("rulegen");

        std::fs::write(&dest, b"old version").unwrap();
        write_tar_gz(&archive, &[("rulegen", b"new version")]);

        extract_executable(&archive, ArchiveKind::TarGz, "rulegen", &dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"new version");
    }
}
