//! SHA-256 digests and checksums-manifest lookup.
//!
//! Releases publish a `checksums.txt` with one record per line,
//! `<64-hex digest><whitespace><archive filename>`. The archive digest is
//! computed locally and compared against the manifest entry before any
//! extraction happens.

use crate::error::ProvisionError;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Chunk size for streaming files through the hasher.
const CHUNK_SIZE: usize = 64 * 1024;

/// Compute the SHA-256 digest of a file as lowercase hex.
///
/// Streams the file in fixed-size chunks; the file is never loaded into
/// memory at once.
pub fn digest_of(path: &Path) -> Result<String, ProvisionError> {
    let mut file = std::fs::File::open(path).map_err(|e| ProvisionError::cache_io(path, e))?;

    let mut hasher = Sha256::new();
    let mut buffer = [0u8; CHUNK_SIZE];

    loop {
        let n = file
            .read(&mut buffer)
            .map_err(|e| ProvisionError::cache_io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Look up the digest recorded for `filename` in a checksums manifest.
///
/// Tolerates blank lines, surrounding whitespace, and arbitrary whitespace
/// between digest and filename. An absent filename is not an error; it
/// returns `None`.
pub fn expected_digest(manifest: &str, filename: &str) -> Option<String> {
    for line in manifest.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((digest, name)) = line.split_once(char::is_whitespace) else {
            continue;
        };
        if name.trim() == filename {
            return Some(digest.to_ascii_lowercase());
        }
    }
    None
}
