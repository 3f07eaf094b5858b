//! Bounded-retry downloads with exponential backoff.
//!
//! One logical download is up to `max_attempts` sequential HTTP attempts.
//! Each attempt streams into a unique temporary file next to the
//! destination and only renames it into place once the payload is known to
//! be non-empty, so a failed or interrupted attempt never leaves a partial
//! file behind.

use crate::error::ProvisionError;
use crate::output;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

/// Fixed per-request network timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("rulegen-launcher/", env!("CARGO_PKG_VERSION"));

/// Retry schedule: `max_attempts` tries with a doubling inter-attempt
/// delay, capped at `delay_cap`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub delay_cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(5),
            delay_cap: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay slept before the n-th retry (1-based; the first retry waits
    /// `initial_delay`, each later one doubles, capped at `delay_cap`).
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        let doublings = retry.saturating_sub(1).min(16);
        self.initial_delay
            .saturating_mul(1u32 << doublings)
            .min(self.delay_cap)
    }
}

/// Fetch `url` into `dest` with bounded retries. Returns the payload size.
///
/// An attempt fails on network errors, non-200 statuses, and zero-byte
/// payloads. After the final failed attempt a single aggregated
/// [`ProvisionError::Download`] names the last underlying cause.
pub fn fetch_with_retry(
    url: &str,
    dest: &Path,
    label: &str,
    policy: RetryPolicy,
) -> Result<u64, ProvisionError> {
    let mut last_cause = String::from("no attempts were made");

    for attempt in 1..=policy.max_attempts {
        if attempt > 1 {
            let delay = policy.delay_before_retry(attempt - 1);
            output::detail(&format!(
                "retry attempt {}/{} after {}s wait",
                attempt,
                policy.max_attempts,
                delay.as_secs()
            ));
            std::thread::sleep(delay);
        }

        match fetch_once(url, dest, label) {
            Ok(bytes) => {
                output::detail(&format!("downloaded {} ({} bytes)", label, bytes));
                return Ok(bytes);
            }
            Err(cause) => {
                output::warning(&format!(
                    "attempt {}/{} for {} failed: {}",
                    attempt, policy.max_attempts, label, cause
                ));
                last_cause = cause;
            }
        }
    }

    Err(ProvisionError::Download {
        label: label.to_string(),
        attempts: policy.max_attempts,
        cause: last_cause,
    })
}

/// One download attempt: stream into a temp file, validate, move into place.
fn fetch_once(url: &str, dest: &Path, label: &str) -> Result<u64, String> {
    let response = ureq::get(url)
        .timeout(REQUEST_TIMEOUT)
        .set("User-Agent", USER_AGENT)
        .call()
        .map_err(|e| match e {
            ureq::Error::Status(code, _) => format!("HTTP {}", code),
            other => other.to_string(),
        })?;

    let dir = dest.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = dir {
        std::fs::create_dir_all(dir)
            .map_err(|e| format!("cannot create directory {}: {}", dir.display(), e))?;
    }

    // Temp file in the destination directory keeps the final rename on one
    // filesystem; it is removed automatically on any failure path.
    let mut tmp = tempfile::NamedTempFile::new_in(dir.unwrap_or_else(|| Path::new(".")))
        .map_err(|e| format!("cannot create temporary file: {}", e))?;

    let pb = output::download_spinner(label);
    if let Some(len) = response
        .header("content-length")
        .and_then(|s| s.parse().ok())
    {
        output::upgrade_to_bytes(&pb, len);
    }

    let mut reader = response.into_reader();
    let mut buffer = [0u8; 8192];
    let mut total_bytes = 0u64;

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(n) => n,
            Err(e) => {
                pb.finish_and_clear();
                return Err(format!("read error: {}", e));
            }
        };
        if n == 0 {
            break;
        }
        if let Err(e) = tmp.write_all(&buffer[..n]) {
            pb.finish_and_clear();
            return Err(format!("write error: {}", e));
        }
        total_bytes += n as u64;
        pb.set_position(total_bytes);
    }
    pb.finish_and_clear();

    if total_bytes == 0 {
        return Err("downloaded file is empty".to_string());
    }

    tmp.persist(dest)
        .map_err(|e| format!("cannot move download into place: {}", e))?;

    Ok(total_bytes)
}
