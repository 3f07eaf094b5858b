//! Colored terminal reporting and download progress.
//!
//! Uses owo-colors for terminal colors and indicatif for progress bars.
//! Stdout belongs to the provisioned tool once it runs, so every message
//! here goes to stderr (indicatif draws to stderr by default).

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::time::Duration;

/// Print a detail line (dimmed)
/// Example: "     downloaded rulegen_1.4.2_linux_amd64.tar.gz (9413632 bytes)"
pub fn detail(message: &str) {
    eprintln!("     {}", message.dimmed());
}

/// Print an info message (cyan)
pub fn info(message: &str) {
    eprintln!("{} {}", "::".cyan(), message);
}

/// Print a warning message (yellow)
pub fn warning(message: &str) {
    eprintln!("{} {}", "warning:".yellow().bold(), message.yellow());
}

/// Print an error message (red)
pub fn error(message: &str) {
    eprintln!("{} {}", "error:".red().bold(), message.red());
}

/// Create a spinner for a download whose size is not yet known.
pub fn download_spinner(label: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("     {spinner:.cyan} {msg}")
            .unwrap()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb.set_message(format!("downloading {}", label));
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Upgrade a spinner to a byte-count bar once content-length is known.
pub fn upgrade_to_bytes(pb: &ProgressBar, total_bytes: u64) {
    pb.set_length(total_bytes);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("     {spinner:.cyan} [{bar:30.cyan/dim}] {bytes}/{total_bytes} ({eta})")
            .unwrap()
            .progress_chars("━╸━"),
    );
}
