//! rulegen launcher binary.
//!
//! Makes sure the pinned rulegen release binary is present (downloading
//! and verifying it on first run), then executes it with this process's
//! own arguments and stdio, and exits with the tool's exit code.
//!
//! Arguments are pure pass-through: nothing is parsed here, so `--help`
//! and friends reach the real tool untouched.

use anyhow::{Context, Result};
use rulegen_launcher::{output, ProvisionConfig, Provisioner, ToolSpec};
use std::path::PathBuf;
use std::process::Command;

/// Exit code for provisioning/launch failures, distinct from the tool's
/// own exit codes.
const LAUNCHER_FAILURE_EXIT: i32 = 2;

const TOOL_NAME: &str = "rulegen";
const TOOL_REPO: &str = "rulegen-dev/rulegen";

/// The launcher version is the tool version: both are released in lockstep.
const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let tool = ToolSpec::new(TOOL_NAME, TOOL_REPO, TOOL_VERSION);
    let release_page = tool.release_page_url();

    let binary = match provision(tool) {
        Ok(path) => path,
        Err(err) => {
            output::error(&format!("{:#}", err));
            output::info(&format!(
                "you can download the binary manually from {}",
                release_page
            ));
            return LAUNCHER_FAILURE_EXIT;
        }
    };

    let args: Vec<std::ffi::OsString> = std::env::args_os().skip(1).collect();

    // Stdio is inherited, so the tool owns stdout/stderr from here on.
    match Command::new(&binary).args(&args).status() {
        Ok(status) => exit_code_of(status),
        Err(err) => {
            output::error(&format!("cannot run {}: {}", binary.display(), err));
            LAUNCHER_FAILURE_EXIT
        }
    }
}

fn provision(tool: ToolSpec) -> Result<PathBuf> {
    let config = ProvisionConfig::from_env(tool.clone())
        .context("resolving launcher configuration")?;
    Provisioner::new(config)
        .ensure_binary()
        .with_context(|| format!("provisioning {} v{}", tool.name, tool.version))
}

fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    // Terminated by signal (no exit code): follow the shell convention.
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    LAUNCHER_FAILURE_EXIT
}
