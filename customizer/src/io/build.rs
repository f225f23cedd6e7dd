//! Build adapter for the project's package manager.
//!
//! The [`BuildRunner`] trait decouples the pipeline from real subprocesses.
//! Tests use scripted runners that return predetermined outcomes.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::core::types::BuildStep;
use crate::io::process::run_command_with_timeout;

/// Bytes of stdout/stderr kept for the failure log.
pub const OUTPUT_TAIL_BYTES: usize = 3000;

#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub workdir: PathBuf,
    /// Package manager executable, e.g. `pnpm`.
    pub program: String,
    pub step: BuildStep,
    pub timeout: Duration,
}

impl BuildRequest {
    /// Command line as shown in the run log.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.as_str()];
        parts.extend(self.step.args());
        parts.join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Success,
    Failed {
        exit_code: Option<i32>,
        timed_out: bool,
        stdout_tail: String,
        stderr_tail: String,
    },
}

pub trait BuildRunner {
    fn run(&self, request: &BuildRequest) -> Result<BuildOutcome>;
}

/// Runs build steps through the configured package manager.
pub struct PackageManagerRunner;

impl BuildRunner for PackageManagerRunner {
    #[instrument(skip_all, fields(step = ?request.step, timeout_secs = request.timeout.as_secs()))]
    fn run(&self, request: &BuildRequest) -> Result<BuildOutcome> {
        info!(command = %request.display(), workdir = %request.workdir.display(), "running build step");
        let output = run_command_with_timeout(
            package_manager_command(request),
            request.timeout,
            OUTPUT_TAIL_BYTES,
        )
        .with_context(|| format!("run {}", request.display()))?;

        if output.status.success() && !output.timed_out {
            return Ok(BuildOutcome::Success);
        }
        warn!(
            exit_code = ?output.status.code(),
            timed_out = output.timed_out,
            stdout_dropped = output.stdout_dropped,
            stderr_dropped = output.stderr_dropped,
            "build step failed"
        );
        Ok(BuildOutcome::Failed {
            exit_code: output.status.code(),
            timed_out: output.timed_out,
            stdout_tail: output.stdout_tail(),
            stderr_tail: output.stderr_tail(),
        })
    }
}

/// Package managers ship as `.cmd` shims on Windows, which only `cmd` resolves.
fn package_manager_command(request: &BuildRequest) -> Command {
    let mut cmd = if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(&request.program);
        cmd
    } else {
        Command::new(&request.program)
    };
    cmd.args(request.step.args()).current_dir(&request.workdir);
    cmd
}
