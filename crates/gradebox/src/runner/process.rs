//! Subprocess spawning for toolchain commands
//!
//! Toolchain commands run with a cleared environment, their working directory
//! inside the sandbox, and stdout/stderr redirected to sandbox files so the
//! engine's memory use stays bounded no matter how much a process prints.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use tokio::process::Command;
use tracing::debug;

/// Specification of one bounded toolchain subprocess
pub(crate) struct SpawnSpec<'a> {
    /// Command and arguments, already placeholder-expanded
    pub command: Vec<String>,

    /// Working directory (inside the sandbox)
    pub cwd: &'a Path,

    /// Environment variables from the toolchain config
    pub env: &'a HashMap<String, String>,

    /// PATH for the subprocess
    pub path_var: &'a str,

    /// Host file receiving stdout
    pub stdout_file: PathBuf,

    /// Host file receiving stderr
    pub stderr_file: PathBuf,

    /// Wall clock bound
    pub timeout: std::time::Duration,
}

/// Result of a bounded subprocess run
#[derive(Debug, Clone, Copy)]
pub(crate) struct ProcessOutcome {
    /// Exit code if the process exited on its own
    pub exit_code: Option<i32>,

    /// Whether the process was killed at the wall clock bound
    pub timed_out: bool,

    pub duration_ms: u64,
}

impl ProcessOutcome {
    pub fn succeeded(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Resolve the program in a command to an absolute path using the host's PATH.
///
/// Subprocess environments are cleared and rebuilt from the toolchain config,
/// so lookup against the host's PATH has to happen before the spawn. Commands
/// that already contain a `/` are left unchanged.
pub(crate) fn resolve_command(command: &mut [String]) -> Result<()> {
    let first = match command.first_mut() {
        Some(first) => first,
        None => return Ok(()),
    };

    if first.contains('/') {
        return Ok(());
    }

    let path_var = std::env::var("PATH").unwrap_or_default();
    for dir in path_var.split(':') {
        let candidate = Path::new(dir).join(&*first);
        if candidate.exists() {
            // Canonicalize to resolve symlinks so the command stays reachable
            // regardless of how the toolchain was installed
            *first = std::fs::canonicalize(&candidate)
                .unwrap_or(candidate)
                .to_string_lossy()
                .into_owned();
            return Ok(());
        }
    }

    bail!("command '{first}' not found in PATH")
}

/// Run a toolchain command under a wall clock bound.
///
/// On expiry the child is killed and the call returns with `timed_out = true`;
/// output written to the redirect files up to that point is preserved. The
/// kill reaches the spawned process itself — children it detached into other
/// process groups may briefly outlive it, which is why the runner must never
/// be trusted beyond its sandbox.
pub(crate) async fn run_bounded(spec: SpawnSpec<'_>) -> Result<ProcessOutcome> {
    let mut command = spec.command;
    resolve_command(&mut command)?;

    let program = command
        .first()
        .context("empty command arguments")?
        .clone();

    let stdout = std::fs::File::create(&spec.stdout_file)
        .with_context(|| format!("failed to create {}", spec.stdout_file.display()))?;
    let stderr = std::fs::File::create(&spec.stderr_file)
        .with_context(|| format!("failed to create {}", spec.stderr_file.display()))?;

    debug!(?command, cwd = %spec.cwd.display(), "spawning toolchain command");

    let mut child = Command::new(&program)
        .args(&command[1..])
        .current_dir(spec.cwd)
        .env_clear()
        .env("PATH", spec.path_var)
        .envs(spec.env)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to spawn '{program}'"))?;

    let started = Instant::now();

    match tokio::time::timeout(spec.timeout, child.wait()).await {
        Ok(status) => {
            let status = status.context("failed to wait for toolchain command")?;
            let outcome = ProcessOutcome {
                exit_code: status.code(),
                timed_out: false,
                duration_ms: started.elapsed().as_millis() as u64,
            };
            debug!(exit_code = ?outcome.exit_code, duration_ms = outcome.duration_ms, "command finished");
            Ok(outcome)
        }
        Err(_) => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            let outcome = ProcessOutcome {
                exit_code: None,
                timed_out: true,
                duration_ms: started.elapsed().as_millis() as u64,
            };
            debug!(duration_ms = outcome.duration_ms, "command killed at wall clock bound");
            Ok(outcome)
        }
    }
}
