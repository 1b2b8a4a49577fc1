//! Compilation step
//!
//! Stages the submitted source into the sandbox and drives the configured
//! compiler command against it, collecting structured diagnostics. Every
//! toolchain fault is folded into a failed `CompilationOutcome`; this module
//! never lets one escape as an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::config::{Config, Toolchain};
use crate::report::CompilationOutcome;
use crate::runner::cap_log;
use crate::runner::diagnostics::parse_diagnostics;
use crate::runner::process::{SpawnSpec, run_bounded};
use crate::sandbox::{Sandbox, check_size, confine};
use crate::types::{Diagnostic, EvalLimits, SubmissionUnit};

/// Sandbox directory receiving compiled submission output
pub(crate) const CLASSES_DIR: &str = "classes";

/// Sandbox directory the submission source is staged under
const SOURCE_DIR: &str = "src";

const COMPILE_STDOUT: &str = "compile_stdout.txt";
const COMPILE_STDERR: &str = "compile_stderr.txt";

/// Compile a staged submission inside the sandbox.
///
/// `source_rel` is the sanitized relative path for the submission's declared
/// file name. The returned outcome carries every diagnostic in emission
/// order; `artifact` is set when the compiled artifact was located under the
/// output directory.
#[instrument(skip_all, fields(file = %submission.file_name))]
pub(crate) async fn compile(
    sandbox: &Sandbox,
    config: &Config,
    submission: &SubmissionUnit,
    source_rel: &Path,
    limits: &EvalLimits,
) -> CompilationOutcome {
    match try_compile(sandbox, config, submission, source_rel, limits).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(error = %e, "compilation step faulted");
            CompilationOutcome::fault(format!("{e:#}"))
        }
    }
}

async fn try_compile(
    sandbox: &Sandbox,
    config: &Config,
    submission: &SubmissionUnit,
    source_rel: &Path,
    limits: &EvalLimits,
) -> anyhow::Result<CompilationOutcome> {
    let max_bytes = limits.max_file_size_bytes.unwrap_or(EvalLimits::MIB);
    check_size(submission.content.len() as u64, max_bytes)?;

    // The sanitizer already approved this name; re-check confinement before
    // handing the path to the toolchain
    let staged_rel = Path::new(SOURCE_DIR).join(source_rel);
    confine(sandbox.path(), &staged_rel)?;

    let source_path = sandbox.write_file(&staged_rel, &submission.content).await?;
    let out_dir = sandbox.create_dir(CLASSES_DIR).await?;

    debug!(source = %source_path.display(), "staged submission source");

    let toolchain = &config.toolchain;
    let classpath = Toolchain::join_classpath(&toolchain.runtime_classpath);
    let command = Toolchain::expand_command(
        &toolchain.compile.command,
        &[
            ("{source}", &source_path.to_string_lossy()),
            ("{out_dir}", &out_dir.to_string_lossy()),
            ("{classpath}", &classpath),
        ],
    );

    let timeout = Duration::from_millis(limits.compile_timeout_millis.unwrap_or(60_000));
    let outcome = run_bounded(SpawnSpec {
        command,
        cwd: sandbox.path(),
        env: &toolchain.compile.env,
        path_var: &toolchain.path,
        stdout_file: sandbox.file_path(COMPILE_STDOUT)?,
        stderr_file: sandbox.file_path(COMPILE_STDERR)?,
        timeout,
    })
    .await?;

    if outcome.timed_out {
        return Ok(CompilationOutcome::fault(format!(
            "compiler did not finish within {} ms",
            timeout.as_millis()
        )));
    }

    // Combine stdout and stderr for compiler output; javac-family compilers
    // put diagnostics on stderr
    let stdout = sandbox.read_log(COMPILE_STDOUT).await?;
    let stderr = sandbox.read_log(COMPILE_STDERR).await?;
    let mut output = stdout;
    if !output.is_empty() && !stderr.is_empty() {
        output.push('\n');
    }
    output.push_str(&stderr);

    let mut diagnostics = parse_diagnostics(&output);
    let exit_ok = outcome.exit_code == Some(0);
    let has_errors = diagnostics.iter().any(Diagnostic::is_error);

    // An error diagnostic implies failure even on a zero exit; a non-zero
    // exit without parseable diagnostics still needs one error attached
    if !exit_ok && !has_errors {
        let status = outcome
            .exit_code
            .map_or_else(|| "signal".to_owned(), |c| c.to_string());
        diagnostics.push(Diagnostic::toolchain(format!(
            "compiler exited with status {status}"
        )));
    }
    let success = exit_ok && !has_errors;

    let log = cap_log(&output, limits.max_log_chars.unwrap_or(10_000));

    debug!(
        success,
        exit_code = ?outcome.exit_code,
        diagnostics = diagnostics.len(),
        "compilation complete"
    );

    if !success {
        return Ok(CompilationOutcome {
            success: false,
            diagnostics,
            log,
            artifact: None,
        });
    }

    let artifact_name =
        artifact_file_name(&submission.file_name, toolchain.artifact_extension.as_str());
    let artifact = find_artifact(&out_dir, &artifact_name);
    if artifact.is_none() {
        warn!(artifact_name, "compiled artifact not found despite successful compile");
    }

    Ok(CompilationOutcome {
        success: true,
        diagnostics,
        log,
        artifact,
    })
}

/// Canonical artifact name derived from the source unit
fn artifact_file_name(source_name: &str, artifact_extension: &str) -> String {
    let stem = Path::new(source_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(source_name);
    format!("{stem}.{artifact_extension}")
}

/// Search the output tree for the artifact, descending into nested package
/// directories. Entries are visited in name order so the result is stable.
fn find_artifact(dir: &Path, file_name: &str) -> Option<PathBuf> {
    let mut entries: Vec<_> = std::fs::read_dir(dir).ok()?.flatten().collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            if let Some(found) = find_artifact(&path, file_name) {
                return Some(found);
            }
        } else if path.file_name().and_then(|n| n.to_str()) == Some(file_name) {
            return Some(path);
        }
    }
    None
}
