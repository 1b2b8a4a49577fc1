//! Test execution step
//!
//! Stages and compiles the instructor's test units against the submission's
//! compiled output, then drives the configured test-runner command over all
//! resolvable test classes as a single bounded-time task. The runner sees an
//! explicit classpath assembled from the sandbox and the configured runtime
//! entries only; its environment is cleared and rebuilt.
//!
//! Cancellation at the wall clock bound kills the runner process. Children
//! the runner detached into other process groups are not reaped by that kill;
//! containing those requires OS-level isolation of the runner itself.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{instrument, warn};

use crate::config::{Config, Toolchain};
use crate::report::{CompletionKind, TestExecutionOutcome};
use crate::runner::cap_log;
use crate::runner::compile::CLASSES_DIR;
use crate::runner::events::collect_events;
use crate::runner::process::{SpawnSpec, run_bounded};
use crate::sandbox::{Sandbox, check_size, confine};
use crate::types::{EvalLimits, TestUnit};

/// Sandbox directory test unit sources are staged under
const TESTS_SRC_DIR: &str = "tests-src";

/// Sandbox directory receiving compiled test classes
const TESTS_CLASSES_DIR: &str = "tests-classes";

/// Events file the runner appends per-test records to
const EVENTS_FILE: &str = "events.txt";

const RUN_STDOUT: &str = "run_stdout.txt";
const RUN_STDERR: &str = "run_stderr.txt";
const TEST_COMPILE_STDOUT: &str = "test_compile_stdout.txt";
const TEST_COMPILE_STDERR: &str = "test_compile_stderr.txt";

/// Run all resolvable test units against the compiled submission.
///
/// Never returns an error: harness faults become an outcome with
/// `completion = RunnerError` and partial results are always kept.
#[instrument(skip_all, fields(tests = tests.len()))]
pub(crate) async fn run(
    sandbox: &Sandbox,
    config: &Config,
    tests: &[TestUnit],
    test_rels: &[PathBuf],
    limits: &EvalLimits,
) -> TestExecutionOutcome {
    match try_run(sandbox, config, tests, test_rels, limits).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(error = %e, "test execution step faulted");
            TestExecutionOutcome::runner_error(format!("test execution faulted: {e:#}"))
        }
    }
}

async fn try_run(
    sandbox: &Sandbox,
    config: &Config,
    tests: &[TestUnit],
    test_rels: &[PathBuf],
    limits: &EvalLimits,
) -> anyhow::Result<TestExecutionOutcome> {
    if tests.is_empty() {
        return Ok(TestExecutionOutcome::runner_error("no test units supplied"));
    }

    let toolchain = &config.toolchain;
    let classes_dir = sandbox.file_path(CLASSES_DIR)?;
    let tests_out = sandbox.create_dir(TESTS_CLASSES_DIR).await?;

    let mut log_lines: Vec<String> = Vec::new();

    // Tests compile against the submission's classes plus the runtime only
    let mut compile_entries = vec![classes_dir.clone()];
    compile_entries.extend(toolchain.runtime_classpath.iter().cloned());
    let compile_classpath = Toolchain::join_classpath(&compile_entries);

    let mut runnable: Vec<String> = Vec::new();
    for (unit, rel) in tests.iter().zip(test_rels) {
        match stage_test_unit(sandbox, config, unit, rel, &tests_out, &compile_classpath, limits)
            .await
        {
            Ok(()) => runnable.push(unit.class_name().to_owned()),
            Err(reason) => {
                warn!(unit = %unit.file_name, %reason, "skipping unresolvable test unit");
                log_lines.push(format!(
                    "warning: skipped test unit '{}': {}",
                    unit.file_name, reason
                ));
            }
        }
    }

    if runnable.is_empty() {
        log_lines.push("error: no resolvable test units".to_owned());
        return Ok(TestExecutionOutcome::runner_error(log_lines.join("\n")));
    }

    let mut run_entries = vec![classes_dir, tests_out];
    run_entries.extend(toolchain.runtime_classpath.iter().cloned());
    let run_classpath = Toolchain::join_classpath(&run_entries);
    let events_path = sandbox.file_path(EVENTS_FILE)?;

    let command = Toolchain::expand_test_command(
        &toolchain.test.command,
        &[
            ("{classpath}", &run_classpath),
            ("{events}", &events_path.to_string_lossy()),
        ],
        &runnable,
    );

    let timeout = Duration::from_millis(limits.timeout_millis.unwrap_or(30_000));
    let outcome = match run_bounded(SpawnSpec {
        command,
        cwd: sandbox.path(),
        env: &toolchain.test.env,
        path_var: &toolchain.path,
        stdout_file: sandbox.file_path(RUN_STDOUT)?,
        stderr_file: sandbox.file_path(RUN_STDERR)?,
        timeout,
    })
    .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            log_lines.push(format!("error: failed to start test runner: {e:#}"));
            return Ok(TestExecutionOutcome::runner_error(log_lines.join("\n")));
        }
    };

    // Event records flushed before cancellation survive a killed run
    let events = sandbox.read_log(EVENTS_FILE).await?;
    let collected = collect_events(&events);
    log_lines.extend(collected.warnings.iter().map(|w| format!("warning: {w}")));

    let stdout = sandbox.read_log(RUN_STDOUT).await?;
    let stderr = sandbox.read_log(RUN_STDERR).await?;
    let mut log = log_lines.join("\n");
    for chunk in [stdout, stderr] {
        if !chunk.is_empty() {
            if !log.is_empty() {
                log.push('\n');
            }
            log.push_str(&chunk);
        }
    }
    let log = cap_log(&log, limits.max_log_chars.unwrap_or(10_000));

    let completion = if outcome.timed_out {
        CompletionKind::TimedOut
    } else if outcome.exit_code == Some(0) || !collected.results.is_empty() {
        // The events file is the authority; a runner that reported results
        // and then exited non-zero still completed the tests it recorded
        CompletionKind::Completed
    } else {
        CompletionKind::RunnerError
    };

    Ok(TestExecutionOutcome::from_results(
        collected.results,
        log,
        outcome.duration_ms,
        completion,
    ))
}

/// Stage one test unit and compile it; a failure skips the unit, not the run
async fn stage_test_unit(
    sandbox: &Sandbox,
    config: &Config,
    unit: &TestUnit,
    rel: &Path,
    tests_out: &Path,
    classpath: &str,
    limits: &EvalLimits,
) -> Result<(), String> {
    let max_bytes = limits.max_file_size_bytes.unwrap_or(EvalLimits::MIB);
    check_size(unit.content.len() as u64, max_bytes).map_err(|e| e.to_string())?;

    let staged_rel = Path::new(TESTS_SRC_DIR).join(rel);
    confine(sandbox.path(), &staged_rel).map_err(|e| e.to_string())?;

    let source_path = sandbox
        .write_file(&staged_rel, &unit.content)
        .await
        .map_err(|e| e.to_string())?;

    let toolchain = &config.toolchain;
    let command = Toolchain::expand_command(
        &toolchain.compile.command,
        &[
            ("{source}", &source_path.to_string_lossy()),
            ("{out_dir}", &tests_out.to_string_lossy()),
            ("{classpath}", classpath),
        ],
    );

    let timeout = Duration::from_millis(limits.compile_timeout_millis.unwrap_or(60_000));
    let outcome = run_bounded(SpawnSpec {
        command,
        cwd: sandbox.path(),
        env: &toolchain.compile.env,
        path_var: &toolchain.path,
        stdout_file: sandbox.file_path(TEST_COMPILE_STDOUT).map_err(|e| e.to_string())?,
        stderr_file: sandbox.file_path(TEST_COMPILE_STDERR).map_err(|e| e.to_string())?,
        timeout,
    })
    .await
    .map_err(|e| format!("{e:#}"))?;

    if outcome.timed_out {
        return Err(format!("compilation timed out after {} ms", timeout.as_millis()));
    }
    if !outcome.succeeded() {
        let stderr = sandbox
            .read_log(TEST_COMPILE_STDERR)
            .await
            .unwrap_or_default();
        let first_line = stderr.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
        return Err(format!("compilation failed: {first_line}"));
    }

    Ok(())
}
