//! Evaluation engine
//!
//! Provides the high-level entry point for grading one submission against an
//! assignment's test units: sanitize inputs, compile in a fresh sandbox, run
//! the tests under a wall clock bound, aggregate into a report.

use thiserror::Error;

use tracing::{instrument, warn};

use crate::config::Config;
use crate::report::{EvaluationReport, Score, TestExecutionOutcome};
use crate::sandbox::{Sandbox, SandboxPool, ValidationError, check_size, sanitize_file_name};
use crate::score::aggregate;
use crate::types::{EvalLimits, SubmissionUnit, TestUnit};

mod compile;
mod diagnostics;
mod events;
mod execute;
mod process;

pub use crate::runner::diagnostics::parse_diagnostics;

/// Marker appended to logs cut at the size cap
const LOG_TRUNCATED: &str = "\n...[log truncated]";

/// Errors that reject an evaluation call before anything executes.
///
/// Everything past validation produces a report, never an error: compile
/// failures, timeouts, and harness faults are statuses on the
/// [`EvaluationReport`].
#[derive(Debug, Error)]
pub enum EvaluateError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("no test units supplied for the assignment")]
    NoTestUnits,
}

/// The evaluation engine
///
/// A pure function of its inputs: each call stages everything into a fresh
/// sandbox, produces one [`EvaluationReport`], and tears the sandbox down.
/// No state is shared across evaluations except the bounded pool itself.
#[derive(Debug)]
pub struct Engine {
    config: Config,
    pool: SandboxPool,
}

impl Engine {
    /// Create a new engine with the given configuration
    pub fn new(config: Config) -> Self {
        let pool = SandboxPool::new(&config.sandbox_root, config.worker_slots);
        Self { config, pool }
    }

    /// Create a new engine with default configuration
    pub fn with_defaults() -> Self {
        Self::new(Config::default())
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of free evaluation slots
    pub fn available_slots(&self) -> usize {
        self.pool.available()
    }

    /// Evaluate one submission against the assignment's test units.
    ///
    /// Returns an error only for inputs rejected before execution (bad
    /// names, oversized files, no test units). Any input that passes
    /// validation yields a report: `CompileFailed`, `TimedOut`, and
    /// `RunnerError` are statuses, not errors.
    ///
    /// The caller's wait for the test-execution step is bounded by
    /// `timeout_millis` plus small overhead.
    #[instrument(
        skip_all,
        fields(student = %submission.student_id, assignment = %submission.assignment_id)
    )]
    pub async fn evaluate(
        &self,
        submission: &SubmissionUnit,
        tests: &[TestUnit],
        limits: Option<&EvalLimits>,
    ) -> Result<EvaluationReport, EvaluateError> {
        let limits = self.config.effective_limits(limits);
        let max_score = Score::from_points(limits.max_score.unwrap_or(100));

        if tests.is_empty() {
            return Err(EvaluateError::NoTestUnits);
        }

        // Sanitize every claimed name and size before any I/O
        let max_bytes = limits.max_file_size_bytes.unwrap_or(EvalLimits::MIB);
        let source_rel =
            sanitize_file_name(&submission.file_name, &self.config.allowed_extensions)?;
        check_size(submission.content.len() as u64, max_bytes)?;

        let mut test_rels = Vec::with_capacity(tests.len());
        for unit in tests {
            let rel = sanitize_file_name(&unit.file_name, &self.config.allowed_extensions)?;
            check_size(unit.content.len() as u64, max_bytes)?;
            test_rels.push(rel);
        }

        // Past validation the contract is a report; a sandbox that cannot be
        // created is the system's fault, not the submission's
        let mut sandbox = match self.pool.acquire().await {
            Ok(sandbox) => sandbox,
            Err(e) => {
                warn!(error = %e, "failed to acquire sandbox");
                return Ok(EvaluationReport::runner_error(
                    format!("failed to acquire sandbox: {e}"),
                    max_score,
                ));
            }
        };

        let report = self
            .evaluate_in_sandbox(&sandbox, submission, &source_rel, tests, &test_rels, &limits, max_score)
            .await;

        // Torn down on every exit path; a failed removal is logged, not fatal
        if let Err(e) = sandbox.cleanup().await {
            warn!(id = sandbox.id(), error = %e, "sandbox cleanup failed");
        }

        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    async fn evaluate_in_sandbox(
        &self,
        sandbox: &Sandbox,
        submission: &SubmissionUnit,
        source_rel: &std::path::Path,
        tests: &[TestUnit],
        test_rels: &[std::path::PathBuf],
        limits: &EvalLimits,
        max_score: Score,
    ) -> EvaluationReport {
        let compilation =
            compile::compile(sandbox, &self.config, submission, source_rel, limits).await;

        if !compilation.success {
            return aggregate(compilation, None, max_score);
        }

        if compilation.artifact.is_none() {
            // Reported success but no artifact to run tests against
            let execution = TestExecutionOutcome::runner_error(
                "compiled artifact not found in output directory",
            );
            return aggregate(compilation, Some(execution), max_score);
        }

        let execution = execute::run(sandbox, &self.config, tests, test_rels, limits).await;
        aggregate(compilation, Some(execution), max_score)
    }
}

/// Cap a log at `max_chars`, appending a truncation marker when cut
pub(crate) fn cap_log(log: &str, max_chars: usize) -> String {
    if log.chars().count() <= max_chars {
        return log.to_owned();
    }

    let mut capped: String = log.chars().take(max_chars).collect();
    capped.push_str(LOG_TRUNCATED);
    capped
}
