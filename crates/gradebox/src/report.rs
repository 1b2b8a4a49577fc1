//! Result model for evaluations
//!
//! Everything in this module is produced once per evaluation and immutable
//! afterwards; the report is what gets handed to storage collaborators.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::Diagnostic;

/// A score in fixed-point hundredths of a point.
///
/// Scores are computed with integer arithmetic only, so repeated runs of
/// identical inputs always reproduce the identical value. Two fractional
/// digits are carried; `Display` renders "80.00".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Score(u64);

impl Score {
    pub const ZERO: Score = Score(0);

    /// Score from whole points
    pub fn from_points(points: u32) -> Self {
        Score(u64::from(points) * 100)
    }

    /// Score from hundredths of a point
    pub fn from_hundredths(hundredths: u64) -> Self {
        Score(hundredths)
    }

    pub fn hundredths(&self) -> u64 {
        self.0
    }

    /// `passed / total` of `max`, rounded to the nearest hundredth.
    ///
    /// A zero `total` scores zero; a run with no tests is never a pass.
    pub fn ratio(passed: u32, total: u32, max: Score) -> Score {
        if total == 0 {
            return Score::ZERO;
        }
        let passed = u128::from(passed.min(total));
        let total = u128::from(total);
        let hundredths = (passed * u128::from(max.0) + total / 2) / total;
        Score(hundredths as u64)
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Result of compiling one submission unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilationOutcome {
    /// Whether compilation succeeded
    pub success: bool,

    /// Every diagnostic the toolchain emitted, in emission order
    pub diagnostics: Vec<Diagnostic>,

    /// Raw compiler output (capped)
    pub log: String,

    /// Host path to the compiled artifact, present only on success
    pub artifact: Option<PathBuf>,
}

impl CompilationOutcome {
    /// Failed compilation with the given diagnostics
    pub fn failure(diagnostics: Vec<Diagnostic>, log: impl Into<String>) -> Self {
        Self {
            success: false,
            diagnostics,
            log: log.into(),
            artifact: None,
        }
    }

    /// Failed compilation caused by the toolchain itself rather than the code
    pub fn fault(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            success: false,
            diagnostics: vec![Diagnostic::toolchain(message.clone())],
            log: message,
            artifact: None,
        }
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }
}

/// Outcome of one executed test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TestOutcome {
    Passed,

    /// Assertion failure reported by the test framework
    Failed { message: String, stack: String },

    /// Unexpected exception escaping the test
    Errored { message: String, stack: String },
}

impl TestOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, TestOutcome::Passed)
    }
}

/// One executed test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    /// Displayed test name (e.g. "CalculatorTest#addsTwoNumbers")
    pub name: String,

    pub outcome: TestOutcome,

    /// Wall clock duration of the test in milliseconds
    pub duration_ms: u64,
}

/// Terminal disposition of a test-execution run, distinct from individual
/// test pass/fail outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionKind {
    /// The run finished on its own
    Completed,

    /// The run was cancelled at the wall clock bound
    TimedOut,

    /// The test harness itself faulted
    RunnerError,
}

/// Aggregate of all test results for one evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestExecutionOutcome {
    /// Number of recorded test results
    pub total: u32,

    pub passed: u32,
    pub failed: u32,
    pub errored: u32,

    /// Results in execution order, never reordered
    pub results: Vec<TestResult>,

    /// Execution log (capped), including warnings for skipped test units
    pub log: String,

    /// Wall clock duration of the whole run in milliseconds
    pub duration_ms: u64,

    pub completion: CompletionKind,
}

impl TestExecutionOutcome {
    /// Build an outcome from collected results, computing the counts.
    ///
    /// `total == passed + failed + errored` holds by construction.
    pub fn from_results(
        results: Vec<TestResult>,
        log: impl Into<String>,
        duration_ms: u64,
        completion: CompletionKind,
    ) -> Self {
        let passed = results.iter().filter(|r| r.outcome.is_passed()).count() as u32;
        let failed = results
            .iter()
            .filter(|r| matches!(r.outcome, TestOutcome::Failed { .. }))
            .count() as u32;
        let errored = results
            .iter()
            .filter(|r| matches!(r.outcome, TestOutcome::Errored { .. }))
            .count() as u32;

        Self {
            total: results.len() as u32,
            passed,
            failed,
            errored,
            results,
            log: log.into(),
            duration_ms,
            completion,
        }
    }

    /// Harness fault before or during the run, with whatever was collected
    pub fn runner_error(log: impl Into<String>) -> Self {
        Self::from_results(Vec::new(), log, 0, CompletionKind::RunnerError)
    }
}

/// Terminal status of an evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    /// Compiled and every discovered test executed
    Completed,

    /// The submission did not compile; scored zero
    CompileFailed,

    /// Test execution exceeded the wall clock bound
    TimedOut,

    /// The grading infrastructure faulted; the submission is not at fault
    RunnerError,

    /// Inputs were rejected before compilation began
    ValidationFailed,
}

impl std::fmt::Display for EvaluationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EvaluationStatus::Completed => "completed",
            EvaluationStatus::CompileFailed => "compile_failed",
            EvaluationStatus::TimedOut => "timed_out",
            EvaluationStatus::RunnerError => "runner_error",
            EvaluationStatus::ValidationFailed => "validation_failed",
        };
        write!(f, "{s}")
    }
}

/// Final result of one evaluation, handed to external collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub status: EvaluationStatus,

    /// Absent only when the evaluation never reached the compiler
    pub compilation: Option<CompilationOutcome>,

    /// Absent when compilation failed or never ran
    pub execution: Option<TestExecutionOutcome>,

    pub score: Score,

    pub max_score: Score,
}

impl EvaluationReport {
    /// Report for inputs the sanitizer rejected.
    ///
    /// The rejection reason travels in the compilation log slot so storage
    /// collaborators keep a uniform structured/unstructured split.
    pub fn validation_failed(reason: impl Into<String>, max_score: Score) -> Self {
        Self {
            status: EvaluationStatus::ValidationFailed,
            compilation: Some(CompilationOutcome::failure(Vec::new(), reason)),
            execution: None,
            score: Score::ZERO,
            max_score,
        }
    }

    /// Report for an infrastructure fault before compilation could start
    pub fn runner_error(reason: impl Into<String>, max_score: Score) -> Self {
        Self {
            status: EvaluationStatus::RunnerError,
            compilation: None,
            execution: Some(TestExecutionOutcome::runner_error(reason)),
            score: Score::ZERO,
            max_score,
        }
    }

    /// Whether grading finished because of the submission rather than the system
    pub fn is_graded(&self) -> bool {
        matches!(
            self.status,
            EvaluationStatus::Completed | EvaluationStatus::CompileFailed
        )
    }
}
