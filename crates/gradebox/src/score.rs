//! Scoring and result aggregation
//!
//! Combines a compilation outcome and an optional test-execution outcome into
//! the final evaluation report. Scoring is pure and deterministic; identical
//! inputs always produce the identical report.

use crate::report::{
    CompilationOutcome, CompletionKind, EvaluationReport, EvaluationStatus, Score,
    TestExecutionOutcome,
};

/// Aggregate one evaluation's outcomes into its final report.
///
/// A failed compilation short-circuits to `CompileFailed` with a zero score
/// and no test outcome. Otherwise the status mirrors the execution's
/// completion kind, and the score is `passed / total` of `max_score` over the
/// results actually recorded: a test not observed as passed never counts as
/// passed, and an interrupted run is scored from whatever finished before
/// cancellation.
pub fn aggregate(
    compilation: CompilationOutcome,
    execution: Option<TestExecutionOutcome>,
    max_score: Score,
) -> EvaluationReport {
    if !compilation.success {
        return EvaluationReport {
            status: EvaluationStatus::CompileFailed,
            compilation: Some(compilation),
            execution: None,
            score: Score::ZERO,
            max_score,
        };
    }

    let Some(execution) = execution else {
        // Compilation succeeded but the executor never produced an outcome
        return EvaluationReport {
            status: EvaluationStatus::RunnerError,
            compilation: Some(compilation),
            execution: None,
            score: Score::ZERO,
            max_score,
        };
    };

    let status = match execution.completion {
        CompletionKind::Completed => EvaluationStatus::Completed,
        CompletionKind::TimedOut => EvaluationStatus::TimedOut,
        CompletionKind::RunnerError => EvaluationStatus::RunnerError,
    };

    let score = Score::ratio(execution.passed, execution.total, max_score);

    EvaluationReport {
        status,
        compilation: Some(compilation),
        execution: Some(execution),
        score,
        max_score,
    }
}
