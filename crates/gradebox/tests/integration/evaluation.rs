use gradebox::{
    CompletionKind, Engine, EvaluationStatus, Severity, SubmissionUnit, TestUnit,
};

use super::{COMPILE_SH, passing_events, sh_config, stub_config};

fn submission(content: &str) -> SubmissionUnit {
    SubmissionUnit::new("s1", "a1", "Calculator.java", content.as_bytes().to_vec())
}

fn test_unit(name: &str, events: &str) -> TestUnit {
    TestUnit::new("a1", name, events.as_bytes().to_vec())
}

#[tokio::test]
async fn all_tests_pass_scores_full_marks() {
    let root = tempfile::tempdir().unwrap();
    let engine = Engine::new(stub_config(root.path()));

    let tests = vec![test_unit("CalcTest.java", &passing_events("CalcTest", 10))];
    let report = engine
        .evaluate(&submission("class Calculator {}"), &tests, None)
        .await
        .unwrap();

    assert_eq!(report.status, EvaluationStatus::Completed);
    assert_eq!(report.score.to_string(), "100.00");
    assert_eq!(report.max_score.to_string(), "100.00");

    let compilation = report.compilation.unwrap();
    assert!(compilation.success);
    assert!(compilation.artifact.is_some());

    let execution = report.execution.unwrap();
    assert_eq!(execution.completion, CompletionKind::Completed);
    assert_eq!(execution.total, 10);
    assert_eq!(execution.passed, 10);
}

#[tokio::test]
async fn partial_pass_scores_ratio() {
    let root = tempfile::tempdir().unwrap();
    let engine = Engine::new(stub_config(root.path()));

    let mut events = passing_events("CalcTest", 8);
    events.push_str(
        "test:CalcTest#divides\nstatus:failed\nmessage:expected 2 but was 3\n\
         stack:at CalcTest.divides(CalcTest.java:9)\n\n\
         test:CalcTest#overflow\nstatus:errored\nmessage:ArithmeticException\n\n",
    );
    let tests = vec![test_unit("CalcTest.java", &events)];

    let report = engine
        .evaluate(&submission("class Calculator {}"), &tests, None)
        .await
        .unwrap();

    assert_eq!(report.status, EvaluationStatus::Completed);
    assert_eq!(report.score.to_string(), "80.00");

    let execution = report.execution.unwrap();
    assert_eq!(execution.total, 10);
    assert_eq!(execution.passed, 8);
    assert_eq!(execution.failed, 1);
    assert_eq!(execution.errored, 1);
}

#[tokio::test]
async fn syntax_error_reports_compile_failed() {
    let root = tempfile::tempdir().unwrap();
    let engine = Engine::new(stub_config(root.path()));

    let tests = vec![test_unit("CalcTest.java", &passing_events("CalcTest", 1))];
    let report = engine
        .evaluate(&submission("class Calculator { SYNTAX_ERROR }"), &tests, None)
        .await
        .unwrap();

    assert_eq!(report.status, EvaluationStatus::CompileFailed);
    assert_eq!(report.score.to_string(), "0.00");
    assert!(report.execution.is_none());

    let compilation = report.compilation.unwrap();
    assert!(!compilation.success);
    let error = compilation
        .diagnostics
        .iter()
        .find(|d| d.severity == Severity::Error)
        .expect("at least one error diagnostic");
    assert_eq!(error.file, "Calculator.java");
    assert_eq!(error.line, 3);
}

#[tokio::test]
async fn missing_artifact_reports_runner_error() {
    let root = tempfile::tempdir().unwrap();
    // Compiler exits zero without producing any artifact
    let config = sh_config(root.path(), "exit 0", super::RUNNER_SH);
    let engine = Engine::new(config);

    let tests = vec![test_unit("CalcTest.java", &passing_events("CalcTest", 1))];
    let report = engine
        .evaluate(&submission("class Calculator {}"), &tests, None)
        .await
        .unwrap();

    assert_eq!(report.status, EvaluationStatus::RunnerError);
    assert_eq!(report.score.to_string(), "0.00");
    assert!(report.compilation.unwrap().success);
    assert!(
        report
            .execution
            .unwrap()
            .log
            .contains("artifact not found")
    );
}

#[tokio::test]
async fn unresolvable_test_unit_is_skipped_with_warning() {
    let root = tempfile::tempdir().unwrap();
    let engine = Engine::new(stub_config(root.path()));

    let tests = vec![
        test_unit("BrokenTest.java", "SYNTAX_ERROR"),
        test_unit("CalcTest.java", &passing_events("CalcTest", 2)),
    ];
    let report = engine
        .evaluate(&submission("class Calculator {}"), &tests, None)
        .await
        .unwrap();

    // Partial progress: the resolvable unit still ran
    assert_eq!(report.status, EvaluationStatus::Completed);
    assert_eq!(report.score.to_string(), "100.00");

    let execution = report.execution.unwrap();
    assert_eq!(execution.total, 2);
    assert!(execution.log.contains("skipped test unit 'BrokenTest.java'"));
}

#[tokio::test]
async fn all_test_units_unresolvable_reports_runner_error() {
    let root = tempfile::tempdir().unwrap();
    let engine = Engine::new(stub_config(root.path()));

    let tests = vec![test_unit("BrokenTest.java", "SYNTAX_ERROR")];
    let report = engine
        .evaluate(&submission("class Calculator {}"), &tests, None)
        .await
        .unwrap();

    assert_eq!(report.status, EvaluationStatus::RunnerError);
    assert_eq!(report.score.to_string(), "0.00");
    assert!(
        report
            .execution
            .unwrap()
            .log
            .contains("no resolvable test units")
    );
}

#[tokio::test]
async fn runner_crash_without_events_reports_runner_error() {
    let root = tempfile::tempdir().unwrap();
    let config = sh_config(root.path(), COMPILE_SH, "exit 7");
    let engine = Engine::new(config);

    let tests = vec![test_unit("CalcTest.java", &passing_events("CalcTest", 1))];
    let report = engine
        .evaluate(&submission("class Calculator {}"), &tests, None)
        .await
        .unwrap();

    assert_eq!(report.status, EvaluationStatus::RunnerError);
    assert_eq!(report.execution.unwrap().total, 0);
}

#[tokio::test]
async fn runner_exit_zero_without_events_completes_with_zero_score() {
    let root = tempfile::tempdir().unwrap();
    let config = sh_config(root.path(), COMPILE_SH, "exit 0");
    let engine = Engine::new(config);

    let tests = vec![test_unit("CalcTest.java", &passing_events("CalcTest", 3))];
    let report = engine
        .evaluate(&submission("class Calculator {}"), &tests, None)
        .await
        .unwrap();

    // Zero recorded tests is never a pass
    assert_eq!(report.status, EvaluationStatus::Completed);
    assert_eq!(report.score.to_string(), "0.00");
    assert_eq!(report.execution.unwrap().total, 0);
}

#[tokio::test]
async fn custom_max_score_limits() {
    let root = tempfile::tempdir().unwrap();
    let engine = Engine::new(stub_config(root.path()));

    let mut events = passing_events("CalcTest", 1);
    events.push_str("test:CalcTest#fails\nstatus:failed\nmessage:no\n\n");
    let tests = vec![test_unit("CalcTest.java", &events)];

    let limits = gradebox::EvalLimits::new().with_max_score(40);
    let report = engine
        .evaluate(&submission("class Calculator {}"), &tests, Some(&limits))
        .await
        .unwrap();

    assert_eq!(report.score.to_string(), "20.00");
    assert_eq!(report.max_score.to_string(), "40.00");
}

#[tokio::test]
async fn identical_inputs_reproduce_identical_reports() {
    let root = tempfile::tempdir().unwrap();
    let engine = Engine::new(stub_config(root.path()));

    let mut events = passing_events("CalcTest", 3);
    events.push_str("test:CalcTest#last\nstatus:failed\nmessage:off by one\n\n");
    let tests = vec![test_unit("CalcTest.java", &events)];
    let unit = submission("class Calculator {}");

    let first = engine.evaluate(&unit, &tests, None).await.unwrap();
    let second = engine.evaluate(&unit, &tests, None).await.unwrap();

    assert_eq!(first.status, second.status);
    assert_eq!(first.score, second.score);

    let first_names: Vec<_> = first
        .execution
        .as_ref()
        .unwrap()
        .results
        .iter()
        .map(|r| r.name.clone())
        .collect();
    let second_names: Vec<_> = second
        .execution
        .as_ref()
        .unwrap()
        .results
        .iter()
        .map(|r| r.name.clone())
        .collect();
    assert_eq!(first_names, second_names);
}

#[tokio::test]
async fn sandbox_is_removed_after_evaluation() {
    let root = tempfile::tempdir().unwrap();
    let engine = Engine::new(stub_config(root.path()));

    let tests = vec![test_unit("CalcTest.java", &passing_events("CalcTest", 1))];
    engine
        .evaluate(&submission("class Calculator {}"), &tests, None)
        .await
        .unwrap();

    let leftovers: Vec<_> = std::fs::read_dir(root.path()).unwrap().flatten().collect();
    assert!(leftovers.is_empty(), "sandbox left behind: {leftovers:?}");
}

#[tokio::test]
async fn sandbox_is_removed_after_compile_failure() {
    let root = tempfile::tempdir().unwrap();
    let engine = Engine::new(stub_config(root.path()));

    let tests = vec![test_unit("CalcTest.java", &passing_events("CalcTest", 1))];
    engine
        .evaluate(&submission("SYNTAX_ERROR"), &tests, None)
        .await
        .unwrap();

    let leftovers: Vec<_> = std::fs::read_dir(root.path()).unwrap().flatten().collect();
    assert!(leftovers.is_empty(), "sandbox left behind: {leftovers:?}");
}
