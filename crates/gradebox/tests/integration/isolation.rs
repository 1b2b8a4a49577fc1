use gradebox::{Engine, EvaluationStatus, SubmissionUnit, TestUnit};

use super::{passing_events, stub_config};

/// Two concurrent evaluations whose submissions and tests collide on every
/// simple name must produce two independent, correct reports.
#[tokio::test]
async fn concurrent_evaluations_with_colliding_names_stay_independent() {
    let root = tempfile::tempdir().unwrap();
    let engine = Engine::new(stub_config(root.path()));

    let good = SubmissionUnit::new("alice", "a1", "Calculator.java", b"class Calculator {}".to_vec());
    let bad = SubmissionUnit::new("bob", "a1", "Calculator.java", b"SYNTAX_ERROR".to_vec());

    let good_tests = vec![TestUnit::new(
        "a1",
        "CalcTest.java",
        passing_events("CalcTest", 4).into_bytes(),
    )];
    let bad_tests = good_tests.clone();

    let (good_report, bad_report) = tokio::join!(
        engine.evaluate(&good, &good_tests, None),
        engine.evaluate(&bad, &bad_tests, None),
    );
    let good_report = good_report.unwrap();
    let bad_report = bad_report.unwrap();

    assert_eq!(good_report.status, EvaluationStatus::Completed);
    assert_eq!(good_report.score.to_string(), "100.00");
    assert_eq!(good_report.execution.unwrap().total, 4);

    assert_eq!(bad_report.status, EvaluationStatus::CompileFailed);
    assert_eq!(bad_report.score.to_string(), "0.00");
    assert!(bad_report.execution.is_none());
}

/// Colliding class names with different test content: each evaluation sees
/// only its own staged units.
#[tokio::test]
async fn concurrent_evaluations_see_only_their_own_tests() {
    let root = tempfile::tempdir().unwrap();
    let engine = Engine::new(stub_config(root.path()));

    let submission_a =
        SubmissionUnit::new("alice", "a1", "Calculator.java", b"class Calculator {}".to_vec());
    let submission_b =
        SubmissionUnit::new("bob", "a1", "Calculator.java", b"class Calculator {}".to_vec());

    let tests_a = vec![TestUnit::new(
        "a1",
        "CalcTest.java",
        passing_events("CalcTest", 2).into_bytes(),
    )];
    let mut failing = passing_events("CalcTest", 1);
    failing.push_str("test:CalcTest#broken\nstatus:failed\nmessage:nope\n\n");
    let tests_b = vec![TestUnit::new("a1", "CalcTest.java", failing.into_bytes())];

    let (report_a, report_b) = tokio::join!(
        engine.evaluate(&submission_a, &tests_a, None),
        engine.evaluate(&submission_b, &tests_b, None),
    );
    let report_a = report_a.unwrap();
    let report_b = report_b.unwrap();

    assert_eq!(report_a.score.to_string(), "100.00");
    assert_eq!(report_a.execution.unwrap().total, 2);

    assert_eq!(report_b.score.to_string(), "50.00");
    let execution_b = report_b.execution.unwrap();
    assert_eq!(execution_b.total, 2);
    assert_eq!(execution_b.failed, 1);
}

/// The pool admits evaluations beyond its slot count by queueing them.
#[tokio::test]
async fn more_evaluations_than_slots_all_complete() {
    let root = tempfile::tempdir().unwrap();
    // stub_config uses worker_slots = 2
    let engine = Engine::new(stub_config(root.path()));

    let submission =
        SubmissionUnit::new("s", "a1", "Calculator.java", b"class Calculator {}".to_vec());
    let tests = vec![TestUnit::new(
        "a1",
        "CalcTest.java",
        passing_events("CalcTest", 1).into_bytes(),
    )];

    let (r1, r2, r3, r4) = tokio::join!(
        engine.evaluate(&submission, &tests, None),
        engine.evaluate(&submission, &tests, None),
        engine.evaluate(&submission, &tests, None),
        engine.evaluate(&submission, &tests, None),
    );

    for report in [r1.unwrap(), r2.unwrap(), r3.unwrap(), r4.unwrap()] {
        assert_eq!(report.status, EvaluationStatus::Completed);
        assert_eq!(report.score.to_string(), "100.00");
    }
}
