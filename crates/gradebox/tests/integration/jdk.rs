//! Tests that drive a real JDK toolchain.
//!
//! These need javac on the PATH and are ignored by default:
//!    cargo test -p gradebox --features jdk-tests -- --include-ignored

use std::path::Path;

use gradebox::{Config, Engine, EvaluationStatus, SubmissionUnit, TestUnit};

use super::RUNNER_SH;

/// Real javac for compilation, stub runner for result reporting.
fn jdk_config(root: &Path) -> Config {
    let toml = format!(
        r#"
sandbox_root = {root:?}
worker_slots = 2
allowed_extensions = ["java"]

[toolchain]
artifact_extension = "class"
path = "/usr/bin:/bin"

[toolchain.compile]
command = ["javac", "-d", "{{out_dir}}", "-cp", "{{classpath}}", "{{source}}"]

[toolchain.test]
command = ["/bin/sh", "-c", {RUNNER_SH:?}, "runner", "{{events}}", "{{tests}}"]
"#
    );
    Config::parse_toml(&toml).expect("jdk config should be valid")
}

const CALCULATOR_JAVA: &str = r#"
public class Calculator {
    public int add(int a, int b) { return a + b; }
}
"#;

const BROKEN_JAVA: &str = r#"
public class Calculator {
    public int add(int a, int b) { return a + b }
}
"#;

#[tokio::test]
#[ignore = "requires JDK"]
async fn javac_compiles_valid_submission() {
    let root = tempfile::tempdir().unwrap();
    let engine = Engine::new(jdk_config(root.path()));

    let submission =
        SubmissionUnit::new("s1", "a1", "Calculator.java", CALCULATOR_JAVA.as_bytes().to_vec());
    // The stub runner treats the staged unit as event records; javac cannot
    // compile it, so it only checks the submission path end to end
    let tests = vec![TestUnit::new(
        "a1",
        "CalcTest.java",
        b"public class CalcTest {}".to_vec(),
    )];

    let report = engine.evaluate(&submission, &tests, None).await.unwrap();

    let compilation = report.compilation.unwrap();
    assert!(compilation.success);
    let artifact = compilation.artifact.expect("artifact located");
    assert!(artifact.ends_with("Calculator.class") || artifact.to_string_lossy().contains("Calculator.class"));
}

#[tokio::test]
#[ignore = "requires JDK"]
async fn javac_diagnostics_are_structured() {
    let root = tempfile::tempdir().unwrap();
    let engine = Engine::new(jdk_config(root.path()));

    let submission =
        SubmissionUnit::new("s1", "a1", "Calculator.java", BROKEN_JAVA.as_bytes().to_vec());
    let tests = vec![TestUnit::new("a1", "CalcTest.java", b"unused".to_vec())];

    let report = engine.evaluate(&submission, &tests, None).await.unwrap();

    assert_eq!(report.status, EvaluationStatus::CompileFailed);
    let compilation = report.compilation.unwrap();
    assert!(compilation.error_count() >= 1);

    let error = &compilation.diagnostics[0];
    assert!(error.file.ends_with("Calculator.java"));
    assert!(error.line > 0);
}
