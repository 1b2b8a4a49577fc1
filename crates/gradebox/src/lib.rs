//! A library for sandboxed grading of untrusted code submissions.
//!
//! Gradebox provides an async Rust API for compiling student code and running
//! instructor-supplied tests against it in isolated per-evaluation sandboxes,
//! producing a deterministic score plus structured diagnostics.
//!
//! # Features
//!
//! - **Input sanitization** — claimed file names and sizes are validated on
//!   their normalized form before anything touches disk.
//! - **Isolated compilation** — a black-box compiler command runs confined to
//!   the sandbox with a restricted classpath, its output parsed into
//!   structured diagnostics.
//! - **Bounded test execution** — the test runner executes as a single
//!   bounded-time task; a hang is killed at the wall clock bound and results
//!   collected so far are kept.
//! - **Deterministic scoring** — fixed-point arithmetic, stable result order,
//!   identical inputs reproduce identical reports.
//! - **TOML configuration** — flexible toolchain commands, limits, and
//!   sandbox settings.

pub use config::{Config, ConfigError, EXAMPLE_CONFIG, FileExtension, Toolchain};
pub use report::{
    CompilationOutcome, CompletionKind, EvaluationReport, EvaluationStatus, Score,
    TestExecutionOutcome, TestOutcome, TestResult,
};
pub use runner::{Engine, EvaluateError, parse_diagnostics};
pub use sandbox::{
    Sandbox, SandboxError, SandboxPool, ValidationError, check_size, confine, sanitize_file_name,
};
pub use score::aggregate;
pub use types::{Diagnostic, EvalLimits, Severity, SubmissionUnit, TestUnit};

pub mod config;
pub mod report;
pub mod runner;
pub mod sandbox;
pub mod score;
pub mod types;
