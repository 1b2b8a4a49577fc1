use serde::{Deserialize, Serialize};

/// One source file submitted for evaluation.
///
/// The engine treats the content as untrusted bytes; the declared file name
/// is validated by the sanitizer before anything touches disk.
#[derive(Debug, Clone)]
pub struct SubmissionUnit {
    /// Identifier of the submitting student
    pub student_id: String,

    /// Identifier of the assignment this submission belongs to
    pub assignment_id: String,

    /// Declared file name (e.g. "Calculator.java")
    pub file_name: String,

    /// Raw source bytes
    pub content: Vec<u8>,
}

impl SubmissionUnit {
    pub fn new(
        student_id: impl Into<String>,
        assignment_id: impl Into<String>,
        file_name: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            student_id: student_id.into(),
            assignment_id: assignment_id.into(),
            file_name: file_name.into(),
            content: content.into(),
        }
    }
}

/// One instructor-provided test file.
///
/// Test units are supplied once per assignment and are read-only to the
/// engine; they are staged into each evaluation's sandbox, never modified.
#[derive(Debug, Clone)]
pub struct TestUnit {
    /// Identifier of the assignment this test belongs to
    pub assignment_id: String,

    /// Declared file name (e.g. "CalculatorTest.java")
    pub file_name: String,

    /// Raw source bytes
    pub content: Vec<u8>,
}

impl TestUnit {
    pub fn new(
        assignment_id: impl Into<String>,
        file_name: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            assignment_id: assignment_id.into(),
            file_name: file_name.into(),
            content: content.into(),
        }
    }

    /// Class name the test unit resolves to (file stem)
    pub fn class_name(&self) -> &str {
        self.file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(&self.file_name)
    }
}

/// Per-evaluation limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalLimits {
    /// Wall clock bound for the whole test-execution step, in milliseconds
    #[serde(default)]
    pub timeout_millis: Option<u64>,

    /// Wall clock bound for the compilation step, in milliseconds
    #[serde(default)]
    pub compile_timeout_millis: Option<u64>,

    /// Maximum submission/test file size in bytes
    #[serde(default)]
    pub max_file_size_bytes: Option<u64>,

    /// Maximum captured log size in characters
    #[serde(default)]
    pub max_log_chars: Option<usize>,

    /// Maximum attainable score in whole points
    #[serde(default)]
    pub max_score: Option<u32>,
}

impl EvalLimits {
    /// 1 kibibyte in bytes
    pub const KIB: u64 = 1024;
    /// 1 mebibyte in bytes
    pub const MIB: u64 = 1024 * 1024;

    /// Create new limits with all fields set to None
    pub fn new() -> Self {
        Self {
            timeout_millis: None,
            compile_timeout_millis: None,
            max_file_size_bytes: None,
            max_log_chars: None,
            max_score: None,
        }
    }

    /// Set the test-execution wall clock bound in milliseconds
    pub fn with_timeout_millis(mut self, millis: u64) -> Self {
        self.timeout_millis = Some(millis);
        self
    }

    /// Set the compilation wall clock bound in milliseconds
    pub fn with_compile_timeout_millis(mut self, millis: u64) -> Self {
        self.compile_timeout_millis = Some(millis);
        self
    }

    /// Set the maximum file size in bytes
    pub fn with_max_file_size_bytes(mut self, bytes: u64) -> Self {
        self.max_file_size_bytes = Some(bytes);
        self
    }

    /// Set the maximum captured log size in characters
    pub fn with_max_log_chars(mut self, chars: usize) -> Self {
        self.max_log_chars = Some(chars);
        self
    }

    /// Set the maximum attainable score in whole points
    pub fn with_max_score(mut self, points: u32) -> Self {
        self.max_score = Some(points);
        self
    }

    /// Apply overrides from another EvalLimits, preferring values from `overrides`
    ///
    /// Returns new limits with values from `overrides` taking precedence over
    /// values from `self` when both are present.
    pub fn with_overrides(&self, overrides: &EvalLimits) -> EvalLimits {
        EvalLimits {
            timeout_millis: overrides.timeout_millis.or(self.timeout_millis),
            compile_timeout_millis: overrides
                .compile_timeout_millis
                .or(self.compile_timeout_millis),
            max_file_size_bytes: overrides.max_file_size_bytes.or(self.max_file_size_bytes),
            max_log_chars: overrides.max_log_chars.or(self.max_log_chars),
            max_score: overrides.max_score.or(self.max_score),
        }
    }
}

impl Default for EvalLimits {
    fn default() -> Self {
        Self {
            timeout_millis: Some(30_000),
            compile_timeout_millis: Some(60_000),
            max_file_size_bytes: Some(Self::MIB),
            max_log_chars: Some(10_000),
            max_score: Some(100),
        }
    }
}

/// Severity of a compiler diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    #[serde(rename = "error")]
    Error,

    #[serde(rename = "warning")]
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// File name used for diagnostics the engine synthesizes when the toolchain
/// itself fails rather than the submitted code.
pub const TOOLCHAIN_DIAGNOSTIC_FILE: &str = "<toolchain>";

/// One structured compiler message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,

    /// Source file the message refers to
    pub file: String,

    /// 1-indexed line, 0 when the toolchain reported none
    pub line: u32,

    /// 1-indexed column, if the toolchain reported one
    pub column: Option<u32>,

    pub message: String,
}

impl Diagnostic {
    pub fn error(file: impl Into<String>, line: u32, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            file: file.into(),
            line,
            column: None,
            message: message.into(),
        }
    }

    pub fn warning(file: impl Into<String>, line: u32, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            file: file.into(),
            line,
            column: None,
            message: message.into(),
        }
    }

    /// Synthetic diagnostic for a toolchain fault (spawn failure, I/O error)
    pub fn toolchain(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            file: TOOLCHAIN_DIAGNOSTIC_FILE.to_owned(),
            line: 0,
            column: None,
            message: message.into(),
        }
    }

    pub fn with_column(mut self, column: u32) -> Self {
        self.column = Some(column);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.file, self.line, self.severity, self.message
        )
    }
}
