use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::config::ConfigError;

const INVALID_FILE_EXT_CHARS: [char; 2] = ['/', '.'];

/// Default PATH for toolchain subprocesses.
///
/// Subprocess environments are cleared and rebuilt from the toolchain config,
/// so PATH must be stated explicitly.
pub const DEFAULT_TOOLCHAIN_PATH: &str = "/usr/bin:/bin";

/// The compiler-and-test-runner pair the engine drives.
///
/// Both commands are black boxes described by argv templates. Placeholders
/// are expanded per evaluation:
///
/// - compile: `{source}`, `{out_dir}`, `{classpath}`
/// - test: `{classpath}`, `{events}`, and `{tests}` (a whole argument that
///   expands into one argument per test class)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Toolchain {
    /// Compilation command template
    pub compile: CompileStep,

    /// Test-runner command template
    pub test: TestStep,

    /// Classpath entries of the engine's own runtime support (e.g. the test
    /// framework jar). These are the only entries outside the sandbox that
    /// compiled code and tests may resolve against.
    #[serde(default)]
    pub runtime_classpath: Vec<PathBuf>,

    /// Extension of compiled artifacts (e.g. "class")
    pub artifact_extension: FileExtension,

    /// PATH environment variable for toolchain subprocesses
    #[serde(default = "default_toolchain_path")]
    pub path: String,
}

impl Toolchain {
    /// Expand placeholders in a command template
    pub fn expand_command(command: &[String], vars: &[(&str, &str)]) -> Vec<String> {
        command
            .iter()
            .map(|arg| {
                let mut arg = arg.clone();
                for (key, value) in vars {
                    arg = arg.replace(key, value);
                }
                arg
            })
            .collect()
    }

    /// Expand the test command, splicing one argument per test class where
    /// the template says `{tests}`.
    pub fn expand_test_command(
        command: &[String],
        vars: &[(&str, &str)],
        tests: &[String],
    ) -> Vec<String> {
        let mut out = Vec::with_capacity(command.len() + tests.len());
        for arg in command {
            if arg == "{tests}" {
                out.extend(tests.iter().cloned());
                continue;
            }
            let mut arg = arg.clone();
            for (key, value) in vars {
                arg = arg.replace(key, value);
            }
            out.push(arg);
        }
        out
    }

    /// Join classpath entries into a single `:`-separated argument
    pub fn join_classpath(entries: &[PathBuf]) -> String {
        entries
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(":")
    }
}

/// Configuration for the compilation step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileStep {
    /// Command and arguments with placeholders
    pub command: Vec<String>,

    /// Environment variables to set during compilation
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// Configuration for the test-runner step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestStep {
    /// Command and arguments with placeholders
    pub command: Vec<String>,

    /// Environment variables to set during test execution
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// File extension without dot (e.g. "java")
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileExtension(String);

impl FileExtension {
    pub fn new(extension: &str) -> Result<Self, ConfigError> {
        let contains_invalid = extension
            .chars()
            .any(|c| INVALID_FILE_EXT_CHARS.contains(&c));
        if contains_invalid {
            return Err(ConfigError::InvalidFileExtChars);
        }
        Ok(Self(extension.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for FileExtension {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FileExtension::new(&s).map_err(|_| {
            de::Error::invalid_value(
                de::Unexpected::Str(&s),
                &"a file extension without '/' or '.' characters",
            )
        })
    }
}

impl std::fmt::Display for FileExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub(crate) fn default_toolchain_path() -> String {
    DEFAULT_TOOLCHAIN_PATH.to_owned()
}

pub(crate) fn default_allowed_extensions() -> Vec<FileExtension> {
    vec![FileExtension("java".to_owned())]
}
