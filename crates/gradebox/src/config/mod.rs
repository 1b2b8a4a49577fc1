use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

pub use crate::config::toolchain::{
    CompileStep, DEFAULT_TOOLCHAIN_PATH, FileExtension, TestStep, Toolchain,
};
use crate::types::EvalLimits;

mod loader;
pub mod toolchain;

/// Example configuration embedded at compile time.
///
/// Library users can access this to generate a starter config file.
pub const EXAMPLE_CONFIG: &str = include_str!("../../gradebox.example.toml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid characters in file extension")]
    InvalidFileExtChars,

    #[error("failed to read config file at {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Config for the evaluation engine
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Root directory under which every evaluation sandbox is created.
    /// Nothing the engine writes escapes this directory.
    #[serde(default = "default_sandbox_root")]
    pub sandbox_root: PathBuf,

    /// Number of evaluations admitted concurrently
    #[serde(default = "default_worker_slots")]
    pub worker_slots: u32,

    /// Source-file extensions the sanitizer accepts
    #[serde(default = "toolchain::default_allowed_extensions")]
    pub allowed_extensions: Vec<FileExtension>,

    /// Default limits applied to all evaluations.
    /// Overridden per call when the evaluation request specifies limits.
    #[serde(default)]
    pub default_limits: EvalLimits,

    /// Compiler and test-runner commands the engine drives
    pub toolchain: Toolchain,
}

impl Config {
    /// Is the extension on the allow-list?
    pub fn extension_allowed(&self, extension: &str) -> bool {
        self.allowed_extensions
            .iter()
            .any(|e| e.as_str() == extension)
    }

    /// Merge per-call limits with the configured defaults
    pub fn effective_limits(&self, overrides: Option<&EvalLimits>) -> EvalLimits {
        match overrides {
            Some(limits) => self.default_limits.with_overrides(limits),
            None => self.default_limits.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_toml(EXAMPLE_CONFIG).expect("embedded default config should be valid")
    }
}

fn default_sandbox_root() -> PathBuf {
    PathBuf::from("/var/lib/gradebox")
}

fn default_worker_slots() -> u32 {
    4
}
