//! Configuration file loading
//!
//! Handles loading and parsing configuration files using the config crate.

use std::path::Path;

use config::{Config as ConfigBuilder, File, FileFormat};

use crate::config::{Config, ConfigError};

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = ConfigBuilder::builder()
            .add_source(File::from(path))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config = ConfigBuilder::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_slots == 0 {
            return Err(ConfigError::Invalid(
                "worker_slots must be at least 1".to_owned(),
            ));
        }

        if self.allowed_extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "allowed_extensions must not be empty".to_owned(),
            ));
        }
        for ext in &self.allowed_extensions {
            if ext.is_empty() {
                return Err(ConfigError::Invalid(
                    "allowed_extensions entries must not be empty".to_owned(),
                ));
            }
        }

        if self.toolchain.compile.command.is_empty() {
            return Err(ConfigError::Invalid(
                "toolchain has empty compile command".to_owned(),
            ));
        }
        if self.toolchain.test.command.is_empty() {
            return Err(ConfigError::Invalid(
                "toolchain has empty test command".to_owned(),
            ));
        }
        if self.toolchain.artifact_extension.is_empty() {
            return Err(ConfigError::Invalid(
                "toolchain has empty artifact extension".to_owned(),
            ));
        }

        Ok(())
    }
}
