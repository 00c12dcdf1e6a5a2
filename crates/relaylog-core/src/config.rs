//! Logging configuration.
//!
//! ```json
//! { "level": "debug", "maxFileSize": 1048576, "raw": false }
//! ```
//!
//! Every key is optional. `RELAYLOG_LEVEL` overrides `level`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LogError, LogResult};
use crate::logging::{WriterConfig, DEFAULT_MAX_FILE_SIZE};
use crate::types::{LogLevel, LoggerOptions, DEFAULT_LOG_LEVEL};

/// Environment variable overriding the configured level
pub const LEVEL_ENV: &str = "RELAYLOG_LEVEL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggingConfig {
    pub level: LogLevel,
    /// Rotation threshold in bytes
    pub max_file_size: usize,
    /// Write messages without timestamp and level
    pub raw: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            raw: false,
        }
    }
}

impl LoggingConfig {
    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> LogResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| LogError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `RELAYLOG_LEVEL` if set
    pub fn with_env_overrides(self) -> LogResult<Self> {
        match std::env::var(LEVEL_ENV) {
            Ok(value) => self.with_level_override(&value),
            Err(_) => Ok(self),
        }
    }

    fn with_level_override(mut self, value: &str) -> LogResult<Self> {
        self.level = value.parse()?;
        Ok(self)
    }

    pub fn validate(&self) -> LogResult<()> {
        if self.max_file_size == 0 {
            return Err(LogError::Config("maxFileSize must be greater than 0".into()));
        }
        Ok(())
    }

    pub fn writer_config(&self) -> WriterConfig {
        WriterConfig {
            max_file_size: self.max_file_size,
        }
    }

    pub fn logger_options(&self) -> LoggerOptions {
        LoggerOptions {
            donot_use_formatters: self.raw,
            ..Default::default()
        }
    }
}
