//! Core types for relaylog

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LogError;

/// Level every directory starts with unless told otherwise
pub const DEFAULT_LOG_LEVEL: LogLevel = LogLevel::Info;

/// Log severity, ordered from most to least verbose
#[repr(u8)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    #[default]
    Info = 2,
    Warning = 3,
    Error = 4,
    /// Disables output for a logger
    Off = 5,
}

impl LogLevel {
    /// All levels in ascending order
    pub const ALL: [LogLevel; 6] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Off,
    ];

    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Create from u8 value (returns None if invalid)
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(LogLevel::Trace),
            1 => Some(LogLevel::Debug),
            2 => Some(LogLevel::Info),
            3 => Some(LogLevel::Warning),
            4 => Some(LogLevel::Error),
            5 => Some(LogLevel::Off),
            _ => None,
        }
    }

    /// Level name as used in configuration and on the wire
    pub const fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }

    /// Name rendered inside a formatted log line; `Off` renders as empty.
    pub const fn format_name(self) -> &'static str {
        match self {
            LogLevel::Off => "",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" | "critical" => Ok(LogLevel::Error),
            "off" => Ok(LogLevel::Off),
            _ => Err(LogError::InvalidLevel(s.to_string())),
        }
    }
}

impl From<tracing::Level> for LogLevel {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => LogLevel::Trace,
            tracing::Level::DEBUG => LogLevel::Debug,
            tracing::Level::INFO => LogLevel::Info,
            tracing::Level::WARN => LogLevel::Warning,
            tracing::Level::ERROR => LogLevel::Error,
        }
    }
}

/// Destination of a logger, normally a file path.
///
/// Serialized as a plain string so it survives the process boundary;
/// deserializing one revives it into a usable handle.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogResource(PathBuf);

impl LogResource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Resource of the rotation backup for `slot`: `<dirname>/<basename>_<slot>`
    pub fn backup(&self, slot: u8) -> LogResource {
        let basename = self
            .0
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = format!("{}_{}", basename, slot);
        match self.0.parent() {
            Some(dir) => LogResource(dir.join(name)),
            None => LogResource(PathBuf::from(name)),
        }
    }
}

impl fmt::Display for LogResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl From<&str> for LogResource {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<PathBuf> for LogResource {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

/// Identifier of a requester (window/session) used to scope events
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeId(pub String);

impl ScopeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-logger behaviour flags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggerOptions {
    /// Append messages verbatim: no timestamp, no level, no newline
    pub donot_use_formatters: bool,
    /// Emit regardless of the level gate
    pub always_log: bool,
    /// Requester that registered this logger, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<ScopeId>,
    /// Display name for presentation layers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Directory entry describing one known logger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggerRecord {
    pub resource: LogResource,
    /// Explicit level; `None` follows the directory default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<LogLevel>,
    /// Whether presentation layers surface this logger; no effect on writes
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub options: LoggerOptions,
}

fn default_visible() -> bool {
    true
}

impl LoggerRecord {
    pub fn new(resource: impl Into<LogResource>) -> Self {
        Self {
            resource: resource.into(),
            level: None,
            visible: true,
            options: LoggerOptions::default(),
        }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_options(mut self, options: LoggerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Level this logger runs at given the directory default
    pub fn effective_level(&self, default_level: LogLevel) -> LogLevel {
        self.level.unwrap_or(default_level)
    }

    pub fn scope(&self) -> Option<&ScopeId> {
        self.options.scope.as_ref()
    }
}
