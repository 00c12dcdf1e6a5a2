//! Rendering of a single log entry.
//!
//! Formatted entries look like:
//!
//! ```text
//! 2026-01-21 14:30:45.123 [info] Connected to peer
//! ```
//!
//! Fields are zero padded, the time is local, and the line ends with `\n`.
//! Raw entries are the message verbatim.

use chrono::{DateTime, Local};

use crate::types::LogLevel;

/// Timestamp layout: `YYYY-MM-DD HH:MM:SS.mmm`
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// A message accepted by a logger, ready to be rendered.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    /// Create a new entry stamped with the current local time.
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self::at(Local::now(), level, message)
    }

    pub fn at(timestamp: DateTime<Local>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            level,
            message: message.into(),
        }
    }

    /// Render as `timestamp [level] message\n`.
    pub fn to_line(&self) -> String {
        format!(
            "{} [{}] {}\n",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.level.format_name(),
            self.message
        )
    }

    /// Render for a writer; raw mode appends the message untouched.
    pub fn render(&self, raw: bool) -> String {
        if raw {
            self.message.clone()
        } else {
            self.to_line()
        }
    }
}
