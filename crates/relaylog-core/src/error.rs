//! Error types for relaylog

use thiserror::Error;

use crate::storage::FileOperationError;

/// Main error type for relaylog operations
#[derive(Error, Debug)]
pub enum LogError {
    /// Storage collaborator reported a failure
    #[error("File error: {0}")]
    File(#[from] FileOperationError),

    /// The backing resource could not be created; every queued write fails with this
    #[error("Logger initialization failed: {0}")]
    Initialization(String),

    /// A `log` call arrived for a resource that has no created logger
    #[error("Logger not created: {0}")]
    LoggerNotCreated(String),

    /// The write queue worker is gone
    #[error("Write queue closed")]
    QueueClosed,

    /// Unknown remote command name (protocol mismatch)
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Unknown remote event name (protocol mismatch)
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    /// Transport-level failure
    #[error("Channel error: {0}")]
    Channel(String),

    /// Error during serialization/deserialization of wire payloads
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Log level string could not be parsed
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using LogError
pub type LogResult<T> = Result<T, LogError>;
