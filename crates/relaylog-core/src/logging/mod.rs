//! Logger implementations and the durable write pipeline.
//!
//! ## Architecture
//!
//! ```text
//! producer ──log()──► BufferLogger ──(once storage is ready)──► FileLogger
//!                                                                 │
//!                                                          single worker
//!                                                                 ▼
//!                                               main.log, main.log_1 .. main.log_5
//! ```
//!
//! - [`FileLogger`]: one resource, one FIFO worker, size-triggered rotation
//! - [`BufferLogger`]: holds messages until its target exists
//! - [`LogService`]: process-wide primary logger with a level-change event
//! - [`LoggerLayer`]: feeds `tracing` events into any [`Logger`]
//! - [`FileLoggerFactory`]: creates file loggers for a [`crate::LoggerDirectory`]
//!
//! ## Usage
//!
//! ```ignore
//! use relaylog_core::logging::{FileLogger, Logger, WriterConfig};
//! use relaylog_core::storage::DiskFileService;
//!
//! let logger = FileLogger::new(
//!     "/var/log/app/main.log".into(),
//!     LogLevel::Info,
//!     &LoggerOptions::default(),
//!     Arc::new(DiskFileService::new()),
//!     WriterConfig::default(),
//! );
//! logger.info("started");
//! ```

pub mod buffer;
pub mod entry;
pub mod factory;
pub mod layer;
pub mod logger;
pub mod service;
pub mod writer;

// Re-exports for convenience
pub use buffer::{BufferLogger, PendingMessage};
pub use entry::LogEntry;
pub use factory::FileLoggerFactory;
pub use layer::LoggerLayer;
pub use logger::{LevelGate, Logger};
pub use service::LogService;
pub use writer::{
    ensure_log_file, BackupRotation, FileLogger, WriteHandle, WriterConfig, DEFAULT_MAX_FILE_SIZE,
    MAX_BACKUP_SLOTS,
};
