//! relaylog Core Library
//!
//! Ordered, crash-tolerant logging shared across process boundaries.
//!
//! ## Overview
//!
//! Producers in any process log leveled messages to loggers identified by a
//! resource (normally a file path). One process owns the disk: it runs a
//! single-writer queue per resource that rotates files once they grow past
//! a size limit. Other processes hold mirrors of the owner's logger
//! directory and forward their messages and control changes to it.
//!
//! ## Core Principles
//!
//! - **Single writer**: one FIFO worker per resource, one read-modify-write in flight
//! - **Never block the producer**: `log` enqueues, buffers or forwards
//! - **Convergence**: levels, registrations and visibility propagate as
//!   ordered, lossless events from the owner to every mirror
//!
//! ## Quick Start
//!
//! ```ignore
//! use relaylog_core::{FileLoggerFactory, LoggerDirectory, LogLevel, DiskFileService, WriterConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let factory = FileLoggerFactory::new(Arc::new(DiskFileService::new()), WriterConfig::default());
//!     let directory = Arc::new(LoggerDirectory::new(Arc::new(factory), LogLevel::Info));
//!
//!     let logger = directory.get_logger(&"/var/log/app/main.log".into())?;
//!     logger.info("started");
//!
//!     // Serve the directory to other processes
//!     let responder = Arc::new(LoggerChannel::new(directory.clone()));
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod directory;
pub mod error;
pub mod events;
pub mod ipc;
pub mod logging;
pub mod storage;
pub mod types;

// Re-exports
pub use config::LoggingConfig;
pub use directory::{LevelChange, LoggerDirectory, LoggerFactory, LoggersChange, VisibilityChange};
pub use error::{LogError, LogResult};
pub use events::{Emitter, EventStream, ReplayEmitter};
pub use ipc::{
    ChannelClient, FollowerLogService, InProcessChannel, LogLevelChannel, LogLevelChannelClient,
    LoggerChannel, LoggerChannelClient, ServerChannel,
};
pub use logging::{
    BufferLogger, FileLogger, FileLoggerFactory, LogService, Logger, LoggerLayer, WriterConfig,
};
pub use storage::{DiskFileService, FileErrorCode, FileOperationError, FileService, InMemoryFileService};
pub use types::*;
