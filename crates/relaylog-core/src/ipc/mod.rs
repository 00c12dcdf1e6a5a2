//! Cross-process propagation of loggers and levels.
//!
//! ## Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  LoggerChannel (responder, owns the authoritative directory)    │
//! │  ├── commands: setLevel, createLogger, registerLogger,          │
//! │  │             deregisterLogger, setLogLevel, setVisibility,    │
//! │  │             log, consoleLog                                  │
//! │  └── events:   onDidChangeLogLevel, onDidChangeVisibility,      │
//! │                onDidChangeLoggers   (filtered by scope)         │
//! │                                                                 │
//! │  LoggerChannelClient (requester, owns a mirror directory)       │
//! │  ├── forwards local mutations as commands                       │
//! │  └── applies responder events to the mirror                     │
//! │                                                                 │
//! │  LogLevelChannel / FollowerLogService                           │
//! │  └── two-way level sync between a parent and a child process    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod channel;
pub mod level_channel;
pub mod logger_channel;
pub mod protocol;
pub mod remote_logger;

pub use channel::{ChannelClient, InProcessChannel, ServerChannel, ValueStream};
pub use level_channel::{FollowerLogService, LogLevelChannel, LogLevelChannelClient};
pub use logger_channel::{LoggerChannel, LoggerChannelClient};
pub use protocol::{LoggerCommand, LoggerEvent};
pub use remote_logger::{ForwardingLogger, RemoteLoggerFactory};
