//! Command and event names of the logger bridge and their payloads.
//!
//! | command            | payload                              |
//! |--------------------|--------------------------------------|
//! | `setLevel`         | `{ level, resource? }`               |
//! | `createLogger`     | `LoggerRecord`                       |
//! | `registerLogger`   | `LoggerRecord`                       |
//! | `deregisterLogger` | `{ resource }`                       |
//! | `setLogLevel`      | `{ level, resource? }`               |
//! | `setVisibility`    | `{ resource, visible }`              |
//! | `log`              | `{ resource, messages: [{level, message}] }` |
//! | `consoleLog`       | `{ level, message }`                 |
//!
//! Events: `onDidChangeLogLevel` (`LevelChange`, last one replayed),
//! `onDidChangeVisibility` (`VisibilityChange`), `onDidChangeLoggers`
//! (`LoggersChange`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::directory::VisibilityChange;
use crate::error::{LogError, LogResult};
use crate::types::{LogLevel, LogResource, LoggerRecord};

pub const SET_LEVEL: &str = "setLevel";
pub const CREATE_LOGGER: &str = "createLogger";
pub const REGISTER_LOGGER: &str = "registerLogger";
pub const DEREGISTER_LOGGER: &str = "deregisterLogger";
pub const SET_LOG_LEVEL: &str = "setLogLevel";
pub const SET_VISIBILITY: &str = "setVisibility";
pub const LOG: &str = "log";
pub const CONSOLE_LOG: &str = "consoleLog";

pub const ON_DID_CHANGE_LOG_LEVEL: &str = "onDidChangeLogLevel";
pub const ON_DID_CHANGE_VISIBILITY: &str = "onDidChangeVisibility";
pub const ON_DID_CHANGE_LOGGERS: &str = "onDidChangeLoggers";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetLevelArgs {
    pub level: LogLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<LogResource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceArgs {
    pub resource: LogResource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessage {
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogArgs {
    pub resource: LogResource,
    pub messages: Vec<LogMessage>,
}

/// A decoded bridge command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggerCommand {
    /// Process-wide level (no resource) or one logger's level
    SetLevel(SetLevelArgs),
    CreateLogger(LoggerRecord),
    RegisterLogger(LoggerRecord),
    DeregisterLogger(ResourceArgs),
    /// Directory level: the default (no resource) or one logger's level
    SetLogLevel(SetLevelArgs),
    SetVisibility(VisibilityChange),
    Log(LogArgs),
    ConsoleLog(LogMessage),
}

impl LoggerCommand {
    /// Decode a command by name; unknown names are a protocol mismatch
    pub fn decode(name: &str, args: Value) -> LogResult<Self> {
        let command = match name {
            SET_LEVEL => LoggerCommand::SetLevel(serde_json::from_value(args)?),
            CREATE_LOGGER => LoggerCommand::CreateLogger(serde_json::from_value(args)?),
            REGISTER_LOGGER => LoggerCommand::RegisterLogger(serde_json::from_value(args)?),
            DEREGISTER_LOGGER => LoggerCommand::DeregisterLogger(serde_json::from_value(args)?),
            SET_LOG_LEVEL => LoggerCommand::SetLogLevel(serde_json::from_value(args)?),
            SET_VISIBILITY => LoggerCommand::SetVisibility(serde_json::from_value(args)?),
            LOG => LoggerCommand::Log(serde_json::from_value(args)?),
            CONSOLE_LOG => LoggerCommand::ConsoleLog(serde_json::from_value(args)?),
            other => return Err(LogError::UnknownCommand(other.to_string())),
        };
        Ok(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            LoggerCommand::SetLevel(_) => SET_LEVEL,
            LoggerCommand::CreateLogger(_) => CREATE_LOGGER,
            LoggerCommand::RegisterLogger(_) => REGISTER_LOGGER,
            LoggerCommand::DeregisterLogger(_) => DEREGISTER_LOGGER,
            LoggerCommand::SetLogLevel(_) => SET_LOG_LEVEL,
            LoggerCommand::SetVisibility(_) => SET_VISIBILITY,
            LoggerCommand::Log(_) => LOG,
            LoggerCommand::ConsoleLog(_) => CONSOLE_LOG,
        }
    }

    pub fn args(&self) -> LogResult<Value> {
        let value = match self {
            LoggerCommand::SetLevel(args) | LoggerCommand::SetLogLevel(args) => {
                serde_json::to_value(args)?
            }
            LoggerCommand::CreateLogger(record) | LoggerCommand::RegisterLogger(record) => {
                serde_json::to_value(record)?
            }
            LoggerCommand::DeregisterLogger(args) => serde_json::to_value(args)?,
            LoggerCommand::SetVisibility(change) => serde_json::to_value(change)?,
            LoggerCommand::Log(args) => serde_json::to_value(args)?,
            LoggerCommand::ConsoleLog(message) => serde_json::to_value(message)?,
        };
        Ok(value)
    }
}

/// Events a responder can be listened to for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerEvent {
    LogLevel,
    Visibility,
    Loggers,
}

impl LoggerEvent {
    pub fn parse(name: &str) -> LogResult<Self> {
        match name {
            ON_DID_CHANGE_LOG_LEVEL => Ok(LoggerEvent::LogLevel),
            ON_DID_CHANGE_VISIBILITY => Ok(LoggerEvent::Visibility),
            ON_DID_CHANGE_LOGGERS => Ok(LoggerEvent::Loggers),
            other => Err(LogError::UnknownEvent(other.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LoggerEvent::LogLevel => ON_DID_CHANGE_LOG_LEVEL,
            LoggerEvent::Visibility => ON_DID_CHANGE_VISIBILITY,
            LoggerEvent::Loggers => ON_DID_CHANGE_LOGGERS,
        }
    }
}
