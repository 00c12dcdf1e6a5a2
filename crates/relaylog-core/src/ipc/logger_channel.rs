//! Responder and requester ends of the logger bridge.
//!
//! ```text
//!  requester A                       responder                      requester B
//!  ───────────                       ─────────                      ───────────
//!  mirror.set_level(Debug, r) ─┐
//!                              └─ setLogLevel ──► directory.set_level
//!                                                    │ emits LevelChange
//!                              ┌──────────────────── ┴ ─────────────────────┐
//!  mirror.set_level (no-op) ◄──┘                                            └──► mirror.set_level
//! ```
//!
//! Requesters mutate their mirror first and then forward; remote changes are
//! applied through the mirror directory's own methods, which never forward,
//! so nothing echoes back.

use std::sync::Arc;

use async_trait::async_trait;
use futures::{future, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use super::channel::{ChannelClient, ServerChannel, ValueStream};
use super::protocol::{
    LogMessage, LoggerCommand, LoggerEvent, ResourceArgs, SetLevelArgs, ON_DID_CHANGE_LOGGERS,
    ON_DID_CHANGE_LOG_LEVEL, ON_DID_CHANGE_VISIBILITY,
};
use super::remote_logger::{CommandQueue, ForwardingLogger, RemoteLoggerFactory};
use crate::directory::{LevelChange, LoggerDirectory, LoggersChange, VisibilityChange};
use crate::error::{LogError, LogResult};
use crate::logging::{LogService, Logger};
use crate::types::{LogLevel, LogResource, LoggerRecord, ScopeId};

/// Target of messages received through `consoleLog`
const CONSOLE_TARGET: &str = "relaylog::console";

/// Responder: serves a [`LoggerDirectory`] to remote requesters.
pub struct LoggerChannel {
    directory: Arc<LoggerDirectory>,
    log_service: Option<Arc<LogService>>,
}

impl LoggerChannel {
    pub fn new(directory: Arc<LoggerDirectory>) -> Self {
        Self {
            directory,
            log_service: None,
        }
    }

    /// Also apply global `setLevel` to the process-wide log service
    pub fn with_log_service(mut self, log_service: Arc<LogService>) -> Self {
        self.log_service = Some(log_service);
        self
    }

    pub fn directory(&self) -> &Arc<LoggerDirectory> {
        &self.directory
    }

    fn handle(&self, command: LoggerCommand) -> LogResult<()> {
        match command {
            LoggerCommand::SetLevel(SetLevelArgs { level, resource: None }) => {
                if let Some(service) = &self.log_service {
                    service.set_level(level);
                }
                self.directory.set_level(level, None);
            }
            LoggerCommand::SetLevel(SetLevelArgs { level, resource }) => {
                self.directory.set_level(level, resource.as_ref());
            }
            LoggerCommand::CreateLogger(record) => {
                self.directory.create_logger(record)?;
            }
            LoggerCommand::RegisterLogger(record) => {
                self.directory.register_logger(record);
            }
            LoggerCommand::DeregisterLogger(ResourceArgs { resource }) => {
                self.directory.deregister_logger(&resource);
            }
            LoggerCommand::SetLogLevel(SetLevelArgs { level, resource }) => {
                self.directory.set_level(level, resource.as_ref());
            }
            LoggerCommand::SetVisibility(VisibilityChange { resource, visible }) => {
                self.directory.set_visibility(&resource, visible);
            }
            LoggerCommand::Log(args) => {
                let logger = self
                    .directory
                    .find_logger(&args.resource)
                    .ok_or_else(|| LogError::LoggerNotCreated(args.resource.to_string()))?;
                for LogMessage { level, message } in args.messages {
                    logger.log(level, &message);
                }
            }
            LoggerCommand::ConsoleLog(LogMessage { level, message }) => {
                console_log(level, &message);
            }
        }
        Ok(())
    }
}

fn console_log(level: LogLevel, message: &str) {
    match level {
        LogLevel::Trace => trace!(target: CONSOLE_TARGET, "{}", message),
        LogLevel::Debug => debug!(target: CONSOLE_TARGET, "{}", message),
        LogLevel::Info => info!(target: CONSOLE_TARGET, "{}", message),
        LogLevel::Warning => warn!(target: CONSOLE_TARGET, "{}", message),
        LogLevel::Error => error!(target: CONSOLE_TARGET, "{}", message),
        LogLevel::Off => {}
    }
}

fn to_values<T, F>(events: crate::events::EventStream<T>, keep: F) -> ValueStream
where
    T: Serialize + Send + 'static,
    F: Fn(&T) -> Option<T> + Send + 'static,
{
    events
        .filter_map(move |event| {
            let value = keep(&event).and_then(|event| serde_json::to_value(event).ok());
            future::ready(value)
        })
        .boxed()
}

#[async_trait]
impl ServerChannel for LoggerChannel {
    async fn call(&self, command: &str, args: Value) -> LogResult<Value> {
        let command = LoggerCommand::decode(command, args)?;
        debug!(command = command.name(), "Handling logger command");
        self.handle(command)?;
        Ok(Value::Null)
    }

    fn listen(&self, event: &str, scope: Option<&ScopeId>) -> LogResult<ValueStream> {
        let scope = scope.cloned();
        let directory = self.directory.clone();

        let stream = match LoggerEvent::parse(event)? {
            LoggerEvent::LogLevel => {
                to_values(directory.subscribe_level_changes(), move |change: &LevelChange| {
                    let interested = change
                        .resource()
                        .map_or(true, |resource| directory.is_interested(resource, scope.as_ref()));
                    interested.then(|| change.clone())
                })
            }
            LoggerEvent::Visibility => {
                to_values(directory.subscribe_visibility(), move |change: &VisibilityChange| {
                    directory
                        .is_interested(&change.resource, scope.as_ref())
                        .then(|| change.clone())
                })
            }
            LoggerEvent::Loggers => {
                to_values(directory.subscribe_loggers(), move |change: &LoggersChange| {
                    let change = change.clone().retain_scope(scope.as_ref());
                    (!change.is_empty()).then_some(change)
                })
            }
        };
        Ok(stream)
    }
}

/// Requester: keeps a mirror directory in sync with a remote responder.
///
/// Mutations and logger creation share one command queue, so the responder
/// applies them in the order they were made here. Dropping the client stops
/// applying remote changes.
pub struct LoggerChannelClient {
    channel: Arc<dyn ChannelClient>,
    commands: CommandQueue,
    directory: Arc<LoggerDirectory>,
    listener: JoinHandle<()>,
}

impl LoggerChannelClient {
    /// Seed a mirror with `loggers` and start following the responder.
    ///
    /// Subscriptions are live before this returns; the level stream replays
    /// the responder's most recent level change.
    pub fn connect(
        channel: Arc<dyn ChannelClient>,
        default_level: LogLevel,
        loggers: Vec<LoggerRecord>,
    ) -> LogResult<Self> {
        let factory = Arc::new(RemoteLoggerFactory::new(channel.clone()));
        let commands = factory.commands().clone();
        let directory = Arc::new(LoggerDirectory::with_loggers(factory, default_level, loggers));

        let levels = channel.listen(ON_DID_CHANGE_LOG_LEVEL)?;
        let visibility = channel.listen(ON_DID_CHANGE_VISIBILITY)?;
        let changes = channel.listen(ON_DID_CHANGE_LOGGERS)?;
        let listener = tokio::spawn(apply_remote_changes(
            directory.clone(),
            levels,
            visibility,
            changes,
        ));

        Ok(Self {
            channel,
            commands,
            directory,
            listener,
        })
    }

    /// The mirror directory
    pub fn directory(&self) -> &Arc<LoggerDirectory> {
        &self.directory
    }

    pub fn scope(&self) -> Option<&ScopeId> {
        self.channel.scope()
    }

    /// `record` owned by this requester: stamped with the channel's scope
    /// unless it already names one. Unstamped records are shared with every
    /// requester.
    pub fn scoped(&self, mut record: LoggerRecord) -> LoggerRecord {
        if record.options.scope.is_none() {
            record.options.scope = self.scope().cloned();
        }
        record
    }

    /// Get or create a logger whose messages end up in the responder's logger
    pub fn create_logger(&self, record: LoggerRecord) -> LogResult<Arc<dyn Logger>> {
        self.directory.create_logger(record)
    }

    pub fn get_logger(&self, resource: &LogResource) -> LogResult<Arc<dyn Logger>> {
        self.directory.get_logger(resource)
    }

    /// Logger printing through the responder's console
    pub fn console_logger(&self, level: LogLevel) -> Arc<dyn Logger> {
        Arc::new(ForwardingLogger::console(self.channel.clone(), level))
    }

    pub async fn register_logger(&self, record: LoggerRecord) -> LogResult<()> {
        self.directory.register_logger(record.clone());
        self.send(LoggerCommand::RegisterLogger(record)).await
    }

    pub async fn deregister_logger(&self, resource: &LogResource) -> LogResult<()> {
        self.directory.deregister_logger(resource);
        self.send(LoggerCommand::DeregisterLogger(ResourceArgs {
            resource: resource.clone(),
        }))
        .await
    }

    /// Directory level: the default, or one logger's level
    pub async fn set_log_level(&self, level: LogLevel, resource: Option<&LogResource>) -> LogResult<()> {
        self.directory.set_level(level, resource);
        self.send(LoggerCommand::SetLogLevel(SetLevelArgs {
            level,
            resource: resource.cloned(),
        }))
        .await
    }

    /// Process-wide level: responder's log service and default level
    pub async fn set_level(&self, level: LogLevel) -> LogResult<()> {
        self.directory.set_level(level, None);
        self.send(LoggerCommand::SetLevel(SetLevelArgs {
            level,
            resource: None,
        }))
        .await
    }

    pub async fn set_visibility(&self, resource: &LogResource, visible: bool) -> LogResult<()> {
        self.directory.set_visibility(resource, visible);
        self.send(LoggerCommand::SetVisibility(VisibilityChange {
            resource: resource.clone(),
            visible,
        }))
        .await
    }

    async fn send(&self, command: LoggerCommand) -> LogResult<()> {
        self.commands.send(command).await
    }
}

impl Drop for LoggerChannelClient {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

fn decode<T: DeserializeOwned>(event: &str, value: Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!(event, error = %e, "Dropping malformed event");
            None
        }
    }
}

async fn apply_remote_changes(
    directory: Arc<LoggerDirectory>,
    levels: ValueStream,
    visibility: ValueStream,
    changes: ValueStream,
) {
    let mut levels = levels.fuse();
    let mut visibility = visibility.fuse();
    let mut changes = changes.fuse();

    loop {
        tokio::select! {
            Some(value) = levels.next() => {
                if let Some(change) = decode::<LevelChange>(ON_DID_CHANGE_LOG_LEVEL, value) {
                    directory.set_level(change.level(), change.resource());
                }
            }
            Some(value) = visibility.next() => {
                if let Some(change) = decode::<VisibilityChange>(ON_DID_CHANGE_VISIBILITY, value) {
                    directory.set_visibility(&change.resource, change.visible);
                }
            }
            Some(value) = changes.next() => {
                if let Some(change) = decode::<LoggersChange>(ON_DID_CHANGE_LOGGERS, value) {
                    for record in change.added {
                        directory.register_logger(record);
                    }
                    for record in change.removed {
                        directory.deregister_logger(&record.resource);
                    }
                }
            }
            else => break,
        }
    }

    debug!("Responder event streams closed");
}
