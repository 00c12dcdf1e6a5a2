//! Keeps a child process's log level in step with its parent.
//!
//! The parent serves its [`LogService`] through a [`LogLevelChannel`]; the
//! child wraps its own service in a [`FollowerLogService`]. Level changes go
//! both ways: the child's `set_level` is sent up, and every parent level
//! change (the latest one replayed on connect) is applied locally.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{future, StreamExt};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::channel::{ChannelClient, ServerChannel, ValueStream};
use super::protocol::{LoggerCommand, SetLevelArgs, ON_DID_CHANGE_LOG_LEVEL};
use super::remote_logger::CommandQueue;
use crate::directory::LoggerDirectory;
use crate::error::{LogError, LogResult};
use crate::logging::{LogService, Logger};
use crate::types::{LogLevel, LogResource, ScopeId};

/// Parent side: `setLevel` and `onDidChangeLogLevel` over a log service.
pub struct LogLevelChannel {
    log_service: Arc<LogService>,
    directory: Option<Arc<LoggerDirectory>>,
}

impl LogLevelChannel {
    pub fn new(log_service: Arc<LogService>) -> Self {
        Self {
            log_service,
            directory: None,
        }
    }

    /// Route per-resource and default levels into `directory` too
    pub fn with_directory(mut self, directory: Arc<LoggerDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }
}

#[async_trait]
impl ServerChannel for LogLevelChannel {
    async fn call(&self, command: &str, args: Value) -> LogResult<Value> {
        match LoggerCommand::decode(command, args)? {
            LoggerCommand::SetLevel(SetLevelArgs { level, resource: None }) => {
                self.log_service.set_level(level);
                if let Some(directory) = &self.directory {
                    directory.set_level(level, None);
                }
            }
            LoggerCommand::SetLevel(SetLevelArgs {
                level,
                resource: Some(resource),
            }) => match &self.directory {
                Some(directory) => {
                    directory.set_level(level, Some(&resource));
                }
                None => debug!(%resource, "No directory, ignoring resource level"),
            },
            other => return Err(LogError::UnknownCommand(other.name().to_string())),
        }
        Ok(Value::Null)
    }

    fn listen(&self, event: &str, _scope: Option<&ScopeId>) -> LogResult<ValueStream> {
        if event != ON_DID_CHANGE_LOG_LEVEL {
            return Err(LogError::UnknownEvent(event.to_string()));
        }
        let stream = self
            .log_service
            .subscribe_level_changes()
            .filter_map(|level| future::ready(serde_json::to_value(level).ok()))
            .boxed();
        Ok(stream)
    }
}

/// Child side of a [`LogLevelChannel`].
///
/// Clones share one command queue; the parent applies level requests in the
/// order they were made.
#[derive(Clone)]
pub struct LogLevelChannelClient {
    channel: Arc<dyn ChannelClient>,
    commands: CommandQueue,
}

impl LogLevelChannelClient {
    /// Must be called inside a Tokio runtime
    pub fn new(channel: Arc<dyn ChannelClient>) -> Self {
        let commands = CommandQueue::spawn(channel.clone());
        Self { channel, commands }
    }

    /// Ask the parent to change its level, or one logger's level
    pub async fn set_level(&self, level: LogLevel, resource: Option<LogResource>) -> LogResult<()> {
        self.commands
            .send(LoggerCommand::SetLevel(SetLevelArgs { level, resource }))
            .await
    }

    /// Queue a level request without waiting; failures are logged
    fn request_level(&self, level: LogLevel) {
        drop(self.commands.enqueue(LoggerCommand::SetLevel(SetLevelArgs {
            level,
            resource: None,
        })));
    }

    /// Parent level changes, starting with the latest one if any
    pub fn on_did_change_log_level(&self) -> LogResult<BoxStream<'static, LogLevel>> {
        let stream = self
            .channel
            .listen(ON_DID_CHANGE_LOG_LEVEL)?
            .filter_map(|value| {
                let level = serde_json::from_value::<LogLevel>(value)
                    .map_err(|e| warn!(error = %e, "Dropping malformed level change"))
                    .ok();
                future::ready(level)
            })
            .boxed();
        Ok(stream)
    }
}

/// Log service that follows, and drives, a parent's level.
pub struct FollowerLogService {
    parent: LogLevelChannelClient,
    service: Arc<LogService>,
    listener: JoinHandle<()>,
}

impl FollowerLogService {
    /// Start following `parent`; must be called inside a Tokio runtime
    pub fn new(parent: LogLevelChannelClient, service: Arc<LogService>) -> LogResult<Arc<Self>> {
        let mut changes = parent.on_did_change_log_level()?;
        let target = service.clone();
        let listener = tokio::spawn(async move {
            while let Some(level) = changes.next().await {
                debug!(%level, "Applying parent log level");
                target.set_level(level);
            }
        });

        Ok(Arc::new(Self {
            parent,
            service,
            listener,
        }))
    }

    pub fn service(&self) -> &Arc<LogService> {
        &self.service
    }

    /// Set the level locally and wait until the parent acknowledged it
    pub async fn propagate_level(&self, level: LogLevel) -> LogResult<()> {
        self.service.set_level(level);
        self.parent.set_level(level, None).await
    }
}

impl Logger for FollowerLogService {
    fn level(&self) -> LogLevel {
        self.service.level()
    }

    /// Applies locally at once; the parent is told in the background, in
    /// call order
    fn set_level(&self, level: LogLevel) {
        self.service.set_level(level);
        self.parent.request_level(level);
    }

    fn log(&self, level: LogLevel, message: &str) {
        self.service.log(level, message);
    }

    fn flush(&self) {
        self.service.flush();
    }
}

impl Drop for FollowerLogService {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
