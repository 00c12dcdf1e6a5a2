//! Loggers living on the requester side of the bridge.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use super::channel::ChannelClient;
use super::protocol::{LogArgs, LogMessage, LoggerCommand};
use crate::directory::LoggerFactory;
use crate::error::{LogError, LogResult};
use crate::logging::{BufferLogger, LevelGate, Logger};
use crate::types::{LogLevel, LogResource, LoggerRecord};

/// Sends a command through `channel`, discarding the result value
pub(crate) async fn send_command(channel: &dyn ChannelClient, command: LoggerCommand) -> LogResult<()> {
    let args = command.args()?;
    channel.call(command.name(), args).await.map(|_| ())
}

type Reply = oneshot::Sender<LogResult<()>>;

/// Ordered outbox for commands to a responder.
///
/// One task sends queued commands one at a time, so the responder handles
/// them in enqueue order. Clones share the same queue.
#[derive(Clone)]
pub(crate) struct CommandQueue {
    tx: mpsc::UnboundedSender<(LoggerCommand, Reply)>,
}

impl CommandQueue {
    /// Must be called inside a Tokio runtime
    pub(crate) fn spawn(channel: Arc<dyn ChannelClient>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_commands(channel, rx));
        Self { tx }
    }

    /// Queue `command`; the receiver resolves once the responder handled it
    pub(crate) fn enqueue(&self, command: LoggerCommand) -> oneshot::Receiver<LogResult<()>> {
        let (reply, rx) = oneshot::channel();
        // On a closed queue the reply sender is dropped and `rx` reports it
        let _ = self.tx.send((command, reply));
        rx
    }

    pub(crate) async fn send(&self, command: LoggerCommand) -> LogResult<()> {
        outcome(self.enqueue(command).await)
    }
}

pub(crate) fn outcome(reply: Result<LogResult<()>, oneshot::error::RecvError>) -> LogResult<()> {
    reply.unwrap_or_else(|_| Err(LogError::Channel("command queue closed".to_string())))
}

async fn run_commands(
    channel: Arc<dyn ChannelClient>,
    mut rx: mpsc::UnboundedReceiver<(LoggerCommand, Reply)>,
) {
    while let Some((command, reply)) = rx.recv().await {
        let name = command.name();
        let result = send_command(channel.as_ref(), command).await;
        // Nobody waits for fire-and-forget commands; report their failures here
        if let Err(Err(e)) = reply.send(result) {
            warn!(command = name, error = %e, "Queued command failed");
        }
    }
}

#[derive(Debug, Clone)]
enum ForwardTarget {
    /// `log` to the responder's logger for this resource
    Resource(LogResource),
    /// `consoleLog` to the responder's console
    Console,
}

/// Logger that ships every accepted message to the responder.
///
/// A single pump task sends messages in the order they were logged;
/// messages that piled up while a call was in flight go out as one batch.
pub struct ForwardingLogger {
    gate: LevelGate,
    queue: mpsc::UnboundedSender<LogMessage>,
}

impl ForwardingLogger {
    /// Forward to the responder's logger for `resource`
    pub fn new(
        channel: Arc<dyn ChannelClient>,
        resource: LogResource,
        level: LogLevel,
        always_log: bool,
    ) -> Self {
        Self::spawn(channel, ForwardTarget::Resource(resource), level, always_log)
    }

    /// Forward to the responder's console
    pub fn console(channel: Arc<dyn ChannelClient>, level: LogLevel) -> Self {
        Self::spawn(channel, ForwardTarget::Console, level, false)
    }

    fn spawn(
        channel: Arc<dyn ChannelClient>,
        target: ForwardTarget,
        level: LogLevel,
        always_log: bool,
    ) -> Self {
        let (queue, rx) = mpsc::unbounded_channel();
        tokio::spawn(pump(channel, target, rx));
        Self {
            gate: LevelGate::new(level, always_log),
            queue,
        }
    }
}

impl Logger for ForwardingLogger {
    fn level(&self) -> LogLevel {
        self.gate.level()
    }

    fn set_level(&self, level: LogLevel) {
        self.gate.set_level(level);
    }

    fn log(&self, level: LogLevel, message: &str) {
        if self.gate.should_log(level) {
            let _ = self.queue.send(LogMessage {
                level,
                message: message.to_string(),
            });
        }
    }
}

async fn pump(
    channel: Arc<dyn ChannelClient>,
    target: ForwardTarget,
    mut rx: mpsc::UnboundedReceiver<LogMessage>,
) {
    while let Some(first) = rx.recv().await {
        let mut batch = vec![first];
        while let Ok(next) = rx.try_recv() {
            batch.push(next);
        }

        let commands = match &target {
            ForwardTarget::Resource(resource) => vec![LoggerCommand::Log(LogArgs {
                resource: resource.clone(),
                messages: batch,
            })],
            ForwardTarget::Console => batch.into_iter().map(LoggerCommand::ConsoleLog).collect(),
        };

        for command in commands {
            if let Err(e) = send_command(channel.as_ref(), command).await {
                warn!(destination = ?target, error = %e, "Failed to forward log messages");
            }
        }
    }
}

/// Factory for a requester's mirror directory.
///
/// Hands out a [`BufferLogger`] right away and queues `createLogger` on the
/// requester's command queue, so the responder sees it before any later
/// mutation of the same logger. A [`ForwardingLogger`] is attached once the
/// responder created the logger; if that fails the buffer is discarded.
pub struct RemoteLoggerFactory {
    channel: Arc<dyn ChannelClient>,
    commands: CommandQueue,
}

impl RemoteLoggerFactory {
    /// Must be called inside a Tokio runtime
    pub fn new(channel: Arc<dyn ChannelClient>) -> Self {
        let commands = CommandQueue::spawn(channel.clone());
        Self { channel, commands }
    }

    pub(crate) fn commands(&self) -> &CommandQueue {
        &self.commands
    }
}

impl LoggerFactory for RemoteLoggerFactory {
    fn create_logger(&self, record: &LoggerRecord, level: LogLevel) -> LogResult<Arc<dyn Logger>> {
        Ok(self.create_buffered(record, level))
    }
}

impl RemoteLoggerFactory {
    fn create_buffered(&self, record: &LoggerRecord, level: LogLevel) -> Arc<BufferLogger> {
        let buffer = Arc::new(BufferLogger::new(level, record.options.always_log));
        let created = self
            .commands
            .enqueue(LoggerCommand::CreateLogger(record.clone()));

        let target = buffer.clone();
        let channel = self.channel.clone();
        let resource = record.resource.clone();
        let always_log = record.options.always_log;
        tokio::spawn(async move {
            match outcome(created.await) {
                Ok(()) => {
                    let forwarding =
                        ForwardingLogger::new(channel, resource, target.level(), always_log);
                    target.set_logger(Arc::new(forwarding));
                }
                Err(e) => {
                    let dropped = target.discard();
                    warn!(
                        %resource,
                        error = %e,
                        dropped,
                        "Remote logger creation failed, discarding its messages"
                    );
                }
            }
        });

        buffer
    }
}
