//! Durable, size-bounded, rotating file writer.
//!
//! Each [`FileLogger`] owns one resource and one background worker task.
//! The worker is the only code that touches the file, and it processes
//! write tasks strictly one at a time in submission order:
//!
//! ```text
//! log() ──► mpsc queue ──► worker
//!                           ├── wait for initialization (once, before any task)
//!                           ├── read current content   (failure ⇒ empty)
//!                           ├── content > max size?    ⇒ copy to <path>_<slot>, reset
//!                           ├── append entry
//!                           └── write whole content back
//! ```
//!
//! Rotation backups live next to the primary file as `<basename>_1` ..
//! `<basename>_5`, reused cyclically.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::entry::LogEntry;
use super::logger::{LevelGate, Logger};
use crate::error::{LogError, LogResult};
use crate::storage::{FileOperationError, FileService};
use crate::types::{LogLevel, LogResource, LoggerOptions};

/// Content size above which the next write rotates (5 MiB)
pub const DEFAULT_MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// Number of rotation backups kept per logger
pub const MAX_BACKUP_SLOTS: u8 = 5;

/// Configuration for file writers.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Rotation happens once stored content is strictly larger than this
    pub max_file_size: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// Make sure the backing resource exists.
///
/// Idempotent: a resource that exists, or that another actor creates
/// between our check and our create (`FileExists` / `FileModifiedSince`),
/// counts as success.
pub async fn ensure_log_file(
    file_service: &dyn FileService,
    resource: &LogResource,
) -> Result<(), FileOperationError> {
    if file_service.exists(resource).await {
        return Ok(());
    }
    match file_service.create_file(resource).await {
        Ok(()) => Ok(()),
        Err(e) if e.code.is_benign_on_create() => {
            debug!(%resource, code = %e.code, "Log file created concurrently");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Cyclic backup slot counter in `1..=MAX_BACKUP_SLOTS`.
#[derive(Debug)]
pub struct BackupRotation {
    next: u8,
}

impl BackupRotation {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Take the slot for this rotation and advance
    pub fn next_slot(&mut self) -> u8 {
        let slot = self.next;
        self.next = if slot >= MAX_BACKUP_SLOTS { 1 } else { slot + 1 };
        slot
    }
}

impl Default for BackupRotation {
    fn default() -> Self {
        Self::new()
    }
}

/// Completion of one queued write.
///
/// Dropping the handle is fine; the write still happens.
pub struct WriteHandle {
    rx: oneshot::Receiver<LogResult<()>>,
}

impl WriteHandle {
    /// Wait until the entry is on disk (or the task failed).
    pub async fn completed(self) -> LogResult<()> {
        self.rx.await.unwrap_or(Err(LogError::QueueClosed))
    }
}

struct WriteTask {
    content: String,
    done: oneshot::Sender<LogResult<()>>,
}

/// Logger persisting to one resource through a single-writer queue.
///
/// Must be created inside a Tokio runtime: construction spawns the worker.
/// Dropping the logger closes the queue; already queued entries are still
/// written.
pub struct FileLogger {
    resource: LogResource,
    gate: LevelGate,
    raw: bool,
    queue: mpsc::UnboundedSender<WriteTask>,
}

impl FileLogger {
    pub fn new(
        resource: LogResource,
        level: LogLevel,
        options: &LoggerOptions,
        file_service: Arc<dyn FileService>,
        config: WriterConfig,
    ) -> Self {
        let (queue, rx) = mpsc::unbounded_channel();

        let worker = WriteWorker {
            resource: resource.clone(),
            file_service,
            max_file_size: config.max_file_size,
            rotation: BackupRotation::new(),
        };
        tokio::spawn(worker.run(rx));

        Self {
            resource,
            gate: LevelGate::new(level, options.always_log),
            raw: options.donot_use_formatters,
            queue,
        }
    }

    pub fn resource(&self) -> &LogResource {
        &self.resource
    }

    /// Queue a message and get a handle on its completion.
    ///
    /// Returns `None` when the level gate drops the message.
    pub fn write(&self, level: LogLevel, message: &str) -> Option<WriteHandle> {
        if !self.gate.should_log(level) {
            return None;
        }
        let content = LogEntry::new(level, message).render(self.raw);
        Some(self.enqueue(content))
    }

    fn enqueue(&self, content: String) -> WriteHandle {
        let (done, rx) = oneshot::channel();
        if let Err(mpsc::error::SendError(task)) = self.queue.send(WriteTask { content, done }) {
            let _ = task.done.send(Err(LogError::QueueClosed));
        }
        WriteHandle { rx }
    }
}

impl Logger for FileLogger {
    fn level(&self) -> LogLevel {
        self.gate.level()
    }

    fn set_level(&self, level: LogLevel) {
        self.gate.set_level(level);
    }

    fn log(&self, level: LogLevel, message: &str) {
        let _ = self.write(level, message);
    }
}

struct WriteWorker {
    resource: LogResource,
    file_service: Arc<dyn FileService>,
    max_file_size: usize,
    rotation: BackupRotation,
}

impl WriteWorker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<WriteTask>) {
        let init = ensure_log_file(self.file_service.as_ref(), &self.resource).await;
        if let Err(e) = &init {
            warn!(resource = %self.resource, error = %e, "Failed to create log file");
        }

        while let Some(task) = rx.recv().await {
            let result = match &init {
                Ok(()) => self.append(&task.content).await,
                Err(e) => Err(LogError::Initialization(e.to_string())),
            };
            if let (Err(e), Ok(())) = (&result, &init) {
                warn!(resource = %self.resource, error = %e, "Failed to write log entry");
            }
            let _ = task.done.send(result);
        }

        debug!(resource = %self.resource, "Write queue closed");
    }

    async fn append(&mut self, entry: &str) -> LogResult<()> {
        // Unreadable content is treated as empty: the write goes through and
        // replaces whatever was there. Availability is preferred over
        // detecting a damaged file.
        let mut content = match self.file_service.read_file(&self.resource).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                debug!(resource = %self.resource, error = %e, "Read failed, starting from empty content");
                String::new()
            }
        };

        if content.len() > self.max_file_size {
            let backup = self.resource.backup(self.rotation.next_slot());
            info!(
                resource = %self.resource,
                %backup,
                bytes = content.len(),
                "Rotating log file"
            );
            self.file_service
                .write_file(&backup, Bytes::from(content))
                .await?;
            content = String::new();
        }

        content.push_str(entry);
        self.file_service
            .write_file(&self.resource, Bytes::from(content))
            .await?;
        Ok(())
    }
}
