//! [`LoggerFactory`] producing file loggers.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use super::buffer::BufferLogger;
use super::logger::Logger;
use super::writer::{FileLogger, WriterConfig};
use crate::directory::LoggerFactory;
use crate::error::LogResult;
use crate::storage::FileService;
use crate::types::{LogLevel, LoggerRecord};

/// Creates a [`FileLogger`] per directory entry.
///
/// With a readiness gate attached, loggers requested before the storage
/// provider reports ready are [`BufferLogger`]s that switch to their file
/// logger once it does.
pub struct FileLoggerFactory {
    file_service: Arc<dyn FileService>,
    config: WriterConfig,
    readiness: Option<watch::Receiver<bool>>,
}

impl FileLoggerFactory {
    pub fn new(file_service: Arc<dyn FileService>, config: WriterConfig) -> Self {
        Self {
            file_service,
            config,
            readiness: None,
        }
    }

    /// Hold writes until `ready` becomes `true`
    pub fn with_readiness(mut self, ready: watch::Receiver<bool>) -> Self {
        self.readiness = Some(ready);
        self
    }

    pub fn is_ready(&self) -> bool {
        self.readiness.as_ref().map_or(true, |ready| *ready.borrow())
    }
}

impl LoggerFactory for FileLoggerFactory {
    fn create_logger(&self, record: &LoggerRecord, level: LogLevel) -> LogResult<Arc<dyn Logger>> {
        let mut ready = match &self.readiness {
            Some(ready) if !*ready.borrow() => ready.clone(),
            _ => {
                return Ok(Arc::new(FileLogger::new(
                    record.resource.clone(),
                    level,
                    &record.options,
                    self.file_service.clone(),
                    self.config.clone(),
                )));
            }
        };

        debug!(resource = %record.resource, "Storage not ready, buffering");
        let buffer = Arc::new(BufferLogger::new(level, record.options.always_log));

        let target = buffer.clone();
        let record = record.clone();
        let file_service = self.file_service.clone();
        let config = self.config.clone();
        tokio::spawn(async move {
            let became_ready = ready.wait_for(|ready| *ready).await.map(|_| ());
            if became_ready.is_err() {
                warn!(resource = %record.resource, "Storage readiness dropped, messages stay buffered");
                return;
            }
            let logger = FileLogger::new(
                record.resource.clone(),
                target.level(),
                &record.options,
                file_service,
                config,
            );
            target.set_logger(Arc::new(logger));
        });

        Ok(buffer)
    }
}
