//! Process-wide log service.

use std::sync::Arc;

use parking_lot::Mutex;

use super::logger::Logger;
use crate::events::{EventStream, ReplayEmitter};
use crate::types::LogLevel;

/// Primary logger of a process plus a level-change event.
///
/// Level changes are emitted only when the level actually changes, and late
/// subscribers receive the most recent change first.
pub struct LogService {
    logger: Arc<dyn Logger>,
    level_events: ReplayEmitter<LogLevel>,
    // Serializes compare, set and emit so events follow set order
    level_lock: Mutex<()>,
}

impl LogService {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            logger,
            level_events: ReplayEmitter::new(),
            level_lock: Mutex::new(()),
        }
    }

    pub fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }

    pub fn subscribe_level_changes(&self) -> EventStream<LogLevel> {
        self.level_events.subscribe()
    }
}

impl Logger for LogService {
    fn level(&self) -> LogLevel {
        self.logger.level()
    }

    fn set_level(&self, level: LogLevel) {
        let _guard = self.level_lock.lock();
        if self.logger.level() == level {
            return;
        }
        self.logger.set_level(level);
        self.level_events.emit(level);
    }

    fn log(&self, level: LogLevel, message: &str) {
        self.logger.log(level, message);
    }

    fn flush(&self) {
        self.logger.flush();
    }
}
