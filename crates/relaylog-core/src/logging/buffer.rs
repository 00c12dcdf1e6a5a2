//! Logger that holds messages until its real target is available.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use super::logger::{LevelGate, Logger};
use crate::types::LogLevel;

/// Message accepted before the target logger existed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMessage {
    pub level: LogLevel,
    pub message: String,
}

enum BufferState {
    Buffering(Vec<PendingMessage>),
    Ready(Arc<dyn Logger>),
    /// The target will never arrive; messages are dropped
    Discarding,
}

/// Accepts messages immediately and forwards them once a target is set.
///
/// Buffered messages are not durable: they are lost if the process dies
/// before [`BufferLogger::set_logger`] is called.
pub struct BufferLogger {
    gate: LevelGate,
    state: Mutex<BufferState>,
}

impl BufferLogger {
    pub fn new(level: LogLevel, always_log: bool) -> Self {
        Self {
            gate: LevelGate::new(level, always_log),
            state: Mutex::new(BufferState::Buffering(Vec::new())),
        }
    }

    /// Attach the target logger and drain the buffer into it, in order.
    ///
    /// Only the first call takes effect; later calls return `false`.
    pub fn set_logger(&self, logger: Arc<dyn Logger>) -> bool {
        let mut state = self.state.lock();
        let pending = match &mut *state {
            BufferState::Ready(_) => {
                warn!("Buffered logger already has a target, ignoring");
                return false;
            }
            BufferState::Buffering(pending) => std::mem::take(pending),
            BufferState::Discarding => Vec::new(),
        };

        logger.set_level(self.gate.level());
        for entry in pending {
            logger.log(entry.level, &entry.message);
        }
        *state = BufferState::Ready(logger);
        true
    }

    /// Give up waiting for a target: drop what is buffered and everything
    /// logged from now on. Returns how many buffered messages were dropped.
    ///
    /// A later [`BufferLogger::set_logger`] still attaches a target.
    pub fn discard(&self) -> usize {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, BufferState::Discarding) {
            BufferState::Buffering(pending) => pending.len(),
            BufferState::Discarding => 0,
            ready @ BufferState::Ready(_) => {
                *state = ready;
                0
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.state.lock(), BufferState::Ready(_))
    }

    /// Number of messages waiting for a target
    pub fn pending_len(&self) -> usize {
        match &*self.state.lock() {
            BufferState::Buffering(pending) => pending.len(),
            BufferState::Ready(_) | BufferState::Discarding => 0,
        }
    }
}

impl Logger for BufferLogger {
    fn level(&self) -> LogLevel {
        self.gate.level()
    }

    fn set_level(&self, level: LogLevel) {
        self.gate.set_level(level);
        if let BufferState::Ready(logger) = &*self.state.lock() {
            logger.set_level(level);
        }
    }

    fn log(&self, level: LogLevel, message: &str) {
        let mut state = self.state.lock();
        match &mut *state {
            BufferState::Ready(logger) => logger.log(level, message),
            BufferState::Buffering(pending) => {
                if self.gate.should_log(level) {
                    pending.push(PendingMessage {
                        level,
                        message: message.to_string(),
                    });
                }
            }
            BufferState::Discarding => {}
        }
    }

    fn flush(&self) {
        if let BufferState::Ready(logger) = &*self.state.lock() {
            logger.flush();
        }
    }
}
