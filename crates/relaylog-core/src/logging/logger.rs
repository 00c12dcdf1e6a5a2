//! The `Logger` capability and its level gate.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::types::LogLevel;

/// Accepts leveled text messages for one destination.
///
/// `log` never blocks: implementations enqueue, buffer or forward and
/// return immediately. The concrete variant is chosen once, when the
/// logger is created, never per call.
pub trait Logger: Send + Sync {
    fn level(&self) -> LogLevel;

    fn set_level(&self, level: LogLevel);

    fn log(&self, level: LogLevel, message: &str);

    /// Nothing to do for loggers whose queue drains on its own
    fn flush(&self) {}

    fn trace(&self, message: &str) {
        self.log(LogLevel::Trace, message);
    }

    fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.log(LogLevel::Warning, message);
    }

    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }
}

/// Current level of a logger plus its `always_log` override.
#[derive(Debug)]
pub struct LevelGate {
    level: AtomicU8,
    always_log: bool,
}

impl LevelGate {
    pub fn new(level: LogLevel, always_log: bool) -> Self {
        Self {
            level: AtomicU8::new(level.as_u8()),
            always_log,
        }
    }

    pub fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.level.load(Ordering::Acquire)).unwrap_or_default()
    }

    /// Store `level`; returns whether it changed
    pub fn set_level(&self, level: LogLevel) -> bool {
        self.level.swap(level.as_u8(), Ordering::AcqRel) != level.as_u8()
    }

    pub fn always_log(&self) -> bool {
        self.always_log
    }

    /// Whether a message at `level` passes
    #[inline]
    pub fn should_log(&self, level: LogLevel) -> bool {
        if self.always_log {
            return true;
        }
        let current = self.level();
        current != LogLevel::Off && level != LogLevel::Off && level >= current
    }
}
