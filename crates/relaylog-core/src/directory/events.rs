//! Change notifications fired by [`super::LoggerDirectory`].
//!
//! These are also the payloads of the bridge events, so they serialize to
//! camelCase JSON.

use serde::{Deserialize, Serialize};

use crate::types::{LogLevel, LogResource, LoggerRecord, ScopeId};

/// A level was changed, either the default or one logger's explicit level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LevelChange {
    Default { level: LogLevel },
    Logger { resource: LogResource, level: LogLevel },
}

impl LevelChange {
    pub fn level(&self) -> LogLevel {
        match self {
            LevelChange::Default { level } | LevelChange::Logger { level, .. } => *level,
        }
    }

    /// Resource the change applies to; `None` for the default level
    pub fn resource(&self) -> Option<&LogResource> {
        match self {
            LevelChange::Default { .. } => None,
            LevelChange::Logger { resource, .. } => Some(resource),
        }
    }
}

/// Visibility flag of a registered logger changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityChange {
    pub resource: LogResource,
    pub visible: bool,
}

/// Loggers were registered or deregistered
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggersChange {
    #[serde(default)]
    pub added: Vec<LoggerRecord>,
    #[serde(default)]
    pub removed: Vec<LoggerRecord>,
}

impl LoggersChange {
    pub fn added(record: LoggerRecord) -> Self {
        Self {
            added: vec![record],
            removed: Vec::new(),
        }
    }

    pub fn removed(record: LoggerRecord) -> Self {
        Self {
            added: Vec::new(),
            removed: vec![record],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Keep only the records visible to `scope`
    pub fn retain_scope(mut self, scope: Option<&ScopeId>) -> Self {
        self.added.retain(|record| in_scope(record, scope));
        self.removed.retain(|record| in_scope(record, scope));
        self
    }
}

/// Whether a listener with `scope` cares about `record`.
///
/// Unscoped records concern everyone; scoped ones only their own requester.
pub fn in_scope(record: &LoggerRecord, scope: Option<&ScopeId>) -> bool {
    match record.scope() {
        None => true,
        Some(owner) => scope == Some(owner),
    }
}
