//! Process-local registry of loggers, levels and visibility.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  LoggerDirectory                                                  │
//! │  ├── default_level                                                │
//! │  ├── records: resource → LoggerRecord   (level, visible, options) │
//! │  ├── loggers: resource → Arc<dyn Logger> (created on demand)      │
//! │  │                                                                │
//! │  ├── onDidChangeLogLevel    LevelChange     (replays last)        │
//! │  ├── onDidChangeVisibility  VisibilityChange                      │
//! │  └── onDidChangeLoggers     LoggersChange                         │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutation goes through a method that takes the write lock, applies
//! the change and emits its event before releasing the lock, so listeners
//! observe changes in the order they were applied. Events fire only when
//! something actually changed.

pub mod events;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::LogResult;
use crate::events::{Emitter, EventStream, ReplayEmitter};
use crate::logging::Logger;
use crate::types::{LogLevel, LogResource, LoggerRecord, ScopeId};

pub use events::{in_scope, LevelChange, LoggersChange, VisibilityChange};

/// Creates the concrete logger for a directory entry.
///
/// Called with the directory lock held; implementations must not call
/// back into the directory.
pub trait LoggerFactory: Send + Sync {
    fn create_logger(&self, record: &LoggerRecord, level: LogLevel) -> LogResult<Arc<dyn Logger>>;
}

struct DirectoryState {
    default_level: LogLevel,
    records: BTreeMap<LogResource, LoggerRecord>,
    loggers: HashMap<LogResource, Arc<dyn Logger>>,
    /// Registered only because a level was set; options still unknown
    implicit: HashSet<LogResource>,
}

/// `known` registered implicitly, completed with what its owner declared
fn adopt(known: LoggerRecord, declared: LoggerRecord) -> LoggerRecord {
    LoggerRecord {
        level: known.level.or(declared.level),
        options: declared.options,
        ..known
    }
}

/// Authoritative (or mirrored) record of known loggers.
pub struct LoggerDirectory {
    factory: Arc<dyn LoggerFactory>,
    state: RwLock<DirectoryState>,
    level_events: ReplayEmitter<LevelChange>,
    visibility_events: Emitter<VisibilityChange>,
    logger_events: Emitter<LoggersChange>,
}

impl LoggerDirectory {
    pub fn new(factory: Arc<dyn LoggerFactory>, default_level: LogLevel) -> Self {
        Self::with_loggers(factory, default_level, Vec::new())
    }

    /// Create a directory seeded with `records`; seeding fires no events
    pub fn with_loggers(
        factory: Arc<dyn LoggerFactory>,
        default_level: LogLevel,
        records: Vec<LoggerRecord>,
    ) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.resource.clone(), record))
            .collect();
        Self {
            factory,
            state: RwLock::new(DirectoryState {
                default_level,
                records,
                loggers: HashMap::new(),
                implicit: HashSet::new(),
            }),
            level_events: ReplayEmitter::new(),
            visibility_events: Emitter::new(),
            logger_events: Emitter::new(),
        }
    }

    /// Get or create the logger for `record.resource`.
    ///
    /// If the resource is already registered its stored record wins over the
    /// one passed in; otherwise `record` is registered and `added` fires.
    /// A record that only exists because its level was set takes the options
    /// of `record` and keeps its level.
    pub fn create_logger(&self, record: LoggerRecord) -> LogResult<Arc<dyn Logger>> {
        let mut state = self.state.write();
        if let Some(logger) = state.loggers.get(&record.resource) {
            return Ok(logger.clone());
        }

        let (record, changed) = match state.records.get(&record.resource).cloned() {
            None => (record, true),
            Some(known) if state.implicit.contains(&known.resource) => (adopt(known, record), true),
            Some(known) => (known, false),
        };
        let level = record.effective_level(state.default_level);

        let logger = self.factory.create_logger(&record, level)?;
        debug!(resource = %record.resource, %level, "Created logger");

        state
            .loggers
            .insert(record.resource.clone(), logger.clone());
        if changed {
            state.implicit.remove(&record.resource);
            state
                .records
                .insert(record.resource.clone(), record.clone());
            self.logger_events.emit(LoggersChange::added(record));
        }
        Ok(logger)
    }

    /// Get or create the logger for `resource` with default options
    pub fn get_logger(&self, resource: &LogResource) -> LogResult<Arc<dyn Logger>> {
        self.create_logger(LoggerRecord::new(resource.clone()))
    }

    /// Existing logger for `resource`, without creating one
    pub fn find_logger(&self, resource: &LogResource) -> Option<Arc<dyn Logger>> {
        self.state.read().loggers.get(resource).cloned()
    }

    /// Set the default level (`resource == None`) or one logger's level.
    ///
    /// Changing the default re-levels every logger without an explicit
    /// level. Setting the level of an unknown resource registers it.
    /// Returns whether anything changed.
    pub fn set_level(&self, level: LogLevel, resource: Option<&LogResource>) -> bool {
        let mut state = self.state.write();
        let state = &mut *state;

        let change = match resource {
            None => {
                if state.default_level == level {
                    return false;
                }
                state.default_level = level;
                for (resource, logger) in &state.loggers {
                    let follows_default = state
                        .records
                        .get(resource)
                        .map_or(true, |record| record.level.is_none());
                    if follows_default {
                        logger.set_level(level);
                    }
                }
                LevelChange::Default { level }
            }
            Some(resource) => {
                match state.records.get_mut(resource) {
                    Some(record) if record.level == Some(level) => return false,
                    Some(record) => record.level = Some(level),
                    None => {
                        let record = LoggerRecord::new(resource.clone()).with_level(level);
                        state.records.insert(resource.clone(), record.clone());
                        state.implicit.insert(resource.clone());
                        self.logger_events.emit(LoggersChange::added(record));
                    }
                }
                if let Some(logger) = state.loggers.get(resource) {
                    logger.set_level(level);
                }
                LevelChange::Logger {
                    resource: resource.clone(),
                    level,
                }
            }
        };

        debug!(?change, "Log level changed");
        self.level_events.emit(change);
        true
    }

    /// Effective level of `resource`, or the default level
    pub fn log_level(&self, resource: Option<&LogResource>) -> LogLevel {
        let state = self.state.read();
        resource
            .and_then(|resource| state.records.get(resource))
            .map_or(state.default_level, |record| {
                record.effective_level(state.default_level)
            })
    }

    pub fn default_level(&self) -> LogLevel {
        self.state.read().default_level
    }

    /// Change visibility of a registered logger; returns whether it changed
    pub fn set_visibility(&self, resource: &LogResource, visible: bool) -> bool {
        let mut state = self.state.write();
        match state.records.get_mut(resource) {
            Some(record) if record.visible != visible => {
                record.visible = visible;
                self.visibility_events.emit(VisibilityChange {
                    resource: resource.clone(),
                    visible,
                });
                true
            }
            _ => false,
        }
    }

    /// Unknown resources count as visible
    pub fn is_visible(&self, resource: &LogResource) -> bool {
        self.state
            .read()
            .records
            .get(resource)
            .map_or(true, |record| record.visible)
    }

    /// Register `record` if absent; if present, reconcile its visibility.
    ///
    /// An implicitly registered record adopts the options of `record`.
    /// Returns whether anything changed.
    pub fn register_logger(&self, record: LoggerRecord) -> bool {
        let visible = {
            let mut state = self.state.write();
            let state = &mut *state;
            match state.records.get_mut(&record.resource) {
                Some(existing) if state.implicit.remove(&record.resource) => {
                    let visible = record.visible;
                    *existing = adopt(existing.clone(), record.clone());
                    debug!(resource = %existing.resource, "Completed implicitly registered logger");
                    self.logger_events
                        .emit(LoggersChange::added(existing.clone()));
                    if existing.visible == visible {
                        return true;
                    }
                    visible
                }
                Some(existing) if existing.visible == record.visible => return false,
                Some(_) => record.visible,
                None => {
                    state
                        .records
                        .insert(record.resource.clone(), record.clone());
                    debug!(resource = %record.resource, "Registered logger");
                    self.logger_events.emit(LoggersChange::added(record));
                    return true;
                }
            }
        };
        self.set_visibility(&record.resource, visible)
    }

    /// Remove `resource` and drop its cached logger.
    ///
    /// Content already written stays where it is. Returns the removed record.
    pub fn deregister_logger(&self, resource: &LogResource) -> Option<LoggerRecord> {
        let mut state = self.state.write();
        let record = state.records.remove(resource)?;
        state.implicit.remove(resource);
        if let Some(logger) = state.loggers.remove(resource) {
            logger.flush();
        }
        debug!(%resource, "Deregistered logger");
        self.logger_events
            .emit(LoggersChange::removed(record.clone()));
        Some(record)
    }

    /// All registered loggers, ordered by resource
    pub fn registered_loggers(&self) -> Vec<LoggerRecord> {
        self.state.read().records.values().cloned().collect()
    }

    /// Registered loggers a requester with `scope` cares about
    pub fn registered_loggers_in(&self, scope: Option<&ScopeId>) -> Vec<LoggerRecord> {
        self.state
            .read()
            .records
            .values()
            .filter(|record| in_scope(record, scope))
            .cloned()
            .collect()
    }

    pub fn registered_logger(&self, resource: &LogResource) -> Option<LoggerRecord> {
        self.state.read().records.get(resource).cloned()
    }

    /// Whether a listener with `scope` cares about `resource`.
    ///
    /// Unknown resources are of interest to everyone.
    pub fn is_interested(&self, resource: &LogResource, scope: Option<&ScopeId>) -> bool {
        self.state
            .read()
            .records
            .get(resource)
            .map_or(true, |record| in_scope(record, scope))
    }

    /// Level changes; the most recent change is replayed to new subscribers
    pub fn subscribe_level_changes(&self) -> EventStream<LevelChange> {
        self.level_events.subscribe()
    }

    pub fn subscribe_visibility(&self) -> EventStream<VisibilityChange> {
        self.visibility_events.subscribe()
    }

    pub fn subscribe_loggers(&self) -> EventStream<LoggersChange> {
        self.logger_events.subscribe()
    }

    /// Flush and drop every cached logger; records stay registered
    pub fn shutdown(&self) {
        let loggers: Vec<_> = self.state.write().loggers.drain().collect();
        for (resource, logger) in loggers {
            debug!(%resource, "Closing logger");
            logger.flush();
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::logging::buffer::tests::RecordingLogger;
    use crate::types::LoggerOptions;
    use parking_lot::Mutex;

    /// Factory handing out recording loggers and remembering them
    #[derive(Default)]
    pub(crate) struct RecordingFactory {
        pub created: Mutex<Vec<(LogResource, Arc<RecordingLogger>)>>,
    }

    impl RecordingFactory {
        pub(crate) fn logger(&self, resource: &LogResource) -> Option<Arc<RecordingLogger>> {
            self.created
                .lock()
                .iter()
                .find(|(r, _)| r == resource)
                .map(|(_, logger)| logger.clone())
        }
    }

    impl LoggerFactory for RecordingFactory {
        fn create_logger(&self, record: &LoggerRecord, level: LogLevel) -> LogResult<Arc<dyn Logger>> {
            let logger = Arc::new(RecordingLogger::new(level));
            self.created
                .lock()
                .push((record.resource.clone(), logger.clone()));
            Ok(logger)
        }
    }

    fn directory() -> (Arc<RecordingFactory>, LoggerDirectory) {
        let factory = Arc::new(RecordingFactory::default());
        let directory = LoggerDirectory::new(factory.clone(), LogLevel::Info);
        (factory, directory)
    }

    #[test]
    fn test_create_logger_is_singleton_and_registers() {
        let (factory, directory) = directory();
        let mut events = directory.subscribe_loggers();
        let resource = LogResource::new("/logs/a.log");

        let first = directory.get_logger(&resource).unwrap();
        let second = directory.get_logger(&resource).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(factory.created.lock().len(), 1);
        assert_eq!(
            events.try_recv(),
            Some(LoggersChange::added(LoggerRecord::new(resource.clone())))
        );
        assert_eq!(events.try_recv(), None);
        assert!(directory.find_logger(&resource).is_some());
    }

    #[test]
    fn test_create_logger_uses_registered_record() {
        let (factory, directory) = directory();
        let resource = LogResource::new("/logs/a.log");
        directory.register_logger(LoggerRecord::new(resource.clone()).with_level(LogLevel::Error));

        directory.get_logger(&resource).unwrap();
        assert_eq!(factory.logger(&resource).unwrap().level(), LogLevel::Error);
    }

    #[test]
    fn test_default_level_relevels_only_followers() {
        let (factory, directory) = directory();
        let follower = LogResource::new("/logs/follower.log");
        let pinned = LogResource::new("/logs/pinned.log");
        directory.get_logger(&follower).unwrap();
        directory
            .create_logger(LoggerRecord::new(pinned.clone()).with_level(LogLevel::Error))
            .unwrap();

        assert!(directory.set_level(LogLevel::Trace, None));
        assert!(!directory.set_level(LogLevel::Trace, None));

        assert_eq!(factory.logger(&follower).unwrap().level(), LogLevel::Trace);
        assert_eq!(factory.logger(&pinned).unwrap().level(), LogLevel::Error);
        assert_eq!(directory.log_level(Some(&follower)), LogLevel::Trace);
        assert_eq!(directory.log_level(Some(&pinned)), LogLevel::Error);
        assert_eq!(directory.default_level(), LogLevel::Trace);
    }

    #[test]
    fn test_resource_level_changes_fire_once() {
        let (factory, directory) = directory();
        let resource = LogResource::new("/logs/a.log");
        directory.get_logger(&resource).unwrap();
        let mut events = directory.subscribe_level_changes();

        assert!(directory.set_level(LogLevel::Debug, Some(&resource)));
        assert!(!directory.set_level(LogLevel::Debug, Some(&resource)));

        assert_eq!(
            events.try_recv(),
            Some(LevelChange::Logger {
                resource: resource.clone(),
                level: LogLevel::Debug
            })
        );
        assert_eq!(events.try_recv(), None);
        assert_eq!(factory.logger(&resource).unwrap().level(), LogLevel::Debug);
    }

    #[test]
    fn test_level_subscription_replays_last_change() {
        let (_, directory) = directory();
        directory.set_level(LogLevel::Warning, None);
        directory.set_level(LogLevel::Error, None);

        let mut events = directory.subscribe_level_changes();
        assert_eq!(
            events.try_recv(),
            Some(LevelChange::Default { level: LogLevel::Error })
        );
        assert_eq!(events.try_recv(), None);
    }

    #[test]
    fn test_level_for_unknown_resource_registers_it() {
        let (_, directory) = directory();
        let resource = LogResource::new("/logs/late.log");

        assert!(directory.set_level(LogLevel::Debug, Some(&resource)));
        let record = directory.registered_logger(&resource).unwrap();
        assert_eq!(record.level, Some(LogLevel::Debug));
    }

    #[test]
    fn test_create_completes_implicit_record() {
        let (factory, directory) = directory();
        let resource = LogResource::new("/logs/raw.log");
        let options = LoggerOptions {
            donot_use_formatters: true,
            always_log: true,
            scope: Some(ScopeId::new("w1")),
            name: None,
        };
        directory.set_level(LogLevel::Debug, Some(&resource));
        let mut events = directory.subscribe_loggers();

        directory
            .create_logger(LoggerRecord::new(resource.clone()).with_options(options.clone()))
            .unwrap();

        let record = directory.registered_logger(&resource).unwrap();
        assert_eq!(record.options, options);
        assert_eq!(record.level, Some(LogLevel::Debug));
        assert_eq!(factory.logger(&resource).unwrap().level(), LogLevel::Debug);
        assert_eq!(events.try_recv(), Some(LoggersChange::added(record)));

        // Once declared, the stored record wins again
        directory.deregister_logger(&resource);
        directory.register_logger(LoggerRecord::new(resource.clone()));
        directory
            .create_logger(LoggerRecord::new(resource.clone()).with_options(options))
            .unwrap();
        assert_eq!(
            directory.registered_logger(&resource).unwrap().options,
            LoggerOptions::default()
        );
    }

    #[test]
    fn test_register_completes_implicit_record() {
        let (_, directory) = directory();
        let resource = LogResource::new("/logs/late.log");
        directory.set_level(LogLevel::Error, Some(&resource));

        let declared = LoggerRecord::new(resource.clone())
            .with_options(LoggerOptions {
                name: Some("Late".to_string()),
                ..Default::default()
            })
            .hidden();
        assert!(directory.register_logger(declared.clone()));

        let record = directory.registered_logger(&resource).unwrap();
        assert_eq!(record.options.name.as_deref(), Some("Late"));
        assert_eq!(record.level, Some(LogLevel::Error));
        assert!(!record.visible);

        // A second declaration is an ordinary re-registration
        assert!(!directory.register_logger(declared.with_options(LoggerOptions::default())));
        assert_eq!(
            directory.registered_logger(&resource).unwrap().options.name.as_deref(),
            Some("Late")
        );
    }

    #[test]
    fn test_visibility() {
        let (_, directory) = directory();
        let resource = LogResource::new("/logs/a.log");
        let mut events = directory.subscribe_visibility();

        assert!(!directory.set_visibility(&resource, false));
        directory.register_logger(LoggerRecord::new(resource.clone()));
        assert!(directory.is_visible(&resource));

        assert!(directory.set_visibility(&resource, false));
        assert!(!directory.set_visibility(&resource, false));
        assert!(!directory.is_visible(&resource));
        assert_eq!(
            events.try_recv(),
            Some(VisibilityChange {
                resource: resource.clone(),
                visible: false
            })
        );
        assert_eq!(events.try_recv(), None);
    }

    #[test]
    fn test_register_existing_reconciles_visibility() {
        let (_, directory) = directory();
        let resource = LogResource::new("/logs/a.log");
        let mut loggers = directory.subscribe_loggers();
        let mut visibility = directory.subscribe_visibility();

        assert!(directory.register_logger(LoggerRecord::new(resource.clone())));
        assert!(!directory.register_logger(LoggerRecord::new(resource.clone())));
        assert!(directory.register_logger(LoggerRecord::new(resource.clone()).hidden()));

        assert!(loggers.try_recv().is_some());
        assert_eq!(loggers.try_recv(), None);
        assert_eq!(
            visibility.try_recv(),
            Some(VisibilityChange {
                resource,
                visible: false
            })
        );
    }

    #[test]
    fn test_deregister_drops_logger_and_fires_removed() {
        let (_, directory) = directory();
        let resource = LogResource::new("/logs/a.log");
        directory.get_logger(&resource).unwrap();
        let mut events = directory.subscribe_loggers();

        let removed = directory.deregister_logger(&resource).unwrap();
        assert_eq!(removed.resource, resource);
        assert!(directory.find_logger(&resource).is_none());
        assert!(directory.registered_logger(&resource).is_none());
        assert_eq!(events.try_recv(), Some(LoggersChange::removed(removed)));
        assert!(directory.deregister_logger(&resource).is_none());
    }

    #[test]
    fn test_scoped_queries() {
        let (_, directory) = directory();
        let w1 = ScopeId::new("w1");
        let own = LoggerRecord::new("/logs/b.log").with_options(LoggerOptions {
            scope: Some(w1.clone()),
            ..Default::default()
        });
        let other = LoggerRecord::new("/logs/c.log").with_options(LoggerOptions {
            scope: Some(ScopeId::new("w2")),
            ..Default::default()
        });
        let shared = LoggerRecord::new("/logs/a.log");
        directory.register_logger(other.clone());
        directory.register_logger(own.clone());
        directory.register_logger(shared.clone());

        assert_eq!(
            directory.registered_loggers_in(Some(&w1)),
            vec![shared.clone(), own.clone()]
        );
        assert_eq!(directory.registered_loggers().len(), 3);
        assert!(directory.is_interested(&own.resource, Some(&w1)));
        assert!(!directory.is_interested(&other.resource, Some(&w1)));
        assert!(directory.is_interested(&LogResource::new("/unknown"), Some(&w1)));
    }

    #[test]
    fn test_seeded_directory_fires_nothing() {
        let factory = Arc::new(RecordingFactory::default());
        let directory = LoggerDirectory::with_loggers(
            factory,
            LogLevel::Warning,
            vec![LoggerRecord::new("/logs/a.log").hidden()],
        );
        let mut events = directory.subscribe_loggers();

        assert_eq!(events.try_recv(), None);
        assert!(!directory.is_visible(&LogResource::new("/logs/a.log")));
        assert_eq!(directory.log_level(None), LogLevel::Warning);
    }

    #[test]
    fn test_shutdown_drops_loggers_keeps_records() {
        let (_, directory) = directory();
        let resource = LogResource::new("/logs/a.log");
        directory.get_logger(&resource).unwrap();

        directory.shutdown();
        assert!(directory.find_logger(&resource).is_none());
        assert!(directory.registered_logger(&resource).is_some());
    }
}
