//! Propagation Integration Tests
//!
//! One responder serving a file-backed directory, requesters connected
//! through in-process channels. Verifies that levels, registrations and
//! visibility converge and that forwarded messages reach the file.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use parking_lot::Mutex;
use relaylog_core::ipc::ServerChannel;
use relaylog_core::{
    FileLoggerFactory, FollowerLogService, InMemoryFileService, InProcessChannel, LogError,
    LogLevel, LogLevelChannel, LogLevelChannelClient, LogResource, LogService, Logger,
    LoggerChannel, LoggerChannelClient, LoggerDirectory, LoggerLayer, LoggerOptions, LoggerRecord,
    ScopeId, WriterConfig,
};
use tracing_subscriber::prelude::*;

// ============================================================================
// Test Utilities
// ============================================================================

struct Responder {
    files: Arc<InMemoryFileService>,
    directory: Arc<LoggerDirectory>,
    service: Arc<LogService>,
    server: Arc<LoggerChannel>,
}

fn responder() -> Responder {
    let files = Arc::new(InMemoryFileService::new());
    let factory = FileLoggerFactory::new(files.clone(), WriterConfig::default());
    let directory = Arc::new(LoggerDirectory::new(Arc::new(factory), LogLevel::Info));
    let service = Arc::new(LogService::new(
        directory.get_logger(&LogResource::new("/logs/main.log")).unwrap(),
    ));
    let server = Arc::new(LoggerChannel::new(directory.clone()).with_log_service(service.clone()));
    Responder {
        files,
        directory,
        service,
        server,
    }
}

fn connect(responder: &Responder, scope: &str) -> LoggerChannelClient {
    let channel = Arc::new(InProcessChannel::new(
        responder.server.clone(),
        Some(ScopeId::new(scope)),
    ));
    LoggerChannelClient::connect(
        channel,
        responder.directory.default_level(),
        responder.directory.registered_loggers(),
    )
    .unwrap()
}

fn raw() -> LoggerOptions {
    LoggerOptions {
        donot_use_formatters: true,
        ..Default::default()
    }
}

/// Keeps every message that reaches it
#[derive(Default)]
struct CapturingLogger {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

impl Logger for CapturingLogger {
    fn level(&self) -> LogLevel {
        LogLevel::Trace
    }

    fn set_level(&self, _level: LogLevel) {}

    fn log(&self, level: LogLevel, message: &str) {
        self.lines.lock().push((level, message.to_string()));
    }
}

/// Poll `check` until it holds, failing after two seconds
async fn eventually(what: &str, mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {}", what);
}

// ============================================================================
// Level Convergence
// ============================================================================

#[tokio::test]
async fn test_resource_level_converges_across_requesters() {
    let responder = responder();
    let r1 = connect(&responder, "window-1");
    let r2 = connect(&responder, "window-2");
    let resource = LogResource::new("/logs/shared.log");

    r1.register_logger(LoggerRecord::new(resource.clone()))
        .await
        .unwrap();
    r1.set_log_level(LogLevel::Debug, Some(&resource))
        .await
        .unwrap();

    assert_eq!(responder.directory.log_level(Some(&resource)), LogLevel::Debug);
    assert_eq!(r1.directory().log_level(Some(&resource)), LogLevel::Debug);
    eventually("r2 to see debug", || {
        r2.directory().log_level(Some(&resource)) == LogLevel::Debug
    })
    .await;
}

#[tokio::test]
async fn test_last_write_wins() {
    let responder = responder();
    let r1 = connect(&responder, "window-1");
    let r2 = connect(&responder, "window-2");
    let resource = LogResource::new("/logs/shared.log");
    r1.register_logger(LoggerRecord::new(resource.clone()))
        .await
        .unwrap();

    r1.set_log_level(LogLevel::Debug, Some(&resource))
        .await
        .unwrap();
    r2.set_log_level(LogLevel::Error, Some(&resource))
        .await
        .unwrap();

    for directory in [&responder.directory, r1.directory(), r2.directory()] {
        let directory = directory.clone();
        let resource = resource.clone();
        eventually("levels to converge on error", move || {
            directory.log_level(Some(&resource)) == LogLevel::Error
        })
        .await;
    }
}

#[tokio::test]
async fn test_global_level_reaches_service_and_mirrors() {
    let responder = responder();
    let r1 = connect(&responder, "window-1");
    let r2 = connect(&responder, "window-2");

    r1.set_level(LogLevel::Trace).await.unwrap();

    assert_eq!(responder.service.level(), LogLevel::Trace);
    assert_eq!(responder.directory.default_level(), LogLevel::Trace);
    eventually("r2 default to follow", || {
        r2.directory().default_level() == LogLevel::Trace
    })
    .await;
}

#[tokio::test]
async fn test_late_requester_receives_last_level() {
    let responder = responder();
    responder.directory.set_level(LogLevel::Warning, None);

    // Seeded with a stale default on purpose
    let channel = Arc::new(InProcessChannel::new(responder.server.clone(), None));
    let late = LoggerChannelClient::connect(channel, LogLevel::Info, Vec::new()).unwrap();

    eventually("replayed level", || {
        late.directory().default_level() == LogLevel::Warning
    })
    .await;
}

// ============================================================================
// Registration and Visibility
// ============================================================================

#[tokio::test]
async fn test_registration_and_visibility_propagate() {
    let responder = responder();
    let r1 = connect(&responder, "window-1");
    let r2 = connect(&responder, "window-2");
    let resource = LogResource::new("/logs/output.log");

    r1.register_logger(LoggerRecord::new(resource.clone()))
        .await
        .unwrap();
    eventually("r2 to learn the logger", || {
        r2.directory().registered_logger(&resource).is_some()
    })
    .await;

    r2.set_visibility(&resource, false).await.unwrap();
    eventually("r1 to hide the logger", || !r1.directory().is_visible(&resource)).await;
    assert!(!responder.directory.is_visible(&resource));

    r1.deregister_logger(&resource).await.unwrap();
    assert!(responder.directory.registered_logger(&resource).is_none());
    eventually("r2 to drop the logger", || {
        r2.directory().registered_logger(&resource).is_none()
    })
    .await;
}

#[tokio::test]
async fn test_scoped_logger_stays_private() {
    let responder = responder();
    let r1 = connect(&responder, "window-1");
    let r2 = connect(&responder, "window-2");
    let private = LoggerRecord::new("/logs/w1-only.log").with_options(LoggerOptions {
        scope: Some(ScopeId::new("window-1")),
        ..Default::default()
    });
    let marker = LogResource::new("/logs/marker.log");

    r1.register_logger(private.clone()).await.unwrap();
    // An unscoped registration after the private one; once r2 sees it, it
    // would also have seen the private one if it were delivered.
    r1.register_logger(LoggerRecord::new(marker.clone()))
        .await
        .unwrap();

    eventually("r2 to see the marker", || {
        r2.directory().registered_logger(&marker).is_some()
    })
    .await;
    assert!(r2.directory().registered_logger(&private.resource).is_none());
    assert!(r1.directory().registered_logger(&private.resource).is_some());
}

// ============================================================================
// Remote Logging
// ============================================================================

#[tokio::test]
async fn test_remote_messages_reach_file_in_order() {
    let responder = responder();
    let r1 = connect(&responder, "window-1");
    let resource = LogResource::new("/logs/renderer.log");

    let logger = r1
        .create_logger(LoggerRecord::new(resource.clone()).with_options(LoggerOptions {
            donot_use_formatters: true,
            ..Default::default()
        }))
        .unwrap();
    for i in 0..10 {
        logger.info(&format!("{},", i));
    }

    let files = responder.files.clone();
    let expected = "0,1,2,3,4,5,6,7,8,9,";
    eventually("messages in the file", || {
        files.contents(&resource).as_deref() == Some(expected)
    })
    .await;
    assert!(responder.directory.find_logger(&resource).is_some());
}

#[tokio::test]
async fn test_log_without_created_logger_is_rejected() {
    let responder = responder();
    let err = responder
        .server
        .call(
            "log",
            serde_json::json!({
                "resource": "/logs/never-created.log",
                "messages": [{ "level": "info", "message": "lost" }]
            }),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LogError::LoggerNotCreated(_)));
}

#[tokio::test]
async fn test_protocol_mismatch() {
    let responder = responder();
    assert!(matches!(
        responder.server.call("truncate", serde_json::Value::Null).await,
        Err(LogError::UnknownCommand(_))
    ));
    assert!(matches!(
        responder.server.listen("onDidTruncate", None),
        Err(LogError::UnknownEvent(_))
    ));
}

#[tokio::test]
async fn test_created_logger_mutated_at_once_keeps_options() {
    let responder = responder();
    let r1 = connect(&responder, "window-1");
    let resource = LogResource::new("/logs/raw.log");

    let logger = r1
        .create_logger(LoggerRecord::new(resource.clone()).with_options(raw()))
        .unwrap();
    r1.set_log_level(LogLevel::Debug, Some(&resource))
        .await
        .unwrap();
    logger.info("x");
    logger.info("y");

    let files = responder.files.clone();
    eventually("raw messages in the file", || {
        files.contents(&resource).as_deref() == Some("xy")
    })
    .await;
    let record = responder.directory.registered_logger(&resource).unwrap();
    assert_eq!(record.options, raw());
    assert_eq!(record.level, Some(LogLevel::Debug));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_create_then_mutate_then_log() {
    let responder = responder();
    let r1 = connect(&responder, "window-1");
    let r2 = connect(&responder, "window-2");
    let resource = LogResource::new("/logs/private.log");
    let options = LoggerOptions {
        always_log: true,
        ..raw()
    };

    let logger = r1
        .create_logger(r1.scoped(LoggerRecord::new(resource.clone()).with_options(options)))
        .unwrap();
    r1.set_visibility(&resource, false).await.unwrap();
    r1.set_log_level(LogLevel::Error, Some(&resource))
        .await
        .unwrap();
    logger.debug("kept,");
    logger.error("also kept,");

    let files = responder.files.clone();
    eventually("always-log messages in the file", || {
        files.contents(&resource).as_deref() == Some("kept,also kept,")
    })
    .await;

    let record = responder.directory.registered_logger(&resource).unwrap();
    assert!(record.options.always_log);
    assert_eq!(record.scope(), Some(&ScopeId::new("window-1")));
    assert!(!record.visible);
    assert_eq!(record.level, Some(LogLevel::Error));

    // Another window never hears about it
    let marker = LogResource::new("/logs/marker.log");
    r1.register_logger(LoggerRecord::new(marker.clone()))
        .await
        .unwrap();
    eventually("r2 to see the marker", || {
        r2.directory().registered_logger(&marker).is_some()
    })
    .await;
    assert!(r2.directory().registered_logger(&resource).is_none());
}

#[tokio::test]
async fn test_console_logger_forwards() {
    let captured = Arc::new(CapturingLogger::default());
    let subscriber = tracing_subscriber::registry().with(LoggerLayer::new(captured.clone()));
    // Current-thread runtime: the responder handles consoleLog on this thread
    let _guard = tracing::subscriber::set_default(subscriber);

    let responder = responder();
    let r1 = connect(&responder, "window-1");

    let console = r1.console_logger(LogLevel::Info);
    console.debug("gated locally");
    console.info("printed by the responder");

    eventually("console line", || !captured.lines.lock().is_empty()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let lines = captured.lines.lock().clone();
    assert_eq!(
        lines,
        vec![(
            LogLevel::Info,
            "relaylog::console: printed by the responder".to_string()
        )]
    );
}

// ============================================================================
// Level Follower
// ============================================================================

#[tokio::test]
async fn test_follower_converges_both_ways() {
    let responder = responder();
    let level_server = Arc::new(
        LogLevelChannel::new(responder.service.clone()).with_directory(responder.directory.clone()),
    );
    let client = LogLevelChannelClient::new(Arc::new(InProcessChannel::new(level_server, None)));

    let local_files = Arc::new(InMemoryFileService::new());
    let local_factory = FileLoggerFactory::new(local_files, WriterConfig::default());
    let local_directory = LoggerDirectory::new(Arc::new(local_factory), LogLevel::Info);
    let local = Arc::new(LogService::new(
        local_directory
            .get_logger(&LogResource::new("/logs/child.log"))
            .unwrap(),
    ));
    let follower = FollowerLogService::new(client.clone(), local).unwrap();

    follower.propagate_level(LogLevel::Debug).await.unwrap();
    assert_eq!(responder.service.level(), LogLevel::Debug);
    assert_eq!(responder.directory.default_level(), LogLevel::Debug);

    responder.service.set_level(LogLevel::Error);
    eventually("follower to take parent level", || {
        follower.level() == LogLevel::Error
    })
    .await;

    let mut changes = client.on_did_change_log_level().unwrap();
    assert_eq!(changes.next().await, Some(LogLevel::Error));
}
