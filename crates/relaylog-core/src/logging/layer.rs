//! Tracing layer that routes events into a [`Logger`].
//!
//! Lets an application send its own `tracing` output through the rotating
//! file pipeline:
//!
//! ```ignore
//! use relaylog_core::logging::{FileLogger, LoggerLayer, WriterConfig};
//! use tracing_subscriber::prelude::*;
//!
//! let logger = Arc::new(FileLogger::new(resource, LogLevel::Info, &options, fs, WriterConfig::default()));
//! tracing_subscriber::registry()
//!     .with(LoggerLayer::new(logger))
//!     .with(tracing_subscriber::fmt::layer())
//!     .init();
//! ```

use std::fmt::Write as FmtWrite;
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use super::logger::Logger;
use crate::types::LogLevel;

/// Target prefix of this library's own diagnostics
const OWN_TARGET: &str = "relaylog_core";

/// A tracing Layer that writes events to a [`Logger`].
///
/// Events emitted by this library are skipped so the write pipeline never
/// logs about itself into itself.
pub struct LoggerLayer {
    logger: Arc<dyn Logger>,
}

impl LoggerLayer {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }
}

impl<S> Layer<S> for LoggerLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let target = metadata.target();
        if target.starts_with(OWN_TARGET) {
            return;
        }

        let level = LogLevel::from(*metadata.level());

        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);

        let mut line = String::new();
        if let Some(scope) = ctx.event_scope(event) {
            let spans: Vec<&str> = scope.from_root().map(|span| span.name()).collect();
            if !spans.is_empty() {
                let _ = write!(line, "{}: ", spans.join(" > "));
            }
        }
        let _ = write!(line, "{}: {}", target, visitor.message.unwrap_or_default());
        for (name, value) in visitor.fields {
            let _ = write!(line, " {}={}", name, value);
        }

        self.logger.log(level, &line);
    }
}

/// Visitor that flattens event fields into `key=value` text.
#[derive(Default)]
struct LineVisitor {
    message: Option<String>,
    fields: Vec<(&'static str, String)>,
}

impl Visit for LineVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let mut buf = String::new();
        let _ = write!(&mut buf, "{:?}", value);

        if field.name() == "message" {
            self.message = Some(buf);
        } else {
            self.fields.push((field.name(), buf));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.push((field.name(), value.to_string()));
        }
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.fields.push((field.name(), value.to_string()));
    }
}
