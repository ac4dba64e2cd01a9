/*
 * The immutable log record passed from caller threads to the worker.
 */

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::config::Severity;

/// A single log event, created at the call site and read-only afterward.
///
/// Carries both a wall-clock timestamp (what formatters render) and a
/// monotonic instant (stable under clock adjustments, useful for latency
/// accounting).
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub created: Instant,
    pub severity: Severity,
    pub logger: Arc<str>,
    pub message: String,
    pub module_path: Option<&'static str>,
    pub file: Option<&'static str>,
    pub line: Option<u32>,
}

impl LogRecord {
    pub fn new(logger: Arc<str>, severity: Severity, message: impl Into<String>) -> Self {
        LogRecord {
            timestamp: Utc::now(),
            created: Instant::now(),
            severity,
            logger,
            message: message.into(),
            module_path: None,
            file: None,
            line: None,
        }
    }

    /// Attaches source-location metadata.
    pub fn with_location(mut self, module_path: &'static str, file: &'static str, line: u32) -> Self {
        self.module_path = Some(module_path);
        self.file = Some(file);
        self.line = Some(line);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_captures_location_when_asked() {
        let record = LogRecord::new(Arc::from("svc"), Severity::Info, "hello")
            .with_location(module_path!(), file!(), line!());
        assert_eq!(record.message, "hello");
        assert_eq!(record.severity, Severity::Info);
        assert!(record.module_path.is_some());
        assert!(record.line.is_some());
    }
}
