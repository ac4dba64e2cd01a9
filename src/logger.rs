/*
 * The named logger facade.
 *
 * A Logger binds a name, a set of sink references with per-sink severity
 * thresholds, and a handle to the dispatch queue. Level filtering runs on
 * the calling thread before enqueue; a record below every threshold costs
 * nothing but the comparison.
 *
 * Loggers never surface errors to callers: a log call on a closed logger or
 * a closed queue is a silent no-op. Only construction, through the
 * registry, is strict.
 */

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::config::Severity;
use crate::dispatch::{QueueHandle, QueuedRecord, SinkId};
use crate::record::LogRecord;

// Lifecycle: Ready -> ShuttingDown -> Closed. There is no Uninitialized
// state at runtime; the registry only hands out ready loggers.
const STATE_READY: u8 = 0;
const STATE_SHUTTING_DOWN: u8 = 1;
const STATE_CLOSED: u8 = 2;

/// One sink reference with the minimum severity this logger emits to it.
pub(crate) struct SinkBinding {
    pub id: SinkId,
    pub threshold: Severity,
}

/// Named entry point for emitting records. Obtained from a
/// [`Registry`](crate::Registry); cheap to share as `Arc<Logger>`.
pub struct Logger {
    name: Arc<str>,
    handle: QueueHandle,
    bindings: Vec<SinkBinding>,
    state: AtomicU8,
}

impl Logger {
    pub(crate) fn new(name: Arc<str>, handle: QueueHandle, bindings: Vec<SinkBinding>) -> Self {
        Logger {
            name,
            handle,
            bindings,
            state: AtomicU8::new(STATE_READY),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Submits one record. Blocks only when the queue is full and the
    /// engine runs the `Block` overflow policy. Never fails: errors are
    /// absorbed so logging cannot break the caller's business logic.
    ///
    /// Call from plain threads only. Because it may park the calling
    /// thread, `log` must not be used from inside an async runtime
    /// context.
    pub fn log(&self, severity: Severity, message: &str) {
        if self.state.load(Ordering::Acquire) != STATE_READY {
            return;
        }

        let targets: Vec<SinkId> = self
            .bindings
            .iter()
            .filter(|binding| severity.should_log(binding.threshold))
            .map(|binding| binding.id)
            .collect();
        if targets.is_empty() {
            return;
        }

        let record = LogRecord::new(Arc::clone(&self.name), severity, message);
        // A closed queue means shutdown already ran; stay a no-op.
        let _ = self.handle.enqueue(QueuedRecord { record, targets });
    }

    pub fn trace(&self, message: &str) {
        self.log(Severity::Trace, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(Severity::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(Severity::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(Severity::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.log(Severity::Error, message);
    }

    pub fn critical(&self, message: &str) {
        self.log(Severity::Critical, message);
    }

    /// Blocks until every record previously queued for this logger's sinks
    /// has been written and the sinks flushed. Like [`log`](Self::log),
    /// this parks the calling thread and must not be used from inside an
    /// async runtime context.
    pub fn flush(&self) {
        if self.state.load(Ordering::Acquire) == STATE_CLOSED {
            return;
        }
        let targets: Vec<SinkId> = self.bindings.iter().map(|binding| binding.id).collect();
        let _ = self.handle.flush(targets);
    }

    pub(crate) fn mark_shutting_down(&self) {
        self.state.store(STATE_SHUTTING_DOWN, Ordering::Release);
    }

    pub(crate) fn mark_closed(&self) {
        self.state.store(STATE_CLOSED, Ordering::Release);
    }
}
