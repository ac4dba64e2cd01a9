/*
 * Error types for the logging engine.
 *
 * Configuration-time failures (bad patterns, unopenable files) are strict and
 * surface as Err from the constructors. Runtime failures are never allowed to
 * propagate into caller code; they are absorbed on the hot path and reported
 * through the diagnostic side channel while the affected sink degrades.
 */

use std::io;
use std::sync::Arc;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures the engine can encounter.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Pattern contained an unrecognized or unterminated placeholder.
    /// Raised at logger construction, never per record.
    #[error("unrecognized placeholder `{{{0}}}` in pattern")]
    InvalidPattern(String),

    /// A backup rename or reopen failed during rotation. The sink keeps
    /// writing to the best available handle and retries later.
    #[error("failed to rotate log file: {0}")]
    RotationFailed(String),

    /// A sink failed to write; it is degraded after reporting this once.
    #[error("sink write failed: {0}")]
    SinkWriteFailed(#[source] io::Error),

    /// A log call arrived after shutdown. Silently ignored by loggers.
    #[error("logging queue is closed")]
    QueueClosed,

    /// I/O error outside the write path (open, flush).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid or unusable configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Side channel for faults the engine absorbs. Called from the worker thread;
/// must not log back into the engine.
pub type DiagnosticHandler = Arc<dyn Fn(&Error) + Send + Sync>;

pub(crate) fn default_diagnostics() -> DiagnosticHandler {
    Arc::new(|err| eprintln!("apexlog: {err}"))
}
