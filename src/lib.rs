/*
 * apexlog: a structured, asynchronous, multi-sink logging engine.
 *
 * Records flow from caller threads through a bounded dispatch queue to a
 * single worker that renders and writes them: a console sink with optional
 * ANSI color, and a rotating file sink with numbered backups. Each logger
 * carries its own per-sink severity thresholds; the file sink typically
 * runs more verbose than the console.
 *
 * The public surface:
 * - Registry: owns the queue, the worker, and the named loggers
 * - Logger: log/trace/debug/info/warn/error/critical, flush
 * - EngineConfig / LoggerConfig: queue sizing, thresholds, rotation
 *
 * Runtime failures never propagate to callers; they surface through an
 * optional diagnostic callback while the affected sink degrades.
 */

mod config;
mod dispatch;
mod error;
mod logger;
mod pattern;
mod record;
mod registry;
mod sinks;

pub use config::{Config, EngineConfig, LoggerConfig, OverflowPolicy, Severity, DEFAULT_PATTERN};
pub use dispatch::SinkId;
pub use error::{DiagnosticHandler, Error, Result};
pub use logger::Logger;
pub use pattern::Formatter;
pub use record::LogRecord;
pub use registry::Registry;
pub use sinks::{ConsoleSink, RotatingFileSink, Sink};

use once_cell::sync::OnceCell;
use std::sync::Arc;

static GLOBAL: OnceCell<Registry> = OnceCell::new();

/// Initializes the process-wide registry. Call once at startup; later calls
/// return the registry created first and ignore `config`.
///
/// The explicit lifecycle contract: `init` once, then [`shutdown_all`] once
/// at process exit to guarantee the queue is drained.
pub fn init(config: EngineConfig) -> Result<&'static Registry> {
    GLOBAL.get_or_try_init(|| Registry::new(config))
}

/// Returns the named logger from the process-wide registry, creating it on
/// first request. Fails if [`init`] has not been called.
pub fn get_logger(name: &str, config: &LoggerConfig) -> Result<Arc<Logger>> {
    match GLOBAL.get() {
        Some(registry) => registry.get_logger(name, config),
        None => Err(Error::Configuration(
            "apexlog::init has not been called".into(),
        )),
    }
}

/// Drains and shuts down the process-wide registry. A no-op when [`init`]
/// was never called, and on every call after the first.
pub fn shutdown_all() {
    if let Some(registry) = GLOBAL.get() {
        registry.shutdown_all();
    }
}
