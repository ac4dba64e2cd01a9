/*
 * The logger registry.
 *
 * One Registry owns the worker runtime, the dispatch queue, and the map of
 * named loggers. It is constructed explicitly once at startup and shut down
 * once at exit; there is no implicit lazy global state here (lib.rs offers a
 * thin opt-in global over this type).
 *
 * Requesting a logger by an already-registered name returns the existing
 * instance. File sinks are deduplicated by path so that two loggers pointing
 * at the same file share one RotatingFileSink and a single rotation state;
 * two independent sinks over one file would chase each other's renames
 * during rotation. Requesting an already-registered path with a different
 * pattern is a configuration error.
 */

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc;

use crate::config::{EngineConfig, LoggerConfig};
use crate::dispatch::{process_commands, QueueHandle, SinkId, SinkSlot};
use crate::error::{default_diagnostics, DiagnosticHandler, Error, Result};
use crate::logger::{Logger, SinkBinding};
use crate::pattern::Formatter;
use crate::sinks::{console_supports_color, ConsoleSink, RotatingFileSink};

/// Process-wide collection of named loggers sharing one dispatch queue.
///
/// The engine is built for plain caller threads: `get_logger`, `shutdown`,
/// and the loggers' `log`/`flush` all block the calling thread and must not
/// be invoked from inside an async runtime context.
pub struct Registry {
    handle: QueueHandle,
    inner: Mutex<Inner>,
    // Kept alive for the worker task; dropped last.
    _runtime: Runtime,
}

struct Inner {
    loggers: HashMap<String, Arc<Logger>>,
    console_sinks: HashMap<String, SinkId>,
    file_sinks: HashMap<PathBuf, FileSinkEntry>,
    closed: bool,
}

struct FileSinkEntry {
    id: SinkId,
    pattern: String,
}

impl Registry {
    /// Starts the worker runtime and dispatch queue. Faults are reported to
    /// stderr; use [`with_diagnostics`](Self::with_diagnostics) to intercept
    /// them instead.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_diagnostics(config, default_diagnostics())
    }

    pub fn with_diagnostics(config: EngineConfig, diagnostics: DiagnosticHandler) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(config.worker_threads.max(1))
            .thread_name("apexlog-worker")
            .build()
            .map_err(|e| Error::Configuration(format!("failed to start worker runtime: {e}")))?;

        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        runtime.spawn(process_commands(rx, diagnostics));

        Ok(Registry {
            handle: QueueHandle::new(tx, config.overflow_policy),
            inner: Mutex::new(Inner {
                loggers: HashMap::new(),
                console_sinks: HashMap::new(),
                file_sinks: HashMap::new(),
                closed: false,
            }),
            _runtime: runtime,
        })
    }

    /// Returns the logger registered under `name`, creating it on first
    /// request. An already-registered name returns the existing instance
    /// and `config` is not consulted.
    ///
    /// Construction is strict: an invalid pattern or an unopenable log file
    /// is an error here, never later on the log path.
    pub fn get_logger(&self, name: &str, config: &LoggerConfig) -> Result<Arc<Logger>> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.closed {
            return Err(Error::QueueClosed);
        }
        if let Some(existing) = inner.loggers.get(name) {
            return Ok(Arc::clone(existing));
        }

        let console_id = match inner.console_sinks.get(&config.pattern) {
            Some(&id) => id,
            None => {
                let formatter = Formatter::new(&config.pattern, console_supports_color())?;
                let id = self.handle.add_sink(SinkSlot {
                    sink: Box::new(ConsoleSink::new()),
                    formatter,
                })?;
                inner.console_sinks.insert(config.pattern.clone(), id);
                id
            }
        };
        let mut bindings = vec![SinkBinding {
            id: console_id,
            threshold: config.console_threshold,
        }];

        if let Some(path) = &config.file_path {
            let file_id = match inner.file_sinks.get(path) {
                Some(entry) => {
                    // One rotation state per file: a second sink over the
                    // same path would keep appending through the renamed
                    // inode after the first one rotates.
                    if entry.pattern != config.pattern {
                        return Err(Error::Configuration(format!(
                            "log file {} is already registered with a different pattern",
                            path.display()
                        )));
                    }
                    entry.id
                }
                None => {
                    let formatter = Formatter::new(&config.pattern, false)?;
                    let sink = RotatingFileSink::new(
                        path.clone(),
                        config.max_file_size_bytes,
                        config.max_backup_files,
                    )?;
                    let id = self.handle.add_sink(SinkSlot {
                        sink: Box::new(sink),
                        formatter,
                    })?;
                    inner.file_sinks.insert(
                        path.clone(),
                        FileSinkEntry {
                            id,
                            pattern: config.pattern.clone(),
                        },
                    );
                    id
                }
            };
            bindings.push(SinkBinding {
                id: file_id,
                threshold: config.file_threshold,
            });
        }

        let logger = Arc::new(Logger::new(
            Arc::from(name),
            self.handle.clone(),
            bindings,
        ));
        inner.loggers.insert(name.to_string(), Arc::clone(&logger));
        Ok(logger)
    }

    /// Drains the queue, flushes every sink, and closes every logger.
    /// Call once at process exit. Safe to call more than once.
    pub fn shutdown_all(&self) {
        self.shutdown(true);
    }

    /// Shuts the engine down. Without `drain`, records still queued are
    /// discarded after the sinks are flushed; use this only when exit
    /// latency matters more than the tail of the log.
    pub fn shutdown(&self, drain: bool) {
        let loggers: Vec<Arc<Logger>> = {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            if inner.closed {
                return;
            }
            inner.closed = true;
            inner.loggers.values().cloned().collect()
        };

        for logger in &loggers {
            logger.mark_shutting_down();
        }
        let _ = self.handle.shutdown(drain);
        for logger in &loggers {
            logger.mark_closed();
        }
    }

    /// Records discarded so far under `OverflowPolicy::DropAndCount`.
    /// Always zero under `Block`.
    pub fn dropped_records(&self) -> u64 {
        self.handle.dropped_records()
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.shutdown(true);
    }
}
