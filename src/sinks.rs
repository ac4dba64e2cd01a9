/*
 * Sink implementations.
 *
 * This module defines the logging destinations:
 * - ConsoleSink: writes to stdout, routing WARN and above to stderr
 * - RotatingFileSink: appends to a bounded-size file with numbered backups
 *
 * Each sink implements the Sink trait, which defines how rendered records
 * are written and flushed. Sinks are owned exclusively by the dispatch
 * worker, so no internal locking is needed. A sink that fails a write
 * reports the failure once and then degrades: further writes become silent
 * no-ops so that logging can never crash the host process.
 */

use std::fs::{self, File, OpenOptions};
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::config::Severity;
use crate::error::{Error, Result};
use crate::record::LogRecord;

/// A destination that consumes rendered log records.
#[async_trait]
pub trait Sink: Send {
    /// Writes one rendered record. `record` is available for routing
    /// decisions (the console splits streams by severity).
    async fn write(&mut self, record: &LogRecord, rendered: &str) -> Result<()>;

    /// Forces buffered output to the underlying device.
    async fn flush(&mut self) -> Result<()>;
}

/// True when ANSI color output is safe: both stdout and stderr are
/// terminals. Redirected streams get plain text.
pub fn console_supports_color() -> bool {
    io::stdout().is_terminal() && io::stderr().is_terminal()
}

fn write_line(out: &mut dyn Write, rendered: &str) -> io::Result<()> {
    out.write_all(rendered.as_bytes())?;
    out.write_all(b"\n")
}

/// Console sink. Records at WARN and above go to stderr so they survive
/// stdout redirection; everything else goes to stdout.
pub struct ConsoleSink {
    degraded: bool,
}

impl ConsoleSink {
    pub fn new() -> Self {
        ConsoleSink { degraded: false }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sink for ConsoleSink {
    async fn write(&mut self, record: &LogRecord, rendered: &str) -> Result<()> {
        if self.degraded {
            return Ok(());
        }

        let result = if record.severity >= Severity::Warn {
            write_line(&mut io::stderr().lock(), rendered)
        } else {
            write_line(&mut io::stdout().lock(), rendered)
        };

        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                // Broken pipe and friends: report once, then drop silently.
                self.degraded = true;
                Err(Error::SinkWriteFailed(e))
            }
        }
    }

    async fn flush(&mut self) -> Result<()> {
        if self.degraded {
            return Ok(());
        }
        let result = io::stdout()
            .lock()
            .flush()
            .and_then(|()| io::stderr().lock().flush());
        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                // Same policy as the write path: report once, then drop.
                self.degraded = true;
                Err(Error::SinkWriteFailed(e))
            }
        }
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// File sink with size-based rotation.
///
/// When appending would push the current file past `max_size`, the sink
/// rotates first: backup `i` is renamed to `i+1` from the highest index
/// down, the oldest backup is deleted when the count would exceed
/// `max_backups`, the current file becomes backup `.1`, and a fresh file is
/// opened. A failed rotation is surfaced as `RotationFailed`; the sink keeps
/// appending to the best available handle and retries on the next write
/// that crosses the threshold.
pub struct RotatingFileSink {
    path: PathBuf,
    file: Option<File>,
    current_size: u64,
    max_size: u64,
    max_backups: usize,
    degraded: bool,
}

impl RotatingFileSink {
    /// Opens `path` in append mode, picking up the size of any existing
    /// file. The parent directory must already exist.
    pub fn new(path: impl Into<PathBuf>, max_size: u64, max_backups: usize) -> Result<Self> {
        let path = path.into();
        let file = open_append(&path)?;
        let current_size = file.metadata().map(|m| m.len()).unwrap_or(0);
        Ok(RotatingFileSink {
            path,
            file: Some(file),
            current_size,
            max_size,
            max_backups,
            degraded: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        let mut os = self.path.clone().into_os_string();
        os.push(format!(".{index}"));
        PathBuf::from(os)
    }

    fn rotate(&mut self) -> std::result::Result<(), String> {
        // Close the current handle before renaming under it.
        self.file = None;

        if self.max_backups == 0 {
            fs::remove_file(&self.path)
                .map_err(|e| format!("remove {}: {e}", self.path.display()))?;
        } else {
            let oldest = self.backup_path(self.max_backups);
            if oldest.exists() {
                fs::remove_file(&oldest).map_err(|e| format!("evict {}: {e}", oldest.display()))?;
            }
            for index in (1..self.max_backups).rev() {
                let from = self.backup_path(index);
                if from.exists() {
                    let to = self.backup_path(index + 1);
                    fs::rename(&from, &to)
                        .map_err(|e| format!("rename {}: {e}", from.display()))?;
                }
            }
            fs::rename(&self.path, self.backup_path(1))
                .map_err(|e| format!("rename {}: {e}", self.path.display()))?;
        }

        let file = open_append(&self.path)
            .map_err(|e| format!("reopen {}: {e}", self.path.display()))?;
        self.file = Some(file);
        self.current_size = 0;
        Ok(())
    }
}

#[async_trait]
impl Sink for RotatingFileSink {
    async fn write(&mut self, _record: &LogRecord, rendered: &str) -> Result<()> {
        if self.degraded {
            return Ok(());
        }

        let len = rendered.len() as u64 + 1;
        let mut rotation_error = None;

        // Rotate before the write, never mid-write. An oversized single
        // record on an empty file is written as-is; rotating would not help.
        if self.current_size > 0 && self.current_size + len > self.max_size {
            if let Err(reason) = self.rotate() {
                rotation_error = Some(Error::RotationFailed(reason));
            }
        }

        // A failed rotation may have closed the handle; get the record onto
        // disk through the live path if at all possible.
        if self.file.is_none() {
            match open_append(&self.path) {
                Ok(file) => {
                    self.current_size = file.metadata().map(|m| m.len()).unwrap_or(0);
                    self.file = Some(file);
                }
                Err(e) => {
                    self.degraded = true;
                    return Err(Error::SinkWriteFailed(e));
                }
            }
        }

        if let Some(file) = self.file.as_mut() {
            if let Err(e) = write_line(file, rendered) {
                self.degraded = true;
                return Err(Error::SinkWriteFailed(e));
            }
            self.current_size += len;
        }

        match rotation_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn flush(&mut self) -> Result<()> {
        if let Some(file) = self.file.as_ref() {
            file.sync_all()?;
        }
        Ok(())
    }
}
