/*
 * Configuration for the logging engine.
 *
 * This module handles:
 * - The Severity enum (ordered levels) with case-insensitive deserialization
 * - The per-sink level filter (Severity::should_log)
 * - The overflow policy applied when the dispatch queue is full
 * - EngineConfig (queue sizing, worker threads) and LoggerConfig (per-logger
 *   thresholds, file rotation settings, output pattern)
 * - Loading both from a TOML file, falling back to defaults when the file is
 *   missing
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Default output pattern: `[INFO] [svc] [2024-01-01 12:00:00.000] message`.
pub const DEFAULT_PATTERN: &str = "[{level}] [{logger}] [{timestamp}] {message}";

/// Log severity, ordered from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Critical,
}

// Separate implementation of Deserialize to handle case-insensitive values
impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.to_lowercase().as_str() {
            "trace" => Ok(Severity::Trace),
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warn" | "warning" => Ok(Severity::Warn),
            "error" => Ok(Severity::Error),
            "critical" | "fatal" => Ok(Severity::Critical),
            _ => Err(serde::de::Error::unknown_variant(
                &s,
                &["trace", "debug", "info", "warn", "error", "critical"],
            )),
        }
    }
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }

    /// Per-sink inclusion decision: a record is emitted to a sink iff it is
    /// at least as severe as that sink's threshold.
    pub fn should_log(self, threshold: Severity) -> bool {
        self >= threshold
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the dispatch queue does with a record when it is full.
///
/// The policy is fixed per engine and uniform across loggers. `Block` is the
/// default: producers wait for space, nothing is dropped. `DropAndCount`
/// discards the record and increments the counter exposed through
/// [`Registry::dropped_records`](crate::Registry::dropped_records).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OverflowPolicy {
    Block,
    DropAndCount,
}

impl Default for OverflowPolicy {
    fn default() -> Self {
        OverflowPolicy::Block
    }
}

impl<'de> Deserialize<'de> for OverflowPolicy {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.to_lowercase().as_str() {
            "block" => Ok(OverflowPolicy::Block),
            "drop" | "drop_and_count" => Ok(OverflowPolicy::DropAndCount),
            _ => Err(serde::de::Error::unknown_variant(
                &s,
                &["block", "drop", "drop_and_count"],
            )),
        }
    }
}

/// Engine-wide settings: one dispatch queue shared by every logger a
/// [`Registry`](crate::Registry) hands out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the dispatch queue, fixed at construction.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Threads backing the worker runtime. Dispatch itself stays a single
    /// task so FIFO ordering holds regardless of this value.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    /// Behavior when the queue is full.
    #[serde(default)]
    pub overflow_policy: OverflowPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            queue_capacity: default_queue_capacity(),
            worker_threads: default_worker_threads(),
            overflow_policy: OverflowPolicy::default(),
        }
    }
}

/// Per-logger settings. The file sink is optional; the console sink is
/// always attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Minimum severity emitted to the console sink.
    #[serde(default = "default_console_threshold")]
    pub console_threshold: Severity,

    /// Minimum severity emitted to the file sink. The file typically runs
    /// more verbose than the console.
    #[serde(default = "default_file_threshold")]
    pub file_threshold: Severity,

    /// Path of the active log file. Its parent directory must already
    /// exist. `None` disables the file sink.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Size threshold that triggers rotation.
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,

    /// Rotated files are suffixed `.1`, `.2`, ... up to this count; the
    /// oldest is deleted when the count would be exceeded.
    #[serde(default = "default_max_backup_files")]
    pub max_backup_files: usize,

    /// Output pattern; validated when the logger is created.
    #[serde(default = "default_pattern")]
    pub pattern: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        LoggerConfig {
            console_threshold: default_console_threshold(),
            file_threshold: default_file_threshold(),
            file_path: None,
            max_file_size_bytes: default_max_file_size(),
            max_backup_files: default_max_backup_files(),
            pattern: default_pattern(),
        }
    }
}

fn default_queue_capacity() -> usize {
    8192
}

fn default_worker_threads() -> usize {
    1
}

fn default_console_threshold() -> Severity {
    Severity::Info
}

fn default_file_threshold() -> Severity {
    Severity::Debug
}

fn default_max_file_size() -> u64 {
    5 * 1024 * 1024
}

fn default_max_backup_files() -> usize {
    3
}

fn default_pattern() -> String {
    DEFAULT_PATTERN.to_string()
}

/// Configuration wrapper to handle the [engine] and [logger] sections in TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigWrapper {
    #[serde(default)]
    engine: EngineConfig,
    #[serde(default)]
    logger: LoggerConfig,
}

/// Engine settings plus the default logger template loaded from a file.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub engine: EngineConfig,
    pub logger: LoggerConfig,
}

impl Config {
    /// Loads configuration from a TOML file. A missing or unreadable file
    /// yields the defaults with a warning; a malformed file is an error.
    pub fn from_file(path: &str) -> Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("apexlog: could not read config file '{path}': {e}. Using defaults.");
                return Ok(Config::default());
            }
        };

        let wrapper: ConfigWrapper = toml::from_str(&raw)
            .map_err(|e| Error::Configuration(format!("failed to parse '{path}': {e}")))?;

        Ok(Config {
            engine: wrapper.engine,
            logger: wrapper.logger,
        })
    }
}
