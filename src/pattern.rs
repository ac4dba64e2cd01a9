/*
 * Pattern compilation and record rendering.
 *
 * A pattern string is compiled once, when a logger is constructed, into a
 * list of segments. Recognized placeholders: {level}, {logger}, {timestamp},
 * {message}. Anything else fails fast with InvalidPattern; rendering itself
 * cannot fail at runtime.
 */

use crate::config::Severity;
use crate::error::{Error, Result};
use crate::record::LogRecord;

/// Wall-clock format with millisecond precision.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

const ANSI_RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Level,
    Logger,
    Timestamp,
    Message,
}

/// A compiled pattern. Console formatters may colorize the {level} segment;
/// file formatters never do.
#[derive(Debug, Clone)]
pub struct Formatter {
    segments: Vec<Segment>,
    colored: bool,
}

impl Formatter {
    /// Compiles `pattern`, rejecting unknown or unterminated placeholders.
    pub fn new(pattern: &str, colored: bool) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = pattern.chars();

        while let Some(c) = chars.next() {
            if c != '{' {
                literal.push(c);
                continue;
            }

            let mut name = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                name.push(c);
            }
            if !closed {
                return Err(Error::InvalidPattern(name));
            }

            let segment = match name.as_str() {
                "level" => Segment::Level,
                "logger" => Segment::Logger,
                "timestamp" => Segment::Timestamp,
                "message" => Segment::Message,
                _ => return Err(Error::InvalidPattern(name)),
            };

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(segment);
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Formatter { segments, colored })
    }

    /// Renders one record. The message is inserted verbatim, not re-escaped.
    pub fn render(&self, record: &LogRecord) -> String {
        let mut out = String::with_capacity(64 + record.message.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Level => {
                    if self.colored {
                        out.push_str(level_color(record.severity));
                        out.push_str(record.severity.as_str());
                        out.push_str(ANSI_RESET);
                    } else {
                        out.push_str(record.severity.as_str());
                    }
                }
                Segment::Logger => out.push_str(&record.logger),
                Segment::Timestamp => {
                    out.push_str(&record.timestamp.format(TIMESTAMP_FORMAT).to_string());
                }
                Segment::Message => out.push_str(&record.message),
            }
        }
        out
    }
}

fn level_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Trace => "\x1b[35m",    // magenta
        Severity::Debug => "\x1b[34m",    // blue
        Severity::Info => "\x1b[32m",     // green
        Severity::Warn => "\x1b[33m",     // yellow
        Severity::Error => "\x1b[31m",    // red
        Severity::Critical => "\x1b[1;31m", // bold red
    }
}
