//! Log value objects
//! On-disk line format and the parsed forms returned to callers

use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

static LINE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\S+) \[(stdout|stderr)\] ?(.*)$").expect("static log line pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogStream {
    #[default]
    Stdout,
    Stderr,
}

impl LogStream {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "stdout" => Some(Self::Stdout),
            "stderr" => Some(Self::Stderr),
            _ => None,
        }
    }
}

impl fmt::Display for LogStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

/// One parsed log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// 1-based position in the file
    pub line_number: usize,
    /// None when the line did not carry a parseable timestamp
    pub timestamp: Option<DateTime<Utc>>,
    pub stream: LogStream,
    pub content: String,
}

impl LogEntry {
    /// Parse a stored line. Lines not in `<ts> [stream] <content>` form come back
    /// as raw stdout entries.
    pub fn parse(line: &str, line_number: usize) -> Self {
        if let Some(caps) = LINE_PATTERN.captures(line) {
            if let Some(stream) = LogStream::parse(&caps[2]) {
                return Self {
                    line_number,
                    timestamp: parse_timestamp(&caps[1]),
                    stream,
                    content: caps[3].to_string(),
                };
            }
        }

        Self {
            line_number,
            timestamp: None,
            stream: LogStream::Stdout,
            content: line.to_string(),
        }
    }
}

/// Render a line for the on-disk log
pub fn format_log_line(at: DateTime<Utc>, stream: LogStream, content: &str) -> String {
    format!(
        "{} [{}] {}\n",
        at.to_rfc3339_opts(SecondsFormat::Millis, true),
        stream,
        content
    )
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// A search hit with surrounding context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub line_number: usize,
    pub timestamp: Option<DateTime<Utc>>,
    /// Full stored line
    pub content: String,
    pub context_before: Vec<String>,
    pub context_after: Vec<String>,
    pub run_id: String,
}

/// Metadata for one archived run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRunInfo {
    pub run_id: String,
    pub archived_at: DateTime<Utc>,
    pub file_path: PathBuf,
    pub file_size: u64,
}
