//! Rendering of logging events for the bundled appenders
//!
//! - Simple: `WARN - pool exhausted`
//! - Text: `[2025-01-08T10:30:45.123Z] [WARN ] [main] db.pool - pool exhausted`
//! - Json: one object per event, for machine processing

use super::event::LoggingEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp format options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimestampFormat {
    /// `2025-01-08T10:30:45.123Z`
    #[default]
    Iso8601,
    /// `2025-01-08T10:30:45.123456Z`
    Iso8601Micros,
    /// `2025-01-08T10:30:45.123456+00:00`
    Rfc3339,
    /// `1736332245`
    Unix,
    /// `1736332245123`
    UnixMillis,
    /// Any strftime-compatible format string
    Custom(String),
}

impl TimestampFormat {
    #[must_use]
    pub fn format(&self, datetime: &DateTime<Utc>) -> String {
        match self {
            TimestampFormat::Iso8601 => datetime.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            TimestampFormat::Iso8601Micros => datetime.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string(),
            TimestampFormat::Rfc3339 => datetime.to_rfc3339(),
            TimestampFormat::Unix => datetime.timestamp().to_string(),
            TimestampFormat::UnixMillis => datetime.timestamp_millis().to_string(),
            TimestampFormat::Custom(format_str) => datetime.format(format_str).to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutStyle {
    Simple,
    #[default]
    Text,
    Json,
}

/// How an appender turns an event into one line of output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub style: LayoutStyle,
    pub timestamp_format: TimestampFormat,
    /// Append `(file:line)` to text output when the call site is known
    pub include_location: bool,
}

impl Layout {
    #[must_use]
    pub fn simple() -> Self {
        Self {
            style: LayoutStyle::Simple,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn text() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn json() -> Self {
        Self {
            style: LayoutStyle::Json,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    #[must_use]
    pub fn with_location(mut self, include: bool) -> Self {
        self.include_location = include;
        self
    }

    /// Render without a trailing newline
    #[must_use]
    pub fn format(&self, event: &LoggingEvent) -> String {
        match self.style {
            LayoutStyle::Simple => format!("{} - {}", event.level(), event.message()),
            LayoutStyle::Text => self.format_text(event),
            LayoutStyle::Json => self.format_json(event),
        }
    }

    fn format_text(&self, event: &LoggingEvent) -> String {
        let mut line = format!(
            "[{}] [{:5}] [{}] {} - {}",
            self.timestamp_format.format(event.timestamp()),
            event.level(),
            event.thread_label(),
            event.logger_name(),
            event.message()
        );

        if self.include_location {
            let location = event.location();
            if let (Some(file), Some(line_no)) = (location.file, location.line) {
                line.push_str(&format!(" ({}:{})", file, line_no));
            }
        }

        line
    }

    fn format_json(&self, event: &LoggingEvent) -> String {
        let mut json_obj = serde_json::Map::new();

        json_obj.insert(
            "timestamp".to_string(),
            serde_json::Value::String(self.timestamp_format.format(event.timestamp())),
        );
        json_obj.insert(
            "level".to_string(),
            serde_json::Value::String(event.level().name().to_string()),
        );
        json_obj.insert(
            "logger".to_string(),
            serde_json::Value::String(event.logger_name().to_string()),
        );
        json_obj.insert(
            "message".to_string(),
            serde_json::Value::String(event.message().to_string()),
        );
        json_obj.insert(
            "thread".to_string(),
            serde_json::Value::String(event.thread_label().to_string()),
        );

        let location = event.location();
        if let Some(file) = location.file {
            json_obj.insert("file".to_string(), serde_json::Value::String(file.to_string()));
        }
        if let Some(line) = location.line {
            json_obj.insert("line".to_string(), serde_json::Value::Number(line.into()));
        }

        serde_json::Value::Object(json_obj).to_string()
    }
}
