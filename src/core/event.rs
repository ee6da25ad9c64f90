//! Logging event structure

use super::level::Level;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cell::RefCell;
use std::sync::Arc;

// Thread-local caches for thread information to avoid repeated allocations
thread_local! {
    static THREAD_ID_CACHE: RefCell<Option<String>> = const { RefCell::new(None) };
    static THREAD_NAME_CACHE: RefCell<Option<Option<String>>> = const { RefCell::new(None) };
}

/// Get cached thread ID, computing and caching it on first access
fn get_thread_id() -> String {
    THREAD_ID_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| format!("{:?}", std::thread::current().id()))
            .clone()
    })
}

/// Get cached thread name, computing and caching it on first access
fn get_thread_name() -> Option<String> {
    THREAD_NAME_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| std::thread::current().name().map(String::from))
            .clone()
    })
}

/// Call-site location of a logging request
///
/// Usually produced by the [`location!`](crate::location) macro.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LocationInfo {
    pub file: Option<&'static str>,
    pub line: Option<u32>,
    pub module_path: Option<&'static str>,
}

impl LocationInfo {
    #[must_use]
    pub const fn new(file: &'static str, line: u32, module_path: &'static str) -> Self {
        Self {
            file: Some(file),
            line: Some(line),
            module_path: Some(module_path),
        }
    }

    /// Location for calls that did not capture one
    #[must_use]
    pub const fn unavailable() -> Self {
        Self {
            file: None,
            line: None,
            module_path: None,
        }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.file.is_some()
    }
}

/// One logging request, built once and handed to every appender the
/// dispatch walk reaches
#[derive(Debug, Clone, Serialize)]
pub struct LoggingEvent {
    logger_name: Arc<str>,
    level: Level,
    message: String,
    timestamp: DateTime<Utc>,
    location: LocationInfo,
    thread_id: String,
    thread_name: Option<String>,
}

impl LoggingEvent {
    pub fn new(
        logger_name: Arc<str>,
        level: Level,
        message: String,
        location: LocationInfo,
    ) -> Self {
        Self {
            logger_name,
            level,
            message,
            timestamp: Utc::now(),
            location,
            thread_id: get_thread_id(),
            thread_name: get_thread_name(),
        }
    }

    /// Override the capture time, mostly useful for deterministic tests
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    #[must_use]
    pub fn logger_name(&self) -> &str {
        &self.logger_name
    }

    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn timestamp(&self) -> &DateTime<Utc> {
        &self.timestamp
    }

    #[must_use]
    pub fn location(&self) -> &LocationInfo {
        &self.location
    }

    #[must_use]
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    #[must_use]
    pub fn thread_name(&self) -> Option<&str> {
        self.thread_name.as_deref()
    }

    /// Thread name when the thread has one, its id otherwise
    #[must_use]
    pub fn thread_label(&self) -> &str {
        self.thread_name.as_deref().unwrap_or(&self.thread_id)
    }
}
