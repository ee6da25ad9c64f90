//! File appender implementation

use crate::core::{Appender, Layout, LoggingEvent, LoggerError, Result};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct FileAppender {
    name: String,
    path: PathBuf,
    writer: Mutex<Option<BufWriter<File>>>,
    layout: Layout,
    immediate_flush: bool,
}

impl FileAppender {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = Self::open(&path)?;

        Ok(Self {
            name: "file".to_string(),
            path,
            writer: Mutex::new(Some(BufWriter::new(file))),
            layout: Layout::default(),
            immediate_flush: false,
        })
    }

    fn open(path: &Path) -> Result<File> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                LoggerError::io_operation(
                    "create log directory",
                    format!("Failed to create directory '{}'", parent.display()),
                    e,
                )
            })?;
        }

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                LoggerError::file_appender(
                    path.display().to_string(),
                    format!("Failed to open: {}", e),
                )
            })
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the layout for this appender
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rust_logger_hierarchy::appenders::FileAppender;
    /// use rust_logger_hierarchy::{Layout, TimestampFormat};
    ///
    /// let appender = FileAppender::new("/var/log/app.log")
    ///     .unwrap()
    ///     .with_layout(Layout::text().with_timestamp_format(TimestampFormat::Rfc3339));
    /// ```
    #[must_use]
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// Flush after every event instead of leaving it to the buffer
    #[must_use]
    pub fn with_immediate_flush(mut self, enabled: bool) -> Self {
        self.immediate_flush = enabled;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Appender for FileAppender {
    fn append(&self, event: &LoggingEvent) -> Result<()> {
        let mut guard = self.writer.lock();
        let writer = guard
            .as_mut()
            .ok_or_else(|| LoggerError::appender_closed(&self.name))?;

        let mut output = self.layout.format(event);
        output.push('\n');

        writer.write_all(output.as_bytes())?;
        if self.immediate_flush {
            writer.flush()?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        if let Some(ref mut writer) = *self.writer.lock() {
            writer.flush()?;
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        // Dropping the writer releases the file handle
        if let Some(mut writer) = self.writer.lock().take() {
            writer.flush()?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for FileAppender {
    fn drop(&mut self) {
        // Ensure all buffered data is flushed to disk
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Level, LocationInfo};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn event(message: &str) -> LoggingEvent {
        LoggingEvent::new(
            Arc::from("file.test"),
            Level::INFO,
            message.to_string(),
            LocationInfo::unavailable(),
        )
    }

    #[test]
    fn test_writes_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("app.log");
        let appender = FileAppender::new(&path).unwrap().with_layout(Layout::simple());

        appender.append(&event("first")).unwrap();
        appender.append(&event("second")).unwrap();
        appender.flush().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "INFO - first\nINFO - second\n");
    }

    #[test]
    fn test_closed_appender_rejects_events() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("closed.log");
        let appender = FileAppender::new(&path)
            .unwrap()
            .with_name("audit")
            .with_layout(Layout::simple())
            .with_immediate_flush(true);

        appender.append(&event("kept")).unwrap();
        appender.close().unwrap();
        appender.close().unwrap();

        assert!(matches!(
            appender.append(&event("lost")),
            Err(LoggerError::AppenderClosed { ref name }) if name == "audit"
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), "INFO - kept\n");
    }
}
