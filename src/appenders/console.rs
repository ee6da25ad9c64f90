//! Console appender implementation

use crate::core::{Appender, Layout, Level, LoggingEvent, LoggerError, Result};
use colored::{Color, Colorize};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConsoleTarget {
    /// stdout, with ERROR and above routed to stderr
    #[default]
    Split,
    Stdout,
    Stderr,
}

pub struct ConsoleAppender {
    name: String,
    use_colors: bool,
    target: ConsoleTarget,
    layout: Layout,
    closed: AtomicBool,
}

impl ConsoleAppender {
    pub fn new() -> Self {
        Self {
            name: "console".to_string(),
            use_colors: true,
            target: ConsoleTarget::default(),
            layout: Layout::default(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_colors(use_colors: bool) -> Self {
        Self {
            use_colors,
            ..Self::new()
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_target(mut self, target: ConsoleTarget) -> Self {
        self.target = target;
        self
    }

    /// Set the layout for this appender
    ///
    /// # Example
    ///
    /// ```
    /// use rust_logger_hierarchy::appenders::ConsoleAppender;
    /// use rust_logger_hierarchy::Layout;
    ///
    /// let appender = ConsoleAppender::new().with_layout(Layout::json());
    /// ```
    #[must_use]
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    fn color_for(level: Level) -> Color {
        match level.rank() {
            r if r >= Level::FATAL_INT => Color::BrightRed,
            r if r >= Level::ERROR_INT => Color::Red,
            r if r >= Level::WARN_INT => Color::Yellow,
            r if r >= Level::INFO_INT => Color::Green,
            r if r >= Level::DEBUG_INT => Color::Blue,
            _ => Color::BrightBlack,
        }
    }

    fn render(&self, event: &LoggingEvent) -> String {
        let line = self.layout.format(event);
        if !self.use_colors {
            return line;
        }
        // only the level name is colored
        let level = event.level().name();
        match line.find(level) {
            Some(idx) => format!(
                "{}{}{}",
                &line[..idx],
                level.color(Self::color_for(event.level())),
                &line[idx + level.len()..]
            ),
            None => line,
        }
    }

    fn to_stderr(&self, level: Level) -> bool {
        match self.target {
            ConsoleTarget::Split => level.is_at_least(&Level::ERROR),
            ConsoleTarget::Stdout => false,
            ConsoleTarget::Stderr => true,
        }
    }
}

impl Default for ConsoleAppender {
    fn default() -> Self {
        Self::new()
    }
}

impl Appender for ConsoleAppender {
    fn append(&self, event: &LoggingEvent) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LoggerError::appender_closed(&self.name));
        }

        let output = self.render(event);
        if self.to_stderr(event.level()) {
            writeln!(std::io::stderr().lock(), "{}", output)?;
        } else {
            writeln!(std::io::stdout().lock(), "{}", output)?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        // Flush both stdout and stderr since we write to both
        std::io::stdout().flush()?;
        std::io::stderr().flush()?;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        self.flush()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
