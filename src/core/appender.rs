//! Appender trait for log output destinations

use super::{error::Result, event::LoggingEvent};
use std::sync::Arc;

/// A sink that consumes logging events
///
/// Appenders are shared: the same handle may be attached to several loggers
/// and invoked from many threads at once, so every method takes `&self` and
/// implementations keep their mutable state behind their own lock.
///
/// `append` runs while the guard of the logger it is attached to is held. The
/// guard is not reentrant: an appender must not log through that logger (or
/// through a descendant whose dispatch reaches it).
pub trait Appender: Send + Sync {
    fn append(&self, event: &LoggingEvent) -> Result<()>;

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Release the underlying resource. Appending afterwards is an error.
    fn close(&self) -> Result<()>;

    fn name(&self) -> &str;
}

/// Shared handle to an appender
pub type AppenderRef = Arc<dyn Appender>;

/// Identity comparison of two handles (same allocation)
#[inline]
pub fn same_appender(a: &AppenderRef, b: &AppenderRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
