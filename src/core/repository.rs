//! Boundary between logger nodes and the repository that owns them

use super::appender::AppenderRef;
use super::logger::{Logger, LoggerNode};
use std::fmt;
use std::sync::Arc;

/// Index of a node in its repository's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoggerId(pub usize);

impl fmt::Display for LoggerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a logger needs from the repository that owns it.
///
/// Besides arena access for following parent links, a logger calls out for
/// exactly three things: the global severity kill switch, the attach hook and
/// the "no appender reached this event" diagnostic.
pub trait LoggerRepository: Send + Sync {
    /// Node stored under `id`
    fn node(&self, id: LoggerId) -> Option<Arc<LoggerNode>>;

    /// `true` when every event of this rank is muted, whatever the loggers say
    fn is_disabled(&self, rank: i32) -> bool;

    /// Called after `appender` was attached to `logger`
    fn on_appender_attached(&self, logger: &Logger, appender: &AppenderRef);

    /// Called once per dispatch that reached no appender at all
    fn on_no_appender_reached(&self, logger: &Logger);
}
