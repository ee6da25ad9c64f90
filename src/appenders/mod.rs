//! Appender implementations

pub mod async_appender;
#[cfg(feature = "console")]
pub mod console;
pub mod file;
pub mod network;
pub mod rolling_file;
pub mod triggering_policy;

pub use async_appender::{AsyncAppender, DEFAULT_BUFFER_SIZE, DEFAULT_SHUTDOWN_TIMEOUT};
#[cfg(feature = "console")]
pub use console::{ConsoleAppender, ConsoleTarget};
pub use file::FileAppender;
pub use network::NetworkAppender;
pub use rolling_file::RollingFileAppender;
pub use triggering_policy::{
    CompositeTriggeringPolicy, SizeBasedTriggeringPolicy, TimeBasedTriggeringPolicy,
    TriggeringPolicy,
};

pub use crate::core::Appender;
