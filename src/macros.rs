//! Logging macros with call-site capture
//!
//! The macros check the level gate before formatting, so a disabled
//! statement costs one comparison and no allocation. The event carries the
//! file, line and module of the macro invocation.
//!
//! # Examples
//!
//! ```
//! use rust_logger_hierarchy::prelude::*;
//! use rust_logger_hierarchy::info;
//!
//! let hierarchy = Hierarchy::new();
//! let logger = hierarchy.logger("server");
//!
//! info!(logger, "Server started");
//!
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//! ```

/// Location of the macro invocation as a [`LocationInfo`](crate::LocationInfo)
#[macro_export]
macro_rules! location {
    () => {
        $crate::LocationInfo::new(file!(), line!(), module_path!())
    };
}

/// Log at an explicit level.
///
/// # Examples
///
/// ```
/// # use rust_logger_hierarchy::prelude::*;
/// # let logger = Hierarchy::new().logger("app");
/// use rust_logger_hierarchy::log;
/// log!(logger, Level::INFO, "Simple message");
/// log!(logger, Level::ERROR, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {{
        let logger = &$logger;
        let level = $level;
        if logger.is_enabled_for(level) {
            logger.forced_log(level, format!($($arg)+), $crate::location!());
        }
    }};
}

#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::TRACE, $($arg)+)
    };
}

#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::DEBUG, $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::INFO, $($arg)+)
    };
}

#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::WARN, $($arg)+)
    };
}

#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::ERROR, $($arg)+)
    };
}

/// Log a fatal message. Logging does not abort the process.
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::FATAL, $($arg)+)
    };
}
