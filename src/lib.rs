//! # Rust Logger Hierarchy
//!
//! Named loggers arranged in a dot-separated tree, with level inheritance and
//! additive dispatch to appenders.
//!
//! ## Features
//!
//! - **Hierarchical levels**: a logger without a level inherits its nearest
//!   ancestor's, so `db.pool` follows `db` until told otherwise
//! - **Additive dispatch**: an event reaches the appenders of its logger and
//!   every ancestor, up to the first non-additive one
//! - **Cheap gating**: a global threshold and the effective level are checked
//!   without taking any lock
//! - **Localized messages**: keys resolved through a resource bundle, with
//!   `{0}`-style parameters
//! - **Appenders**: console, file, rolling file, TCP and a queued appender
//!   that hands events to a worker thread
//!
//! ## Example
//!
//! ```
//! use rust_logger_hierarchy::prelude::*;
//! use rust_logger_hierarchy::appenders::FileAppender;
//! use std::sync::Arc;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let hierarchy = Hierarchy::with_root_level(Level::WARN);
//! hierarchy
//!     .root_logger()
//!     .add_appender(Arc::new(FileAppender::new(dir.path().join("app.log")).unwrap()));
//!
//! let pool = hierarchy.logger("db.pool");
//! pool.info("not written: inherits WARN from the root");
//! pool.error("written");
//!
//! hierarchy.logger("db").set_level(Some(Level::DEBUG));
//! assert!(pool.is_info_enabled());
//! hierarchy.shutdown();
//! ```

pub mod appenders;
pub mod core;
pub mod macros;
pub mod net;

pub mod prelude {
    pub use crate::core::{
        Appender, AppenderRef, Hierarchy, HierarchyConfig, Layout, Level, LocationInfo, Logger,
        LoggerConfig, LoggerError, LoggingEvent, ResourceBundle, Result,
    };
}

pub use crate::core::{
    diagnostics, format_message, Appender, AppenderAttachable, AppenderRef, DispatchMetrics,
    Hierarchy, HierarchyConfig, HierarchyEventListener, Layout, LayoutStyle, Level, LocationInfo,
    Logger, LoggerConfig, LoggerError, LoggerId, LoggerNode, LoggerRepository, LoggingEvent,
    MapResourceBundle, OverflowCallback, OverflowPolicy, ResourceBundle, Result, TimestampFormat,
    ROOT_LOGGER_NAME,
};
pub use net::ServerSocket;
