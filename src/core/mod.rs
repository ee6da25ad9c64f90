//! Core logger types and traits

pub mod appender;
pub mod attachable;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod event;
pub mod hierarchy;
pub mod layout;
pub mod level;
pub mod logger;
pub mod metrics;
pub mod overflow_policy;
pub mod repository;
pub mod resource_bundle;

pub use appender::{same_appender, Appender, AppenderRef};
pub use attachable::AppenderAttachable;
pub use config::{HierarchyConfig, LoggerConfig};
pub use error::{LoggerError, Result};
pub use event::{LocationInfo, LoggingEvent};
pub use hierarchy::{Hierarchy, HierarchyEventListener, ROOT_LOGGER_NAME};
pub use layout::{Layout, LayoutStyle, TimestampFormat};
pub use level::Level;
pub use logger::{Logger, LoggerNode};
pub use metrics::DispatchMetrics;
pub use overflow_policy::{OverflowCallback, OverflowPolicy};
pub use repository::{LoggerId, LoggerRepository};
pub use resource_bundle::{format_message, MapResourceBundle, ResourceBundle};
