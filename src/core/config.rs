//! Programmatic configuration of a hierarchy
//!
//! [`HierarchyConfig`] is a plain serde structure, so it can come from any
//! format the application already reads. Appenders are not part of it: they
//! are built in code and attached to loggers directly.

use super::{diagnostics, hierarchy::Hierarchy, level::Level};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Level text meaning "no explicit level, inherit from the parent"
const INHERITED: [&str; 2] = ["INHERITED", "NULL"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Level name, `INHERITED`/`NULL` to inherit; unknown names mean DEBUG
    pub level: Option<String>,
    pub additive: Option<bool>,
}

impl LoggerConfig {
    #[must_use]
    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    #[must_use]
    pub fn additive(mut self, additive: bool) -> Self {
        self.additive = Some(additive);
        self
    }
}

/// Whole-hierarchy configuration
///
/// # Example
///
/// ```
/// use rust_logger_hierarchy::prelude::*;
///
/// let config: HierarchyConfig = serde_json::from_str(r#"{
///     "root_level": "WARN",
///     "loggers": { "db.pool": { "level": "TRACE", "additive": false } }
/// }"#).unwrap();
///
/// let hierarchy = Hierarchy::new();
/// hierarchy.configure(&config);
/// assert_eq!(hierarchy.logger("db.pool").level(), Some(Level::TRACE));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchyConfig {
    pub threshold: Option<String>,
    pub root_level: Option<String>,
    /// Print internal debug diagnostics (process-wide)
    pub debug: Option<bool>,
    /// Silence internal diagnostics other than critical ones (process-wide)
    pub quiet: Option<bool>,
    pub loggers: BTreeMap<String, LoggerConfig>,
}

impl HierarchyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn threshold(mut self, level: impl Into<String>) -> Self {
        self.threshold = Some(level.into());
        self
    }

    #[must_use]
    pub fn root_level(mut self, level: impl Into<String>) -> Self {
        self.root_level = Some(level.into());
        self
    }

    #[must_use]
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = Some(enabled);
        self
    }

    #[must_use]
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = Some(quiet);
        self
    }

    #[must_use]
    pub fn logger(mut self, name: impl Into<String>, config: LoggerConfig) -> Self {
        self.loggers.insert(name.into(), config);
        self
    }
}

/// `None` for inherit, otherwise the parsed level (DEBUG when unknown)
fn parse_level_option(text: &str) -> Option<Level> {
    let trimmed = text.trim();
    if INHERITED.iter().any(|s| s.eq_ignore_ascii_case(trimmed)) {
        return None;
    }
    let level = Level::parse(trimmed, Level::DEBUG);
    if level == Level::DEBUG && !trimmed.eq_ignore_ascii_case("DEBUG") {
        diagnostics::warn(format!(
            "Unknown level \"{}\", using {}",
            trimmed,
            Level::DEBUG
        ));
    }
    Some(level)
}

impl Hierarchy {
    /// Apply `config` on top of the current state. Only the settings present
    /// in the configuration change.
    pub fn configure(&self, config: &HierarchyConfig) {
        if let Some(debug) = config.debug {
            diagnostics::set_internal_debugging(debug);
        }
        if let Some(quiet) = config.quiet {
            diagnostics::set_quiet_mode(quiet);
        }

        if let Some(ref threshold) = config.threshold {
            self.set_threshold(Level::parse(threshold, Level::ALL));
        }

        if let Some(ref text) = config.root_level {
            match parse_level_option(text) {
                Some(level) => self.root_logger().set_level(Some(level)),
                None => diagnostics::error("The root logger cannot inherit a level; ignoring."),
            }
        }

        for (name, logger_config) in &config.loggers {
            let logger = self.logger(name);
            if let Some(ref text) = logger_config.level {
                logger.set_level(parse_level_option(text));
            }
            if let Some(additive) = logger_config.additive {
                logger.set_additivity(additive);
            }
            diagnostics::debug(format!("Configured logger '{}': {:?}", name, logger));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_configuration() {
        let config = HierarchyConfig::new()
            .threshold("INFO")
            .root_level("ERROR")
            .logger("app", LoggerConfig::default().level("TRACE"))
            .logger("app.noisy", LoggerConfig::default().additive(false));

        let hierarchy = Hierarchy::new();
        hierarchy.configure(&config);

        assert_eq!(hierarchy.threshold(), Level::INFO);
        assert_eq!(hierarchy.root_logger().level(), Some(Level::ERROR));
        assert_eq!(hierarchy.logger("app").level(), Some(Level::TRACE));
        let noisy = hierarchy.logger("app.noisy");
        assert!(!noisy.additivity());
        assert_eq!(noisy.effective_level().unwrap(), Level::TRACE);
    }

    #[test]
    fn test_inherited_keyword_clears_level() {
        let hierarchy = Hierarchy::new();
        let logger = hierarchy.logger("svc");
        logger.set_level(Some(Level::ERROR));

        hierarchy.configure(
            &HierarchyConfig::new().logger("svc", LoggerConfig::default().level("inherited")),
        );
        assert_eq!(logger.level(), None);
    }

    #[test]
    fn test_root_cannot_inherit() {
        let hierarchy = Hierarchy::with_root_level(Level::WARN);
        hierarchy.configure(&HierarchyConfig::new().root_level("NULL"));
        assert_eq!(hierarchy.root_logger().level(), Some(Level::WARN));
    }

    #[test]
    fn test_unknown_level_defaults_to_debug() {
        assert_eq!(parse_level_option("chatty"), Some(Level::DEBUG));
        assert_eq!(parse_level_option("Warn"), Some(Level::WARN));
        assert_eq!(parse_level_option("null"), None);
    }

    #[test]
    fn test_deserialize_from_json() {
        let config: HierarchyConfig = serde_json::from_str(
            r#"{"threshold": "WARN", "loggers": {"a.b": {"level": "INFO"}}}"#,
        )
        .unwrap();

        assert_eq!(config.threshold.as_deref(), Some("WARN"));
        assert!(config.root_level.is_none());
        assert_eq!(config.debug, None);
        assert_eq!(config.quiet, None);
        assert_eq!(config.loggers["a.b"].level.as_deref(), Some("INFO"));
        assert_eq!(config.loggers["a.b"].additive, None);
    }

    #[test]
    fn test_partial_config_keeps_diagnostic_switches() {
        let hierarchy = Hierarchy::new();
        diagnostics::set_internal_debugging(true);

        hierarchy.configure(&HierarchyConfig::new().threshold("ALL"));
        assert!(diagnostics::is_internal_debugging());
        assert!(!diagnostics::is_quiet_mode());

        hierarchy.configure(&HierarchyConfig::new().debug(false));
        assert!(!diagnostics::is_internal_debugging());
    }
}
