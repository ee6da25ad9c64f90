//! Localized message templates

use super::error::{LoggerError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Source of message templates keyed by message id
pub trait ResourceBundle: Send + Sync {
    /// Template for `key`, or [`LoggerError::MissingResource`]
    fn get_string(&self, key: &str) -> Result<String>;
}

/// In-memory bundle with an optional parent consulted for missing keys
///
/// # Examples
///
/// ```
/// use rust_logger_hierarchy::{MapResourceBundle, ResourceBundle};
///
/// let bundle = MapResourceBundle::new()
///     .with_entry("conn.lost", "Connection to {0} lost after {1} retries");
/// assert!(bundle.get_string("conn.lost").is_ok());
/// assert!(bundle.get_string("conn.found").is_err());
/// ```
#[derive(Default, Clone)]
pub struct MapResourceBundle {
    entries: HashMap<String, String>,
    parent: Option<Arc<dyn ResourceBundle>>,
}

impl MapResourceBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a bundle from a flat JSON object of key to template
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: HashMap<String, String> = serde_json::from_str(json)?;
        Ok(Self {
            entries,
            parent: None,
        })
    }

    #[must_use]
    pub fn with_entry(mut self, key: impl Into<String>, template: impl Into<String>) -> Self {
        self.entries.insert(key.into(), template.into());
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent: Arc<dyn ResourceBundle>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, template: impl Into<String>) {
        self.entries.insert(key.into(), template.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ResourceBundle for MapResourceBundle {
    fn get_string(&self, key: &str) -> Result<String> {
        if let Some(template) = self.entries.get(key) {
            return Ok(template.clone());
        }
        match self.parent {
            Some(ref parent) => parent.get_string(key),
            None => Err(LoggerError::missing_resource(key)),
        }
    }
}

/// Substitute positional `{N}` placeholders with `params[N]`.
///
/// Placeholders whose index has no parameter, and braces that do not enclose
/// a number, are copied through unchanged.
///
/// ```
/// use rust_logger_hierarchy::core::resource_bundle::format_message;
///
/// assert_eq!(format_message("{1} before {0}", &["a", "b"]), "b before a");
/// assert_eq!(format_message("{2} stays", &["a"]), "{2} stays");
/// ```
pub fn format_message(pattern: &str, params: &[&str]) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let substituted = after.find('}').and_then(|close| {
            let index = &after[..close];
            if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let param = index.parse::<usize>().ok().and_then(|i| params.get(i))?;
            Some((*param, close))
        });

        match substituted {
            Some((param, close)) => {
                out.push_str(param);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
