//! Severity levels
//!
//! A [`Level`] is an integer rank with a display name. The standard scale is
//! `TRACE < DEBUG < INFO < WARN < ERROR < FATAL`, bracketed by [`Level::ALL`]
//! and [`Level::OFF`]. Applications may define their own ranks anywhere on the
//! scale and make them parseable with [`Level::register`].
//!
//! Ordering, equality and hashing look at the rank only, so two custom levels
//! sharing a rank are equally severe.

use super::error::LoggerError;
use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

static REGISTERED: RwLock<Vec<Level>> = parking_lot::const_rwlock(Vec::new());

#[derive(Debug, Clone, Copy)]
pub struct Level {
    rank: i32,
    name: &'static str,
    syslog_equivalent: u8,
}

impl Level {
    pub const OFF_INT: i32 = i32::MAX;
    pub const FATAL_INT: i32 = 50_000;
    pub const ERROR_INT: i32 = 40_000;
    pub const WARN_INT: i32 = 30_000;
    pub const INFO_INT: i32 = 20_000;
    pub const DEBUG_INT: i32 = 10_000;
    pub const TRACE_INT: i32 = 5_000;
    pub const ALL_INT: i32 = i32::MIN;

    pub const OFF: Level = Level::new(Self::OFF_INT, "OFF", 0);
    pub const FATAL: Level = Level::new(Self::FATAL_INT, "FATAL", 0);
    pub const ERROR: Level = Level::new(Self::ERROR_INT, "ERROR", 3);
    pub const WARN: Level = Level::new(Self::WARN_INT, "WARN", 4);
    pub const INFO: Level = Level::new(Self::INFO_INT, "INFO", 6);
    pub const DEBUG: Level = Level::new(Self::DEBUG_INT, "DEBUG", 7);
    pub const TRACE: Level = Level::new(Self::TRACE_INT, "TRACE", 7);
    pub const ALL: Level = Level::new(Self::ALL_INT, "ALL", 7);

    const STANDARD: [Level; 8] = [
        Level::ALL,
        Level::TRACE,
        Level::DEBUG,
        Level::INFO,
        Level::WARN,
        Level::ERROR,
        Level::FATAL,
        Level::OFF,
    ];

    /// Define a level. Custom levels only become visible to [`Level::parse`]
    /// once registered.
    #[must_use]
    pub const fn new(rank: i32, name: &'static str, syslog_equivalent: u8) -> Self {
        Self {
            rank,
            name,
            syslog_equivalent,
        }
    }

    #[inline]
    #[must_use]
    pub const fn rank(&self) -> i32 {
        self.rank
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn syslog_equivalent(&self) -> u8 {
        self.syslog_equivalent
    }

    /// `true` when this level is at least as severe as `other`
    #[inline]
    #[must_use]
    pub fn is_at_least(&self, other: &Level) -> bool {
        self.rank >= other.rank
    }

    /// Make a custom level known to [`Level::parse`] and [`Level::from_rank`].
    ///
    /// Registering a name a second time replaces the earlier definition.
    pub fn register(level: Level) {
        let mut registered = REGISTERED.write();
        if let Some(existing) = registered
            .iter_mut()
            .find(|l| l.name.eq_ignore_ascii_case(level.name))
        {
            *existing = level;
        } else {
            registered.push(level);
        }
    }

    /// Resolve level text, falling back to `default` when nothing matches
    ///
    /// # Examples
    ///
    /// ```
    /// use rust_logger_hierarchy::Level;
    ///
    /// assert_eq!(Level::parse("warn", Level::DEBUG), Level::WARN);
    /// assert_eq!(Level::parse("chatty", Level::DEBUG), Level::DEBUG);
    /// ```
    #[must_use]
    pub fn parse(text: &str, default: Level) -> Level {
        Self::lookup(text.trim()).unwrap_or(default)
    }

    /// Resolve a rank to a standard or registered level
    #[must_use]
    pub fn from_rank(rank: i32, default: Level) -> Level {
        if let Some(level) = Self::STANDARD.iter().find(|l| l.rank == rank) {
            return *level;
        }
        REGISTERED
            .read()
            .iter()
            .find(|l| l.rank == rank)
            .copied()
            .unwrap_or(default)
    }

    /// The standard scale, lowest first
    #[must_use]
    pub fn standard() -> &'static [Level] {
        &Self::STANDARD
    }

    fn lookup(text: &str) -> Option<Level> {
        if text.eq_ignore_ascii_case("WARNING") {
            return Some(Level::WARN);
        }
        if let Some(level) = Self::STANDARD
            .iter()
            .find(|l| l.name.eq_ignore_ascii_case(text))
        {
            return Some(*level);
        }
        REGISTERED
            .read()
            .iter()
            .find(|l| l.name.eq_ignore_ascii_case(text))
            .copied()
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::DEBUG
    }
}

impl PartialEq for Level {
    fn eq(&self, other: &Self) -> bool {
        self.rank == other.rank
    }
}

impl Eq for Level {}

impl PartialOrd for Level {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Level {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank.cmp(&other.rank)
    }
}

impl Hash for Level {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank.hash(state);
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name)
    }
}

impl FromStr for Level {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::lookup(s.trim()).ok_or_else(|| LoggerError::UnknownLevel(s.to_string()))
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name)
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LETHAL: Level = Level::new(Level::FATAL_INT + 1, "LETHAL", 0);
    const NOTICE: Level = Level::new(Level::INFO_INT + 5_000, "NOTICE", 5);

    #[test]
    fn test_standard_ordering() {
        let levels = Level::standard();
        for pair in levels.windows(2) {
            assert!(pair[0] < pair[1], "{} should be below {}", pair[0], pair[1]);
        }
        assert!(Level::ERROR.is_at_least(&Level::WARN));
        assert!(Level::WARN.is_at_least(&Level::WARN));
        assert!(!Level::INFO.is_at_least(&Level::WARN));
    }

    #[test]
    fn test_parse_with_default() {
        assert_eq!(Level::parse("INFO", Level::DEBUG), Level::INFO);
        assert_eq!(Level::parse("error", Level::DEBUG), Level::ERROR);
        assert_eq!(Level::parse(" Fatal ", Level::DEBUG), Level::FATAL);
        assert_eq!(Level::parse("WARNING", Level::DEBUG), Level::WARN);
        assert_eq!(Level::parse("off", Level::DEBUG), Level::OFF);
        assert_eq!(Level::parse("", Level::INFO), Level::INFO);
        assert_eq!(Level::parse("verbose", Level::ERROR), Level::ERROR);
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        assert_eq!("trace".parse::<Level>().unwrap(), Level::TRACE);
        let err = "nonsense".parse::<Level>().unwrap_err();
        assert!(matches!(err, LoggerError::UnknownLevel(ref s) if s == "nonsense"));
    }

    #[test]
    fn test_custom_extremal_level() {
        assert!(LETHAL > Level::FATAL);
        assert!(LETHAL < Level::OFF);
        assert!(LETHAL.is_at_least(&Level::FATAL));

        Level::register(LETHAL);
        assert_eq!(Level::parse("lethal", Level::DEBUG).name(), "LETHAL");
        assert_eq!(Level::from_rank(Level::FATAL_INT + 1, Level::DEBUG), LETHAL);
    }

    #[test]
    fn test_custom_intermediate_level() {
        assert!(NOTICE > Level::INFO);
        assert!(NOTICE < Level::WARN);
        assert_eq!(NOTICE.syslog_equivalent(), 5);
        // unregistered names do not parse
        assert_eq!(Level::parse("NOTICE-UNREGISTERED", Level::INFO), Level::INFO);
    }

    #[test]
    fn test_equal_rank_is_equally_severe() {
        let alias = Level::new(Level::ERROR_INT, "SEVERE", 3);
        assert_eq!(alias, Level::ERROR);
        assert!(alias.is_at_least(&Level::ERROR));
        assert!(Level::ERROR.is_at_least(&alias));
        assert_eq!(alias.name(), "SEVERE");
    }

    #[test]
    fn test_from_rank_default() {
        assert_eq!(Level::from_rank(Level::WARN_INT, Level::DEBUG), Level::WARN);
        assert_eq!(Level::from_rank(12_345, Level::DEBUG), Level::DEBUG);
    }

    #[test]
    fn test_display_and_serde() {
        assert_eq!(Level::WARN.to_string(), "WARN");
        assert_eq!(format!("{:5}|", Level::INFO), "INFO |");

        let json = serde_json::to_string(&Level::ERROR).unwrap();
        assert_eq!(json, "\"ERROR\"");
        let back: Level = serde_json::from_str("\"debug\"").unwrap();
        assert_eq!(back, Level::DEBUG);
        assert!(serde_json::from_str::<Level>("\"loud\"").is_err());
    }
}
