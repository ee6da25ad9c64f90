//! Decisions about when a rolling file appender should roll over

use crate::core::{Appender, LoggingEvent};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::path::Path;
use std::time::Duration;

/// Decides, per event, whether the active file should be rolled over before
/// the event is written
pub trait TriggeringPolicy: Send + Sync {
    fn is_triggering_event(
        &self,
        appender: &dyn Appender,
        event: &LoggingEvent,
        file: &Path,
        file_length: u64,
    ) -> bool;
}

/// Roll over once the active file reaches a size
#[derive(Debug, Clone)]
pub struct SizeBasedTriggeringPolicy {
    max_file_size: u64,
}

impl SizeBasedTriggeringPolicy {
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

    #[must_use]
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    #[must_use]
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }
}

impl Default for SizeBasedTriggeringPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_FILE_SIZE)
    }
}

impl TriggeringPolicy for SizeBasedTriggeringPolicy {
    fn is_triggering_event(
        &self,
        _appender: &dyn Appender,
        _event: &LoggingEvent,
        _file: &Path,
        file_length: u64,
    ) -> bool {
        file_length >= self.max_file_size
    }
}

/// Roll over when an event arrives at least `interval` after the previous
/// rollover (or after the policy was created)
#[derive(Debug)]
pub struct TimeBasedTriggeringPolicy {
    interval: chrono::Duration,
    next_rollover: Mutex<DateTime<Utc>>,
}

impl TimeBasedTriggeringPolicy {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self::starting_at(interval, Utc::now())
    }

    /// Policy whose first period begins at `start`
    #[must_use]
    pub fn starting_at(interval: Duration, start: DateTime<Utc>) -> Self {
        let interval = chrono::Duration::from_std(interval).unwrap_or(chrono::Duration::MAX);
        Self {
            interval,
            next_rollover: Mutex::new(
                start
                    .checked_add_signed(interval)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC),
            ),
        }
    }

    #[must_use]
    pub fn next_rollover(&self) -> DateTime<Utc> {
        *self.next_rollover.lock()
    }
}

impl TriggeringPolicy for TimeBasedTriggeringPolicy {
    fn is_triggering_event(
        &self,
        _appender: &dyn Appender,
        event: &LoggingEvent,
        _file: &Path,
        _file_length: u64,
    ) -> bool {
        let mut next = self.next_rollover.lock();
        if *event.timestamp() < *next {
            return false;
        }
        *next = event
            .timestamp()
            .checked_add_signed(self.interval)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        true
    }
}

/// Roll over when any of the contained policies says so
#[derive(Default)]
pub struct CompositeTriggeringPolicy {
    policies: Vec<Box<dyn TriggeringPolicy>>,
}

impl CompositeTriggeringPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_policy(mut self, policy: impl TriggeringPolicy + 'static) -> Self {
        self.policies.push(Box::new(policy));
        self
    }
}

impl TriggeringPolicy for CompositeTriggeringPolicy {
    fn is_triggering_event(
        &self,
        appender: &dyn Appender,
        event: &LoggingEvent,
        file: &Path,
        file_length: u64,
    ) -> bool {
        // every policy sees the event so time-based ones can advance
        self.policies
            .iter()
            .fold(false, |triggered, policy| {
                policy.is_triggering_event(appender, event, file, file_length) || triggered
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Level, LocationInfo, Result};
    use chrono::TimeZone;
    use std::sync::Arc;

    struct Dummy;

    impl Appender for Dummy {
        fn append(&self, _event: &LoggingEvent) -> Result<()> {
            Ok(())
        }
        fn close(&self) -> Result<()> {
            Ok(())
        }
        fn name(&self) -> &str {
            "dummy"
        }
    }

    fn event_at(timestamp: DateTime<Utc>) -> LoggingEvent {
        LoggingEvent::new(
            Arc::from("roll"),
            Level::INFO,
            "x".to_string(),
            LocationInfo::unavailable(),
        )
        .with_timestamp(timestamp)
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 8, 0, 0, 0).single().unwrap()
    }

    #[test]
    fn test_size_policy() {
        let policy = SizeBasedTriggeringPolicy::new(100);
        let event = event_at(start());
        let path = Path::new("app.log");
        assert!(!policy.is_triggering_event(&Dummy, &event, path, 99));
        assert!(policy.is_triggering_event(&Dummy, &event, path, 100));
        assert_eq!(
            SizeBasedTriggeringPolicy::default().max_file_size(),
            SizeBasedTriggeringPolicy::DEFAULT_MAX_FILE_SIZE
        );
    }

    #[test]
    fn test_time_policy_advances() {
        let policy = TimeBasedTriggeringPolicy::starting_at(Duration::from_secs(3600), start());
        let path = Path::new("app.log");

        let early = event_at(start() + chrono::Duration::minutes(30));
        assert!(!policy.is_triggering_event(&Dummy, &early, path, 0));

        let late = event_at(start() + chrono::Duration::minutes(61));
        assert!(policy.is_triggering_event(&Dummy, &late, path, 0));
        // the next period starts at the triggering event
        assert!(!policy.is_triggering_event(&Dummy, &late, path, 0));
        assert_eq!(
            policy.next_rollover(),
            start() + chrono::Duration::minutes(121)
        );
    }

    #[test]
    fn test_composite_policy() {
        let policy = CompositeTriggeringPolicy::new()
            .with_policy(SizeBasedTriggeringPolicy::new(10))
            .with_policy(TimeBasedTriggeringPolicy::starting_at(
                Duration::from_secs(60),
                start(),
            ));
        let path = Path::new("app.log");

        assert!(!policy.is_triggering_event(&Dummy, &event_at(start()), path, 5));
        assert!(policy.is_triggering_event(&Dummy, &event_at(start()), path, 50));
        assert!(policy.is_triggering_event(
            &Dummy,
            &event_at(start() + chrono::Duration::minutes(2)),
            path,
            0
        ));
        assert!(!CompositeTriggeringPolicy::new().is_triggering_event(
            &Dummy,
            &event_at(start()),
            path,
            u64::MAX
        ));
    }
}
