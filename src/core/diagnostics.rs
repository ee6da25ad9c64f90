//! Internal diagnostics of the logging system itself
//!
//! The hierarchy cannot report its own problems through loggers (that is how
//! recursion starts), so they go straight to stderr with a `[LOGGER ...]`
//! prefix. Debug output is opt-in; quiet mode silences everything except
//! critical reports, which exist to make a broken repository impossible to
//! miss.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);
static QUIET: AtomicBool = AtomicBool::new(false);

static WARNINGS: AtomicU64 = AtomicU64::new(0);
static ERRORS: AtomicU64 = AtomicU64::new(0);
static CRITICALS: AtomicU64 = AtomicU64::new(0);

pub fn set_internal_debugging(enabled: bool) {
    DEBUG_ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn set_quiet_mode(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}

pub fn is_internal_debugging() -> bool {
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

pub fn is_quiet_mode() -> bool {
    quiet()
}

#[inline]
fn quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

pub fn debug(message: impl AsRef<str>) {
    if DEBUG_ENABLED.load(Ordering::Relaxed) && !quiet() {
        eprintln!("[LOGGER DEBUG] {}", message.as_ref());
    }
}

pub fn warn(message: impl AsRef<str>) {
    WARNINGS.fetch_add(1, Ordering::Relaxed);
    if !quiet() {
        eprintln!("[LOGGER WARNING] {}", message.as_ref());
    }
}

pub fn error(message: impl AsRef<str>) {
    ERRORS.fetch_add(1, Ordering::Relaxed);
    if !quiet() {
        eprintln!("[LOGGER ERROR] {}", message.as_ref());
    }
}

/// Report a defect that means the logging system was set up wrong.
/// Never silenced by quiet mode.
pub fn critical(message: impl AsRef<str>) {
    CRITICALS.fetch_add(1, Ordering::Relaxed);
    eprintln!("[LOGGER CRITICAL] {}", message.as_ref());
}

/// Number of warnings reported since process start
pub fn warning_count() -> u64 {
    WARNINGS.load(Ordering::Relaxed)
}

/// Number of errors reported since process start
pub fn error_count() -> u64 {
    ERRORS.load(Ordering::Relaxed)
}

/// Number of critical reports since process start
pub fn critical_count() -> u64 {
    CRITICALS.load(Ordering::Relaxed)
}

/// Render a caught panic payload for a report
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_advance() {
        let errors = error_count();
        let criticals = critical_count();
        error("test error");
        critical("test critical");
        assert!(error_count() > errors);
        assert!(critical_count() > criticals);
    }

    #[test]
    fn test_panic_message() {
        let payload = std::panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload = std::panic::catch_unwind(|| panic!("code {}", 7)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "code 7");
    }
}
