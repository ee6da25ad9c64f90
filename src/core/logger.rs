//! Logger nodes and event dispatch
//!
//! A [`LoggerNode`] is the per-name state stored in the repository's arena.
//! A [`Logger`] is the cheap, clonable handle application code holds: the
//! node plus the repository it lives in.
//!
//! Dispatch walks from the originating node toward the root and takes one
//! node's guard at a time: lock, invoke that node's appenders, unlock, move to
//! the parent. No two node guards are ever held together, so dispatches through
//! unrelated subtrees never contend and no lock ordering can invert.

use super::{
    appender::AppenderRef,
    attachable::AppenderAttachable,
    diagnostics,
    error::{LoggerError, Result},
    event::{LocationInfo, LoggingEvent},
    level::Level,
    repository::{LoggerId, LoggerRepository},
    resource_bundle::{format_message, ResourceBundle},
};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

/// Configuration that only changes under the node guard
#[derive(Default)]
struct NodeState {
    appenders: Option<AppenderAttachable>,
    resource_bundle: Option<Arc<dyn ResourceBundle>>,
}

/// Rank held by a node that inherits its level
const UNSET_RANK: i64 = i64::MAX;

/// One node of the logger tree
///
/// `level` and `additive` are written under the guard but readable without
/// it. The level is kept twice: the [`Level`] value for callers, and its rank
/// in an atomic so the enablement check takes no lock at all.
pub struct LoggerNode {
    name: Arc<str>,
    parent: Option<LoggerId>,
    level: RwLock<Option<Level>>,
    rank: AtomicI64,
    additive: AtomicBool,
    guard: Mutex<NodeState>,
}

impl LoggerNode {
    /// A node with no appenders, additivity on and no bundle.
    /// A node without a parent is a root and should carry a level.
    pub fn new(name: impl Into<Arc<str>>, parent: Option<LoggerId>, level: Option<Level>) -> Self {
        Self {
            name: name.into(),
            parent,
            level: RwLock::new(level),
            rank: AtomicI64::new(level.map_or(UNSET_RANK, |l| i64::from(l.rank()))),
            additive: AtomicBool::new(true),
            guard: Mutex::new(NodeState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<LoggerId> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    #[inline]
    pub fn level(&self) -> Option<Level> {
        *self.level.read()
    }

    /// Rank of the explicit level, read without locking
    #[inline]
    pub fn explicit_rank(&self) -> Option<i32> {
        i32::try_from(self.rank.load(Ordering::Acquire)).ok()
    }

    pub fn additivity(&self) -> bool {
        self.additive.load(Ordering::Acquire)
    }

    fn store_level(&self, level: Option<Level>) {
        *self.level.write() = level;
        self.rank.store(
            level.map_or(UNSET_RANK, |l| i64::from(l.rank())),
            Ordering::Release,
        );
    }
}

impl fmt::Debug for LoggerNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerNode")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("level", &self.level())
            .field("additive", &self.additivity())
            .finish_non_exhaustive()
    }
}

/// Handle to a named logger
///
/// Cloning is cheap; all clones address the same node.
#[derive(Clone)]
pub struct Logger {
    node: Arc<LoggerNode>,
    repository: Arc<dyn LoggerRepository>,
}

impl Logger {
    pub fn new(node: Arc<LoggerNode>, repository: Arc<dyn LoggerRepository>) -> Self {
        Self { node, repository }
    }

    pub fn name(&self) -> &str {
        self.node.name()
    }

    pub fn node(&self) -> &Arc<LoggerNode> {
        &self.node
    }

    pub fn repository(&self) -> &Arc<dyn LoggerRepository> {
        &self.repository
    }

    /// Parent logger, `None` for the root
    pub fn parent(&self) -> Option<Logger> {
        self.node
            .parent
            .and_then(|id| self.repository.node(id))
            .map(|node| Logger::new(node, Arc::clone(&self.repository)))
    }

    /// The explicit level of this node, `None` when it inherits
    pub fn level(&self) -> Option<Level> {
        self.node.level()
    }

    /// Set the explicit level, or `None` to inherit from the parent.
    ///
    /// The root must keep a level; clearing it is reported and ignored.
    pub fn set_level(&self, level: Option<Level>) {
        if level.is_none() && self.node.is_root() {
            diagnostics::error(format!(
                "Refusing to clear the level of root logger '{}'; the root must keep a level.",
                self.name()
            ));
            return;
        }

        let _state = self.node.guard.lock();
        self.node.store_level(level);
    }

    pub fn additivity(&self) -> bool {
        self.node.additivity()
    }

    pub fn set_additivity(&self, additive: bool) {
        let _state = self.node.guard.lock();
        self.node.additive.store(additive, Ordering::Release);
    }

    /// Walk from this node toward the root and return the first explicit level
    ///
    /// # Errors
    ///
    /// [`LoggerError::NoLevelInHierarchy`] when no node up to the root has a
    /// level, which only happens when the repository built a root without one.
    pub fn effective_level(&self) -> Result<Level> {
        if let Some(level) = self.node.level() {
            return Ok(level);
        }

        let mut next = self.node.parent;
        while let Some(id) = next {
            let Some(node) = self.repository.node(id) else {
                break;
            };
            if let Some(level) = node.level() {
                return Ok(level);
            }
            next = node.parent;
        }

        Err(LoggerError::no_level(self.name()))
    }

    /// Rank of the nearest explicit level, following parent links without
    /// taking any lock
    #[inline]
    fn effective_rank(&self) -> Option<i32> {
        if let Some(rank) = self.node.explicit_rank() {
            return Some(rank);
        }

        let mut next = self.node.parent;
        while let Some(id) = next {
            let node = self.repository.node(id)?;
            if let Some(rank) = node.explicit_rank() {
                return Some(rank);
            }
            next = node.parent;
        }
        None
    }

    /// Check whether a request at `level` would be logged
    ///
    /// Two independent gates: the repository's global threshold and this
    /// logger's effective level. A repository without a root level is
    /// reported as critical and treated as disabled.
    #[inline]
    pub fn is_enabled_for(&self, level: Level) -> bool {
        if self.repository.is_disabled(level.rank()) {
            return false;
        }

        match self.effective_rank() {
            Some(threshold) => level.rank() >= threshold,
            None => {
                diagnostics::critical(format!(
                    "{}. The logger repository was not initialized correctly.",
                    LoggerError::no_level(self.name())
                ));
                false
            }
        }
    }

    pub fn is_trace_enabled(&self) -> bool {
        self.is_enabled_for(Level::TRACE)
    }

    pub fn is_debug_enabled(&self) -> bool {
        self.is_enabled_for(Level::DEBUG)
    }

    pub fn is_info_enabled(&self) -> bool {
        self.is_enabled_for(Level::INFO)
    }

    pub fn is_warn_enabled(&self) -> bool {
        self.is_enabled_for(Level::WARN)
    }

    pub fn is_error_enabled(&self) -> bool {
        self.is_enabled_for(Level::ERROR)
    }

    pub fn is_fatal_enabled(&self) -> bool {
        self.is_enabled_for(Level::FATAL)
    }

    pub fn log(&self, level: Level, message: impl Into<String>) {
        self.log_at(level, message, LocationInfo::unavailable());
    }

    pub fn log_at(&self, level: Level, message: impl Into<String>, location: LocationInfo) {
        if self.is_enabled_for(level) {
            self.forced_log(level, message, location);
        }
    }

    /// Build and dispatch an event without checking the level gate
    pub fn forced_log(&self, level: Level, message: impl Into<String>, location: LocationInfo) {
        let event = LoggingEvent::new(
            Arc::clone(&self.node.name),
            level,
            message.into(),
            location,
        );
        self.call_appenders(&event);
    }

    #[inline]
    pub fn trace(&self, message: impl Into<String>) {
        self.log(Level::TRACE, message);
    }

    #[inline]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(Level::DEBUG, message);
    }

    #[inline]
    pub fn info(&self, message: impl Into<String>) {
        self.log(Level::INFO, message);
    }

    #[inline]
    pub fn warn(&self, message: impl Into<String>) {
        self.log(Level::WARN, message);
    }

    #[inline]
    pub fn error(&self, message: impl Into<String>) {
        self.log(Level::ERROR, message);
    }

    #[inline]
    pub fn fatal(&self, message: impl Into<String>) {
        self.log(Level::FATAL, message);
    }

    /// Hand `event` to the appenders of this logger and its ancestors.
    ///
    /// Appenders fire from this node up to the root, in attachment order
    /// within a node, and the walk stops after the first non-additive node.
    /// Returns the number of appenders invoked; when that is zero the
    /// repository is told once.
    pub fn call_appenders(&self, event: &LoggingEvent) -> usize {
        let mut writes = 0;
        let mut current = Some(Arc::clone(&self.node));

        while let Some(node) = current {
            let next = {
                let state = node.guard.lock();
                if let Some(ref appenders) = state.appenders {
                    writes += appenders.append_loop_on_appenders(event);
                }

                if node.additive.load(Ordering::Acquire) {
                    node.parent
                } else {
                    None
                }
            };

            current = next.and_then(|id| self.repository.node(id));
        }

        if writes == 0 {
            self.repository.on_no_appender_reached(self);
        }

        writes
    }

    /// Attach an appender; a different appender with the same name is
    /// replaced in place (see [`AppenderAttachable::add`])
    pub fn add_appender(&self, appender: AppenderRef) {
        {
            let mut state = self.node.guard.lock();
            state
                .appenders
                .get_or_insert_with(AppenderAttachable::new)
                .add(Arc::clone(&appender));
        }

        self.repository.on_appender_attached(self, &appender);
    }

    pub fn remove_appender(&self, appender: &AppenderRef) -> bool {
        let mut state = self.node.guard.lock();
        state
            .appenders
            .as_mut()
            .is_some_and(|appenders| appenders.remove(appender))
    }

    pub fn remove_appender_by_name(&self, name: &str) -> Option<AppenderRef> {
        if name.is_empty() {
            return None;
        }
        let mut state = self.node.guard.lock();
        state.appenders.as_mut()?.remove_by_name(name)
    }

    /// Detach every appender and return them, still open
    pub fn remove_all_appenders(&self) -> Vec<AppenderRef> {
        let mut state = self.node.guard.lock();
        state
            .appenders
            .take()
            .map(|mut appenders| appenders.remove_all())
            .unwrap_or_default()
    }

    pub fn appender(&self, name: &str) -> Option<AppenderRef> {
        if name.is_empty() {
            return None;
        }
        let state = self.node.guard.lock();
        state.appenders.as_ref()?.get(name)
    }

    pub fn all_appenders(&self) -> Vec<AppenderRef> {
        let state = self.node.guard.lock();
        state
            .appenders
            .as_ref()
            .map(AppenderAttachable::snapshot)
            .unwrap_or_default()
    }

    pub fn is_attached(&self, appender: &AppenderRef) -> bool {
        let state = self.node.guard.lock();
        state
            .appenders
            .as_ref()
            .is_some_and(|appenders| appenders.contains(appender))
    }

    /// Close every appender attached directly to this logger. They stay
    /// attached.
    pub fn close_nested_appenders(&self) {
        for appender in self.all_appenders() {
            if let Err(e) = appender.close() {
                diagnostics::error(format!(
                    "Failed to close appender '{}' of logger '{}': {}",
                    appender.name(),
                    self.name(),
                    e
                ));
            }
        }
    }

    pub fn set_resource_bundle(&self, bundle: Option<Arc<dyn ResourceBundle>>) {
        let mut state = self.node.guard.lock();
        state.resource_bundle = bundle;
    }

    /// Nearest bundle on the way to the root
    pub fn resource_bundle(&self) -> Option<Arc<dyn ResourceBundle>> {
        let mut current = Some(Arc::clone(&self.node));
        while let Some(node) = current {
            let next = {
                let state = node.guard.lock();
                if let Some(ref bundle) = state.resource_bundle {
                    return Some(Arc::clone(bundle));
                }
                node.parent
            };
            current = next.and_then(|id| self.repository.node(id));
        }
        None
    }

    /// Template for `key` from the nearest bundle.
    ///
    /// A key the bundle does not know is reported through this logger at
    /// ERROR on the plain logging path, which never consults a bundle, so a
    /// broken bundle cannot recurse.
    fn resource_bundle_string(&self, key: &str) -> Option<String> {
        let bundle = self.resource_bundle()?;
        match bundle.get_string(key) {
            Ok(template) => Some(template),
            Err(e) => {
                if !matches!(e, LoggerError::MissingResource { .. }) {
                    diagnostics::error(format!("Resource lookup for \"{}\" failed: {}", key, e));
                }
                self.error(format!("No resource is associated with key \"{}\".", key));
                None
            }
        }
    }

    /// Log a message looked up by `key` in the nearest resource bundle, with
    /// `params` substituted for `{0}`, `{1}`, ...
    ///
    /// Without a bundle, or when the key is missing, the key itself becomes
    /// the message. Nothing is ever returned to the caller.
    pub fn log_localized(&self, level: Level, key: &str, location: LocationInfo, params: &[&str]) {
        if !self.is_enabled_for(level) {
            return;
        }

        let message = match self.resource_bundle_string(key) {
            Some(pattern) if !pattern.is_empty() => format_message(&pattern, params),
            _ => key.to_string(),
        };

        self.forced_log(level, message, location);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name())
            .field("level", &self.level())
            .field("additive", &self.additivity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::appender::Appender;
    use std::sync::atomic::AtomicUsize;

    /// Arena-backed repository with no threshold and counting hooks, so the
    /// logger can be exercised without the full hierarchy
    #[derive(Default)]
    struct TestRepository {
        nodes: RwLock<Vec<Arc<LoggerNode>>>,
        disabled_below: std::sync::atomic::AtomicI32,
        attached: AtomicUsize,
        unreached: AtomicUsize,
    }

    impl TestRepository {
        fn build(levels: &[Option<Level>]) -> (Arc<TestRepository>, Vec<Logger>) {
            let repo = Arc::new(TestRepository {
                disabled_below: std::sync::atomic::AtomicI32::new(i32::MIN),
                ..Default::default()
            });
            let mut loggers = Vec::new();
            for (i, level) in levels.iter().enumerate() {
                let parent = if i == 0 { None } else { Some(LoggerId(i - 1)) };
                let node = Arc::new(LoggerNode::new(format!("n{}", i), parent, *level));
                repo.nodes.write().push(Arc::clone(&node));
                let shared: Arc<dyn LoggerRepository> = repo.clone();
                loggers.push(Logger::new(node, shared));
            }
            (repo, loggers)
        }
    }

    impl LoggerRepository for TestRepository {
        fn node(&self, id: LoggerId) -> Option<Arc<LoggerNode>> {
            self.nodes.read().get(id.0).cloned()
        }
        fn is_disabled(&self, rank: i32) -> bool {
            self.disabled_below.load(Ordering::Relaxed) > rank
        }
        fn on_appender_attached(&self, _logger: &Logger, _appender: &AppenderRef) {
            self.attached.fetch_add(1, Ordering::Relaxed);
        }
        fn on_no_appender_reached(&self, _logger: &Logger) {
            self.unreached.fetch_add(1, Ordering::Relaxed);
        }
    }

    struct Recording {
        name: String,
        messages: Mutex<Vec<String>>,
    }

    impl Recording {
        fn new(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                messages: Mutex::new(Vec::new()),
            })
        }
    }

    impl Appender for Recording {
        fn append(&self, event: &LoggingEvent) -> Result<()> {
            self.messages.lock().push(event.message().to_string());
            Ok(())
        }
        fn close(&self) -> Result<()> {
            Ok(())
        }
        fn name(&self) -> &str {
            &self.name
        }
    }

    #[test]
    fn test_effective_level_inherits() {
        let (_repo, loggers) = TestRepository::build(&[Some(Level::WARN), None, None]);
        assert_eq!(loggers[2].effective_level().unwrap(), Level::WARN);

        loggers[1].set_level(Some(Level::TRACE));
        assert_eq!(loggers[2].effective_level().unwrap(), Level::TRACE);

        loggers[1].set_level(None);
        assert_eq!(loggers[2].effective_level().unwrap(), Level::WARN);
    }

    #[test]
    fn test_rank_follows_level_changes() {
        let (_repo, loggers) = TestRepository::build(&[Some(Level::INFO), None]);
        let child = &loggers[1];
        assert_eq!(child.node().explicit_rank(), None);
        assert!(child.is_info_enabled());
        assert!(!child.is_debug_enabled());

        child.set_level(Some(Level::ALL));
        assert_eq!(child.node().explicit_rank(), Some(Level::ALL_INT));
        assert!(child.is_trace_enabled());

        child.set_level(Some(Level::OFF));
        assert_eq!(child.node().explicit_rank(), Some(Level::OFF_INT));
        assert!(!child.is_fatal_enabled());

        child.set_level(None);
        assert_eq!(child.node().explicit_rank(), None);
        assert_eq!(child.level(), None);
        assert!(child.is_info_enabled());
    }

    #[test]
    fn test_missing_root_level_is_a_configuration_defect() {
        let (_repo, loggers) = TestRepository::build(&[None, None]);
        let err = loggers[1].effective_level().unwrap_err();
        assert!(err.is_configuration_defect());

        let before = diagnostics::critical_count();
        assert!(!loggers[1].is_enabled_for(Level::FATAL));
        assert!(diagnostics::critical_count() > before);
    }

    #[test]
    fn test_root_level_cannot_be_cleared() {
        let (_repo, loggers) = TestRepository::build(&[Some(Level::INFO), None]);
        loggers[0].set_level(None);
        assert_eq!(loggers[0].level(), Some(Level::INFO));
        assert_eq!(loggers[1].effective_level().unwrap(), Level::INFO);
    }

    #[test]
    fn test_global_gate_is_independent() {
        let (repo, loggers) = TestRepository::build(&[Some(Level::TRACE)]);
        assert!(loggers[0].is_debug_enabled());

        repo.disabled_below.store(Level::WARN_INT, Ordering::Relaxed);
        assert!(!loggers[0].is_debug_enabled());
        assert!(loggers[0].is_warn_enabled());
    }

    #[test]
    fn test_dispatch_counts_and_notifies_once() {
        let (repo, loggers) = TestRepository::build(&[Some(Level::DEBUG), None, None]);
        loggers[2].info("nobody listens");
        assert_eq!(repo.unreached.load(Ordering::Relaxed), 1);

        let sink = Recording::new("sink");
        loggers[1].add_appender(sink.clone());
        assert_eq!(repo.attached.load(Ordering::Relaxed), 1);

        loggers[2].info("heard");
        assert_eq!(repo.unreached.load(Ordering::Relaxed), 1);
        assert_eq!(*sink.messages.lock(), vec!["heard".to_string()]);
    }

    #[test]
    fn test_appender_management() {
        let (_repo, loggers) = TestRepository::build(&[Some(Level::DEBUG)]);
        let root = &loggers[0];
        let a: AppenderRef = Recording::new("a");
        let b: AppenderRef = Recording::new("b");

        assert!(root.all_appenders().is_empty());
        assert!(!root.is_attached(&a));
        assert!(!root.remove_appender(&a));

        root.add_appender(Arc::clone(&a));
        root.add_appender(Arc::clone(&b));
        assert!(root.is_attached(&a));
        assert!(root.appender("b").is_some());
        assert!(root.appender("").is_none());
        assert_eq!(root.all_appenders().len(), 2);

        assert!(root.remove_appender(&a));
        assert!(root.remove_appender_by_name("b").is_some());
        assert!(root.remove_appender_by_name("").is_none());
        assert!(root.all_appenders().is_empty());

        root.add_appender(a);
        assert_eq!(root.remove_all_appenders().len(), 1);
        assert!(root.remove_all_appenders().is_empty());
    }

    #[test]
    fn test_resource_bundle_is_inherited() {
        use crate::core::resource_bundle::MapResourceBundle;

        let (_repo, loggers) = TestRepository::build(&[Some(Level::DEBUG), None, None]);
        assert!(loggers[2].resource_bundle().is_none());

        let bundle: Arc<dyn ResourceBundle> =
            Arc::new(MapResourceBundle::new().with_entry("k", "v"));
        loggers[1].set_resource_bundle(Some(bundle));
        let found = loggers[2].resource_bundle().expect("inherited bundle");
        assert_eq!(found.get_string("k").unwrap(), "v");
        assert!(loggers[0].resource_bundle().is_none());
    }

    #[test]
    fn test_logger_debug_format() {
        let (_repo, loggers) = TestRepository::build(&[Some(Level::INFO)]);
        let rendered = format!("{:?}", loggers[0]);
        assert!(rendered.contains("n0"));
        assert!(rendered.contains("INFO"));
    }
}
