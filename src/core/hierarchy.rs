//! Repository that owns the logger tree
//!
//! Nodes live in an append-only arena and refer to their parent by
//! [`LoggerId`]. Looking up a dotted name creates the node and every missing
//! ancestor prefix, so parent links are fixed at creation and never rewired.
//!
//! Only the name index sits behind a lock. Resolving a [`LoggerId`] reads the
//! arena directly, so level checks and dispatch walks never wait on a logger
//! being created elsewhere in the tree.

use super::{
    appender::AppenderRef,
    diagnostics,
    level::Level,
    logger::{Logger, LoggerNode},
    repository::{LoggerId, LoggerRepository},
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

pub const ROOT_LOGGER_NAME: &str = "root";

const ROOT_ID: LoggerId = LoggerId(0);

/// Slots in the first arena segment; each later segment doubles
const FIRST_SEGMENT: usize = 32;

/// Segment count; bounds the arena at `FIRST_SEGMENT * (2^SEGMENTS - 1)` nodes
const SEGMENTS: usize = 26;

/// Observer of hierarchy changes
pub trait HierarchyEventListener: Send + Sync {
    fn add_appender_event(&self, logger: &Logger, appender: &AppenderRef);
}

/// Append-only node storage readable without a lock.
///
/// Segment `k` holds `FIRST_SEGMENT << k` slots. Segments are allocated on
/// first use and never move, and a slot is written once, so a published node
/// stays reachable through its id for the life of the arena. Writers are
/// serialized by the name index lock.
struct NodeArena {
    segments: [OnceLock<Box<[OnceLock<Arc<LoggerNode>>]>>; SEGMENTS],
}

impl NodeArena {
    fn new() -> Self {
        Self {
            segments: std::array::from_fn(|_| OnceLock::new()),
        }
    }

    /// Segment and offset of slot `index`
    #[inline]
    fn locate(index: usize) -> (usize, usize) {
        let bucket = index / FIRST_SEGMENT + 1;
        let segment = (usize::BITS - 1 - bucket.leading_zeros()) as usize;
        let offset = index - FIRST_SEGMENT * ((1 << segment) - 1);
        (segment, offset)
    }

    #[inline]
    fn get(&self, id: LoggerId) -> Option<Arc<LoggerNode>> {
        let (segment, offset) = Self::locate(id.0);
        self.segments.get(segment)?.get()?.get(offset)?.get().cloned()
    }

    /// Publish `node` under `id`. Fails when the arena is full or the slot
    /// was already taken.
    fn publish(&self, id: LoggerId, node: Arc<LoggerNode>) -> bool {
        let (segment, offset) = Self::locate(id.0);
        let Some(cell) = self.segments.get(segment) else {
            return false;
        };
        let slots = cell.get_or_init(|| {
            (0..FIRST_SEGMENT << segment)
                .map(|_| OnceLock::new())
                .collect()
        });
        slots
            .get(offset)
            .is_some_and(|slot| slot.set(node).is_ok())
    }
}

/// Name index; the lock around it serializes node creation
#[derive(Default)]
struct NameIndex {
    by_name: HashMap<Arc<str>, LoggerId>,
    len: usize,
}

struct HierarchyInner {
    root: Arc<LoggerNode>,
    arena: NodeArena,
    table: RwLock<NameIndex>,
    threshold: AtomicI32,
    no_appender_warnings: AtomicU64,
    emitted_no_appender_warning: AtomicBool,
    listeners: RwLock<Vec<Arc<dyn HierarchyEventListener>>>,
}

impl LoggerRepository for HierarchyInner {
    #[inline]
    fn node(&self, id: LoggerId) -> Option<Arc<LoggerNode>> {
        self.arena.get(id)
    }

    #[inline]
    fn is_disabled(&self, rank: i32) -> bool {
        self.threshold.load(Ordering::Relaxed) > rank
    }

    fn on_appender_attached(&self, logger: &Logger, appender: &AppenderRef) {
        diagnostics::debug(format!(
            "Appender '{}' attached to logger '{}'",
            appender.name(),
            logger.name()
        ));
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener.add_appender_event(logger, appender);
        }
    }

    fn on_no_appender_reached(&self, logger: &Logger) {
        self.no_appender_warnings.fetch_add(1, Ordering::Relaxed);

        if !self.emitted_no_appender_warning.swap(true, Ordering::Relaxed) {
            diagnostics::warn(format!(
                "No appenders could be found for logger ({}).",
                logger.name()
            ));
            diagnostics::warn("Please initialize the logging system properly.");
        }
    }
}

/// The logger tree of one application (or one isolated subsystem)
///
/// Cloning shares the same tree.
///
/// # Example
///
/// ```
/// use rust_logger_hierarchy::prelude::*;
///
/// let hierarchy = Hierarchy::with_root_level(Level::WARN);
/// let pool = hierarchy.logger("db.pool");
///
/// assert_eq!(pool.level(), None);
/// assert_eq!(pool.effective_level().unwrap(), Level::WARN);
/// assert_eq!(pool.parent().unwrap().name(), "db");
/// ```
#[derive(Clone)]
pub struct Hierarchy {
    inner: Arc<HierarchyInner>,
}

impl Hierarchy {
    /// A hierarchy whose root logs at DEBUG
    #[must_use]
    pub fn new() -> Self {
        Self::with_root_level(Level::DEBUG)
    }

    #[must_use]
    pub fn with_root_level(level: Level) -> Self {
        let root = Arc::new(LoggerNode::new(ROOT_LOGGER_NAME, None, Some(level)));
        let arena = NodeArena::new();
        arena.publish(ROOT_ID, Arc::clone(&root));
        let mut table = NameIndex::default();
        table.by_name.insert(Arc::from(ROOT_LOGGER_NAME), ROOT_ID);
        table.len = 1;

        Self {
            inner: Arc::new(HierarchyInner {
                root,
                arena,
                table: RwLock::new(table),
                threshold: AtomicI32::new(Level::ALL_INT),
                no_appender_warnings: AtomicU64::new(0),
                emitted_no_appender_warning: AtomicBool::new(false),
                listeners: RwLock::new(Vec::new()),
            }),
        }
    }

    fn handle(&self, node: Arc<LoggerNode>) -> Logger {
        let repository: Arc<dyn LoggerRepository> = self.inner.clone();
        Logger::new(node, repository)
    }

    pub fn root_logger(&self) -> Logger {
        self.handle(Arc::clone(&self.inner.root))
    }

    /// Logger for `name`, created on first use together with any missing
    /// ancestors. `""` and `"root"` name the root.
    pub fn logger(&self, name: &str) -> Logger {
        if name.is_empty() || name == ROOT_LOGGER_NAME {
            return self.root_logger();
        }

        if let Some(logger) = self.exists(name) {
            return logger;
        }

        let mut table = self.inner.table.write();
        let mut parent = ROOT_ID;
        let mut node = Arc::clone(&self.inner.root);
        let boundaries = name
            .match_indices('.')
            .map(|(i, _)| i)
            .chain(std::iter::once(name.len()));

        for end in boundaries {
            let prefix = &name[..end];
            let is_full_name = end == name.len();
            if !is_full_name && (prefix.is_empty() || prefix.ends_with('.')) {
                continue;
            }

            if let Some(&id) = table.by_name.get(prefix) {
                if let Some(existing) = self.inner.arena.get(id) {
                    parent = id;
                    node = existing;
                    continue;
                }
            }

            let id = LoggerId(table.len);
            let node_name: Arc<str> = Arc::from(prefix);
            let created = Arc::new(LoggerNode::new(Arc::clone(&node_name), Some(parent), None));
            if !self.inner.arena.publish(id, Arc::clone(&created)) {
                diagnostics::critical(format!(
                    "Logger arena is full; '{}' falls back to logger '{}'.",
                    prefix,
                    node.name()
                ));
                break;
            }
            table.len += 1;
            table.by_name.insert(node_name, id);
            diagnostics::debug(format!("Created logger '{}' ({})", prefix, id));
            parent = id;
            node = created;
        }
        drop(table);

        self.handle(node)
    }

    /// Logger for `name` if it was already created
    pub fn exists(&self, name: &str) -> Option<Logger> {
        let id = *self.inner.table.read().by_name.get(name)?;
        let node = self.inner.arena.get(id)?;
        Some(self.handle(node))
    }

    /// Every logger except the root, in creation order
    pub fn current_loggers(&self) -> Vec<Logger> {
        let len = self.inner.table.read().len;
        (1..len)
            .filter_map(|i| self.inner.arena.get(LoggerId(i)))
            .map(|node| self.handle(node))
            .collect()
    }

    /// Mute every event below `level`, regardless of logger levels
    pub fn set_threshold(&self, level: Level) {
        self.inner.threshold.store(level.rank(), Ordering::Relaxed);
    }

    pub fn threshold(&self) -> Level {
        Level::from_rank(self.inner.threshold.load(Ordering::Relaxed), Level::ALL)
    }

    pub fn is_disabled(&self, rank: i32) -> bool {
        self.inner.is_disabled(rank)
    }

    pub fn add_listener(&self, listener: Arc<dyn HierarchyEventListener>) {
        self.inner.listeners.write().push(listener);
    }

    /// How many dispatches reached no appender
    pub fn no_appender_warnings(&self) -> u64 {
        self.inner.no_appender_warnings.load(Ordering::Relaxed)
    }

    /// Close and detach every appender, children before the root
    pub fn shutdown(&self) {
        let root = self.root_logger();
        let loggers = self.current_loggers();

        for logger in loggers.iter().chain(std::iter::once(&root)) {
            logger.close_nested_appenders();
        }
        for logger in loggers.iter().chain(std::iter::once(&root)) {
            logger.remove_all_appenders();
        }
    }

    /// Back to a freshly constructed state: root at DEBUG, no threshold,
    /// every other logger inheriting and additive, no bundles, no appenders.
    pub fn reset_configuration(&self) {
        let root = self.root_logger();
        root.set_level(Some(Level::DEBUG));
        root.set_resource_bundle(None);
        self.set_threshold(Level::ALL);

        self.shutdown();

        for logger in self.current_loggers() {
            logger.set_level(None);
            logger.set_additivity(true);
            logger.set_resource_bundle(None);
        }
        root.set_additivity(true);
        self.inner
            .emitted_no_appender_warning
            .store(false, Ordering::Relaxed);
    }
}

impl Default for Hierarchy {
    fn default() -> Self {
        Self::new()
    }
}
