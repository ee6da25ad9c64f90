//! Counters for queued dispatch
//!
//! Used by [`AsyncAppender`](crate::appenders::AsyncAppender) to report how
//! many events went through its queue and how many were lost on overflow.

use std::sync::atomic::{AtomicU64, Ordering};

/// # Example
///
/// ```
/// use rust_logger_hierarchy::DispatchMetrics;
///
/// let metrics = DispatchMetrics::new();
/// metrics.record_enqueued();
/// metrics.record_dropped();
///
/// assert_eq!(metrics.enqueued(), 1);
/// assert_eq!(metrics.dropped(), 1);
/// assert_eq!(metrics.pending(), 1);
/// ```
#[derive(Debug)]
pub struct DispatchMetrics {
    /// Events accepted into the queue
    enqueued: AtomicU64,

    /// Events handed to the downstream appenders
    delivered: AtomicU64,

    /// Events discarded because the queue was full
    dropped: AtomicU64,

    queue_full_events: AtomicU64,

    /// Times a producer waited for queue space
    block_events: AtomicU64,

    /// ERROR-or-above events that found the queue full and waited instead of
    /// being dropped
    critical_preserved: AtomicU64,
}

impl DispatchMetrics {
    pub const fn new() -> Self {
        Self {
            enqueued: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            queue_full_events: AtomicU64::new(0),
            block_events: AtomicU64::new(0),
            critical_preserved: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn queue_full_events(&self) -> u64 {
        self.queue_full_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn block_events(&self) -> u64 {
        self.block_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn critical_preserved(&self) -> u64 {
        self.critical_preserved.load(Ordering::Relaxed)
    }

    /// Accepted but not yet delivered
    pub fn pending(&self) -> u64 {
        self.enqueued().saturating_sub(self.delivered())
    }

    pub fn record_enqueued(&self) -> u64 {
        self.enqueued.fetch_add(1, Ordering::Relaxed)
    }

    pub fn record_delivered(&self) -> u64 {
        self.delivered.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns the previous drop count
    pub fn record_dropped(&self) -> u64 {
        self.dropped.fetch_add(1, Ordering::Relaxed)
    }

    pub fn record_queue_full(&self) -> u64 {
        self.queue_full_events.fetch_add(1, Ordering::Relaxed)
    }

    pub fn record_block(&self) -> u64 {
        self.block_events.fetch_add(1, Ordering::Relaxed)
    }

    pub fn record_critical_preserved(&self) -> u64 {
        self.critical_preserved.fetch_add(1, Ordering::Relaxed)
    }

    /// Share of offered events that were dropped, as a percentage
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.dropped() as f64;
        let offered = self.enqueued() as f64 + dropped;
        if offered == 0.0 {
            0.0
        } else {
            (dropped / offered) * 100.0
        }
    }
}

impl Default for DispatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for DispatchMetrics {
    /// Snapshot of the current values
    fn clone(&self) -> Self {
        Self {
            enqueued: AtomicU64::new(self.enqueued()),
            delivered: AtomicU64::new(self.delivered()),
            dropped: AtomicU64::new(self.dropped()),
            queue_full_events: AtomicU64::new(self.queue_full_events()),
            block_events: AtomicU64::new(self.block_events()),
            critical_preserved: AtomicU64::new(self.critical_preserved()),
        }
    }
}
