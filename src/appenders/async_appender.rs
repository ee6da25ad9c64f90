//! Appender that hands events to a worker thread
//!
//! The calling thread only pays for a channel send. A background worker
//! drains the queue in batches and dispatches each event to the appenders
//! attached to this one, so a slow file or socket never stalls the logger
//! that produced the event.

use crate::core::{
    diagnostics, Appender, AppenderAttachable, AppenderRef, DispatchMetrics, Level,
    LoggingEvent, LoggerError, OverflowCallback, OverflowPolicy, Result,
};
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default time `close` waits for the queue to drain
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub const DEFAULT_BUFFER_SIZE: usize = 128;

const BATCH_SIZE: usize = 50;
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// # Example
///
/// ```
/// use rust_logger_hierarchy::appenders::{AsyncAppender, FileAppender};
/// use rust_logger_hierarchy::prelude::*;
/// use std::sync::Arc;
///
/// let dir = tempfile::tempdir().unwrap();
/// let file = FileAppender::new(dir.path().join("app.log")).unwrap();
///
/// let queued = AsyncAppender::new(1024);
/// queued.add_appender(Arc::new(file));
///
/// let hierarchy = Hierarchy::new();
/// hierarchy.root_logger().add_appender(Arc::new(queued));
/// hierarchy.logger("app").info("written by the worker thread");
/// hierarchy.shutdown();
/// ```
pub struct AsyncAppender {
    name: String,
    appenders: Arc<Mutex<AppenderAttachable>>,
    sender: Mutex<Option<Sender<LoggingEvent>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    metrics: Arc<DispatchMetrics>,
    overflow_policy: OverflowPolicy,
    on_overflow: Option<OverflowCallback>,
    shutdown_timeout: Duration,
}

impl AsyncAppender {
    /// Queue of `buffer_size` events with the blocking overflow policy
    pub fn new(buffer_size: usize) -> Self {
        Self::with_config(buffer_size, OverflowPolicy::default(), None)
    }

    pub fn with_config(
        buffer_size: usize,
        overflow_policy: OverflowPolicy,
        on_overflow: Option<OverflowCallback>,
    ) -> Self {
        let (sender, receiver) = bounded(buffer_size.max(1));
        let appenders = Arc::new(Mutex::new(AppenderAttachable::new()));
        let metrics = Arc::new(DispatchMetrics::new());

        let worker_appenders = Arc::clone(&appenders);
        let worker_metrics = Arc::clone(&metrics);
        let worker = thread::Builder::new()
            .name("async-appender".to_string())
            .spawn(move || Self::run_worker(receiver, worker_appenders, worker_metrics));

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                diagnostics::error(format!("Cannot start async appender worker: {}", e));
                None
            }
        };

        Self {
            name: "async".to_string(),
            appenders,
            // without a worker nothing would ever drain the queue
            sender: Mutex::new(worker.as_ref().map(|_| sender)),
            worker: Mutex::new(worker),
            metrics,
            overflow_policy,
            on_overflow,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    fn run_worker(
        receiver: Receiver<LoggingEvent>,
        appenders: Arc<Mutex<AppenderAttachable>>,
        metrics: Arc<DispatchMetrics>,
    ) {
        let mut batch = Vec::with_capacity(BATCH_SIZE);

        // recv fails once every sender is gone and the queue is empty
        while let Ok(event) = receiver.recv() {
            batch.push(event);
            while batch.len() < BATCH_SIZE {
                match receiver.try_recv() {
                    Ok(event) => batch.push(event),
                    Err(_) => break,
                }
            }

            Self::deliver_batch(&appenders, &batch, &metrics);
            batch.clear();
        }
    }

    fn deliver_batch(
        appenders: &Mutex<AppenderAttachable>,
        batch: &[LoggingEvent],
        metrics: &DispatchMetrics,
    ) {
        let targets = {
            let appenders = appenders.lock();
            for event in batch {
                appenders.append_loop_on_appenders(event);
                metrics.record_delivered();
            }
            appenders.snapshot()
        };

        for appender in targets {
            if let Err(e) = appender.flush() {
                diagnostics::error(format!(
                    "Failed to flush appender '{}': {}",
                    appender.name(),
                    e
                ));
            }
        }
    }

    /// Attach a downstream appender; returns the one it replaced, if any
    pub fn add_appender(&self, appender: AppenderRef) -> Option<AppenderRef> {
        self.appenders.lock().add(appender)
    }

    pub fn remove_appender(&self, appender: &AppenderRef) -> bool {
        self.appenders.lock().remove(appender)
    }

    pub fn remove_appender_by_name(&self, name: &str) -> Option<AppenderRef> {
        self.appenders.lock().remove_by_name(name)
    }

    pub fn appender(&self, name: &str) -> Option<AppenderRef> {
        self.appenders.lock().get(name)
    }

    pub fn all_appenders(&self) -> Vec<AppenderRef> {
        self.appenders.lock().snapshot()
    }

    pub fn metrics(&self) -> &DispatchMetrics {
        &self.metrics
    }

    pub fn overflow_policy(&self) -> &OverflowPolicy {
        &self.overflow_policy
    }

    fn enqueue(&self, sender: &Sender<LoggingEvent>, event: LoggingEvent) -> Result<()> {
        let event = match sender.try_send(event) {
            Ok(()) => {
                self.metrics.record_enqueued();
                return Ok(());
            }
            Err(TrySendError::Full(event)) => event,
            Err(TrySendError::Disconnected(_)) => return Err(LoggerError::ChannelSendError),
        };

        self.metrics.record_queue_full();

        if event.level().is_at_least(&Level::ERROR) {
            self.metrics.record_critical_preserved();
            return self.send_blocking(sender, event);
        }

        match self.overflow_policy {
            OverflowPolicy::Block => self.send_blocking(sender, event),
            OverflowPolicy::BlockWithTimeout(timeout) => {
                self.metrics.record_block();
                match sender.send_timeout(event, timeout) {
                    Ok(()) => {
                        self.metrics.record_enqueued();
                        Ok(())
                    }
                    Err(SendTimeoutError::Timeout(_)) => {
                        self.drop_event();
                        Ok(())
                    }
                    Err(SendTimeoutError::Disconnected(_)) => Err(LoggerError::ChannelSendError),
                }
            }
            OverflowPolicy::DropNewest => {
                self.drop_event();
                Ok(())
            }
        }
    }

    fn send_blocking(&self, sender: &Sender<LoggingEvent>, event: LoggingEvent) -> Result<()> {
        self.metrics.record_block();
        sender
            .send(event)
            .map_err(|_| LoggerError::ChannelSendError)?;
        self.metrics.record_enqueued();
        Ok(())
    }

    fn drop_event(&self) {
        let dropped_before = self.metrics.record_dropped();

        // first drop and every 1000th after it
        if dropped_before % 1000 == 0 {
            diagnostics::warn(format!(
                "Queue of appender '{}' is full, {} events dropped. \
                 Consider a larger buffer or a blocking overflow policy.",
                self.name,
                dropped_before + 1
            ));
            if let Some(ref callback) = self.on_overflow {
                callback(dropped_before + 1);
            }
        }
    }

    /// Wait until every accepted event has been delivered, up to `timeout`
    fn wait_for_delivery(&self, timeout: Duration) -> bool {
        let start = Instant::now();
        while self.metrics.pending() > 0 {
            if start.elapsed() >= timeout {
                return false;
            }
            thread::sleep(POLL_INTERVAL);
        }
        true
    }
}

impl Default for AsyncAppender {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}

impl Appender for AsyncAppender {
    fn append(&self, event: &LoggingEvent) -> Result<()> {
        // clone the handle so a blocked send does not hold the lock `close` needs
        let sender = self
            .sender
            .lock()
            .clone()
            .ok_or_else(|| LoggerError::appender_closed(&self.name))?;
        self.enqueue(&sender, event.clone())
    }

    fn flush(&self) -> Result<()> {
        if !self.wait_for_delivery(self.shutdown_timeout) {
            return Err(LoggerError::other(format!(
                "Appender '{}' still had {} queued events after {:?}",
                self.name,
                self.metrics.pending(),
                self.shutdown_timeout
            )));
        }
        Ok(())
    }

    /// Stop accepting events, drain the queue and close the downstream
    /// appenders. Gives up waiting for the worker after the shutdown timeout.
    fn close(&self) -> Result<()> {
        // closing the channel lets the worker exit once it is empty
        drop(self.sender.lock().take());

        let Some(handle) = self.worker.lock().take() else {
            return Ok(());
        };

        let start = Instant::now();
        while !handle.is_finished() {
            if start.elapsed() >= self.shutdown_timeout {
                diagnostics::warn(format!(
                    "Worker of appender '{}' did not finish within {:?}; {} events may be lost.",
                    self.name,
                    self.shutdown_timeout,
                    self.metrics.pending()
                ));
                return Err(LoggerError::other(format!(
                    "Appender '{}' did not drain within {:?}",
                    self.name, self.shutdown_timeout
                )));
            }
            thread::sleep(POLL_INTERVAL);
        }

        if let Err(payload) = handle.join() {
            diagnostics::error(format!(
                "Worker of appender '{}' panicked: {}",
                self.name,
                diagnostics::panic_message(payload.as_ref())
            ));
        }

        for appender in self.appenders.lock().snapshot() {
            if let Err(e) = appender.close() {
                diagnostics::error(format!(
                    "Failed to close appender '{}': {}",
                    appender.name(),
                    e
                ));
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for AsyncAppender {
    fn drop(&mut self) {
        // close() already reports a timeout
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LocationInfo;
    use crossbeam_channel::unbounded;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    struct Collect {
        seen: Mutex<Vec<String>>,
        closed: AtomicBool,
    }

    impl Collect {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                closed: AtomicBool::new(false),
            })
        }
    }

    impl Appender for Collect {
        fn append(&self, event: &LoggingEvent) -> Result<()> {
            self.seen.lock().push(event.message().to_string());
            Ok(())
        }
        fn close(&self) -> Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
        fn name(&self) -> &str {
            "collect"
        }
    }

    /// Signals when it is entered, then waits to be released
    struct Gate {
        entered: Sender<()>,
        release: Receiver<()>,
    }

    impl Appender for Gate {
        fn append(&self, _event: &LoggingEvent) -> Result<()> {
            let _ = self.entered.send(());
            let _ = self.release.recv_timeout(Duration::from_secs(5));
            Ok(())
        }
        fn close(&self) -> Result<()> {
            Ok(())
        }
        fn name(&self) -> &str {
            "gate"
        }
    }

    fn event(level: Level, message: &str) -> LoggingEvent {
        LoggingEvent::new(
            Arc::from("async"),
            level,
            message.to_string(),
            LocationInfo::unavailable(),
        )
    }

    #[test]
    fn test_delivers_in_order_and_closes_downstream() {
        let sink = Collect::new();
        let appender = AsyncAppender::new(16);
        appender.add_appender(sink.clone());

        for i in 0..100 {
            appender.append(&event(Level::INFO, &format!("m{}", i))).unwrap();
        }
        appender.close().unwrap();

        let seen = sink.seen.lock().clone();
        assert_eq!(seen.len(), 100);
        assert_eq!(seen.first().map(String::as_str), Some("m0"));
        assert_eq!(seen.last().map(String::as_str), Some("m99"));
        assert!(sink.closed.load(Ordering::SeqCst));
        assert_eq!(appender.metrics().delivered(), 100);
        assert_eq!(appender.metrics().dropped(), 0);

        assert!(matches!(
            appender.append(&event(Level::INFO, "late")),
            Err(LoggerError::AppenderClosed { .. })
        ));
        // second close is a no-op
        appender.close().unwrap();
    }

    #[test]
    fn test_flush_waits_for_worker() {
        let sink = Collect::new();
        let appender = AsyncAppender::new(8);
        appender.add_appender(sink.clone());

        appender.append(&event(Level::DEBUG, "a")).unwrap();
        appender.append(&event(Level::DEBUG, "b")).unwrap();
        appender.flush().unwrap();

        assert_eq!(*sink.seen.lock(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(appender.metrics().pending(), 0);
    }

    #[test]
    fn test_drop_newest_keeps_errors() {
        let (entered_tx, entered_rx) = unbounded();
        let (release_tx, release_rx) = unbounded();
        let sink = Collect::new();
        let drops = Arc::new(AtomicU64::new(0));
        let drops_seen = Arc::clone(&drops);
        let on_overflow: OverflowCallback =
            Arc::new(move |total| drops_seen.store(total, Ordering::SeqCst));

        let appender = Arc::new(AsyncAppender::with_config(
            1,
            OverflowPolicy::DropNewest,
            Some(on_overflow),
        ));
        appender.add_appender(Arc::new(Gate {
            entered: entered_tx,
            release: release_rx,
        }));
        appender.add_appender(sink.clone());

        // worker is now parked inside the gate
        appender.append(&event(Level::INFO, "first")).unwrap();
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        appender.append(&event(Level::INFO, "queued")).unwrap();
        appender.append(&event(Level::INFO, "dropped")).unwrap();
        assert_eq!(appender.metrics().dropped(), 1);
        assert_eq!(drops.load(Ordering::SeqCst), 1);

        // an ERROR waits for space instead of being dropped
        let producer = {
            let appender = Arc::clone(&appender);
            thread::spawn(move || appender.append(&event(Level::ERROR, "kept")))
        };
        while appender.metrics().critical_preserved() == 0 {
            thread::sleep(Duration::from_millis(1));
        }
        for _ in 0..3 {
            let _ = release_tx.send(());
        }
        producer.join().unwrap().unwrap();
        appender.close().unwrap();

        assert_eq!(
            *sink.seen.lock(),
            vec!["first".to_string(), "queued".to_string(), "kept".to_string()]
        );
        assert_eq!(appender.metrics().dropped(), 1);
    }

    #[test]
    fn test_block_with_timeout_drops_after_waiting() {
        let (entered_tx, entered_rx) = unbounded();
        let (release_tx, release_rx) = unbounded();

        let appender = AsyncAppender::with_config(
            1,
            OverflowPolicy::BlockWithTimeout(Duration::from_millis(20)),
            None,
        );
        appender.add_appender(Arc::new(Gate {
            entered: entered_tx,
            release: release_rx,
        }));

        appender.append(&event(Level::WARN, "first")).unwrap();
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        appender.append(&event(Level::WARN, "queued")).unwrap();

        let started = Instant::now();
        appender.append(&event(Level::WARN, "late")).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(20));
        assert_eq!(appender.metrics().dropped(), 1);
        assert_eq!(appender.metrics().block_events(), 1);

        for _ in 0..2 {
            let _ = release_tx.send(());
        }
        appender.close().unwrap();
    }

    #[test]
    fn test_replace_downstream_by_name() {
        let appender = AsyncAppender::new(4).with_name("queued");
        let first = Collect::new();
        let second = Collect::new();

        assert!(appender.add_appender(first.clone()).is_none());
        assert!(appender.add_appender(second.clone()).is_some());
        assert_eq!(appender.all_appenders().len(), 1);
        assert!(appender.appender("collect").is_some());
        assert!(appender.remove_appender_by_name("collect").is_some());
        assert_eq!(appender.name(), "queued");
    }
}
