//! Dispatch engine
//!
//! Every message enters through [`Logger::submit`]. Messages below the
//! severity threshold are dropped on the spot; the rest are queued on a
//! single ordered worker which formats them and hands them to each collector
//! in registration order. Because one thread invokes every collector, all
//! collectors observe accepted messages in the same relative order.

use super::{
    closer::Close,
    collector::Collector,
    diagnostics::Diagnostics,
    error::{panic_message, LoggerError, Result},
    executor::{Executor, InlineExecutor, PoolExecutor, WorkerExecutor},
    interpolate::interpolate,
    log_level::LogLevel,
    log_message::{current_thread_name, LogMessage},
    metrics::LoggerMetrics,
    severity::SeverityGate,
};
use chrono::{DateTime, Utc};
use crossbeam_channel::bounded;
use parking_lot::Mutex;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Name of the ordered worker thread
pub const WORKER_THREAD_NAME: &str = "logger-worker";

/// Default number of threads collectors can offload I/O to
pub const DEFAULT_IO_THREADS: usize = 4;

/// Handle to a dispatch engine.
///
/// Cloning is cheap and every clone talks to the same engine. The engine is
/// closed by [`Logger::close`], or when the last handle is dropped.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<Inner>,
}

/// Handle that does not keep the engine open.
///
/// Long-lived helpers (such as the console forwarder threads) hold one of
/// these so that dropping the last [`Logger`] still closes the engine.
#[derive(Clone)]
pub struct WeakLogger {
    inner: Weak<Inner>,
}

impl WeakLogger {
    pub fn upgrade(&self) -> Option<Logger> {
        self.inner.upgrade().map(|inner| Logger { inner })
    }
}

struct Inner {
    dispatch: Arc<Dispatch>,
    executor: Arc<dyn Executor>,
    io_executor: Arc<dyn Executor>,
    closed: AtomicBool,
}

/// State the worker needs to deliver a message
struct Dispatch {
    gate: SeverityGate,
    collectors: Mutex<Vec<Box<dyn Collector>>>,
    collectors_closed: AtomicBool,
    close_requested: AtomicBool,
    metrics: LoggerMetrics,
    diagnostics: Arc<Diagnostics>,
}

/// A submission waiting for the worker
struct Pending {
    time: DateTime<Utc>,
    level: LogLevel,
    thread: String,
    name: String,
    text: String,
    args: Vec<String>,
}

impl Logger {
    /// Create a logger with the default configuration: everything but
    /// [`LogLevel::Off`] enabled, one ordered worker thread and
    /// [`DEFAULT_IO_THREADS`] I/O threads.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// Submit a message. Never blocks on the collectors (unless the logger
    /// was built with [`LoggerBuilder::synchronous`]).
    ///
    /// The level is checked against the threshold now, and checked again on
    /// the worker right before delivery. A threshold change made in between
    /// therefore still applies to this message: threshold changes take
    /// effect eventually, not at a single instant.
    ///
    /// `args` fill `{0}`, `{1}`, ... placeholders in `text`; with no
    /// arguments the text is used as-is. Blank text, or the text `null`, is
    /// discarded. Submitting to a closed logger does nothing.
    pub fn submit(
        &self,
        time: DateTime<Utc>,
        level: LogLevel,
        thread: impl Into<String>,
        name: impl Into<String>,
        text: impl Into<String>,
        args: &[&dyn fmt::Display],
    ) {
        let dispatch = &self.inner.dispatch;
        if !dispatch.gate.enabled(level) {
            dispatch.metrics.record_filtered();
            return;
        }
        if self.is_closed() || self.inner.executor.is_shutdown() {
            return;
        }

        let pending = Pending {
            time,
            level,
            thread: thread.into(),
            name: name.into(),
            text: text.into(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
        };

        let worker_dispatch = Arc::clone(dispatch);
        let queued = self
            .inner
            .executor
            .execute(Box::new(move || worker_dispatch.deliver(pending)));

        // An executor shut down between the check above and here means the
        // logger is closing; the message goes the same way as any other
        // submission after close.
        if queued.is_ok() {
            dispatch.metrics.record_accepted();
        }
    }

    /// Submit with the current time and thread filled in
    pub fn log(&self, level: LogLevel, name: impl Into<String>, text: impl Into<String>) {
        self.log_args(level, name, text, &[]);
    }

    pub fn log_args(
        &self,
        level: LogLevel,
        name: impl Into<String>,
        text: impl Into<String>,
        args: &[&dyn fmt::Display],
    ) {
        if !self.enabled(level) {
            self.inner.dispatch.metrics.record_filtered();
            return;
        }
        self.submit(Utc::now(), level, current_thread_name(), name, text, args);
    }

    #[inline]
    pub fn information(&self, name: impl Into<String>, text: impl Into<String>) {
        self.log(LogLevel::Information, name, text);
    }

    #[inline]
    pub fn warning(&self, name: impl Into<String>, text: impl Into<String>) {
        self.log(LogLevel::Warning, name, text);
    }

    #[inline]
    pub fn error(&self, name: impl Into<String>, text: impl Into<String>) {
        self.log(LogLevel::Error, name, text);
    }

    #[inline]
    pub fn stacktrace(&self, name: impl Into<String>, text: impl Into<String>) {
        self.log(LogLevel::Stacktrace, name, text);
    }

    #[inline]
    pub fn debugging(&self, name: impl Into<String>, text: impl Into<String>) {
        self.log(LogLevel::Debugging, name, text);
    }

    #[inline]
    pub fn configuration(&self, name: impl Into<String>, text: impl Into<String>) {
        self.log(LogLevel::Configuration, name, text);
    }

    /// Log `error` and its chain of sources at [`LogLevel::Stacktrace`]
    pub fn stacktrace_error(
        &self,
        name: impl Into<String>,
        text: impl Into<String>,
        error: &(dyn std::error::Error + 'static),
    ) {
        if !self.enabled(LogLevel::Stacktrace) {
            self.inner.dispatch.metrics.record_filtered();
            return;
        }
        let mut text = text.into();
        text.push('\n');
        text.push_str(&error_chain(error));
        self.log(LogLevel::Stacktrace, name, text);
    }

    /// Register a collector. Collectors receive messages in the order they
    /// were registered.
    ///
    /// # Errors
    ///
    /// - [`LoggerError::DuplicateCollector`] if this shared instance is
    ///   already registered
    /// - [`LoggerError::LoggerStopped`] if the logger is closed
    pub fn collector<C: Collector + 'static>(&self, collector: C) -> Result<()> {
        self.register(Box::new(collector))
    }

    pub fn collectors<I>(&self, collectors: I) -> Result<()>
    where
        I: IntoIterator<Item = Box<dyn Collector>>,
    {
        collectors
            .into_iter()
            .try_for_each(|collector| self.register(collector))
    }

    fn register(&self, collector: Box<dyn Collector>) -> Result<()> {
        if self.is_closed() {
            return Err(LoggerError::LoggerStopped);
        }

        let mut collectors = self.inner.dispatch.collectors.lock();
        if let Some(identity) = collector.identity() {
            if collectors.iter().any(|c| c.identity() == Some(identity)) {
                return Err(LoggerError::DuplicateCollector {
                    name: collector.name().to_string(),
                });
            }
        }
        collectors.push(collector);
        Ok(())
    }

    pub fn collector_count(&self) -> usize {
        self.inner.dispatch.collectors.lock().len()
    }

    /// Set the threshold: levels ranked strictly below it are emitted.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `threshold` is negative
    pub fn set_severity(&self, threshold: i32) -> Result<()> {
        self.inner.dispatch.gate.set(threshold)
    }

    /// Emit `level` and everything more severe than it
    pub fn set_level(&self, level: LogLevel) {
        self.inner.dispatch.gate.set_level(level);
    }

    pub fn severity(&self) -> i32 {
        self.inner.dispatch.gate.threshold()
    }

    #[inline]
    pub fn enabled(&self, level: LogLevel) -> bool {
        self.inner.dispatch.gate.enabled(level)
    }

    #[inline]
    pub fn enabled_rank(&self, rank: i32) -> bool {
        self.inner.dispatch.gate.enabled_rank(rank)
    }

    /// Pool collectors can hand slow work to. Tasks on it run in no
    /// particular order.
    pub fn io_executor(&self) -> Arc<dyn Executor> {
        Arc::clone(&self.inner.io_executor)
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.inner.dispatch.metrics
    }

    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.inner.dispatch.diagnostics
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    pub fn downgrade(&self) -> WeakLogger {
        WeakLogger {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Close the logger. Irreversible; later calls return `Ok(())`.
    ///
    /// In order:
    /// 1. every collector is closed on the ordered worker, after the messages
    ///    queued before this call were delivered;
    /// 2. the I/O executor is shut down;
    /// 3. the ordered worker is shut down.
    ///
    /// Every step runs even if an earlier one failed.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::Close`] with the first failure as primary and
    /// the others suppressed
    pub fn close(&self) -> Result<()> {
        self.inner.close()
    }
}

impl Close for Logger {
    fn close(&self) -> Result<()> {
        Logger::close(self)
    }
}

impl Inner {
    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let mut failures = Vec::new();

        if let Err(e) = self.close_collectors() {
            failures.push(e);
        }
        if let Err(e) = self.io_executor.shutdown() {
            failures.push(e);
        }
        if let Err(e) = self.executor.shutdown() {
            failures.push(e);
        }

        LoggerError::aggregate(failures)
    }

    /// Close the collectors behind whatever is already queued
    fn close_collectors(&self) -> Result<()> {
        if self.executor.is_current() {
            // We are inside a delivery on the worker, which holds the
            // collectors; they are closed as soon as it finishes.
            self.dispatch.close_requested.store(true, Ordering::Release);
            return Ok(());
        }

        let (sender, receiver) = bounded(1);
        let dispatch = Arc::clone(&self.dispatch);

        let queued = self.executor.execute(Box::new(move || {
            let _ = sender.send(dispatch.close_collectors());
        }));

        match queued {
            Ok(()) => match receiver.recv() {
                Ok(result) => result,
                // The executor dropped the task without running it.
                Err(_) => self.dispatch.close_collectors(),
            },
            Err(_) => self.dispatch.close_collectors(),
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            self.dispatch
                .diagnostics
                .error(format_args!("Failed to close logger on drop: {}", e));
        }
    }
}

impl Dispatch {
    fn deliver(&self, pending: Pending) {
        if self.collectors_closed.load(Ordering::Acquire) {
            return;
        }
        if !self.gate.enabled(pending.level) {
            self.metrics.record_filtered();
            return;
        }
        if is_discardable(&pending.text) {
            return;
        }

        let text = if pending.args.is_empty() {
            pending.text
        } else {
            match interpolate(&pending.text, &pending.args) {
                Ok(text) => text,
                Err(e) => {
                    self.metrics.record_format_failure();
                    self.diagnostics
                        .error(format_args!("Dropped message from '{}': {}", pending.name, e));
                    return;
                }
            }
        };

        let message = LogMessage {
            time: pending.time,
            level: pending.level,
            thread: pending.thread,
            name: pending.name,
            text,
        };

        let mut collectors = self.collectors.lock();
        let mut failures = 0;

        for (idx, collector) in collectors.iter_mut().enumerate() {
            // Per-collector isolation: one failing collector must not keep
            // the others from seeing this message or later ones.
            match catch_unwind(AssertUnwindSafe(|| collector.collect(&message))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    self.diagnostics.error(format_args!(
                        "Collector #{} ({}) failed: {}",
                        idx,
                        collector.name(),
                        e
                    ));
                }
                Err(panic) => {
                    failures += 1;
                    self.diagnostics.critical(format_args!(
                        "Collector #{} ({}) panicked: {}. Other collectors continue to function.",
                        idx,
                        collector.name(),
                        panic_message(panic.as_ref())
                    ));
                }
            }
        }
        drop(collectors);

        if failures == 0 {
            self.metrics.record_delivered();
        } else {
            for _ in 0..failures {
                self.metrics.record_collector_failure();
            }
        }

        // close() was called from inside a collector during this delivery.
        if self.close_requested.load(Ordering::Acquire) {
            if let Err(e) = self.close_collectors() {
                self.diagnostics
                    .error(format_args!("Failed to close collectors: {}", e));
            }
        }
    }

    /// Close each collector once, in registration order
    fn close_collectors(&self) -> Result<()> {
        if self.collectors_closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let mut collectors = self.collectors.lock();
        let mut failures = Vec::new();

        for collector in collectors.iter_mut() {
            match catch_unwind(AssertUnwindSafe(|| collector.close())) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => failures.push(e),
                Err(panic) => failures.push(LoggerError::CollectorPanicked {
                    name: collector.name().to_string(),
                    message: panic_message(panic.as_ref()),
                }),
            }
        }

        LoggerError::aggregate(failures)
    }
}

/// Text that is never worth a message
fn is_discardable(text: &str) -> bool {
    text.trim().is_empty() || text.eq_ignore_ascii_case("null")
}

fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut chain = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push_str("\ncaused by: ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}

/// Builder for constructing a [`Logger`]
///
/// # Example
/// ```
/// use stellar_logging::prelude::*;
///
/// let logger = Logger::builder()
///     .level(LogLevel::Warning)
///     .io_threads(2)
///     .build()
///     .unwrap();
///
/// assert!(logger.enabled(LogLevel::Warning));
/// assert!(!logger.enabled(LogLevel::Error));
/// logger.close().unwrap();
/// ```
pub struct LoggerBuilder {
    severity: i32,
    collectors: Vec<Box<dyn Collector>>,
    executor: Option<Arc<dyn Executor>>,
    io_executor: Option<Arc<dyn Executor>>,
    io_threads: usize,
    synchronous: bool,
    diagnostics: Option<Arc<Diagnostics>>,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self {
            severity: i32::MAX,
            collectors: Vec::new(),
            executor: None,
            io_executor: None,
            io_threads: DEFAULT_IO_THREADS,
            synchronous: false,
            diagnostics: None,
        }
    }

    /// Set the raw threshold; must not be negative
    #[must_use = "builder methods return a new value"]
    pub fn severity(mut self, threshold: i32) -> Self {
        self.severity = threshold;
        self
    }

    /// Emit `level` and everything more severe than it
    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: LogLevel) -> Self {
        let gate = SeverityGate::new();
        gate.set_level(level);
        self.severity = gate.threshold();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn collector<C: Collector + 'static>(mut self, collector: C) -> Self {
        self.collectors.push(Box::new(collector));
        self
    }

    /// Use a custom ordered executor. It must run tasks one at a time in
    /// submission order, or collectors lose their ordering guarantee.
    #[must_use = "builder methods return a new value"]
    pub fn executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Deliver on the submitting thread instead of a worker
    #[must_use = "builder methods return a new value"]
    pub fn synchronous(mut self) -> Self {
        self.synchronous = true;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn io_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.io_executor = Some(executor);
        self
    }

    /// Size of the default I/O pool; ignored when an I/O executor is given
    #[must_use = "builder methods return a new value"]
    pub fn io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads;
        self
    }

    /// Where the logger reports its own failures (stderr by default)
    #[must_use = "builder methods return a new value"]
    pub fn diagnostics(mut self, diagnostics: Arc<Diagnostics>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// Build the Logger
    ///
    /// # Errors
    ///
    /// Fails with a configuration error when the threshold is negative, a
    /// supplied executor is already shut down, or worker threads cannot be
    /// spawned
    pub fn build(self) -> Result<Logger> {
        let gate = SeverityGate::with_threshold(self.severity)?;
        let diagnostics = self
            .diagnostics
            .unwrap_or_else(|| Arc::new(Diagnostics::stderr()));

        let executor: Arc<dyn Executor> = match self.executor {
            Some(executor) => live(executor, "executor")?,
            None if self.synchronous => Arc::new(InlineExecutor::new()),
            None => Arc::new(WorkerExecutor::with_diagnostics(
                WORKER_THREAD_NAME,
                Arc::clone(&diagnostics),
            )?),
        };

        let io_executor: Arc<dyn Executor> = match self.io_executor {
            Some(executor) => live(executor, "io_executor")?,
            None => Arc::new(PoolExecutor::with_diagnostics(
                "logger-io",
                self.io_threads,
                Arc::clone(&diagnostics),
            )?),
        };

        let logger = Logger {
            inner: Arc::new(Inner {
                dispatch: Arc::new(Dispatch {
                    gate,
                    collectors: Mutex::new(Vec::new()),
                    collectors_closed: AtomicBool::new(false),
                    close_requested: AtomicBool::new(false),
                    metrics: LoggerMetrics::new(),
                    diagnostics,
                }),
                executor,
                io_executor,
                closed: AtomicBool::new(false),
            }),
        };

        logger.collectors(self.collectors)?;
        Ok(logger)
    }
}

fn live(executor: Arc<dyn Executor>, component: &str) -> Result<Arc<dyn Executor>> {
    if executor.is_shutdown() {
        return Err(LoggerError::config(
            component,
            format!("executor '{}' is already shut down", executor.name()),
        ));
    }
    Ok(executor)
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("severity", &self.severity())
            .field("collectors", &self.collector_count())
            .field("executor", &self.inner.executor.name())
            .field("closed", &self.is_closed())
            .finish()
    }
}
