//! Run a collector on the logger's I/O pool

use crate::core::{Collector, Executor, LogMessage, Logger, Result, WeakLogger};
use parking_lot::Mutex;
use std::sync::Arc;

/// Hands each message to the wrapped collector on
/// [`Logger::io_executor`] so the ordered worker never waits on it.
///
/// The pool runs tasks in no particular order, so the wrapped collector may
/// see messages out of order and concurrently with the other collectors.
/// Failures inside the wrapped collector are reported through the logger's
/// diagnostics rather than returned from `collect`.
///
/// # Example
///
/// ```
/// use stellar_logging::prelude::*;
/// use stellar_logging::collectors::Offloaded;
///
/// let logger = Logger::new().unwrap();
/// let slow = FnCollector::new("slow", |_message: &LogMessage| Ok(()));
/// logger.collector(Offloaded::new(&logger, slow)).unwrap();
/// logger.close().unwrap();
/// ```
pub struct Offloaded<C> {
    inner: Arc<Mutex<C>>,
    name: String,
    executor: Arc<dyn Executor>,
    logger: WeakLogger,
}

impl<C: Collector + 'static> Offloaded<C> {
    pub fn new(logger: &Logger, collector: C) -> Self {
        let name = format!("offloaded {}", collector.name());
        Self {
            inner: Arc::new(Mutex::new(collector)),
            name,
            executor: logger.io_executor(),
            logger: logger.downgrade(),
        }
    }

    /// The wrapped collector, for inspection once the logger is closed
    pub fn shared(&self) -> Arc<Mutex<C>> {
        Arc::clone(&self.inner)
    }
}

impl<C: Collector + 'static> Collector for Offloaded<C> {
    fn collect(&mut self, message: &LogMessage) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        let logger = self.logger.clone();
        let name = self.name.clone();
        let message = message.clone();

        self.executor.execute(Box::new(move || {
            if let Err(e) = inner.lock().collect(&message) {
                if let Some(logger) = logger.upgrade() {
                    logger
                        .diagnostics()
                        .error(format_args!("Collector ({}) failed: {}", name, e));
                }
            }
        }))
    }

    /// Closes the wrapped collector right away; tasks still queued on the
    /// pool deliver to a closed collector
    fn close(&mut self) -> Result<()> {
        self.inner.lock().close()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn identity(&self) -> Option<usize> {
        Some(Arc::as_ptr(&self.inner) as *const () as usize)
    }
}

impl<C> std::fmt::Debug for Offloaded<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Offloaded")
            .field("name", &self.name)
            .field("executor", &self.executor.name())
            .finish()
    }
}
