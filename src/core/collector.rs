//! Collector trait for log output destinations

use super::{error::Result, log_message::LogMessage};
use parking_lot::Mutex;
use std::sync::Arc;

/// Consumer of accepted messages.
///
/// `collect` is always called from the logger's single ordered worker, one
/// message at a time and in acceptance order, so implementations need no
/// locking of their own to keep output ordered. Anything slow should be
/// handed to [`Logger::io_executor`](super::Logger::io_executor) instead of
/// blocking the worker, since every other collector waits behind it.
pub trait Collector: Send {
    fn collect(&mut self, message: &LogMessage) -> Result<()>;

    /// Called exactly once, after the messages queued before
    /// [`Logger::close`](super::Logger::close) were collected.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "collector"
    }

    /// Address of the shared instance behind this collector, if any.
    ///
    /// The logger uses it to refuse registering the same instance twice.
    fn identity(&self) -> Option<usize> {
        None
    }
}

impl<C: Collector + ?Sized> Collector for Box<C> {
    fn collect(&mut self, message: &LogMessage) -> Result<()> {
        (**self).collect(message)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn identity(&self) -> Option<usize> {
        (**self).identity()
    }
}

/// A collector shared with the code that registered it, e.g. to inspect it
/// after the logger is closed
impl<C: Collector> Collector for Arc<Mutex<C>> {
    fn collect(&mut self, message: &LogMessage) -> Result<()> {
        self.lock().collect(message)
    }

    fn close(&mut self) -> Result<()> {
        self.lock().close()
    }

    fn name(&self) -> &str {
        "shared"
    }

    fn identity(&self) -> Option<usize> {
        Some(Arc::as_ptr(self) as *const () as usize)
    }
}

/// Collector backed by a closure
///
/// # Example
///
/// ```
/// use stellar_logging::core::{Collector, FnCollector};
///
/// let collector = FnCollector::new("counter", |message| {
///     assert!(!message.text.is_empty());
///     Ok(())
/// });
/// assert_eq!(collector.name(), "counter");
/// ```
pub struct FnCollector<F> {
    name: String,
    collect: F,
}

impl<F> FnCollector<F>
where
    F: FnMut(&LogMessage) -> Result<()> + Send,
{
    pub fn new(name: impl Into<String>, collect: F) -> Self {
        Self {
            name: name.into(),
            collect,
        }
    }
}

impl<F> Collector for FnCollector<F>
where
    F: FnMut(&LogMessage) -> Result<()> + Send,
{
    fn collect(&mut self, message: &LogMessage) -> Result<()> {
        (self.collect)(message)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
