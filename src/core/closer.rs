//! LIFO teardown of acquired resources
//!
//! Resources are pushed with [`Closer::manage`] as they are acquired and
//! closed in the reverse order by [`Closer::close`]. A failing close never
//! stops the drain: the first failure is reported as the primary error and
//! every later one is attached to it as suppressed.

use super::error::{panic_message, LoggerError, Result};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Something that can be released exactly once at teardown
pub trait Close: Send + Sync {
    fn close(&self) -> Result<()>;
}

impl<C: Close + ?Sized> Close for Arc<C> {
    fn close(&self) -> Result<()> {
        (**self).close()
    }
}

struct FnClose<F>(F);

impl<F> Close for FnClose<F>
where
    F: Fn() -> Result<()> + Send + Sync,
{
    fn close(&self) -> Result<()> {
        (self.0)()
    }
}

/// # Example
///
/// ```
/// use stellar_logging::core::Closer;
/// use std::sync::{Arc, Mutex};
///
/// let order = Arc::new(Mutex::new(Vec::new()));
/// let closer = Closer::new();
/// for name in ["database", "cache"] {
///     let order = Arc::clone(&order);
///     closer.manage_fn(move || {
///         order.lock().unwrap().push(name);
///         Ok(())
///     });
/// }
///
/// closer.close().unwrap();
/// assert_eq!(*order.lock().unwrap(), vec!["cache", "database"]);
/// ```
#[derive(Default)]
pub struct Closer {
    stack: Mutex<Vec<Box<dyn Close>>>,
}

impl Closer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a shared resource and hand it back for chaining
    pub fn manage<R: Close + 'static>(&self, resource: Arc<R>) -> Arc<R> {
        self.stack.lock().push(Box::new(Arc::clone(&resource)));
        resource
    }

    pub fn manage_boxed(&self, resource: Box<dyn Close>) {
        self.stack.lock().push(resource);
    }

    pub fn manage_fn<F>(&self, close: F)
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.stack.lock().push(Box::new(FnClose(close)));
    }

    /// Number of resources still waiting to be closed
    pub fn len(&self) -> usize {
        self.stack.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.lock().is_empty()
    }

    /// Close every managed resource, most recent first
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::Close`] carrying the first failure as primary and
    /// the rest as suppressed
    pub fn close(&self) -> Result<()> {
        self.drain(None)
    }

    /// Close managed resources until `interrupted` is raised.
    ///
    /// The flag is checked before each resource. Once it is set, draining
    /// stops and the remaining resources stay on the stack without being
    /// closed; nothing else signals that they were skipped, so callers that
    /// care must check [`Closer::len`] afterwards.
    pub fn close_interruptible(&self, interrupted: &AtomicBool) -> Result<()> {
        self.drain(Some(interrupted))
    }

    fn drain(&self, interrupted: Option<&AtomicBool>) -> Result<()> {
        let mut failures = Vec::new();

        loop {
            if interrupted.is_some_and(|flag| flag.load(Ordering::Acquire)) {
                break;
            }

            // Pop under the lock, close outside it so manage() is never
            // blocked behind a slow resource.
            let Some(resource) = self.stack.lock().pop() else {
                break;
            };

            match catch_unwind(AssertUnwindSafe(|| resource.close())) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => failures.push(e),
                Err(panic) => failures.push(LoggerError::other(format!(
                    "resource panicked while closing: {}",
                    panic_message(panic.as_ref())
                ))),
            }
        }

        LoggerError::aggregate(failures)
    }
}

impl Close for Closer {
    fn close(&self) -> Result<()> {
        Closer::close(self)
    }
}

impl Drop for Closer {
    fn drop(&mut self) {
        if let Err(e) = self.drain(None) {
            eprintln!("[LOGGER ERROR] Failed to close resources on drop: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct Tracked {
        name: &'static str,
        log: Arc<StdMutex<Vec<&'static str>>>,
        fail: bool,
    }

    impl Close for Tracked {
        fn close(&self) -> Result<()> {
            self.log.lock().unwrap().push(self.name);
            if self.fail {
                Err(LoggerError::other(format!("{} failed", self.name)))
            } else {
                Ok(())
            }
        }
    }

    fn tracked(
        name: &'static str,
        log: &Arc<StdMutex<Vec<&'static str>>>,
        fail: bool,
    ) -> Arc<Tracked> {
        Arc::new(Tracked {
            name,
            log: Arc::clone(log),
            fail,
        })
    }

    #[test]
    fn test_closes_in_reverse_order() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let closer = Closer::new();
        closer.manage(tracked("A", &log, false));
        closer.manage(tracked("B", &log, false));

        closer.close().unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["B", "A"]);
        assert!(closer.is_empty());
    }

    #[test]
    fn test_manage_returns_resource() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let closer = Closer::new();
        let resource = closer.manage(tracked("A", &log, false));
        assert_eq!(resource.name, "A");
        assert_eq!(closer.len(), 1);
    }

    #[test]
    fn test_first_failure_is_primary() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let closer = Closer::new();
        closer.manage(tracked("A", &log, true));
        closer.manage(tracked("B", &log, true));

        let err = closer.close().unwrap_err();
        assert_eq!(err.primary().to_string(), "B failed");
        assert_eq!(err.suppressed().len(), 1);
        assert_eq!(err.suppressed()[0].to_string(), "A failed");
        assert_eq!(*log.lock().unwrap(), vec!["B", "A"]);
    }

    #[test]
    fn test_failure_does_not_stop_drain() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let closer = Closer::new();
        closer.manage(tracked("A", &log, false));
        closer.manage(tracked("B", &log, true));
        closer.manage(tracked("C", &log, false));

        let err = closer.close().unwrap_err();
        assert!(err.suppressed().is_empty());
        assert_eq!(*log.lock().unwrap(), vec!["C", "B", "A"]);
    }

    #[test]
    fn test_panicking_resource_is_reported() {
        let closer = Closer::new();
        closer.manage_fn(|| panic!("boom"));
        let err = closer.close().unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_interrupted_drain_leaves_remaining() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let interrupted = Arc::new(AtomicBool::new(false));
        let closer = Closer::new();

        closer.manage(tracked("A", &log, false));
        {
            let interrupted = Arc::clone(&interrupted);
            closer.manage_fn(move || {
                interrupted.store(true, Ordering::Release);
                Ok(())
            });
        }
        closer.manage(tracked("C", &log, false));

        closer.close_interruptible(&interrupted).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["C"]);
        assert_eq!(closer.len(), 1, "A is abandoned on the stack");
    }

    #[test]
    fn test_manage_while_closing_from_another_thread() {
        let closer = Arc::new(Closer::new());
        let closed = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let producer = {
            let closer = Arc::clone(&closer);
            let closed = Arc::clone(&closed);
            std::thread::spawn(move || {
                for _ in 0..1000 {
                    let closed = Arc::clone(&closed);
                    closer.manage_fn(move || {
                        closed.fetch_add(1, Ordering::Relaxed);
                        Ok(())
                    });
                }
            })
        };

        while !producer.is_finished() {
            closer.close().unwrap();
        }
        producer.join().unwrap();
        closer.close().unwrap();

        assert_eq!(closed.load(Ordering::Relaxed), 1000);
    }

    #[test]
    fn test_closers_nest() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let outer = Closer::new();
        let inner = outer.manage(Arc::new(Closer::new()));
        outer.manage(tracked("outer", &log, false));
        inner.manage(tracked("inner", &log, false));

        outer.close().unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["outer", "inner"]);
    }
}
