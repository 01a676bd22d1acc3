//! Process-wide logger for application wiring
//!
//! Libraries should take a [`Logger`] handle explicitly. This module exists
//! for the outermost layer of an application: it installs one logger once,
//! and code that asks for it earlier simply waits until it is installed.

use crate::core::{Latched, Logger, LoggerError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

static GLOBAL: Latched<Logger> = Latched::new();
static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Publish `logger` as the process-wide logger and wake everyone waiting for
/// it.
///
/// # Errors
///
/// Returns a configuration error if a logger was already installed
pub fn install(logger: Logger) -> Result<()> {
    if INSTALLED.swap(true, Ordering::AcqRel) {
        return Err(LoggerError::config(
            "global",
            "a process-wide logger is already installed",
        ));
    }
    GLOBAL.set(logger);
    GLOBAL.release();
    Ok(())
}

/// The process-wide logger, blocking until [`install`] has been called
pub fn logger() -> Result<Logger> {
    GLOBAL
        .get()
        .ok_or_else(|| LoggerError::other("process-wide logger released without a value"))
}

/// Like [`logger`], giving up after `timeout`
pub fn logger_timeout(timeout: Duration) -> Option<Logger> {
    GLOBAL.get_timeout(timeout).flatten()
}

pub fn is_installed() -> bool {
    !GLOBAL.is_locked()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    // The global is process-wide, so everything about it lives in one test.
    #[test]
    fn test_waiters_receive_installed_logger() {
        assert!(logger_timeout(Duration::from_millis(5)).is_none());

        let barrier = Arc::new(std::sync::Barrier::new(5));
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    logger().map(|logger| logger.severity())
                })
            })
            .collect();

        barrier.wait();
        let installed = Logger::builder().synchronous().severity(3).build().unwrap();
        install(installed).unwrap();

        for waiter in waiters {
            assert_eq!(waiter.join().unwrap().unwrap(), 3);
        }
        assert!(is_installed());

        let second = Logger::builder().synchronous().build().unwrap();
        assert!(install(second).is_err());
    }
}
