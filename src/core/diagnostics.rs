//! Internal error reporting for the logger itself
//!
//! The logger cannot report its own failures through its collectors, so they
//! go to a separate writer. It defaults to stderr; once the console collector
//! has redirected the standard streams, it points at the original stderr so
//! that a failing collector cannot feed its own error report back into the
//! engine.

use parking_lot::Mutex;
use std::fmt;
use std::io::{self, Write};

pub struct Diagnostics {
    target: Mutex<Box<dyn Write + Send>>,
}

impl Diagnostics {
    pub fn new(target: impl Write + Send + 'static) -> Self {
        Self {
            target: Mutex::new(Box::new(target)),
        }
    }

    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// Discard every report
    pub fn silent() -> Self {
        Self::new(io::sink())
    }

    /// Swap the writer reports go to
    pub fn redirect(&self, target: Box<dyn Write + Send>) {
        *self.target.lock() = target;
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.report("LOGGER ERROR", args);
    }

    pub fn warning(&self, args: fmt::Arguments<'_>) {
        self.report("LOGGER WARNING", args);
    }

    pub fn critical(&self, args: fmt::Arguments<'_>) {
        self.report("LOGGER CRITICAL", args);
    }

    fn report(&self, tag: &str, args: fmt::Arguments<'_>) {
        let mut target = self.target.lock();
        // Nowhere left to report a failure to report.
        let _ = writeln!(target, "[{}] {}", tag, args);
        let _ = target.flush();
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::stderr()
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics").finish_non_exhaustive()
    }
}
