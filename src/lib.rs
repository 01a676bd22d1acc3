//! # Stellar Logging
//!
//! An asynchronous log dispatch core: messages are filtered by a severity
//! threshold at the call site, then formatted and fanned out to pluggable
//! collectors on a single ordered worker thread.
//!
//! ## Features
//!
//! - **Non-blocking submission**: callers never wait on collector I/O
//! - **Consistent ordering**: every collector sees accepted messages in the
//!   same order
//! - **Failure isolation**: a failing or panicking collector never stops the
//!   others
//! - **Collectors**: colored console (with stdout/stderr capture) and rolling
//!   CSV files
//! - **Orderly shutdown**: [`Closer`](core::Closer) closes resources in reverse
//!   order and keeps every failure
//!
//! ## Example
//!
//! ```
//! use stellar_logging::prelude::*;
//!
//! let logger = Logger::builder().level(LogLevel::Error).build().unwrap();
//! logger.collector(FnCollector::new("stdout", |message: &LogMessage| {
//!     println!("{}", message);
//!     Ok(())
//! })).unwrap();
//!
//! logger.error("app", "something went wrong");
//! logger.debugging("app", "filtered out");
//! logger.close().unwrap();
//! ```

pub mod collectors;
pub mod core;
pub mod global;
pub mod macros;

pub mod prelude {
    pub use crate::collectors::Offloaded;
    #[cfg(feature = "console")]
    pub use crate::collectors::ConsoleCollector;
    #[cfg(feature = "file")]
    pub use crate::collectors::FileCollector;
    pub use crate::core::{
        Close, Closer, Collector, FnCollector, Latched, LogLevel, LogMessage, Logger,
        LoggerBuilder, LoggerConfig, LoggerError, LoggerMetrics, Result,
    };
}

pub use crate::core::{
    Close, Closer, Collector, Diagnostics, Executor, FnCollector, Latched, LogLevel, LogMessage,
    Logger, LoggerBuilder, LoggerConfig, LoggerError, LoggerMetrics, Result, WeakLogger,
};
