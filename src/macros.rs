//! Logging macros for ergonomic log message formatting.
//!
//! The message is formatted with `format!` before it is submitted, and the
//! calling module's path becomes the message name. A message whose level is
//! filtered out is never formatted.
//!
//! # Examples
//!
//! ```
//! use stellar_logging::prelude::*;
//! use stellar_logging::{information, warning};
//!
//! let logger = Logger::builder().synchronous().build().unwrap();
//!
//! information!(logger, "Server started");
//!
//! let port = 8080;
//! warning!(logger, "Port {} is already in use", port);
//! # logger.close().unwrap();
//! ```

/// Log a message at an explicit level.
///
/// # Examples
///
/// ```
/// # use stellar_logging::prelude::*;
/// # let logger = Logger::builder().synchronous().build().unwrap();
/// use stellar_logging::log;
/// log!(logger, LogLevel::Information, "Simple message");
/// log!(logger, LogLevel::Error, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {{
        let level = $level;
        if $logger.enabled(level) {
            $logger.log(level, module_path!(), format!($($arg)+))
        }
    }};
}

/// Log an information-level message.
#[macro_export]
macro_rules! information {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Information, $($arg)+)
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warning {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warning, $($arg)+)
    };
}

/// Log an error-level message.
///
/// # Examples
///
/// ```
/// # use stellar_logging::prelude::*;
/// # let logger = Logger::builder().synchronous().build().unwrap();
/// use stellar_logging::error;
/// error!(logger, "Connection to {} failed", "db-1");
/// ```
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log a stacktrace-level message.
#[macro_export]
macro_rules! stacktrace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Stacktrace, $($arg)+)
    };
}

/// Log a debugging-level message.
#[macro_export]
macro_rules! debugging {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debugging, $($arg)+)
    };
}

/// Log a configuration-level message.
#[macro_export]
macro_rules! configuration {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Configuration, $($arg)+)
    };
}
