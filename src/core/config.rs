//! Declarative logger configuration
//!
//! Everything the builder can set that makes sense in a config file, with
//! serde support so it can be loaded from JSON.
//!
//! ```
//! use stellar_logging::core::LoggerConfig;
//!
//! let config = LoggerConfig::from_json(r#"{ "severity": 2, "io_threads": 1 }"#).unwrap();
//! assert_eq!(config.severity, 2);
//! assert!(!config.console);
//! assert!(config.file.is_none());
//! ```

use super::error::{LoggerError, Result};
use super::logger::{Logger, DEFAULT_IO_THREADS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Twelve hours, in milliseconds
pub const DEFAULT_ROTATION_MILLIS: u64 = 12 * 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Levels ranked strictly below this are emitted
    pub severity: i32,

    /// Deliver on the calling thread instead of a worker
    pub synchronous: bool,

    /// Threads in the pool collectors offload I/O to
    pub io_threads: usize,

    /// Install the console collector (redirects stdout/stderr)
    pub console: bool,

    /// Rolling file collector, if any
    pub file: Option<FileConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub root: PathBuf,
    pub interval_ms: u64,
    pub extension: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            severity: i32::MAX,
            synchronous: false,
            io_threads: DEFAULT_IO_THREADS,
            console: false,
            file: None,
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("logging"),
            interval_ms: DEFAULT_ROTATION_MILLIS,
            extension: "csv".to_string(),
        }
    }
}

impl FileConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl LoggerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the values without building anything
    pub fn validate(&self) -> Result<()> {
        if self.severity < 0 {
            return Err(LoggerError::config(
                "LoggerConfig",
                format!("severity must not be negative, got {}", self.severity),
            ));
        }
        if self.io_threads == 0 {
            return Err(LoggerError::config("LoggerConfig", "io_threads must be at least 1"));
        }
        if let Some(file) = &self.file {
            if file.interval_ms == 0 {
                return Err(LoggerError::config("FileConfig", "interval_ms must be positive"));
            }
            if file.extension.is_empty() || file.extension.contains(['/', '\\', '.']) {
                return Err(LoggerError::config(
                    "FileConfig",
                    format!("invalid extension '{}'", file.extension),
                ));
            }
        }
        Ok(())
    }

    /// Build a logger and register the configured collectors: console first,
    /// then file.
    ///
    /// # Errors
    ///
    /// Fails on invalid values, when the console collector was already
    /// installed in this process, or when the first log file cannot be
    /// created
    pub fn build(&self) -> Result<Logger> {
        self.validate()?;

        let mut builder = Logger::builder()
            .severity(self.severity)
            .io_threads(self.io_threads);
        if self.synchronous {
            builder = builder.synchronous();
        }
        let logger = builder.build()?;

        if self.console {
            #[cfg(feature = "console")]
            {
                let console = crate::collectors::ConsoleCollector::install(&logger)?;
                logger.collector(console)?;
            }
            #[cfg(not(feature = "console"))]
            return Err(LoggerError::config(
                "LoggerConfig",
                "console output requires the 'console' feature",
            ));
        }

        if let Some(file) = &self.file {
            #[cfg(feature = "file")]
            {
                let collector = crate::collectors::FileCollector::builder(&file.root)
                    .interval(file.interval())
                    .extension(&file.extension)
                    .build()?;
                logger.collector(collector)?;
            }
            #[cfg(not(feature = "file"))]
            {
                let _ = file;
                return Err(LoggerError::config(
                    "LoggerConfig",
                    "file output requires the 'file' feature",
                ));
            }
        }

        Ok(logger)
    }
}
