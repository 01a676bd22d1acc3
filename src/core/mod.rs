//! Core logger types and traits

pub mod closer;
pub mod collector;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod executor;
pub mod interpolate;
pub mod latched;
pub mod log_level;
pub mod log_message;
pub mod logger;
pub mod metrics;
pub mod severity;

pub use closer::{Close, Closer};
pub use collector::{Collector, FnCollector};
pub use config::{FileConfig, LoggerConfig};
pub use diagnostics::Diagnostics;
pub use error::{LoggerError, Result};
pub use executor::{Executor, InlineExecutor, PoolExecutor, Task, WorkerExecutor};
pub use interpolate::interpolate;
pub use latched::Latched;
pub use log_level::LogLevel;
pub use log_message::{current_thread_name, LogMessage};
pub use logger::{Logger, LoggerBuilder, WeakLogger, DEFAULT_IO_THREADS, WORKER_THREAD_NAME};
pub use metrics::LoggerMetrics;
pub use severity::SeverityGate;
