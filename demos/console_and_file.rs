//! Console and file logging example
//!
//! Installs the console collector, which captures stdout and stderr, and a
//! rolling file collector under `logging/`. Everything is torn down in
//! reverse order by a `Closer`.
//!
//! Run with: cargo run --example console_and_file

use std::sync::Arc;
use std::time::Duration;
use stellar_logging::collectors::{ConsoleCollector, FileCollector};
use stellar_logging::prelude::*;
use stellar_logging::{global, information, warning};

fn main() -> Result<()> {
    let closer = Closer::new();

    let logger = closer.manage(Arc::new(Logger::builder().level(LogLevel::Debugging).build()?));
    logger.collector(ConsoleCollector::install(&logger)?)?;

    let file = FileCollector::new(FileCollector::default_root(), Duration::from_secs(60))?;
    let file_path = file.current_path().map(|path| path.display().to_string());
    logger.collector(file)?;

    global::install(Logger::clone(&logger))?;

    // Plain prints now come back through the logger.
    println!("=== Stellar Logging - Console and File Example ===");
    if let Some(path) = file_path {
        println!("Writing records to {}", path);
    }

    information!(logger, "Application started");
    logger.configuration("config", "this level is filtered out");
    logger.debugging("config", "Loading configuration...");
    warning!(logger, "Using default settings for {} options", 3);

    for i in 1..=5 {
        logger.log_args(LogLevel::Information, "worker", "Processing item {0}/{1}", &[&i, &5]);
    }

    let error = std::io::Error::new(std::io::ErrorKind::NotFound, "plugin.so missing");
    logger.stacktrace_error("plugins", "Failed to load optional plugin", &error);

    global::logger()?.information("main", "Logged through the process-wide handle");
    eprintln!("This line arrives as an Error named 'stderr'");

    // Give the forwarder threads a moment to pick up the last prints.
    std::thread::sleep(Duration::from_millis(50));
    closer.close()
}
