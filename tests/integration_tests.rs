//! Integration tests for the dispatch engine
//!
//! These tests verify:
//! - Delivery to several collectors and exactly-once close
//! - Identical ordering across collectors under concurrent producers
//! - Isolation of failing and panicking collectors
//! - Submission after close
//! - File rotation end to end
//! - Threshold changes while messages are in flight

use parking_lot::Mutex;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use stellar_logging::collectors::FileCollector;
use stellar_logging::core::Diagnostics;
use stellar_logging::prelude::*;
use tempfile::TempDir;

/// Collector that records messages and counts how often it was closed
#[derive(Clone, Default)]
struct Recorder {
    seen: Arc<Mutex<Vec<LogMessage>>>,
    closes: Arc<AtomicUsize>,
}

impl Recorder {
    fn texts(&self) -> Vec<String> {
        self.seen.lock().iter().map(|m| m.text.clone()).collect()
    }
}

impl Collector for Recorder {
    fn collect(&mut self, message: &LogMessage) -> Result<()> {
        self.seen.lock().push(message.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "recorder"
    }
}

#[test]
fn test_two_collectors_receive_and_close_once() {
    let first = Recorder::default();
    let second = Recorder::default();
    let logger = Logger::builder()
        .collector(first.clone())
        .collector(second.clone())
        .build()
        .expect("Failed to build logger");

    logger.information("net", "ping");
    logger.close().expect("Failed to close logger");
    logger.close().expect("Second close should be a no-op");

    for recorder in [&first, &second] {
        let seen = recorder.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].level, LogLevel::Information);
        assert_eq!(seen[0].name, "net");
        assert_eq!(seen[0].text, "ping");
        assert_eq!(recorder.closes.load(Ordering::SeqCst), 1);
    }
}

#[test]
fn test_collectors_agree_on_order_with_concurrent_producers() {
    let first = Recorder::default();
    let second = Recorder::default();
    let logger = Logger::builder()
        .collector(first.clone())
        .collector(second.clone())
        .build()
        .expect("Failed to build logger");

    let producers: Vec<_> = (0..8)
        .map(|producer| {
            let logger = logger.clone();
            thread::spawn(move || {
                for i in 0..250 {
                    logger.log_args(LogLevel::Warning, "load", "{0}:{1}", &[&producer, &i]);
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().expect("Producer panicked");
    }
    logger.close().expect("Failed to close logger");

    let first = first.texts();
    assert_eq!(first.len(), 2000);
    assert_eq!(first, second.texts());

    // Each producer's own messages keep their submission order.
    for producer in 0..8 {
        let prefix = format!("{}:", producer);
        let own: Vec<usize> = first
            .iter()
            .filter_map(|t| t.strip_prefix(&prefix))
            .map(|i| i.parse().unwrap())
            .collect();
        assert_eq!(own, (0..250).collect::<Vec<_>>());
    }
}

#[test]
fn test_failing_collector_does_not_affect_others() {
    let before = Recorder::default();
    let after = Recorder::default();
    let logger = Logger::builder()
        .collector(before.clone())
        .collector(FnCollector::new("failing", |_m: &LogMessage| {
            Err(LoggerError::other("always fails"))
        }))
        .collector(FnCollector::new("panicking", |m: &LogMessage| {
            if m.text == "second" {
                panic!("collector bug");
            }
            Ok(())
        }))
        .collector(after.clone())
        .diagnostics(Arc::new(Diagnostics::silent()))
        .build()
        .expect("Failed to build logger");

    for text in ["first", "second", "third"] {
        logger.error("app", text);
    }
    logger.close().expect("Failed to close logger");

    assert_eq!(before.texts(), ["first", "second", "third"]);
    assert_eq!(after.texts(), ["first", "second", "third"]);
    assert_eq!(logger.metrics().collector_failures(), 4);
    assert_eq!(logger.metrics().delivered(), 0);
}

#[test]
fn test_close_failures_are_aggregated() {
    let logger = Logger::builder()
        .collector(FnCollector::new("ok", |_m: &LogMessage| Ok(())))
        .build()
        .expect("Failed to build logger");

    struct FailingClose(&'static str);
    impl Collector for FailingClose {
        fn collect(&mut self, _message: &LogMessage) -> Result<()> {
            Ok(())
        }
        fn close(&mut self) -> Result<()> {
            Err(LoggerError::other(self.0))
        }
    }
    logger.collector(FailingClose("first")).unwrap();
    logger.collector(FailingClose("second")).unwrap();

    let err = logger.close().expect_err("close should report both failures");
    assert_eq!(err.primary().to_string(), "first");
    assert_eq!(err.suppressed().len(), 1);
    assert_eq!(err.suppressed()[0].to_string(), "second");
}

#[test]
fn test_submit_after_close_is_ignored() {
    let recorder = Recorder::default();
    let logger = Logger::builder()
        .collector(recorder.clone())
        .build()
        .expect("Failed to build logger");

    logger.information("app", "before");
    logger.close().expect("Failed to close logger");
    logger.information("app", "after");
    logger.error("app", "after");

    assert_eq!(recorder.texts(), ["before"]);
    assert_eq!(logger.metrics().accepted(), 1);
}

#[test]
fn test_rotation_writes_several_files() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let collector = FileCollector::new(temp_dir.path(), Duration::from_millis(10))
        .expect("Failed to create file collector");
    let logger = Logger::builder()
        .collector(collector)
        .build()
        .expect("Failed to build logger");

    for i in 0..6 {
        logger.log_args(LogLevel::Information, "rotation", "record {0}", &[&i]);
        thread::sleep(Duration::from_millis(20));
    }
    logger.close().expect("Failed to close logger");

    let files: Vec<_> = fs::read_dir(temp_dir.path())
        .expect("Failed to list temp dir")
        .map(|entry| entry.unwrap().path())
        .collect();
    assert!(files.len() >= 2, "expected at least two files, got {}", files.len());

    let mut records = 0;
    for file in &files {
        let contents = fs::read_to_string(file).expect("Failed to read log file");
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("\"time\",\"level\",\"thread\",\"name\",\"text\""));
        records += lines.count();
    }
    assert_eq!(records, 6);
}

#[test]
fn test_threshold_change_applies_to_queued_messages() {
    let recorder = Recorder::default();
    let logger = Logger::builder()
        .collector(recorder.clone())
        .collector(FnCollector::new("slow", |_m: &LogMessage| {
            thread::sleep(Duration::from_millis(2));
            Ok(())
        }))
        .build()
        .expect("Failed to build logger");

    for i in 0..50 {
        logger.log_args(LogLevel::Debugging, "gate", "{0}", &[&i]);
    }
    // Messages still queued are checked against the new threshold.
    logger.set_level(LogLevel::Error);
    logger.debugging("gate", "submitted after");
    logger.close().expect("Failed to close logger");

    let seen = recorder.texts();
    assert!(seen.len() < 50);
    assert!(!seen.contains(&"submitted after".to_string()));
    assert_eq!(
        logger.metrics().accepted() as usize,
        50,
        "every message passed the gate at submission"
    );
}

#[test]
fn test_closer_tears_down_logger_and_resources_in_reverse() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let closer = Closer::new();

    {
        let order = Arc::clone(&order);
        closer.manage_fn(move || {
            order.lock().push("registered first");
            Ok(())
        });
    }
    let logger = closer.manage(Arc::new(
        Logger::builder().build().expect("Failed to build logger"),
    ));
    {
        let order = Arc::clone(&order);
        closer.manage_fn(move || {
            order.lock().push("registered last");
            Ok(())
        });
    }

    closer.close().expect("Failed to close");
    assert!(logger.is_closed());
    assert_eq!(*order.lock(), ["registered last", "registered first"]);
    assert!(closer.is_empty());
}

#[test]
fn test_config_builds_working_logger() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let json = format!(
        r#"{{ "severity": 3, "io_threads": 1, "file": {{ "root": {:?}, "extension": "log" }} }}"#,
        temp_dir.path()
    );
    let logger = LoggerConfig::from_json(&json)
        .and_then(|config| config.build())
        .expect("Failed to build logger from config");

    logger.stacktrace("cfg", "filtered");
    logger.error("cfg", "kept");
    logger.close().expect("Failed to close logger");

    let file = fs::read_dir(temp_dir.path())
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .path();
    assert_eq!(file.extension().unwrap(), "log");
    let contents = fs::read_to_string(file).unwrap();
    assert!(contents.contains("'kept'"));
    assert!(!contents.contains("'filtered'"));
}
