//! Log message structure

use super::log_level::LogLevel;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A message accepted by the [`Logger`](super::Logger) and handed to every
/// collector.
///
/// Messages sort by `time` only, so two messages from the same instant
/// compare as equal in ordering while still being different values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessage {
    pub time: DateTime<Utc>,
    pub level: LogLevel,
    pub thread: String,
    pub name: String,
    pub text: String,
}

impl LogMessage {
    pub fn new(
        time: DateTime<Utc>,
        level: LogLevel,
        thread: impl Into<String>,
        name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            time,
            level,
            thread: thread.into(),
            name: name.into(),
            text: text.into(),
        }
    }
}

impl PartialOrd for LogMessage {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.time.cmp(&other.time))
    }
}

impl fmt::Display for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LogMessage[{} | {} | {} | \"{}\"]",
            self.time.with_timezone(&Local).format("%d/%m/%Y %H:%M:%S"),
            self.level,
            self.name,
            self.text
        )
    }
}

/// Name of the calling thread, falling back to its id when unnamed
pub fn current_thread_name() -> String {
    let current = std::thread::current();
    match current.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", current.id()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_messages_order_by_time_only() {
        let earlier = Utc.timestamp_millis_opt(1_000).unwrap();
        let later = Utc.timestamp_millis_opt(2_000).unwrap();

        let a = LogMessage::new(later, LogLevel::Information, "main", "a", "zzz");
        let b = LogMessage::new(earlier, LogLevel::Error, "main", "b", "aaa");
        assert!(b < a);

        let c = LogMessage::new(earlier, LogLevel::Warning, "other", "c", "ccc");
        assert_eq!(b.partial_cmp(&c), Some(Ordering::Equal));
        assert_ne!(b, c);
    }

    #[test]
    fn test_display_quotes_text() {
        let time = Utc.timestamp_millis_opt(0).unwrap();
        let message = LogMessage::new(time, LogLevel::Warning, "main", "app", "disk low");
        let rendered = message.to_string();
        assert!(rendered.starts_with("LogMessage["));
        assert!(rendered.ends_with("| Warning | app | \"disk low\"]"));
    }

    #[test]
    fn test_current_thread_name_uses_name() {
        let name = std::thread::Builder::new()
            .name("named-worker".into())
            .spawn(current_thread_name)
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(name, "named-worker");
    }
}
