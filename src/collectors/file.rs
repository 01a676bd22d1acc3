//! Rolling CSV file collector
//!
//! Each file starts with a header row, followed by one row per message:
//!
//! ```text
//! "time","level","thread","name","text"
//! "2024-05-01T10:15:30.123Z","Warning","main","db","'pool exhausted'"
//! ```
//!
//! A new file is started when the collector is created and then whenever the
//! rotation interval has passed since the last rotation; the check happens on
//! the next `collect`, so an idle collector does not rotate. Files are named
//! `<rotation epoch millis>-<uuid v4>.<extension>` and are never reused.

use crate::core::{Close, Collector, LogMessage, LoggerError, Result};
use chrono::{SecondsFormat, Utc};
use parking_lot::{Condvar, Mutex};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Twelve hours
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(12 * 60 * 60);

pub const DEFAULT_EXTENSION: &str = "csv";

const HEADER: &str = "\"time\",\"level\",\"thread\",\"name\",\"text\"\n";

/// Quote `text` for the `text` column.
///
/// Double and single quotes become backticks, then every line is wrapped in
/// single quotes and the lines are joined with nothing in between. Trailing
/// empty lines are dropped, so a text made only of newlines escapes to
/// nothing while the empty text is still `''`. Readers cannot tell a
/// backtick that was a quote from one that was always there.
///
/// ```
/// use stellar_logging::collectors::file::escape_text;
///
/// assert_eq!(escape_text("He said \"hi\"\nBye"), "'He said `hi`''Bye'");
/// assert_eq!(escape_text("boom\n\tat x\n"), "'boom''\tat x'");
/// ```
pub fn escape_text(text: &str) -> String {
    if text.is_empty() {
        return "''".to_string();
    }
    let replaced = text.replace(['"', '\''], "`");
    let body = replaced.trim_end_matches('\n');
    if body.is_empty() {
        return String::new();
    }
    body.split('\n').map(|line| format!("'{}'", line)).collect()
}

/// One CSV row, newline included
pub fn format_record(message: &LogMessage) -> String {
    format!(
        "\"{}\",\"{}\",\"{}\",\"{}\",\"{}\"\n",
        message.time.to_rfc3339_opts(SecondsFormat::Millis, true),
        message.level.display(),
        message.thread,
        message.name,
        escape_text(&message.text)
    )
}

struct OpenFile {
    path: PathBuf,
    file: File,
}

struct FileState {
    closing: bool,
    writing: bool,
    target: Option<OpenFile>,
}

/// State shared between the collector and its close handles
struct FileShared {
    state: Mutex<FileState>,
    idle: Condvar,
}

impl FileShared {
    fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.closing = true;
        while state.writing {
            self.idle.wait(&mut state);
        }

        match state.target.take() {
            Some(open) => open.file.sync_all().map_err(|e| {
                LoggerError::io_operation(
                    "closing log file",
                    format!("Failed to sync '{}'", open.path.display()),
                    e,
                )
            }),
            None => Ok(()),
        }
    }
}

/// Writes every message to a rolling set of CSV files under one directory
pub struct FileCollector {
    root: PathBuf,
    interval_millis: i64,
    extension: String,
    last_rotation: i64,
    current_path: Option<PathBuf>,
    shared: Arc<FileShared>,
}

impl FileCollector {
    /// Create a collector with the default extension and open its first file
    ///
    /// # Errors
    ///
    /// Fails when the root directory or the first file cannot be created
    pub fn new(root: impl AsRef<Path>, interval: Duration) -> Result<Self> {
        Self::builder(root).interval(interval).build()
    }

    #[must_use]
    pub fn builder(root: impl AsRef<Path>) -> FileCollectorBuilder {
        FileCollectorBuilder::new(root)
    }

    /// `logging/`, relative to the working directory
    pub fn default_root() -> PathBuf {
        PathBuf::from("logging")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File currently written to; `None` after `close` on the collector itself
    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    /// Handle that can close this collector from another thread
    pub fn handle(&self) -> FileCloseHandle {
        FileCloseHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    fn rotation_due(&self, now: i64) -> bool {
        now > self.last_rotation.saturating_add(self.interval_millis)
    }

    /// Sync and drop `previous`, then open a fresh file with its header
    fn rotate(&mut self, previous: Option<OpenFile>) -> Result<OpenFile> {
        if let Some(previous) = previous {
            previous.file.sync_all().map_err(|e| {
                LoggerError::file_rotation(
                    previous.path.display().to_string(),
                    "Failed to sync before rotation",
                    e,
                )
            })?;
        }

        // Two rotations in the same millisecond still get ordered names.
        let millis = Utc::now()
            .timestamp_millis()
            .max(self.last_rotation.saturating_add(1));

        fs::create_dir_all(&self.root).map_err(|e| {
            LoggerError::io_operation(
                "creating log directory",
                format!("Failed to create '{}'", self.root.display()),
                e,
            )
        })?;

        let path = self
            .root
            .join(format!("{}-{}.{}", millis, Uuid::new_v4(), self.extension));
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                LoggerError::file_rotation(path.display().to_string(), "Failed to create", e)
            })?;
        file.write_all(HEADER.as_bytes()).map_err(|e| {
            LoggerError::file_rotation(path.display().to_string(), "Failed to write header", e)
        })?;

        self.last_rotation = millis;
        self.current_path = Some(path.clone());
        Ok(OpenFile { path, file })
    }

    /// Write one record, rotating first when due. Hands the file back so it
    /// can be stored again even when the write failed.
    fn write(
        &mut self,
        target: Option<OpenFile>,
        message: &LogMessage,
    ) -> (Option<OpenFile>, Result<()>) {
        let mut open = match target {
            Some(open) if !self.rotation_due(Utc::now().timestamp_millis()) => open,
            previous => {
                self.current_path = None;
                match self.rotate(previous) {
                    Ok(open) => open,
                    Err(e) => return (None, Err(e)),
                }
            }
        };

        let result = open
            .file
            .write_all(format_record(message).as_bytes())
            .map_err(|e| {
                LoggerError::file_collector(
                    open.path.display().to_string(),
                    format!("Failed to write record: {}", e),
                )
            });
        (Some(open), result)
    }
}

impl Collector for FileCollector {
    fn collect(&mut self, message: &LogMessage) -> Result<()> {
        let target = {
            let mut state = self.shared.state.lock();
            if state.closing {
                return Ok(());
            }
            state.writing = true;
            state.target.take()
        };

        let (target, result) = self.write(target, message);

        let mut state = self.shared.state.lock();
        state.target = target;
        state.writing = false;
        self.shared.idle.notify_all();
        result
    }

    fn close(&mut self) -> Result<()> {
        let result = self.shared.close();
        self.current_path = None;
        result
    }

    fn name(&self) -> &str {
        "file"
    }
}

impl std::fmt::Debug for FileCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileCollector")
            .field("root", &self.root)
            .field("interval_millis", &self.interval_millis)
            .field("current_path", &self.current_path)
            .finish()
    }
}

/// Closes a [`FileCollector`] from outside the logger.
///
/// Waits for a write in progress to finish; records collected afterwards are
/// dropped silently.
#[derive(Clone)]
pub struct FileCloseHandle {
    shared: Arc<FileShared>,
}

impl FileCloseHandle {
    pub fn is_closing(&self) -> bool {
        self.shared.state.lock().closing
    }
}

impl Close for FileCloseHandle {
    fn close(&self) -> Result<()> {
        self.shared.close()
    }
}

/// Builder for [`FileCollector`]
///
/// # Example
///
/// ```no_run
/// use stellar_logging::collectors::FileCollector;
/// use std::time::Duration;
///
/// let collector = FileCollector::builder("/var/log/app")
///     .interval(Duration::from_secs(3600))
///     .extension("log")
///     .build()
///     .unwrap();
/// ```
pub struct FileCollectorBuilder {
    root: PathBuf,
    interval: Duration,
    extension: String,
}

impl FileCollectorBuilder {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            interval: DEFAULT_INTERVAL,
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// File extension, without the dot
    #[must_use = "builder methods return a new value"]
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Build the collector and open its first file
    ///
    /// # Errors
    ///
    /// Fails on a zero interval or an empty extension, and when the first
    /// file cannot be created
    pub fn build(self) -> Result<FileCollector> {
        if self.interval.is_zero() {
            return Err(LoggerError::config("FileCollector", "interval must be positive"));
        }
        if self.extension.is_empty() || self.extension.contains(['/', '\\', '.']) {
            return Err(LoggerError::config(
                "FileCollector",
                format!("invalid extension '{}'", self.extension),
            ));
        }

        let mut collector = FileCollector {
            root: self.root,
            interval_millis: i64::try_from(self.interval.as_millis()).unwrap_or(i64::MAX),
            extension: self.extension,
            last_rotation: i64::MIN,
            current_path: None,
            shared: Arc::new(FileShared {
                state: Mutex::new(FileState {
                    closing: false,
                    writing: false,
                    target: None,
                }),
                idle: Condvar::new(),
            }),
        };

        let first = collector.rotate(None)?;
        collector.shared.state.lock().target = Some(first);
        Ok(collector)
    }
}
