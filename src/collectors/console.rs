//! Console collector
//!
//! Renders one colored line per message:
//!
//! ```text
//! [01/05/2024 12:15:30 | Warning       | main | db] pool exhausted
//! ```
//!
//! [`ConsoleCollector::install`] also takes over the process's standard
//! streams. Anything written to stdout or stderr afterwards, by this program
//! or its libraries, comes back through the logger as an `Information`
//! message named `stdout` or an `Error` message named `stderr`, and the
//! collector itself prints to a duplicate of the original stdout.

use crate::core::{
    current_thread_name, Collector, LogLevel, LogMessage, Logger, LoggerError, Result, WeakLogger,
};
use chrono::{Local, Utc};
use colored::Colorize;
use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};

/// Width of the level column; fits the longest level name
const LEVEL_WIDTH: usize = 13;

static INSTALLED: AtomicBool = AtomicBool::new(false);

pub struct ConsoleCollector {
    out: Box<dyn Write + Send>,
    use_colors: bool,
}

impl ConsoleCollector {
    /// Redirect stdout and stderr into `logger` and return the collector
    /// that prints to the original stdout. Register it with
    /// [`Logger::collector`] to see anything.
    ///
    /// The redirection is permanent and process-wide. The logger's
    /// diagnostics are moved to the original stderr so that its own error
    /// reports do not loop back into it.
    ///
    /// Colors are used only if the original stdout is a terminal. Once fd 1
    /// is a pipe `colored` can no longer tell, so the decision is pinned for
    /// the whole process with [`colored::control::set_override`].
    ///
    /// # Errors
    ///
    /// Fails if a console collector was already installed in this process,
    /// or if the streams cannot be redirected
    pub fn install(logger: &Logger) -> Result<Self> {
        if INSTALLED.swap(true, Ordering::AcqRel) {
            return Err(LoggerError::config(
                "ConsoleCollector",
                "already installed in this process",
            ));
        }

        match redirect::install(logger) {
            Ok((out, terminal)) => {
                colored::control::set_override(terminal);
                Ok(Self {
                    out,
                    use_colors: terminal,
                })
            }
            Err(e) => {
                INSTALLED.store(false, Ordering::Release);
                Err(e)
            }
        }
    }

    /// Collector writing to `out` without touching the standard streams.
    /// Colors start disabled.
    pub fn plain(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Box::new(out),
            use_colors: false,
        }
    }

    /// Turn the colored rendering on or off. Escape codes are still only
    /// emitted when `colored` colorizes for this process.
    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    pub fn use_colors(&self) -> bool {
        self.use_colors
    }

    pub fn is_installed() -> bool {
        INSTALLED.load(Ordering::Acquire)
    }

    /// The line printed for `message`, without the trailing newline
    pub fn render(&self, message: &LogMessage) -> String {
        let time = message
            .time
            .with_timezone(&Local)
            .format("%d/%m/%Y %H:%M:%S")
            .to_string();
        let level = format!("{:<width$}", message.level.display(), width = LEVEL_WIDTH);

        if !self.use_colors {
            return format!(
                "[{} | {} | {} | {}] {}",
                time, level, message.thread, message.name, message.text
            );
        }

        let level = match message.level.color_code() {
            Some(color) => level.color(color).to_string(),
            None => level,
        };
        let sep = " | ".bright_black();
        format!(
            "{}{}{}{}{}{}{}{}{}{}",
            "[".bright_black(),
            time.white().dimmed(),
            sep,
            level,
            sep,
            message.thread.white().dimmed(),
            sep,
            message.name.white().dimmed(),
            "] ".bright_black(),
            message.text
        )
    }
}

impl Collector for ConsoleCollector {
    fn collect(&mut self, message: &LogMessage) -> Result<()> {
        let line = self.render(message);
        writeln!(self.out, "{}", line)?;
        self.out.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}

/// Submit every non-empty line read from `reader` to the logger until the
/// reader ends or the logger is gone. Returns the number of lines submitted.
pub fn forward_lines(
    reader: impl BufRead,
    logger: &WeakLogger,
    level: LogLevel,
    name: &str,
) -> usize {
    let mut forwarded = 0;
    for line in reader.split(b'\n') {
        let Ok(line) = line else { break };
        let line = String::from_utf8_lossy(&line);
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let Some(logger) = logger.upgrade() else { break };
        logger.submit(Utc::now(), level, current_thread_name(), name, line, &[]);
        forwarded += 1;
    }
    forwarded
}

#[cfg(unix)]
mod redirect {
    use super::forward_lines;
    use crate::core::{LogLevel, Logger, LoggerError, Result, WeakLogger};
    use std::fs::File;
    use std::io::{self, BufReader, IsTerminal, Write};
    use std::os::fd::{FromRawFd, RawFd};
    use std::thread;

    fn check(ret: libc::c_int, operation: &str) -> Result<libc::c_int> {
        if ret < 0 {
            return Err(LoggerError::io_operation(
                operation,
                "redirecting standard streams",
                io::Error::last_os_error(),
            ));
        }
        Ok(ret)
    }

    fn duplicate(fd: RawFd) -> Result<File> {
        // SAFETY: dup returns a fresh descriptor we own exclusively.
        let copy = check(unsafe { libc::dup(fd) }, "duplicating descriptor")?;
        Ok(unsafe { File::from_raw_fd(copy) })
    }

    /// Point `fd` at the write end of a new pipe and return its read end
    fn pipe_into(fd: RawFd) -> Result<File> {
        let mut ends: [libc::c_int; 2] = [0; 2];
        // SAFETY: `ends` has room for the two descriptors pipe writes.
        check(unsafe { libc::pipe(ends.as_mut_ptr()) }, "creating pipe")?;
        let reader = unsafe { File::from_raw_fd(ends[0]) };
        let writer = unsafe { File::from_raw_fd(ends[1]) };

        check(unsafe { libc::dup2(ends[1], fd) }, "redirecting descriptor")?;
        drop(writer);
        Ok(reader)
    }

    fn spawn_forwarder(
        thread_name: &str,
        reader: File,
        logger: WeakLogger,
        level: LogLevel,
        name: &'static str,
    ) -> Result<()> {
        thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || {
                forward_lines(BufReader::new(reader), &logger, level, name);
            })
            .map_err(|e| {
                LoggerError::io_operation("spawning forwarder thread", thread_name.to_string(), e)
            })?;
        Ok(())
    }

    /// Returns the writer for the original stdout and whether it is a
    /// terminal
    pub(super) fn install(logger: &Logger) -> Result<(Box<dyn Write + Send>, bool)> {
        io::stdout().flush()?;
        io::stderr().flush()?;

        let stdout = duplicate(libc::STDOUT_FILENO)?;
        let stderr = duplicate(libc::STDERR_FILENO)?;
        // Must be read before fd 1 becomes a pipe.
        let terminal = stdout.is_terminal();

        let stdout_pipe = pipe_into(libc::STDOUT_FILENO)?;
        let stderr_pipe = pipe_into(libc::STDERR_FILENO)?;

        logger.diagnostics().redirect(Box::new(stderr));

        spawn_forwarder(
            "console-stdout",
            stdout_pipe,
            logger.downgrade(),
            LogLevel::Information,
            "stdout",
        )?;
        spawn_forwarder(
            "console-stderr",
            stderr_pipe,
            logger.downgrade(),
            LogLevel::Error,
            "stderr",
        )?;

        Ok((Box::new(stdout), terminal))
    }
}

#[cfg(not(unix))]
mod redirect {
    use crate::core::{Logger, Result};
    use std::io::{self, IsTerminal, Write};

    pub(super) fn install(_logger: &Logger) -> Result<(Box<dyn Write + Send>, bool)> {
        let stdout = io::stdout();
        let terminal = stdout.is_terminal();
        Ok((Box::new(stdout), terminal))
    }
}

impl std::fmt::Debug for ConsoleCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleCollector")
            .field("use_colors", &self.use_colors)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::diagnostics::testing::SharedBuffer;
    use crate::core::FnCollector;
    use chrono::TimeZone;
    use parking_lot::Mutex;
    use std::io::{self, Cursor};
    use std::sync::Arc;

    fn message(level: LogLevel) -> LogMessage {
        LogMessage::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 15, 30).unwrap(),
            level,
            "main",
            "db",
            "pool exhausted",
        )
    }

    #[test]
    fn test_plain_render() {
        let collector = ConsoleCollector::plain(io::sink());
        let msg = message(LogLevel::Warning);
        let time = msg.time.with_timezone(&Local).format("%d/%m/%Y %H:%M:%S");

        assert_eq!(
            collector.render(&msg),
            format!("[{} | Warning       | main | db] pool exhausted", time)
        );
    }

    #[test]
    fn test_level_column_is_aligned() {
        let collector = ConsoleCollector::plain(io::sink());
        let widths: Vec<usize> = LogLevel::MESSAGE_LEVELS
            .iter()
            .map(|level| collector.render(&message(*level)).find("| main").unwrap())
            .collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_collect_writes_one_line() {
        let buffer = SharedBuffer::default();
        let mut collector = ConsoleCollector::plain(buffer.clone());
        collector.collect(&message(LogLevel::Error)).unwrap();
        collector.collect(&message(LogLevel::Information)).unwrap();
        collector.close().unwrap();

        let contents = buffer.contents();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("| Error         |"));
        assert!(lines[1].ends_with("] pool exhausted"));
    }

    #[test]
    fn test_forward_lines_skips_empty_lines() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let logger = {
            let seen = Arc::clone(&seen);
            Logger::builder()
                .synchronous()
                .collector(FnCollector::new("seen", move |m: &LogMessage| {
                    seen.lock().push(m.clone());
                    Ok(())
                }))
                .build()
                .unwrap()
        };

        let input = Cursor::new(b"first\n\nsecond\r\n\n".to_vec());
        let forwarded = forward_lines(input, &logger.downgrade(), LogLevel::Error, "stderr");
        logger.close().unwrap();

        assert_eq!(forwarded, 2);
        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].text, "first");
        assert_eq!(seen[1].text, "second");
        assert!(seen.iter().all(|m| m.level == LogLevel::Error && m.name == "stderr"));
    }

    #[test]
    fn test_forward_lines_stops_when_logger_dropped() {
        let logger = Logger::builder().synchronous().build().unwrap();
        let weak = logger.downgrade();
        drop(logger);

        let input = Cursor::new(b"one\ntwo\n".to_vec());
        assert_eq!(forward_lines(input, &weak, LogLevel::Information, "stdout"), 0);
    }
}
