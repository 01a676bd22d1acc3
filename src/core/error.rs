//! Error types for the logger system

use std::fmt;

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Logger already closed, or executor already shut down
    #[error("Logger already stopped")]
    LoggerStopped,

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// The same collector instance was registered twice
    #[error("Collector '{name}' is already registered")]
    DuplicateCollector { name: String },

    /// A collector panicked while collecting or closing
    #[error("Collector '{name}' panicked: {message}")]
    CollectorPanicked { name: String, message: String },

    /// File collector error with path
    #[error("File collector error for '{path}': {message}")]
    FileCollectorError { path: String, message: String },

    /// File rotation error
    #[error("File rotation failed for '{path}': {message}")]
    FileRotationError {
        path: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed interpolation pattern
    #[error("Formatter error ({pattern:?}): {message}")]
    FormatterError { pattern: String, message: String },

    /// Failures collected while closing several resources.
    ///
    /// `primary` is the first failure encountered, every later failure is
    /// kept in `suppressed` in the order it happened.
    #[error("{primary}{}", SuppressedSuffix(.suppressed))]
    Close {
        #[source]
        primary: Box<LoggerError>,
        suppressed: Vec<LoggerError>,
    },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

struct SuppressedSuffix<'a>(&'a [LoggerError]);

impl fmt::Display for SuppressedSuffix<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return Ok(());
        }
        write!(f, " (suppressed: ")?;
        for (idx, err) in self.0.iter().enumerate() {
            if idx > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", err)?;
        }
        write!(f, ")")
    }
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a file collector error
    pub fn file_collector(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileCollectorError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a file rotation error
    pub fn file_rotation(
        path: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::FileRotationError {
            path: path.into(),
            message: message.into(),
            source,
        }
    }

    /// Create a formatter error
    pub fn formatter(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FormatterError {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }

    /// Fold a sequence of failures into one error.
    ///
    /// The first failure becomes the primary error and the rest are attached
    /// as suppressed. Aggregates among `errors` are flattened, so nested
    /// closing keeps a single level. Returns `Ok(())` when there were no
    /// failures.
    pub fn aggregate(errors: impl IntoIterator<Item = LoggerError>) -> Result<()> {
        let mut errors = errors.into_iter().flat_map(|error| match error {
            LoggerError::Close {
                primary,
                suppressed,
            } => std::iter::once(*primary).chain(suppressed).collect::<Vec<_>>(),
            other => vec![other],
        });
        match errors.next() {
            None => Ok(()),
            Some(primary) => Err(LoggerError::Close {
                primary: Box::new(primary),
                suppressed: errors.collect(),
            }),
        }
    }

    /// Errors attached as suppressed to this one, if any
    pub fn suppressed(&self) -> &[LoggerError] {
        match self {
            LoggerError::Close { suppressed, .. } => suppressed,
            _ => &[],
        }
    }

    /// The primary error when this is an aggregate, otherwise `self`
    pub fn primary(&self) -> &LoggerError {
        match self {
            LoggerError::Close { primary, .. } => primary.as_ref(),
            other => other,
        }
    }
}

/// Extract a readable message from a caught panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
