//! Log level definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity of a log message.
///
/// Levels are ordered by [`LogLevel::rank`]; the higher the rank, the more
/// verbose the level. [`LogLevel::All`] and [`LogLevel::Off`] sit at the
/// extremes and only exist to express thresholds, they are never the level of
/// a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LogLevel {
    All,
    #[default]
    Information,
    Warning,
    Error,
    Stacktrace,
    Debugging,
    Configuration,
    Off,
}

impl LogLevel {
    /// Every level, in rank order
    pub const ALL_LEVELS: [LogLevel; 8] = [
        LogLevel::All,
        LogLevel::Information,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Stacktrace,
        LogLevel::Debugging,
        LogLevel::Configuration,
        LogLevel::Off,
    ];

    /// Levels a message can carry (no sentinels)
    pub const MESSAGE_LEVELS: [LogLevel; 6] = [
        LogLevel::Information,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Stacktrace,
        LogLevel::Debugging,
        LogLevel::Configuration,
    ];

    pub const fn rank(&self) -> i32 {
        match self {
            LogLevel::All => i32::MIN,
            LogLevel::Information => 0,
            LogLevel::Warning => 1,
            LogLevel::Error => 2,
            LogLevel::Stacktrace => 3,
            LogLevel::Debugging => 4,
            LogLevel::Configuration => 5,
            LogLevel::Off => i32::MAX,
        }
    }

    pub const fn display(&self) -> &'static str {
        match self {
            LogLevel::All => "All",
            LogLevel::Information => "Information",
            LogLevel::Warning => "Warning",
            LogLevel::Error => "Error",
            LogLevel::Stacktrace => "Stacktrace",
            LogLevel::Debugging => "Debugging",
            LogLevel::Configuration => "Configuration",
            LogLevel::Off => "Off",
        }
    }

    /// Whether this level is one of the two threshold sentinels
    pub const fn is_sentinel(&self) -> bool {
        matches!(self, LogLevel::All | LogLevel::Off)
    }

    #[cfg(feature = "console")]
    pub fn color_code(&self) -> Option<colored::Color> {
        use colored::Color::*;
        match self {
            LogLevel::All | LogLevel::Information => Some(BrightBlue),
            LogLevel::Warning => Some(BrightYellow),
            LogLevel::Error | LogLevel::Stacktrace => Some(BrightRed),
            LogLevel::Debugging | LogLevel::Configuration => Some(BrightMagenta),
            LogLevel::Off => None,
        }
    }
}

impl PartialOrd for LogLevel {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LogLevel {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.display())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LogLevel::ALL_LEVELS
            .into_iter()
            .find(|level| level.display().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Invalid log level: '{}'", s))
    }
}
