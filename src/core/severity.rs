//! Severity threshold shared between callers and the dispatch worker

use super::error::{LoggerError, Result};
use super::log_level::LogLevel;
use std::sync::atomic::{AtomicI32, Ordering};

/// Holds the current threshold. A level is enabled when its rank is strictly
/// below the threshold, so `i32::MAX` admits everything but `Off` and `0`
/// admits nothing but `All`.
#[derive(Debug)]
pub struct SeverityGate {
    threshold: AtomicI32,
}

impl SeverityGate {
    pub const fn new() -> Self {
        Self {
            threshold: AtomicI32::new(i32::MAX),
        }
    }

    /// Create a gate with an explicit threshold
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `threshold` is negative
    pub fn with_threshold(threshold: i32) -> Result<Self> {
        let gate = Self::new();
        gate.set(threshold)?;
        Ok(gate)
    }

    #[inline]
    pub fn threshold(&self) -> i32 {
        self.threshold.load(Ordering::Acquire)
    }

    /// Replace the threshold
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `threshold` is negative
    pub fn set(&self, threshold: i32) -> Result<()> {
        if threshold < 0 {
            return Err(LoggerError::config(
                "SeverityGate",
                format!("threshold must be between 0 and {}, got {}", i32::MAX, threshold),
            ));
        }
        self.threshold.store(threshold, Ordering::Release);
        Ok(())
    }

    /// Admit `level` and everything more severe than it
    pub fn set_level(&self, level: LogLevel) {
        let threshold = match level {
            LogLevel::All => 0,
            other => other.rank().saturating_add(1).max(0),
        };
        self.threshold.store(threshold, Ordering::Release);
    }

    /// Whether a message at `level` passes. The sentinels `All` and `Off`
    /// are thresholds, not message levels, and never pass.
    #[inline]
    pub fn enabled(&self, level: LogLevel) -> bool {
        !level.is_sentinel() && self.enabled_rank(level.rank())
    }

    #[inline]
    pub fn enabled_rank(&self, rank: i32) -> bool {
        rank < self.threshold()
    }
}

impl Default for SeverityGate {
    fn default() -> Self {
        Self::new()
    }
}
