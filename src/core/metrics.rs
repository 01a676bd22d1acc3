//! Logger metrics for observability
//!
//! Counters describing what happened to submitted messages: filtered by the
//! severity gate, accepted onto the worker, delivered to collectors, or lost to
//! a collector or formatting failure.

use std::sync::atomic::{AtomicU64, Ordering};

/// # Example
///
/// ```
/// use stellar_logging::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
/// metrics.record_accepted();
/// metrics.record_delivered();
///
/// assert_eq!(metrics.accepted(), 1);
/// assert_eq!(metrics.delivered(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Messages that passed the gate at submission and were queued
    accepted: AtomicU64,

    /// Messages dropped by the gate, at submission or on the worker
    filtered: AtomicU64,

    /// Messages handed to every collector without a failure
    delivered: AtomicU64,

    /// Individual collector failures (errors and panics)
    collector_failures: AtomicU64,

    /// Messages dropped because their pattern could not be interpolated
    format_failures: AtomicU64,
}

impl LoggerMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            accepted: AtomicU64::new(0),
            filtered: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            collector_failures: AtomicU64::new(0),
            format_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn filtered(&self) -> u64 {
        self.filtered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn collector_failures(&self) -> u64 {
        self.collector_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn format_failures(&self) -> u64 {
        self.format_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_accepted(&self) -> u64 {
        self.accepted.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_filtered(&self) -> u64 {
        self.filtered.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_delivered(&self) -> u64 {
        self.delivered.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_collector_failure(&self) -> u64 {
        self.collector_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_format_failure(&self) -> u64 {
        self.format_failures.fetch_add(1, Ordering::Relaxed)
    }

    /// Reset all metrics to zero
    pub fn reset(&self) {
        self.accepted.store(0, Ordering::Relaxed);
        self.filtered.store(0, Ordering::Relaxed);
        self.delivered.store(0, Ordering::Relaxed);
        self.collector_failures.store(0, Ordering::Relaxed);
        self.format_failures.store(0, Ordering::Relaxed);
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LoggerMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            accepted: AtomicU64::new(self.accepted()),
            filtered: AtomicU64::new(self.filtered()),
            delivered: AtomicU64::new(self.delivered()),
            collector_failures: AtomicU64::new(self.collector_failures()),
            format_failures: AtomicU64::new(self.format_failures()),
        }
    }
}
