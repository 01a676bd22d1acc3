//! Single-release gate publishing one value to many waiting readers
//!
//! A [`Latched`] separates the value from the release signal: the value can be
//! replaced any number of times, but readers only get to see it once
//! [`Latched::release`] has been called. After that, [`Latched::get`] never
//! blocks again.

use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::time::{Duration, Instant};

/// # Example
///
/// ```
/// use stellar_logging::core::Latched;
/// use std::sync::Arc;
///
/// let latched = Arc::new(Latched::new());
/// let reader = {
///     let latched = Arc::clone(&latched);
///     std::thread::spawn(move || latched.get())
/// };
///
/// latched.set("ready");
/// latched.release();
/// assert_eq!(reader.join().unwrap(), Some("ready"));
/// ```
pub struct Latched<T> {
    state: Mutex<LatchState<T>>,
    released: Condvar,
}

struct LatchState<T> {
    value: Option<T>,
    released: bool,
}

impl<T> Latched<T> {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(LatchState {
                value: None,
                released: false,
            }),
            released: Condvar::new(),
        }
    }

    pub const fn with_value(value: T) -> Self {
        Self {
            state: Mutex::new(LatchState {
                value: Some(value),
                released: false,
            }),
            released: Condvar::new(),
        }
    }

    /// Replace the held value without releasing it
    pub fn set(&self, value: T) {
        self.state.lock().value = Some(value);
    }

    /// Open the gate. Idempotent.
    pub fn release(&self) {
        let mut state = self.state.lock();
        if !state.released {
            state.released = true;
            self.released.notify_all();
        }
    }

    /// Whether readers are still being held back
    pub fn is_locked(&self) -> bool {
        !self.state.lock().released
    }
}

impl<T: Clone> Latched<T> {
    /// Block until released, then return the latest value
    pub fn get(&self) -> Option<T> {
        let mut state = self.state.lock();
        while !state.released {
            self.released.wait(&mut state);
        }
        state.value.clone()
    }

    /// Like [`Latched::get`], giving up after `timeout`.
    ///
    /// Returns `None` on timeout, `Some(value)` once released. A timeout too
    /// large to express as a deadline waits like [`Latched::get`].
    pub fn get_timeout(&self, timeout: Duration) -> Option<Option<T>> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return Some(self.get());
        };
        let mut state = self.state.lock();
        while !state.released {
            if self.released.wait_until(&mut state, deadline).timed_out() && !state.released {
                return None;
            }
        }
        Some(state.value.clone())
    }

    /// Latest value if already released, without blocking
    pub fn try_get(&self) -> Option<Option<T>> {
        let state = self.state.lock();
        state.released.then(|| state.value.clone())
    }
}

impl<T> Default for Latched<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PartialEq> PartialEq for Latched<T> {
    /// Two gates are equal when they are the same gate, or when both are
    /// released and hold equal values. An unreleased gate equals only itself.
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        // Lock in address order so two threads comparing a == b and b == a
        // cannot deadlock.
        let (first, second) = if (self as *const Self) < (other as *const Self) {
            (self, other)
        } else {
            (other, self)
        };
        let first = first.state.lock();
        let second = second.state.lock();
        first.released && second.released && first.value == second.value
    }
}

impl<T: fmt::Debug> fmt::Display for Latched<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state.lock().value {
            Some(value) => write!(f, "Latched[object={:?}]", value),
            None => write!(f, "Latched[object=None]"),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Latched<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Latched")
            .field("value", &state.value)
            .field("released", &state.released)
            .finish()
    }
}
