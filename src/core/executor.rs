//! Executors that run dispatch and collector work
//!
//! The logger needs one *ordered* executor (a single worker thread draining a
//! FIFO queue, so every task runs in submission order) and optionally an
//! *unordered* pool that collectors can hand heavy I/O to. Both are plain
//! threads fed by a crossbeam channel; [`InlineExecutor`] runs tasks on the
//! calling thread instead.

use super::diagnostics::Diagnostics;
use super::error::{panic_message, LoggerError, Result};
use crossbeam_channel::{unbounded, Sender};
use parking_lot::{Mutex, RwLock};
use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

/// A unit of work
pub type Task = Box<dyn FnOnce() + Send + 'static>;

pub trait Executor: Send + Sync {
    /// Queue `task` for execution
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::LoggerStopped`] once the executor is shut down
    fn execute(&self, task: Task) -> Result<()>;

    fn is_shutdown(&self) -> bool;

    /// Stop accepting tasks, let queued tasks finish, and wait for the
    /// threads to exit. Calling it again is a no-op.
    fn shutdown(&self) -> Result<()>;

    fn name(&self) -> &str;

    /// Whether the calling code is itself running as one of this executor's
    /// tasks
    fn is_current(&self) -> bool {
        false
    }
}

/// Threads sharing one task queue
struct ThreadPool {
    name: String,
    sender: RwLock<Option<Sender<Task>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    thread_ids: Vec<ThreadId>,
    shutdown: AtomicBool,
}

impl ThreadPool {
    fn spawn(name: &str, threads: usize, diagnostics: Arc<Diagnostics>) -> Result<Self> {
        if threads == 0 {
            return Err(LoggerError::config(
                name,
                "executor needs at least one thread",
            ));
        }

        let (sender, receiver) = unbounded::<Task>();
        let mut handles = Vec::with_capacity(threads);

        for idx in 0..threads {
            let receiver = receiver.clone();
            let diagnostics = Arc::clone(&diagnostics);
            let thread_name = if threads == 1 {
                name.to_string()
            } else {
                format!("{}-{}", name, idx)
            };

            let handle = thread::Builder::new()
                .name(thread_name.clone())
                .spawn(move || {
                    // recv() fails once every sender is gone and the queue is
                    // empty, so queued tasks always run before exit.
                    while let Ok(task) = receiver.recv() {
                        if let Err(panic) = catch_unwind(AssertUnwindSafe(task)) {
                            diagnostics.critical(format_args!(
                                "Task on '{}' panicked: {}. The worker continues.",
                                thread_name,
                                panic_message(panic.as_ref())
                            ));
                        }
                    }
                })
                .map_err(|e| {
                    LoggerError::io_operation("spawning executor thread", name.to_string(), e)
                })?;
            handles.push(handle);
        }

        let thread_ids = handles.iter().map(|h| h.thread().id()).collect();

        Ok(Self {
            name: name.to_string(),
            sender: RwLock::new(Some(sender)),
            handles: Mutex::new(handles),
            thread_ids,
            shutdown: AtomicBool::new(false),
        })
    }

    fn execute(&self, task: Task) -> Result<()> {
        match self.sender.read().as_ref() {
            Some(sender) => sender.send(task).map_err(|_| LoggerError::LoggerStopped),
            None => Err(LoggerError::LoggerStopped),
        }
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    fn is_current(&self) -> bool {
        self.thread_ids.contains(&thread::current().id())
    }

    fn shutdown(&self) -> Result<()> {
        self.shutdown.store(true, Ordering::Release);
        drop(self.sender.write().take());

        // A task that shuts down its own executor cannot wait for itself.
        let current = thread::current().id();
        let own_thread = self.is_current();

        let handles: Vec<_> = std::mem::take(&mut *self.handles.lock());
        let mut failures = Vec::new();
        for handle in handles {
            if own_thread && handle.thread().id() == current {
                continue;
            }
            if let Err(panic) = handle.join() {
                failures.push(LoggerError::other(format!(
                    "executor '{}' thread panicked: {}",
                    self.name,
                    panic_message(panic.as_ref())
                )));
            }
        }
        LoggerError::aggregate(failures)
    }
}

/// One dedicated thread running tasks strictly in submission order
pub struct WorkerExecutor {
    pool: ThreadPool,
}

impl WorkerExecutor {
    pub fn new(name: &str) -> Result<Self> {
        Self::with_diagnostics(name, Arc::new(Diagnostics::stderr()))
    }

    pub fn with_diagnostics(name: &str, diagnostics: Arc<Diagnostics>) -> Result<Self> {
        Ok(Self {
            pool: ThreadPool::spawn(name, 1, diagnostics)?,
        })
    }
}

impl Executor for WorkerExecutor {
    fn execute(&self, task: Task) -> Result<()> {
        self.pool.execute(task)
    }

    fn is_shutdown(&self) -> bool {
        self.pool.is_shutdown()
    }

    fn is_current(&self) -> bool {
        self.pool.is_current()
    }

    fn shutdown(&self) -> Result<()> {
        self.pool.shutdown()
    }

    fn name(&self) -> &str {
        &self.pool.name
    }
}

/// A fixed number of threads with no ordering between tasks
pub struct PoolExecutor {
    pool: ThreadPool,
}

impl PoolExecutor {
    pub fn new(name: &str, threads: usize) -> Result<Self> {
        Self::with_diagnostics(name, threads, Arc::new(Diagnostics::stderr()))
    }

    pub fn with_diagnostics(
        name: &str,
        threads: usize,
        diagnostics: Arc<Diagnostics>,
    ) -> Result<Self> {
        Ok(Self {
            pool: ThreadPool::spawn(name, threads, diagnostics)?,
        })
    }

    pub fn threads(&self) -> usize {
        self.pool.thread_ids.len()
    }
}

impl Executor for PoolExecutor {
    fn execute(&self, task: Task) -> Result<()> {
        self.pool.execute(task)
    }

    fn is_shutdown(&self) -> bool {
        self.pool.is_shutdown()
    }

    fn is_current(&self) -> bool {
        self.pool.is_current()
    }

    fn shutdown(&self) -> Result<()> {
        self.pool.shutdown()
    }

    fn name(&self) -> &str {
        &self.pool.name
    }
}

/// Runs every task immediately on the submitting thread.
///
/// Ordering then follows the callers' own ordering, and `submit` blocks for
/// as long as the collectors take.
#[derive(Debug, Default)]
pub struct InlineExecutor {
    shutdown: AtomicBool,
}

impl InlineExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

thread_local! {
    static INLINE_DEPTH: Cell<usize> = const { Cell::new(0) };
}

impl Executor for InlineExecutor {
    fn execute(&self, task: Task) -> Result<()> {
        if self.is_shutdown() {
            return Err(LoggerError::LoggerStopped);
        }
        INLINE_DEPTH.with(|depth| depth.set(depth.get() + 1));
        let result = catch_unwind(AssertUnwindSafe(task));
        INLINE_DEPTH.with(|depth| depth.set(depth.get() - 1));

        result.map_err(|panic| {
            LoggerError::other(format!(
                "inline task panicked: {}",
                panic_message(panic.as_ref())
            ))
        })
    }

    fn is_current(&self) -> bool {
        INLINE_DEPTH.with(|depth| depth.get() > 0)
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    fn shutdown(&self) -> Result<()> {
        self.shutdown.store(true, Ordering::Release);
        Ok(())
    }

    fn name(&self) -> &str {
        "inline"
    }
}
