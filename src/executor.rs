//! Task scheduling abstraction used to coalesce overwrites writes and
//! reloads.

use std::sync::Arc;
use std::time::Duration;

/// Schedules a boxed task for execution, synchronously or otherwise.
pub trait Executor: Send + Sync {
    /// Submits `task` for execution. Implementations decide when and on
    /// which thread it actually runs.
    fn execute(&self, task: Box<dyn FnOnce() + Send + 'static>);
}

/// Runs tasks inline, on the caller's thread, before `execute` returns.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateExecutor;

impl Executor for ImmediateExecutor {
    fn execute(&self, task: Box<dyn FnOnce() + Send + 'static>) {
        task();
    }
}

/// Runs tasks on a detached background thread after a fixed delay.
///
/// Intended for coalescing bursts of mutations into a single write: callers
/// gate re-entry with an atomic flag and clear it from inside the task, so
/// a flurry of `set` calls within the delay window produces one write.
#[derive(Debug, Clone)]
pub struct DelayedAsyncExecutor {
    delay: Duration,
}

impl DelayedAsyncExecutor {
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Executor for DelayedAsyncExecutor {
    fn execute(&self, task: Box<dyn FnOnce() + Send + 'static>) {
        let delay = self.delay;
        std::thread::spawn(move || {
            std::thread::sleep(delay);
            task();
        });
    }
}

/// Shared-pointer convenience so callers can pass an `Arc<dyn Executor>`
/// without repeating the trait-object boilerplate.
pub type SharedExecutor = Arc<dyn Executor>;
