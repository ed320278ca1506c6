//! Thread handles and naming
//!
//! Every unit started by a `ThreadFactory` gets a name `"{prefix}{n}"`,
//! where `n` comes from a per-factory counter, and a `ThreadHandle` that
//! can be joined.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::latch::Latch;

/// Prefix used when callers do not pick one
pub const DEFAULT_THREAD_PREFIX: &str = "vt-";

/// A unit of work handed to a thread factory or executor
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Generates distinct, prefix-based names
#[derive(Debug)]
pub struct ThreadNamer {
    prefix: String,
    next: AtomicU64,
}

impl ThreadNamer {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            next: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Next name; never repeats for the lifetime of this namer
    pub fn next_name(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}{}", self.prefix, n)
    }
}

/// Handle to a started unit of work
#[derive(Debug, Clone)]
pub struct ThreadHandle {
    name: String,
    done: Arc<Latch>,
}

impl ThreadHandle {
    /// Build a handle; the runner must call `done.release()` when finished
    pub fn new(name: String, done: Arc<Latch>) -> Self {
        Self { name, done }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.done.is_released()
    }

    /// Block until the unit has finished (normally or by panicking)
    pub fn join(&self) {
        self.done.wait();
    }

    /// Block until finished or the timeout elapses; true if finished
    pub fn join_timeout(&self, timeout: Duration) -> bool {
        self.done.wait_timeout(timeout)
    }
}

/// Releases a latch when dropped, so a panicking task still completes
pub struct CompletionGuard(Arc<Latch>);

impl CompletionGuard {
    pub fn new(done: Arc<Latch>) -> Self {
        Self(done)
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.0.release();
    }
}
