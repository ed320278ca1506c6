//! Thread-per-task executor
//!
//! Every accepted task runs on a fresh thread from the backing factory.
//! There is no queue and no bound, so a task that blocks never delays
//! another. Shared by the carrier and platform runtimes.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use vthread_core::error::{VtError, VtResult};
use vthread_core::thread::Task;
use vthread_core::traits::{ExecutorService, ThreadFactory};

/// Executor starting one thread per task
pub struct ThreadPerTaskExecutor {
    factory: Arc<dyn ThreadFactory>,
    state: Arc<ExecState>,
}

struct ExecState {
    inner: Mutex<ExecInner>,
    changed: Condvar,
}

#[derive(Debug, Default)]
struct ExecInner {
    shutdown: bool,
    active: usize,
}

impl ExecInner {
    #[inline]
    fn terminated(&self) -> bool {
        self.shutdown && self.active == 0
    }
}

/// Decrements the active count when the task returns or unwinds
struct ActiveGuard(Arc<ExecState>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        let mut inner = self.0.inner.lock();
        inner.active -= 1;
        if inner.active == 0 {
            self.0.changed.notify_all();
        }
    }
}

impl ThreadPerTaskExecutor {
    pub fn new(factory: Arc<dyn ThreadFactory>) -> Self {
        Self {
            factory,
            state: Arc::new(ExecState {
                inner: Mutex::new(ExecInner::default()),
                changed: Condvar::new(),
            }),
        }
    }

    /// Tasks started and not yet finished
    pub fn active_count(&self) -> usize {
        self.state.inner.lock().active
    }
}

impl ExecutorService for ThreadPerTaskExecutor {
    fn execute(&self, task: Task) -> VtResult<()> {
        {
            let mut inner = self.state.inner.lock();
            if inner.shutdown {
                return Err(VtError::ExecutorShutdown);
            }
            inner.active += 1;
        }

        let guard = ActiveGuard(self.state.clone());
        self.factory
            .spawn(Box::new(move || {
                let _guard = guard;
                task();
            }))
            .map(|_| ())
    }

    fn shutdown(&self) {
        let mut inner = self.state.inner.lock();
        if !inner.shutdown {
            inner.shutdown = true;
            tracing::debug!(active = inner.active, "executor shut down");
        }
        self.state.changed.notify_all();
    }

    fn is_shutdown(&self) -> bool {
        self.state.inner.lock().shutdown
    }

    fn is_terminated(&self) -> bool {
        self.state.inner.lock().terminated()
    }

    fn await_termination(&self, timeout: Duration) -> bool {
        let mut inner = self.state.inner.lock();
        self.state
            .changed
            .wait_while_for(&mut inner, |i| !i.terminated(), timeout);
        inner.terminated()
    }
}

impl std::fmt::Debug for ThreadPerTaskExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.state.inner.lock();
        f.debug_struct("ThreadPerTaskExecutor")
            .field("prefix", &self.factory.prefix())
            .field("shutdown", &inner.shutdown)
            .field("active", &inner.active)
            .finish()
    }
}
