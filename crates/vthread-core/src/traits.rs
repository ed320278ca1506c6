//! Provider and scope traits
//!
//! These traits define the interface between the registries / application
//! code and the concrete runtimes that implement them. Everything here is
//! object safe; the generic, typed entry points live in `scope` and as
//! inherent methods on the trait objects.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use crate::cancel::CancellationToken;
use crate::error::{ScopeState, TaskFailure, VtError, VtResult};
use crate::latch::Promise;
use crate::thread::{Task, ThreadHandle};

/// Type-erased subtask value
pub type ErasedValue = Box<dyn Any + Send>;

/// Type-erased subtask body
pub type ErasedTask = Box<dyn FnOnce(&CancellationToken) -> Result<ErasedValue, TaskFailure> + Send>;

/// A named, prioritized, capability-gated strategy
pub trait Provider: Send + Sync {
    /// Stable identifier for diagnostics
    fn name(&self) -> &str;

    /// Relative ranking; the registry picks the highest supported one
    fn priority(&self) -> i32;

    /// Capability probe
    ///
    /// Must be side-effect free. `Ok(false)` is the normal "not here" answer;
    /// `Err` (or a panic) is an exceptional failure, which registries log
    /// and treat as unsupported.
    fn is_supported(&self) -> VtResult<bool>;
}

/// Creates named threads (virtual or platform) for single units of work
pub trait ThreadFactory: Send + Sync {
    /// Prefix every name created by this factory starts with
    fn prefix(&self) -> &str;

    /// Start `task` on a new thread with a fresh name
    fn spawn(&self, task: Task) -> VtResult<ThreadHandle>;
}

/// Unbounded executor running each submitted task on its own thread
pub trait ExecutorService: Send + Sync {
    /// Start `task`; fails once the executor is shut down
    fn execute(&self, task: Task) -> VtResult<()>;

    /// Stop accepting tasks; running tasks continue
    fn shutdown(&self);

    fn is_shutdown(&self) -> bool;

    /// True once shut down and every started task has finished
    fn is_terminated(&self) -> bool;

    /// Block until terminated or the timeout elapses
    fn await_termination(&self, timeout: Duration) -> bool;

    /// Shut down and wait for every started task to finish
    fn close(&self) {
        self.shutdown();
        while !self.await_termination(Duration::from_secs(1)) {}
    }
}

impl dyn ExecutorService {
    /// Run `f` on a new thread and get a handle to its result
    pub fn submit<T, F>(&self, f: F) -> VtResult<TaskHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let promise = Arc::new(Promise::new());
        let slot = promise.clone();
        self.execute(Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(f)).map_err(TaskFailure::from_panic);
            slot.fulfill(outcome);
        }))?;
        Ok(TaskHandle { promise })
    }
}

/// Pending result of `ExecutorService::submit`
pub struct TaskHandle<T> {
    promise: Arc<Promise<Result<T, TaskFailure>>>,
}

impl<T> TaskHandle<T> {
    #[inline]
    pub fn is_done(&self) -> bool {
        self.promise.is_fulfilled()
    }

    /// Block until the task finishes; a panic surfaces as `Execution`
    pub fn get(self) -> VtResult<T> {
        match self.promise.take() {
            Some(Ok(value)) => Ok(value),
            Some(Err(failure)) => Err(VtError::Execution(failure)),
            None => Err(VtError::ResultTaken),
        }
    }
}

/// One way of obtaining virtual-thread factories and executors
pub trait VirtualThreadRuntime: Provider {
    #[inline]
    fn runtime_name(&self) -> &str {
        self.name()
    }

    /// Factory naming each created thread `"{prefix}{n}"`
    fn thread_factory(&self, prefix: &str) -> Arc<dyn ThreadFactory>;

    /// New thread-per-task executor backed by this runtime's factory
    fn executor_service(&self) -> Arc<dyn ExecutorService>;
}

/// Observable terminal state of a subtask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtaskState {
    Running,
    Success,
    Failed,
    Cancelled,
}

impl SubtaskState {
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, SubtaskState::Running)
    }
}

/// One forked unit of work inside a scope
pub trait StructuredSubtask: Send + Sync {
    fn state(&self) -> SubtaskState;

    /// Failure cause once the unit has failed or was cancelled
    fn failure(&self) -> Option<TaskFailure>;

    /// Block until terminal and move the value out
    fn take(&self) -> VtResult<ErasedValue>;

    /// Block until terminal and lend the value to `reader`, leaving it in place
    fn inspect(&self, reader: &mut dyn FnMut(&ErasedValue)) -> VtResult<()>;
}

/// Scope that waits for every forked subtask
pub trait StructuredTaskScopeAll: Send + Sync {
    fn name(&self) -> Option<&str>;

    fn state(&self) -> ScopeState;

    /// Start `task`; only valid while the scope is open
    fn fork_task(&self, task: ErasedTask) -> VtResult<Arc<dyn StructuredSubtask>>;

    /// Block until every forked subtask is terminal
    fn join(&self) -> VtResult<()>;

    /// First failure in fork order, if any subtask failed
    fn first_failure(&self) -> Option<TaskFailure>;

    /// Cancel outstanding work and wait for it; idempotent
    fn close(&self);
}

/// Scope that completes with the first successful subtask
pub trait StructuredTaskScopeAny: Send + Sync {
    fn name(&self) -> Option<&str>;

    fn state(&self) -> ScopeState;

    fn fork_task(&self, task: ErasedTask) -> VtResult<Arc<dyn StructuredSubtask>>;

    /// Block until one subtask succeeds or all have failed
    fn join(&self) -> VtResult<()>;

    /// Winning subtask, joining first if needed; the cause otherwise
    fn outcome(&self) -> Result<Arc<dyn StructuredSubtask>, TaskFailure>;

    fn close(&self);
}

/// One way of running structured groups of subtasks
pub trait StructuredTaskScopeProvider: Provider {
    #[inline]
    fn provider_name(&self) -> &str {
        self.name()
    }

    /// Open a scope with "await all" semantics
    fn open_all(
        &self,
        name: Option<&str>,
        factory: Arc<dyn ThreadFactory>,
    ) -> VtResult<Box<dyn StructuredTaskScopeAll>>;

    /// Open a scope with "first success, else fail" semantics
    fn open_any(
        &self,
        name: Option<&str>,
        factory: Arc<dyn ThreadFactory>,
    ) -> VtResult<Box<dyn StructuredTaskScopeAny>>;
}
