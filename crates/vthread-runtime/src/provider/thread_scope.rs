//! `ThreadScopeProvider`: scope contracts over the native `TaskScope`
//!
//! The all-scope adapter remembers subtasks in fork order so that
//! `first_failure` reports the earliest forked failure, not the earliest
//! to finish. The any-scope adapter memoizes the native join outcome and
//! keeps the winning unit rather than its value, so `result` and the
//! winner's own handle read the same slot.

use std::sync::Arc;

use parking_lot::Mutex;

use vthread_core::error::{ScopeState, TaskFailure, VtResult};
use vthread_core::traits::{
    ErasedTask, Provider, StructuredSubtask, StructuredTaskScopeAll, StructuredTaskScopeAny,
    StructuredTaskScopeProvider, SubtaskState, ThreadFactory,
};

use crate::host::{self, LEVEL_CARRIERS};
use crate::scope::{JoinPolicy, Joined, SubtaskCell, TaskScope};

/// Provider of fork/join scopes running units on the caller's factory
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadScopeProvider;

impl ThreadScopeProvider {
    pub const NAME: &'static str = "thread-task-scope";

    /// Host feature level needed to open scopes
    pub const REQUIRED_FEATURE_LEVEL: u32 = LEVEL_CARRIERS;

    pub fn new() -> Self {
        Self
    }
}

impl Provider for ThreadScopeProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        Self::REQUIRED_FEATURE_LEVEL as i32
    }

    fn is_supported(&self) -> VtResult<bool> {
        Ok(host::feature_level() >= Self::REQUIRED_FEATURE_LEVEL)
    }
}

impl StructuredTaskScopeProvider for ThreadScopeProvider {
    fn open_all(
        &self,
        name: Option<&str>,
        factory: Arc<dyn ThreadFactory>,
    ) -> VtResult<Box<dyn StructuredTaskScopeAll>> {
        Ok(Box::new(AllAdapter {
            scope: TaskScope::new(JoinPolicy::AwaitAll, name, factory),
            subtasks: Mutex::new(Vec::new()),
        }))
    }

    fn open_any(
        &self,
        name: Option<&str>,
        factory: Arc<dyn ThreadFactory>,
    ) -> VtResult<Box<dyn StructuredTaskScopeAny>> {
        Ok(Box::new(AnyAdapter {
            scope: TaskScope::new(JoinPolicy::AnySuccess, name, factory),
            outcome: Mutex::new(AnyOutcome::Pending),
        }))
    }
}

struct AllAdapter {
    scope: TaskScope,
    /// Fork order
    subtasks: Mutex<Vec<Arc<SubtaskCell>>>,
}

impl StructuredTaskScopeAll for AllAdapter {
    fn name(&self) -> Option<&str> {
        self.scope.name()
    }

    fn state(&self) -> ScopeState {
        self.scope.state()
    }

    fn fork_task(&self, task: ErasedTask) -> VtResult<Arc<dyn StructuredSubtask>> {
        let cell = self.scope.fork(task)?;
        self.subtasks.lock().push(cell.clone());
        Ok(cell)
    }

    fn join(&self) -> VtResult<()> {
        self.scope.join().map(|_| ())
    }

    fn first_failure(&self) -> Option<TaskFailure> {
        self.subtasks
            .lock()
            .iter()
            .filter(|cell| cell.state() == SubtaskState::Failed)
            .find_map(|cell| cell.failure())
    }

    fn close(&self) {
        self.scope.close();
        self.subtasks.lock().clear();
    }
}

enum AnyOutcome {
    Pending,
    Success(Arc<SubtaskCell>),
    Failed(TaskFailure),
}

struct AnyAdapter {
    scope: TaskScope,
    outcome: Mutex<AnyOutcome>,
}

impl StructuredTaskScopeAny for AnyAdapter {
    fn name(&self) -> Option<&str> {
        self.scope.name()
    }

    fn state(&self) -> ScopeState {
        self.scope.state()
    }

    fn fork_task(&self, task: ErasedTask) -> VtResult<Arc<dyn StructuredSubtask>> {
        let cell = self.scope.fork(task)?;
        Ok(cell)
    }

    fn join(&self) -> VtResult<()> {
        let mut outcome = self.outcome.lock();
        if matches!(*outcome, AnyOutcome::Pending) {
            *outcome = match self.scope.join()? {
                Joined::Success(cell) => AnyOutcome::Success(cell),
                Joined::Failed(cause) => AnyOutcome::Failed(cause),
                Joined::All => AnyOutcome::Failed(TaskFailure::NoResult),
            };
        }
        Ok(())
    }

    fn outcome(&self) -> Result<Arc<dyn StructuredSubtask>, TaskFailure> {
        self.join()?;
        match &*self.outcome.lock() {
            AnyOutcome::Success(cell) => Ok(cell.clone()),
            AnyOutcome::Failed(cause) => Err(cause.clone()),
            AnyOutcome::Pending => Err(TaskFailure::NoResult),
        }
    }

    fn close(&self) {
        self.scope.close();
    }
}

// ============================================================================
// Tests
// ============================================================================
