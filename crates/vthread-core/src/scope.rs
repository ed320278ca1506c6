//! Typed structured task scopes
//!
//! Providers hand out type-erased scope objects (`dyn StructuredTaskScopeAll`,
//! `dyn StructuredTaskScopeAny`). This module wraps them in typed handles
//! and provides the scoped entry points `with_all` / `with_any`, which
//! guarantee the scope is closed on every exit path: normal return, an
//! `Err` from the block, or a panic unwinding through it.
//!
//! ```ignore
//! let total = provider.with_all(Some("sum"), factory, |scope| {
//!     let a = scope.fork(|_| Ok::<_, VtError>(1))?;
//!     let b = scope.fork(|_| Ok::<_, VtError>(2))?;
//!     scope.join()?.throw_if_failed()?;
//!     Ok::<_, VtError>(a.get()? + b.get()?)
//! })?;
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use crate::cancel::CancellationToken;
use crate::error::{BoxError, ScopeState, TaskFailure, VtError, VtResult};
use crate::traits::{
    ErasedTask, ErasedValue, StructuredSubtask, StructuredTaskScopeAll, StructuredTaskScopeAny,
    StructuredTaskScopeProvider, SubtaskState, ThreadFactory,
};

fn erase<T, E, F>(task: F) -> ErasedTask
where
    F: FnOnce(&CancellationToken) -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<BoxError>,
{
    Box::new(move |token: &CancellationToken| {
        task(token)
            .map(|value| Box::new(value) as ErasedValue)
            .map_err(TaskFailure::failed)
    })
}

fn downcast<T: 'static>(value: ErasedValue) -> VtResult<T> {
    value
        .downcast::<T>()
        .map(|boxed| *boxed)
        .map_err(|_| VtError::TypeMismatch)
}

fn take_value<T: 'static>(subtask: &dyn StructuredSubtask) -> VtResult<T> {
    downcast(subtask.take()?)
}

/// Copy the value out, leaving it readable by the scope and other handles
fn clone_value<T: Clone + 'static>(subtask: &dyn StructuredSubtask) -> VtResult<T> {
    let mut out = None;
    subtask.inspect(&mut |value: &ErasedValue| out = value.downcast_ref::<T>().cloned())?;
    out.ok_or(VtError::TypeMismatch)
}

/// Handle to one forked unit of work
///
/// Borrows the scope it was forked from, so it cannot outlive the scope.
pub struct Subtask<'scope, T> {
    inner: Arc<dyn StructuredSubtask>,
    read: fn(&dyn StructuredSubtask) -> VtResult<T>,
    _scope: PhantomData<&'scope ()>,
}

impl<'scope, T: 'static> Subtask<'scope, T> {
    fn new(inner: Arc<dyn StructuredSubtask>, read: fn(&dyn StructuredSubtask) -> VtResult<T>) -> Self {
        Self {
            inner,
            read,
            _scope: PhantomData,
        }
    }

    #[inline]
    pub fn state(&self) -> SubtaskState {
        self.inner.state()
    }

    /// Failure cause, once the unit failed or was cancelled
    pub fn failure(&self) -> Option<TaskFailure> {
        self.inner.failure()
    }

    /// Block until the unit finishes and return its value
    ///
    /// A failed unit surfaces as `VtError::Execution(cause)`.
    pub fn get(self) -> VtResult<T> {
        (self.read)(&*self.inner)
    }
}

impl<T> std::fmt::Debug for Subtask<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subtask")
            .field("state", &self.inner.state())
            .finish()
    }
}

/// Scope that waits for all forked subtasks
pub struct AllScope {
    inner: Box<dyn StructuredTaskScopeAll>,
}

impl AllScope {
    pub fn new(inner: Box<dyn StructuredTaskScopeAll>) -> Self {
        Self { inner }
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.name()
    }

    pub fn state(&self) -> ScopeState {
        self.inner.state()
    }

    /// Start `task` in the scope; returns immediately
    pub fn fork<T, E, F>(&self, task: F) -> VtResult<Subtask<'_, T>>
    where
        F: FnOnce(&CancellationToken) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Into<BoxError>,
    {
        let inner = self.inner.fork_task(erase(task))?;
        Ok(Subtask::new(inner, take_value::<T>))
    }

    /// Block until every forked subtask has finished
    pub fn join(&self) -> VtResult<&Self> {
        self.inner.join()?;
        Ok(self)
    }

    /// Raise the first failure in fork order, wrapped as `Execution`
    ///
    /// Later failures are not reported.
    pub fn throw_if_failed(&self) -> VtResult<&Self> {
        self.throw_if_failed_with(|_| {})
    }

    /// Like `throw_if_failed`, handing the failure to `handler` first
    pub fn throw_if_failed_with<H>(&self, handler: H) -> VtResult<&Self>
    where
        H: FnOnce(&TaskFailure),
    {
        match self.inner.first_failure() {
            Some(failure) => {
                handler(&failure);
                Err(VtError::Execution(failure))
            }
            None => Ok(self),
        }
    }

    /// Cancel outstanding subtasks and wait for them; idempotent
    pub fn close(&self) {
        self.inner.close();
    }
}

impl Drop for AllScope {
    fn drop(&mut self) {
        self.inner.close();
    }
}

/// Scope that completes with the first successful subtask
///
/// The winning value is shared by `result` and the winner's `Subtask::get`,
/// so each of them hands out a clone.
pub struct AnyScope<T> {
    inner: Box<dyn StructuredTaskScopeAny>,
    _value: PhantomData<fn() -> T>,
}

impl<T: Clone + Send + 'static> AnyScope<T> {
    pub fn new(inner: Box<dyn StructuredTaskScopeAny>) -> Self {
        Self {
            inner,
            _value: PhantomData,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.name()
    }

    pub fn state(&self) -> ScopeState {
        self.inner.state()
    }

    /// Register a candidate producer of the result
    pub fn fork<E, F>(&self, task: F) -> VtResult<Subtask<'_, T>>
    where
        F: FnOnce(&CancellationToken) -> Result<T, E> + Send + 'static,
        E: Into<BoxError>,
    {
        let inner = self.inner.fork_task(erase(task))?;
        Ok(Subtask::new(inner, clone_value::<T>))
    }

    /// Block until one subtask succeeds (the rest are cancelled) or all fail
    pub fn join(&self) -> VtResult<&Self> {
        self.inner.join()?;
        Ok(self)
    }

    /// The first successful value, joining first if needed
    ///
    /// On failure `mapper` turns the aggregate cause into the caller's
    /// error type. Repeated calls return the same answer.
    pub fn result<E, M>(&self, mapper: M) -> Result<T, E>
    where
        M: FnOnce(TaskFailure) -> E,
    {
        match self.inner.outcome() {
            Ok(winner) => clone_value(&*winner).map_err(|e| mapper(TaskFailure::failed(e))),
            Err(cause) => Err(mapper(cause)),
        }
    }

    pub fn close(&self) {
        self.inner.close();
    }
}

impl<T> Drop for AnyScope<T> {
    fn drop(&mut self) {
        self.inner.close();
    }
}

impl dyn StructuredTaskScopeProvider {
    /// Run `block` in an "await all" scope, closing it on every exit path
    pub fn with_all<R, E, F>(
        &self,
        name: Option<&str>,
        factory: Arc<dyn ThreadFactory>,
        block: F,
    ) -> Result<R, E>
    where
        F: FnOnce(&AllScope) -> Result<R, E>,
        E: From<VtError>,
    {
        tracing::debug!(provider = self.name(), scope = ?name, "opening await-all scope");
        let scope = AllScope::new(self.open_all(name, factory)?);
        let out = block(&scope);
        drop(scope);
        out
    }

    /// Run `block` in a "first success" scope, closing it on every exit path
    pub fn with_any<T, R, E, F>(
        &self,
        name: Option<&str>,
        factory: Arc<dyn ThreadFactory>,
        block: F,
    ) -> Result<R, E>
    where
        T: Clone + Send + 'static,
        F: FnOnce(&AnyScope<T>) -> Result<R, E>,
        E: From<VtError>,
    {
        tracing::debug!(provider = self.name(), scope = ?name, "opening any-success scope");
        let scope = AnyScope::new(self.open_any(name, factory)?);
        let out = block(&scope);
        drop(scope);
        out
    }
}

// ============================================================================
// Tests
// ============================================================================
