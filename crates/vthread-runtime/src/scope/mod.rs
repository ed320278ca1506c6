//! Native fork/join task scope
//!
//! A `TaskScope` starts each forked unit on a thread from the supplied
//! `ThreadFactory` and keeps a join barrier (mutex + condvar) counting
//! forked and finished units. The join policy decides when `join` returns:
//!
//! - `AwaitAll` - once every forked unit is terminal
//! - `AnySuccess` - once one unit succeeds (the others are cancelled), or
//!   every unit has finished without success
//!
//! Cancellation is cooperative. The scope owns a `CancellationToken`; each
//! unit receives a child of it. `close()` cancels the token and waits for
//! every unit to return, so no unit outlives its scope.
//!
//! A scope opened from inside a running unit derives its token from that
//! unit's token, so cancelling an outer scope reaches nested ones too.

mod subtask;

pub use subtask::SubtaskCell;

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use vthread_core::cancel::CancellationToken;
use vthread_core::error::{ScopeState, TaskFailure, VtError, VtResult};
use vthread_core::traits::{ErasedTask, ErasedValue, ThreadFactory};

thread_local! {
    /// Token of the unit running on this thread, if any
    static CURRENT_UNIT: RefCell<Option<CancellationToken>> = const { RefCell::new(None) };
}

/// Restores the previous unit token when dropped
struct UnitGuard {
    previous: Option<CancellationToken>,
}

fn enter_unit(token: &CancellationToken) -> UnitGuard {
    let previous = CURRENT_UNIT.with(|cell| cell.borrow_mut().replace(token.clone()));
    UnitGuard { previous }
}

impl Drop for UnitGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_UNIT.with(|cell| *cell.borrow_mut() = previous);
    }
}

fn scope_token() -> CancellationToken {
    CURRENT_UNIT
        .with(|cell| cell.borrow().as_ref().map(CancellationToken::child))
        .unwrap_or_default()
}

/// When `join` returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinPolicy {
    AwaitAll,
    AnySuccess,
}

/// Outcome of `TaskScope::join`
pub enum Joined {
    /// `AwaitAll`: every unit is terminal
    All,
    /// `AnySuccess`: the winning unit, value still in place
    Success(Arc<SubtaskCell>),
    /// `AnySuccess`: no unit succeeded
    Failed(TaskFailure),
}

impl std::fmt::Debug for Joined {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Joined::All => f.write_str("All"),
            Joined::Success(cell) => f.debug_tuple("Success").field(cell).finish(),
            Joined::Failed(cause) => f.debug_tuple("Failed").field(cause).finish(),
        }
    }
}

struct ScopeShared {
    policy: JoinPolicy,
    token: CancellationToken,
    core: Mutex<ScopeCore>,
    changed: Condvar,
}

struct ScopeCore {
    lifecycle: ScopeState,
    forked: usize,
    finished: usize,
    /// First unit to succeed under `AnySuccess`
    winner: Option<Arc<SubtaskCell>>,
    /// First non-cancellation failure, in completion order
    first_failure: Option<TaskFailure>,
}

impl ScopeCore {
    fn settled(&self, policy: JoinPolicy) -> bool {
        match policy {
            JoinPolicy::AwaitAll => self.finished == self.forked,
            JoinPolicy::AnySuccess => self.winner.is_some() || self.finished == self.forked,
        }
    }
}

impl ScopeShared {
    fn finish(&self, cell: &Arc<SubtaskCell>, outcome: Result<ErasedValue, TaskFailure>) {
        let mut core = self.core.lock();
        match &outcome {
            Ok(_) if self.policy == JoinPolicy::AnySuccess && core.winner.is_none() => {
                core.winner = Some(cell.clone());
                self.token.cancel();
            }
            Err(failure) if core.first_failure.is_none() && !failure.is_cancelled() => {
                core.first_failure = Some(failure.clone());
            }
            _ => {}
        }
        cell.complete(outcome);
        core.finished += 1;
        self.changed.notify_all();
    }
}

/// Fork/join scope over a thread factory
pub struct TaskScope {
    name: Option<String>,
    factory: Arc<dyn ThreadFactory>,
    shared: Arc<ScopeShared>,
}

impl TaskScope {
    /// Open a scope; blank names are treated as no name
    pub fn new(policy: JoinPolicy, name: Option<&str>, factory: Arc<dyn ThreadFactory>) -> Self {
        let name = name.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string);
        Self {
            name,
            factory,
            shared: Arc::new(ScopeShared {
                policy,
                token: scope_token(),
                core: Mutex::new(ScopeCore {
                    lifecycle: ScopeState::Open,
                    forked: 0,
                    finished: 0,
                    winner: None,
                    first_failure: None,
                }),
                changed: Condvar::new(),
            }),
        }
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn policy(&self) -> JoinPolicy {
        self.shared.policy
    }

    pub fn state(&self) -> ScopeState {
        self.shared.core.lock().lifecycle
    }

    /// Scope-wide token; every unit gets a child of it
    pub fn token(&self) -> &CancellationToken {
        &self.shared.token
    }

    /// Start `task` on a new thread from the factory
    pub fn fork(&self, task: ErasedTask) -> VtResult<Arc<SubtaskCell>> {
        {
            let mut core = self.shared.core.lock();
            if core.lifecycle != ScopeState::Open {
                return Err(VtError::InvalidState {
                    op: "fork",
                    state: core.lifecycle,
                });
            }
            core.forked += 1;
        }

        let cell = Arc::new(SubtaskCell::new());
        let unit_cell = cell.clone();
        let shared = self.shared.clone();
        let unit_token = self.shared.token.child();

        let spawned = self.factory.spawn(Box::new(move || {
            let outcome = run_unit(task, &unit_token);
            shared.finish(&unit_cell, outcome);
        }));

        if let Err(e) = spawned {
            let mut core = self.shared.core.lock();
            core.forked -= 1;
            self.shared.changed.notify_all();
            return Err(e);
        }

        tracing::trace!(scope = ?self.name, "forked subtask");
        Ok(cell)
    }

    /// Wait according to the join policy; only valid once, while open
    pub fn join(&self) -> VtResult<Joined> {
        let policy = self.shared.policy;
        let (winner, first_failure, forked) = {
            let mut core = self.shared.core.lock();
            if core.lifecycle != ScopeState::Open {
                return Err(VtError::InvalidState {
                    op: "join",
                    state: core.lifecycle,
                });
            }
            self.shared
                .changed
                .wait_while(&mut core, |c| !c.settled(policy));
            core.lifecycle = ScopeState::Joined;
            (core.winner.take(), core.first_failure.clone(), core.forked)
        };

        Ok(match policy {
            JoinPolicy::AwaitAll => Joined::All,
            JoinPolicy::AnySuccess => match winner {
                Some(cell) => Joined::Success(cell),
                None => Joined::Failed(first_failure.unwrap_or(if forked == 0 {
                    TaskFailure::NoResult
                } else {
                    TaskFailure::Cancelled
                })),
            },
        })
    }

    /// Cancel every unit and wait for all of them to return; idempotent
    pub fn close(&self) {
        let mut core = self.shared.core.lock();
        if core.lifecycle == ScopeState::Closed {
            return;
        }
        core.lifecycle = ScopeState::Closed;
        self.shared.token.cancel();
        self.shared
            .changed
            .wait_while(&mut core, |c| c.finished < c.forked);
        tracing::trace!(scope = ?self.name, units = core.forked, "scope closed");
    }
}

impl Drop for TaskScope {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for TaskScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.shared.core.lock();
        f.debug_struct("TaskScope")
            .field("name", &self.name)
            .field("policy", &self.shared.policy)
            .field("state", &core.lifecycle)
            .field("forked", &core.forked)
            .field("finished", &core.finished)
            .finish()
    }
}

/// Run one unit body, mapping panics and post-cancellation errors
fn run_unit(task: ErasedTask, token: &CancellationToken) -> Result<ErasedValue, TaskFailure> {
    if token.is_cancelled() {
        return Err(TaskFailure::Cancelled);
    }
    let _unit = enter_unit(token);
    match panic::catch_unwind(AssertUnwindSafe(|| task(token))) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(_)) if token.is_cancelled() => Err(TaskFailure::Cancelled),
        Ok(Err(failure)) => Err(failure),
        Err(payload) => Err(TaskFailure::from_panic(payload)),
    }
}

// ============================================================================
// Tests
// ============================================================================
