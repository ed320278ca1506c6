//! Error types for virtual-thread runtimes and structured task scopes

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Boxed error accepted from user tasks
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Result type for runtime and scope operations
pub type VtResult<T> = Result<T, VtError>;

/// Lifecycle of a structured task scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    /// Accepting forks
    Open,
    /// `join()` has returned
    Joined,
    /// Released; forked units were cancelled and awaited
    Closed,
}

impl fmt::Display for ScopeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeState::Open => write!(f, "open"),
            ScopeState::Joined => write!(f, "joined"),
            ScopeState::Closed => write!(f, "closed"),
        }
    }
}

/// Errors raised by registries, executors and scopes
#[derive(Debug, Clone, Error)]
pub enum VtError {
    /// No supported provider was registered (configuration error)
    #[error("no supported {kind} provider is registered")]
    NoProvider {
        kind: &'static str,
    },

    /// Registration attempted after the provider list was resolved
    #[error("{kind} registry is already resolved; register providers before first use")]
    RegistryFrozen {
        kind: &'static str,
    },

    /// A forked unit of work failed
    #[error("subtask failed: {0}")]
    Execution(#[source] TaskFailure),

    /// Operation not valid in the scope's current state
    #[error("cannot {op} a scope that is {state}")]
    InvalidState {
        op: &'static str,
        state: ScopeState,
    },

    /// A subtask result was already consumed
    #[error("subtask result was already taken")]
    ResultTaken,

    /// A type-erased subtask value did not downcast to the forked type
    #[error("subtask value has an unexpected type")]
    TypeMismatch,

    /// Spawning a thread or carrier failed
    #[error("failed to spawn thread: {0}")]
    Spawn(String),

    /// Executor no longer accepts tasks
    #[error("executor has been shut down")]
    ExecutorShutdown,

    /// Operation was cancelled via CancellationToken
    #[error("operation cancelled")]
    Cancelled,

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    Config(&'static str),
}

/// Terminal failure of one forked unit of work
///
/// Cloneable so that a subtask's outcome can be inspected by the scope
/// (`throw_if_failed`) and by the subtask handle independently.
#[derive(Debug, Clone, Error)]
pub enum TaskFailure {
    /// The task returned an error
    #[error("{0}")]
    Failed(Arc<dyn StdError + Send + Sync + 'static>),

    /// The task panicked
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The task was cancelled before producing a result
    #[error("task cancelled")]
    Cancelled,

    /// No subtask was forked, so there is no result to return
    #[error("no subtask produced a result")]
    NoResult,
}

impl TaskFailure {
    /// Wrap an arbitrary task error
    pub fn failed<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        let boxed: BoxError = err.into();
        TaskFailure::Failed(Arc::from(boxed))
    }

    /// Convert a panic payload caught with `catch_unwind`
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let msg = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        TaskFailure::Panicked(msg)
    }

    /// Borrow the wrapped task error, if this is a `Failed` outcome
    pub fn error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            TaskFailure::Failed(e) => Some(e.as_ref()),
            _ => None,
        }
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskFailure::Cancelled)
    }
}

impl From<VtError> for TaskFailure {
    fn from(e: VtError) -> Self {
        match e {
            VtError::Cancelled => TaskFailure::Cancelled,
            VtError::Execution(cause) => cause,
            other => TaskFailure::failed(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("disk on fire")]
    struct DiskError;

    #[test]
    fn test_error_display() {
        let e = VtError::NoProvider { kind: "structured task scope" };
        assert_eq!(e.to_string(), "no supported structured task scope provider is registered");

        let e = VtError::InvalidState { op: "fork", state: ScopeState::Joined };
        assert_eq!(e.to_string(), "cannot fork a scope that is joined");

        let e = VtError::Execution(TaskFailure::failed(DiskError));
        assert_eq!(e.to_string(), "subtask failed: disk on fire");
    }

    #[test]
    fn test_execution_source_is_failure() {
        let e = VtError::Execution(TaskFailure::Panicked("boom".into()));
        let source = e.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("task panicked: boom"));
    }

    #[test]
    fn test_failure_downcast() {
        let failure = TaskFailure::failed(DiskError);
        let inner = failure.error().expect("failed variant");
        assert!(inner.downcast_ref::<DiskError>().is_some());
        assert!(TaskFailure::Cancelled.error().is_none());
    }

    #[test]
    fn test_from_panic_payloads() {
        let f = TaskFailure::from_panic(Box::new("static"));
        assert!(matches!(f, TaskFailure::Panicked(ref m) if m == "static"));

        let f = TaskFailure::from_panic(Box::new(String::from("owned")));
        assert!(matches!(f, TaskFailure::Panicked(ref m) if m == "owned"));

        let f = TaskFailure::from_panic(Box::new(42u32));
        assert!(matches!(f, TaskFailure::Panicked(ref m) if m == "non-string panic payload"));
    }

    #[test]
    fn test_failure_from_vt_error() {
        assert!(TaskFailure::from(VtError::Cancelled).is_cancelled());
        let f: TaskFailure = VtError::Execution(TaskFailure::NoResult).into();
        assert!(matches!(f, TaskFailure::NoResult));
        let f: TaskFailure = VtError::ExecutorShutdown.into();
        assert_eq!(f.to_string(), "executor has been shut down");
    }
}
