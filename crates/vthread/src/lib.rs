//! # vthread - Virtual Threads and Structured Task Scopes
//!
//! Picks the best available way to run lightweight threads and structured
//! fork/join scopes on the current host, through two registries:
//!
//! - [`VirtualThreads`] selects a `VirtualThreadRuntime` and falls back to
//!   plain platform threads when none is supported.
//! - [`StructuredTaskScopes`] selects a `StructuredTaskScopeProvider` and
//!   reports a configuration error when none is supported.
//!
//! Both probe their providers once, on first use, and keep the
//! highest-priority supported one.
//!
//! ## Quick Start
//!
//! ```ignore
//! use vthread::{thread_factory, all, VtError};
//!
//! fn main() -> Result<(), VtError> {
//!     vthread::logging::init();
//!
//!     let total = all(Some("sum"), thread_factory("worker-"), |scope| {
//!         let a = scope.fork(|_| Ok::<_, VtError>(20))?;
//!         let b = scope.fork(|_| Ok::<_, VtError>(22))?;
//!         scope.join()?.throw_if_failed()?;
//!         Ok::<_, VtError>(a.get()? + b.get()?)
//!     })?;
//!     assert_eq!(total, 42);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      User Code                              │
//! │     thread_factory(), executor_service(), all(), any()      │
//! └─────────────────────────────────────────────────────────────┘
//!                 │                               │
//!                 ▼                               ▼
//!   ┌──────────────────────────┐    ┌──────────────────────────┐
//!   │     VirtualThreads       │    │   StructuredTaskScopes   │
//!   │ priority pick + fallback │    │ priority pick, no fallbk │
//!   └──────────────────────────┘    └──────────────────────────┘
//!          │            │                         │
//!          ▼            ▼                         ▼
//!   ┌────────────┐ ┌──────────┐       ┌──────────────────────┐
//!   │  Carrier   │ │ Platform │       │ ThreadScopeProvider  │
//!   │  Runtime   │ │ Runtime  │       │  over TaskScope      │
//!   └────────────┘ └──────────┘       └──────────────────────┘
//! ```

mod scopes;
mod virtual_threads;

use std::sync::Arc;

pub use scopes::StructuredTaskScopes;
pub use virtual_threads::VirtualThreads;

// Re-export core types
pub use vthread_core::{
    AllScope,
    AnyScope,
    BoxError,
    CancellationToken,
    ExecutorService,
    Provider,
    ScopeState,
    StructuredTaskScopeProvider,
    Subtask,
    SubtaskState,
    TaskFailure,
    TaskHandle,
    ThreadFactory,
    ThreadHandle,
    VirtualThreadRuntime,
    VtError,
    VtResult,
    DEFAULT_THREAD_PREFIX,
};

// Re-export logging and env utilities
pub use vthread_core::logging;
pub use vthread_core::{env_get, env_get_bool, env_get_opt};

// Re-export runtime types
pub use vthread_runtime::{
    current_thread_name,
    is_virtual,
    CarrierConfig,
    CarrierRuntime,
    PlatformRuntime,
    ThreadScopeProvider,
};

/// Thread factory from the process-wide runtime selection
pub fn thread_factory(prefix: &str) -> Arc<dyn ThreadFactory> {
    VirtualThreads::global().thread_factory(prefix)
}

/// Thread-per-task executor from the process-wide runtime selection
pub fn executor_service() -> Arc<dyn ExecutorService> {
    VirtualThreads::global().executor_service()
}

/// The process-wide selected runtime (or the platform fallback)
pub fn runtime() -> Arc<dyn VirtualThreadRuntime> {
    VirtualThreads::global().runtime()
}

/// Run `block` in an "await all" scope from the process-wide provider
pub fn all<R, E, F>(name: Option<&str>, factory: Arc<dyn ThreadFactory>, block: F) -> Result<R, E>
where
    F: FnOnce(&AllScope) -> Result<R, E>,
    E: From<VtError>,
{
    StructuredTaskScopes::global().all(name, factory, block)
}

/// Run `block` in a "first success" scope from the process-wide provider
pub fn any<T, R, E, F>(name: Option<&str>, factory: Arc<dyn ThreadFactory>, block: F) -> Result<R, E>
where
    T: Clone + Send + 'static,
    F: FnOnce(&AnyScope<T>) -> Result<R, E>,
    E: From<VtError>,
{
    StructuredTaskScopes::global().any(name, factory, block)
}

// ============================================================================
// Tests
// ============================================================================
