//! # vthread-core
//!
//! Core contracts for virtual-thread runtimes and structured task scopes.
//!
//! This crate is platform-agnostic and spawns no threads of its own.
//! Concrete runtimes and scope providers live in `vthread-runtime`.
//!
//! ## Modules
//!
//! - `traits` - Provider, runtime, executor and scope traits
//! - `scope` - Typed scope wrappers and the scoped `with_all` / `with_any`
//! - `registry` - Lazily resolved, priority-sorted provider registry
//! - `thread` - Thread handles, naming, task type
//! - `latch` - Blocking one-shot gate and value slot
//! - `cancel` - Cancellation token for cooperative cancellation
//! - `error` - Error types
//! - `logging` - `tracing` subscriber setup
//! - `env` - Environment variable utilities

pub mod traits;
pub mod scope;
pub mod registry;
pub mod thread;
pub mod latch;
pub mod cancel;
pub mod error;
pub mod logging;
pub mod env;

// Re-exports for convenience
pub use traits::{
    ErasedTask, ErasedValue, ExecutorService, Provider, StructuredSubtask, StructuredTaskScopeAll,
    StructuredTaskScopeAny, StructuredTaskScopeProvider, SubtaskState, TaskHandle, ThreadFactory,
    VirtualThreadRuntime,
};
pub use scope::{AllScope, AnyScope, Subtask};
pub use registry::ProviderRegistry;
pub use thread::{CompletionGuard, Task, ThreadHandle, ThreadNamer, DEFAULT_THREAD_PREFIX};
pub use latch::{Latch, Promise};
pub use cancel::CancellationToken;
pub use error::{BoxError, ScopeState, TaskFailure, VtError, VtResult};
pub use env::{env_get, env_get_bool, env_get_opt};
