//! Structured task scope providers built on the native `TaskScope`

mod thread_scope;

pub use thread_scope::ThreadScopeProvider;
