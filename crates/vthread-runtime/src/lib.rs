//! # vthread-runtime
//!
//! Concrete runtimes and scope providers for `vthread-core`.
//!
//! This crate provides:
//! - `CarrierRuntime` - virtual threads mounted on an elastic carrier pool
//! - `PlatformRuntime` - one OS thread per unit, the universal fallback
//! - `ThreadPerTaskExecutor` - executor shared by both runtimes
//! - `TaskScope` - native fork/join scope with all / any-success policies
//! - `ThreadScopeProvider` - structured task scope provider over `TaskScope`
//! - Host feature level detection and carrier configuration

pub mod config;
pub mod host;
pub mod tls;
pub mod carrier;
pub mod platform;
pub mod executor;
pub mod scope;
pub mod provider;

use std::sync::Arc;

use vthread_core::traits::{StructuredTaskScopeProvider, VirtualThreadRuntime};

// Re-exports
pub use config::CarrierConfig;
pub use carrier::{CarrierPool, CarrierRuntime, CarrierThreadFactory, PoolStats};
pub use platform::{PlatformRuntime, PlatformThreadFactory};
pub use executor::ThreadPerTaskExecutor;
pub use scope::{JoinPolicy, Joined, SubtaskCell, TaskScope};
pub use provider::ThreadScopeProvider;
pub use tls::{current_thread_name, is_virtual};

/// Virtual-thread runtimes shipped with this crate
///
/// The platform fallback is not listed; registries hold it separately.
pub fn builtin_runtimes() -> Vec<Arc<dyn VirtualThreadRuntime>> {
    vec![Arc::new(CarrierRuntime::from_env())]
}

/// Structured task scope providers shipped with this crate
pub fn builtin_scope_providers() -> Vec<Arc<dyn StructuredTaskScopeProvider>> {
    vec![Arc::new(ThreadScopeProvider::new())]
}
