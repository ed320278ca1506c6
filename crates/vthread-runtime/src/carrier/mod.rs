//! Carrier-backed virtual threads
//!
//! A virtual thread here is a named unit of work mounted on a pooled
//! carrier (an OS thread owned by `CarrierPool`). Creating one costs a
//! queue push and, at most, a carrier wakeup. The unit's name is visible
//! through `tls::current_thread_name()` while it runs.

mod pool;

pub use pool::{CarrierPool, PoolStats};

use std::sync::Arc;

use vthread_core::error::VtResult;
use vthread_core::latch::Latch;
use vthread_core::thread::{CompletionGuard, Task, ThreadHandle, ThreadNamer, DEFAULT_THREAD_PREFIX};
use vthread_core::traits::{ExecutorService, Provider, ThreadFactory, VirtualThreadRuntime};

use crate::config::CarrierConfig;
use crate::executor::ThreadPerTaskExecutor;
use crate::host::{self, LEVEL_CARRIERS};
use crate::tls;

/// Virtual-thread runtime over an elastic carrier pool
#[derive(Debug)]
pub struct CarrierRuntime {
    pool: CarrierPool,
}

impl CarrierRuntime {
    pub const NAME: &'static str = "carrier-virtual-threads";

    /// Ranks above the platform fallback
    pub const PRIORITY: i32 = 21;

    /// Runtime over a pool with the given config; no carrier starts yet
    pub fn new(config: CarrierConfig) -> Self {
        Self {
            pool: CarrierPool::new(config),
        }
    }

    /// Runtime configured from `VT_CARRIER_*` environment variables
    pub fn from_env() -> Self {
        Self::new(CarrierConfig::from_env())
    }

    pub fn pool(&self) -> &CarrierPool {
        &self.pool
    }
}

impl Default for CarrierRuntime {
    fn default() -> Self {
        Self::from_env()
    }
}

impl Provider for CarrierRuntime {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        Self::PRIORITY
    }

    fn is_supported(&self) -> VtResult<bool> {
        self.pool.config().validate()?;
        Ok(host::feature_level() >= LEVEL_CARRIERS)
    }
}

impl VirtualThreadRuntime for CarrierRuntime {
    fn thread_factory(&self, prefix: &str) -> Arc<dyn ThreadFactory> {
        Arc::new(CarrierThreadFactory::new(self.pool.clone(), prefix))
    }

    fn executor_service(&self) -> Arc<dyn ExecutorService> {
        Arc::new(ThreadPerTaskExecutor::new(
            self.thread_factory(DEFAULT_THREAD_PREFIX),
        ))
    }
}

/// Mounts each unit on a carrier under a fresh virtual name
#[derive(Debug)]
pub struct CarrierThreadFactory {
    pool: CarrierPool,
    namer: ThreadNamer,
}

impl CarrierThreadFactory {
    pub fn new(pool: CarrierPool, prefix: &str) -> Self {
        Self {
            pool,
            namer: ThreadNamer::new(prefix),
        }
    }
}

impl ThreadFactory for CarrierThreadFactory {
    fn prefix(&self) -> &str {
        self.namer.prefix()
    }

    fn spawn(&self, task: Task) -> VtResult<ThreadHandle> {
        let name = self.namer.next_name();
        let done = Arc::new(Latch::new());
        let guard = CompletionGuard::new(done.clone());
        let vname = name.clone();

        self.pool.submit(Box::new(move || {
            let _mounted = tls::mount(&vname);
            let _guard = guard;
            task();
        }))?;

        Ok(ThreadHandle::new(name, done))
    }
}
