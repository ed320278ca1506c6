//! Platform-thread runtime
//!
//! One named OS thread per unit. Used as the fallback when no virtual-thread
//! runtime is supported, so it must work on any host that has threads.

use std::sync::Arc;
use std::thread;

use vthread_core::error::{VtError, VtResult};
use vthread_core::latch::Latch;
use vthread_core::thread::{CompletionGuard, Task, ThreadHandle, ThreadNamer, DEFAULT_THREAD_PREFIX};
use vthread_core::traits::{ExecutorService, Provider, ThreadFactory, VirtualThreadRuntime};

use crate::executor::ThreadPerTaskExecutor;

/// Runtime that hands out platform-thread factories
#[derive(Debug, Default, Clone, Copy)]
pub struct PlatformRuntime;

impl PlatformRuntime {
    pub const NAME: &'static str = "platform-fallback";

    pub fn new() -> Self {
        Self
    }
}

impl Provider for PlatformRuntime {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        i32::MIN
    }

    fn is_supported(&self) -> VtResult<bool> {
        Ok(true)
    }
}

impl VirtualThreadRuntime for PlatformRuntime {
    fn thread_factory(&self, prefix: &str) -> Arc<dyn ThreadFactory> {
        Arc::new(PlatformThreadFactory::new(prefix))
    }

    fn executor_service(&self) -> Arc<dyn ExecutorService> {
        Arc::new(ThreadPerTaskExecutor::new(
            self.thread_factory(DEFAULT_THREAD_PREFIX),
        ))
    }
}

/// Starts each unit on its own named OS thread
#[derive(Debug)]
pub struct PlatformThreadFactory {
    namer: ThreadNamer,
}

impl PlatformThreadFactory {
    pub fn new(prefix: &str) -> Self {
        Self {
            namer: ThreadNamer::new(prefix),
        }
    }
}

impl ThreadFactory for PlatformThreadFactory {
    fn prefix(&self) -> &str {
        self.namer.prefix()
    }

    fn spawn(&self, task: Task) -> VtResult<ThreadHandle> {
        let name = self.namer.next_name();
        let done = Arc::new(Latch::new());
        let guard = CompletionGuard::new(done.clone());

        thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let _guard = guard;
                task();
            })
            .map_err(|e| VtError::Spawn(e.to_string()))?;

        Ok(ThreadHandle::new(name, done))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_provider_identity() {
        let rt = PlatformRuntime::new();
        assert_eq!(rt.name(), "platform-fallback");
        assert_eq!(rt.runtime_name(), "platform-fallback");
        assert_eq!(rt.priority(), i32::MIN);
        assert!(rt.is_supported().unwrap());
    }

    #[test]
    fn test_threads_are_named_with_prefix() {
        let factory = PlatformRuntime::new().thread_factory("foo-");
        assert_eq!(factory.prefix(), "foo-");

        let (tx, rx) = mpsc::channel();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tx = tx.clone();
                factory
                    .spawn(Box::new(move || {
                        tx.send(thread::current().name().map(str::to_string)).unwrap();
                    }))
                    .unwrap()
            })
            .collect();
        drop(tx);

        let seen: HashSet<String> = rx.iter().map(|n| n.unwrap()).collect();
        assert_eq!(seen.len(), 8);
        assert!(seen.iter().all(|n| n.starts_with("foo-")));
        for handle in &handles {
            assert!(handle.join_timeout(Duration::from_secs(2)));
            assert!(seen.contains(handle.name()));
        }
    }

    #[test]
    fn test_handle_completes_after_panic() {
        let factory = PlatformThreadFactory::new("panicky-");
        let handle = factory.spawn(Box::new(|| panic!("unit failed"))).unwrap();
        assert!(handle.join_timeout(Duration::from_secs(2)));
        assert!(handle.is_finished());
    }
}
