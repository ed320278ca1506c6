//! Virtual-thread runtime registry
//!
//! Picks the highest-priority supported `VirtualThreadRuntime` once and
//! falls back to platform threads when none is supported, so callers can
//! always obtain a factory or executor.

use std::sync::{Arc, OnceLock};

use vthread_core::error::VtResult;
use vthread_core::registry::ProviderRegistry;
use vthread_core::traits::{ExecutorService, ThreadFactory, VirtualThreadRuntime};
use vthread_runtime::{builtin_runtimes, PlatformRuntime};

/// Registry of virtual-thread runtimes with a platform-thread fallback
pub struct VirtualThreads {
    registry: ProviderRegistry<dyn VirtualThreadRuntime>,
    fallback: Arc<dyn VirtualThreadRuntime>,
}

impl VirtualThreads {
    pub const KIND: &'static str = "virtual thread runtime";

    /// Empty registry; every lookup resolves to the platform fallback
    pub fn new() -> Self {
        Self::with_runtimes(Vec::new())
    }

    /// Registry pre-populated with the runtimes shipped in `vthread-runtime`
    pub fn with_builtin() -> Self {
        Self::with_runtimes(builtin_runtimes())
    }

    /// Registry pre-populated with `runtimes`
    pub fn with_runtimes(runtimes: Vec<Arc<dyn VirtualThreadRuntime>>) -> Self {
        Self {
            registry: ProviderRegistry::with_providers(Self::KIND, runtimes),
            fallback: Arc::new(PlatformRuntime::new()),
        }
    }

    /// Process-wide registry built with [`VirtualThreads::with_builtin`]
    pub fn global() -> &'static VirtualThreads {
        static GLOBAL: OnceLock<VirtualThreads> = OnceLock::new();
        GLOBAL.get_or_init(Self::with_builtin)
    }

    /// Add a runtime; fails once a runtime has been selected
    pub fn register(&self, runtime: Arc<dyn VirtualThreadRuntime>) -> VtResult<()> {
        self.registry.register(runtime)
    }

    /// Supported runtimes, highest priority first (fallback excluded)
    pub fn runtimes(&self) -> &[Arc<dyn VirtualThreadRuntime>] {
        self.registry.providers()
    }

    /// The selected runtime, or the platform fallback
    pub fn runtime(&self) -> Arc<dyn VirtualThreadRuntime> {
        match self.registry.first() {
            Some(runtime) => runtime.clone(),
            None => {
                tracing::debug!(
                    fallback = self.fallback.runtime_name(),
                    "no virtual thread runtime supported; using fallback"
                );
                self.fallback.clone()
            }
        }
    }

    /// The runtime used when no registered runtime is supported
    pub fn fallback(&self) -> &Arc<dyn VirtualThreadRuntime> {
        &self.fallback
    }

    /// Thread factory from the selected runtime
    pub fn thread_factory(&self, prefix: &str) -> Arc<dyn ThreadFactory> {
        self.runtime().thread_factory(prefix)
    }

    /// Thread-per-task executor from the selected runtime
    pub fn executor_service(&self) -> Arc<dyn ExecutorService> {
        self.runtime().executor_service()
    }
}

impl std::fmt::Debug for VirtualThreads {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualThreads")
            .field("registry", &self.registry)
            .field("fallback", &self.fallback.runtime_name())
            .finish()
    }
}

impl Default for VirtualThreads {
    fn default() -> Self {
        Self::with_builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::mpsc;
    use std::time::Duration;
    use vthread_core::error::VtError;
    use vthread_core::traits::Provider;
    use vthread_runtime::{is_virtual, CarrierConfig, CarrierRuntime};

    /// Runtime that reports "not supported" and must never be used
    struct Unsupported;

    impl Provider for Unsupported {
        fn name(&self) -> &str {
            "unsupported"
        }

        fn priority(&self) -> i32 {
            1_000
        }

        fn is_supported(&self) -> VtResult<bool> {
            Ok(false)
        }
    }

    impl VirtualThreadRuntime for Unsupported {
        fn thread_factory(&self, _prefix: &str) -> Arc<dyn ThreadFactory> {
            unreachable!("unsupported runtime selected")
        }

        fn executor_service(&self) -> Arc<dyn ExecutorService> {
            unreachable!("unsupported runtime selected")
        }
    }

    /// Platform runtime under another name and priority
    struct Ranked(&'static str, i32);

    impl Provider for Ranked {
        fn name(&self) -> &str {
            self.0
        }

        fn priority(&self) -> i32 {
            self.1
        }

        fn is_supported(&self) -> VtResult<bool> {
            Ok(true)
        }
    }

    impl VirtualThreadRuntime for Ranked {
        fn thread_factory(&self, prefix: &str) -> Arc<dyn ThreadFactory> {
            PlatformRuntime::new().thread_factory(prefix)
        }

        fn executor_service(&self) -> Arc<dyn ExecutorService> {
            PlatformRuntime::new().executor_service()
        }
    }

    #[test]
    fn test_falls_back_when_nothing_supported() {
        let vt = VirtualThreads::new();
        vt.register(Arc::new(Unsupported)).unwrap();

        assert!(vt.runtimes().is_empty());
        assert_eq!(vt.runtime().runtime_name(), "platform-fallback");

        let exec = vt.executor_service();
        let handle = exec.submit(|| "ran").unwrap();
        assert_eq!(handle.get().unwrap(), "ran");
        exec.close();
    }

    #[test]
    fn test_selects_highest_priority() {
        let vt = VirtualThreads::new();
        vt.register(Arc::new(Ranked("low", 1))).unwrap();
        vt.register(Arc::new(Unsupported)).unwrap();
        vt.register(Arc::new(Ranked("high", 50))).unwrap();

        for _ in 0..3 {
            assert_eq!(vt.runtime().name(), "high");
        }
        let names: Vec<_> = vt.runtimes().iter().map(|r| r.name().to_string()).collect();
        assert_eq!(names, vec!["high", "low"]);

        assert!(matches!(
            vt.register(Arc::new(Ranked("late", 99))),
            Err(VtError::RegistryFrozen { .. })
        ));
    }

    #[test]
    fn test_builtin_prefers_carriers() {
        let vt = VirtualThreads::with_runtimes(vec![Arc::new(CarrierRuntime::new(
            CarrierConfig::new(),
        ))]);
        assert_eq!(vt.runtime().name(), "carrier-virtual-threads");

        let exec = vt.executor_service();
        assert!(exec.submit(is_virtual).unwrap().get().unwrap());
        exec.close();
    }

    #[test]
    fn test_thread_factory_names() {
        let factory = VirtualThreads::global().thread_factory("foo-");
        let (tx, rx) = mpsc::channel();
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let tx = tx.clone();
                factory
                    .spawn(Box::new(move || {
                        tx.send(vthread_runtime::current_thread_name()).unwrap();
                        std::thread::sleep(Duration::from_millis(10));
                    }))
                    .unwrap()
            })
            .collect();
        drop(tx);

        let names: HashSet<_> = rx.iter().map(|n| n.unwrap()).collect();
        assert_eq!(names.len(), 16);
        assert!(names.iter().all(|n| n.starts_with("foo-")));
        for h in handles {
            assert!(h.join_timeout(Duration::from_secs(2)));
        }
    }
}
