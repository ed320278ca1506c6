//! Structured task scope provider registry
//!
//! Unlike `VirtualThreads` there is no fallback: a scope without a real
//! provider would silently lose structured semantics, so an empty
//! selection is a configuration error (`VtError::NoProvider`).

use std::sync::{Arc, OnceLock};

use vthread_core::error::{VtError, VtResult};
use vthread_core::registry::ProviderRegistry;
use vthread_core::scope::{AllScope, AnyScope};
use vthread_core::traits::{StructuredTaskScopeProvider, ThreadFactory};
use vthread_runtime::builtin_scope_providers;

/// Registry of structured task scope providers
#[derive(Debug)]
pub struct StructuredTaskScopes {
    registry: ProviderRegistry<dyn StructuredTaskScopeProvider>,
}

impl StructuredTaskScopes {
    pub const KIND: &'static str = "structured task scope";

    /// Empty registry; `provider()` fails until something is registered
    pub fn new() -> Self {
        Self::with_providers(Vec::new())
    }

    /// Registry pre-populated with the providers shipped in `vthread-runtime`
    pub fn with_builtin() -> Self {
        Self::with_providers(builtin_scope_providers())
    }

    pub fn with_providers(providers: Vec<Arc<dyn StructuredTaskScopeProvider>>) -> Self {
        Self {
            registry: ProviderRegistry::with_providers(Self::KIND, providers),
        }
    }

    /// Process-wide registry built with [`StructuredTaskScopes::with_builtin`]
    pub fn global() -> &'static StructuredTaskScopes {
        static GLOBAL: OnceLock<StructuredTaskScopes> = OnceLock::new();
        GLOBAL.get_or_init(Self::with_builtin)
    }

    /// Add a provider; fails once a provider has been selected
    pub fn register(&self, provider: Arc<dyn StructuredTaskScopeProvider>) -> VtResult<()> {
        self.registry.register(provider)
    }

    /// Supported providers, highest priority first
    pub fn providers(&self) -> &[Arc<dyn StructuredTaskScopeProvider>] {
        self.registry.providers()
    }

    /// The selected provider
    pub fn provider(&self) -> VtResult<Arc<dyn StructuredTaskScopeProvider>> {
        self.registry
            .first()
            .cloned()
            .ok_or(VtError::NoProvider { kind: Self::KIND })
    }

    /// Run `block` in an "await all" scope from the selected provider
    pub fn all<R, E, F>(
        &self,
        name: Option<&str>,
        factory: Arc<dyn ThreadFactory>,
        block: F,
    ) -> Result<R, E>
    where
        F: FnOnce(&AllScope) -> Result<R, E>,
        E: From<VtError>,
    {
        self.provider()?.with_all(name, factory, block)
    }

    /// Run `block` in a "first success" scope from the selected provider
    pub fn any<T, R, E, F>(
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
        self.provider()?.with_any(name, factory, block)
    }
}

impl Default for StructuredTaskScopes {
    fn default() -> Self {
        Self::with_builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vthread_core::error::TaskFailure;
    use vthread_core::traits::{
        Provider, StructuredTaskScopeAll, StructuredTaskScopeAny, VirtualThreadRuntime,
    };
    use vthread_runtime::{PlatformRuntime, ThreadScopeProvider};

    #[derive(Debug, thiserror::Error)]
    #[error("{0}")]
    struct Boom(&'static str);

    /// Provider whose probe says "no"
    struct Absent;

    impl Provider for Absent {
        fn name(&self) -> &str {
            "absent"
        }

        fn priority(&self) -> i32 {
            100
        }

        fn is_supported(&self) -> VtResult<bool> {
            Ok(false)
        }
    }

    impl StructuredTaskScopeProvider for Absent {
        fn open_all(
            &self,
            _name: Option<&str>,
            _factory: Arc<dyn ThreadFactory>,
        ) -> VtResult<Box<dyn StructuredTaskScopeAll>> {
            Err(VtError::NoProvider { kind: "absent" })
        }

        fn open_any(
            &self,
            _name: Option<&str>,
            _factory: Arc<dyn ThreadFactory>,
        ) -> VtResult<Box<dyn StructuredTaskScopeAny>> {
            Err(VtError::NoProvider { kind: "absent" })
        }
    }

    fn factory() -> Arc<dyn ThreadFactory> {
        PlatformRuntime::new().thread_factory("scopes-")
    }

    #[test]
    fn test_no_provider_is_a_configuration_error() {
        let scopes = StructuredTaskScopes::new();
        scopes.register(Arc::new(Absent)).unwrap();

        assert!(matches!(
            scopes.provider(),
            Err(VtError::NoProvider { kind: "structured task scope" })
        ));

        let ran = AtomicUsize::new(0);
        let result = scopes.all(None, factory(), |_| {
            ran.fetch_add(1, Ordering::SeqCst);
            Ok::<_, VtError>(())
        });
        assert!(matches!(result, Err(VtError::NoProvider { .. })));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_selects_supported_provider() {
        let scopes = StructuredTaskScopes::new();
        scopes.register(Arc::new(Absent)).unwrap();
        scopes.register(Arc::new(ThreadScopeProvider::new())).unwrap();
        assert_eq!(scopes.provider().unwrap().provider_name(), "thread-task-scope");
        assert_eq!(scopes.providers().len(), 1);
    }

    #[test]
    fn test_all_passes_through() {
        let scopes = StructuredTaskScopes::with_builtin();
        let total = scopes
            .all(Some("pass-through"), factory(), |scope| {
                let a = scope.fork(|_| Ok::<_, Boom>(20))?;
                let b = scope.fork(|_| Ok::<_, Boom>(22))?;
                scope.join()?.throw_if_failed()?;
                Ok::<_, VtError>(a.get()? + b.get()?)
            })
            .unwrap();
        assert_eq!(total, 42);
    }

    #[test]
    fn test_any_passes_through() {
        let scopes = StructuredTaskScopes::with_builtin();
        let result = scopes
            .any(None, factory(), |scope| {
                scope.fork(|_| Err::<u8, _>(Boom("nope")))?;
                scope.fork(|_| Err::<u8, _>(Boom("nope")))?;
                Ok::<_, VtError>(scope.result(|cause: TaskFailure| cause.to_string()))
            })
            .unwrap();
        assert_eq!(result, Err("nope".to_string()));
    }
}
