//! Provider registry
//!
//! Providers are pushed in through [`ProviderRegistry::register`]. On first
//! use the registry probes every provider's `is_supported()`, drops the
//! unsupported or failing ones, sorts the rest by descending priority and
//! memoizes that list for the lifetime of the registry. Registration after
//! that point is rejected, so the selection never changes under a reader.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::error::{VtError, VtResult};
use crate::traits::Provider;

/// Registered-but-unresolved providers
struct Pending<P: ?Sized> {
    providers: Vec<Arc<P>>,
    /// Set while resolving; later registrations are refused
    frozen: bool,
}

/// Lazily resolved, priority-sorted set of providers
pub struct ProviderRegistry<P: ?Sized> {
    /// Human-readable provider kind, used in logs and errors
    kind: &'static str,
    pending: Mutex<Pending<P>>,
    resolved: OnceLock<Vec<Arc<P>>>,
}

impl<P: ?Sized + Provider> ProviderRegistry<P> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            pending: Mutex::new(Pending {
                providers: Vec::new(),
                frozen: false,
            }),
            resolved: OnceLock::new(),
        }
    }

    /// Registry pre-populated with `providers`, in that registration order
    pub fn with_providers<I>(kind: &'static str, providers: I) -> Self
    where
        I: IntoIterator<Item = Arc<P>>,
    {
        let registry = Self::new(kind);
        registry.pending.lock().providers.extend(providers);
        registry
    }

    #[inline]
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Add a provider; fails once the registry has been resolved
    pub fn register(&self, provider: Arc<P>) -> VtResult<()> {
        let mut pending = self.pending.lock();
        if pending.frozen {
            return Err(VtError::RegistryFrozen { kind: self.kind });
        }
        tracing::debug!(kind = self.kind, provider = provider.name(), "registered provider");
        pending.providers.push(provider);
        Ok(())
    }

    /// Supported providers, highest priority first
    ///
    /// Computed once; concurrent first callers block until it is ready.
    pub fn providers(&self) -> &[Arc<P>] {
        self.resolved.get_or_init(|| {
            let mut pending = self.pending.lock();
            pending.frozen = true;
            resolve(self.kind, &pending.providers)
        })
    }

    /// Highest-priority supported provider
    pub fn first(&self) -> Option<&Arc<P>> {
        self.providers().first()
    }

    /// True once the provider list has been computed
    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }
}

impl<P: ?Sized + Provider> std::fmt::Debug for ProviderRegistry<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Option<Vec<&str>> = self
            .resolved
            .get()
            .map(|list| list.iter().map(|p| p.name()).collect());
        f.debug_struct("ProviderRegistry")
            .field("kind", &self.kind)
            .field("resolved", &names)
            .finish()
    }
}

/// Probe, filter and sort; never fails
fn resolve<P: ?Sized + Provider>(kind: &'static str, candidates: &[Arc<P>]) -> Vec<Arc<P>> {
    let mut supported: Vec<Arc<P>> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if probe(kind, &**candidate) {
            supported.push(Arc::clone(candidate));
        }
    }

    // Stable: equal priorities keep registration order
    supported.sort_by(|a, b| b.priority().cmp(&a.priority()));

    match supported.first() {
        Some(p) => tracing::info!(
            kind,
            provider = p.name(),
            priority = p.priority(),
            candidates = candidates.len(),
            "selected provider"
        ),
        None => tracing::debug!(kind, candidates = candidates.len(), "no supported provider"),
    }
    supported
}

fn probe<P: ?Sized + Provider>(kind: &'static str, provider: &P) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| provider.is_supported())) {
        Ok(Ok(supported)) => {
            tracing::debug!(kind, provider = provider.name(), supported, "probed provider");
            supported
        }
        Ok(Err(e)) => {
            tracing::warn!(kind, provider = provider.name(), error = %e, "support probe failed; provider excluded");
            false
        }
        Err(payload) => {
            let failure = crate::error::TaskFailure::from_panic(payload);
            tracing::warn!(kind, provider = provider.name(), error = %failure, "support probe panicked; provider excluded");
            false
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Probe {
        Yes,
        No,
        Fails,
        Panics,
    }

    struct Fake {
        name: &'static str,
        priority: i32,
        probe: Probe,
        probes: AtomicUsize,
    }

    impl Fake {
        fn new(name: &'static str, priority: i32, probe: Probe) -> Arc<Self> {
            Arc::new(Self {
                name,
                priority,
                probe,
                probes: AtomicUsize::new(0),
            })
        }
    }

    impl Provider for Fake {
        fn name(&self) -> &str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn is_supported(&self) -> VtResult<bool> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            match self.probe {
                Probe::Yes => Ok(true),
                Probe::No => Ok(false),
                Probe::Fails => Err(VtError::Config("probe exploded")),
                Probe::Panics => panic!("probe panicked"),
            }
        }
    }

    fn names(registry: &ProviderRegistry<Fake>) -> Vec<&str> {
        registry.providers().iter().map(|p| p.name()).collect()
    }

    #[test]
    fn test_highest_supported_priority_wins() {
        let registry = ProviderRegistry::new("test");
        registry.register(Fake::new("A", 10, Probe::No)).unwrap();
        registry.register(Fake::new("B", 5, Probe::Yes)).unwrap();
        registry.register(Fake::new("C", 7, Probe::Yes)).unwrap();

        assert_eq!(names(&registry), vec!["C", "B"]);
        assert_eq!(registry.first().map(|p| p.name()), Some("C"));
    }

    #[test]
    fn test_failing_and_panicking_probes_are_excluded() {
        let registry = ProviderRegistry::new("test");
        registry.register(Fake::new("err", 100, Probe::Fails)).unwrap();
        registry.register(Fake::new("panic", 90, Probe::Panics)).unwrap();
        registry.register(Fake::new("ok", 1, Probe::Yes)).unwrap();

        assert_eq!(names(&registry), vec!["ok"]);
    }

    #[test]
    fn test_resolution_is_memoized() {
        let registry = ProviderRegistry::new("test");
        let fake = Fake::new("once", 1, Probe::Yes);
        registry.register(fake.clone()).unwrap();

        for _ in 0..5 {
            assert_eq!(registry.first().map(|p| p.name()), Some("once"));
        }
        assert_eq!(fake.probes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_first_access_probes_once() {
        let registry = Arc::new(ProviderRegistry::new("test"));
        let fake = Fake::new("shared", 3, Probe::Yes);
        registry.register(fake.clone()).unwrap();

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let r = registry.clone();
                std::thread::spawn(move || r.first().map(|p| p.priority()))
            })
            .collect();
        for reader in readers {
            assert_eq!(reader.join().unwrap(), Some(3));
        }
        assert_eq!(fake.probes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_equal_priority_keeps_registration_order() {
        let registry = ProviderRegistry::new("test");
        registry.register(Fake::new("first", 2, Probe::Yes)).unwrap();
        registry.register(Fake::new("second", 2, Probe::Yes)).unwrap();
        assert_eq!(names(&registry), vec!["first", "second"]);
    }

    #[test]
    fn test_register_after_resolution_is_rejected() {
        let registry = ProviderRegistry::new("test");
        assert!(registry.first().is_none());
        assert!(registry.is_resolved());

        let err = registry.register(Fake::new("late", 1, Probe::Yes)).unwrap_err();
        assert!(matches!(err, VtError::RegistryFrozen { kind: "test" }));
        assert!(registry.providers().is_empty());
    }

    #[test]
    fn test_trait_object_registry() {
        let registry: ProviderRegistry<dyn Provider> = ProviderRegistry::new("dyn");
        registry.register(Fake::new("x", 1, Probe::Yes)).unwrap();
        assert_eq!(registry.first().map(|p| p.name()), Some("x"));
    }

    #[test]
    fn test_prepopulated_registry() {
        let registry = ProviderRegistry::with_providers(
            "test",
            vec![Fake::new("low", 1, Probe::Yes), Fake::new("high", 9, Probe::Yes)],
        );
        assert!(!registry.is_resolved());
        assert_eq!(names(&registry), vec!["high", "low"]);
    }
}
