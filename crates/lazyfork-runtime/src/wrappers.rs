//! Wrapped lazy bindings.
//!
//! A wrapped component or hook pairs a provider-name → loader mapping with
//! one export name. At call time it asks the caller-supplied
//! provider-selection hook which provider is active, then goes through the
//! cache: `Ready` with the export once loaded, `Pending` (cooperative
//! suspension) while the load is in flight.

use std::sync::Arc;

use crate::cache::{Lazy, LoadError, ModuleCache, ProviderLoader};

/// Ordered provider-name → loader mapping for one lazy module.
pub struct ProviderLoaders<V> {
    entries: Vec<(String, ProviderLoader<V>)>,
}

impl<V> ProviderLoaders<V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add a provider's loader.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, loader: ProviderLoader<V>) -> Self {
        self.entries.push((name.into(), loader));
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ProviderLoader<V>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, loader)| loader)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for ProviderLoaders<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for ProviderLoaders<V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

/// Shared state of one wrapped binding.
struct LazyBinding<V> {
    cache: Arc<ModuleCache<V>>,
    providers: ProviderLoaders<V>,
    export_id: String,
}

impl<V: Clone> LazyBinding<V> {
    fn resolve(&self, select_provider: impl FnOnce() -> String) -> Lazy<V> {
        let active = select_provider();
        let Some(loader) = self.providers.get(&active) else {
            return Lazy::Failed(LoadError::new(format!(
                "unknown provider '{active}' for lazy export '{}'",
                self.export_id
            )));
        };
        self.cache.fetch_export(loader, &self.export_id)
    }
}

/// A wrapped lazy component. Clones share identity (`ptr_eq`), so the
/// binding handed to callers is referentially stable.
pub struct LazyComponent<V> {
    inner: Arc<LazyBinding<V>>,
}

impl<V> Clone for LazyComponent<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V: Clone> LazyComponent<V> {
    #[must_use]
    pub fn export_id(&self) -> &str {
        &self.inner.export_id
    }

    /// Debug name, mirroring the generated runtime's display name.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("Lazy({})", self.inner.export_id)
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Render: pick the active provider via the supplied hook and fetch
    /// this component's export through the cache.
    pub fn render(&self, select_provider: impl FnOnce() -> String) -> Lazy<V> {
        self.inner.resolve(select_provider)
    }
}

/// A wrapped lazy hook.
pub struct LazyHook<V> {
    inner: Arc<LazyBinding<V>>,
}

impl<V> Clone for LazyHook<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V: Clone> LazyHook<V> {
    #[must_use]
    pub fn export_id(&self) -> &str {
        &self.inner.export_id
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Fetch the underlying hook function without calling it.
    pub fn resolve(&self, select_provider: impl FnOnce() -> String) -> Lazy<V> {
        self.inner.resolve(select_provider)
    }

    /// Call the hook, forwarding arguments and return value transparently
    /// once resolved; suspends (`Pending`) while the module is in flight.
    pub fn call<A, R>(&self, select_provider: impl FnOnce() -> String, args: A) -> Lazy<R, V>
    where
        V: Fn(A) -> R,
    {
        match self.inner.resolve(select_provider) {
            Lazy::Ready(hook) => Lazy::Ready(hook(args)),
            Lazy::Pending(load) => Lazy::Pending(load),
            Lazy::Failed(error) => Lazy::Failed(error),
        }
    }
}

/// Wrap a component export behind the provider loaders and cache.
#[must_use]
pub fn create_lazy_component<V>(
    cache: Arc<ModuleCache<V>>,
    providers: ProviderLoaders<V>,
    export_id: impl Into<String>,
) -> LazyComponent<V> {
    LazyComponent {
        inner: Arc::new(LazyBinding {
            cache,
            providers,
            export_id: export_id.into(),
        }),
    }
}

/// Wrap a hook export behind the provider loaders and cache.
#[must_use]
pub fn create_lazy_hook<V>(
    cache: Arc<ModuleCache<V>>,
    providers: ProviderLoaders<V>,
    export_id: impl Into<String>,
) -> LazyHook<V> {
    LazyHook {
        inner: Arc::new(LazyBinding {
            cache,
            providers,
            export_id: export_id.into(),
        }),
    }
}
