//! Module cache with cooperative suspension.
//!
//! The cache is keyed by loader identity: one loader per provider per lazy
//! module. The first fetch triggers the loader and stores the in-flight
//! load; that in-flight state is *surfaced* to the caller as a shared
//! future to suspend on, never awaited inside the cache. Once the load
//! settles, the entry is replaced in place and every later fetch returns
//! the resolved export synchronously. Entries are never evicted, re-fetched,
//! or cancelled; a failed load stays failed for the session.

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, trace};

/// A loaded module namespace: export name → value.
#[derive(Debug, Default)]
pub struct Namespace<V> {
    exports: FxHashMap<String, V>,
}

impl<V> Namespace<V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            exports: FxHashMap::default(),
        }
    }

    /// Add an export.
    #[must_use]
    pub fn with_export(mut self, name: impl Into<String>, value: V) -> Self {
        self.exports.insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&V> {
        self.exports.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.exports.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }
}

/// Error from a provider loader (or a missing export after resolution).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("lazy module load failed: {message}")]
pub struct LoadError {
    pub message: String,
}

impl LoadError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The in-flight load a provider loader produces.
pub type LoadFuture<V> = BoxFuture<'static, Result<Arc<Namespace<V>>, LoadError>>;

/// A clonable handle to an in-flight load, handed to callers for suspension.
pub type SharedLoad<V> = Shared<LoadFuture<V>>;

/// A zero-argument loader for one provider's copy of a lazy module.
pub type ProviderLoader<V> = Arc<dyn Fn() -> LoadFuture<V> + Send + Sync>;

/// Outcome of a cache fetch: the typed stand-in for throw-on-pending.
///
/// `T` is the fetched value; `V` is the namespace export type the pending
/// load will eventually produce (they differ once a hook call maps the
/// resolved function through its return value).
pub enum Lazy<T, V = T> {
    /// The value is resolved; use it.
    Ready(T),
    /// The load is in flight. Await the handle, then fetch again.
    Pending(SharedLoad<V>),
    /// The load failed; it will not be retried this session.
    Failed(LoadError),
}

impl<T, V> Lazy<T, V> {
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// The resolved value, if ready.
    #[must_use]
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// The suspension handle, if pending.
    #[must_use]
    pub fn pending(self) -> Option<SharedLoad<V>> {
        match self {
            Self::Pending(load) => Some(load),
            _ => None,
        }
    }
}

impl<T, V> std::fmt::Debug for Lazy<T, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(_) => f.write_str("Lazy::Ready"),
            Self::Pending(_) => f.write_str("Lazy::Pending"),
            Self::Failed(e) => write!(f, "Lazy::Failed({e})"),
        }
    }
}

enum CacheEntry<V> {
    Loading(SharedLoad<V>),
    Resolved(Arc<Namespace<V>>),
    Failed(LoadError),
}

/// Process-wide module cache.
///
/// Injected into every wrapped binding rather than hidden behind a module
/// singleton, so each test (or embedder) can scope its own cache; lifecycle
/// is one instance per process in normal use.
pub struct ModuleCache<V> {
    entries: Mutex<FxHashMap<usize, CacheEntry<V>>>,
}

impl<V> ModuleCache<V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(FxHashMap::default()),
        }
    }

    /// Number of loaders the cache has seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FxHashMap<usize, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Identity of a loader: one cache slot per loader allocation.
    fn key(loader: &ProviderLoader<V>) -> usize {
        Arc::as_ptr(loader).cast::<()>() as usize
    }

    /// Fetch the namespace behind a loader.
    ///
    /// Absent entry: invoke the loader, store the in-flight load, return
    /// `Pending`. In-flight entry: probe without blocking; on settlement
    /// replace the entry (the single loading→resolved transition) and
    /// return the outcome, otherwise surface `Pending` again.
    pub fn fetch(&self, loader: &ProviderLoader<V>) -> Lazy<Arc<Namespace<V>>, V> {
        let key = Self::key(loader);
        let mut entries = self.lock();
        match entries.get(&key) {
            None => {
                let shared = loader().shared();
                entries.insert(key, CacheEntry::Loading(shared.clone()));
                debug!(key, "lazy module load started");
                Lazy::Pending(shared)
            }
            Some(CacheEntry::Loading(shared)) => {
                let shared = shared.clone();
                match shared.clone().now_or_never() {
                    Some(Ok(namespace)) => {
                        debug!(key, exports = namespace.len(), "lazy module load resolved");
                        entries.insert(key, CacheEntry::Resolved(namespace.clone()));
                        Lazy::Ready(namespace)
                    }
                    Some(Err(error)) => {
                        debug!(key, %error, "lazy module load failed");
                        entries.insert(key, CacheEntry::Failed(error.clone()));
                        Lazy::Failed(error)
                    }
                    None => {
                        trace!(key, "lazy module load still in flight");
                        Lazy::Pending(shared)
                    }
                }
            }
            Some(CacheEntry::Resolved(namespace)) => Lazy::Ready(namespace.clone()),
            Some(CacheEntry::Failed(error)) => Lazy::Failed(error.clone()),
        }
    }

    /// Fetch one export out of the namespace behind a loader.
    pub fn fetch_export(&self, loader: &ProviderLoader<V>, export_id: &str) -> Lazy<V>
    where
        V: Clone,
    {
        match self.fetch(loader) {
            Lazy::Ready(namespace) => match namespace.get(export_id) {
                Some(value) => Lazy::Ready(value.clone()),
                None => Lazy::Failed(LoadError::new(format!(
                    "lazy module has no export '{export_id}'"
                ))),
            },
            Lazy::Pending(load) => Lazy::Pending(load),
            Lazy::Failed(error) => Lazy::Failed(error),
        }
    }
}

impl<V> Default for ModuleCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
