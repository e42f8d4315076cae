//! Provider registry.
//!
//! A provider is a named root directory holding one alternative implementation
//! of a shared module set. The registry answers "does this absolute path
//! belong to a provider, and what is its provider-relative id?"

use std::path::{Component, Path, PathBuf};

use crate::config::LazyConfig;
use crate::error::{Error, Result};

/// A named provider root. Identity is the configured name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
    /// Configured provider name.
    pub name: String,
    /// Absolute root directory.
    pub root: PathBuf,
}

/// The resolved set of providers for one plugin instance.
///
/// Immutable after `resolve`; provider order follows config iteration order
/// so every consumer (rewrites, synthesized output) sees the same sequence.
#[derive(Debug, Clone)]
pub struct ProviderSet {
    providers: Vec<Provider>,
}

impl ProviderSet {
    /// Resolve the configured provider roots to absolute directories.
    ///
    /// Fails fast when a root does not exist or cannot be canonicalized:
    /// a missing provider directory is a configuration error, not something
    /// to discover one import at a time.
    pub fn resolve(config: &LazyConfig) -> Result<Self> {
        let mut providers = Vec::with_capacity(config.providers.len());
        for (name, root) in &config.providers {
            let root = dunce::canonicalize(root).map_err(|source| Error::ProviderRoot {
                name: name.clone(),
                path: root.clone(),
                source,
            })?;
            providers.push(Provider {
                name: name.clone(),
                root,
            });
        }
        Ok(Self { providers })
    }

    /// Number of configured providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// True when no providers are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Iterate providers in configured order.
    pub fn iter(&self) -> impl Iterator<Item = &Provider> {
        self.providers.iter()
    }

    /// Find the provider whose root contains the given absolute path.
    ///
    /// `Path::starts_with` compares whole components, so `/app/mobile` does
    /// not claim `/app/mobile-legacy/Button.tsx`. The root itself does not
    /// match; only files inside it do.
    #[must_use]
    pub fn match_path(&self, path: &Path) -> Option<&Provider> {
        self.providers
            .iter()
            .find(|p| path != p.root && path.starts_with(&p.root))
    }

    /// Provider-relative id for a path inside the provider's root, with
    /// platform separators normalized to `/`.
    #[must_use]
    pub fn relative_id(provider: &Provider, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&provider.root).ok()?;
        let mut id = String::new();
        for component in rel.components() {
            if let Component::Normal(part) = component {
                if !id.is_empty() {
                    id.push('/');
                }
                id.push_str(&part.to_string_lossy());
            }
        }
        Some(id)
    }

    /// True only when a file at the provider-relative id exists under every
    /// configured provider root. This is the gate for lazy eligibility:
    /// partial coverage would synthesize loaders pointing at missing files.
    #[must_use]
    pub fn exists_in_all(&self, relative_id: &str) -> bool {
        !self.providers.is_empty()
            && self
                .providers
                .iter()
                .all(|p| join_relative(&p.root, relative_id).is_file())
    }
}

/// Join a slash-separated relative id onto a root directory.
fn join_relative(root: &Path, relative_id: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for part in relative_id.split('/').filter(|p| !p.is_empty()) {
        path.push(part);
    }
    path
}
