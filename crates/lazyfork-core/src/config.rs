use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Plugin configuration.
///
/// `providers` maps a provider name to the directory holding that provider's
/// copy of the shared module set. `resolver` names the module exporting the
/// `useModuleProvider` hook; its content is never inspected, only its
/// resolved path is referenced by the generated runtime import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LazyConfig {
    /// Module exporting the provider-selection hook.
    pub resolver: PathBuf,

    /// Provider name → root directory (relative paths are taken from cwd).
    ///
    /// A `BTreeMap` so provider iteration order is deterministic across
    /// builds regardless of config source.
    pub providers: BTreeMap<String, PathBuf>,
}

impl LazyConfig {
    /// Create a config with the given resolver module and no providers.
    #[must_use]
    pub fn new(resolver: impl Into<PathBuf>) -> Self {
        Self {
            resolver: resolver.into(),
            providers: BTreeMap::new(),
        }
    }

    /// Add a provider root.
    #[must_use]
    pub fn with_provider(mut self, name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        self.providers.insert(name.into(), root.into());
        self
    }

    /// Parse a config from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|source| Error::ConfigParse { source })
    }
}
