//! Per-build session discriminator.
//!
//! Lazy reference ids are namespaced by an opaque value that is stable for
//! one build process, so ids from different sessions never collide while ids
//! within one session stay deterministic.

use std::time::{SystemTime, UNIX_EPOCH};

/// Opaque discriminator, stable for the lifetime of one plugin instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh discriminator from process identity and wall clock.
    #[must_use]
    pub fn generate() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let mut hasher = blake3::Hasher::new();
        hasher.update(&std::process::id().to_le_bytes());
        hasher.update(&nanos.to_le_bytes());
        let hex = hasher.finalize().to_hex();
        Self(hex[..12].to_string())
    }

    /// Create a fixed discriminator (deterministic builds, tests).
    #[must_use]
    pub fn fixed(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
