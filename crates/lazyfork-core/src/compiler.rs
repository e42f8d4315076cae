//! Type-transpiler collaborator.
//!
//! Typed dialects (TypeScript) must be stripped to plain executable form
//! before export classification. The compiler is an external collaborator
//! behind a trait; the plugin constructs it lazily on the first typed file
//! and caches it for the rest of the session. Its absence when a typed file
//! is encountered is a configuration error, never a silent no-op.

use std::fmt;
use std::path::Path;

/// Error from a compiler backend.
#[derive(Debug, Clone)]
pub struct CompileError {
    pub message: String,
}

impl CompileError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CompileError {}

/// A type-stripping compiler backend.
///
/// Implementations transpile a typed module to plain executable text; the
/// rest of the system never depends on a concrete compiler.
pub trait TypeCompiler: Send + Sync {
    /// Backend name for diagnostics.
    fn name(&self) -> &'static str;

    /// Transpile `source` (the content of `path`) to executable form.
    fn compile(&self, source: &str, path: &Path) -> Result<String, CompileError>;
}

/// Extensions that require type stripping before classification.
const TYPED_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts"];

/// Extensions the transform recognizes as script modules.
const SCRIPT_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx", "mjs", "cjs", "mts", "cts"];

/// Whether a path is a typed dialect needing transpilation.
#[must_use]
pub fn is_typed_path(path: &Path) -> bool {
    has_extension(path, TYPED_EXTENSIONS)
}

/// Whether a path is a recognized script module.
#[must_use]
pub fn is_script_path(path: &Path) -> bool {
    has_extension(path, SCRIPT_EXTENSIONS)
}

fn has_extension(path: &Path, set: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            let lower = ext.to_lowercase();
            set.iter().any(|s| *s == lower)
        })
}
