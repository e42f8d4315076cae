//! Specifier resolution collaborator.
//!
//! The host bundler owns module resolution; the rewriter only needs
//! "specifier + importing file → absolute path, or unresolved". The default
//! implementation probes the filesystem the way dev servers do: exact path,
//! then known script extensions, then directory index files.

use std::path::{Path, PathBuf};

/// Host resolution surface consumed by the import rewriter.
pub trait SpecifierResolver: Send + Sync {
    /// Resolve `specifier` as written in `importer`. `None` means
    /// unresolved, which leaves the import untouched.
    fn resolve(&self, specifier: &str, importer: &Path) -> Option<PathBuf>;
}

/// Whether a specifier is relative (`./`, `../`, `.`, `..`).
///
/// Only relative specifiers are candidates for provider matching; bare
/// package names that happen to shadow a provider file must never rewrite.
#[must_use]
pub fn is_relative_specifier(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

/// Filesystem-probing resolver for relative specifiers.
#[derive(Debug, Default)]
pub struct FsResolver;

const PROBE_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs"];
const PROBE_INDEXES: &[&str] = &[
    "index.ts",
    "index.tsx",
    "index.js",
    "index.jsx",
];

impl SpecifierResolver for FsResolver {
    fn resolve(&self, specifier: &str, importer: &Path) -> Option<PathBuf> {
        if !is_relative_specifier(specifier) {
            return None;
        }
        let base = importer.parent().unwrap_or(Path::new("."));
        let joined = base.join(specifier);

        // Exact file match.
        if let Some(path) = canonical_file(&joined) {
            return Some(path);
        }

        // Extension probing.
        for ext in PROBE_EXTENSIONS {
            let mut with_ext = joined.as_os_str().to_os_string();
            with_ext.push(ext);
            if let Some(path) = canonical_file(Path::new(&with_ext)) {
                return Some(path);
            }
        }

        // Directory index probing.
        for index in PROBE_INDEXES {
            if let Some(path) = canonical_file(&joined.join(index)) {
                return Some(path);
            }
        }

        None
    }
}

/// Canonicalize `path` when it names an existing file.
fn canonical_file(path: &Path) -> Option<PathBuf> {
    let canonical = dunce::canonicalize(path).ok()?;
    canonical.is_file().then_some(canonical)
}
