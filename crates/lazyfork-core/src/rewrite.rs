//! Import rewriting.
//!
//! Scans a module's top-level imports, resolves relative specifiers, and,
//! when the target file exists under every configured provider, overwrites
//! the specifier in place with a synthetic lazy reference id, recording the
//! lazy module for later synthesis.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, trace};

use crate::compiler::is_script_path;
use crate::edit::SourceEditor;
use crate::error::{Error, Result};
use crate::providers::{Provider, ProviderSet};
use crate::resolver::{is_relative_specifier, SpecifierResolver};
use crate::runtime::RUNTIME_NAMESPACE;
use crate::scan::scan_module;
use crate::session::SessionId;

/// A registered lazy module: one rewritten import target.
///
/// Created the first time a matching import is seen; never mutated; lives
/// for the whole build session.
#[derive(Debug, Clone)]
pub struct LazyModuleEntry {
    /// Synthetic virtual-module id the import was rewritten to.
    pub lazy_id: String,
    /// Absolute path of the provider copy the original import resolved to.
    pub source_path: PathBuf,
    /// The provider that copy belongs to.
    pub provider: Provider,
}

/// Result of a rewrite that changed the file.
#[derive(Debug)]
pub struct Rewritten {
    /// Source with specifiers overwritten in place.
    pub code: String,
    /// Position-preserving source map (line identity).
    pub map: String,
    /// Lazy modules referenced by this file, in source order. May repeat an
    /// id the session has already registered; registration is idempotent.
    pub lazy: Vec<LazyModuleEntry>,
}

/// The lazy reference id for a provider-relative module id:
/// `<runtime namespace>/<session discriminator>/<relative id>`.
#[must_use]
pub fn lazy_reference_id(session: &SessionId, relative_id: &str) -> String {
    format!("{RUNTIME_NAMESPACE}/{}/{relative_id}", session.as_str())
}

/// Whether a file participates in the transform at all: a recognized script
/// module that is not under an installed-dependency directory.
#[must_use]
pub fn is_transformable(path: &Path) -> bool {
    is_script_path(path)
        && !path
            .components()
            .any(|c| matches!(c, Component::Normal(part) if part == "node_modules"))
}

/// Rewrites one file's provider imports into lazy references.
pub struct ImportRewriter<'a> {
    providers: &'a ProviderSet,
    resolver: &'a dyn SpecifierResolver,
    session: &'a SessionId,
}

impl<'a> ImportRewriter<'a> {
    #[must_use]
    pub fn new(
        providers: &'a ProviderSet,
        resolver: &'a dyn SpecifierResolver,
        session: &'a SessionId,
    ) -> Self {
        Self {
            providers,
            resolver,
            session,
        }
    }

    /// Rewrite `code` (the content of `file`). Returns `None` when nothing
    /// matched: pass-through, distinct from a transform to empty output.
    pub fn rewrite(&self, code: &str, file: &Path) -> Result<Option<Rewritten>> {
        let summary = scan_module(code).map_err(|e| Error::ParseFailed {
            path: file.to_path_buf(),
            detail: e.to_string(),
        })?;

        let mut editor = SourceEditor::new(code);
        let mut lazy = Vec::new();

        for decl in &summary.imports {
            if !is_relative_specifier(&decl.specifier) {
                continue;
            }
            let Some(resolved) = self.resolver.resolve(&decl.specifier, file) else {
                // Unresolved specifiers are the host's problem, not ours.
                continue;
            };
            let Some(provider) = self.providers.match_path(&resolved) else {
                continue;
            };
            let Some(relative_id) = ProviderSet::relative_id(provider, &resolved) else {
                continue;
            };
            if !self.providers.exists_in_all(&relative_id) {
                // Partial coverage: a lazy module here would point one of
                // its loaders at a missing file.
                trace!(
                    file = %file.display(),
                    module = %relative_id,
                    "skipping import without full provider coverage"
                );
                continue;
            }

            let lazy_id = lazy_reference_id(self.session, &relative_id);
            debug!(
                file = %file.display(),
                specifier = %decl.specifier,
                lazy_id = %lazy_id,
                "rewriting provider import"
            );
            editor.overwrite(decl.span.clone(), lazy_id.clone());
            lazy.push(LazyModuleEntry {
                lazy_id,
                source_path: resolved,
                provider: provider.clone(),
            });
        }

        if !editor.has_edits() {
            return Ok(None);
        }
        let map = editor.generate_map(&file.display().to_string());
        Ok(Some(Rewritten {
            code: editor.finish(),
            map,
            lazy,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LazyConfig;
    use crate::resolver::FsResolver;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn fixture() -> (TempDir, ProviderSet) {
        let dir = tempdir().unwrap();
        for provider in ["mobile", "desktop"] {
            fs::create_dir_all(dir.path().join(provider)).unwrap();
            fs::write(
                dir.path().join(provider).join("Button.jsx"),
                "export const Button = () => null\n",
            )
            .unwrap();
        }
        // Only mobile has Drawer.
        fs::write(
            dir.path().join("mobile/Drawer.jsx"),
            "export const Drawer = () => null\n",
        )
        .unwrap();
        fs::write(dir.path().join("app.jsx"), "").unwrap();

        let config = LazyConfig::new(dir.path().join("resolver.js"))
            .with_provider("mobile", dir.path().join("mobile"))
            .with_provider("desktop", dir.path().join("desktop"));
        let set = ProviderSet::resolve(&config).unwrap();
        (dir, set)
    }

    #[test]
    fn test_is_transformable() {
        assert!(is_transformable(Path::new("/app/src/main.tsx")));
        assert!(is_transformable(Path::new("/app/src/page.js")));
        assert!(!is_transformable(Path::new("/app/src/styles.css")));
        assert!(!is_transformable(Path::new(
            "/app/node_modules/react/index.js"
        )));
        // Boundary-aware: a directory merely named like it is fine.
        assert!(is_transformable(Path::new(
            "/app/not_node_modules_really/x.js"
        )));
    }

    #[test]
    fn test_lazy_reference_id_shape() {
        let session = SessionId::fixed("cafe01");
        assert_eq!(
            lazy_reference_id(&session, "widgets/Button.jsx"),
            "lazyfork-runtime/cafe01/widgets/Button.jsx"
        );
    }

    #[test]
    fn test_rewrite_covered_import() {
        let (dir, set) = fixture();
        let resolver = FsResolver;
        let session = SessionId::fixed("cafe01");
        let rewriter = ImportRewriter::new(&set, &resolver, &session);

        let code = "import { Button } from './mobile/Button'\n";
        let file = dir.path().join("app.jsx");
        let out = rewriter.rewrite(code, &file).unwrap().unwrap();

        assert_eq!(
            out.code,
            "import { Button } from 'lazyfork-runtime/cafe01/Button.jsx'\n"
        );
        assert_eq!(out.lazy.len(), 1);
        assert_eq!(out.lazy[0].provider.name, "mobile");
        assert!(out.lazy[0].source_path.ends_with("Button.jsx"));
    }

    #[test]
    fn test_quote_style_preserved() {
        let (dir, set) = fixture();
        let resolver = FsResolver;
        let session = SessionId::fixed("cafe01");
        let rewriter = ImportRewriter::new(&set, &resolver, &session);

        let code = "import { Button } from \"./mobile/Button\"\n";
        let out = rewriter
            .rewrite(code, &dir.path().join("app.jsx"))
            .unwrap()
            .unwrap();
        assert_eq!(
            out.code,
            "import { Button } from \"lazyfork-runtime/cafe01/Button.jsx\"\n"
        );
    }

    #[test]
    fn test_partial_coverage_left_untouched() {
        let (dir, set) = fixture();
        let resolver = FsResolver;
        let session = SessionId::fixed("cafe01");
        let rewriter = ImportRewriter::new(&set, &resolver, &session);

        let code = "import { Drawer } from './mobile/Drawer'\n";
        let out = rewriter.rewrite(code, &dir.path().join("app.jsx")).unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn test_unresolved_and_bare_left_untouched() {
        let (dir, set) = fixture();
        let resolver = FsResolver;
        let session = SessionId::fixed("cafe01");
        let rewriter = ImportRewriter::new(&set, &resolver, &session);

        let code = "import React from 'react'\nimport gone from './missing'\n";
        let out = rewriter.rewrite(code, &dir.path().join("app.jsx")).unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn test_mixed_file_rewrites_only_covered() {
        let (dir, set) = fixture();
        let resolver = FsResolver;
        let session = SessionId::fixed("cafe01");
        let rewriter = ImportRewriter::new(&set, &resolver, &session);

        let code = "import React from 'react'\nimport { Button } from './mobile/Button'\nimport { Drawer } from './mobile/Drawer'\n";
        let out = rewriter
            .rewrite(code, &dir.path().join("app.jsx"))
            .unwrap()
            .unwrap();
        assert!(out.code.contains("from 'react'"));
        assert!(out.code.contains("'lazyfork-runtime/cafe01/Button.jsx'"));
        assert!(out.code.contains("'./mobile/Drawer'"));
        assert_eq!(out.lazy.len(), 1);
    }

    #[test]
    fn test_rewrite_is_deterministic_within_session() {
        let (dir, set) = fixture();
        let resolver = FsResolver;
        let session = SessionId::fixed("cafe01");
        let rewriter = ImportRewriter::new(&set, &resolver, &session);

        let code = "import { Button } from './mobile/Button'\n";
        let file = dir.path().join("app.jsx");
        let first = rewriter.rewrite(code, &file).unwrap().unwrap();
        let second = rewriter.rewrite(code, &file).unwrap().unwrap();
        assert_eq!(first.code, second.code);
        assert_eq!(first.lazy[0].lazy_id, second.lazy[0].lazy_id);
    }

    #[test]
    fn test_parse_failure_names_file() {
        let (dir, set) = fixture();
        let resolver = FsResolver;
        let session = SessionId::fixed("cafe01");
        let rewriter = ImportRewriter::new(&set, &resolver, &session);

        let err = rewriter
            .rewrite("import { A } from './x\n", &dir.path().join("bad.jsx"))
            .unwrap_err();
        match err {
            Error::ParseFailed { path, detail } => {
                assert!(path.ends_with("bad.jsx"));
                assert!(detail.contains("unterminated"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
