//! Lazy module synthesis.
//!
//! A synthesized lazy module re-exports one wrapped binding per classified
//! export, backed by a provider-name → dynamic-import loader mapping. The
//! module text is built from an explicit intermediate representation and
//! rendered by a dedicated formatter so output stays deterministic and
//! testable without a host bundler.

use std::fmt::Write as _;
use std::path::Path;

use crate::classify::LazyExport;
use crate::providers::ProviderSet;
use crate::runtime::RUNTIME_NAMESPACE;

/// One provider loader entry: provider name plus the emitted import path of
/// that provider's copy of the file (redirect already applied).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderLoaderIr {
    pub name: String,
    pub path: String,
}

/// Intermediate representation of a synthesized lazy module.
#[derive(Debug, Clone)]
pub struct LazyModuleIr {
    pub providers: Vec<ProviderLoaderIr>,
    pub exports: Vec<LazyExport>,
}

impl LazyModuleIr {
    /// Build the IR for a provider-relative module id.
    ///
    /// `redirect` post-processes every emitted absolute path (hosts use it
    /// to map filesystem paths into their served-URL space).
    pub fn build(
        providers: &ProviderSet,
        relative_id: &str,
        exports: Vec<LazyExport>,
        redirect: impl Fn(&str) -> String,
    ) -> Self {
        let providers = providers
            .iter()
            .map(|p| {
                let path = format!("{}/{relative_id}", slash_path(&p.root));
                ProviderLoaderIr {
                    name: p.name.clone(),
                    path: redirect(&path),
                }
            })
            .collect();
        Self { providers, exports }
    }

    /// Render the IR to ES-module text.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "import * as L from '{RUNTIME_NAMESPACE}'");
        let _ = writeln!(out);
        let _ = writeln!(out, "const providers = {{");
        for loader in &self.providers {
            let _ = writeln!(
                out,
                "  {}: () => import('{}'),",
                object_key(&loader.name),
                escape_js_string(&loader.path)
            );
        }
        let _ = writeln!(out, "}}");
        let _ = writeln!(out);
        for export in &self.exports {
            let _ = writeln!(
                out,
                "export const {} = L.createLazy{}(providers, '{}')",
                export.name,
                export.kind.factory_suffix(),
                escape_js_string(&export.name)
            );
        }
        out
    }
}

/// Absolute path with separators normalized to `/`.
fn slash_path(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}

/// Escape text for a single-quoted JS string literal.
pub(crate) fn escape_js_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Render a provider name as a JS object key, quoting when it is not a
/// plain identifier.
fn object_key(name: &str) -> String {
    let plain = !name.is_empty()
        && name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if plain {
        name.to_string()
    } else {
        format!("'{}'", escape_js_string(name))
    }
}
