//! Plugin surface and the lazyfork plugin.
//!
//! The hook shapes mirror the Rollup-style contract hosts speak:
//! `resolve_id` / `load` / `transform`, chained through a container. The
//! lazyfork plugin claims exactly two id families: the fixed runtime
//! namespace and the lazy reference ids it minted itself. It rewrites
//! provider imports during `transform`.

use rustc_hash::FxHashMap as HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, RwLock};

use tracing::debug;

use crate::compiler::{is_typed_path, CompileError, TypeCompiler};
use crate::config::LazyConfig;
use crate::error::{Error, Result};
use crate::providers::ProviderSet;
use crate::resolver::{FsResolver, SpecifierResolver};
use crate::rewrite::{is_transformable, ImportRewriter, LazyModuleEntry};
use crate::runtime::{runtime_source, RUNTIME_NAMESPACE};
use crate::scan::scan_module;
use crate::session::SessionId;
use crate::synth::LazyModuleIr;

/// Result type for plugin hooks.
pub type HookResult<T> = std::result::Result<T, PluginError>;

/// Error from a plugin hook.
#[derive(Debug)]
pub struct PluginError {
    /// Plugin name that caused the error.
    pub plugin: String,
    /// Hook that failed.
    pub hook: &'static str,
    /// Error message.
    pub message: String,
}

impl PluginError {
    #[must_use]
    pub fn new(plugin: impl Into<String>, hook: &'static str, message: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            hook,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for PluginError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.plugin, self.hook, self.message)
    }
}

impl std::error::Error for PluginError {}

/// Context passed to plugin hooks.
#[derive(Debug, Default)]
pub struct PluginContext {
    /// Working directory.
    pub cwd: PathBuf,
}

impl PluginContext {
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self { cwd }
    }
}

/// Result of the resolve hook.
#[derive(Debug, Clone)]
pub struct ResolveIdResult {
    /// Resolved module id.
    pub id: String,
}

impl ResolveIdResult {
    #[must_use]
    pub fn resolved(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Result of the load hook.
#[derive(Debug, Clone)]
pub struct LoadResult {
    /// Module source code.
    pub code: String,
    /// Optional source map.
    pub map: Option<String>,
}

impl LoadResult {
    #[must_use]
    pub fn code(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            map: None,
        }
    }
}

/// Result of the transform hook.
#[derive(Debug, Clone)]
pub struct TransformResult {
    /// Transformed code.
    pub code: String,
    /// Optional source map.
    pub map: Option<String>,
}

/// The plugin trait. Hooks default to "not handled" so implementations only
/// write the ones they care about.
pub trait Plugin: Send + Sync {
    /// Plugin name for debugging and error messages.
    fn name(&self) -> &str;

    /// Resolve a module specifier to an id. `None` defers to the next
    /// plugin or the host's default resolver.
    fn resolve_id(
        &self,
        _specifier: &str,
        _importer: Option<&str>,
        _ctx: &PluginContext,
    ) -> HookResult<Option<ResolveIdResult>> {
        Ok(None)
    }

    /// Load a module by id. `None` defers to the next plugin or the
    /// filesystem.
    fn load(&self, _id: &str, _ctx: &PluginContext) -> HookResult<Option<LoadResult>> {
        Ok(None)
    }

    /// Transform module source. `None` means pass-through, distinct from
    /// transforming into empty output.
    fn transform(
        &self,
        _code: &str,
        _id: &str,
        _ctx: &PluginContext,
    ) -> HookResult<Option<TransformResult>> {
        Ok(None)
    }
}

/// An ordered set of plugins sharing one context.
pub struct PluginContainer {
    plugins: Vec<Box<dyn Plugin>>,
    ctx: PluginContext,
}

impl PluginContainer {
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            plugins: Vec::new(),
            ctx: PluginContext::new(cwd),
        }
    }

    /// Add a plugin. Insertion order is call order.
    pub fn add(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    #[must_use]
    pub fn context(&self) -> &PluginContext {
        &self.ctx
    }

    /// First plugin to claim the specifier wins.
    pub fn resolve_id(
        &self,
        specifier: &str,
        importer: Option<&str>,
    ) -> HookResult<Option<ResolveIdResult>> {
        for plugin in &self.plugins {
            if let Some(result) = plugin.resolve_id(specifier, importer, &self.ctx)? {
                return Ok(Some(result));
            }
        }
        Ok(None)
    }

    /// First plugin to provide the module wins.
    pub fn load(&self, id: &str) -> HookResult<Option<LoadResult>> {
        for plugin in &self.plugins {
            if let Some(result) = plugin.load(id, &self.ctx)? {
                return Ok(Some(result));
            }
        }
        Ok(None)
    }

    /// Chain transforms; each plugin sees the previous plugin's output.
    /// `None` when no plugin touched the code.
    pub fn transform(&self, code: &str, id: &str) -> HookResult<Option<TransformResult>> {
        let mut current: Option<TransformResult> = None;
        for plugin in &self.plugins {
            let input = current.as_ref().map_or(code, |r| r.code.as_str());
            if let Some(result) = plugin.transform(input, id, &self.ctx)? {
                current = Some(result);
            }
        }
        Ok(current)
    }
}

impl Default for PluginContainer {
    fn default() -> Self {
        Self::new(std::env::current_dir().unwrap_or_default())
    }
}

/// Applied to every absolute path the plugin emits into generated code.
pub type RedirectFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Lazily constructs the type-transpiler backend on first use.
pub type CompilerFactory =
    Arc<dyn Fn() -> std::result::Result<Arc<dyn TypeCompiler>, CompileError> + Send + Sync>;

/// The lazyfork plugin: rewrites provider imports into lazy references and
/// synthesizes the referenced virtual modules on demand.
pub struct LazyPlugin {
    providers: ProviderSet,
    resolver_module: PathBuf,
    redirect: RedirectFn,
    session: SessionId,
    specifier_resolver: Arc<dyn SpecifierResolver>,
    compiler_factory: Option<CompilerFactory>,
    compiler: OnceLock<std::result::Result<Arc<dyn TypeCompiler>, CompileError>>,
    /// Append-only registry of lazy modules minted this session.
    lazy_modules: RwLock<HashMap<String, LazyModuleEntry>>,
}

impl LazyPlugin {
    /// Create a plugin from config. Fails fast when a provider root cannot
    /// be resolved.
    pub fn new(config: &LazyConfig) -> Result<Self> {
        let providers = ProviderSet::resolve(config)?;
        let resolver_module = absolutize(&config.resolver);
        Ok(Self {
            providers,
            resolver_module,
            redirect: Arc::new(|id| id.to_string()),
            session: SessionId::generate(),
            specifier_resolver: Arc::new(FsResolver),
            compiler_factory: None,
            compiler: OnceLock::new(),
            lazy_modules: RwLock::new(HashMap::default()),
        })
    }

    /// Pin the session discriminator (deterministic builds, tests).
    #[must_use]
    pub fn with_session(mut self, session: SessionId) -> Self {
        self.session = session;
        self
    }

    /// Set the path redirect applied to emitted absolute paths.
    #[must_use]
    pub fn with_redirect(mut self, redirect: RedirectFn) -> Self {
        self.redirect = redirect;
        self
    }

    /// Replace the specifier-resolution collaborator.
    #[must_use]
    pub fn with_specifier_resolver(mut self, resolver: Arc<dyn SpecifierResolver>) -> Self {
        self.specifier_resolver = resolver;
        self
    }

    /// Provide the type-transpiler factory, constructed lazily on the first
    /// typed module and cached for the session.
    #[must_use]
    pub fn with_compiler_factory(mut self, factory: CompilerFactory) -> Self {
        self.compiler_factory = Some(factory);
        self
    }

    #[must_use]
    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// Look up a registered lazy module.
    #[must_use]
    pub fn lazy_module(&self, lazy_id: &str) -> Option<LazyModuleEntry> {
        self.lazy_modules
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(lazy_id)
            .cloned()
    }

    /// Number of lazy modules registered so far.
    #[must_use]
    pub fn lazy_module_count(&self) -> usize {
        self.lazy_modules
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Insert entries, keeping the first registration of each id.
    fn register(&self, entries: Vec<LazyModuleEntry>) {
        let mut modules = self
            .lazy_modules
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        for entry in entries {
            if !modules.contains_key(&entry.lazy_id) {
                debug!(lazy_id = %entry.lazy_id, source = %entry.source_path.display(), "registered lazy module");
                modules.insert(entry.lazy_id.clone(), entry);
            }
        }
    }

    fn type_compiler(&self, path: &Path) -> Result<Arc<dyn TypeCompiler>> {
        let Some(factory) = &self.compiler_factory else {
            return Err(Error::TranspilerMissing {
                path: path.to_path_buf(),
            });
        };
        match self.compiler.get_or_init(|| factory()) {
            Ok(compiler) => Ok(compiler.clone()),
            Err(e) => Err(Error::Transpile {
                path: path.to_path_buf(),
                detail: e.message.clone(),
            }),
        }
    }

    /// Synthesize the module text for a registered lazy id.
    ///
    /// The source is read fresh from disk every time; the file may have
    /// changed since the import was rewritten.
    fn load_lazy(&self, entry: &LazyModuleEntry) -> Result<String> {
        let path = &entry.source_path;
        let mut source = std::fs::read_to_string(path).map_err(|source| Error::SourceRead {
            path: path.clone(),
            source,
        })?;

        if is_typed_path(path) {
            let compiler = self.type_compiler(path)?;
            source = compiler
                .compile(&source, path)
                .map_err(|e| Error::Transpile {
                    path: path.clone(),
                    detail: e.message,
                })?;
        }

        let summary = scan_module(&source).map_err(|e| Error::ParseFailed {
            path: path.clone(),
            detail: e.to_string(),
        })?;
        let exports = crate::classify::classify(summary.exports);

        let relative_id = ProviderSet::relative_id(&entry.provider, path)
            .unwrap_or_else(|| entry.lazy_id.clone());
        let ir = LazyModuleIr::build(&self.providers, &relative_id, exports, |p| {
            (self.redirect)(p)
        });
        debug!(lazy_id = %entry.lazy_id, providers = ir.providers.len(), exports = ir.exports.len(), "synthesized lazy module");
        Ok(ir.render())
    }

    fn hook_error(&self, hook: &'static str, error: &Error) -> PluginError {
        PluginError::new(self.name(), hook, error.to_string())
    }
}

impl Plugin for LazyPlugin {
    fn name(&self) -> &str {
        "lazyfork"
    }

    fn resolve_id(
        &self,
        specifier: &str,
        _importer: Option<&str>,
        _ctx: &PluginContext,
    ) -> HookResult<Option<ResolveIdResult>> {
        let claimed = specifier == RUNTIME_NAMESPACE
            || specifier
                .strip_prefix(RUNTIME_NAMESPACE)
                .is_some_and(|rest| rest.starts_with('/'));
        Ok(claimed.then(|| ResolveIdResult::resolved(specifier)))
    }

    fn load(&self, id: &str, _ctx: &PluginContext) -> HookResult<Option<LoadResult>> {
        if id == RUNTIME_NAMESPACE {
            let resolver = (self.redirect)(&self.resolver_module.display().to_string());
            return Ok(Some(LoadResult::code(runtime_source(&resolver))));
        }
        let Some(entry) = self.lazy_module(id) else {
            return Ok(None);
        };
        let code = self
            .load_lazy(&entry)
            .map_err(|e| self.hook_error("load", &e))?;
        Ok(Some(LoadResult::code(code)))
    }

    fn transform(
        &self,
        code: &str,
        id: &str,
        _ctx: &PluginContext,
    ) -> HookResult<Option<TransformResult>> {
        let path = Path::new(id);
        if !is_transformable(path) {
            return Ok(None);
        }
        let rewriter =
            ImportRewriter::new(&self.providers, &*self.specifier_resolver, &self.session);
        let rewritten = rewriter
            .rewrite(code, path)
            .map_err(|e| self.hook_error("transform", &e))?;
        Ok(rewritten.map(|out| {
            self.register(out.lazy);
            TransformResult {
                code: out.code,
                map: Some(out.map),
            }
        }))
    }
}

/// Make a configured path absolute against the working directory without
/// requiring it to exist (the resolver module may itself be virtual).
fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn fixture() -> (TempDir, LazyPlugin) {
        let dir = tempdir().unwrap();
        for provider in ["mobile", "desktop"] {
            fs::create_dir_all(dir.path().join(provider)).unwrap();
            fs::write(
                dir.path().join(provider).join("Button.jsx"),
                "export const Button = () => null\nexport const useTheme = () => null\nexport { Button as default }\n",
            )
            .unwrap();
        }
        let config = LazyConfig::new(dir.path().join("resolver.js"))
            .with_provider("mobile", dir.path().join("mobile"))
            .with_provider("desktop", dir.path().join("desktop"));
        let plugin = LazyPlugin::new(&config)
            .unwrap()
            .with_session(SessionId::fixed("cafe01"));
        (dir, plugin)
    }

    #[test]
    fn test_resolve_id_claims_only_namespace() {
        let (_dir, plugin) = fixture();
        let ctx = PluginContext::default();

        assert!(plugin
            .resolve_id(RUNTIME_NAMESPACE, None, &ctx)
            .unwrap()
            .is_some());
        assert!(plugin
            .resolve_id("lazyfork-runtime/cafe01/Button.jsx", None, &ctx)
            .unwrap()
            .is_some());
        assert!(plugin.resolve_id("react", None, &ctx).unwrap().is_none());
        assert!(plugin
            .resolve_id("lazyfork-runtime-extras", None, &ctx)
            .unwrap()
            .is_none());
        assert!(plugin.resolve_id("./local", None, &ctx).unwrap().is_none());
    }

    #[test]
    fn test_load_runtime_substitutes_resolver() {
        let (dir, plugin) = fixture();
        let ctx = PluginContext::default();

        let result = plugin.load(RUNTIME_NAMESPACE, &ctx).unwrap().unwrap();
        let resolver = dir.path().join("resolver.js");
        assert!(result
            .code
            .contains(&resolver.display().to_string().replace('\\', "\\\\")));
        assert!(result.code.contains("createLazyComponent"));
    }

    #[test]
    fn test_redirect_applied_to_resolver_import() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("m")).unwrap();
        let config = LazyConfig::new(dir.path().join("resolver.js"))
            .with_provider("mobile", dir.path().join("m"));
        let plugin = LazyPlugin::new(&config)
            .unwrap()
            .with_redirect(Arc::new(|id| format!("/@fs{id}")));
        let ctx = PluginContext::default();

        let result = plugin.load(RUNTIME_NAMESPACE, &ctx).unwrap().unwrap();
        assert!(result.code.contains("/@fs"));
    }

    #[test]
    fn test_transform_end_to_end() {
        let (dir, plugin) = fixture();
        let ctx = PluginContext::default();

        let app = dir.path().join("app.jsx");
        let code = "import { Button } from './mobile/Button'\n";
        let result = plugin
            .transform(code, &app.display().to_string(), &ctx)
            .unwrap()
            .unwrap();

        let lazy_id = "lazyfork-runtime/cafe01/Button.jsx";
        assert_eq!(result.code, format!("import {{ Button }} from '{lazy_id}'\n"));
        assert!(result.map.is_some());

        let entry = plugin.lazy_module(lazy_id).unwrap();
        assert_eq!(entry.provider.name, "mobile");

        // The registered id now loads as a synthesized module.
        let loaded = plugin.load(lazy_id, &ctx).unwrap().unwrap();
        assert!(loaded
            .code
            .contains("export const Button = L.createLazyComponent(providers, 'Button')"));
        assert!(loaded
            .code
            .contains("export const useTheme = L.createLazyHook(providers, 'useTheme')"));
    }

    #[test]
    fn test_transform_passthrough_and_non_script() {
        let (dir, plugin) = fixture();
        let ctx = PluginContext::default();

        let app = dir.path().join("app.jsx").display().to_string();
        assert!(plugin
            .transform("const x = 1;\n", &app, &ctx)
            .unwrap()
            .is_none());
        assert!(plugin
            .transform("import './mobile/Button'", "/app/styles.css", &ctx)
            .unwrap()
            .is_none());
        let dep = dir.path().join("node_modules/pkg/index.js");
        assert!(plugin
            .transform(
                "import { Button } from './mobile/Button'",
                &dep.display().to_string(),
                &ctx
            )
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_registration_is_idempotent() {
        let (dir, plugin) = fixture();
        let ctx = PluginContext::default();
        let app = dir.path().join("app.jsx").display().to_string();
        let code = "import { Button } from './mobile/Button'\n";

        plugin.transform(code, &app, &ctx).unwrap().unwrap();
        plugin.transform(code, &app, &ctx).unwrap().unwrap();
        let other = dir.path().join("other.jsx").display().to_string();
        plugin.transform(code, &other, &ctx).unwrap().unwrap();

        assert_eq!(plugin.lazy_module_count(), 1);
    }

    #[test]
    fn test_typed_module_without_compiler_errors() {
        let (dir, plugin) = fixture();
        let ctx = PluginContext::default();

        for provider in ["mobile", "desktop"] {
            fs::write(
                dir.path().join(provider).join("Panel.tsx"),
                "export const Panel = (): null => null\n",
            )
            .unwrap();
        }
        let app = dir.path().join("app.jsx").display().to_string();
        let result = plugin
            .transform("import { Panel } from './mobile/Panel'\n", &app, &ctx)
            .unwrap()
            .unwrap();
        assert!(result.code.contains("lazyfork-runtime/cafe01/Panel.tsx"));

        let err = plugin
            .load("lazyfork-runtime/cafe01/Panel.tsx", &ctx)
            .unwrap_err();
        assert_eq!(err.hook, "load");
        assert!(err.message.contains("Panel.tsx"));
        assert!(err.message.contains("TypeScript compiler"));
    }

    #[test]
    fn test_typed_module_with_compiler() {
        struct StripArrowReturnTypes;
        impl TypeCompiler for StripArrowReturnTypes {
            fn name(&self) -> &'static str {
                "test-strip"
            }
            fn compile(&self, source: &str, _path: &Path) -> std::result::Result<String, CompileError> {
                Ok(source.replace("(): null =>", "() =>"))
            }
        }

        let (dir, plugin) = fixture();
        let plugin = plugin
            .with_compiler_factory(Arc::new(|| Ok(Arc::new(StripArrowReturnTypes) as Arc<dyn TypeCompiler>)));
        let ctx = PluginContext::default();

        for provider in ["mobile", "desktop"] {
            fs::write(
                dir.path().join(provider).join("Panel.tsx"),
                "export const Panel = (): null => null\n",
            )
            .unwrap();
        }
        let app = dir.path().join("app.jsx").display().to_string();
        plugin
            .transform("import { Panel } from './mobile/Panel'\n", &app, &ctx)
            .unwrap()
            .unwrap();

        let loaded = plugin
            .load("lazyfork-runtime/cafe01/Panel.tsx", &ctx)
            .unwrap()
            .unwrap();
        assert!(loaded
            .code
            .contains("export const Panel = L.createLazyComponent(providers, 'Panel')"));
    }

    #[test]
    fn test_load_unknown_lazy_id_defers() {
        let (_dir, plugin) = fixture();
        let ctx = PluginContext::default();
        assert!(plugin
            .load("lazyfork-runtime/cafe01/Never.jsx", &ctx)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_classification_parse_failure_is_named_error() {
        let (dir, plugin) = fixture();
        let ctx = PluginContext::default();
        let app = dir.path().join("app.jsx").display().to_string();

        plugin
            .transform(
                "import { Button } from './mobile/Button'\n",
                &app,
                &ctx,
            )
            .unwrap()
            .unwrap();

        // Break the provider copy after registration; load reads fresh.
        fs::write(
            dir.path().join("mobile/Button.jsx"),
            "export { Button\n",
        )
        .unwrap();
        let err = plugin
            .load("lazyfork-runtime/cafe01/Button.jsx", &ctx)
            .unwrap_err();
        assert!(err.message.contains("Button.jsx"));
    }

    #[test]
    fn test_container_chains_plugins() {
        let (dir, plugin) = fixture();
        let mut container = PluginContainer::new(dir.path().to_path_buf());
        container.add(Box::new(plugin));

        let app = dir.path().join("app.jsx").display().to_string();
        let out = container
            .transform("import { Button } from \"./mobile/Button\"\n", &app)
            .unwrap()
            .unwrap();
        assert_eq!(
            out.code,
            "import { Button } from \"lazyfork-runtime/cafe01/Button.jsx\"\n"
        );

        let resolved = container
            .resolve_id("lazyfork-runtime/cafe01/Button.jsx", Some(&app))
            .unwrap()
            .unwrap();
        let loaded = container.load(&resolved.id).unwrap().unwrap();
        assert!(loaded.code.contains("createLazyComponent"));
    }
}
