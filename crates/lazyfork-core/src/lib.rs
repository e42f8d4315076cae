#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

//! lazyfork-core: build-time import rewriting for provider-selected lazy
//! UI modules.
//!
//! One codebase, several implementations of the same component/hook set:
//! a "mobile" and a "desktop" directory with identical filenames and
//! exports. The plugin rewrites relative imports that resolve into a
//! provider directory (and exist under *every* provider) into synthetic
//! lazy reference ids, then synthesizes virtual modules that re-export
//! wrapped bindings backed by the runtime cache.
//!
//! Hook surface is Rollup-shaped: `resolve_id` claims the runtime
//! namespace and minted lazy ids, `load` serves the runtime module and
//! synthesized lazy modules, `transform` performs the rewrite.

pub mod classify;
pub mod compiler;
pub mod config;
pub mod edit;
pub mod error;
pub mod plugin;
pub mod providers;
pub mod resolver;
pub mod rewrite;
pub mod runtime;
pub mod scan;
pub mod session;
pub mod synth;

pub use classify::{classify, ExportKind, LazyExport};
pub use compiler::{CompileError, TypeCompiler};
pub use config::LazyConfig;
pub use error::{Error, Result};
pub use plugin::{
    CompilerFactory, HookResult, LazyPlugin, LoadResult, Plugin, PluginContainer, PluginContext,
    PluginError, RedirectFn, ResolveIdResult, TransformResult,
};
pub use providers::{Provider, ProviderSet};
pub use resolver::{FsResolver, SpecifierResolver};
pub use rewrite::{lazy_reference_id, LazyModuleEntry};
pub use runtime::RUNTIME_NAMESPACE;
pub use session::SessionId;
