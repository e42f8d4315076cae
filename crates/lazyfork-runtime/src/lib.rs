#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! lazyfork-runtime: execution-time contract for lazy provider-selected
//! modules.
//!
//! The build-time plugin rewrites provider imports into virtual modules
//! whose exports are wrapped bindings. This crate is the native model of
//! what those bindings do at execution time:
//!
//! - a process-wide [`ModuleCache`] keyed by loader identity, loading each
//!   provider's copy of a module at most once per session;
//! - cooperative suspension as a typed result ([`Lazy::Pending`] carrying
//!   the in-flight load) instead of throw-based control flow;
//! - [`create_lazy_component`] / [`create_lazy_hook`] factories producing
//!   referentially-stable wrappers that consult a caller-supplied
//!   provider-selection hook on every use.

pub mod cache;
pub mod wrappers;

pub use cache::{Lazy, LoadError, LoadFuture, ModuleCache, Namespace, ProviderLoader, SharedLoad};
pub use wrappers::{
    create_lazy_component, create_lazy_hook, LazyComponent, LazyHook, ProviderLoaders,
};
