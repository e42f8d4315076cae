//! Runtime module source.
//!
//! The fixed virtual-module namespace and the ES-module text served for it.
//! The runtime keeps a module-level cache keyed by loader function and
//! suspends rendering while the selected provider's module is in flight;
//! `{{resolver}}` is substituted with the configured provider-selection
//! module at load time.

use crate::synth::escape_js_string;

/// Fixed namespace for the runtime module and all lazy reference ids.
pub const RUNTIME_NAMESPACE: &str = "lazyfork-runtime";

const RUNTIME_SOURCE: &str = r"import React from 'react'
import { useModuleProvider } from '{{resolver}}'

const cache = new Map()

function fetchExport(load, exportId) {
  let entry = cache.get(load)
  if (!entry) {
    entry = load().then(ns => {
      cache.set(load, ns)
    })
    cache.set(load, entry)
  }
  if (entry instanceof Promise) {
    throw entry
  }
  return entry[exportId]
}

export function createLazyComponent(providers, exportId) {
  const Lazy = React.forwardRef((props, ref) => {
    const active = useModuleProvider()
    const Component = fetchExport(providers[active], exportId)
    return React.createElement(Component, { ref, ...props })
  })
  Lazy.displayName = `Lazy(${exportId})`
  return Lazy
}

export function createLazyHook(providers, exportId) {
  return function useLazyExport(...args) {
    const active = useModuleProvider()
    const hook = fetchExport(providers[active], exportId)
    return hook(...args)
  }
}
";

/// Runtime module text with the resolver module path substituted.
#[must_use]
pub fn runtime_source(resolver: &str) -> String {
    RUNTIME_SOURCE.replace("{{resolver}}", &escape_js_string(resolver))
}
