// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Low-level symbol installation primitives.
//
// `clobber` assigns and falls back to a getter override when assignment is
// refused; `recursive_merge` unions properties into an existing target;
// `build_into` installs a nested tree of symbol declarations in one pass.

use std::collections::BTreeMap;

use gapbridge_core::error::{BridgeError, Result};
use gapbridge_core::value::{Object, Value};
use serde::Deserialize;
use tracing::error;

use crate::registry::ModuleRegistry;

/// Assign `value` to `obj[key]`. Read-only and accessor-backed properties
/// cannot be assigned, so those get replaced by a getter instead.
pub fn clobber(obj: &Object, key: &str, value: Value) {
    if !obj.set(key, value.clone()) {
        obj.define_getter(key, value);
    }
}

/// Install `value` at `obj[key]`, wrapping it in a one-shot deprecation
/// warning when `message` is given.
pub fn assign_or_wrap_deprecated(obj: &Object, key: &str, value: Value, message: Option<&str>) {
    match message {
        Some(message) => obj.define_deprecated(key, value, message),
        None => clobber(obj, key, value),
    }
}

/// Copy every property of `src` onto `target`, recursing where both sides
/// hold objects. Properties of `target` missing from `src` are kept. A
/// constructor target receives the properties on its prototype.
pub fn recursive_merge(target: &Value, src: &Value) {
    let Some(src_props) = src.as_object() else {
        return;
    };

    if let Some(prototype) = target.as_function().and_then(|f| f.prototype()) {
        for key in src_props.keys() {
            clobber(prototype, &key, src_props.get(&key));
        }
        return;
    }

    let Some(target_props) = target.as_object() else {
        return;
    };
    for key in src_props.keys() {
        let incoming = src_props.get(&key);
        let existing = target_props.get(&key);
        match (&existing, &incoming) {
            (Value::Object(_), Value::Object(_)) => recursive_merge(&existing, &incoming),
            _ => clobber(&target_props, &key, incoming),
        }
    }
}

// ---------------------------------------------------------------------------
// Declarative symbol trees
// ---------------------------------------------------------------------------

/// One node of a declarative symbol tree: optionally the module to install
/// at this key, plus nested keys to build inside it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SymbolSpec {
    /// Module id whose exports go here. Without one, an empty object is used.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub children: BTreeMap<String, SymbolSpec>,
    #[serde(default)]
    pub deprecated: Option<String>,
}

/// How [`build_into`] treats keys that already hold a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// Keep existing values and build children into them.
    DoNotClobber,
    /// Replace existing values that have a module path.
    Clobber,
    /// Merge module exports into existing values.
    Merge,
}

/// Install a symbol tree onto `target`. A failure on one key is logged and
/// the remaining keys are still built.
pub fn build_into(
    registry: &ModuleRegistry,
    objects: &BTreeMap<String, SymbolSpec>,
    target: &Object,
    mode: BuildMode,
) {
    for (key, node) in objects {
        if let Err(e) = include(registry, target, key, node, mode) {
            error!(key = %key, error = %e, "exception building globals");
        }
    }
}

pub fn build_into_but_do_not_clobber(
    registry: &ModuleRegistry,
    objects: &BTreeMap<String, SymbolSpec>,
    target: &Object,
) {
    build_into(registry, objects, target, BuildMode::DoNotClobber);
}

pub fn build_into_and_clobber(
    registry: &ModuleRegistry,
    objects: &BTreeMap<String, SymbolSpec>,
    target: &Object,
) {
    build_into(registry, objects, target, BuildMode::Clobber);
}

pub fn build_into_and_merge(
    registry: &ModuleRegistry,
    objects: &BTreeMap<String, SymbolSpec>,
    target: &Object,
) {
    build_into(registry, objects, target, BuildMode::Merge);
}

fn include(
    registry: &ModuleRegistry,
    parent: &Object,
    key: &str,
    node: &SymbolSpec,
    mode: BuildMode,
) -> Result<()> {
    let module = match &node.path {
        Some(path) => registry.require(path)?,
        None => Value::Object(Object::new()),
    };
    let deprecated = node.deprecated.as_deref();
    let existing = parent.get(key);

    let result = if existing.is_undefined() {
        assign_or_wrap_deprecated(parent, key, module.clone(), deprecated);
        module
    } else if mode == BuildMode::DoNotClobber || node.path.is_none() {
        existing
    } else if mode == BuildMode::Merge {
        recursive_merge(&existing, &module);
        existing
    } else {
        assign_or_wrap_deprecated(parent, key, module.clone(), deprecated);
        module
    };

    if !node.children.is_empty() {
        let holder = result
            .as_object()
            .ok_or_else(|| BridgeError::InvalidSymbolPath(key.to_owned()))?;
        build_into(registry, &node.children, &holder, mode);
    }
    Ok(())
}
