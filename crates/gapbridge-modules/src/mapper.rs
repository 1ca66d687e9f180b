// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Deferred symbol installation.
//
// Capability "symbols" modules declare where their exports belong
// (`clobbers`, `merges`, `defaults`) while modules are still being defined.
// Platform initialization later runs `map_modules` once against the global
// context, applying the declarations in order.

use std::cell::RefCell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use gapbridge_core::error::{BridgeError, Result};
use gapbridge_core::value::{Object, Value};
use tracing::{debug, error, info, instrument};

use crate::builder::{assign_or_wrap_deprecated, recursive_merge};
use crate::registry::{LoadReport, ModuleRegistry};

/// Property on the global context under which the pre-install values of
/// every clobbered or defaulted path are kept.
pub const ORIGINAL_SYMBOLS_KEY: &str = "__gapOriginalSymbols";

/// Installation strategy for one declared symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Always replace.
    Clobber,
    /// Union into an existing value.
    Merge,
    /// Install only where nothing is defined yet.
    Default,
}

/// One recorded declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    pub strategy: Strategy,
    pub module_id: String,
    pub symbol_path: String,
    pub deprecation: Option<String>,
}

/// Why one declaration could not be installed.
#[derive(Debug)]
pub struct SymbolFailure {
    pub symbol_path: String,
    pub error: BridgeError,
}

/// Outcome of a [`ModuleMapper::map_modules`] pass.
#[derive(Debug, Default)]
pub struct MapReport {
    pub installed: usize,
    pub merged: usize,
    pub skipped: usize,
    pub failures: Vec<SymbolFailure>,
}

/// Records symbol declarations and applies them to a global context.
pub struct ModuleMapper {
    registry: Rc<ModuleRegistry>,
    entries: RefCell<Vec<SymbolEntry>>,
}

impl ModuleMapper {
    pub fn new(registry: Rc<ModuleRegistry>) -> Self {
        Self {
            registry,
            entries: RefCell::new(Vec::new()),
        }
    }

    pub fn clobbers(&self, module_id: &str, symbol_path: &str, deprecation: Option<&str>) -> Result<()> {
        self.add_entry(Strategy::Clobber, module_id, symbol_path, deprecation)
    }

    pub fn merges(&self, module_id: &str, symbol_path: &str, deprecation: Option<&str>) -> Result<()> {
        self.add_entry(Strategy::Merge, module_id, symbol_path, deprecation)
    }

    pub fn defaults(&self, module_id: &str, symbol_path: &str, deprecation: Option<&str>) -> Result<()> {
        self.add_entry(Strategy::Default, module_id, symbol_path, deprecation)
    }

    fn add_entry(
        &self,
        strategy: Strategy,
        module_id: &str,
        symbol_path: &str,
        deprecation: Option<&str>,
    ) -> Result<()> {
        if !self.registry.is_defined(module_id) {
            return Err(BridgeError::ModuleNotFound(module_id.to_owned()));
        }
        debug!(?strategy, module = module_id, symbol = symbol_path, "symbol declared");
        self.entries.borrow_mut().push(SymbolEntry {
            strategy,
            module_id: module_id.to_owned(),
            symbol_path: symbol_path.to_owned(),
            deprecation: deprecation.map(str::to_owned),
        });
        Ok(())
    }

    /// Forget every recorded declaration.
    pub fn reset(&self) {
        self.entries.borrow_mut().clear();
    }

    pub fn entries(&self) -> Vec<SymbolEntry> {
        self.entries.borrow().clone()
    }

    /// Require every module whose id satisfies `matches`; symbol modules
    /// record their declarations as a side effect.
    pub fn load_matching_modules(&self, matches: impl Fn(&str) -> bool) -> LoadReport {
        self.registry.load_matching(matches)
    }

    /// Apply every declaration, in order, to `context`. A declaration that
    /// fails (missing module, panicking factory, blocked path) is logged and
    /// reported; the rest are still installed.
    #[instrument(skip_all, fields(entries = self.entries.borrow().len()))]
    pub fn map_modules(&self, context: &Object) -> MapReport {
        let originals = Object::new();
        crate::builder::clobber(context, ORIGINAL_SYMBOLS_KEY, Value::Object(originals.clone()));

        let entries = self.entries();
        let mut report = MapReport::default();
        for entry in &entries {
            let outcome = catch_unwind(AssertUnwindSafe(|| self.install(entry, context, &originals)))
                .unwrap_or_else(|_| {
                    Err(BridgeError::ModuleBuild {
                        id: entry.module_id.clone(),
                        reason: "factory panicked".into(),
                    })
                });
            match outcome {
                Ok(Installed::Assigned) => report.installed += 1,
                Ok(Installed::Merged) => report.merged += 1,
                Ok(Installed::Skipped) => report.skipped += 1,
                Err(e) => {
                    error!(symbol = %entry.symbol_path, module = %entry.module_id, error = %e,
                        "failed to install symbol");
                    report.failures.push(SymbolFailure {
                        symbol_path: entry.symbol_path.clone(),
                        error: e,
                    });
                }
            }
        }
        info!(
            installed = report.installed,
            merged = report.merged,
            skipped = report.skipped,
            failed = report.failures.len(),
            "modules mapped"
        );
        report
    }

    fn install(&self, entry: &SymbolEntry, context: &Object, originals: &Object) -> Result<Installed> {
        let (namespace, last_name) = match entry.symbol_path.rsplit_once('.') {
            Some((namespace, last)) => (namespace, last),
            None => ("", entry.symbol_path.as_str()),
        };
        if last_name.is_empty() {
            return Err(BridgeError::InvalidSymbolPath(entry.symbol_path.clone()));
        }

        let module = self.registry.require(&entry.module_id)?;
        let message = entry.deprecation.as_deref().map(|msg| {
            format!("Access made to deprecated symbol: {}. {msg}", entry.symbol_path)
        });
        let parent = prepare_namespace(namespace, context)
            .ok_or_else(|| BridgeError::InvalidSymbolPath(entry.symbol_path.clone()))?;
        let target = parent.get(last_name);

        if entry.strategy == Strategy::Merge && target.as_object().is_some() {
            recursive_merge(&target, &module);
            return Ok(Installed::Merged);
        }
        if entry.strategy == Strategy::Default && !target.is_nullish() {
            return Ok(Installed::Skipped);
        }
        if !originals.has(&entry.symbol_path) {
            originals.set(&entry.symbol_path, target);
        }
        assign_or_wrap_deprecated(&parent, last_name, module, message.as_deref());
        Ok(Installed::Assigned)
    }
}

enum Installed {
    Assigned,
    Merged,
    Skipped,
}

/// Walk `path` from `context`, creating empty objects for missing segments.
/// Returns `None` when a segment holds something that cannot carry
/// properties.
fn prepare_namespace(path: &str, context: &Object) -> Option<Object> {
    let mut cur = context.clone();
    for part in path.split('.').filter(|p| !p.is_empty()) {
        let next = cur.get(part);
        cur = if next.is_nullish() {
            let created = Object::new();
            cur.set(part, Value::Object(created.clone()));
            created
        } else {
            next.as_object()?
        };
    }
    Some(cur)
}

/// The value `symbol_path` held before `map_modules` touched it, or its
/// current value when the mapper never installed there.
pub fn get_original_symbol(context: &Object, symbol_path: &str) -> Value {
    if let Some(originals) = context.get(ORIGINAL_SYMBOLS_KEY).as_object() {
        if originals.has(symbol_path) {
            return originals.get(symbol_path);
        }
    }
    context.lookup(symbol_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gapbridge_core::value::SlotKind;

    fn registry_with(modules: &[(&str, Value)]) -> Rc<ModuleRegistry> {
        let registry = Rc::new(ModuleRegistry::new());
        for (id, exports) in modules {
            registry.define_value(*id, exports.clone()).expect("define");
        }
        registry
    }

    #[test]
    fn declaring_unknown_module_fails() {
        let mapper = ModuleMapper::new(Rc::new(ModuleRegistry::new()));
        let err = mapper.clobbers("cordova/plugin/none", "navigator.none", None).unwrap_err();
        assert!(matches!(err, BridgeError::ModuleNotFound(_)));
        assert!(mapper.entries().is_empty());
    }

    #[test]
    fn defaults_do_not_overwrite_existing_values() {
        let registry = registry_with(&[("cordova/plugin/geolocation", "ours".into())]);
        let mapper = ModuleMapper::new(registry);
        mapper
            .defaults("cordova/plugin/geolocation", "navigator.geolocation", None)
            .expect("declare");

        let window = Object::new();
        let navigator: Object = [("geolocation", Value::from("browser"))].into_iter().collect();
        window.set("navigator", Value::Object(navigator));

        let report = mapper.map_modules(&window);
        assert_eq!(report.skipped, 1);
        assert!(window.lookup("navigator.geolocation").same(&"browser".into()));

        let empty = Object::new();
        mapper.map_modules(&empty);
        assert!(empty.lookup("navigator.geolocation").same(&"ours".into()));
    }

    #[test]
    fn clobbers_always_install_and_remember_original() {
        let registry = registry_with(&[("cordova/plugin/File", "bridged".into())]);
        let mapper = ModuleMapper::new(registry);
        mapper.clobbers("cordova/plugin/File", "File", None).expect("declare");

        let window: Object = [("File", Value::from("host"))].into_iter().collect();
        let report = mapper.map_modules(&window);
        assert_eq!(report.installed, 1);
        assert!(window.get("File").same(&"bridged".into()));
        assert!(get_original_symbol(&window, "File").same(&"host".into()));
    }

    #[test]
    fn original_symbol_of_new_path_is_undefined() {
        let registry = registry_with(&[("cordova/plugin/compass", "compass".into())]);
        let mapper = ModuleMapper::new(registry);
        mapper
            .clobbers("cordova/plugin/compass", "navigator.compass", None)
            .expect("declare");

        let window = Object::new();
        mapper.map_modules(&window);
        assert!(get_original_symbol(&window, "navigator.compass").is_undefined());
        assert!(window.lookup("navigator.compass").same(&"compass".into()));
    }

    #[test]
    fn merges_union_into_existing_object() {
        let src: Object = [("watchHeading", Value::from("bridged"))].into_iter().collect();
        let registry = registry_with(&[("cordova/plugin/compass", Value::Object(src))]);
        let mapper = ModuleMapper::new(registry);
        mapper
            .merges("cordova/plugin/compass", "navigator.compass", None)
            .expect("declare");

        let compass: Object = [("getCurrentHeading", Value::from("host"))].into_iter().collect();
        let navigator: Object = [("compass", Value::Object(compass.clone()))].into_iter().collect();
        let window: Object = [("navigator", Value::Object(navigator))].into_iter().collect();

        let report = mapper.map_modules(&window);
        assert_eq!(report.merged, 1);
        assert!(compass.get("getCurrentHeading").same(&"host".into()));
        assert!(compass.get("watchHeading").same(&"bridged".into()));
    }

    #[test]
    fn deprecated_symbol_warns_once_then_is_plain() {
        let registry = registry_with(&[("cordova/plugin/network", "conn".into())]);
        let mapper = ModuleMapper::new(registry);
        mapper
            .clobbers("cordova/plugin/network", "navigator.network.connection", Some("Use navigator.connection."))
            .expect("declare");

        let window = Object::new();
        mapper.map_modules(&window);
        let network = window.lookup("navigator.network").as_object().expect("namespace");
        assert_eq!(network.slot_kind("connection"), Some(SlotKind::Deprecated));
        assert!(network.get("connection").same(&"conn".into()));
        assert_eq!(network.slot_kind("connection"), Some(SlotKind::Data { writable: true }));
    }

    #[test]
    fn one_broken_entry_does_not_stop_the_rest() {
        let registry = registry_with(&[("good", "ok".into())]);
        registry
            .define("panics", |_, _| panic!("factory blew up"))
            .expect("define");
        registry
            .define("errors", |_, _| Err(BridgeError::Transport("nope".into())))
            .expect("define");
        let mapper = ModuleMapper::new(registry);
        mapper.clobbers("panics", "a", None).expect("declare");
        mapper.clobbers("errors", "b", None).expect("declare");
        mapper.clobbers("good", "c", None).expect("declare");

        let window = Object::new();
        let report = mapper.map_modules(&window);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.installed, 1);
        assert!(window.get("c").same(&"ok".into()));
    }

    #[test]
    fn blocked_namespace_is_reported() {
        let registry = registry_with(&[("m", "v".into())]);
        let mapper = ModuleMapper::new(registry);
        mapper.clobbers("m", "device.name.first", None).expect("declare");

        let window: Object = [("device", Value::from(3))].into_iter().collect();
        let report = mapper.map_modules(&window);
        assert!(matches!(
            report.failures[0].error,
            BridgeError::InvalidSymbolPath(_)
        ));
    }

    #[test]
    fn reset_forgets_entries() {
        let registry = registry_with(&[("m", "v".into())]);
        let mapper = ModuleMapper::new(registry);
        mapper.defaults("m", "x", None).expect("declare");
        mapper.reset();
        let window = Object::new();
        mapper.map_modules(&window);
        assert!(window.get("x").is_undefined());
    }
}
