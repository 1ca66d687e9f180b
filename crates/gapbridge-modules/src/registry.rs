// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Lazy, memoized module registry with cycle detection.
//
// `define` records a factory; the first `require` of that id runs it and
// caches the exports. A stack of ids under construction catches circular
// requires and reports the full chain (`a->b->a`).

use std::cell::RefCell;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};

use gapbridge_core::error::{BridgeError, Result};
use gapbridge_core::value::{Object, Value};
use tracing::{debug, error, trace};

/// Boxed module factory. Receives a `Require` scoped to the module being
/// built, and the module record whose `exports` it fills in or replaces.
pub type Factory = Box<dyn FnOnce(&Require<'_>, &mut Module) -> Result<()>>;

/// The record a factory sees while its module is being built.
#[derive(Debug)]
pub struct Module {
    id: String,
    pub exports: Value,
}

impl Module {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The exports object, when the factory has not replaced it with
    /// something else.
    pub fn exports_object(&self) -> Option<Object> {
        match &self.exports {
            Value::Object(obj) => Some(obj.clone()),
            _ => None,
        }
    }
}

struct ModuleRecord {
    factory: Option<Factory>,
    exports: Value,
}

/// Process-scoped module table.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: RefCell<HashMap<String, ModuleRecord>>,
    /// Ids currently being built, outermost first.
    build_stack: RefCell<Vec<String>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a lazily built module.
    pub fn define(
        &self,
        id: impl Into<String>,
        factory: impl FnOnce(&Require<'_>, &mut Module) -> Result<()> + 'static,
    ) -> Result<()> {
        let id = id.into();
        let mut modules = self.modules.borrow_mut();
        if modules.contains_key(&id) {
            return Err(BridgeError::DuplicateModule(id));
        }
        trace!(module = %id, "module defined");
        modules.insert(
            id,
            ModuleRecord {
                factory: Some(Box::new(factory)),
                exports: Value::Undefined,
            },
        );
        Ok(())
    }

    /// Register a module whose exports already exist.
    pub fn define_value(&self, id: impl Into<String>, exports: Value) -> Result<()> {
        self.define(id, move |_, module| {
            module.exports = exports;
            Ok(())
        })
    }

    /// Return a module's exports, building it on first access.
    pub fn require(&self, id: &str) -> Result<Value> {
        let (factory, exports) = {
            let mut modules = self.modules.borrow_mut();
            let record = modules
                .get_mut(id)
                .ok_or_else(|| BridgeError::ModuleNotFound(id.to_owned()))?;

            let stack = self.build_stack.borrow();
            if let Some(start) = stack.iter().position(|building| building == id) {
                let chain = format!("{}->{id}", stack[start..].join("->"));
                return Err(BridgeError::Cycle { chain });
            }

            let Some(factory) = record.factory.take() else {
                return Ok(record.exports.clone());
            };
            // Seen by later requires even if the factory unwinds.
            record.exports = Value::Object(Object::new());
            (factory, record.exports.clone())
        };

        debug!(module = id, "building module");
        let mut module = Module {
            id: id.to_owned(),
            exports,
        };
        let outcome = {
            let _building = BuildGuard::push(&self.build_stack, id);
            factory(&Require { registry: self, base: id }, &mut module)
        };

        // The factory has run, successful or not; later requires see whatever
        // it exported.
        if let Some(record) = self.modules.borrow_mut().get_mut(id) {
            record.exports = module.exports.clone();
        }
        outcome.map(|()| module.exports)
    }

    /// Drop a module definition. Only meant for isolating tests.
    pub fn remove(&self, id: &str) -> bool {
        self.modules.borrow_mut().remove(id).is_some()
    }

    pub fn is_defined(&self, id: &str) -> bool {
        self.modules.borrow().contains_key(id)
    }

    /// All defined ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.modules.borrow().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Require every module whose id satisfies `matches`, in id order. A
    /// module that fails or panics is logged and skipped.
    pub fn load_matching(&self, matches: impl Fn(&str) -> bool) -> LoadReport {
        let mut report = LoadReport::default();
        for id in self.ids().into_iter().filter(|id| matches(id)) {
            let outcome = catch_unwind(AssertUnwindSafe(|| self.require(&id)))
                .unwrap_or_else(|_| Err(BridgeError::ModuleBuild {
                    id: id.clone(),
                    reason: "factory panicked".into(),
                }));
            match outcome {
                Ok(_) => report.loaded += 1,
                Err(e) => {
                    error!(module = %id, error = %e, "module failed to load");
                    report.failed.push((id, e));
                }
            }
        }
        report
    }
}

/// Outcome of [`ModuleRegistry::load_matching`].
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: usize,
    pub failed: Vec<(String, BridgeError)>,
}

/// Pops the build stack even when a factory unwinds.
struct BuildGuard<'a> {
    stack: &'a RefCell<Vec<String>>,
}

impl<'a> BuildGuard<'a> {
    fn push(stack: &'a RefCell<Vec<String>>, id: &str) -> Self {
        stack.borrow_mut().push(id.to_owned());
        Self { stack }
    }
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        self.stack.borrow_mut().pop();
    }
}

/// `require` as seen from inside a factory. Ids starting with `./` resolve
/// against the directory of the module being built.
pub struct Require<'a> {
    registry: &'a ModuleRegistry,
    base: &'a str,
}

impl Require<'_> {
    pub fn require(&self, id: &str) -> Result<Value> {
        self.registry.require(&self.resolve(id))
    }

    pub fn registry(&self) -> &ModuleRegistry {
        self.registry
    }

    fn resolve(&self, id: &str) -> String {
        match id.strip_prefix("./") {
            Some(relative) => match self.base.rfind('/') {
                Some(slash) => format!("{}/{relative}", &self.base[..slash]),
                None => relative.to_owned(),
            },
            None => id.to_owned(),
        }
    }
}
