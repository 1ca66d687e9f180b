// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform shims.
//
// A platform runs once the native side and the plugins are ready, and is
// where module exports get installed onto the global context. Anything it
// adds to the deviceready gate set still holds deviceready back.

use gapbridge_core::error::Result;
use tracing::{error, info};

use crate::runtime::Runtime;

/// Host-specific initialization hook.
pub trait Platform {
    /// Identifier such as "android" or "blackberry10".
    fn id(&self) -> &str;

    /// Install symbols and host specifics. Errors are logged by the runtime
    /// and boot continues.
    fn initialize(&self, runtime: &Runtime) -> Result<()>;
}

/// Loads every `*/symbols` module, applies any extra declarations, then
/// maps all recorded installations onto the runtime's global context.
#[derive(Debug, Clone)]
pub struct GenericPlatform {
    id: String,
    clobbers: Vec<(String, String)>,
    merges: Vec<(String, String)>,
}

impl GenericPlatform {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            clobbers: Vec::new(),
            merges: Vec::new(),
        }
    }

    /// Install `module_id` at `symbol_path`, replacing what is there.
    pub fn clobber(mut self, module_id: &str, symbol_path: &str) -> Self {
        self.clobbers.push((module_id.to_owned(), symbol_path.to_owned()));
        self
    }

    /// Merge `module_id` into whatever lives at `symbol_path`.
    pub fn merge(mut self, module_id: &str, symbol_path: &str) -> Self {
        self.merges.push((module_id.to_owned(), symbol_path.to_owned()));
        self
    }
}

impl Platform for GenericPlatform {
    fn id(&self) -> &str {
        &self.id
    }

    fn initialize(&self, runtime: &Runtime) -> Result<()> {
        let mapper = runtime.mapper();
        let loaded = mapper.load_matching_modules(|id| id.ends_with("/symbols"));
        let mut rejected = 0;
        for (module_id, path) in &self.clobbers {
            if let Err(e) = mapper.clobbers(module_id, path, None) {
                error!(module = %module_id, symbol = %path, error = %e, "clobber rejected");
                rejected += 1;
            }
        }
        for (module_id, path) in &self.merges {
            if let Err(e) = mapper.merges(module_id, path, None) {
                error!(module = %module_id, symbol = %path, error = %e, "merge rejected");
                rejected += 1;
            }
        }

        let report = mapper.map_modules(runtime.context());
        info!(
            platform = %self.id,
            symbol_modules = loaded.loaded,
            symbol_module_failures = loaded.failed.len(),
            rejected,
            installed = report.installed,
            failures = report.failures.len(),
            "platform initialized"
        );
        Ok(())
    }
}
