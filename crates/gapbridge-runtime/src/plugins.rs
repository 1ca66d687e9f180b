// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Plugin manifest loading.
//
// A manifest lists the plugin modules a host ships and where each one is
// installed. Loading records the installations with the mapper (or runs the
// module outright) and then fires onPluginsReady, which deviceready waits
// on. A broken entry is skipped, never fatal.

use gapbridge_core::error::Result;
use gapbridge_modules::{ModuleMapper, ModuleRegistry};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One plugin module declared by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginEntry {
    /// Module id the plugin's code was defined under.
    pub id: String,
    /// Source location, informational only.
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub clobbers: Vec<String>,
    #[serde(default)]
    pub merges: Vec<String>,
    /// Require the module at load time. Ignored when the entry has clobbers
    /// or merges, since mapping requires it anyway.
    #[serde(default)]
    pub runs: bool,
}

/// What a manifest load did.
#[derive(Debug, Default)]
pub struct PluginReport {
    /// Entries whose declarations were all recorded (or that ran).
    pub loaded: usize,
    /// Entries required immediately because of `runs`.
    pub ran: usize,
    /// `(plugin id, error)` for every skipped entry.
    pub failed: Vec<(String, String)>,
}

pub fn parse_manifest(json: &str) -> Result<Vec<PluginEntry>> {
    Ok(serde_json::from_str(json)?)
}

/// Record every entry's installations with `mapper`, requiring `runs`
/// modules directly.
pub fn register_plugins(
    registry: &ModuleRegistry,
    mapper: &ModuleMapper,
    entries: &[PluginEntry],
) -> PluginReport {
    let mut report = PluginReport::default();
    for entry in entries {
        match register_one(registry, mapper, entry) {
            Ok(ran) => {
                report.loaded += 1;
                if ran {
                    report.ran += 1;
                }
                debug!(plugin = %entry.id, ran, "plugin registered");
            }
            Err(e) => {
                warn!(plugin = %entry.id, error = %e, "plugin skipped");
                report.failed.push((entry.id.clone(), e.to_string()));
            }
        }
    }
    report
}

fn register_one(registry: &ModuleRegistry, mapper: &ModuleMapper, entry: &PluginEntry) -> Result<bool> {
    for path in &entry.clobbers {
        mapper.clobbers(&entry.id, path, None)?;
    }
    for path in &entry.merges {
        mapper.merges(&entry.id, path, None)?;
    }
    if entry.runs && entry.clobbers.is_empty() && entry.merges.is_empty() {
        registry.require(&entry.id)?;
        return Ok(true);
    }
    Ok(false)
}
