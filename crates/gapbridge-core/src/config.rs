// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Runtime configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Settings a host hands to the runtime before boot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeConfig {
    /// Identifier of the platform shim (e.g. "android", "blackberry10").
    pub platform_id: String,
    /// Delay after boot before unfired startup channels are reported.
    pub startup_watchdog_ms: u64,
    /// Fixed starting value for the callback id counter. `None` picks a
    /// random start so ids from a previous page load are not reused.
    pub callback_id_seed: Option<u64>,
    /// Sticky channels that must fire before `deviceready`.
    pub default_gates: Vec<String>,
    /// The native side declared itself ready before the runtime loaded.
    pub native_ready: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            platform_id: "generic".into(),
            startup_watchdog_ms: 5000,
            callback_id_seed: None,
            default_gates: vec![
                "onCordovaReady".into(),
                "onCordovaConnectionReady".into(),
                "onDOMContentLoaded".into(),
            ],
            native_ready: false,
        }
    }
}

impl BridgeConfig {
    /// Parse a config shipped by the host as JSON. Missing fields take their
    /// default values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn startup_watchdog(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.startup_watchdog_ms)
    }
}
