// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// gapbridge-runtime — Wires the module registry, lifecycle channels, event
// routing, and native dispatcher into one bridge instance and drives it from
// load to deviceready.

pub mod builtins;
pub mod events;
pub mod platform;
pub mod plugins;
pub mod runtime;

pub use events::{EventRouter, EventTarget};
pub use platform::{GenericPlatform, Platform};
pub use plugins::{PluginEntry, PluginReport};
pub use runtime::Runtime;
