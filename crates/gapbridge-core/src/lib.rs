// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// gapbridge — Core types, error definitions, configuration, and the dynamic
// object model shared across all crates.

pub mod config;
pub mod error;
pub mod types;
pub mod value;

pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
pub use types::*;
pub use value::{Function, NativeFn, Object, SlotKind, Value};
