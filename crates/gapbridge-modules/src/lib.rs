// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// gapbridge-modules — The `define`/`require` container every capability is
// packaged in, and the mapper that installs module exports onto the global
// context once all modules are defined.

pub mod builder;
pub mod mapper;
pub mod registry;

pub use builder::{BuildMode, SymbolSpec};
pub use mapper::{MapReport, ModuleMapper, Strategy, SymbolEntry, get_original_symbol};
pub use registry::{Factory, LoadReport, Module, ModuleRegistry, Require};
