// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for gapbridge.

use thiserror::Error;

/// Top-level error type for all gapbridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    // -- Module registry --
    #[error("module {0} not found")]
    ModuleNotFound(String),

    #[error("module {0} already defined")]
    DuplicateModule(String),

    #[error("cycle in require graph: {chain}")]
    Cycle { chain: String },

    #[error("module {id} failed to build: {reason}")]
    ModuleBuild { id: String, reason: String },

    // -- Symbol installation --
    #[error("cannot install symbol at {0}")]
    InvalidSymbolPath(String),

    // -- Channels --
    #[error("can only use join with sticky channels (got {0})")]
    NonStickyJoin(String),

    #[error("runtime already booted")]
    AlreadyBooted,

    // -- Native bridge --
    #[error("unknown callback status code: {0}")]
    UnknownStatus(i64),

    #[error("malformed native command: {0}")]
    MalformedCommand(String),

    #[error("native transport error: {0}")]
    Transport(String),

    #[error("{service}.{action} failed: {message}")]
    CommandFailed {
        service: String,
        action: String,
        message: String,
    },

    #[error("callback for {0} panicked")]
    CallbackPanicked(String),

    #[error("no native layer available on this platform")]
    PlatformUnavailable,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BridgeError>;
