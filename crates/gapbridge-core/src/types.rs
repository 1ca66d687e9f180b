// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Wire types shared between the dispatcher and the native transports.

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// Status code attached to every result the native side reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum CallbackStatus {
    /// Native is still working; no callback is invoked.
    NoResult = 0,
    Ok = 1,
    ClassNotFound = 2,
    IllegalAccess = 3,
    Instantiation = 4,
    MalformedUrl = 5,
    Io = 6,
    InvalidAction = 7,
    Json = 8,
    Error = 9,
}

impl CallbackStatus {
    /// Numeric code used on the wire.
    pub fn code(self) -> i64 {
        self as i64
    }

    /// Whether the status carries a failure payload.
    pub fn is_error(self) -> bool {
        !matches!(self, Self::NoResult | Self::Ok)
    }
}

impl TryFrom<i64> for CallbackStatus {
    type Error = BridgeError;

    fn try_from(code: i64) -> Result<Self, BridgeError> {
        Ok(match code {
            0 => Self::NoResult,
            1 => Self::Ok,
            2 => Self::ClassNotFound,
            3 => Self::IllegalAccess,
            4 => Self::Instantiation,
            5 => Self::MalformedUrl,
            6 => Self::Io,
            7 => Self::InvalidAction,
            8 => Self::Json,
            9 => Self::Error,
            other => return Err(BridgeError::UnknownStatus(other)),
        })
    }
}

impl From<CallbackStatus> for i64 {
    fn from(status: CallbackStatus) -> Self {
        status.code()
    }
}

impl std::fmt::Display for CallbackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NoResult => "NO_RESULT",
            Self::Ok => "OK",
            Self::ClassNotFound => "CLASS_NOT_FOUND_EXCEPTION",
            Self::IllegalAccess => "ILLEGAL_ACCESS_EXCEPTION",
            Self::Instantiation => "INSTANTIATION_EXCEPTION",
            Self::MalformedUrl => "MALFORMED_URL_EXCEPTION",
            Self::Io => "IO_EXCEPTION",
            Self::InvalidAction => "INVALID_ACTION",
            Self::Json => "JSON_EXCEPTION",
            Self::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Logical shape of an outbound call, independent of how a platform encodes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub service: String,
    pub action: String,
    pub callback_id: String,
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
}

/// Result object reported by the native side, either inline from a
/// synchronous call or later through the callback entry points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub status: CallbackStatus,
    #[serde(default)]
    pub message: serde_json::Value,
    #[serde(default)]
    pub keep_callback: bool,
}

impl CommandResult {
    pub fn ok(message: impl Into<serde_json::Value>) -> Self {
        Self {
            status: CallbackStatus::Ok,
            message: message.into(),
            keep_callback: false,
        }
    }

    pub fn error(status: CallbackStatus, message: impl Into<serde_json::Value>) -> Self {
        Self {
            status,
            message: message.into(),
            keep_callback: false,
        }
    }

    pub fn no_result() -> Self {
        Self {
            status: CallbackStatus::NoResult,
            message: serde_json::Value::Null,
            keep_callback: true,
        }
    }

    /// Keep the callback registered for further results.
    pub fn keep(mut self) -> Self {
        self.keep_callback = true;
        self
    }
}

/// What `exec` hands back to its caller.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecOutcome {
    /// The native side answered inline.
    Immediate(CommandResult),
    /// The answer will arrive later under this correlation id.
    Pending(String),
}

impl ExecOutcome {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}
