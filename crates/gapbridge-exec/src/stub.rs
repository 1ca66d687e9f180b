// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub transport for desktop/CI builds where no native layer is attached.
//
// Every command fails with `PlatformUnavailable`; hosts that want in-process
// services use `CommandProxy` instead.

use gapbridge_core::error::{BridgeError, Result};
use gapbridge_core::types::Command;

use crate::traits::{NativeReply, NativeTransport};

/// No-op transport returned when nothing native is available.
pub struct StubTransport;

impl NativeTransport for StubTransport {
    fn platform_name(&self) -> &str {
        "Desktop (stub)"
    }

    fn send(&self, command: &Command) -> Result<NativeReply> {
        tracing::warn!(
            service = %command.service,
            action = %command.action,
            "NativeTransport::send called on stub transport"
        );
        Err(BridgeError::PlatformUnavailable)
    }
}
