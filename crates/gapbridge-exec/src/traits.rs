// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic seam between the dispatcher and the native layer.
//
// Each host embeds the runtime differently (a JNI call, a URL the WebView
// intercepts, an in-process handler table), but every one of them accepts
// the same logical command and answers either inline or later.

use gapbridge_core::error::Result;
use gapbridge_core::types::{Command, CommandResult};

/// What the native layer says when it receives a command.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeReply {
    /// Answered inline.
    Immediate(CommandResult),
    /// The result will arrive later through the dispatcher's callback entry
    /// points, tagged with the command's callback id.
    Pending,
}

/// Hands commands to the native layer.
///
/// Returning `Err` means the command never reached the native side; the
/// dispatcher drops the stored callbacks for it.
pub trait NativeTransport {
    /// Human-readable name (e.g. "blackberry10", "in-process proxy").
    fn platform_name(&self) -> &str;

    /// Deliver one command.
    fn send(&self, command: &Command) -> Result<NativeReply>;
}

impl<T: NativeTransport + ?Sized> NativeTransport for Box<T> {
    fn platform_name(&self) -> &str {
        (**self).platform_name()
    }

    fn send(&self, command: &Command) -> Result<NativeReply> {
        (**self).send(command)
    }
}

impl<T: NativeTransport + ?Sized> NativeTransport for std::rc::Rc<T> {
    fn platform_name(&self) -> &str {
        (**self).platform_name()
    }

    fn send(&self, command: &Command) -> Result<NativeReply> {
        (**self).send(command)
    }
}
