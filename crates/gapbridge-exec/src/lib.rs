// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// gapbridge-exec — The command/result protocol at the native boundary.
//
// `Dispatcher` owns the callback table and talks to the native layer through
// a `NativeTransport`. Hosts plug in their own transport; `CommandProxy`
// serves commands from in-process handlers, and `StubTransport` is what you
// get when nothing native is attached.

pub mod dispatcher;
pub mod proxy;
pub mod stub;
pub mod traits;
pub mod wire;

pub use dispatcher::{Callback, Dispatcher};
pub use proxy::{CommandProxy, ServiceHandler};
pub use traits::{NativeReply, NativeTransport};
pub use wire::WireFormat;

/// Default transport for the current build.
///
/// Native hosts construct their own transport and pass it to the runtime;
/// without one, every command fails with `PlatformUnavailable`.
pub fn platform_transport() -> Box<dyn traits::NativeTransport> {
    Box::new(stub::StubTransport)
}
