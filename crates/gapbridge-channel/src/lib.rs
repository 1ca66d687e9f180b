// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// gapbridge-channel — Publish/subscribe channels, the named channel hub, and
// the startup sequence that gates `deviceready`.

pub mod channel;
pub mod hub;
pub mod lifecycle;

pub use channel::{Channel, ChannelState, Listener, join};
pub use hub::ChannelHub;
pub use lifecycle::Lifecycle;
