// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Named channel table plus the set of gates that must fire before the
// runtime announces readiness.

use std::cell::RefCell;
use std::collections::HashMap;

use tracing::debug;

use crate::channel::Channel;

/// Every named channel in the runtime, and the deviceready gate set.
#[derive(Debug, Default)]
pub struct ChannelHub {
    channels: RefCell<HashMap<String, Channel>>,
    /// Gates in registration order.
    gates: RefCell<Vec<Channel>>,
    gates_by_feature: RefCell<HashMap<String, Channel>>,
}

impl ChannelHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a plain channel under `kind`, replacing any existing one.
    pub fn create(&self, kind: &str) -> Channel {
        self.insert(Channel::new(kind))
    }

    /// Create a sticky channel under `kind`, replacing any existing one.
    pub fn create_sticky(&self, kind: &str) -> Channel {
        self.insert(Channel::sticky(kind))
    }

    fn insert(&self, channel: Channel) -> Channel {
        self.channels
            .borrow_mut()
            .insert(channel.kind().to_owned(), channel.clone());
        channel
    }

    pub fn get(&self, kind: &str) -> Option<Channel> {
        self.channels.borrow().get(kind).cloned()
    }

    /// Add `feature` to the deviceready gate set. An existing channel of
    /// that name is reused; otherwise a sticky one is created.
    pub fn wait_for_initialization(&self, feature: &str) {
        if feature.is_empty() || self.gates_by_feature.borrow().contains_key(feature) {
            return;
        }
        let channel = match self.get(feature) {
            Some(channel) => channel,
            None => self.create_sticky(feature),
        };
        debug!(feature, "waiting for initialization");
        self.gates_by_feature
            .borrow_mut()
            .insert(feature.to_owned(), channel.clone());
        self.gates.borrow_mut().push(channel);
    }

    /// Fire the gate registered for `feature`. Unknown features are ignored.
    pub fn initialization_complete(&self, feature: &str) {
        let gate = self.gates_by_feature.borrow().get(feature).cloned();
        if let Some(gate) = gate {
            debug!(feature, "initialization complete");
            gate.fire(&[]);
        }
    }

    /// Snapshot of the current gate set.
    pub fn device_ready_gates(&self) -> Vec<Channel> {
        self.gates.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_replaces_existing_channel() {
        let hub = ChannelHub::new();
        let first = hub.create("onResume");
        let second = hub.create("onResume");
        assert!(!first.ptr_eq(&second));
        assert!(hub.get("onResume").expect("registered").ptr_eq(&second));
    }

    #[test]
    fn wait_for_initialization_creates_sticky_gate_once() {
        let hub = ChannelHub::new();
        hub.wait_for_initialization("onCordovaInfoReady");
        hub.wait_for_initialization("onCordovaInfoReady");

        let gates = hub.device_ready_gates();
        assert_eq!(gates.len(), 1);
        assert!(gates[0].is_sticky());
        assert!(!gates[0].has_fired());

        hub.initialization_complete("onCordovaInfoReady");
        assert!(gates[0].has_fired());
    }

    #[test]
    fn wait_for_initialization_reuses_named_channel() {
        let hub = ChannelHub::new();
        let existing = hub.create_sticky("onDOMContentLoaded");
        hub.wait_for_initialization("onDOMContentLoaded");
        assert!(hub.device_ready_gates()[0].ptr_eq(&existing));
    }

    #[test]
    fn unknown_feature_completion_is_ignored() {
        let hub = ChannelHub::new();
        hub.initialization_complete("never-registered");
        assert!(hub.device_ready_gates().is_empty());
    }
}
