// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Startup sequencing.
//
// Boot order is fixed:
//   1. onNativeReady and onPluginsReady have both fired (any order)
//   2. the platform initializes, then onCordovaReady fires
//   3. every deviceready gate has fired (any order)
//   4. deviceready is announced
//
// A watchdog reports which channels are still holding deviceready back if
// step 4 has not happened after a timeout.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use gapbridge_core::error::{BridgeError, Result};
use tracing::{error, info, warn};

use crate::channel::{Channel, join};
use crate::hub::ChannelHub;

pub const ON_DOM_CONTENT_LOADED: &str = "onDOMContentLoaded";
pub const ON_NATIVE_READY: &str = "onNativeReady";
pub const ON_CORDOVA_READY: &str = "onCordovaReady";
pub const ON_CORDOVA_INFO_READY: &str = "onCordovaInfoReady";
pub const ON_CORDOVA_CONNECTION_READY: &str = "onCordovaConnectionReady";
pub const ON_PLUGINS_READY: &str = "onPluginsReady";
pub const ON_DEVICE_READY: &str = "onDeviceReady";
pub const ON_RESUME: &str = "onResume";
pub const ON_PAUSE: &str = "onPause";
pub const ON_DESTROY: &str = "onDestroy";

/// The standard lifecycle channels, registered on a shared hub.
#[derive(Debug)]
pub struct Lifecycle {
    hub: Rc<ChannelHub>,
    pub dom_content_loaded: Channel,
    pub native_ready: Channel,
    pub cordova_ready: Channel,
    pub cordova_info_ready: Channel,
    pub cordova_connection_ready: Channel,
    pub plugins_ready: Channel,
    pub device_ready: Channel,
    pub resume: Channel,
    pub pause: Channel,
    pub destroy: Channel,
    started: Cell<bool>,
}

impl Lifecycle {
    /// Register the standard channels on `hub` and make each name in
    /// `default_gates` a deviceready gate.
    pub fn new(hub: Rc<ChannelHub>, default_gates: &[String]) -> Self {
        let lifecycle = Self {
            dom_content_loaded: hub.create_sticky(ON_DOM_CONTENT_LOADED),
            native_ready: hub.create_sticky(ON_NATIVE_READY),
            cordova_ready: hub.create_sticky(ON_CORDOVA_READY),
            cordova_info_ready: hub.create_sticky(ON_CORDOVA_INFO_READY),
            cordova_connection_ready: hub.create_sticky(ON_CORDOVA_CONNECTION_READY),
            plugins_ready: hub.create_sticky(ON_PLUGINS_READY),
            device_ready: hub.create_sticky(ON_DEVICE_READY),
            resume: hub.create(ON_RESUME),
            pause: hub.create(ON_PAUSE),
            destroy: hub.create_sticky(ON_DESTROY),
            started: Cell::new(false),
            hub,
        };
        for gate in default_gates {
            lifecycle.hub.wait_for_initialization(gate);
        }
        lifecycle
    }

    pub fn hub(&self) -> &Rc<ChannelHub> {
        &self.hub
    }

    /// Channels the platform must see fire before it initializes.
    pub fn platform_init_channels(&self) -> [Channel; 2] {
        [self.native_ready.clone(), self.plugins_ready.clone()]
    }

    /// Arm the boot sequence. `initialize` runs once the platform channels
    /// have fired; `on_ready` runs once every deviceready gate has fired
    /// after that. Both may run before this returns if their channels have
    /// already fired.
    ///
    /// The gate set is read after `initialize`, so gates it adds still hold
    /// deviceready back.
    pub fn start(
        &self,
        initialize: impl FnOnce() + 'static,
        on_ready: impl FnOnce() + 'static,
    ) -> Result<()> {
        if self.started.replace(true) {
            return Err(BridgeError::AlreadyBooted);
        }

        let hub = self.hub.clone();
        let cordova_ready = self.cordova_ready.clone();
        join(
            move || {
                info!("platform channels fired, initializing platform");
                initialize();
                cordova_ready.fire(&[]);
                let gates = hub.device_ready_gates();
                if let Err(e) = join(on_ready, &gates) {
                    error!(error = %e, "deviceready gates cannot be joined");
                }
            },
            &self.platform_init_channels(),
        )
    }

    pub fn is_started(&self) -> bool {
        self.started.get()
    }

    /// Names of startup channels that have not fired yet: the platform
    /// channels first, then the deviceready gates in registration order.
    pub fn unfired_gates(&self) -> Vec<String> {
        self.platform_init_channels()
            .into_iter()
            .chain(self.hub.device_ready_gates())
            .filter(|c| !c.has_fired())
            .map(|c| c.kind().to_owned())
            .collect()
    }

    /// Wait `timeout`, then report the channels still holding deviceready
    /// back. Returns an empty list when deviceready has fired.
    pub async fn watchdog(&self, timeout: Duration) -> Vec<String> {
        tokio::time::sleep(timeout).await;
        if self.device_ready.has_fired() {
            return Vec::new();
        }

        let unfired = self.unfired_gates();
        warn!(
            after_ms = timeout.as_millis() as u64,
            "deviceready has not fired after {} ms",
            timeout.as_millis()
        );
        for kind in &unfired {
            warn!(channel = %kind, "channel not fired");
        }
        unfired
    }
}
