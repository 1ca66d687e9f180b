// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// One process-scoped bridge instance.
//
// `Runtime` owns every registry the bridge needs (modules, symbol mapper,
// channels, event routing, callback table) and the global context symbols
// get installed onto. Nothing here is a file-level global, so tests can run
// any number of isolated runtimes side by side.

use std::cell::RefCell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use gapbridge_channel::{ChannelHub, Lifecycle, Listener};
use gapbridge_core::config::BridgeConfig;
use gapbridge_core::error::Result;
use gapbridge_core::value::Object;
use gapbridge_exec::{Dispatcher, NativeTransport};
use gapbridge_modules::{ModuleMapper, ModuleRegistry};
use tracing::{error, info, instrument, warn};

use crate::builtins::Builtins;
use crate::events::{EventRouter, EventTarget};
use crate::platform::Platform;
use crate::plugins::{self, PluginEntry, PluginReport};

pub struct Runtime {
    config: BridgeConfig,
    registry: Rc<ModuleRegistry>,
    mapper: Rc<ModuleMapper>,
    hub: Rc<ChannelHub>,
    lifecycle: Lifecycle,
    events: Rc<EventRouter>,
    dispatcher: Rc<Dispatcher>,
    context: Object,
    platform: Box<dyn Platform>,
}

impl Runtime {
    /// Build a runtime and define its built-in modules. Nothing runs until
    /// [`Runtime::boot`].
    pub fn new(
        config: BridgeConfig,
        transport: Box<dyn NativeTransport>,
        platform: Box<dyn Platform>,
    ) -> Result<Rc<Self>> {
        let registry = Rc::new(ModuleRegistry::new());
        let mapper = Rc::new(ModuleMapper::new(registry.clone()));
        let hub = Rc::new(ChannelHub::new());
        let lifecycle = Lifecycle::new(hub.clone(), &config.default_gates);
        let dispatcher = Rc::new(Dispatcher::from_config(transport, &config));

        let events = Rc::new(EventRouter::new(hub.clone()));
        events.route(EventTarget::Document, "pause", lifecycle.pause.clone());
        events.route(EventTarget::Document, "resume", lifecycle.resume.clone());
        events.route(
            EventTarget::Document,
            "deviceready",
            lifecycle.device_ready.clone(),
        );

        Builtins {
            hub: &hub,
            dispatcher: &dispatcher,
            mapper: &mapper,
            events: &events,
            platform_id: platform.id(),
        }
        .define(&registry)?;

        info!(
            platform = platform.id(),
            transport = dispatcher.transport_name(),
            "runtime created"
        );
        Ok(Rc::new(Self {
            config,
            registry,
            mapper,
            hub,
            lifecycle,
            events,
            dispatcher,
            context: Object::new(),
            platform,
        }))
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn registry(&self) -> &Rc<ModuleRegistry> {
        &self.registry
    }

    pub fn mapper(&self) -> &Rc<ModuleMapper> {
        &self.mapper
    }

    pub fn hub(&self) -> &Rc<ChannelHub> {
        &self.hub
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn events(&self) -> &Rc<EventRouter> {
        &self.events
    }

    pub fn dispatcher(&self) -> &Rc<Dispatcher> {
        &self.dispatcher
    }

    /// The global object symbols are installed onto.
    pub fn context(&self) -> &Object {
        &self.context
    }

    pub fn platform_id(&self) -> &str {
        self.platform.id()
    }

    // -----------------------------------------------------------------------
    // Boot
    // -----------------------------------------------------------------------

    /// Arm the startup sequence. The platform initializes once onNativeReady
    /// and onPluginsReady have fired, and `deviceready` is fired as a
    /// document event once every gate has fired after that.
    #[instrument(skip(self), fields(platform = %self.platform.id()))]
    pub fn boot(self: &Rc<Self>) -> Result<()> {
        let init = Rc::downgrade(self);
        let ready = Rc::downgrade(self);
        self.lifecycle.start(
            move || {
                if let Some(runtime) = init.upgrade() {
                    runtime.initialize_platform();
                }
            },
            move || {
                if let Some(runtime) = ready.upgrade() {
                    info!("firing deviceready");
                    runtime.events.fire_document_event("deviceready", None);
                }
            },
        )?;

        if self.config.native_ready {
            self.lifecycle.native_ready.fire(&[]);
        }
        info!("boot sequence armed");
        Ok(())
    }

    fn initialize_platform(&self) {
        let platform = self.platform.as_ref();
        match catch_unwind(AssertUnwindSafe(|| platform.initialize(self))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(platform = platform.id(), error = %e, "platform initialization failed"),
            Err(_) => error!(platform = platform.id(), "platform initialization panicked"),
        }
    }

    /// Run `f` once onCordovaReady fires (immediately if it already has).
    /// A failing or panicking constructor is logged and boot continues.
    pub fn add_constructor(&self, f: impl FnOnce() -> Result<()> + 'static) {
        let pending = RefCell::new(Some(f));
        self.lifecycle.cordova_ready.subscribe(&Listener::new(move |_| {
            let Some(f) = pending.borrow_mut().take() else {
                return;
            };
            match catch_unwind(AssertUnwindSafe(f)) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "failed to run constructor"),
                Err(_) => error!("constructor panicked"),
            }
        }));
    }

    // -----------------------------------------------------------------------
    // Host signals
    // -----------------------------------------------------------------------

    /// The host document finished parsing.
    pub fn dom_content_loaded(&self) {
        self.lifecycle.dom_content_loaded.fire(&[]);
    }

    /// The native side is ready to take commands.
    pub fn native_ready(&self) {
        self.lifecycle.native_ready.fire(&[]);
    }

    pub fn pause(&self) {
        self.events.fire_document_event("pause", None);
    }

    pub fn resume(&self) {
        self.events.fire_document_event("resume", None);
    }

    pub fn destroy(&self) {
        self.lifecycle.destroy.fire(&[]);
    }

    pub fn wait_for_initialization(&self, feature: &str) {
        self.hub.wait_for_initialization(feature);
    }

    pub fn initialization_complete(&self, feature: &str) {
        self.hub.initialization_complete(feature);
    }

    // -----------------------------------------------------------------------
    // Plugins
    // -----------------------------------------------------------------------

    /// Register the plugins in a JSON manifest and fire onPluginsReady. An
    /// unparsable manifest is logged and onPluginsReady still fires.
    pub fn load_plugins(&self, manifest_json: &str) -> PluginReport {
        match plugins::parse_manifest(manifest_json) {
            Ok(entries) => self.load_plugin_entries(&entries),
            Err(e) => {
                warn!(error = %e, "plugin manifest unreadable, continuing without plugins");
                self.lifecycle.plugins_ready.fire(&[]);
                PluginReport::default()
            }
        }
    }

    pub fn load_plugin_entries(&self, entries: &[PluginEntry]) -> PluginReport {
        let report = plugins::register_plugins(&self.registry, &self.mapper, entries);
        info!(
            loaded = report.loaded,
            ran = report.ran,
            failed = report.failed.len(),
            "plugins loaded"
        );
        self.lifecycle.plugins_ready.fire(&[]);
        report
    }

    /// Wait for the configured watchdog delay and report the startup
    /// channels still holding deviceready back.
    pub async fn watchdog(&self) -> Vec<String> {
        self.lifecycle.watchdog(self.config.startup_watchdog()).await
    }
}
