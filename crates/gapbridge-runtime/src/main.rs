// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// gapbridge-host — headless bridge host
//
// Boots a runtime against in-process services, the way a WebView host would
// against its native layer, and logs the startup sequence through to
// deviceready. An optional first argument names a JSON config file.

use std::rc::Rc;

use gapbridge_channel::Listener;
use gapbridge_core::config::BridgeConfig;
use gapbridge_core::error::{BridgeError, Result};
use gapbridge_core::types::CommandResult;
use gapbridge_core::value::Value;
use gapbridge_exec::{Callback, CommandProxy, NativeReply};
use gapbridge_runtime::builtins::{require_dispatcher, require_hub, require_mapper};
use gapbridge_runtime::{EventTarget, GenericPlatform, Runtime};
use serde_json::{Value as Json, json};

const DEVICE_MODULE: &str = "cordova/plugin/device";
const DEVICE_SYMBOLS_MODULE: &str = "cordova/plugin/device/symbols";
const DEVICE_INFO_GATE: &str = "onCordovaInfoReady";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("gapbridge-host starting");

    if let Err(e) = run() {
        tracing::error!(error = %e, "host failed");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let config = load_config()?;
    let platform = GenericPlatform::new(config.platform_id.clone());
    let runtime = Runtime::new(config, Box::new(host_services()), Box::new(platform))?;
    define_device_plugin(&runtime)?;

    let device = runtime.context().clone();
    runtime.events().add_event_listener(
        EventTarget::Document,
        "deviceready",
        &Listener::new(move |_| {
            tracing::info!(
                platform = ?device.lookup("device.platform").as_data(),
                model = ?device.lookup("device.model").as_data(),
                "deviceready received"
            );
        }),
    );

    runtime.boot()?;
    runtime.dom_content_loaded();
    runtime.lifecycle().cordova_connection_ready.fire(&[]);
    runtime.native_ready();
    runtime.load_plugins("[]");

    if !runtime.lifecycle().device_ready.has_fired() {
        let timer = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| BridgeError::Transport(format!("timer runtime: {e}")))?;
        let unfired = timer.block_on(runtime.watchdog());
        if !unfired.is_empty() {
            tracing::warn!(channels = ?unfired, "startup incomplete");
        }
    }
    Ok(())
}

fn load_config() -> Result<BridgeConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| BridgeError::Transport(format!("reading {path}: {e}")))?;
            BridgeConfig::from_json_str(&raw)
        }
        None => Ok(BridgeConfig::default()),
    }
}

/// In-process stand-ins for the native services the demo plugin calls.
fn host_services() -> CommandProxy {
    let proxy = CommandProxy::new();
    proxy.add("Device", "getDeviceInfo", |_| {
        Ok(NativeReply::Immediate(CommandResult::ok(json!({
            "platform": std::env::consts::OS,
            "model": "headless",
            "version": env!("CARGO_PKG_VERSION"),
        }))))
    });
    proxy
}

/// A device-info plugin: holds deviceready until the native side has
/// reported device details, then exposes them at `device.*`.
fn define_device_plugin(runtime: &Rc<Runtime>) -> Result<()> {
    runtime.registry().define(DEVICE_MODULE, |req, module| {
        let hub = require_hub(req)?;
        let dispatcher = require_dispatcher(req)?;
        let exports = module
            .exports_object()
            .ok_or_else(|| BridgeError::InvalidSymbolPath(DEVICE_MODULE.into()))?;
        hub.wait_for_initialization(DEVICE_INFO_GATE);

        let Some(cordova_ready) = hub.get("onCordovaReady") else {
            return Ok(());
        };
        cordova_ready.subscribe(&Listener::new(move |_| {
            let target = exports.clone();
            let gates = hub.clone();
            let on_info = Callback::new(move |args| {
                if let Some(Json::Object(info)) = args.first() {
                    for (key, value) in info {
                        target.set(key, Value::from(value.clone()));
                    }
                }
                gates.initialization_complete(DEVICE_INFO_GATE);
            });
            let on_error = Callback::new(|args| {
                tracing::error!(reason = ?args.first(), "could not get device info");
            });
            if let Err(e) = dispatcher.exec(Some(on_info), Some(on_error), "Device", "getDeviceInfo", vec![]) {
                tracing::error!(error = %e, "device info request failed");
            }
        }));
        Ok(())
    })?;

    runtime.registry().define(DEVICE_SYMBOLS_MODULE, |req, _| {
        require_mapper(req)?.clobbers(DEVICE_MODULE, "device", None)
    })
}
