// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end startup: modules, gates, native round trips, and deviceready.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use gapbridge_channel::Listener;
use gapbridge_core::config::BridgeConfig;
use gapbridge_core::error::BridgeError;
use gapbridge_core::types::{CommandResult, ExecOutcome};
use gapbridge_core::value::{Object, Value};
use gapbridge_exec::{Callback, CommandProxy, NativeReply};
use gapbridge_runtime::builtins::{require_dispatcher, require_hub, require_mapper};
use gapbridge_runtime::{EventTarget, GenericPlatform, Runtime};
use serde_json::json;

fn runtime_with(proxy: CommandProxy, config: BridgeConfig) -> Rc<Runtime> {
    Runtime::new(config, Box::new(proxy), Box::new(GenericPlatform::new("test")))
        .expect("runtime")
}

fn count_deviceready(runtime: &Runtime) -> Rc<Cell<u32>> {
    let count = Rc::new(Cell::new(0));
    let hits = count.clone();
    assert!(runtime.events().add_event_listener(
        EventTarget::Document,
        "deviceready",
        &Listener::new(move |_| hits.set(hits.get() + 1)),
    ));
    count
}

fn release_default_gates(runtime: &Runtime) {
    runtime.dom_content_loaded();
    runtime.native_ready();
    runtime.lifecycle().cordova_connection_ready.fire(&[]);
    runtime.load_plugin_entries(&[]);
}

#[test]
fn deviceready_waits_for_custom_gate_and_fires_once() {
    let runtime = runtime_with(CommandProxy::new(), BridgeConfig::default());
    let deviceready = count_deviceready(&runtime);
    runtime.wait_for_initialization("X");
    runtime.boot().expect("boot");

    release_default_gates(&runtime);
    assert_eq!(deviceready.get(), 0);
    assert_eq!(runtime.lifecycle().unfired_gates(), vec!["X"]);

    runtime.initialization_complete("X");
    assert_eq!(deviceready.get(), 1);

    runtime.initialization_complete("X");
    assert_eq!(deviceready.get(), 1);
}

#[test]
fn late_deviceready_listener_is_called_immediately() {
    let runtime = runtime_with(CommandProxy::new(), BridgeConfig::default());
    runtime.boot().expect("boot");
    release_default_gates(&runtime);

    let deviceready = count_deviceready(&runtime);
    assert_eq!(deviceready.get(), 1);
}

#[test]
fn plugin_with_deferred_native_reply_gates_deviceready() {
    // The native side parks the request; the test plays native and answers
    // later through the dispatcher.
    let parked = Rc::new(RefCell::new(None::<String>));
    let proxy = CommandProxy::new();
    {
        let parked = parked.clone();
        proxy.add("Device", "getDeviceInfo", move |cmd| {
            *parked.borrow_mut() = Some(cmd.callback_id.clone());
            Ok(NativeReply::Pending)
        });
    }
    let runtime = runtime_with(
        proxy,
        BridgeConfig {
            callback_id_seed: Some(7),
            ..BridgeConfig::default()
        },
    );

    runtime
        .registry()
        .define("cordova/plugin/device", |req, module| {
            let hub = require_hub(req)?;
            let dispatcher = require_dispatcher(req)?;
            let exports = module.exports_object().expect("object exports");
            hub.wait_for_initialization("onCordovaInfoReady");
            let gates = hub.clone();
            let outcome = dispatcher.exec(
                Some(Callback::new(move |args| {
                    exports.set("model", Value::from(args[0]["model"].clone()));
                    gates.initialization_complete("onCordovaInfoReady");
                })),
                None,
                "Device",
                "getDeviceInfo",
                vec![],
            )?;
            assert!(matches!(outcome, ExecOutcome::Pending(_)));
            Ok(())
        })
        .expect("define device");
    runtime
        .registry()
        .define("cordova/plugin/device/symbols", |req, _| {
            require_mapper(req)?.clobbers("cordova/plugin/device", "device", None)
        })
        .expect("define symbols");

    let deviceready = count_deviceready(&runtime);
    runtime.boot().expect("boot");
    release_default_gates(&runtime);

    // Platform init mapped the plugin, which issued the native request.
    let callback_id = parked.borrow().clone().expect("request reached native");
    assert_eq!(callback_id, "Device7");
    assert_eq!(deviceready.get(), 0);
    assert!(runtime.dispatcher().has_callback(&callback_id));

    runtime
        .dispatcher()
        .callback_success(&callback_id, &CommandResult::ok(json!({"model": "Q10"})));

    assert_eq!(deviceready.get(), 1);
    assert_eq!(runtime.dispatcher().pending_count(), 0);
    assert!(runtime.context().lookup("device.model").same(&"Q10".into()));
}

#[test]
fn manifest_plugins_are_mapped_at_platform_init() {
    let runtime = runtime_with(CommandProxy::new(), BridgeConfig::default());
    runtime
        .registry()
        .define_value("org.example.battery.battery", json!({"level": 100}).into())
        .expect("define battery");
    let extras: Object = [("watchHeading", Value::from("fn"))].into_iter().collect();
    runtime
        .registry()
        .define_value("org.example.compass.extras", Value::Object(extras))
        .expect("define compass extras");
    let compass: Object = [("getCurrentHeading", Value::from("native"))]
        .into_iter()
        .collect();
    let navigator: Object = [("compass", Value::Object(compass.clone()))]
        .into_iter()
        .collect();
    runtime.context().set("navigator", Value::Object(navigator));

    runtime.boot().expect("boot");
    runtime.dom_content_loaded();
    runtime.native_ready();
    runtime.lifecycle().cordova_connection_ready.fire(&[]);
    let report = runtime.load_plugins(
        r#"[
            {"id": "org.example.battery.battery", "clobbers": ["navigator.battery"]},
            {"id": "org.example.compass.extras", "merges": ["navigator.compass"]},
            {"id": "org.example.missing", "clobbers": ["navigator.missing"]}
        ]"#,
    );
    assert_eq!(report.loaded, 2);
    assert_eq!(report.failed.len(), 1);

    let context = runtime.context();
    assert_eq!(
        context.lookup("navigator.battery").as_data(),
        Some(&json!({"level": 100}))
    );
    // Merged into the host's compass, keeping what it already had.
    assert!(context.lookup("navigator.compass").same(&Value::Object(compass.clone())));
    assert!(compass.get("getCurrentHeading").same(&"native".into()));
    assert!(compass.get("watchHeading").same(&"fn".into()));
    assert!(runtime.lifecycle().device_ready.has_fired());
}

#[test]
fn broken_symbol_module_does_not_block_other_plugins() {
    let platform = GenericPlatform::new("test").clobber("org.example.missing", "missing");
    let runtime = Runtime::new(
        BridgeConfig::default(),
        Box::new(CommandProxy::new()),
        Box::new(platform),
    )
    .expect("runtime");
    runtime
        .registry()
        .define("a/symbols", |_, _| Err(BridgeError::Transport("bad symbols".into())))
        .expect("define broken symbols");
    runtime
        .registry()
        .define_value("plugin/good", "good".into())
        .expect("define plugin");
    runtime
        .registry()
        .define("b/symbols", |req, _| {
            require_mapper(req)?.clobbers("plugin/good", "good", None)
        })
        .expect("define symbols");

    runtime.boot().expect("boot");
    release_default_gates(&runtime);

    assert!(runtime.lifecycle().device_ready.has_fired());
    assert!(runtime.context().lookup("good").same(&"good".into()));
}

#[tokio::test(start_paused = true)]
async fn watchdog_names_stalled_channels() {
    let runtime = runtime_with(CommandProxy::new(), BridgeConfig::default());
    runtime.boot().expect("boot");
    runtime.native_ready();

    let unfired = runtime.watchdog().await;
    assert_eq!(
        unfired,
        vec![
            "onPluginsReady",
            "onCordovaReady",
            "onCordovaConnectionReady",
            "onDOMContentLoaded"
        ]
    );
    assert_eq!(runtime.config().startup_watchdog(), Duration::from_millis(5000));
}
