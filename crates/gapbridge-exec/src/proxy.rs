// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-process command handlers.
//
// Hosts that implement services in Rust register a handler per
// service/action pair. A handler answers inline or returns
// `NativeReply::Pending` and completes later through the dispatcher using
// the command's callback id. Commands with no handler can be forwarded to a
// fallback transport, so a proxy can sit in front of a real native layer and
// serve only the actions it knows.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use gapbridge_core::error::Result;
use gapbridge_core::types::{CallbackStatus, Command, CommandResult};
use tracing::{debug, error};

use crate::traits::{NativeReply, NativeTransport};

/// Handler for one service action.
pub type ServiceHandler = Rc<dyn Fn(&Command) -> Result<NativeReply>>;

/// Table of in-process handlers keyed by service then action.
#[derive(Default)]
pub struct CommandProxy {
    services: RefCell<HashMap<String, HashMap<String, ServiceHandler>>>,
    fallback: Option<Box<dyn NativeTransport>>,
}

impl CommandProxy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward commands without a handler to `fallback` instead of failing
    /// them with `CLASS_NOT_FOUND_EXCEPTION`.
    pub fn with_fallback(fallback: Box<dyn NativeTransport>) -> Self {
        Self {
            services: RefCell::default(),
            fallback: Some(fallback),
        }
    }

    /// Register (or replace) the handler for `service.action`.
    pub fn add(
        &self,
        service: &str,
        action: &str,
        handler: impl Fn(&Command) -> Result<NativeReply> + 'static,
    ) {
        self.services
            .borrow_mut()
            .entry(service.to_owned())
            .or_default()
            .insert(action.to_owned(), Rc::new(handler));
    }

    /// Remove one action. Returns whether it was registered.
    pub fn remove(&self, service: &str, action: &str) -> bool {
        let mut services = self.services.borrow_mut();
        let Some(actions) = services.get_mut(service) else {
            return false;
        };
        let removed = actions.remove(action).is_some();
        if actions.is_empty() {
            services.remove(service);
        }
        removed
    }

    pub fn get(&self, service: &str, action: &str) -> Option<ServiceHandler> {
        self.services
            .borrow()
            .get(service)
            .and_then(|actions| actions.get(action))
            .cloned()
    }
}

impl NativeTransport for CommandProxy {
    fn platform_name(&self) -> &str {
        "in-process proxy"
    }

    fn send(&self, command: &Command) -> Result<NativeReply> {
        // Clone the handler out so it may register or remove handlers itself.
        let Some(handler) = self.get(&command.service, &command.action) else {
            if let Some(fallback) = &self.fallback {
                debug!(
                    service = %command.service,
                    action = %command.action,
                    transport = fallback.platform_name(),
                    "no proxy handler, forwarding"
                );
                return fallback.send(command);
            }
            return Ok(NativeReply::Immediate(CommandResult::error(
                CallbackStatus::ClassNotFound,
                format!("Missing Command Error: {}.{}", command.service, command.action),
            )));
        };

        match handler(command) {
            Ok(reply) => Ok(reply),
            Err(e) => {
                error!(
                    service = %command.service,
                    action = %command.action,
                    error = %e,
                    "proxy handler failed"
                );
                Ok(NativeReply::Immediate(CommandResult::error(
                    CallbackStatus::Error,
                    format!("Exception calling {}::{}: {e}", command.service, command.action),
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use gapbridge_core::error::BridgeError;
    use serde_json::json;

    use super::*;
    use crate::stub::StubTransport;

    fn command(service: &str, action: &str) -> Command {
        Command {
            service: service.into(),
            action: action.into(),
            callback_id: format!("{service}1"),
            args: vec![json!("x")],
        }
    }

    #[test]
    fn registered_handler_answers() {
        let proxy = CommandProxy::new();
        proxy.add("Echo", "echo", |cmd| {
            Ok(NativeReply::Immediate(CommandResult::ok(cmd.args[0].clone())))
        });
        let reply = proxy.send(&command("Echo", "echo")).expect("send");
        assert_eq!(reply, NativeReply::Immediate(CommandResult::ok("x")));
    }

    #[test]
    fn missing_handler_is_class_not_found() {
        let proxy = CommandProxy::new();
        match proxy.send(&command("Nope", "nothing")).expect("send") {
            NativeReply::Immediate(result) => {
                assert_eq!(result.status, CallbackStatus::ClassNotFound)
            }
            NativeReply::Pending => panic!("expected an inline error"),
        }
    }

    #[test]
    fn failing_handler_becomes_error_result() {
        let proxy = CommandProxy::new();
        proxy.add("File", "read", |_| Err(BridgeError::Transport("disk gone".into())));
        match proxy.send(&command("File", "read")).expect("send") {
            NativeReply::Immediate(result) => {
                assert_eq!(result.status, CallbackStatus::Error);
                assert!(result.message.as_str().unwrap_or_default().contains("disk gone"));
            }
            NativeReply::Pending => panic!("expected an inline error"),
        }
    }

    #[test]
    fn unknown_actions_go_to_fallback() {
        let proxy = CommandProxy::with_fallback(Box::new(StubTransport));
        proxy.add("Device", "getDeviceInfo", |_| Ok(NativeReply::Pending));
        assert_eq!(
            proxy.send(&command("Device", "getDeviceInfo")).expect("send"),
            NativeReply::Pending
        );
        assert!(matches!(
            proxy.send(&command("Camera", "takePicture")),
            Err(BridgeError::PlatformUnavailable)
        ));
    }

    #[test]
    fn remove_drops_empty_services() {
        let proxy = CommandProxy::new();
        proxy.add("Accel", "start", |_| Ok(NativeReply::Pending));
        assert!(proxy.get("Accel", "start").is_some());
        assert!(proxy.remove("Accel", "start"));
        assert!(!proxy.remove("Accel", "start"));
        assert!(proxy.services.borrow().is_empty());
    }
}
