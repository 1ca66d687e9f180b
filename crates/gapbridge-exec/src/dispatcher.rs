// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command dispatch and result delivery.
//
// `exec` tags every outbound command with a correlation id
// (`service + counter`), parks the caller's success/fail pair under that id,
// and hands the command to the transport. Results come back either inline
// from the transport or later through `callback_from_native`, which routes
// on the status code and drops the pair unless the native side asked to keep
// it for further results.
//
// Caller callbacks are third-party code. A panicking callback is logged and
// contained; the callback table stays consistent either way.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use gapbridge_core::config::BridgeConfig;
use gapbridge_core::error::{BridgeError, Result};
use gapbridge_core::types::{CallbackStatus, Command, CommandResult, ExecOutcome};
use rand::Rng;
use serde_json::Value as Json;
use tokio::sync::oneshot;
use tracing::{debug, error, trace, warn};

use crate::traits::{NativeReply, NativeTransport};

/// Upper bound (exclusive) of the random callback counter start.
const RANDOM_SEED_CEILING: u64 = 2_000_000_000;

/// A success or failure callback. Receives the result message as its
/// argument list.
#[derive(Clone)]
pub struct Callback(Rc<dyn Fn(&[Json])>);

impl Callback {
    pub fn new(f: impl Fn(&[Json]) + 'static) -> Self {
        Self(Rc::new(f))
    }

    fn call(&self, args: &[Json]) {
        (self.0)(args)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback")
    }
}

#[derive(Debug, Clone, Default)]
struct CallbackPair {
    success: Option<Callback>,
    fail: Option<Callback>,
}

/// Routes commands out and results back in.
pub struct Dispatcher {
    transport: Box<dyn NativeTransport>,
    next_id: Cell<u64>,
    callbacks: RefCell<HashMap<String, CallbackPair>>,
}

impl Dispatcher {
    /// `seed` fixes the first counter value; `None` starts at a random value
    /// so ids from an earlier page load are not reused.
    pub fn new(transport: Box<dyn NativeTransport>, seed: Option<u64>) -> Self {
        let start = seed.unwrap_or_else(|| rand::thread_rng().gen_range(0..RANDOM_SEED_CEILING));
        debug!(
            transport = transport.platform_name(),
            start, "dispatcher created"
        );
        Self {
            transport,
            next_id: Cell::new(start),
            callbacks: RefCell::new(HashMap::new()),
        }
    }

    pub fn from_config(transport: Box<dyn NativeTransport>, config: &BridgeConfig) -> Self {
        Self::new(transport, config.callback_id_seed)
    }

    pub fn transport_name(&self) -> &str {
        self.transport.platform_name()
    }

    fn next_callback_id(&self, service: &str) -> String {
        let n = self.next_id.get();
        self.next_id.set(n.wrapping_add(1));
        format!("{service}{n}")
    }

    /// Send `service.action(args)` to the native layer.
    ///
    /// Callbacks are only stored when at least one is given. An inline answer
    /// is delivered to them before this returns, and is also handed back as
    /// `ExecOutcome::Immediate`. If the transport fails, the stored pair is
    /// dropped and the error returned.
    pub fn exec(
        &self,
        success: Option<Callback>,
        fail: Option<Callback>,
        service: &str,
        action: &str,
        args: Vec<Json>,
    ) -> Result<ExecOutcome> {
        let callback_id = self.next_callback_id(service);
        if success.is_some() || fail.is_some() {
            self.callbacks
                .borrow_mut()
                .insert(callback_id.clone(), CallbackPair { success, fail });
        }

        let command = Command {
            service: service.to_owned(),
            action: action.to_owned(),
            callback_id: callback_id.clone(),
            args,
        };
        debug!(service, action, callback_id = %callback_id, "exec");

        let reply = match self.transport.send(&command) {
            Ok(reply) => reply,
            Err(e) => {
                self.callbacks.borrow_mut().remove(&callback_id);
                warn!(service, action, error = %e, "exec failed to reach native layer");
                return Err(e);
            }
        };

        match reply {
            NativeReply::Pending => Ok(ExecOutcome::Pending(callback_id)),
            NativeReply::Immediate(result) => {
                let succeeded = matches!(
                    result.status,
                    CallbackStatus::Ok | CallbackStatus::NoResult
                );
                self.callback_from_native(
                    &callback_id,
                    succeeded,
                    result.status,
                    std::slice::from_ref(&result.message),
                    result.keep_callback,
                );
                Ok(ExecOutcome::Immediate(result))
            }
        }
    }

    /// Deliver a result to the callbacks stored under `callback_id`.
    ///
    /// `success && status == OK` calls the success callback, `!success` calls
    /// the fail callback, and `NO_RESULT` calls neither. The entry is removed
    /// unless `keep_callback` is set. Unknown ids are ignored.
    pub fn callback_from_native(
        &self,
        callback_id: &str,
        success: bool,
        status: CallbackStatus,
        args: &[Json],
        keep_callback: bool,
    ) {
        // Release the table before calling out: callbacks may exec again.
        let pair = self.callbacks.borrow().get(callback_id).cloned();
        let Some(pair) = pair else {
            trace!(callback_id, "result for unknown callback id ignored");
            return;
        };

        let target = if status == CallbackStatus::NoResult {
            None
        } else if success && status == CallbackStatus::Ok {
            pair.success
        } else if !success {
            pair.fail
        } else {
            None
        };

        if let Some(callback) = target {
            if catch_unwind(AssertUnwindSafe(|| callback.call(args))).is_err() {
                let which = if success { "success" } else { "error" };
                error!(
                    callback_id,
                    status = %status,
                    error = %BridgeError::CallbackPanicked(callback_id.to_owned()),
                    "error in {which} callback"
                );
            }
        }

        if !keep_callback {
            self.callbacks.borrow_mut().remove(callback_id);
        }
    }

    /// Deliver a successful result.
    pub fn callback_success(&self, callback_id: &str, result: &CommandResult) {
        self.callback_from_native(
            callback_id,
            true,
            result.status,
            std::slice::from_ref(&result.message),
            result.keep_callback,
        );
    }

    /// Deliver a failed result.
    pub fn callback_error(&self, callback_id: &str, result: &CommandResult) {
        self.callback_from_native(
            callback_id,
            false,
            result.status,
            std::slice::from_ref(&result.message),
            result.keep_callback,
        );
    }

    /// Drop the callbacks for `callback_id` without calling them, e.g. when
    /// the caller gave up waiting. Returns whether anything was stored.
    pub fn forget(&self, callback_id: &str) -> bool {
        self.callbacks.borrow_mut().remove(callback_id).is_some()
    }

    pub fn has_callback(&self, callback_id: &str) -> bool {
        self.callbacks.borrow().contains_key(callback_id)
    }

    /// Number of calls still waiting for a result.
    pub fn pending_count(&self) -> usize {
        self.callbacks.borrow().len()
    }

    /// `exec` as a future resolving with the first success or failure
    /// message.
    ///
    /// Results that keep the callback alive without success or failure (pure
    /// progress) do not resolve the future. If the entry is dropped without
    /// either callback running, the future fails with `Transport`.
    pub async fn call(&self, service: &str, action: &str, args: Vec<Json>) -> Result<Json> {
        let (tx, rx) = oneshot::channel::<std::result::Result<Json, Json>>();
        let tx = Rc::new(RefCell::new(Some(tx)));

        let on_success = {
            let tx = tx.clone();
            Callback::new(move |args| {
                let sender = tx.borrow_mut().take();
                if let Some(sender) = sender {
                    let _ = sender.send(Ok(first_arg(args)));
                }
            })
        };
        let on_fail = Callback::new(move |args| {
            let sender = tx.borrow_mut().take();
            if let Some(sender) = sender {
                let _ = sender.send(Err(first_arg(args)));
            }
        });

        self.exec(Some(on_success), Some(on_fail), service, action, args)?;

        match rx.await {
            Ok(Ok(message)) => Ok(message),
            Ok(Err(message)) => Err(BridgeError::CommandFailed {
                service: service.to_owned(),
                action: action.to_owned(),
                message: message_text(&message),
            }),
            Err(_) => Err(BridgeError::Transport(format!(
                "{service}.{action}: callback released without a result"
            ))),
        }
    }
}

fn first_arg(args: &[Json]) -> Json {
    args.first().cloned().unwrap_or(Json::Null)
}

fn message_text(message: &Json) -> String {
    match message {
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}
