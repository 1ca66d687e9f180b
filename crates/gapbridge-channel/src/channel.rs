// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Publish/subscribe channels.
//
// A plain channel is a multicast event: `fire` calls whoever is subscribed
// right now and remembers nothing. A sticky channel latches on its first
// `fire`: it keeps the arguments, releases its subscribers, and calls every
// later subscriber immediately with the stored arguments.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use gapbridge_core::error::{BridgeError, Result};
use serde_json::Value as Json;
use tracing::{error, trace};

/// Listener ids are shared by every channel so one listener keeps the same
/// identity wherever it is subscribed.
static NEXT_GUID: AtomicU64 = AtomicU64::new(1);

/// A subscribable callback with a stable identity.
///
/// Cloning a listener keeps its id, so subscribing a clone to a channel that
/// already holds the original is a no-op, and either handle unsubscribes it.
#[derive(Clone)]
pub struct Listener {
    guid: u64,
    call: Rc<dyn Fn(&[Json])>,
}

impl Listener {
    pub fn new(f: impl Fn(&[Json]) + 'static) -> Self {
        Self {
            guid: NEXT_GUID.fetch_add(1, Ordering::Relaxed),
            call: Rc::new(f),
        }
    }

    /// A listener that receives `context` on every call.
    pub fn bound<C: 'static>(context: Rc<C>, f: impl Fn(&C, &[Json]) + 'static) -> Self {
        Self::new(move |args| f(&context, args))
    }

    pub fn guid(&self) -> u64 {
        self.guid
    }

    pub fn call(&self, args: &[Json]) {
        (self.call)(args)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener").field("guid", &self.guid).finish()
    }
}

/// Where a channel is in its lifecycle. Sticky channels only move from
/// `Unfired` to `Fired`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    NonSticky,
    Unfired,
    Fired,
}

struct ChannelInner {
    kind: String,
    state: Cell<ChannelState>,
    /// Subscribers in subscription order.
    handlers: RefCell<Vec<Listener>>,
    fire_args: RefCell<Option<Vec<Json>>>,
    on_has_subscribers_change: RefCell<Option<Rc<dyn Fn(bool)>>>,
}

/// Shared handle to a pub/sub channel.
#[derive(Clone)]
pub struct Channel(Rc<ChannelInner>);

impl Channel {
    /// A plain, non-sticky channel.
    pub fn new(kind: impl Into<String>) -> Self {
        Self::with_state(kind.into(), ChannelState::NonSticky)
    }

    /// A sticky channel that latches on its first `fire`.
    pub fn sticky(kind: impl Into<String>) -> Self {
        Self::with_state(kind.into(), ChannelState::Unfired)
    }

    fn with_state(kind: String, state: ChannelState) -> Self {
        Self(Rc::new(ChannelInner {
            kind,
            state: Cell::new(state),
            handlers: RefCell::new(Vec::new()),
            fire_args: RefCell::new(None),
            on_has_subscribers_change: RefCell::new(None),
        }))
    }

    pub fn kind(&self) -> &str {
        &self.0.kind
    }

    pub fn state(&self) -> ChannelState {
        self.0.state.get()
    }

    pub fn is_sticky(&self) -> bool {
        self.state() != ChannelState::NonSticky
    }

    pub fn has_fired(&self) -> bool {
        self.state() == ChannelState::Fired
    }

    pub fn num_handlers(&self) -> usize {
        self.0.handlers.borrow().len()
    }

    pub fn ptr_eq(&self, other: &Channel) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Called with `true` when the first subscriber arrives and `false` when
    /// the last one leaves. Lets a capability start and stop its native
    /// event source lazily.
    pub fn set_on_has_subscribers_change(&self, f: impl Fn(bool) + 'static) {
        *self.0.on_has_subscribers_change.borrow_mut() = Some(Rc::new(f));
    }

    /// Subscribe `listener`. On a fired sticky channel the listener runs
    /// right away with the stored arguments and is not retained.
    pub fn subscribe(&self, listener: &Listener) {
        if self.has_fired() {
            let args = self.0.fire_args.borrow().clone().unwrap_or_default();
            listener.call(&args);
            return;
        }

        let first = {
            let mut handlers = self.0.handlers.borrow_mut();
            if handlers.iter().any(|h| h.guid == listener.guid) {
                return;
            }
            handlers.push(listener.clone());
            handlers.len() == 1
        };
        trace!(channel = %self.kind(), guid = listener.guid, "subscribed");
        if first {
            self.notify_subscribers_change(true);
        }
    }

    pub fn unsubscribe(&self, listener: &Listener) {
        self.unsubscribe_guid(listener.guid);
    }

    pub fn unsubscribe_guid(&self, guid: u64) {
        let emptied = {
            let mut handlers = self.0.handlers.borrow_mut();
            let before = handlers.len();
            handlers.retain(|h| h.guid != guid);
            handlers.len() < before && handlers.is_empty()
        };
        if emptied {
            self.notify_subscribers_change(false);
        }
    }

    /// Call every current subscriber with `args`.
    ///
    /// Subscribers are called from a snapshot taken before dispatch, so
    /// listeners added or removed by a handler do not affect this dispatch.
    /// A sticky channel hands its subscribers over before calling them, and
    /// a panicking subscriber is logged without stopping the rest.
    pub fn fire(&self, args: &[Json]) {
        let latching = self.state() == ChannelState::Unfired;
        let snapshot: Vec<Listener> = if latching {
            self.0.state.set(ChannelState::Fired);
            *self.0.fire_args.borrow_mut() = Some(args.to_vec());
            std::mem::take(&mut *self.0.handlers.borrow_mut())
        } else {
            self.0.handlers.borrow().clone()
        };
        if snapshot.is_empty() {
            return;
        }

        trace!(channel = %self.kind(), handlers = snapshot.len(), "firing");
        for listener in &snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener.call(args))).is_err() {
                error!(channel = %self.kind(), guid = listener.guid, "listener panicked");
            }
        }

        if latching {
            self.notify_subscribers_change(false);
        }
    }

    fn notify_subscribers_change(&self, has_subscribers: bool) {
        let callback = self.0.on_has_subscribers_change.borrow().clone();
        if let Some(callback) = callback {
            callback(has_subscribers);
        }
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("kind", &self.kind())
            .field("state", &self.state())
            .field("handlers", &self.num_handlers())
            .finish()
    }
}

/// Run `on_complete` once every channel in `channels` has fired at least
/// once, in whatever order they fire. An empty list completes immediately.
/// Every channel must be sticky.
pub fn join(on_complete: impl FnOnce() + 'static, channels: &[Channel]) -> Result<()> {
    if let Some(plain) = channels.iter().find(|c| !c.is_sticky()) {
        return Err(BridgeError::NonStickyJoin(plain.kind().to_owned()));
    }
    if channels.is_empty() {
        on_complete();
        return Ok(());
    }

    let remaining = Rc::new(Cell::new(channels.len()));
    let pending: Rc<RefCell<Option<Box<dyn FnOnce()>>>> =
        Rc::new(RefCell::new(Some(Box::new(on_complete))));
    for channel in channels {
        let remaining = remaining.clone();
        let pending = pending.clone();
        channel.subscribe(&Listener::new(move |_| {
            let left = remaining.get().saturating_sub(1);
            remaining.set(left);
            if left == 0 {
                let done = pending.borrow_mut().take();
                if let Some(done) = done {
                    done();
                }
            }
        }));
    }
    Ok(())
}
