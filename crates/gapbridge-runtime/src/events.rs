// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document and window event routing.
//
// Events the runtime owns (deviceready, pause, resume, and whatever plugins
// register) are backed by channels, so a sticky event such as deviceready
// reaches listeners that subscribe after it fired. Events nobody registered
// are handed to the host's own event system.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use chrono::Utc;
use gapbridge_channel::{Channel, ChannelHub, Listener};
use serde_json::{Map, Value as Json};
use tracing::{debug, trace};

/// Which global an event is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTarget {
    Document,
    Window,
}

impl fmt::Display for EventTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Document => "document",
            Self::Window => "window",
        })
    }
}

type HostDispatch = Rc<dyn Fn(EventTarget, &Json)>;

/// Owns the event-name to channel tables for document and window.
pub struct EventRouter {
    hub: Rc<ChannelHub>,
    document: RefCell<HashMap<String, Channel>>,
    window: RefCell<HashMap<String, Channel>>,
    host_dispatch: RefCell<Option<HostDispatch>>,
}

impl EventRouter {
    pub fn new(hub: Rc<ChannelHub>) -> Self {
        Self {
            hub,
            document: RefCell::default(),
            window: RefCell::default(),
            host_dispatch: RefCell::default(),
        }
    }

    /// Where unrouted events go. Without one they are dropped.
    pub fn set_host_dispatch(&self, f: impl Fn(EventTarget, &Json) + 'static) {
        *self.host_dispatch.borrow_mut() = Some(Rc::new(f));
    }

    fn table(&self, target: EventTarget) -> &RefCell<HashMap<String, Channel>> {
        match target {
            EventTarget::Document => &self.document,
            EventTarget::Window => &self.window,
        }
    }

    pub fn add_document_event_handler(&self, event: &str) -> Channel {
        self.route(EventTarget::Document, event, self.hub.create(event))
    }

    pub fn add_sticky_document_event_handler(&self, event: &str) -> Channel {
        self.route(EventTarget::Document, event, self.hub.create_sticky(event))
    }

    pub fn add_window_event_handler(&self, event: &str) -> Channel {
        self.route(EventTarget::Window, event, self.hub.create(event))
    }

    /// Route `event` on `target` through an existing channel.
    pub fn route(&self, target: EventTarget, event: &str, channel: Channel) -> Channel {
        debug!(%target, event, sticky = channel.is_sticky(), "event handler registered");
        self.table(target)
            .borrow_mut()
            .insert(event.to_owned(), channel.clone());
        channel
    }

    pub fn remove_document_event_handler(&self, event: &str) -> Option<Channel> {
        self.document.borrow_mut().remove(event)
    }

    pub fn remove_window_event_handler(&self, event: &str) -> Option<Channel> {
        self.window.borrow_mut().remove(event)
    }

    pub fn handler(&self, target: EventTarget, event: &str) -> Option<Channel> {
        self.table(target).borrow().get(event).cloned()
    }

    /// Subscribe `listener` to a routed event. Names are matched
    /// case-insensitively. Returns `false` when the event is not routed and
    /// the host should register the listener itself.
    pub fn add_event_listener(&self, target: EventTarget, event: &str, listener: &Listener) -> bool {
        match self.handler(target, &event.to_lowercase()) {
            Some(channel) => {
                channel.subscribe(listener);
                true
            }
            None => false,
        }
    }

    pub fn remove_event_listener(
        &self,
        target: EventTarget,
        event: &str,
        listener: &Listener,
    ) -> bool {
        match self.handler(target, &event.to_lowercase()) {
            Some(channel) => {
                channel.unsubscribe(listener);
                true
            }
            None => false,
        }
    }

    /// Fire a document event. Returns whether a routed channel handled it.
    pub fn fire_document_event(&self, event: &str, data: Option<&Json>) -> bool {
        self.fire(EventTarget::Document, event, data)
    }

    /// Fire a window event. Returns whether a routed channel handled it.
    pub fn fire_window_event(&self, event: &str, data: Option<&Json>) -> bool {
        self.fire(EventTarget::Window, event, data)
    }

    fn fire(&self, target: EventTarget, event: &str, data: Option<&Json>) -> bool {
        let payload = create_event(event, data);
        // Clone out first: listeners may register or remove handlers.
        let routed = self.handler(target, event);
        match routed {
            Some(channel) => {
                trace!(%target, event, "firing routed event");
                channel.fire(std::slice::from_ref(&payload));
                true
            }
            None => {
                let dispatch = self.host_dispatch.borrow().clone();
                if let Some(dispatch) = dispatch {
                    dispatch(target, &payload);
                }
                false
            }
        }
    }
}

/// `{"type": event, "timeStamp": <ms since epoch>, ..data}`. Properties of
/// `data` override the defaults.
pub fn create_event(event: &str, data: Option<&Json>) -> Json {
    let mut fields = Map::new();
    fields.insert("type".into(), Json::String(event.to_owned()));
    fields.insert("timeStamp".into(), Json::from(Utc::now().timestamp_millis()));
    if let Some(Json::Object(extra)) = data {
        for (key, value) in extra {
            fields.insert(key.clone(), value.clone());
        }
    }
    Json::Object(fields)
}
