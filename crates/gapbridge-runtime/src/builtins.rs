// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Modules every runtime defines before any plugin code runs, and typed
// accessors for plugin factories that need them.

use std::rc::{Rc, Weak};

use gapbridge_channel::ChannelHub;
use gapbridge_core::error::{BridgeError, Result};
use gapbridge_core::value::Value;
use gapbridge_exec::Dispatcher;
use gapbridge_modules::{ModuleMapper, ModuleRegistry, Require};
use serde_json::json;

use crate::events::EventRouter;

pub const CORE_MODULE: &str = "cordova";
pub const CHANNEL_MODULE: &str = "cordova/channel";
pub const EXEC_MODULE: &str = "cordova/exec";
pub const MAPPER_MODULE: &str = "cordova/modulemapper";
pub const PLATFORM_MODULE: &str = "cordova/platform";

/// The mapper refers to the registry, so the registry only holds it weakly.
pub struct MapperHandle(Weak<ModuleMapper>);

pub(crate) struct Builtins<'a> {
    pub hub: &'a Rc<ChannelHub>,
    pub dispatcher: &'a Rc<Dispatcher>,
    pub mapper: &'a Rc<ModuleMapper>,
    pub events: &'a Rc<EventRouter>,
    pub platform_id: &'a str,
}

impl Builtins<'_> {
    pub(crate) fn define(self, registry: &ModuleRegistry) -> Result<()> {
        registry.define_value(CHANNEL_MODULE, Value::native(self.hub.clone()))?;
        registry.define_value(EXEC_MODULE, Value::native(self.dispatcher.clone()))?;
        registry.define_value(CORE_MODULE, Value::native(self.events.clone()))?;
        registry.define_value(
            MAPPER_MODULE,
            Value::native(Rc::new(MapperHandle(Rc::downgrade(self.mapper)))),
        )?;
        registry.define_value(PLATFORM_MODULE, json!({ "id": self.platform_id }).into())?;
        Ok(())
    }
}

fn wrong_exports(id: &str, expected: &str) -> BridgeError {
    BridgeError::ModuleBuild {
        id: id.to_owned(),
        reason: format!("exports are not {expected}"),
    }
}

pub fn require_hub(req: &Require<'_>) -> Result<Rc<ChannelHub>> {
    req.require(CHANNEL_MODULE)?
        .downcast_native::<ChannelHub>()
        .ok_or_else(|| wrong_exports(CHANNEL_MODULE, "a channel hub"))
}

pub fn require_dispatcher(req: &Require<'_>) -> Result<Rc<Dispatcher>> {
    req.require(EXEC_MODULE)?
        .downcast_native::<Dispatcher>()
        .ok_or_else(|| wrong_exports(EXEC_MODULE, "a dispatcher"))
}

pub fn require_events(req: &Require<'_>) -> Result<Rc<EventRouter>> {
    req.require(CORE_MODULE)?
        .downcast_native::<EventRouter>()
        .ok_or_else(|| wrong_exports(CORE_MODULE, "an event router"))
}

/// The runtime's mapper, for `*/symbols` modules that declare installations.
pub fn require_mapper(req: &Require<'_>) -> Result<Rc<ModuleMapper>> {
    req.require(MAPPER_MODULE)?
        .downcast_native::<MapperHandle>()
        .and_then(|handle| handle.0.upgrade())
        .ok_or_else(|| wrong_exports(MAPPER_MODULE, "a live module mapper"))
}
