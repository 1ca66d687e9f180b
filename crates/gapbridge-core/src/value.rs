// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Dynamic object model for module exports and the global context.
//
// Module factories build their exports out of these values, and the module
// mapper installs them onto a global-like `Object` by dotted path. Objects
// are shared handles (`Rc<RefCell<..>>`): cloning an `Object` clones the
// handle, never the properties, so two `require` calls observe the same
// exports. Everything here is single-threaded by construction.

use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use tracing::warn;

use crate::error::Result;

/// Signature of a callable exported by a module.
pub type NativeFn = dyn Fn(&[Value]) -> Result<Value>;

/// A value that can live in a module's exports or in the global context.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    /// Plain data (numbers, strings, JSON objects) with value semantics.
    Data(serde_json::Value),
    /// A mutable namespace shared by reference.
    Object(Object),
    Function(Function),
    /// An opaque host object, e.g. a dispatcher or channel hub exported as a
    /// module so other factories can `require` it.
    Native(Rc<dyn Any>),
}

impl Value {
    pub fn native<T: Any>(value: Rc<T>) -> Self {
        Self::Native(value)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Undefined or JSON `null`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Data(serde_json::Value::Null))
    }

    /// The object that holds this value's own properties: the object itself,
    /// or the static properties of a function.
    pub fn as_object(&self) -> Option<Object> {
        match self {
            Self::Object(obj) => Some(obj.clone()),
            Self::Function(func) => Some(func.statics().clone()),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Self::Function(func) => Some(func),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Data(data) => Some(data),
            _ => None,
        }
    }

    /// Recover a host object stored with [`Value::native`].
    pub fn downcast_native<T: Any>(&self) -> Option<Rc<T>> {
        match self {
            Self::Native(any) => any.clone().downcast::<T>().ok(),
            _ => None,
        }
    }

    /// Identity comparison: shared values compare by pointer, data by value.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) => true,
            (Self::Data(a), Self::Data(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            (Self::Function(a), Self::Function(b)) => a.ptr_eq(b),
            (Self::Native(a), Self::Native(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Data(_) => "data",
            Self::Object(_) => "object",
            Self::Function(_) => "function",
            Self::Native(_) => "native",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("Undefined"),
            Self::Data(data) => write!(f, "Data({data})"),
            Self::Object(obj) => write!(f, "Object({:?})", obj.keys()),
            Self::Function(func) => write!(f, "Function({})", func.name()),
            Self::Native(_) => f.write_str("Native(..)"),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(data: serde_json::Value) -> Self {
        Self::Data(data)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Data(serde_json::Value::String(s.to_owned()))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Data(n.into())
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Data(n.into())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Data(b.into())
    }
}

impl From<Object> for Value {
    fn from(obj: Object) -> Self {
        Self::Object(obj)
    }
}

impl From<Function> for Value {
    fn from(func: Function) -> Self {
        Self::Function(func)
    }
}

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

/// How a property is stored. Only observable through [`Object::slot_kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Data { writable: bool },
    /// A getter override installed because plain assignment was refused.
    Getter,
    /// Logs a warning on first read, then turns into a writable data slot.
    Deprecated,
}

enum Slot {
    Data { value: Value, writable: bool },
    Getter(Value),
    Deprecated { value: Value, message: String },
}

/// A shared, mutable property bag.
#[derive(Clone, Default)]
pub struct Object(Rc<RefCell<BTreeMap<String, Slot>>>);

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Read a property. Missing keys read as `Undefined`. Reading a
    /// deprecated slot logs its message once and replaces the slot with the
    /// plain value.
    pub fn get(&self, key: &str) -> Value {
        let mut props = self.0.borrow_mut();
        let Some(slot) = props.get(key) else {
            return Value::Undefined;
        };
        match slot {
            Slot::Data { value, .. } | Slot::Getter(value) => value.clone(),
            Slot::Deprecated { value, message } => {
                warn!(symbol = key, "{message}");
                let value = value.clone();
                props.insert(
                    key.to_owned(),
                    Slot::Data {
                        value: value.clone(),
                        writable: true,
                    },
                );
                value
            }
        }
    }

    /// Plain assignment. Returns `false` (and changes nothing) when the
    /// property is read-only or accessor-backed.
    pub fn set(&self, key: &str, value: Value) -> bool {
        let mut props = self.0.borrow_mut();
        match props.get_mut(key) {
            None => {
                props.insert(
                    key.to_owned(),
                    Slot::Data {
                        value,
                        writable: true,
                    },
                );
                true
            }
            Some(Slot::Data {
                value: current,
                writable: true,
            }) => {
                *current = value;
                true
            }
            Some(_) => false,
        }
    }

    /// Replace whatever is stored under `key` with a getter returning `value`.
    pub fn define_getter(&self, key: &str, value: Value) {
        self.0.borrow_mut().insert(key.to_owned(), Slot::Getter(value));
    }

    /// Define a property that plain assignment cannot overwrite.
    pub fn define_read_only(&self, key: &str, value: Value) {
        self.0.borrow_mut().insert(
            key.to_owned(),
            Slot::Data {
                value,
                writable: false,
            },
        );
    }

    /// Define a property that warns with `message` the first time it is read.
    pub fn define_deprecated(&self, key: &str, value: Value, message: impl Into<String>) {
        self.0.borrow_mut().insert(
            key.to_owned(),
            Slot::Deprecated {
                value,
                message: message.into(),
            },
        );
    }

    pub fn slot_kind(&self, key: &str) -> Option<SlotKind> {
        self.0.borrow().get(key).map(|slot| match slot {
            Slot::Data { writable, .. } => SlotKind::Data {
                writable: *writable,
            },
            Slot::Getter(_) => SlotKind::Getter,
            Slot::Deprecated { .. } => SlotKind::Deprecated,
        })
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.borrow().contains_key(key)
    }

    /// Remove a property without triggering any deprecation warning.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.0.borrow_mut().remove(key).map(|slot| match slot {
            Slot::Data { value, .. } | Slot::Getter(value) | Slot::Deprecated { value, .. } => {
                value
            }
        })
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Walk a dotted path (`"navigator.compass"`) through nested objects.
    pub fn lookup(&self, path: &str) -> Value {
        let mut cur = Value::Object(self.clone());
        for part in path.split('.').filter(|p| !p.is_empty()) {
            cur = match cur.as_object() {
                Some(obj) => obj.get(part),
                None => return Value::Undefined,
            };
        }
        cur
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Object").field(&self.keys()).finish()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let obj = Object::new();
        for (key, value) in iter {
            obj.set(&key.into(), value);
        }
        obj
    }
}

// ---------------------------------------------------------------------------
// Functions
// ---------------------------------------------------------------------------

struct FunctionInner {
    name: String,
    call: Box<NativeFn>,
    statics: Object,
    prototype: Option<Object>,
}

/// A callable export. Functions built with [`Function::constructor`] carry a
/// prototype object; merging onto such a function installs onto the
/// prototype instead of the function's own properties.
#[derive(Clone)]
pub struct Function(Rc<FunctionInner>);

impl Function {
    pub fn new(name: impl Into<String>, call: impl Fn(&[Value]) -> Result<Value> + 'static) -> Self {
        Self(Rc::new(FunctionInner {
            name: name.into(),
            call: Box::new(call),
            statics: Object::new(),
            prototype: None,
        }))
    }

    pub fn constructor(
        name: impl Into<String>,
        call: impl Fn(&[Value]) -> Result<Value> + 'static,
    ) -> Self {
        Self(Rc::new(FunctionInner {
            name: name.into(),
            call: Box::new(call),
            statics: Object::new(),
            prototype: Some(Object::new()),
        }))
    }

    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.0.call)(args)
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn statics(&self) -> &Object {
        &self.0.statics
    }

    pub fn prototype(&self) -> Option<&Object> {
        self.0.prototype.as_ref()
    }

    pub fn is_constructor(&self) -> bool {
        self.0.prototype.is_some()
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_property_reads_undefined() {
        let obj = Object::new();
        assert!(obj.get("nope").is_undefined());
        assert!(obj.lookup("a.b.c").is_undefined());
    }

    #[test]
    fn read_only_refuses_assignment() {
        let obj = Object::new();
        obj.define_read_only("platform", "ios".into());
        assert!(!obj.set("platform", "android".into()));
        assert!(obj.get("platform").same(&"ios".into()));
    }

    #[test]
    fn deprecated_slot_becomes_plain_after_first_read() {
        let obj = Object::new();
        obj.define_deprecated("old", 5.into(), "use new");
        assert_eq!(obj.slot_kind("old"), Some(SlotKind::Deprecated));

        assert!(obj.get("old").same(&5.into()));
        assert_eq!(obj.slot_kind("old"), Some(SlotKind::Data { writable: true }));
        assert!(obj.set("old", 6.into()));
    }

    #[test]
    fn clones_share_properties() {
        let a = Object::new();
        let b = a.clone();
        a.set("x", json!(1).into());
        assert!(b.get("x").same(&1.into()));
        assert!(Value::Object(a).same(&Value::Object(b)));
    }

    #[test]
    fn lookup_walks_function_statics() {
        let geo = Function::constructor("Geolocation", |_| Ok(Value::Undefined));
        geo.statics().set("usingNative", true.into());
        let root: Object = [("Geolocation", Value::Function(geo))].into_iter().collect();
        assert!(root.lookup("Geolocation.usingNative").same(&true.into()));
    }

    #[test]
    fn native_values_downcast() {
        let value = Value::native(Rc::new(42_u32));
        assert_eq!(value.downcast_native::<u32>().as_deref(), Some(&42));
        assert!(value.downcast_native::<String>().is_none());
    }
}
