//! Property slots: uniform get/set/delete policies across receiver types.
//!
//! A reference-shaped AST node resolves to either a bare binding name or a
//! receiver plus key. Reads dispatch on the receiver type: arrays and
//! strings answer numeric keys, objects answer string keys with a fallback
//! method table, primitives auto-wrap for method lookup, and host mirrors
//! route through the bridge. Numeric keys coerce to strings on objects and
//! string keys coerce to indices on arrays, so either spelling reaches the
//! same slot.

use crate::{
    builtins::{self, error},
    context::{self, ScopeRef},
    host::{HostValue, MirrorHandle},
    terms,
    value::{Callable, JsFunction, Value},
};

/// A property key: a static name or a computed index value.
#[derive(Debug, Clone)]
pub(crate) enum SlotKey {
    Name(String),
    Index(Value),
}

impl SlotKey {
    pub fn as_string(&self) -> String {
        match self {
            Self::Name(name) => name.clone(),
            Self::Index(value) => terms::to_property_key(value),
        }
    }

    /// Interprets the key as an array index when possible: a non-negative
    /// integral number, or a string spelling one.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Name(name) => name.parse::<usize>().ok(),
            Self::Index(Value::Number(n)) => {
                let f = n.as_f64();
                if f >= 0.0 && f.fract() == 0.0 {
                    Some(f as usize)
                } else {
                    None
                }
            }
            Self::Index(Value::String(s)) => s.parse::<usize>().ok(),
            Self::Index(_) => None,
        }
    }
}

/// A resolved assignment/delete target.
#[derive(Debug)]
pub(crate) enum Slot {
    /// Bare identifier; reads and writes go through the context chain.
    Binding(String),
    /// Receiver plus key.
    Property { receiver: Value, key: SlotKey },
    /// An optional chain already produced undefined; writes are dropped,
    /// reads yield undefined.
    ShortCircuited,
}

/// Reads a property off a receiver.
///
/// `optional` suppresses the nullish-receiver TypeError (yielding undefined
/// silently); `function_call` selects method treatment for host mirrors.
pub(crate) fn get_property(scope: &ScopeRef, receiver: &Value, key: &SlotKey, optional: bool, function_call: bool) -> Value {
    if receiver.is_nullish() {
        if optional {
            return Value::Undefined;
        }
        error::throw_type(
            scope,
            &format!(
                "cannot read properties of {} (reading '{}')",
                terms::to_display_string(receiver),
                key.as_string()
            ),
        );
        return Value::Undefined;
    }
    match receiver {
        Value::Array(elements) => {
            if let Some(index) = key.as_index() {
                return elements.borrow().get(index).cloned().unwrap_or(Value::Undefined);
            }
            let name = key.as_string();
            if name == "length" {
                return Value::int(elements.borrow().len() as i64);
            }
            builtins::array::method(&name, receiver)
                .or_else(|| builtins::object::method(&name, receiver))
                .unwrap_or(Value::Undefined)
        }
        Value::String(s) => {
            if let Some(index) = key.as_index() {
                return builtins::string::char_at_index(s, index).map_or(Value::Undefined, Value::String);
            }
            let name = key.as_string();
            if name == "length" {
                return Value::int(terms::utf16_len(s) as i64);
            }
            builtins::string::method(&name, receiver).unwrap_or(Value::Undefined)
        }
        Value::Object(object) => {
            let name = key.as_string();
            if let Some(value) = object.borrow().entries.get(&name) {
                return value.clone();
            }
            if name == "constructor" {
                if let Some(constructor) = object.borrow().constructor.clone() {
                    return constructor;
                }
            }
            builtins::object::method(&name, receiver).unwrap_or(Value::Undefined)
        }
        Value::Number(_) => builtins::number::method(&key.as_string(), receiver).unwrap_or(Value::Undefined),
        Value::Bool(_) => builtins::object::method(&key.as_string(), receiver).unwrap_or(Value::Undefined),
        Value::Date(_) => builtins::date::method(&key.as_string(), receiver).unwrap_or(Value::Undefined),
        Value::Regex(regex) => {
            let name = key.as_string();
            builtins::regexp::property(regex, &name)
                .or_else(|| builtins::regexp::method(&name, receiver))
                .unwrap_or(Value::Undefined)
        }
        Value::Function(function) => {
            if let Callable::Ctor(ctor) = &function.callable {
                if let Some(static_member) = builtins::ctor_static(*ctor, &key.as_string()) {
                    return static_member;
                }
            }
            Value::Undefined
        }
        Value::Mirror(handle) => mirror_get(scope, handle, &key.as_string(), function_call),
        Value::Undefined | Value::Null => unreachable!("nullish receivers are handled above"),
    }
}

/// Writes a property on a receiver. Writes to primitives are silently
/// dropped; a nullish receiver is a TypeError.
pub(crate) fn set_property(scope: &ScopeRef, receiver: &Value, key: &SlotKey, value: Value) {
    if receiver.is_nullish() {
        error::throw_type(
            scope,
            &format!(
                "cannot set properties of {} (setting '{}')",
                terms::to_display_string(receiver),
                key.as_string()
            ),
        );
        return;
    }
    match receiver {
        Value::Array(elements) => {
            if let Some(index) = key.as_index() {
                let mut elements = elements.borrow_mut();
                if index >= elements.len() {
                    // sparse holes are nulls
                    elements.resize(index + 1, Value::Null);
                }
                elements[index] = value;
                return;
            }
            if key.as_string() == "length" {
                let new_len = terms::to_number(&value).trunc().max(0.0) as usize;
                elements.borrow_mut().resize(new_len, Value::Null);
            }
        }
        Value::Object(object) => {
            object.borrow_mut().entries.insert(key.as_string(), value);
        }
        Value::Mirror(handle) => mirror_set(scope, handle, &key.as_string(), value),
        _ => {}
    }
}

/// Removes a property from the receiver; always reports true, matching the
/// non-strict `delete` result.
pub(crate) fn delete_property(receiver: &Value, key: &SlotKey) -> Value {
    match receiver {
        Value::Object(object) => {
            object.borrow_mut().entries.shift_remove(&key.as_string());
        }
        Value::Array(elements) => {
            if let Some(index) = key.as_index() {
                let mut elements = elements.borrow_mut();
                if index < elements.len() {
                    // deleting leaves a hole, it does not reindex
                    elements[index] = Value::Null;
                }
            }
        }
        _ => {}
    }
    Value::Bool(true)
}

/// Side-effect-free property read used when wrapping uncaught errors; only
/// plain object entries answer.
pub(crate) fn get_property_quiet(receiver: &Value, key: &SlotKey) -> Option<Value> {
    match receiver {
        Value::Object(object) => object.borrow().entries.get(&key.as_string()).cloned(),
        _ => None,
    }
}

/// Reads through a resolved slot.
pub(crate) fn slot_get(scope: &ScopeRef, slot: &Slot) -> Value {
    match slot {
        Slot::Binding(name) => match context::lookup(scope, name) {
            Some(value) => value,
            None => {
                if let Some(mirror) = lookup_host_class(scope, name) {
                    return mirror;
                }
                error::throw_reference(scope, &format!("{name} is not defined"));
                Value::Undefined
            }
        },
        Slot::Property { receiver, key } => get_property(scope, receiver, key, false, false),
        Slot::ShortCircuited => Value::Undefined,
    }
}

/// Writes through a resolved slot. A bare name updates the nearest binding
/// (or creates an implicit global, which the caller reports through the
/// listener).
pub(crate) fn slot_set(scope: &ScopeRef, slot: &Slot, value: Value) {
    match slot {
        Slot::Binding(name) => {
            let created = context::update(scope, name, value.clone());
            if created {
                crate::interp::notify_variable_write(scope, crate::listener::DeclKind::Assign, name, &value);
            }
        }
        Slot::Property { receiver, key } => set_property(scope, receiver, key, value),
        Slot::ShortCircuited => {}
    }
}

/// Resolves an unbound global name through the host bridge, yielding a class
/// mirror when the bridge knows it.
pub(crate) fn lookup_host_class(scope: &ScopeRef, name: &str) -> Option<Value> {
    let hooks = scope.borrow().hooks.clone();
    let mut bridge = hooks.bridge.borrow_mut();
    let class = bridge.as_mut()?.for_class(name)?;
    Some(Value::Mirror(MirrorHandle::Class(class)))
}

fn mirror_get(scope: &ScopeRef, handle: &MirrorHandle, name: &str, function_call: bool) -> Value {
    if function_call {
        // defer to call time: produce an invokable bound to the handle
        return Value::Function(std::rc::Rc::new(JsFunction {
            callable: Callable::HostMethod {
                handle: handle.clone(),
                name: name.to_owned(),
            },
        }));
    }
    let hooks = scope.borrow().hooks.clone();
    let mut bridge = hooks.bridge.borrow_mut();
    let Some(bridge) = bridge.as_mut() else {
        error::throw_type(scope, "host bridge is not enabled");
        return Value::Undefined;
    };
    let result = match handle {
        MirrorHandle::Class(class) => bridge.get_static(class, name),
        MirrorHandle::Object(object) => bridge.get(object, name),
    };
    match result {
        Ok(value) => value.into_value(),
        Err(message) => {
            drop(bridge);
            error::throw_type(scope, &message);
            Value::Undefined
        }
    }
}

fn mirror_set(scope: &ScopeRef, handle: &MirrorHandle, name: &str, value: Value) {
    let hooks = scope.borrow().hooks.clone();
    let mut bridge = hooks.bridge.borrow_mut();
    let Some(bridge) = bridge.as_mut() else {
        error::throw_type(scope, "host bridge is not enabled");
        return;
    };
    let host_value = HostValue::from_value(&value);
    let result = match handle {
        MirrorHandle::Class(class) => bridge.set_static(class, name, host_value),
        MirrorHandle::Object(object) => bridge.set(object, name, host_value),
    };
    if let Err(message) = result {
        drop(bridge);
        error::throw_type(scope, &message);
    }
}
