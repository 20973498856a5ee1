//! Public host-facing values and the host-interop bridge.
//!
//! [`HostValue`] is the type that crosses the engine boundary: it owns all
//! its data, can be freely cloned, serialized, and stored, and never holds a
//! reference into the interpreter. Conversion from runtime values is a deep
//! copy; cyclic structures convert to [`HostValue::Repr`] placeholders.
//!
//! [`HostBridge`] is the optional capability that lets evaluated code reach
//! objects living in the host world. When no bridge is installed, any
//! reference into the host world fails with a clear error instead of
//! silently yielding undefined.

use std::fmt;

use indexmap::IndexMap;

use crate::{
    terms,
    value::{JsObject, Value},
};

/// A value passed to or returned from the interpreter.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum HostValue {
    /// Present for inputs; outputs convert undefined to `Null` at the
    /// façade boundary.
    #[serde(alias = "undefined")]
    Undefined,
    #[serde(alias = "null")]
    Null,
    #[serde(alias = "bool")]
    Bool(bool),
    /// A number that narrowed to an exact integer.
    #[serde(alias = "int")]
    Int(i64),
    #[serde(alias = "float")]
    Float(f64),
    #[serde(alias = "string")]
    String(String),
    #[serde(alias = "array")]
    Array(Vec<HostValue>),
    /// Insertion-ordered key/value pairs.
    #[serde(alias = "object")]
    Object(Vec<(String, HostValue)>),
    /// Fallback for values with no direct host mapping (functions, regexes,
    /// dates, cycles). Contains the display form; output-only.
    Repr(String),
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(d) => f.write_str(&crate::value::format_f64(*d)),
            Self::String(s) => f.write_str(s),
            Self::Repr(r) => f.write_str(r),
            Self::Array(_) | Self::Object(_) => {
                // reuse the engine's JSON-like rendering via a round-trip
                f.write_str(&terms::to_display_string(&self.clone().into_value()))
            }
        }
    }
}

impl HostValue {
    /// Converts a runtime value into an owned host value. Containers deep
    /// copy; a revisited container on the current path becomes a
    /// [`HostValue::Repr`] cycle placeholder.
    pub(crate) fn from_value(value: &Value) -> Self {
        let mut path = Vec::new();
        Self::from_value_inner(value, &mut path)
    }

    fn from_value_inner(value: &Value, path: &mut Vec<usize>) -> Self {
        match value {
            Value::Undefined => Self::Undefined,
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => match n {
                crate::value::JsNumber::I32(i) => Self::Int(i64::from(*i)),
                crate::value::JsNumber::I64(i) => Self::Int(*i),
                crate::value::JsNumber::F64(f) => Self::Float(*f),
            },
            Value::String(s) => Self::String(s.to_string()),
            Value::Array(elements) => {
                let id = std::rc::Rc::as_ptr(elements) as usize;
                if path.contains(&id) {
                    return Self::Repr("[...]".to_owned());
                }
                path.push(id);
                let out = elements
                    .borrow()
                    .iter()
                    .map(|v| Self::from_value_inner(v, path))
                    .collect();
                path.pop();
                Self::Array(out)
            }
            Value::Object(object) => {
                let id = std::rc::Rc::as_ptr(object) as usize;
                if path.contains(&id) {
                    return Self::Repr("{...}".to_owned());
                }
                path.push(id);
                let out = object
                    .borrow()
                    .entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::from_value_inner(v, path)))
                    .collect();
                path.pop();
                Self::Object(out)
            }
            other => Self::Repr(terms::to_display_string(other)),
        }
    }

    /// Converts this host value into a runtime value, allocating containers.
    pub(crate) fn into_value(self) -> Value {
        match self {
            Self::Undefined => Value::Undefined,
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(b),
            Self::Int(i) => Value::int(i),
            Self::Float(f) => Value::number(f),
            Self::String(s) => Value::str(s),
            Self::Array(elements) => Value::new_array(elements.into_iter().map(Self::into_value).collect()),
            Self::Object(pairs) => {
                let mut entries = IndexMap::new();
                for (k, v) in pairs {
                    entries.insert(k, v.into_value());
                }
                Value::new_object(JsObject::from_entries(entries))
            }
            Self::Repr(r) => Value::str(r),
        }
    }

    /// Boundary conversion for results: undefined becomes null.
    pub(crate) fn undefined_to_null(self) -> Self {
        if matches!(self, Self::Undefined) { Self::Null } else { self }
    }
}

/// Opaque handle to a class in the host world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostClass {
    /// Qualified name the class was looked up by.
    pub name: String,
    /// Host-assigned identity.
    pub id: u64,
}

/// Opaque handle to an object instance in the host world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostObject {
    /// Host-assigned identity.
    pub id: u64,
}

/// A mirror value: either a class handle (supports statics and `new`) or an
/// instance handle (supports field/method access).
#[derive(Debug, Clone)]
pub(crate) enum MirrorHandle {
    Class(HostClass),
    Object(HostObject),
}

impl MirrorHandle {
    pub fn same_handle(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Class(a), Self::Class(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            _ => false,
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            Self::Class(c) => format!("[class {}]", c.name),
            Self::Object(o) => format!("[object HostObject#{}]", o.id),
        }
    }
}

/// Reflective access into the host world.
///
/// The interpreter consults the bridge only when a lookup cannot otherwise
/// resolve: an unbound global name is tried as a class, and property access
/// or calls on mirror values route through the instance methods. Errors are
/// plain strings; the interpreter rethrows them as `TypeError`s.
pub trait HostBridge {
    /// Resolves a qualified class name, or `None` if unknown.
    fn for_class(&mut self, qualified_name: &str) -> Option<HostClass>;

    fn invoke_static(&mut self, class: &HostClass, name: &str, args: &[HostValue]) -> Result<HostValue, String>;

    fn get_static(&mut self, class: &HostClass, name: &str) -> Result<HostValue, String>;

    fn set_static(&mut self, class: &HostClass, name: &str, value: HostValue) -> Result<(), String>;

    fn invoke(&mut self, obj: &HostObject, name: &str, args: &[HostValue]) -> Result<HostValue, String>;

    fn get(&mut self, obj: &HostObject, name: &str) -> Result<HostValue, String>;

    fn set(&mut self, obj: &HostObject, name: &str, value: HostValue) -> Result<(), String>;

    fn construct(&mut self, class: &HostClass, args: &[HostValue]) -> Result<HostObject, String>;
}
