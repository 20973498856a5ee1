//! ECMAScript-shaped global builtins.
//!
//! Each builtin area lives in its own submodule. Globals are materialized
//! lazily: the root context resolves an unbound name through
//! [`lookup_global`] and caches the created value in its own bindings, so
//! repeated references observe the same object identity.
//!
//! Callable builtins (`Array`, `Error`, …) are [`BuiltinCtor`] function
//! values; their static methods resolve by name through [`ctor_static`],
//! and both plain calls and `new` route through [`ctor_call`].

pub(crate) mod array;
pub(crate) mod date;
pub(crate) mod error;
pub(crate) mod global;
pub(crate) mod json;
pub(crate) mod math;
pub(crate) mod number;
pub(crate) mod object;
pub(crate) mod regexp;
pub(crate) mod string;

use strum::{Display, EnumString, IntoStaticStr};

use crate::{
    context::ScopeRef,
    terms,
    value::{Callable, JsFunction, Value},
};

/// Builtin global constructors: callable, `new`-able, and carrying statics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub(crate) enum BuiltinCtor {
    Array,
    Object,
    String,
    Number,
    Boolean,
    Date,
    RegExp,
    Error,
    TypeError,
}

impl BuiltinCtor {
    fn value(self) -> Value {
        Value::Function(std::rc::Rc::new(JsFunction {
            callable: Callable::Ctor(self),
        }))
    }
}

/// Resolves a global builtin name into a freshly created value. The root
/// context caches the result, so identity is stable per engine.
pub(crate) fn lookup_global(name: &str) -> Option<Value> {
    let value = match name {
        "Array" => BuiltinCtor::Array.value(),
        "Object" => BuiltinCtor::Object.value(),
        "String" => BuiltinCtor::String.value(),
        "Number" => BuiltinCtor::Number.value(),
        "Boolean" => BuiltinCtor::Boolean.value(),
        "Date" => BuiltinCtor::Date.value(),
        "RegExp" => BuiltinCtor::RegExp.value(),
        "Error" => BuiltinCtor::Error.value(),
        "TypeError" => BuiltinCtor::TypeError.value(),
        "Math" => math::create(),
        "JSON" => json::create(),
        "console" => global::create_console(),
        "Infinity" => Value::number(f64::INFINITY),
        "NaN" => Value::number(f64::NAN),
        "undefined" => Value::Undefined,
        "parseInt" => Value::native_fn("parseInt", global::parse_int),
        "parseFloat" => Value::native_fn("parseFloat", global::parse_float),
        "isNaN" => Value::native_fn("isNaN", global::is_nan),
        "isFinite" => Value::native_fn("isFinite", global::is_finite),
        _ => return None,
    };
    Some(value)
}

/// Whether a name refers to a global builtin (materialized or not).
pub(crate) fn is_global_name(name: &str) -> bool {
    matches!(
        name,
        "Array"
            | "Object"
            | "String"
            | "Number"
            | "Boolean"
            | "Date"
            | "RegExp"
            | "Error"
            | "TypeError"
            | "Math"
            | "JSON"
            | "console"
            | "Infinity"
            | "NaN"
            | "undefined"
            | "parseInt"
            | "parseFloat"
            | "isNaN"
            | "isFinite"
    )
}

/// Static property lookup on a builtin constructor (`Array.isArray`,
/// `Object.keys`, `String.fromCharCode`, …).
pub(crate) fn ctor_static(ctor: BuiltinCtor, name: &str) -> Option<Value> {
    match ctor {
        BuiltinCtor::Array => array::static_member(name),
        BuiltinCtor::Object => object::static_member(name),
        BuiltinCtor::String => string::static_member(name),
        BuiltinCtor::Number => number::static_member(name),
        BuiltinCtor::Date => date::static_member(name),
        _ => None,
    }
}

/// Invokes a builtin constructor, either as a plain call or via `new`.
pub(crate) fn ctor_call(scope: &ScopeRef, ctor: BuiltinCtor, args: &[Value], construct: bool) -> Value {
    match ctor {
        BuiltinCtor::Array => array::construct(scope, args),
        BuiltinCtor::Object => object::construct(args),
        BuiltinCtor::String => {
            if args.is_empty() {
                Value::str("")
            } else {
                Value::str(terms::to_display_string(&args[0]))
            }
        }
        BuiltinCtor::Number => {
            if args.is_empty() {
                Value::int(0)
            } else {
                Value::number(terms::to_number(&args[0]))
            }
        }
        BuiltinCtor::Boolean => Value::Bool(!args.is_empty() && terms::truthy(&args[0])),
        BuiltinCtor::Date => date::construct(scope, args, construct),
        BuiltinCtor::RegExp => regexp::construct(scope, args),
        BuiltinCtor::Error => error::construct(BuiltinCtor::Error, args),
        BuiltinCtor::TypeError => error::construct(BuiltinCtor::TypeError, args),
    }
}

// === argument helpers shared across builtin implementations ===

pub(crate) fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Undefined)
}

pub(crate) fn arg_f64(args: &[Value], index: usize) -> f64 {
    args.get(index).map_or(f64::NAN, terms::to_number)
}

pub(crate) fn arg_str(args: &[Value], index: usize) -> String {
    args.get(index).map_or_else(|| "undefined".to_owned(), terms::to_display_string)
}

/// An optional integer argument with a default, truncated toward zero.
pub(crate) fn arg_int_or(args: &[Value], index: usize, default: i64) -> i64 {
    match args.get(index) {
        None | Some(Value::Undefined) => default,
        Some(v) => {
            let f = terms::to_number(v);
            if f.is_nan() { 0 } else { f.trunc() as i64 }
        }
    }
}

/// Clamps a possibly negative index against a length, ECMAScript slice
/// style: negative counts from the end, the result is within `0..=len`.
pub(crate) fn clamp_index(index: i64, len: usize) -> usize {
    if index < 0 {
        len.saturating_sub(index.unsigned_abs() as usize)
    } else {
        (index as usize).min(len)
    }
}
