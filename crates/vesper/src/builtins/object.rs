//! The `Object` builtin: statics over insertion-ordered maps, plus the
//! small instance-method table available on every object receiver.

use indexmap::IndexMap;

use crate::{
    builtins::arg,
    context::ScopeRef,
    terms,
    value::{JsObject, NativeImpl, Value},
};

pub(crate) fn construct(args: &[Value]) -> Value {
    match args.first() {
        None | Some(Value::Undefined | Value::Null) => Value::new_object(JsObject::new()),
        Some(v) => v.clone(),
    }
}

pub(crate) fn static_member(name: &str) -> Option<Value> {
    let (name, func): (&'static str, NativeImpl) = match name {
        "keys" => ("keys", keys),
        "values" => ("values", values),
        "entries" => ("entries", entries),
        "assign" => ("assign", assign),
        "fromEntries" => ("fromEntries", from_entries),
        "is" => ("is", object_is),
        _ => return None,
    };
    Some(Value::native_fn(name, func))
}

/// Instance methods available on object receivers when the property name
/// does not match an own entry.
pub(crate) fn method(name: &str, receiver: &Value) -> Option<Value> {
    let (name, func): (&'static str, NativeImpl) = match name {
        "hasOwnProperty" => ("hasOwnProperty", has_own_property),
        "toString" => ("toString", to_string),
        "valueOf" => ("valueOf", value_of),
        "keys" => ("keys", keys_of_this),
        "values" => ("values", values_of_this),
        "entries" => ("entries", entries_of_this),
        _ => return None,
    };
    Some(Value::bound_native_fn(name, func, receiver.clone()))
}

fn pairs_of(value: &Value) -> Vec<(Value, Value)> {
    terms::iterate(value)
}

fn keys(_scope: &ScopeRef, _this: &Value, args: &[Value]) -> Value {
    Value::new_array(pairs_of(&arg(args, 0)).into_iter().map(|(k, _)| key_string(k)).collect())
}

fn values(_scope: &ScopeRef, _this: &Value, args: &[Value]) -> Value {
    Value::new_array(pairs_of(&arg(args, 0)).into_iter().map(|(_, v)| v).collect())
}

fn entries(_scope: &ScopeRef, _this: &Value, args: &[Value]) -> Value {
    Value::new_array(
        pairs_of(&arg(args, 0))
            .into_iter()
            .map(|(k, v)| Value::new_array(vec![key_string(k), v]))
            .collect(),
    )
}

/// `Object.keys` yields strings even for array indices.
fn key_string(key: Value) -> Value {
    match key {
        Value::String(_) => key,
        other => Value::str(terms::to_display_string(&other)),
    }
}

fn keys_of_this(scope: &ScopeRef, this: &Value, _args: &[Value]) -> Value {
    keys(scope, &Value::Undefined, &[this.clone()])
}

fn values_of_this(scope: &ScopeRef, this: &Value, _args: &[Value]) -> Value {
    values(scope, &Value::Undefined, &[this.clone()])
}

fn entries_of_this(scope: &ScopeRef, this: &Value, _args: &[Value]) -> Value {
    entries(scope, &Value::Undefined, &[this.clone()])
}

fn assign(_scope: &ScopeRef, _this: &Value, args: &[Value]) -> Value {
    let target = arg(args, 0);
    if let Value::Object(object) = &target {
        for source in args.iter().skip(1) {
            if let Value::Object(from) = source {
                if std::rc::Rc::ptr_eq(object, from) {
                    continue;
                }
                let copied: Vec<(String, Value)> =
                    from.borrow().entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                let mut target_ref = object.borrow_mut();
                for (k, v) in copied {
                    target_ref.entries.insert(k, v);
                }
            } else {
                for (k, v) in terms::iterate(source) {
                    object.borrow_mut().entries.insert(terms::to_property_key(&k), v);
                }
            }
        }
    }
    target
}

fn from_entries(_scope: &ScopeRef, _this: &Value, args: &[Value]) -> Value {
    let mut entries = IndexMap::new();
    for (_, pair) in terms::iterate(&arg(args, 0)) {
        let mut iter = terms::iterate(&pair).into_iter();
        let key = iter.next().map(|(_, v)| v).unwrap_or(Value::Undefined);
        let value = iter.next().map(|(_, v)| v).unwrap_or(Value::Undefined);
        entries.insert(terms::to_property_key(&key), value);
    }
    Value::new_object(JsObject::from_entries(entries))
}

fn object_is(_scope: &ScopeRef, _this: &Value, args: &[Value]) -> Value {
    let a = arg(args, 0);
    let b = arg(args, 1);
    // SameValue: NaN equals itself, +0 and -0 differ
    let result = match (&a, &b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64(), y.as_f64());
            if x.is_nan() && y.is_nan() {
                true
            } else {
                x == y && x.is_sign_negative() == y.is_sign_negative()
            }
        }
        _ => terms::eq_strict(&a, &b),
    };
    Value::Bool(result)
}

fn has_own_property(_scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let key = terms::to_property_key(&arg(args, 0));
    let result = match this {
        Value::Object(object) => object.borrow().entries.contains_key(&key),
        Value::Array(elements) => {
            if key == "length" {
                true
            } else {
                key.parse::<usize>().is_ok_and(|i| i < elements.borrow().len())
            }
        }
        _ => false,
    };
    Value::Bool(result)
}

fn to_string(_scope: &ScopeRef, this: &Value, _args: &[Value]) -> Value {
    let tag = match this {
        Value::Null => "Null",
        Value::Undefined => "Undefined",
        Value::Array(_) => "Array",
        Value::Function(_) => "Function",
        _ => "Object",
    };
    Value::str(format!("[object {tag}]"))
}

fn value_of(_scope: &ScopeRef, this: &Value, _args: &[Value]) -> Value {
    this.clone()
}
