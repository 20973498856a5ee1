//! The `Number` builtin: instance methods reached through primitive
//! auto-wrapping, plus statics.

use crate::{
    builtins::{arg, arg_int_or},
    context::ScopeRef,
    terms,
    value::{Value, format_f64},
};

/// Instance method lookup for a number receiver; the returned invokable is
/// bound to it.
pub(crate) fn method(name: &str, receiver: &Value) -> Option<Value> {
    let (name, func): (&'static str, crate::value::NativeImpl) = match name {
        "toFixed" => ("toFixed", to_fixed),
        "toString" => ("toString", to_string),
        "valueOf" => ("valueOf", value_of),
        _ => return None,
    };
    Some(Value::bound_native_fn(name, func, receiver.clone()))
}

pub(crate) fn static_member(name: &str) -> Option<Value> {
    let value = match name {
        "isInteger" => Value::native_fn("isInteger", is_integer),
        "isFinite" => Value::native_fn("isFinite", is_finite),
        "isNaN" => Value::native_fn("isNaN", is_nan),
        "parseInt" => Value::native_fn("parseInt", super::global::parse_int),
        "parseFloat" => Value::native_fn("parseFloat", super::global::parse_float),
        "MAX_SAFE_INTEGER" => Value::number(9_007_199_254_740_991.0),
        "MIN_SAFE_INTEGER" => Value::number(-9_007_199_254_740_991.0),
        "POSITIVE_INFINITY" => Value::number(f64::INFINITY),
        "NEGATIVE_INFINITY" => Value::number(f64::NEG_INFINITY),
        "EPSILON" => Value::number(f64::EPSILON),
        "NaN" => Value::number(f64::NAN),
        _ => return None,
    };
    Some(value)
}

fn to_fixed(_scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let digits = arg_int_or(args, 0, 0).clamp(0, 100) as usize;
    let f = terms::to_number(this);
    if f.is_nan() {
        return Value::str("NaN");
    }
    if f.is_infinite() {
        return Value::str(if f < 0.0 { "-Infinity" } else { "Infinity" });
    }
    Value::str(format!("{f:.digits$}"))
}

fn to_string(_scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let f = terms::to_number(this);
    let radix = arg_int_or(args, 0, 10);
    if radix == 10 {
        if let Value::Number(n) = this {
            return Value::str(n.to_string());
        }
        return Value::str(format_f64(f));
    }
    if !(2..=36).contains(&radix) || !f.is_finite() {
        return Value::str(format_f64(f));
    }
    // integer part only is converted digit-by-digit; fractional radix
    // conversion is not supported and truncates
    let negative = f < 0.0;
    let mut i = f.abs().trunc() as u64;
    let mut digits = Vec::new();
    loop {
        let d = (i % radix as u64) as u32;
        digits.push(char::from_digit(d, radix as u32).expect("digit in radix"));
        i /= radix as u64;
        if i == 0 {
            break;
        }
    }
    if negative {
        digits.push('-');
    }
    Value::str(digits.into_iter().rev().collect::<String>())
}

fn value_of(_scope: &ScopeRef, this: &Value, _args: &[Value]) -> Value {
    this.clone()
}

fn is_integer(_scope: &ScopeRef, _this: &Value, args: &[Value]) -> Value {
    match arg(args, 0) {
        Value::Number(n) => {
            let f = n.as_f64();
            Value::Bool(f.is_finite() && f.fract() == 0.0)
        }
        _ => Value::Bool(false),
    }
}

fn is_finite(_scope: &ScopeRef, _this: &Value, args: &[Value]) -> Value {
    match arg(args, 0) {
        Value::Number(n) => Value::Bool(n.as_f64().is_finite()),
        _ => Value::Bool(false),
    }
}

fn is_nan(_scope: &ScopeRef, _this: &Value, args: &[Value]) -> Value {
    match arg(args, 0) {
        Value::Number(n) => Value::Bool(n.is_nan()),
        _ => Value::Bool(false),
    }
}
