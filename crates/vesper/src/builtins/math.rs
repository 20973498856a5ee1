//! The `Math` namespace object.
//!
//! `Math.random` draws from the engine's pluggable RNG so hosts can seed it
//! for deterministic runs.

use crate::{
    builtins::arg_f64,
    context::ScopeRef,
    terms,
    value::{JsObject, Value},
};

/// Builds the `Math` object with its constants and functions.
pub(crate) fn create() -> Value {
    let mut object = JsObject::new();
    let mut constant = |name: &str, v: f64| {
        object.entries.insert(name.to_owned(), Value::number(v));
    };
    constant("E", std::f64::consts::E);
    constant("PI", std::f64::consts::PI);
    constant("LN2", std::f64::consts::LN_2);
    constant("LN10", std::f64::consts::LN_10);
    constant("LOG2E", std::f64::consts::LOG2_E);
    constant("LOG10E", std::f64::consts::LOG10_E);
    constant("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2);
    constant("SQRT2", std::f64::consts::SQRT_2);

    let mut method = |name: &'static str, func: crate::value::NativeImpl| {
        object.entries.insert(name.to_owned(), Value::native_fn(name, func));
    };
    method("abs", |_, _, a| unary(a, f64::abs));
    method("ceil", |_, _, a| unary(a, f64::ceil));
    method("floor", |_, _, a| unary(a, f64::floor));
    method("round", |_, _, a| unary(a, f64::round)); // half away from zero
    method("trunc", |_, _, a| unary(a, f64::trunc));
    method("sign", |_, _, a| unary(a, sign));
    method("sqrt", |_, _, a| unary(a, f64::sqrt));
    method("cbrt", |_, _, a| unary(a, f64::cbrt));
    method("exp", |_, _, a| unary(a, f64::exp));
    method("expm1", |_, _, a| unary(a, f64::exp_m1));
    method("log", |_, _, a| unary(a, f64::ln));
    method("log2", |_, _, a| unary(a, f64::log2));
    method("log10", |_, _, a| unary(a, f64::log10));
    method("log1p", |_, _, a| unary(a, f64::ln_1p));
    method("sin", |_, _, a| unary(a, f64::sin));
    method("cos", |_, _, a| unary(a, f64::cos));
    method("tan", |_, _, a| unary(a, f64::tan));
    method("asin", |_, _, a| unary(a, f64::asin));
    method("acos", |_, _, a| unary(a, f64::acos));
    method("atan", |_, _, a| unary(a, f64::atan));
    method("sinh", |_, _, a| unary(a, f64::sinh));
    method("cosh", |_, _, a| unary(a, f64::cosh));
    method("tanh", |_, _, a| unary(a, f64::tanh));
    method("asinh", |_, _, a| unary(a, f64::asinh));
    method("acosh", |_, _, a| unary(a, f64::acosh));
    method("atanh", |_, _, a| unary(a, f64::atanh));
    method("fround", |_, _, a| unary(a, |x| f64::from(x as f32)));
    method("atan2", |_, _, a| Value::number(arg_f64(a, 0).atan2(arg_f64(a, 1))));
    method("pow", |_, _, a| Value::number(arg_f64(a, 0).powf(arg_f64(a, 1))));
    method("imul", |_, _, a| {
        let x = terms::to_int32(arg_f64(a, 0));
        let y = terms::to_int32(arg_f64(a, 1));
        Value::number(f64::from(x.wrapping_mul(y)))
    });
    method("clz32", |_, _, a| {
        let x = terms::to_uint32(arg_f64(a, 0));
        Value::number(f64::from(x.leading_zeros()))
    });
    method("hypot", |_, _, a| {
        let sum: f64 = a.iter().map(|v| terms::to_number(v).powi(2)).sum();
        Value::number(sum.sqrt())
    });
    method("max", |_, _, a| fold(a, f64::NEG_INFINITY, f64::max));
    method("min", |_, _, a| fold(a, f64::INFINITY, f64::min));
    method("random", math_random);

    Value::new_object(object)
}

fn unary(args: &[Value], f: impl Fn(f64) -> f64) -> Value {
    Value::number(f(arg_f64(args, 0)))
}

fn sign(x: f64) -> f64 {
    if x.is_nan() || x == 0.0 { x } else if x < 0.0 { -1.0 } else { 1.0 }
}

fn fold(args: &[Value], init: f64, f: impl Fn(f64, f64) -> f64) -> Value {
    let mut acc = init;
    for v in args {
        let x = terms::to_number(v);
        if x.is_nan() {
            return Value::number(f64::NAN);
        }
        acc = f(acc, x);
    }
    Value::number(acc)
}

fn math_random(scope: &ScopeRef, _this: &Value, _args: &[Value]) -> Value {
    let hooks = scope.borrow().hooks.clone();
    Value::Number(crate::value::JsNumber::F64(hooks.random()))
}
