//! Runtime value model.
//!
//! `Value` is a tagged union. Immediate variants (undefined, null, booleans,
//! numbers, strings) are cheap to clone; container variants (arrays, objects,
//! functions, dates, regexes) are shared by identity through `Rc`, so
//! assignment never deep-copies and mutation is observable through every
//! reference, matching ECMAScript semantics.
//!
//! Numbers carry a narrowing optimization: an exact-integer double is stored
//! as the smallest of i32/i64/f64. The choice is purely representational —
//! `typeof` is always `"number"` and arithmetic goes through f64 — and is
//! observable only in string formatting.

use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};

use indexmap::IndexMap;

use crate::{builtins::BuiltinCtor, context::ScopeRef, host::MirrorHandle, node::Node};

/// A runtime JavaScript value.
#[derive(Debug, Clone)]
pub(crate) enum Value {
    Undefined,
    /// Distinct from `Undefined`; `typeof null` is `"object"`.
    Null,
    Bool(bool),
    Number(JsNumber),
    String(Rc<str>),
    Array(Rc<RefCell<Vec<Value>>>),
    Object(Rc<RefCell<JsObject>>),
    Function(Rc<JsFunction>),
    Regex(Rc<JsRegex>),
    Date(Rc<RefCell<JsDate>>),
    /// Opaque handle into the host world, resolved through the host bridge.
    Mirror(MirrorHandle),
}

/// Insertion-ordered string-keyed mapping plus the constructor backref used
/// by `instanceof`.
#[derive(Debug, Default)]
pub(crate) struct JsObject {
    pub entries: IndexMap<String, Value>,
    /// The function this object was constructed with via `new`, if any.
    pub constructor: Option<Value>,
}

impl JsObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: IndexMap<String, Value>) -> Self {
        Self {
            entries,
            constructor: None,
        }
    }
}

/// Runtime number representation, narrowed to the smallest lossless form.
#[derive(Debug, Clone, Copy)]
pub(crate) enum JsNumber {
    I32(i32),
    I64(i64),
    F64(f64),
}

impl JsNumber {
    pub fn as_f64(self) -> f64 {
        match self {
            Self::I32(i) => f64::from(i),
            Self::I64(i) => i as f64,
            Self::F64(f) => f,
        }
    }

    pub fn is_nan(self) -> bool {
        matches!(self, Self::F64(f) if f.is_nan())
    }
}

impl fmt::Display for JsNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I32(i) => write!(f, "{i}"),
            Self::I64(i) => write!(f, "{i}"),
            Self::F64(d) => f.write_str(&format_f64(*d)),
        }
    }
}

/// Chooses the smallest representation for `d` without changing its
/// mathematical value. Negative zero must stay a float so its sign survives.
pub(crate) fn narrow(d: f64) -> JsNumber {
    if d == 0.0 && d.is_sign_negative() {
        return JsNumber::F64(d);
    }
    if d.fract() == 0.0 && d.is_finite() {
        if d >= f64::from(i32::MIN) && d <= f64::from(i32::MAX) {
            return JsNumber::I32(d as i32);
        }
        // every f64 with a zero fraction inside i64 range converts exactly;
        // the upper bound is exclusive because 2^63 itself overflows
        if d >= -9_223_372_036_854_775_808.0 && d < 9_223_372_036_854_775_808.0 {
            return JsNumber::I64(d as i64);
        }
    }
    JsNumber::F64(d)
}

/// Formats a double the way `String(number)` does in ECMAScript: positional
/// notation within 10^-6..10^21, exponent notation with an explicit sign
/// outside it, shortest digit run that round-trips.
pub(crate) fn format_f64(d: f64) -> String {
    if d.is_nan() {
        return "NaN".to_owned();
    }
    if d.is_infinite() {
        return if d < 0.0 { "-Infinity" } else { "Infinity" }.to_owned();
    }
    if d == 0.0 {
        return "0".to_owned(); // covers -0
    }
    let mut buffer = ryu::Buffer::new();
    let shortest = buffer.format(d);
    let (sign, rest) = match shortest.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", shortest),
    };
    // split ryu output into significant digits and a decimal-point position
    let (mantissa, exp10) = match rest.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().expect("ryu exponent")),
        None => (rest, 0),
    };
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, f),
        None => (mantissa, ""),
    };
    let mut digits: String = format!("{int_part}{frac_part}");
    // point = number of digits left of the decimal point
    let mut point = int_part.len() as i32 + exp10;
    // strip leading zeros (e.g. "0.5" -> digits "05")
    while digits.len() > 1 && digits.starts_with('0') {
        digits.remove(0);
        point -= 1;
    }
    // strip trailing zeros
    while digits.len() > 1 && digits.ends_with('0') {
        digits.pop();
    }
    let k = digits.len() as i32;
    let mut out = String::from(sign);
    if point >= k && point <= 21 {
        // integer with trailing zeros
        out.push_str(&digits);
        for _ in 0..(point - k) {
            out.push('0');
        }
    } else if point > 0 && point <= 21 {
        out.push_str(&digits[..point as usize]);
        out.push('.');
        out.push_str(&digits[point as usize..]);
    } else if point > -6 && point <= 0 {
        out.push_str("0.");
        for _ in 0..-point {
            out.push('0');
        }
        out.push_str(&digits);
    } else {
        // exponent notation, ECMAScript style: `d.ddde+NN`
        out.push_str(&digits[..1]);
        if digits.len() > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        let e = point - 1;
        if e >= 0 {
            out.push_str(&format!("e+{e}"));
        } else {
            out.push_str(&format!("e{e}"));
        }
    }
    out
}

/// A function value: a user closure or a native builtin.
#[derive(Debug)]
pub(crate) struct JsFunction {
    pub callable: Callable,
}

#[derive(Debug)]
pub(crate) enum Callable {
    Closure(Closure),
    Native(NativeFunction),
    /// A builtin global constructor (`Array`, `Error`, …): callable, usable
    /// with `new`, and carrying a static-method table resolved by name.
    Ctor(BuiltinCtor),
    /// A method slot on a host mirror; the bridge resolves it at call time.
    HostMethod {
        handle: crate::host::MirrorHandle,
        name: String,
    },
}

/// A user-defined function capturing its declaring environment.
#[derive(Debug)]
pub(crate) struct Closure {
    /// Function name for diagnostics; empty for anonymous functions.
    pub name: String,
    /// The [`crate::node::NodeKind::Params`] node.
    pub params: Rc<Node>,
    /// A block, or a bare expression for concise arrow bodies.
    pub body: Rc<Node>,
    /// Declaring lexical environment; name resolution starts here, not at
    /// the call site.
    pub scope: ScopeRef,
    /// Arrow functions resolve `this` in the declaring scope instead of the
    /// call-site receiver.
    pub is_arrow: bool,
}

pub(crate) type NativeImpl = fn(&ScopeRef, &Value, &[Value]) -> Value;

/// A builtin invokable, optionally bound to the receiver that produced it
/// (`"ab".indexOf` carries the string along).
pub(crate) struct NativeFunction {
    pub name: &'static str,
    pub func: NativeImpl,
    pub bound_this: Option<Value>,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction").field("name", &self.name).finish()
    }
}

/// A compiled regex literal or `RegExp` object.
#[derive(Debug)]
pub(crate) struct JsRegex {
    pub source: String,
    pub global: bool,
    pub ignore_case: bool,
    pub multiline: bool,
    pub compiled: fancy_regex::Regex,
    /// Resume position for `exec` with the global flag.
    pub last_index: Cell<usize>,
}

/// An instant (epoch milliseconds) plus a fixed display offset.
///
/// `NaN` millis represent an invalid date. Mutating setters update in place;
/// dates are shared by identity like other containers.
#[derive(Debug, Clone, Copy)]
pub(crate) struct JsDate {
    pub millis: f64,
    /// Display zone offset east of UTC, in minutes.
    pub offset_minutes: i32,
}

impl Value {
    pub fn number(d: f64) -> Self {
        Self::Number(narrow(d))
    }

    pub fn int(i: i64) -> Self {
        if let Ok(small) = i32::try_from(i) {
            Self::Number(JsNumber::I32(small))
        } else {
            Self::Number(JsNumber::I64(i))
        }
    }

    pub fn str(s: impl Into<Rc<str>>) -> Self {
        Self::String(s.into())
    }

    pub fn new_array(elements: Vec<Self>) -> Self {
        Self::Array(Rc::new(RefCell::new(elements)))
    }

    pub fn new_object(object: JsObject) -> Self {
        Self::Object(Rc::new(RefCell::new(object)))
    }

    pub fn native_fn(name: &'static str, func: NativeImpl) -> Self {
        Self::Function(Rc::new(JsFunction {
            callable: Callable::Native(NativeFunction {
                name,
                func,
                bound_this: None,
            }),
        }))
    }

    pub fn bound_native_fn(name: &'static str, func: NativeImpl, this: Self) -> Self {
        Self::Function(Rc::new(JsFunction {
            callable: Callable::Native(NativeFunction {
                name,
                func,
                bound_this: Some(this),
            }),
        }))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(n.as_f64()),
            _ => None,
        }
    }

    /// The `typeof` string. `typeof null` stays `"object"`, as in the
    /// language this model preserves.
    pub fn type_of(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Function(_) => "function",
            Self::Null | Self::Array(_) | Self::Object(_) | Self::Regex(_) | Self::Date(_) | Self::Mirror(_) => {
                "object"
            }
        }
    }

    /// Reference identity for container values; used by strict equality and
    /// `instanceof`. Immediate values are never identical by reference.
    pub fn same_identity(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Array(a), Self::Array(b)) => Rc::ptr_eq(a, b),
            (Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => match (&a.callable, &b.callable) {
                (Callable::Ctor(x), Callable::Ctor(y)) => x == y,
                _ => Rc::ptr_eq(a, b),
            },
            (Self::Regex(a), Self::Regex(b)) => Rc::ptr_eq(a, b),
            (Self::Date(a), Self::Date(b)) => Rc::ptr_eq(a, b),
            (Self::Mirror(a), Self::Mirror(b)) => a.same_handle(b),
            _ => false,
        }
    }

    /// Whether this value is an object in the loose sense used by `new` and
    /// `instanceof` (anything reference-shaped).
    pub fn is_object_like(&self) -> bool {
        matches!(
            self,
            Self::Array(_) | Self::Object(_) | Self::Date(_) | Self::Regex(_) | Self::Mirror(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn narrow_prefers_smallest() {
        assert!(matches!(narrow(1.0), JsNumber::I32(1)));
        assert!(matches!(narrow(-2_147_483_648.0), JsNumber::I32(i32::MIN)));
        assert!(matches!(narrow(2_147_483_648.0), JsNumber::I64(2_147_483_648)));
        assert!(matches!(narrow(1.5), JsNumber::F64(_)));
        assert!(matches!(narrow(f64::NAN), JsNumber::F64(_)));
        assert!(matches!(narrow(f64::INFINITY), JsNumber::F64(_)));
    }

    #[test]
    fn narrow_preserves_negative_zero() {
        let n = narrow(-0.0);
        assert!(matches!(n, JsNumber::F64(f) if f == 0.0 && f.is_sign_negative()));
    }

    #[test]
    fn narrow_roundtrips_numerically() {
        for d in [0.0, 1.0, -1.0, 0.5, 1e20, 1e30, -2.5e-8, 9_007_199_254_740_993.0] {
            assert!((narrow(d).as_f64() - d).abs() == 0.0 || (narrow(d).as_f64().is_nan() && d.is_nan()));
        }
    }

    #[test]
    fn number_formatting_matches_ecmascript() {
        assert_eq!(format_f64(3.0), "3");
        assert_eq!(format_f64(3.5), "3.5");
        assert_eq!(format_f64(-0.0), "0");
        assert_eq!(format_f64(0.00001), "0.00001");
        assert_eq!(format_f64(0.000001), "0.000001");
        assert_eq!(format_f64(0.000_000_1), "1e-7");
        assert_eq!(format_f64(1e21), "1e+21");
        assert_eq!(format_f64(1.5e21), "1.5e+21");
        assert_eq!(format_f64(1e20), "100000000000000000000");
        assert_eq!(format_f64(f64::NAN), "NaN");
        assert_eq!(format_f64(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(format_f64(0.1 + 0.2), "0.30000000000000004");
    }
}
