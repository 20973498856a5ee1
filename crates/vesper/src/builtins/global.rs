//! Free-standing globals: `parseInt`, `parseFloat`, `isNaN`, `isFinite`,
//! and the `console` object.

use crate::{
    builtins::{arg, arg_int_or},
    context::ScopeRef,
    io::ConsoleLevel,
    terms,
    value::{JsObject, Value},
};

pub(crate) fn parse_int(_scope: &ScopeRef, _this: &Value, args: &[Value]) -> Value {
    let text = terms::to_display_string(&arg(args, 0));
    let text = text.trim();
    // radix 0 means unspecified: decimal, except that a 0x prefix selects 16
    let specified = arg_int_or(args, 1, 0);
    if specified != 0 && !(2..=36).contains(&specified) {
        return Value::number(f64::NAN);
    }
    let (sign, rest) = match text.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, text.strip_prefix('+').unwrap_or(text)),
    };
    let (rest, radix) = if specified == 0 || specified == 16 {
        match rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
            Some(hex) => (hex, 16),
            None => (rest, if specified == 0 { 10 } else { 16 }),
        }
    } else {
        (rest, specified)
    };
    // consume the longest valid digit prefix
    let mut value = f64::NAN;
    let mut acc = 0.0f64;
    let mut seen = false;
    for c in rest.chars() {
        match c.to_digit(36) {
            Some(d) if i64::from(d) < radix => {
                acc = acc * radix as f64 + f64::from(d);
                seen = true;
            }
            _ => break,
        }
    }
    if seen {
        value = sign * acc;
    }
    Value::number(value)
}

pub(crate) fn parse_float(_scope: &ScopeRef, _this: &Value, args: &[Value]) -> Value {
    let text = terms::to_display_string(&arg(args, 0));
    let text = text.trim();
    // longest numeric prefix
    let mut end = 0;
    let bytes = text.as_bytes();
    let mut seen_dot = false;
    let mut seen_e = false;
    while end < bytes.len() {
        let c = bytes[end] as char;
        let ok = c.is_ascii_digit()
            || (c == '.' && !seen_dot && !seen_e)
            || ((c == 'e' || c == 'E') && !seen_e && end > 0)
            || ((c == '+' || c == '-') && (end == 0 || matches!(bytes[end - 1], b'e' | b'E')));
        if !ok {
            break;
        }
        if c == '.' {
            seen_dot = true;
        }
        if c == 'e' || c == 'E' {
            seen_e = true;
        }
        end += 1;
    }
    let value = text[..end].parse::<f64>().unwrap_or(f64::NAN);
    Value::number(value)
}

pub(crate) fn is_nan(_scope: &ScopeRef, _this: &Value, args: &[Value]) -> Value {
    Value::Bool(terms::to_number(&arg(args, 0)).is_nan())
}

pub(crate) fn is_finite(_scope: &ScopeRef, _this: &Value, args: &[Value]) -> Value {
    Value::Bool(terms::to_number(&arg(args, 0)).is_finite())
}

/// Builds the `console` object with `log`/`warn`/`error` bound to the
/// engine's pluggable sink.
pub(crate) fn create_console() -> Value {
    let mut object = JsObject::new();
    object.entries.insert("log".to_owned(), Value::native_fn("log", console_log));
    object.entries.insert("warn".to_owned(), Value::native_fn("warn", console_warn));
    object
        .entries
        .insert("error".to_owned(), Value::native_fn("error", console_error));
    Value::new_object(object)
}

fn write_console(scope: &ScopeRef, level: ConsoleLevel, args: &[Value]) -> Value {
    let line = args.iter().map(terms::to_display_string).collect::<Vec<_>>().join(" ");
    let hooks = scope.borrow().hooks.clone();
    hooks.console.borrow_mut().write_line(level, &line);
    Value::Undefined
}

fn console_log(scope: &ScopeRef, _this: &Value, args: &[Value]) -> Value {
    write_console(scope, ConsoleLevel::Log, args)
}

fn console_warn(scope: &ScopeRef, _this: &Value, args: &[Value]) -> Value {
    write_console(scope, ConsoleLevel::Warn, args)
}

fn console_error(scope: &ScopeRef, _this: &Value, args: &[Value]) -> Value {
    write_console(scope, ConsoleLevel::Error, args)
}
