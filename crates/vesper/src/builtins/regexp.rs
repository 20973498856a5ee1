//! The `RegExp` builtin.
//!
//! Patterns compile through `fancy-regex`, which supports the backreference
//! and lookaround forms JavaScript programs lean on. The `i` and `m` flags
//! translate to inline `(?i)`/`(?m)` groups at compile time; `g` changes
//! `exec` into a cursor over `lastIndex`.

use std::{cell::Cell, rc::Rc};

use crate::{
    builtins::{arg, error},
    context::ScopeRef,
    terms,
    value::{JsRegex, NativeImpl, Value},
};

/// Compiles a pattern + flag string into a regex value. Reports a
/// SyntaxError-shaped throw on an invalid pattern.
pub(crate) fn compile(scope: &ScopeRef, source: &str, flags: &str) -> Option<Value> {
    let global = flags.contains('g');
    let ignore_case = flags.contains('i');
    let multiline = flags.contains('m');
    let dotall = flags.contains('s');
    let mut prefix = String::new();
    if ignore_case || multiline || dotall {
        prefix.push_str("(?");
        if ignore_case {
            prefix.push('i');
        }
        if multiline {
            prefix.push('m');
        }
        if dotall {
            prefix.push('s');
        }
        prefix.push(')');
    }
    match fancy_regex::Regex::new(&format!("{prefix}{source}")) {
        Ok(compiled) => Some(Value::Regex(Rc::new(JsRegex {
            source: source.to_owned(),
            global,
            ignore_case,
            multiline,
            compiled,
            last_index: Cell::new(0),
        }))),
        Err(e) => {
            error::throw(scope, &format!("Invalid regular expression: {e}"));
            None
        }
    }
}

pub(crate) fn construct(scope: &ScopeRef, args: &[Value]) -> Value {
    match args.first() {
        Some(Value::Regex(existing)) => {
            let flags = match args.get(1) {
                None | Some(Value::Undefined) => terms::regex_flags(existing),
                Some(v) => terms::to_display_string(v),
            };
            compile(scope, &existing.source.clone(), &flags).unwrap_or(Value::Undefined)
        }
        other => {
            let source = match other {
                None | Some(Value::Undefined) => String::new(),
                Some(v) => terms::to_display_string(v),
            };
            let flags = match args.get(1) {
                None | Some(Value::Undefined) => String::new(),
                Some(v) => terms::to_display_string(v),
            };
            compile(scope, &source, &flags).unwrap_or(Value::Undefined)
        }
    }
}

/// Builds a regex value from a literal token text (`/pat/flags`).
pub(crate) fn from_literal(scope: &ScopeRef, text: &str) -> Option<Value> {
    let end = text.rfind('/').expect("regex literal has a closing slash");
    let source = &text[1..end];
    let flags = &text[end + 1..];
    compile(scope, source, flags)
}

pub(crate) fn method(name: &str, receiver: &Value) -> Option<Value> {
    let (name, func): (&'static str, NativeImpl) = match name {
        "test" => ("test", test),
        "exec" => ("exec", exec),
        "toString" => ("toString", to_string),
        _ => return None,
    };
    Some(Value::bound_native_fn(name, func, receiver.clone()))
}

/// Data properties exposed on regex values.
pub(crate) fn property(regex: &Rc<JsRegex>, name: &str) -> Option<Value> {
    let value = match name {
        "source" => Value::str(regex.source.clone()),
        "flags" => Value::str(terms::regex_flags(regex)),
        "global" => Value::Bool(regex.global),
        "ignoreCase" => Value::Bool(regex.ignore_case),
        "multiline" => Value::Bool(regex.multiline),
        "lastIndex" => Value::int(regex.last_index.get() as i64),
        _ => return None,
    };
    Some(value)
}

fn test(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    match exec(scope, this, args) {
        Value::Null => Value::Bool(false),
        Value::Undefined => Value::Undefined,
        _ => Value::Bool(true),
    }
}

fn exec(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let Value::Regex(regex) = this else {
        error::throw_type(scope, "exec must be called on a RegExp");
        return Value::Undefined;
    };
    let text = terms::to_display_string(&arg(args, 0));
    let start = if regex.global { regex.last_index.get().min(text.len()) } else { 0 };
    // clamp to a char boundary in case lastIndex landed inside a multibyte char
    let start = (start..=text.len()).find(|i| text.is_char_boundary(*i)).unwrap_or(0);
    let captures = match regex.compiled.captures_from_pos(&text, start) {
        Ok(Some(captures)) => captures,
        Ok(None) => {
            if regex.global {
                regex.last_index.set(0);
            }
            return Value::Null;
        }
        Err(_) => {
            error::throw(scope, "regex execution failed");
            return Value::Undefined;
        }
    };
    let full = captures.get(0).expect("group 0");
    if regex.global {
        regex.last_index.set(if full.end() > full.start() { full.end() } else { full.end() + 1 });
    }
    let values: Vec<Value> = (0..captures.len())
        .map(|i| captures.get(i).map_or(Value::Undefined, |g| Value::str(g.as_str())))
        .collect();
    Value::new_array(values)
}

fn to_string(_scope: &ScopeRef, this: &Value, _args: &[Value]) -> Value {
    Value::str(terms::to_display_string(this))
}
