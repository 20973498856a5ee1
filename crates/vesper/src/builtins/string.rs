//! The `String` builtin. Indexing methods speak UTF-16 code units, matching
//! the language's string model; the backing store stays UTF-8.

use std::rc::Rc;

use crate::{
    builtins::{arg, arg_f64, arg_int_or, arg_str, clamp_index, error},
    context::ScopeRef,
    terms::{self, utf16_len, utf16_slice, utf16_units},
    value::{JsRegex, NativeImpl, Value},
};

pub(crate) fn method(name: &str, receiver: &Value) -> Option<Value> {
    let (name, func): (&'static str, NativeImpl) = match name {
        "indexOf" => ("indexOf", index_of),
        "lastIndexOf" => ("lastIndexOf", last_index_of),
        "startsWith" => ("startsWith", starts_with),
        "endsWith" => ("endsWith", ends_with),
        "includes" => ("includes", includes),
        "charAt" => ("charAt", char_at),
        "charCodeAt" => ("charCodeAt", char_code_at),
        "codePointAt" => ("codePointAt", code_point_at),
        "at" => ("at", at),
        "concat" => ("concat", concat),
        "slice" => ("slice", slice),
        "substring" => ("substring", substring),
        "split" => ("split", split),
        "toLowerCase" => ("toLowerCase", to_lower_case),
        "toUpperCase" => ("toUpperCase", to_upper_case),
        "trim" => ("trim", trim),
        "trimStart" => ("trimStart", trim_start),
        "trimEnd" => ("trimEnd", trim_end),
        "padStart" => ("padStart", pad_start),
        "padEnd" => ("padEnd", pad_end),
        "repeat" => ("repeat", repeat),
        "replace" => ("replace", replace),
        "replaceAll" => ("replaceAll", replace_all),
        "match" => ("match", match_method),
        "search" => ("search", search),
        "toString" => ("toString", to_string),
        "valueOf" => ("valueOf", to_string),
        _ => return None,
    };
    Some(Value::bound_native_fn(name, func, receiver.clone()))
}

pub(crate) fn static_member(name: &str) -> Option<Value> {
    let (name, func): (&'static str, NativeImpl) = match name {
        "fromCharCode" => ("fromCharCode", from_char_code),
        "fromCodePoint" => ("fromCodePoint", from_code_point),
        _ => return None,
    };
    Some(Value::native_fn(name, func))
}

fn recv(this: &Value) -> String {
    terms::to_display_string(this)
}

fn to_string(_scope: &ScopeRef, this: &Value, _args: &[Value]) -> Value {
    Value::str(recv(this))
}

/// Finds `needle` in `haystack` at or after `from`, in UTF-16 code units.
fn find_units(haystack: &[u16], needle: &[u16], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(from.min(haystack.len()));
    }
    if needle.len() > haystack.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| &haystack[i..i + needle.len()] == needle)
}

fn index_of(_scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let haystack = utf16_units(&recv(this));
    let needle = utf16_units(&arg_str(args, 0));
    let from = clamp_index(arg_int_or(args, 1, 0), haystack.len());
    match find_units(&haystack, &needle, from) {
        Some(i) => Value::int(i as i64),
        None => Value::int(-1),
    }
}

fn last_index_of(_scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let haystack = utf16_units(&recv(this));
    let needle = utf16_units(&arg_str(args, 0));
    if needle.is_empty() {
        return Value::int(haystack.len() as i64);
    }
    if needle.len() > haystack.len() {
        return Value::int(-1);
    }
    for i in (0..=haystack.len() - needle.len()).rev() {
        if haystack[i..i + needle.len()] == needle[..] {
            return Value::int(i as i64);
        }
    }
    Value::int(-1)
}

fn starts_with(_scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let s = recv(this);
    let prefix = arg_str(args, 0);
    let from = clamp_index(arg_int_or(args, 1, 0), utf16_len(&s));
    Value::Bool(utf16_slice(&s, from, usize::MAX).starts_with(&prefix))
}

fn ends_with(_scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let s = recv(this);
    let suffix = arg_str(args, 0);
    let end = match args.get(1) {
        None | Some(Value::Undefined) => utf16_len(&s),
        Some(v) => clamp_index(terms::to_number(v).trunc() as i64, utf16_len(&s)),
    };
    Value::Bool(utf16_slice(&s, 0, end).ends_with(&suffix))
}

fn includes(_scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let haystack = utf16_units(&recv(this));
    let needle = utf16_units(&arg_str(args, 0));
    let from = clamp_index(arg_int_or(args, 1, 0), haystack.len());
    Value::Bool(find_units(&haystack, &needle, from).is_some())
}

fn char_at(_scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let s = recv(this);
    let i = arg_int_or(args, 0, 0);
    if i < 0 {
        return Value::str("");
    }
    Value::str(utf16_slice(&s, i as usize, i as usize + 1))
}

fn char_code_at(_scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let units = utf16_units(&recv(this));
    let i = arg_int_or(args, 0, 0);
    match usize::try_from(i).ok().and_then(|i| units.get(i)) {
        Some(unit) => Value::int(i64::from(*unit)),
        None => Value::number(f64::NAN),
    }
}

fn code_point_at(_scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let s = recv(this);
    let units = utf16_units(&s);
    let i = arg_int_or(args, 0, 0);
    let Ok(i) = usize::try_from(i) else {
        return Value::Undefined;
    };
    if i >= units.len() {
        return Value::Undefined;
    }
    let tail = String::from_utf16_lossy(&units[i..]);
    match tail.chars().next() {
        Some(c) => Value::int(i64::from(u32::from(c))),
        None => Value::Undefined,
    }
}

fn at(_scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let s = recv(this);
    let len = utf16_len(&s) as i64;
    let mut i = arg_int_or(args, 0, 0);
    if i < 0 {
        i += len;
    }
    if i < 0 || i >= len {
        return Value::Undefined;
    }
    Value::str(utf16_slice(&s, i as usize, i as usize + 1))
}

fn concat(_scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let mut s = recv(this);
    for v in args {
        s.push_str(&terms::to_display_string(v));
    }
    Value::str(s)
}

fn slice(_scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let s = recv(this);
    let len = utf16_len(&s);
    let start = clamp_index(arg_int_or(args, 0, 0), len);
    let end = clamp_index(arg_int_or(args, 1, len as i64), len);
    if start >= end {
        return Value::str("");
    }
    Value::str(utf16_slice(&s, start, end))
}

fn substring(_scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let s = recv(this);
    let len = utf16_len(&s);
    // negative arguments clamp to zero, and the bounds swap if reversed
    let a = arg_int_or(args, 0, 0).max(0).min(len as i64) as usize;
    let b = arg_int_or(args, 1, len as i64).max(0).min(len as i64) as usize;
    Value::str(utf16_slice(&s, a.min(b), a.max(b)))
}

fn split(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let s = recv(this);
    let limit = match args.get(1) {
        None | Some(Value::Undefined) => usize::MAX,
        Some(v) => terms::to_number(v).trunc().max(0.0) as usize,
    };
    let parts: Vec<Value> = match args.first() {
        None | Some(Value::Undefined) => vec![Value::str(s)],
        Some(Value::Regex(regex)) => {
            let mut out = Vec::new();
            let mut last = 0;
            let mut pos = 0;
            while pos <= s.len() {
                let found = match regex.compiled.find_from_pos(&s, pos) {
                    Ok(found) => found,
                    Err(_) => {
                        error::throw(scope, "regex execution failed");
                        return Value::Undefined;
                    }
                };
                let Some(m) = found else { break };
                // an empty match at the very start or end is not a split point
                if m.start() == m.end() && (m.start() == 0 || m.start() >= s.len()) {
                    match s[pos..].chars().next() {
                        Some(c) => {
                            pos += c.len_utf8();
                            continue;
                        }
                        None => break,
                    }
                }
                out.push(Value::str(&s[last..m.start()]));
                last = m.end();
                pos = if m.end() > m.start() {
                    m.end()
                } else {
                    match s[m.end()..].chars().next() {
                        Some(c) => m.end() + c.len_utf8(),
                        None => break,
                    }
                };
            }
            out.push(Value::str(&s[last..]));
            out
        }
        Some(separator) => {
            let sep = terms::to_display_string(separator);
            if sep.is_empty() {
                s.chars().map(|c| Value::str(c.to_string())).collect()
            } else {
                s.split(&sep as &str).map(Value::str).collect()
            }
        }
    };
    Value::new_array(parts.into_iter().take(limit).collect())
}

fn to_lower_case(_scope: &ScopeRef, this: &Value, _args: &[Value]) -> Value {
    Value::str(recv(this).to_lowercase())
}

fn to_upper_case(_scope: &ScopeRef, this: &Value, _args: &[Value]) -> Value {
    Value::str(recv(this).to_uppercase())
}

fn trim(_scope: &ScopeRef, this: &Value, _args: &[Value]) -> Value {
    Value::str(recv(this).trim().to_owned())
}

fn trim_start(_scope: &ScopeRef, this: &Value, _args: &[Value]) -> Value {
    Value::str(recv(this).trim_start().to_owned())
}

fn trim_end(_scope: &ScopeRef, this: &Value, _args: &[Value]) -> Value {
    Value::str(recv(this).trim_end().to_owned())
}

fn pad(this: &Value, args: &[Value], at_start: bool) -> Value {
    let s = recv(this);
    let len = utf16_len(&s);
    let target = arg_int_or(args, 0, 0).max(0) as usize;
    if target <= len {
        return Value::str(s);
    }
    let filler = match args.get(1) {
        None | Some(Value::Undefined) => " ".to_owned(),
        Some(v) => terms::to_display_string(v),
    };
    if filler.is_empty() {
        return Value::str(s);
    }
    let mut pad = String::new();
    while utf16_len(&pad) < target - len {
        pad.push_str(&filler);
    }
    let pad = utf16_slice(&pad, 0, target - len);
    Value::str(if at_start { format!("{pad}{s}") } else { format!("{s}{pad}") })
}

fn pad_start(_scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    pad(this, args, true)
}

fn pad_end(_scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    pad(this, args, false)
}

fn repeat(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let count = arg_f64(args, 0);
    if count < 0.0 || !count.is_finite() {
        error::throw_range(scope, "Invalid count value");
        return Value::Undefined;
    }
    Value::str(recv(this).repeat(count.trunc() as usize))
}

/// Expands `$&` and `$1`..`$9` in a replacement template.
fn expand_template(template: &str, full: &str, groups: &[Option<String>]) -> String {
    let mut out = String::new();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('&') => {
                chars.next();
                out.push_str(full);
            }
            Some('$') => {
                chars.next();
                out.push('$');
            }
            Some(d) if d.is_ascii_digit() => {
                let i = d.to_digit(10).expect("digit") as usize;
                chars.next();
                if i >= 1 {
                    if let Some(Some(g)) = groups.get(i - 1) {
                        out.push_str(g);
                    }
                }
            }
            _ => out.push('$'),
        }
    }
    out
}

/// Produces one replacement, either by expanding a template or by calling
/// the replacement function. Returns `None` if the callback threw.
fn render_replacement(
    scope: &ScopeRef,
    replacement: &Value,
    matched: &str,
    groups: &[Option<String>],
    offset: usize,
    full: &str,
) -> Option<String> {
    match replacement {
        Value::Function(_) => {
            let mut call_args = vec![Value::str(matched)];
            for g in groups {
                call_args.push(g.as_ref().map_or(Value::Undefined, |g| Value::str(g.as_str())));
            }
            call_args.push(Value::int(offset as i64));
            call_args.push(Value::str(full));
            let replaced = crate::interp::call_value(scope, replacement, &Value::Undefined, &call_args, "replace");
            if scope.borrow().is_stopped() {
                return None;
            }
            Some(terms::to_display_string(&replaced))
        }
        other => {
            let template = terms::to_display_string(other);
            Some(expand_template(&template, matched, groups))
        }
    }
}

/// One regex replacement pass; `all` replaces every match.
fn regex_replace(scope: &ScopeRef, s: &str, regex: &JsRegex, replacement: &Value, all: bool) -> Value {
    let mut out = String::new();
    let mut last = 0;
    let mut pos = 0;
    while pos <= s.len() {
        let captures = match regex.compiled.captures_from_pos(s, pos) {
            Ok(Some(c)) => c,
            Ok(None) => break,
            Err(_) => {
                error::throw(scope, "regex execution failed");
                return Value::Undefined;
            }
        };
        let m = captures.get(0).expect("group 0");
        out.push_str(&s[last..m.start()]);
        let groups: Vec<Option<String>> = (1..captures.len())
            .map(|i| captures.get(i).map(|g| g.as_str().to_owned()))
            .collect();
        let offset = utf16_len(&s[..m.start()]);
        let Some(rendered) = render_replacement(scope, replacement, m.as_str(), &groups, offset, s) else {
            return Value::Undefined;
        };
        out.push_str(&rendered);
        last = m.end();
        pos = if m.end() > m.start() {
            m.end()
        } else {
            match s[m.end()..].chars().next() {
                Some(c) => m.end() + c.len_utf8(),
                None => break,
            }
        };
        if !all {
            break;
        }
    }
    out.push_str(&s[last..]);
    Value::str(out)
}

fn literal_replace(scope: &ScopeRef, s: &str, pattern: &str, replacement: &Value, all: bool) -> Value {
    if pattern.is_empty() {
        // an empty pattern matches before every character, and at the end
        let mut out = String::new();
        let mut offset = 0;
        for c in s.chars() {
            let Some(rendered) = render_replacement(scope, replacement, "", &[], offset, s) else {
                return Value::Undefined;
            };
            out.push_str(&rendered);
            out.push(c);
            offset += 1;
            if !all {
                out.push_str(&s[c.len_utf8()..]);
                return Value::str(out);
            }
        }
        let Some(rendered) = render_replacement(scope, replacement, "", &[], offset, s) else {
            return Value::Undefined;
        };
        out.push_str(&rendered);
        return Value::str(out);
    }
    let mut out = String::new();
    let mut rest = s;
    while let Some(i) = rest.find(pattern) {
        out.push_str(&rest[..i]);
        let offset = utf16_len(&s[..s.len() - rest.len() + i]);
        let Some(rendered) = render_replacement(scope, replacement, pattern, &[], offset, s) else {
            return Value::Undefined;
        };
        out.push_str(&rendered);
        rest = &rest[i + pattern.len()..];
        if !all {
            break;
        }
    }
    out.push_str(rest);
    Value::str(out)
}

fn replace(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let s = recv(this);
    let replacement = arg(args, 1);
    match args.first() {
        Some(Value::Regex(regex)) => regex_replace(scope, &s, regex, &replacement, regex.global),
        other => {
            let pattern = other.map_or_else(|| "undefined".to_owned(), terms::to_display_string);
            literal_replace(scope, &s, &pattern, &replacement, false)
        }
    }
}

fn replace_all(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let s = recv(this);
    let replacement = arg(args, 1);
    match args.first() {
        Some(Value::Regex(regex)) => {
            if !regex.global {
                error::throw_type(scope, "replaceAll must be called with a global RegExp");
                return Value::Undefined;
            }
            regex_replace(scope, &s, regex, &replacement, true)
        }
        other => {
            let pattern = other.map_or_else(|| "undefined".to_owned(), terms::to_display_string);
            literal_replace(scope, &s, &pattern, &replacement, true)
        }
    }
}

fn match_method(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let s = recv(this);
    let Some(Value::Regex(regex)) = args.first() else {
        error::throw_type(scope, "match expects a RegExp");
        return Value::Undefined;
    };
    if regex.global {
        let mut out = Vec::new();
        let mut pos = 0;
        while pos <= s.len() {
            match regex.compiled.find_from_pos(&s, pos) {
                Ok(Some(m)) => {
                    out.push(Value::str(m.as_str()));
                    pos = if m.end() > m.start() { m.end() } else { m.end() + 1 };
                }
                Ok(None) | Err(_) => break,
            }
        }
        if out.is_empty() { Value::Null } else { Value::new_array(out) }
    } else {
        match regex.compiled.captures(&s) {
            Ok(Some(captures)) => {
                let values: Vec<Value> = (0..captures.len())
                    .map(|i| captures.get(i).map_or(Value::Undefined, |g| Value::str(g.as_str())))
                    .collect();
                Value::new_array(values)
            }
            _ => Value::Null,
        }
    }
}

fn search(_scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let s = recv(this);
    let Some(Value::Regex(regex)) = args.first() else {
        return Value::int(-1);
    };
    match regex.compiled.find(&s) {
        Ok(Some(m)) => Value::int(utf16_len(&s[..m.start()]) as i64),
        _ => Value::int(-1),
    }
}

fn from_char_code(_scope: &ScopeRef, _this: &Value, args: &[Value]) -> Value {
    let units: Vec<u16> = args.iter().map(|v| terms::to_uint32(terms::to_number(v)) as u16).collect();
    Value::str(String::from_utf16_lossy(&units))
}

fn from_code_point(scope: &ScopeRef, _this: &Value, args: &[Value]) -> Value {
    let mut out = String::new();
    for v in args {
        let code = terms::to_number(v);
        match char::from_u32(code as u32) {
            Some(c) if code.fract() == 0.0 && code >= 0.0 => out.push(c),
            _ => {
                error::throw_range(scope, &format!("Invalid code point {}", terms::to_display_string(v)));
                return Value::Undefined;
            }
        }
    }
    Value::str(out)
}

/// Substring view used by indexed access (`s[0]`) from the property layer.
pub(crate) fn char_at_index(s: &str, index: usize) -> Option<Rc<str>> {
    if index >= utf16_len(s) {
        return None;
    }
    Some(Rc::from(utf16_slice(s, index, index + 1)))
}
