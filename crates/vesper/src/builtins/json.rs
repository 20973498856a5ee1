//! The `JSON` builtin, backed by `serde_json` (with `preserve_order`, so
//! parsed object keys keep their document order, matching the engine's
//! insertion-ordered objects).

use indexmap::IndexMap;

use crate::{
    builtins::{arg, error},
    context::ScopeRef,
    terms,
    value::{JsObject, Value},
};

pub(crate) fn create() -> Value {
    let mut object = JsObject::new();
    object
        .entries
        .insert("stringify".to_owned(), Value::native_fn("stringify", stringify));
    object.entries.insert("parse".to_owned(), Value::native_fn("parse", parse));
    Value::new_object(object)
}

/// Keys allowed by a replacer array, or `None` for no filtering.
fn key_filter(replacer: &Value) -> Option<ahash::AHashSet<String>> {
    match replacer {
        Value::Array(elements) => Some(
            elements
                .borrow()
                .iter()
                .map(terms::to_display_string)
                .collect(),
        ),
        _ => None,
    }
}

fn indent_of(space: &Value) -> Option<String> {
    match space {
        Value::Number(n) => {
            let count = (n.as_f64().trunc() as i64).clamp(0, 10);
            if count <= 0 { None } else { Some(" ".repeat(count as usize)) }
        }
        Value::String(s) => {
            if s.is_empty() {
                None
            } else {
                Some(s.chars().take(10).collect())
            }
        }
        _ => None,
    }
}

fn stringify(_scope: &ScopeRef, _this: &Value, args: &[Value]) -> Value {
    let value = arg(args, 0);
    let filter = key_filter(&arg(args, 1));
    let indent = indent_of(&arg(args, 2));
    let mut path = Vec::new();
    let mut out = String::new();
    if write_json(&value, filter.as_ref(), indent.as_deref(), 0, &mut path, &mut out) {
        Value::str(out)
    } else {
        Value::Undefined
    }
}

/// Serializes `value`; returns `false` for values JSON omits entirely
/// (undefined and functions).
fn write_json(
    value: &Value,
    filter: Option<&ahash::AHashSet<String>>,
    indent: Option<&str>,
    depth: usize,
    path: &mut Vec<usize>,
    out: &mut String,
) -> bool {
    match value {
        Value::Undefined | Value::Function(_) => false,
        Value::Null => {
            out.push_str("null");
            true
        }
        Value::Bool(b) => {
            out.push_str(if *b { "true" } else { "false" });
            true
        }
        Value::Number(n) => {
            let f = n.as_f64();
            if f.is_finite() {
                out.push_str(&n.to_string());
            } else {
                out.push_str("null");
            }
            true
        }
        Value::String(s) => {
            write_json_string(s, out);
            true
        }
        Value::Date(d) => {
            write_json_string(&super::date::to_iso_string(&d.borrow()), out);
            true
        }
        Value::Regex(_) | Value::Mirror(_) => {
            out.push_str("{}");
            true
        }
        Value::Array(elements) => {
            let id = std::rc::Rc::as_ptr(elements) as usize;
            if path.contains(&id) {
                out.push_str("null");
                return true;
            }
            path.push(id);
            let snapshot = elements.borrow().clone();
            out.push('[');
            for (i, element) in snapshot.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                newline_indent(indent, depth + 1, out);
                if !write_json(element, filter, indent, depth + 1, path, out) {
                    out.push_str("null");
                }
            }
            if !snapshot.is_empty() {
                newline_indent(indent, depth, out);
            }
            out.push(']');
            path.pop();
            true
        }
        Value::Object(object) => {
            let id = std::rc::Rc::as_ptr(object) as usize;
            if path.contains(&id) {
                out.push_str("null");
                return true;
            }
            path.push(id);
            let snapshot: Vec<(String, Value)> =
                object.borrow().entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            out.push('{');
            let mut written = 0usize;
            for (key, entry) in &snapshot {
                if filter.is_some_and(|keys| !keys.contains(key)) {
                    continue;
                }
                let mut piece = String::new();
                if !write_json(entry, filter, indent, depth + 1, path, &mut piece) {
                    continue;
                }
                if written > 0 {
                    out.push(',');
                }
                newline_indent(indent, depth + 1, out);
                write_json_string(key, out);
                out.push(':');
                if indent.is_some() {
                    out.push(' ');
                }
                out.push_str(&piece);
                written += 1;
            }
            if written > 0 {
                newline_indent(indent, depth, out);
            }
            out.push('}');
            path.pop();
            true
        }
    }
}

fn newline_indent(indent: Option<&str>, depth: usize, out: &mut String) {
    if let Some(indent) = indent {
        out.push('\n');
        for _ in 0..depth {
            out.push_str(indent);
        }
    }
}

fn write_json_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            _ => out.push(c),
        }
    }
    out.push('"');
}

fn parse(scope: &ScopeRef, _this: &Value, args: &[Value]) -> Value {
    let text = terms::to_display_string(&arg(args, 0));
    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(parsed) => from_serde(parsed),
        Err(e) => {
            error::throw(scope, &format!("JSON.parse: {e}"));
            Value::Undefined
        }
    }
}

fn from_serde(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => Value::number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::str(s),
        serde_json::Value::Array(elements) => Value::new_array(elements.into_iter().map(from_serde).collect()),
        serde_json::Value::Object(entries) => {
            let mut map = IndexMap::new();
            for (k, v) in entries {
                map.insert(k, from_serde(v));
            }
            Value::new_object(JsObject::from_entries(map))
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn scope() -> ScopeRef {
        crate::context::Context::root(std::rc::Rc::new(crate::context::EngineHooks::new()))
    }

    #[test]
    fn stringify_basics() {
        let s = scope();
        let arr = Value::new_array(vec![Value::int(1), Value::str("a"), Value::Null, Value::Undefined]);
        let out = stringify(&s, &Value::Undefined, &[arr]);
        assert_eq!(terms::to_display_string(&out), "[1,\"a\",null,null]");
    }

    #[test]
    fn stringify_undefined_is_omitted() {
        let s = scope();
        assert!(matches!(stringify(&s, &Value::Undefined, &[Value::Undefined]), Value::Undefined));
        let mut object = JsObject::new();
        object.entries.insert("a".to_owned(), Value::Undefined);
        object.entries.insert("b".to_owned(), Value::int(1));
        let out = stringify(&s, &Value::Undefined, &[Value::new_object(object)]);
        assert_eq!(terms::to_display_string(&out), "{\"b\":1}");
    }

    #[test]
    fn stringify_cycles_become_null() {
        let s = scope();
        let arr = Value::new_array(vec![]);
        if let Value::Array(elements) = &arr {
            elements.borrow_mut().push(arr.clone());
        }
        let out = stringify(&s, &Value::Undefined, &[arr]);
        assert_eq!(terms::to_display_string(&out), "[null]");
    }

    #[test]
    fn parse_preserves_key_order() {
        let s = scope();
        let parsed = parse(&s, &Value::Undefined, &[Value::str("{\"z\":1,\"a\":{\"q\":[1,2.5]}}")]);
        assert_eq!(terms::to_display_string(&parsed), "{\"z\":1,\"a\":{\"q\":[1,2.5]}}");
    }

    #[test]
    fn non_finite_numbers_serialize_as_null() {
        let s = scope();
        let out = stringify(&s, &Value::Undefined, &[Value::number(f64::INFINITY)]);
        assert_eq!(terms::to_display_string(&out), "null");
    }
}
