//! The `Array` builtin.
//!
//! Iteration-style methods (`map`, `filter`, `reduce`, …) call back into the
//! evaluator; each callback invocation is followed by a stop check so a
//! throw inside the callback aborts the walk and propagates.

use crate::{
    builtins::{arg, arg_f64, arg_int_or, clamp_index, error},
    context::ScopeRef,
    interp::call_value,
    terms,
    value::{NativeImpl, Value},
};

pub(crate) fn construct(_scope: &ScopeRef, args: &[Value]) -> Value {
    // a single numeric argument is a length; anything else is elements
    if args.len() == 1 {
        if let Value::Number(n) = &args[0] {
            let len = n.as_f64();
            if len >= 0.0 && len.fract() == 0.0 {
                return Value::new_array(vec![Value::Null; len as usize]);
            }
        }
    }
    Value::new_array(args.to_vec())
}

pub(crate) fn static_member(name: &str) -> Option<Value> {
    let (name, func): (&'static str, NativeImpl) = match name {
        "isArray" => ("isArray", is_array),
        "of" => ("of", of),
        "from" => ("from", from),
        _ => return None,
    };
    Some(Value::native_fn(name, func))
}

pub(crate) fn method(name: &str, receiver: &Value) -> Option<Value> {
    let (name, func): (&'static str, NativeImpl) = match name {
        "push" => ("push", push),
        "pop" => ("pop", pop),
        "shift" => ("shift", shift),
        "unshift" => ("unshift", unshift),
        "slice" => ("slice", slice),
        "splice" => ("splice", splice),
        "concat" => ("concat", concat),
        "indexOf" => ("indexOf", index_of),
        "lastIndexOf" => ("lastIndexOf", last_index_of),
        "includes" => ("includes", includes),
        "join" => ("join", join),
        "reverse" => ("reverse", reverse),
        "sort" => ("sort", sort),
        "map" => ("map", map),
        "filter" => ("filter", filter),
        "find" => ("find", find),
        "findIndex" => ("findIndex", find_index),
        "findLast" => ("findLast", find_last),
        "findLastIndex" => ("findLastIndex", find_last_index),
        "forEach" => ("forEach", for_each),
        "some" => ("some", some),
        "every" => ("every", every),
        "reduce" => ("reduce", reduce),
        "reduceRight" => ("reduceRight", reduce_right),
        "flat" => ("flat", flat),
        "flatMap" => ("flatMap", flat_map),
        "fill" => ("fill", fill),
        "at" => ("at", at),
        "keys" => ("keys", keys),
        "values" => ("values", values),
        "entries" => ("entries", entries),
        "copyWithin" => ("copyWithin", copy_within),
        "with" => ("with", with),
        "toString" => ("toString", to_string),
        _ => return None,
    };
    Some(Value::bound_native_fn(name, func, receiver.clone()))
}

/// The receiver's element vector; `None` (plus a TypeError) when the bound
/// receiver is not an array.
fn recv(scope: &ScopeRef, this: &Value) -> Option<std::rc::Rc<std::cell::RefCell<Vec<Value>>>> {
    match this {
        Value::Array(elements) => Some(elements.clone()),
        other => {
            error::throw_type(scope, &format!("{} is not an array", terms::to_display_string(other)));
            None
        }
    }
}

fn is_array(_scope: &ScopeRef, _this: &Value, args: &[Value]) -> Value {
    Value::Bool(matches!(arg(args, 0), Value::Array(_)))
}

fn of(_scope: &ScopeRef, _this: &Value, args: &[Value]) -> Value {
    Value::new_array(args.to_vec())
}

fn from(scope: &ScopeRef, _this: &Value, args: &[Value]) -> Value {
    let source = arg(args, 0);
    let mapper = arg(args, 1);
    let mut out = Vec::new();
    for (i, (_, v)) in terms::iterate(&source).into_iter().enumerate() {
        let mapped = if matches!(mapper, Value::Function(_)) {
            let mapped = call_value(scope, &mapper, &Value::Undefined, &[v, Value::int(i as i64)], "Array.from");
            if scope.borrow().is_stopped() {
                return Value::Undefined;
            }
            mapped
        } else {
            v
        };
        out.push(mapped);
    }
    Value::new_array(out)
}

fn push(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let Some(elements) = recv(scope, this) else {
        return Value::Undefined;
    };
    elements.borrow_mut().extend(args.iter().cloned());
    Value::int(elements.borrow().len() as i64)
}

fn pop(scope: &ScopeRef, this: &Value, _args: &[Value]) -> Value {
    let Some(elements) = recv(scope, this) else {
        return Value::Undefined;
    };
    let popped = elements.borrow_mut().pop();
    popped.unwrap_or(Value::Undefined)
}

fn shift(scope: &ScopeRef, this: &Value, _args: &[Value]) -> Value {
    let Some(elements) = recv(scope, this) else {
        return Value::Undefined;
    };
    let mut elements = elements.borrow_mut();
    if elements.is_empty() {
        Value::Undefined
    } else {
        elements.remove(0)
    }
}

fn unshift(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let Some(elements) = recv(scope, this) else {
        return Value::Undefined;
    };
    let mut elements = elements.borrow_mut();
    for (i, v) in args.iter().enumerate() {
        elements.insert(i, v.clone());
    }
    Value::int(elements.len() as i64)
}

fn slice(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let Some(elements) = recv(scope, this) else {
        return Value::Undefined;
    };
    let elements = elements.borrow();
    let len = elements.len();
    let start = clamp_index(arg_int_or(args, 0, 0), len);
    let end = clamp_index(arg_int_or(args, 1, len as i64), len);
    if start >= end {
        return Value::new_array(Vec::new());
    }
    Value::new_array(elements[start..end].to_vec())
}

fn splice(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let Some(elements) = recv(scope, this) else {
        return Value::Undefined;
    };
    let mut elements = elements.borrow_mut();
    let len = elements.len();
    let start = clamp_index(arg_int_or(args, 0, 0), len);
    let delete_count = match args.get(1) {
        None => len - start,
        Some(v) => (terms::to_number(v).trunc().max(0.0) as usize).min(len - start),
    };
    let removed: Vec<Value> = elements.splice(start..start + delete_count, args.iter().skip(2).cloned()).collect();
    Value::new_array(removed)
}

fn concat(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let Some(elements) = recv(scope, this) else {
        return Value::Undefined;
    };
    let mut out = elements.borrow().clone();
    for v in args {
        match v {
            Value::Array(more) => out.extend(more.borrow().iter().cloned()),
            other => out.push(other.clone()),
        }
    }
    Value::new_array(out)
}

fn index_of(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let Some(elements) = recv(scope, this) else {
        return Value::Undefined;
    };
    let elements = elements.borrow();
    let target = arg(args, 0);
    let from = clamp_index(arg_int_or(args, 1, 0), elements.len());
    for (i, v) in elements.iter().enumerate().skip(from) {
        if terms::eq_strict(v, &target) {
            return Value::int(i as i64);
        }
    }
    Value::int(-1)
}

fn last_index_of(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let Some(elements) = recv(scope, this) else {
        return Value::Undefined;
    };
    let elements = elements.borrow();
    let target = arg(args, 0);
    for (i, v) in elements.iter().enumerate().rev() {
        if terms::eq_strict(v, &target) {
            return Value::int(i as i64);
        }
    }
    Value::int(-1)
}

fn includes(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let Some(elements) = recv(scope, this) else {
        return Value::Undefined;
    };
    let target = arg(args, 0);
    let found = elements.borrow().iter().any(|v| {
        // SameValueZero: NaN is found by includes
        terms::eq_strict(v, &target) || (matches!(v.as_f64(), Some(f) if f.is_nan()) && matches!(target.as_f64(), Some(f) if f.is_nan()))
    });
    Value::Bool(found)
}

fn join(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let Some(elements) = recv(scope, this) else {
        return Value::Undefined;
    };
    let separator = match args.first() {
        None | Some(Value::Undefined) => ",".to_owned(),
        Some(v) => terms::to_display_string(v),
    };
    let joined = elements
        .borrow()
        .iter()
        .map(|v| match v {
            Value::Undefined | Value::Null => String::new(),
            other => terms::to_display_string(other),
        })
        .collect::<Vec<_>>()
        .join(&separator);
    Value::str(joined)
}

fn reverse(scope: &ScopeRef, this: &Value, _args: &[Value]) -> Value {
    let Some(elements) = recv(scope, this) else {
        return Value::Undefined;
    };
    elements.borrow_mut().reverse();
    this.clone()
}

fn sort(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let Some(elements) = recv(scope, this) else {
        return Value::Undefined;
    };
    let comparator = arg(args, 0);
    // take the elements out so a comparator touching the array sees a
    // consistent (empty) state rather than aliasing the sort buffer
    let mut work: Vec<Value> = std::mem::take(&mut *elements.borrow_mut());
    // undefined entries always sort to the end
    let defined_len = {
        let mut defined: Vec<Value> = Vec::with_capacity(work.len());
        let mut undefined_count = 0usize;
        for v in work {
            if v.is_undefined() {
                undefined_count += 1;
            } else {
                defined.push(v);
            }
        }
        let len = defined.len();
        work = defined;
        for _ in 0..undefined_count {
            work.push(Value::Undefined);
        }
        len
    };
    let slice = &mut work[..defined_len];
    if matches!(comparator, Value::Function(_)) {
        slice.sort_by(|a, b| {
            if scope.borrow().is_stopped() {
                return std::cmp::Ordering::Equal;
            }
            let result = call_value(scope, &comparator, &Value::Undefined, &[a.clone(), b.clone()], "sort");
            let f = terms::to_number(&result);
            if f < 0.0 {
                std::cmp::Ordering::Less
            } else if f > 0.0 {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        });
    } else {
        slice.sort_by(|a, b| terms::to_display_string(a).cmp(&terms::to_display_string(b)));
    }
    *elements.borrow_mut() = work;
    if scope.borrow().is_stopped() {
        return Value::Undefined;
    }
    this.clone()
}

/// Runs `callback(element, index, array)` over each element, handing the
/// result to `visit`; stops early when `visit` returns `false` or the
/// callback throws.
fn iterate_with(
    scope: &ScopeRef,
    this: &Value,
    callback: &Value,
    what: &'static str,
    mut visit: impl FnMut(usize, &Value, Value) -> bool,
) -> bool {
    let Some(elements) = recv(scope, this) else {
        return false;
    };
    let mut i = 0;
    loop {
        // fetch through the index each pass so callbacks may mutate
        let element = {
            let elements = elements.borrow();
            match elements.get(i) {
                Some(v) => v.clone(),
                None => return true,
            }
        };
        let result = call_value(
            scope,
            callback,
            &Value::Undefined,
            &[element.clone(), Value::int(i as i64), this.clone()],
            what,
        );
        if scope.borrow().is_stopped() {
            return false;
        }
        if !visit(i, &element, result) {
            return false;
        }
        i += 1;
    }
}

fn map(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let callback = arg(args, 0);
    let mut out = Vec::new();
    let completed = iterate_with(scope, this, &callback, "map", |_, _, mapped| {
        out.push(mapped);
        true
    });
    if completed { Value::new_array(out) } else { Value::Undefined }
}

fn filter(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let callback = arg(args, 0);
    let mut out = Vec::new();
    let completed = iterate_with(scope, this, &callback, "filter", |_, element, keep| {
        if terms::truthy(&keep) {
            out.push(element.clone());
        }
        true
    });
    if completed { Value::new_array(out) } else { Value::Undefined }
}

fn find(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let callback = arg(args, 0);
    let mut found = Value::Undefined;
    iterate_with(scope, this, &callback, "find", |_, element, hit| {
        if terms::truthy(&hit) {
            found = element.clone();
            false
        } else {
            true
        }
    });
    if scope.borrow().is_stopped() { Value::Undefined } else { found }
}

fn find_index(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let callback = arg(args, 0);
    let mut found = -1i64;
    iterate_with(scope, this, &callback, "findIndex", |i, _, hit| {
        if terms::truthy(&hit) {
            found = i as i64;
            false
        } else {
            true
        }
    });
    if scope.borrow().is_stopped() { Value::Undefined } else { Value::int(found) }
}

fn find_last(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let Some(elements) = recv(scope, this) else {
        return Value::Undefined;
    };
    let callback = arg(args, 0);
    let snapshot: Vec<Value> = elements.borrow().clone();
    for (i, element) in snapshot.iter().enumerate().rev() {
        let hit = call_value(
            scope,
            &callback,
            &Value::Undefined,
            &[element.clone(), Value::int(i as i64), this.clone()],
            "findLast",
        );
        if scope.borrow().is_stopped() {
            return Value::Undefined;
        }
        if terms::truthy(&hit) {
            return element.clone();
        }
    }
    Value::Undefined
}

fn find_last_index(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let Some(elements) = recv(scope, this) else {
        return Value::Undefined;
    };
    let callback = arg(args, 0);
    let snapshot: Vec<Value> = elements.borrow().clone();
    for (i, element) in snapshot.iter().enumerate().rev() {
        let hit = call_value(
            scope,
            &callback,
            &Value::Undefined,
            &[element.clone(), Value::int(i as i64), this.clone()],
            "findLastIndex",
        );
        if scope.borrow().is_stopped() {
            return Value::Undefined;
        }
        if terms::truthy(&hit) {
            return Value::int(i as i64);
        }
    }
    Value::int(-1)
}

fn for_each(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let callback = arg(args, 0);
    iterate_with(scope, this, &callback, "forEach", |_, _, _| true);
    Value::Undefined
}

fn some(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let callback = arg(args, 0);
    let mut any = false;
    iterate_with(scope, this, &callback, "some", |_, _, hit| {
        if terms::truthy(&hit) {
            any = true;
            false
        } else {
            true
        }
    });
    if scope.borrow().is_stopped() { Value::Undefined } else { Value::Bool(any) }
}

fn every(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let callback = arg(args, 0);
    let mut all = true;
    iterate_with(scope, this, &callback, "every", |_, _, hit| {
        if terms::truthy(&hit) {
            true
        } else {
            all = false;
            false
        }
    });
    if scope.borrow().is_stopped() { Value::Undefined } else { Value::Bool(all) }
}

fn reduce(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let Some(elements) = recv(scope, this) else {
        return Value::Undefined;
    };
    let callback = arg(args, 0);
    let snapshot: Vec<Value> = elements.borrow().clone();
    let mut iter = snapshot.into_iter().enumerate();
    let mut acc = match args.get(1) {
        Some(initial) => initial.clone(),
        None => match iter.next() {
            Some((_, first)) => first,
            None => {
                error::throw_type(scope, "Reduce of empty array with no initial value");
                return Value::Undefined;
            }
        },
    };
    for (i, element) in iter {
        acc = call_value(
            scope,
            &callback,
            &Value::Undefined,
            &[acc, element, Value::int(i as i64), this.clone()],
            "reduce",
        );
        if scope.borrow().is_stopped() {
            return Value::Undefined;
        }
    }
    acc
}

fn reduce_right(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let Some(elements) = recv(scope, this) else {
        return Value::Undefined;
    };
    let callback = arg(args, 0);
    let snapshot: Vec<Value> = elements.borrow().clone();
    let mut iter = snapshot.into_iter().enumerate().rev();
    let mut acc = match args.get(1) {
        Some(initial) => initial.clone(),
        None => match iter.next() {
            Some((_, last)) => last,
            None => {
                error::throw_type(scope, "Reduce of empty array with no initial value");
                return Value::Undefined;
            }
        },
    };
    for (i, element) in iter {
        acc = call_value(
            scope,
            &callback,
            &Value::Undefined,
            &[acc, element, Value::int(i as i64), this.clone()],
            "reduceRight",
        );
        if scope.borrow().is_stopped() {
            return Value::Undefined;
        }
    }
    acc
}

fn flatten_into(out: &mut Vec<Value>, elements: &[Value], depth: i64) {
    for v in elements {
        match v {
            Value::Array(inner) if depth > 0 => flatten_into(out, &inner.borrow().clone(), depth - 1),
            other => out.push(other.clone()),
        }
    }
}

fn flat(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let Some(elements) = recv(scope, this) else {
        return Value::Undefined;
    };
    let depth = arg_int_or(args, 0, 1);
    let mut out = Vec::new();
    flatten_into(&mut out, &elements.borrow().clone(), depth);
    Value::new_array(out)
}

fn flat_map(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let mapped = map(scope, this, args);
    if scope.borrow().is_stopped() {
        return Value::Undefined;
    }
    flat(scope, &mapped, &[])
}

fn fill(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let Some(elements) = recv(scope, this) else {
        return Value::Undefined;
    };
    let value = arg(args, 0);
    let mut elements_ref = elements.borrow_mut();
    let len = elements_ref.len();
    let start = clamp_index(arg_int_or(args, 1, 0), len);
    let end = clamp_index(arg_int_or(args, 2, len as i64), len);
    for slot in elements_ref.iter_mut().take(end).skip(start) {
        *slot = value.clone();
    }
    drop(elements_ref);
    this.clone()
}

fn at(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let Some(elements) = recv(scope, this) else {
        return Value::Undefined;
    };
    let elements = elements.borrow();
    let len = elements.len() as i64;
    let mut i = arg_int_or(args, 0, 0);
    if i < 0 {
        i += len;
    }
    if i < 0 || i >= len {
        return Value::Undefined;
    }
    elements[i as usize].clone()
}

fn keys(scope: &ScopeRef, this: &Value, _args: &[Value]) -> Value {
    let Some(elements) = recv(scope, this) else {
        return Value::Undefined;
    };
    let len = elements.borrow().len();
    Value::new_array((0..len).map(|i| Value::int(i as i64)).collect())
}

fn values(scope: &ScopeRef, this: &Value, _args: &[Value]) -> Value {
    let Some(elements) = recv(scope, this) else {
        return Value::Undefined;
    };
    let snapshot = elements.borrow().clone();
    Value::new_array(snapshot)
}

fn entries(scope: &ScopeRef, this: &Value, _args: &[Value]) -> Value {
    let Some(elements) = recv(scope, this) else {
        return Value::Undefined;
    };
    let snapshot = elements.borrow().clone();
    Value::new_array(
        snapshot
            .into_iter()
            .enumerate()
            .map(|(i, v)| Value::new_array(vec![Value::int(i as i64), v]))
            .collect(),
    )
}

fn copy_within(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let Some(elements) = recv(scope, this) else {
        return Value::Undefined;
    };
    let mut elements_ref = elements.borrow_mut();
    let len = elements_ref.len();
    let target = clamp_index(arg_int_or(args, 0, 0), len);
    let start = clamp_index(arg_int_or(args, 1, 0), len);
    let end = clamp_index(arg_int_or(args, 2, len as i64), len);
    let window: Vec<Value> = elements_ref[start..end.max(start)].to_vec();
    for (offset, v) in window.into_iter().enumerate() {
        let Some(slot) = elements_ref.get_mut(target + offset) else {
            break;
        };
        *slot = v;
    }
    drop(elements_ref);
    this.clone()
}

fn with(scope: &ScopeRef, this: &Value, args: &[Value]) -> Value {
    let Some(elements) = recv(scope, this) else {
        return Value::Undefined;
    };
    let elements = elements.borrow();
    let len = elements.len() as i64;
    let mut i = arg_int_or(args, 0, 0);
    if i < 0 {
        i += len;
    }
    if i < 0 || i >= len {
        error::throw_range(scope, &format!("Invalid index : {}", arg_f64(args, 0)));
        return Value::Undefined;
    }
    let mut out = elements.clone();
    out[i as usize] = arg(args, 1);
    Value::new_array(out)
}

fn to_string(_scope: &ScopeRef, this: &Value, _args: &[Value]) -> Value {
    Value::str(terms::to_display_string(this))
}
