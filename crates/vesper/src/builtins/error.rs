//! Error objects and the throw helpers used across the evaluator.
//!
//! A user-visible runtime error is an ordinary object with `name` and
//! `message` properties and a constructor backref (so `e instanceof
//! TypeError` holds). It propagates via the context's throw exit flag.

use crate::{
    builtins::BuiltinCtor,
    context::ScopeRef,
    terms,
    value::{JsObject, Value},
};

/// Builds an error object for the given constructor.
pub(crate) fn construct(ctor: BuiltinCtor, args: &[Value]) -> Value {
    let message = match args.first() {
        None | Some(Value::Undefined) => String::new(),
        Some(v) => terms::to_display_string(v),
    };
    make(ctor, &message)
}

pub(crate) fn make(ctor: BuiltinCtor, message: &str) -> Value {
    let mut object = JsObject::new();
    object.entries.insert("message".to_owned(), Value::str(message));
    object.entries.insert("name".to_owned(), Value::str(ctor.to_string()));
    object.constructor = Some(Value::Function(std::rc::Rc::new(crate::value::JsFunction {
        callable: crate::value::Callable::Ctor(ctor),
    })));
    Value::new_object(object)
}

/// Wraps a raw thrown primitive into an error-shaped object; thrown objects
/// pass through untouched.
pub(crate) fn wrap_thrown(value: Value) -> Value {
    if value.is_object_like() {
        value
    } else {
        make(BuiltinCtor::Error, &terms::to_display_string(&value))
    }
}

pub(crate) fn throw(scope: &ScopeRef, message: &str) {
    let error = make(BuiltinCtor::Error, message);
    scope.borrow_mut().stop_throw(error);
}

pub(crate) fn throw_type(scope: &ScopeRef, message: &str) {
    let error = make(BuiltinCtor::TypeError, message);
    scope.borrow_mut().stop_throw(error);
}

pub(crate) fn throw_reference(scope: &ScopeRef, message: &str) {
    // no ReferenceError constructor is exposed; the object still names itself
    let mut object = JsObject::new();
    object.entries.insert("message".to_owned(), Value::str(message));
    object.entries.insert("name".to_owned(), Value::str("ReferenceError"));
    scope.borrow_mut().stop_throw(Value::new_object(object));
}

pub(crate) fn throw_range(scope: &ScopeRef, message: &str) {
    let mut object = JsObject::new();
    object.entries.insert("message".to_owned(), Value::str(message));
    object.entries.insert("name".to_owned(), Value::str("RangeError"));
    scope.borrow_mut().stop_throw(Value::new_object(object));
}
