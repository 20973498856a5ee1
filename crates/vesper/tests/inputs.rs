//! Tests for passing named bindings to `eval_with` and reading results back
//! as host values.

use pretty_assertions::assert_eq;
use vesper::{Engine, HostValue};

fn eval_with(source: &str, vars: Vec<(String, HostValue)>) -> HostValue {
    Engine::new().eval_with(source, vars).unwrap()
}

fn var(name: &str, value: HostValue) -> Vec<(String, HostValue)> {
    vec![(name.to_owned(), value)]
}

#[test]
fn input_int() {
    assert_eq!(eval_with("x", var("x", HostValue::Int(42))), HostValue::Int(42));
}

#[test]
fn input_int_arithmetic() {
    assert_eq!(eval_with("x + 1", var("x", HostValue::Int(41))), HostValue::Int(42));
}

#[test]
fn input_float() {
    assert_eq!(eval_with("x", var("x", HostValue::Float(2.5))), HostValue::Float(2.5));
}

#[test]
fn input_float_narrows_on_round_result() {
    // 2.5 + 1.5 is an exact integer, so the result narrows
    assert_eq!(eval_with("x + 1.5", var("x", HostValue::Float(2.5))), HostValue::Int(4));
}

#[test]
fn input_bool() {
    assert_eq!(eval_with("!x", var("x", HostValue::Bool(false))), HostValue::Bool(true));
}

#[test]
fn input_null_and_undefined() {
    assert_eq!(eval_with("x === null", var("x", HostValue::Null)), HostValue::Bool(true));
    assert_eq!(
        eval_with("x === undefined", var("x", HostValue::Undefined)),
        HostValue::Bool(true)
    );
    // loosely, they are the same
    assert_eq!(eval_with("x == undefined", var("x", HostValue::Null)), HostValue::Bool(true));
}

#[test]
fn input_string_concat() {
    assert_eq!(
        eval_with("x + ' world'", var("x", HostValue::String("hello".to_owned()))),
        HostValue::String("hello world".to_owned())
    );
}

#[test]
fn input_array_mutation() {
    let result = eval_with(
        "x.push(3); x",
        var("x", HostValue::Array(vec![HostValue::Int(1), HostValue::Int(2)])),
    );
    assert_eq!(
        result,
        HostValue::Array(vec![HostValue::Int(1), HostValue::Int(2), HostValue::Int(3)])
    );
}

#[test]
fn input_object_read_and_update() {
    let object = HostValue::Object(vec![
        ("name".to_owned(), HostValue::String("vesper".to_owned())),
        ("count".to_owned(), HostValue::Int(1)),
    ]);
    let result = eval_with("x.count = x.count + 1; x", var("x", object));
    assert_eq!(
        result,
        HostValue::Object(vec![
            ("name".to_owned(), HostValue::String("vesper".to_owned())),
            ("count".to_owned(), HostValue::Int(2)),
        ])
    );
}

#[test]
fn object_key_order_is_preserved() {
    let result = eval_with(
        "x.c = 3; x",
        var(
            "x",
            HostValue::Object(vec![
                ("b".to_owned(), HostValue::Int(1)),
                ("a".to_owned(), HostValue::Int(2)),
            ]),
        ),
    );
    assert_eq!(
        result,
        HostValue::Object(vec![
            ("b".to_owned(), HostValue::Int(1)),
            ("a".to_owned(), HostValue::Int(2)),
            ("c".to_owned(), HostValue::Int(3)),
        ])
    );
}

#[test]
fn eval_with_bindings_do_not_leak_into_globals() {
    let mut engine = Engine::new();
    engine
        .eval_with("x + 1", vec![("x".to_owned(), HostValue::Int(1))])
        .unwrap();
    let err = engine.eval("x").unwrap_err();
    assert_eq!(err.kind(), vesper::ExceptionKind::ReferenceError);
}

#[test]
fn engine_put_get_remove() {
    let mut engine = Engine::new();
    engine.put("flag", HostValue::Bool(true));
    assert_eq!(engine.eval("flag").unwrap(), HostValue::Bool(true));
    assert_eq!(engine.get("flag"), Some(HostValue::Bool(true)));
    engine.remove("flag");
    assert_eq!(engine.get("flag"), None);
    assert!(engine.eval("flag").is_err());
}

#[test]
fn functions_round_trip_as_repr() {
    let result = eval_with("(function named() {})", vec![]);
    assert!(matches!(result, HostValue::Repr(_)));
}

#[test]
fn cyclic_structures_convert_without_hanging() {
    let result = eval_with("var a = []; a.push(a); a", vec![]);
    assert_eq!(
        result,
        HostValue::Array(vec![HostValue::Repr("[...]".to_owned())])
    );
}
