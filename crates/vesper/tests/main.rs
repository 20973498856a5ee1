use pretty_assertions::assert_eq;
use vesper::{Engine, HostValue};

fn eval(source: &str) -> HostValue {
    Engine::new().eval(source).unwrap()
}

/// Engines are reusable and globals persist across calls.
#[test]
fn repeat_eval() {
    let mut engine = Engine::new();
    assert_eq!(engine.eval("1 + 2").unwrap(), HostValue::Int(3));
    assert_eq!(engine.eval("var a = 10; a").unwrap(), HostValue::Int(10));
    // `a` survives into the next evaluation
    assert_eq!(engine.eval("a + 1").unwrap(), HostValue::Int(11));
}

#[test]
fn functions_persist_across_evals() {
    let mut engine = Engine::new();
    engine.eval("function twice(x) { return x * 2 }").unwrap();
    assert_eq!(engine.eval("twice(21)").unwrap(), HostValue::Int(42));
}

#[test]
fn last_expression_is_the_result() {
    assert_eq!(eval("1; 2; 3"), HostValue::Int(3));
    assert_eq!(eval("'only'"), HostValue::String("only".to_owned()));
    // undefined converts to null at the boundary
    assert_eq!(eval("undefined"), HostValue::Null);
}

// === the nine seed scenarios ===

#[test]
fn seed_loop_accumulation() {
    assert_eq!(
        eval("var x = 0; for (let i = 1; i <= 5; i++) { x += i; } x"),
        HostValue::Int(15)
    );
}

#[test]
fn seed_add_dispatch() {
    assert_eq!(
        eval("function add(a, b) { return a + b; } add(2, 3) + add('a', 1)"),
        HostValue::String("5a1".to_owned())
    );
}

#[test]
fn seed_array_destructuring_with_rest() {
    assert_eq!(eval("const [a, , ...rest] = [1, 2, 3, 4]; rest[1]"), HostValue::Int(4));
}

#[test]
fn seed_object_destructuring_with_default_and_rest() {
    assert_eq!(
        eval("const {x, y: z = 9, ...rest} = {x: 1, other: 2}; [x, z, rest.other]"),
        HostValue::Array(vec![HostValue::Int(1), HostValue::Int(9), HostValue::Int(2)])
    );
}

#[test]
fn seed_typeof_unbound_does_not_throw() {
    assert_eq!(eval("typeof undefinedName"), HostValue::String("undefined".to_owned()));
}

#[test]
fn seed_try_catch_error_message() {
    assert_eq!(
        eval("try { throw new Error('oops'); } catch (e) { e.message }"),
        HostValue::String("oops".to_owned())
    );
}

#[test]
fn seed_map_reduce() {
    assert_eq!(
        eval("[1,2,3].map(x => x*x).reduce((a,b) => a+b, 0)"),
        HostValue::Int(14)
    );
}

#[test]
fn seed_concat_nullish() {
    assert_eq!(
        eval("'a' + null + undefined"),
        HostValue::String("anullundefined".to_owned())
    );
}

#[test]
fn seed_signed_infinity_and_nan() {
    assert_eq!(
        eval("1/0 === Infinity && -1/0 === -Infinity && 0/0 !== 0/0"),
        HostValue::Bool(true)
    );
}
