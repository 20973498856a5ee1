//! Functions, closures, `this` binding, parameters, and destructuring.

use pretty_assertions::assert_eq;
use vesper::{Engine, HostValue};

fn eval(source: &str) -> HostValue {
    Engine::new().eval(source).unwrap()
}

#[test]
fn closures_capture_their_declaring_environment() {
    assert_eq!(
        eval("function counter() { var n = 0; return function() { n++; return n } } var c = counter(); c(); c(); c()"),
        HostValue::Int(3)
    );
}

#[test]
fn two_closures_share_one_environment() {
    let program = "
        function make() {
            var n = 0;
            return { inc: function() { n += 1 }, get: function() { return n } };
        }
        var m = make();
        m.inc(); m.inc();
        m.get()
    ";
    assert_eq!(eval(program), HostValue::Int(2));
}

#[test]
fn name_resolution_uses_the_declaring_scope_not_the_call_site() {
    let program = "
        var tag = 'outer';
        function show() { return tag }
        function wrap() { var tag = 'inner'; return show() }
        wrap()
    ";
    assert_eq!(eval(program), HostValue::String("outer".to_owned()));
}

#[test]
fn this_is_the_call_site_receiver_for_plain_functions() {
    let program = "
        var o = { name: 'o', get: function() { return this.name } };
        o.get()
    ";
    assert_eq!(eval(program), HostValue::String("o".to_owned()));
}

#[test]
fn arrow_functions_keep_the_declaring_this() {
    let program = "
        var o = {
            name: 'o',
            make: function() { return () => this.name }
        };
        var f = o.make();
        f()
    ";
    assert_eq!(eval(program), HostValue::String("o".to_owned()));
}

#[test]
fn missing_parameters_are_undefined() {
    assert_eq!(
        eval("function f(a, b) { return '' + a + b } f(1)"),
        HostValue::String("1undefined".to_owned())
    );
}

#[test]
fn default_parameters_apply_to_missing_and_undefined() {
    assert_eq!(eval("function f(a = 5) { return a } f()"), HostValue::Int(5));
    assert_eq!(eval("function f(a = 5) { return a } f(undefined)"), HostValue::Int(5));
    assert_eq!(eval("function f(a = 5) { return a } f(null)"), HostValue::Null);
    // defaults may reference earlier parameters
    assert_eq!(eval("function f(a, b = a + 1) { return b } f(2)"), HostValue::Int(3));
}

#[test]
fn rest_parameter_collects_the_tail() {
    assert_eq!(
        eval("function f(first, ...rest) { return rest } f(1, 2, 3)"),
        HostValue::Array(vec![HostValue::Int(2), HostValue::Int(3)])
    );
    assert_eq!(eval("function f(a, ...rest) { return rest } f(1)"), HostValue::Array(vec![]));
}

#[test]
fn spread_in_calls_and_literals() {
    assert_eq!(
        eval("function add3(a, b, c) { return a + b + c } add3(...[1, 2, 3])"),
        HostValue::Int(6)
    );
    assert_eq!(
        eval("var mid = [2, 3]; [1, ...mid, 4]"),
        HostValue::Array(vec![
            HostValue::Int(1),
            HostValue::Int(2),
            HostValue::Int(3),
            HostValue::Int(4)
        ])
    );
    assert_eq!(
        eval("var base = {a: 1, b: 2}; var o = {...base, b: 3}; [o.a, o.b]"),
        HostValue::Array(vec![HostValue::Int(1), HostValue::Int(3)])
    );
}

#[test]
fn destructured_parameters() {
    assert_eq!(
        eval("function dist({x, y}) { return x * x + y * y } dist({x: 3, y: 4})"),
        HostValue::Int(25)
    );
    assert_eq!(
        eval("function first([a]) { return a } first([7, 8])"),
        HostValue::Int(7)
    );
}

#[test]
fn function_expressions_and_iife() {
    assert_eq!(eval("(function() { return 9 })()"), HostValue::Int(9));
    assert_eq!(eval("(x => x + 1)(41)"), HostValue::Int(42));
}

#[test]
fn named_function_expression_can_recurse() {
    assert_eq!(
        eval("var fact = function go(n) { return n <= 1 ? 1 : n * go(n - 1) }; fact(5)"),
        HostValue::Int(120)
    );
}

#[test]
fn functions_are_values() {
    assert_eq!(
        eval("function apply(f, x) { return f(x) } apply(function(v) { return v * 3 }, 5)"),
        HostValue::Int(15)
    );
}

#[test]
fn return_without_value_is_undefined() {
    assert_eq!(eval("function f() { return } f()"), HostValue::Null);
    assert_eq!(eval("function f() { } f()"), HostValue::Null);
}

#[test]
fn calling_a_non_function_throws() {
    let err = Engine::new().eval("var x = 4; x()").unwrap_err();
    assert_eq!(err.message(), "x is not a function");
    let err = Engine::new().eval("var o = {}; o.m()").unwrap_err();
    assert_eq!(err.message(), "o.m is not a function");
}

#[test]
fn optional_call_and_chaining() {
    assert_eq!(eval("var o = {}; o.m?.()"), HostValue::Null);
    assert_eq!(eval("var o = null; o?.a.b.c"), HostValue::Null);
    assert_eq!(eval("var o = {a: {b: 1}}; o?.a?.b"), HostValue::Int(1));
    assert_eq!(eval("var o = null; o?.['k']"), HostValue::Null);
    // the short circuit covers the whole remaining chain, calls included
    assert_eq!(eval("var o = null; o?.a()"), HostValue::Null);
}

#[test]
fn destructuring_assignment_without_declaration() {
    assert_eq!(
        eval("var a, b; [a, b] = [1, 2]; a + b"),
        HostValue::Int(3)
    );
    assert_eq!(
        eval("var o = {}; [o.x, o.y] = [3, 4]; o.x * o.y"),
        HostValue::Int(12)
    );
}

#[test]
fn nested_destructuring() {
    assert_eq!(
        eval("const {a: {b}} = {a: {b: 'deep'}}; b"),
        HostValue::String("deep".to_owned())
    );
    assert_eq!(
        eval("const [[a], [b]] = [[1], [2]]; a + b"),
        HostValue::Int(3)
    );
}

#[test]
fn array_pattern_defaults_only_fill_missing_slots() {
    assert_eq!(
        eval("const [a = 'x', b = 'y'] = ['given']; a + b"),
        HostValue::String("giveny".to_owned())
    );
}

#[test]
fn new_with_builtin_constructors() {
    assert_eq!(
        eval("var e = new Error('msg'); [e.name, e.message]"),
        HostValue::Array(vec![
            HostValue::String("Error".to_owned()),
            HostValue::String("msg".to_owned())
        ])
    );
    assert_eq!(eval("new Array(3).length"), HostValue::Int(3));
}

#[test]
fn implicit_global_assignment_from_a_function() {
    let program = "
        function set() { leaked = 'yes' }
        set();
        typeof leaked
    ";
    // assignment to an undeclared name creates a binding in the function's
    // own context, which dies with the call
    assert_eq!(eval(program), HostValue::String("undefined".to_owned()));
}

#[test]
fn top_level_return_yields_its_value() {
    assert_eq!(eval("return 7"), HostValue::Int(7));
}
