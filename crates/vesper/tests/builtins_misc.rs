//! `Object`, `Number`, `Math`, `JSON`, `Date`, `RegExp`, `console`, and the
//! free-standing globals.

use pretty_assertions::assert_eq;
use vesper::{CollectStringConsole, Engine, HostValue};

fn eval(source: &str) -> HostValue {
    Engine::new().eval(source).unwrap()
}

fn s(text: &str) -> HostValue {
    HostValue::String(text.to_owned())
}

#[test]
fn object_statics() {
    assert_eq!(
        eval("Object.keys({b: 1, a: 2})"),
        HostValue::Array(vec![s("b"), s("a")])
    );
    assert_eq!(
        eval("Object.values({b: 1, a: 2})"),
        HostValue::Array(vec![HostValue::Int(1), HostValue::Int(2)])
    );
    assert_eq!(
        eval("Object.entries({a: 1})"),
        HostValue::Array(vec![HostValue::Array(vec![s("a"), HostValue::Int(1)])])
    );
    assert_eq!(
        eval("Object.assign({a: 1}, {b: 2}, {a: 3})"),
        HostValue::Object(vec![
            ("a".to_owned(), HostValue::Int(3)),
            ("b".to_owned(), HostValue::Int(2))
        ])
    );
    assert_eq!(
        eval("Object.fromEntries([['k', 'v']])"),
        HostValue::Object(vec![("k".to_owned(), s("v"))])
    );
    assert_eq!(eval("Object.is(NaN, NaN)"), HostValue::Bool(true));
    assert_eq!(eval("Object.is(0, -0)"), HostValue::Bool(false));
    assert_eq!(eval("Object.is(1, 1)"), HostValue::Bool(true));
}

#[test]
fn object_instance_methods() {
    assert_eq!(eval("({a: 1}).hasOwnProperty('a')"), HostValue::Bool(true));
    assert_eq!(eval("({a: 1}).hasOwnProperty('b')"), HostValue::Bool(false));
    assert_eq!(eval("[1].hasOwnProperty(0)"), HostValue::Bool(true));
    assert_eq!(eval("({}).toString()"), s("[object Object]"));
    assert_eq!(eval("({a: 1}).keys()"), HostValue::Array(vec![s("a")]));
}

#[test]
fn object_keys_iterate_in_insertion_order() {
    assert_eq!(
        eval("var o = {z: 1}; o.a = 2; o.m = 3; Object.keys(o).join(',')"),
        s("z,a,m")
    );
}

#[test]
fn number_methods_and_statics() {
    assert_eq!(eval("(3.14159).toFixed(2)"), s("3.14"));
    assert_eq!(eval("(255).toString(16)"), s("ff"));
    assert_eq!(eval("(5).valueOf()"), HostValue::Int(5));
    assert_eq!(eval("Number.isInteger(4)"), HostValue::Bool(true));
    assert_eq!(eval("Number.isInteger(4.5)"), HostValue::Bool(false));
    assert_eq!(eval("Number.isInteger('4')"), HostValue::Bool(false));
    assert_eq!(eval("Number.isNaN(0/0)"), HostValue::Bool(true));
    assert_eq!(eval("Number.isNaN('x')"), HostValue::Bool(false));
    assert_eq!(eval("Number('12.5')"), HostValue::Float(12.5));
    assert_eq!(eval("Number('')"), HostValue::Int(0));
    assert_eq!(eval("Boolean('')"), HostValue::Bool(false));
    assert_eq!(eval("Boolean('x')"), HostValue::Bool(true));
}

#[test]
fn math_functions() {
    assert_eq!(eval("Math.abs(-3)"), HostValue::Int(3));
    assert_eq!(eval("Math.floor(2.7)"), HostValue::Int(2));
    assert_eq!(eval("Math.ceil(2.1)"), HostValue::Int(3));
    assert_eq!(eval("Math.round(2.5)"), HostValue::Int(3));
    // half away from zero
    assert_eq!(eval("Math.round(-2.5)"), HostValue::Int(-3));
    assert_eq!(eval("Math.trunc(-2.7)"), HostValue::Int(-2));
    assert_eq!(eval("Math.sign(-9)"), HostValue::Int(-1));
    assert_eq!(eval("Math.sqrt(16)"), HostValue::Int(4));
    assert_eq!(eval("Math.pow(2, 10)"), HostValue::Int(1024));
    assert_eq!(eval("Math.max(1, 9, 3)"), HostValue::Int(9));
    assert_eq!(eval("Math.min(4, 2)"), HostValue::Int(2));
    assert_eq!(eval("Math.max()"), HostValue::Float(f64::NEG_INFINITY));
    assert_eq!(eval("Math.hypot(3, 4)"), HostValue::Int(5));
    assert_eq!(eval("Math.imul(3, 4)"), HostValue::Int(12));
    assert_eq!(eval("Math.clz32(1)"), HostValue::Int(31));
    assert_eq!(eval("Math.log2(8)"), HostValue::Int(3));
}

#[test]
fn math_constants() {
    assert_eq!(eval("Math.E > 2.71 && Math.E < 2.72"), HostValue::Bool(true));
    assert_eq!(eval("Math.PI > 3.14 && Math.PI < 3.15"), HostValue::Bool(true));
    assert_eq!(eval("Math.SQRT2 * Math.SQRT1_2"), HostValue::Float(1.0000000000000002));
}

#[test]
fn math_random_is_seedable() {
    let mut a = Engine::new();
    a.set_random_seed(7);
    let first = a.eval("[Math.random(), Math.random()]").unwrap();
    let mut b = Engine::new();
    b.set_random_seed(7);
    let second = b.eval("[Math.random(), Math.random()]").unwrap();
    assert_eq!(first, second);
    assert_eq!(
        a.eval("var r = Math.random(); r >= 0 && r < 1").unwrap(),
        HostValue::Bool(true)
    );
}

#[test]
fn json_round_trip() {
    assert_eq!(
        eval("JSON.stringify({b: [1, 'x', null], a: true})"),
        s("{\"b\":[1,\"x\",null],\"a\":true}")
    );
    assert_eq!(eval("JSON.parse('{\"z\":1,\"a\":2}').z"), HostValue::Int(1));
    assert_eq!(
        eval("Object.keys(JSON.parse('{\"z\":1,\"a\":2}')).join(',')"),
        s("z,a")
    );
    assert_eq!(eval("JSON.parse('[1, 2.5, \"s\"]')[1]"), HostValue::Float(2.5));
    assert!(Engine::new().eval("JSON.parse('{nope')").is_err());
}

#[test]
fn json_stringify_key_filter() {
    assert_eq!(
        eval("JSON.stringify({a: 1, b: 2, c: 3}, ['a', 'c'])"),
        s("{\"a\":1,\"c\":3}")
    );
}

#[test]
fn json_stringify_indent() {
    assert_eq!(
        eval("JSON.stringify({a: [1]}, null, 2)"),
        s("{\n  \"a\": [\n    1\n  ]\n}")
    );
}

#[test]
fn json_stringify_drops_undefined_and_functions() {
    assert_eq!(
        eval("JSON.stringify({a: undefined, f: function() {}, k: 1})"),
        s("{\"k\":1}")
    );
    assert_eq!(eval("JSON.stringify([undefined])"), s("[null]"));
    assert_eq!(eval("typeof JSON.stringify(undefined)"), s("undefined"));
}

#[test]
fn date_components_round_trip() {
    // construct from components and read them back through the same zone
    assert_eq!(
        eval("var d = new Date(2024, 1, 29, 10, 30, 15, 250); [d.getFullYear(), d.getMonth(), d.getDate(), d.getHours(), d.getMinutes(), d.getSeconds(), d.getMilliseconds()]"),
        HostValue::Array(vec![
            HostValue::Int(2024),
            HostValue::Int(1),
            HostValue::Int(29),
            HostValue::Int(10),
            HostValue::Int(30),
            HostValue::Int(15),
            HostValue::Int(250),
        ])
    );
}

#[test]
fn date_setters_normalize_overflow() {
    // setDate(32) rolls into the next month
    assert_eq!(
        eval("var d = new Date(2023, 0, 1); d.setDate(32); [d.getMonth(), d.getDate()]"),
        HostValue::Array(vec![HostValue::Int(1), HostValue::Int(1)])
    );
    assert_eq!(
        eval("var d = new Date(2023, 0, 1); d.setMonth(12); d.getFullYear()"),
        HostValue::Int(2024)
    );
}

#[test]
fn date_now_uses_the_engine_clock() {
    let mut engine = Engine::new();
    engine.set_clock(|| 1_700_000_000_000.0);
    assert_eq!(engine.eval("Date.now()").unwrap(), HostValue::Int(1_700_000_000_000));
    assert_eq!(
        engine.eval("new Date().getTime()").unwrap(),
        HostValue::Int(1_700_000_000_000)
    );
}

#[test]
fn date_parse_and_iso() {
    assert_eq!(
        eval("Date.parse('2020-06-01T12:00:00Z')"),
        HostValue::Int(1_591_012_800_000)
    );
    assert_eq!(
        eval("new Date(0).toISOString()"),
        s("1970-01-01T00:00:00.000Z")
    );
    assert_eq!(
        eval("new Date(0).toUTCString()"),
        s("Thu, 01 Jan 1970 00:00:00 GMT")
    );
    assert_eq!(eval("isNaN(Date.parse('not a date'))"), HostValue::Bool(true));
    assert_eq!(eval("new Date(2000, 0, 1).getDay() === 6"), HostValue::Bool(true));
}

#[test]
fn date_get_time_and_value_of() {
    assert_eq!(eval("new Date(5000).getTime()"), HostValue::Int(5000));
    assert_eq!(eval("new Date(5000).valueOf()"), HostValue::Int(5000));
    assert_eq!(eval("var d = new Date(1); d.setTime(99); d.getTime()"), HostValue::Int(99));
}

#[test]
fn regexp_construction_and_exec() {
    assert_eq!(eval("new RegExp('a+', 'g').source"), s("a+"));
    assert_eq!(eval("new RegExp('a', 'gim').flags"), s("gim"));
    assert_eq!(eval("/x/i.test('X')"), HostValue::Bool(true));
    assert_eq!(
        eval("/([a-z])([0-9])/.exec('a1')"),
        HostValue::Array(vec![s("a1"), s("a"), s("1")])
    );
    assert_eq!(eval("/q/.exec('abc')"), HostValue::Null);
    assert!(Engine::new().eval("new RegExp('(unclosed')").is_err());
}

#[test]
fn global_regex_exec_walks_last_index() {
    assert_eq!(
        eval("var re = /a/g; [re.exec('aa')[0], re.lastIndex, re.exec('aa')[0], re.exec('aa')]"),
        HostValue::Array(vec![s("a"), HostValue::Int(1), s("a"), HostValue::Null])
    );
}

#[test]
fn parse_int_and_parse_float() {
    assert_eq!(eval("parseInt('42')"), HostValue::Int(42));
    assert_eq!(eval("parseInt('42px')"), HostValue::Int(42));
    assert_eq!(eval("parseInt('0x1F')"), HostValue::Int(31));
    assert_eq!(eval("parseInt('1010', 2)"), HostValue::Int(10));
    assert_eq!(eval("parseInt('-8')"), HostValue::Int(-8));
    assert_eq!(eval("isNaN(parseInt('px'))"), HostValue::Bool(true));
    assert_eq!(eval("parseFloat('2.5rem')"), HostValue::Float(2.5));
    assert_eq!(eval("parseFloat('1e2!')"), HostValue::Int(100));
}

#[test]
fn console_log_goes_to_the_installed_sink() {
    let console = CollectStringConsole::new();
    let mut engine = Engine::new();
    engine.set_console_writer(console.handle());
    engine
        .eval("console.log('a', 1, [2], {k: 3}); console.log('next')")
        .unwrap();
    assert_eq!(console.contents(), "a 1 [2] {\"k\":3}\nnext\n");
}
