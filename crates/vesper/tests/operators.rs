//! Operator and coercion behavior through the public API.

use pretty_assertions::assert_eq;
use vesper::{Engine, HostValue};

fn eval(source: &str) -> HostValue {
    Engine::new().eval(source).unwrap()
}

fn eval_bool(source: &str) -> bool {
    match eval(source) {
        HostValue::Bool(b) => b,
        other => panic!("expected a boolean from {source}, got {other:?}"),
    }
}

#[test]
fn arithmetic_precedence() {
    assert_eq!(eval("1 + 2 * 3"), HostValue::Int(7));
    assert_eq!(eval("(1 + 2) * 3"), HostValue::Int(9));
    assert_eq!(eval("2 ** 3 ** 2"), HostValue::Int(512));
    assert_eq!(eval("10 % 3"), HostValue::Int(1));
    assert_eq!(eval("7 / 2"), HostValue::Float(3.5));
}

#[test]
fn loose_equality_table() {
    assert!(eval_bool("null == undefined"));
    assert!(eval_bool("1 == '1'"));
    assert!(eval_bool("true == 1"));
    assert!(eval_bool("'' == 0"));
    assert!(!eval_bool("NaN == NaN"));
    assert!(!eval_bool("{} == {}"));
    assert!(!eval_bool("[] == []"));
}

#[test]
fn strict_equality_table() {
    assert!(!eval_bool("null === undefined"));
    assert!(!eval_bool("1 === '1'"));
    assert!(eval_bool("-0 === 0"));
    assert!(!eval_bool("NaN === NaN"));
    assert!(eval_bool("var a = [1]; var b = a; a === b"));
}

#[test]
fn string_concatenation() {
    assert_eq!(eval("1 + '2'"), HostValue::String("12".to_owned()));
    assert_eq!(eval("'' + true"), HostValue::String("true".to_owned()));
    assert_eq!(eval("'' + [1,2]"), HostValue::String("[1,2]".to_owned()));
    assert_eq!(eval("'' + {a: 1}"), HostValue::String("{\"a\":1}".to_owned()));
}

#[test]
fn comparisons() {
    assert!(eval_bool("1 < 2"));
    assert!(eval_bool("'10' > 9"));
    assert!(eval_bool("'b' > 'a'"));
    assert!(!eval_bool("NaN < 1"));
    assert!(!eval_bool("NaN >= 1"));
}

#[test]
fn bitwise_and_shifts() {
    assert_eq!(eval("0xF0 & 0x0F"), HostValue::Int(0));
    assert_eq!(eval("0xF0 | 0x0F"), HostValue::Int(255));
    assert_eq!(eval("5 ^ 3"), HostValue::Int(6));
    assert_eq!(eval("~0"), HostValue::Int(-1));
    assert_eq!(eval("1 << 31"), HostValue::Int(-2_147_483_648));
    assert_eq!(eval("-8 >> 1"), HostValue::Int(-4));
    assert_eq!(eval("-1 >>> 0"), HostValue::Int(4_294_967_295));
    assert_eq!(eval("2.9 | 0"), HostValue::Int(2));
}

#[test]
fn truthiness() {
    assert_eq!(eval("!!''"), HostValue::Bool(false));
    assert_eq!(eval("!!0"), HostValue::Bool(false));
    assert_eq!(eval("!!NaN"), HostValue::Bool(false));
    assert_eq!(eval("!!null"), HostValue::Bool(false));
    assert_eq!(eval("!![]"), HostValue::Bool(true));
    assert_eq!(eval("!!{}"), HostValue::Bool(true));
    assert_eq!(eval("!!'0'"), HostValue::Bool(true));
}

#[test]
fn logical_short_circuit() {
    assert_eq!(eval("false && crash()"), HostValue::Bool(false));
    assert_eq!(eval("true || crash()"), HostValue::Bool(true));
    assert_eq!(eval("null ?? 'fallback'"), HostValue::String("fallback".to_owned()));
    assert_eq!(eval("0 ?? 'fallback'"), HostValue::Int(0));
    assert_eq!(eval("0 || 'fallback'"), HostValue::String("fallback".to_owned()));
}

#[test]
fn ternary_and_comma() {
    assert_eq!(eval("1 ? 'a' : 'b'"), HostValue::String("a".to_owned()));
    assert_eq!(eval("(1, 2, 3)"), HostValue::Int(3));
}

#[test]
fn unary_operators() {
    assert_eq!(eval("+'3'"), HostValue::Int(3));
    assert_eq!(eval("-'3'"), HostValue::Int(-3));
    assert_eq!(eval("typeof 1"), HostValue::String("number".to_owned()));
    assert_eq!(eval("typeof 'a'"), HostValue::String("string".to_owned()));
    assert_eq!(eval("typeof null"), HostValue::String("object".to_owned()));
    assert_eq!(eval("typeof undefined"), HostValue::String("undefined".to_owned()));
    assert_eq!(eval("typeof function() {}"), HostValue::String("function".to_owned()));
    assert_eq!(eval("typeof {}"), HostValue::String("object".to_owned()));
}

#[test]
fn increments() {
    assert_eq!(eval("var i = 1; i++; i"), HostValue::Int(2));
    assert_eq!(eval("var i = 1; i++"), HostValue::Int(1));
    assert_eq!(eval("var i = 1; ++i"), HostValue::Int(2));
    assert_eq!(eval("var i = 1; --i; i"), HostValue::Int(0));
    assert_eq!(eval("var a = [5]; a[0]++; a[0]"), HostValue::Int(6));
}

#[test]
fn compound_assignment() {
    assert_eq!(eval("var x = 10; x -= 4; x *= 2; x"), HostValue::Int(12));
    assert_eq!(eval("var s = 'a'; s += 1; s"), HostValue::String("a1".to_owned()));
    assert_eq!(eval("var x = 2; x **= 3; x"), HostValue::Int(8));
    assert_eq!(eval("var x = 1; x <<= 4; x"), HostValue::Int(16));
}

#[test]
fn number_coercion_of_strings() {
    assert_eq!(eval("1 - '0x10'"), HostValue::Int(-15));
    assert_eq!(eval("'' - 1"), HostValue::Int(-1));
    assert!(eval_bool("isNaN('abc' - 1)"));
}

#[test]
fn hex_literals_and_exponents() {
    assert_eq!(eval("0xFF"), HostValue::Int(255));
    assert_eq!(eval("1e3"), HostValue::Int(1000));
    assert_eq!(eval("1.5e-2"), HostValue::Float(0.015));
    assert_eq!(eval(".25 * 4"), HostValue::Int(1));
}

#[test]
fn in_and_instanceof() {
    assert!(eval_bool("'a' in {a: 1}"));
    assert!(!eval_bool("'b' in {a: 1}"));
    assert!(eval_bool("0 in [10]"));
    assert!(!eval_bool("1 in [10]"));
    assert!(eval_bool("[] instanceof Array"));
    assert!(eval_bool("new Error('x') instanceof Error"));
    assert!(eval_bool("new TypeError('x') instanceof TypeError"));
    assert!(eval_bool("new TypeError('x') instanceof Error"));
    assert!(!eval_bool("[] instanceof Error"));
}

#[test]
fn delete_properties() {
    assert_eq!(eval("var o = {a: 1, b: 2}; delete o.a; o"), eval("({b: 2})"));
    assert!(eval_bool("var o = {}; delete o.missing"));
}

#[test]
fn number_formatting() {
    assert_eq!(eval("'' + 0.1"), HostValue::String("0.1".to_owned()));
    assert_eq!(eval("'' + 1e21"), HostValue::String("1e+21".to_owned()));
    assert_eq!(eval("'' + 123"), HostValue::String("123".to_owned()));
    assert_eq!(eval("'' + 1/0"), HostValue::String("Infinity".to_owned()));
    assert_eq!(eval("'' + -0"), HostValue::String("0".to_owned()));
}

#[test]
fn template_literals() {
    assert_eq!(
        eval("var n = 'world'; `hello ${n}!`"),
        HostValue::String("hello world!".to_owned())
    );
    assert_eq!(eval("`${1 + 1}${2 + 2}`"), HostValue::String("24".to_owned()));
    assert_eq!(eval("`a\\`b`"), HostValue::String("a`b".to_owned()));
    // interpolating undefined is a hard error
    assert!(Engine::new().eval("var u; `value: ${u}`").is_err());
}

#[test]
fn template_multiline_tracks_lines() {
    assert_eq!(eval("`l1\nl2`"), HostValue::String("l1\nl2".to_owned()));
}

#[test]
fn regex_literals_vs_division() {
    assert_eq!(eval("var a = 10, b = 2; a / b / 5"), HostValue::Int(1));
    assert!(eval_bool("/ab+c/.test('abbbc')"));
    assert!(!eval_bool("/^x$/.test('y')"));
}
