//! The `String` builtin through the public API.

use pretty_assertions::assert_eq;
use vesper::{Engine, HostValue};

fn eval(source: &str) -> HostValue {
    Engine::new().eval(source).unwrap()
}

fn s(text: &str) -> HostValue {
    HostValue::String(text.to_owned())
}

#[test]
fn length_and_indexing_are_utf16() {
    assert_eq!(eval("'hello'.length"), HostValue::Int(5));
    assert_eq!(eval("'hello'[1]"), s("e"));
    assert_eq!(eval("'hello'[9]"), HostValue::Null);
    // an astral character occupies two code units
    assert_eq!(eval("'😀'.length"), HostValue::Int(2));
    assert_eq!(eval("'a😀'.charCodeAt(1)"), HostValue::Int(0xD83D));
    assert_eq!(eval("'a😀'.codePointAt(1)"), HostValue::Int(0x1F600));
}

#[test]
fn char_access() {
    assert_eq!(eval("'abc'.charAt(1)"), s("b"));
    assert_eq!(eval("'abc'.charAt(9)"), s(""));
    assert_eq!(eval("'abc'.charCodeAt(0)"), HostValue::Int(97));
    assert!(matches!(eval("isNaN('abc'.charCodeAt(9))"), HostValue::Bool(true)));
    assert_eq!(eval("'abc'.at(-1)"), s("c"));
}

#[test]
fn search_methods() {
    assert_eq!(eval("'banana'.indexOf('an')"), HostValue::Int(1));
    assert_eq!(eval("'banana'.indexOf('an', 2)"), HostValue::Int(3));
    assert_eq!(eval("'banana'.lastIndexOf('an')"), HostValue::Int(3));
    assert_eq!(eval("'banana'.indexOf('x')"), HostValue::Int(-1));
    assert_eq!(eval("'banana'.includes('nan')"), HostValue::Bool(true));
    assert_eq!(eval("'abc'.startsWith('ab')"), HostValue::Bool(true));
    assert_eq!(eval("'abc'.startsWith('bc', 1)"), HostValue::Bool(true));
    assert_eq!(eval("'abc'.endsWith('bc')"), HostValue::Bool(true));
    assert_eq!(eval("'abc'.endsWith('ab', 2)"), HostValue::Bool(true));
}

#[test]
fn slicing() {
    assert_eq!(eval("'abcdef'.slice(1, 3)"), s("bc"));
    assert_eq!(eval("'abcdef'.slice(-2)"), s("ef"));
    assert_eq!(eval("'abcdef'.slice(3, 1)"), s(""));
    assert_eq!(eval("'abcdef'.substring(3, 1)"), s("bc"));
    assert_eq!(eval("'abcdef'.substring(-5, 2)"), s("ab"));
}

#[test]
fn case_trim_pad_repeat() {
    assert_eq!(eval("'AbC'.toLowerCase()"), s("abc"));
    assert_eq!(eval("'AbC'.toUpperCase()"), s("ABC"));
    assert_eq!(eval("'  x  '.trim()"), s("x"));
    assert_eq!(eval("'  x  '.trimStart()"), s("x  "));
    assert_eq!(eval("'  x  '.trimEnd()"), s("  x"));
    assert_eq!(eval("'5'.padStart(3, '0')"), s("005"));
    assert_eq!(eval("'5'.padEnd(3)"), s("5  "));
    assert_eq!(eval("'ab'.repeat(3)"), s("ababab"));
    assert!(Engine::new().eval("'a'.repeat(-1)").is_err());
}

#[test]
fn concat_and_split() {
    assert_eq!(eval("'a'.concat('b', 1)"), s("ab1"));
    assert_eq!(
        eval("'a,b,c'.split(',')"),
        HostValue::Array(vec![s("a"), s("b"), s("c")])
    );
    assert_eq!(
        eval("'abc'.split('')"),
        HostValue::Array(vec![s("a"), s("b"), s("c")])
    );
    assert_eq!(eval("'a,b,c'.split(',', 2)"), HostValue::Array(vec![s("a"), s("b")]));
    assert_eq!(
        eval("'a1b22c'.split(/[0-9]+/)"),
        HostValue::Array(vec![s("a"), s("b"), s("c")])
    );
}

#[test]
fn replace_literal() {
    assert_eq!(eval("'aaa'.replace('a', 'b')"), s("baa"));
    assert_eq!(eval("'aaa'.replaceAll('a', 'b')"), s("bbb"));
    assert_eq!(eval("'x'.replace('nope', 'y')"), s("x"));
}

#[test]
fn replace_with_regex_and_groups() {
    assert_eq!(eval("'a1 b2'.replace(/[a-z]([0-9])/, '$1')"), s("1 b2"));
    assert_eq!(eval("'a1 b2'.replace(/[a-z]([0-9])/g, '<$&>')"), s("<a1> <b2>"));
    assert_eq!(
        eval("'abc'.replace(/b/, function(m) { return m.toUpperCase() })"),
        s("aBc")
    );
    assert!(
        Engine::new()
            .eval("'x'.replaceAll(/x/, 'y')")
            .is_err(),
        "replaceAll requires the global flag on a regex"
    );
}

#[test]
fn match_and_search() {
    assert_eq!(
        eval("'a1b2'.match(/[a-z]([0-9])/)"),
        HostValue::Array(vec![s("a1"), s("1")])
    );
    assert_eq!(
        eval("'a1b2'.match(/[a-z][0-9]/g)"),
        HostValue::Array(vec![s("a1"), s("b2")])
    );
    assert_eq!(eval("'xyz'.match(/q/)"), HostValue::Null);
    assert_eq!(eval("'abc1'.search(/[0-9]/)"), HostValue::Int(3));
    assert_eq!(eval("'abc'.search(/[0-9]/)"), HostValue::Int(-1));
}

#[test]
fn statics() {
    assert_eq!(eval("String.fromCharCode(104, 105)"), s("hi"));
    assert_eq!(eval("String.fromCodePoint(0x1F600)"), s("😀"));
    assert_eq!(eval("String(42)"), s("42"));
    assert_eq!(eval("String(null)"), s("null"));
}

#[test]
fn methods_auto_wrap_primitives() {
    // method lookup works straight off a literal
    assert_eq!(eval("'chained'.slice(0, 5).toUpperCase().length"), HostValue::Int(5));
}
