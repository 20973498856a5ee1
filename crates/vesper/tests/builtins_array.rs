//! The `Array` builtin through the public API.

use pretty_assertions::assert_eq;
use vesper::{Engine, HostValue};

fn eval(source: &str) -> HostValue {
    Engine::new().eval(source).unwrap()
}

fn ints(values: &[i64]) -> HostValue {
    HostValue::Array(values.iter().map(|v| HostValue::Int(*v)).collect())
}

#[test]
fn length_and_indexing() {
    assert_eq!(eval("[1,2,3].length"), HostValue::Int(3));
    assert_eq!(eval("var a = [1,2,3]; a[1]"), HostValue::Int(2));
    assert_eq!(eval("var a = [1]; a[5]"), HostValue::Null);
    // numeric-string access reaches the same slot
    assert_eq!(eval("var a = [9]; a['0']"), HostValue::Int(9));
    // writing past the end fills holes with null
    assert_eq!(eval("var a = []; a[2] = 1; a"), HostValue::Array(vec![
        HostValue::Null,
        HostValue::Null,
        HostValue::Int(1)
    ]));
}

#[test]
fn push_pop_shift_unshift() {
    assert_eq!(eval("var a = [1]; a.push(2, 3)"), HostValue::Int(3));
    assert_eq!(eval("var a = [1, 2]; a.pop()"), HostValue::Int(2));
    assert_eq!(eval("var a = [1, 2]; a.shift(); a"), ints(&[2]));
    assert_eq!(eval("var a = [3]; a.unshift(1, 2); a"), ints(&[1, 2, 3]));
    assert_eq!(eval("[].pop()"), HostValue::Null);
}

#[test]
fn slice_and_splice() {
    assert_eq!(eval("[1,2,3,4].slice(1, 3)"), ints(&[2, 3]));
    assert_eq!(eval("[1,2,3,4].slice(-2)"), ints(&[3, 4]));
    assert_eq!(eval("var a = [1,2,3,4]; a.splice(1, 2)"), ints(&[2, 3]));
    assert_eq!(eval("var a = [1,2,3,4]; a.splice(1, 2, 9); a"), ints(&[1, 9, 4]));
}

#[test]
fn search_methods() {
    assert_eq!(eval("[1,2,3,2].indexOf(2)"), HostValue::Int(1));
    assert_eq!(eval("[1,2,3,2].lastIndexOf(2)"), HostValue::Int(3));
    assert_eq!(eval("[1,2].indexOf(9)"), HostValue::Int(-1));
    assert_eq!(eval("[1,NaN].includes(NaN)"), HostValue::Bool(true));
    assert_eq!(eval("[1,2].includes(2)"), HostValue::Bool(true));
}

#[test]
fn join_reverse_concat() {
    assert_eq!(eval("[1,2,3].join('-')"), HostValue::String("1-2-3".to_owned()));
    assert_eq!(eval("[1,null,undefined,2].join(',')"), HostValue::String("1,,,2".to_owned()));
    assert_eq!(eval("[1,2].reverse()"), ints(&[2, 1]));
    assert_eq!(eval("[1].concat([2, 3], 4)"), ints(&[1, 2, 3, 4]));
}

#[test]
fn sort_default_is_lexicographic() {
    assert_eq!(eval("[10, 9, 1].sort()"), ints(&[1, 10, 9]));
    assert_eq!(
        eval("['b', 'a', 'c'].sort().join('')"),
        HostValue::String("abc".to_owned())
    );
}

#[test]
fn sort_with_comparator() {
    assert_eq!(eval("[10, 9, 1].sort((a, b) => a - b)"), ints(&[1, 9, 10]));
    assert_eq!(eval("[1, 9, 10].sort((a, b) => b - a)"), ints(&[10, 9, 1]));
}

#[test]
fn iteration_methods() {
    assert_eq!(eval("[1,2,3].map(x => x * 2)"), ints(&[2, 4, 6]));
    assert_eq!(eval("[1,2,3,4].filter(x => x % 2 === 0)"), ints(&[2, 4]));
    assert_eq!(eval("[1,2,3].find(x => x > 1)"), HostValue::Int(2));
    assert_eq!(eval("[1,2,3].findIndex(x => x > 1)"), HostValue::Int(1));
    assert_eq!(eval("[1,2,3].findLast(x => x < 3)"), HostValue::Int(2));
    assert_eq!(eval("[1,2,3].findLastIndex(x => x < 3)"), HostValue::Int(1));
    assert_eq!(eval("[1,2].some(x => x === 2)"), HostValue::Bool(true));
    assert_eq!(eval("[1,2].every(x => x > 0)"), HostValue::Bool(true));
    assert_eq!(eval("[1,2].every(x => x > 1)"), HostValue::Bool(false));
    assert_eq!(
        eval("var s = 0; [1,2,3].forEach(x => s += x); s"),
        HostValue::Int(6)
    );
}

#[test]
fn map_callback_receives_index_and_array() {
    assert_eq!(eval("['a','b'].map((v, i) => v + i).join(',')"), HostValue::String("a0,b1".to_owned()));
    assert_eq!(eval("[1,2].map((v, i, a) => a.length)"), ints(&[2, 2]));
}

#[test]
fn reduce_both_directions() {
    assert_eq!(eval("[1,2,3].reduce((a, b) => a + b)"), HostValue::Int(6));
    assert_eq!(eval("[1,2,3].reduce((a, b) => a + b, 10)"), HostValue::Int(16));
    assert_eq!(
        eval("['a','b','c'].reduceRight((a, b) => a + b)"),
        HostValue::String("cba".to_owned())
    );
    assert!(Engine::new().eval("[].reduce((a, b) => a + b)").is_err());
}

#[test]
fn flat_and_flat_map() {
    assert_eq!(eval("[1, [2, [3, [4]]]].flat()"), eval("[1, 2, [3, [4]]]"));
    assert_eq!(eval("[1, [2, [3]]].flat(2)"), ints(&[1, 2, 3]));
    assert_eq!(eval("[1, 2].flatMap(x => [x, x * 10])"), ints(&[1, 10, 2, 20]));
}

#[test]
fn fill_at_with_copy_within() {
    assert_eq!(eval("[1,2,3].fill(0, 1)"), ints(&[1, 0, 0]));
    assert_eq!(eval("[1,2,3].at(-1)"), HostValue::Int(3));
    assert_eq!(eval("[1,2,3].at(5)"), HostValue::Null);
    assert_eq!(eval("[1,2,3].with(1, 9)"), ints(&[1, 9, 3]));
    // `with` copies
    assert_eq!(eval("var a = [1,2,3]; a.with(1, 9); a"), ints(&[1, 2, 3]));
    assert_eq!(eval("[1,2,3,4,5].copyWithin(0, 3)"), ints(&[4, 5, 3, 4, 5]));
}

#[test]
fn keys_values_entries() {
    assert_eq!(eval("['a','b'].keys()"), ints(&[0, 1]));
    assert_eq!(
        eval("['a','b'].values().join('')"),
        HostValue::String("ab".to_owned())
    );
    assert_eq!(
        eval("['a'].entries()"),
        HostValue::Array(vec![HostValue::Array(vec![
            HostValue::Int(0),
            HostValue::String("a".to_owned())
        ])])
    );
}

#[test]
fn statics() {
    assert_eq!(eval("Array.isArray([])"), HostValue::Bool(true));
    assert_eq!(eval("Array.isArray('no')"), HostValue::Bool(false));
    assert_eq!(eval("Array.of(1, 2)"), ints(&[1, 2]));
    assert_eq!(eval("Array.from('ab').join(',')"), HostValue::String("a,b".to_owned()));
    assert_eq!(eval("Array.from([1, 2], x => x * 2)"), ints(&[2, 4]));
}

#[test]
fn callback_throw_aborts_iteration() {
    let err = Engine::new()
        .eval("[1,2,3].map(function(x) { if (x === 2) throw new Error('mid'); return x })")
        .unwrap_err();
    assert_eq!(err.message(), "mid");
}

#[test]
fn arrays_share_identity() {
    assert_eq!(
        eval("var a = [1]; var b = a; b.push(2); a"),
        ints(&[1, 2])
    );
}
