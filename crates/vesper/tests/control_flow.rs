//! Loops, switch, try/catch/finally, and exit-flag behavior.

use pretty_assertions::assert_eq;
use vesper::{Engine, ExceptionKind, HostValue};

fn eval(source: &str) -> HostValue {
    Engine::new().eval(source).unwrap()
}

#[test]
fn while_loop_with_break_and_continue() {
    assert_eq!(
        eval("var n = 0; var i = 0; while (true) { i++; if (i > 10) break; if (i % 2) continue; n += i; } n"),
        HostValue::Int(30)
    );
}

#[test]
fn do_while_runs_at_least_once() {
    assert_eq!(eval("var n = 0; do { n++; } while (false); n"), HostValue::Int(1));
}

#[test]
fn c_style_for_with_multiple_declarators() {
    assert_eq!(
        eval("var s = 0; for (var i = 0, j = 10; i < j; i++, j--) { s++; } s"),
        HostValue::Int(5)
    );
}

#[test]
fn for_without_clauses() {
    assert_eq!(eval("var i = 0; for (;;) { if (++i === 3) break; } i"), HostValue::Int(3));
}

#[test]
fn for_in_iterates_keys_in_insertion_order() {
    assert_eq!(
        eval("var ks = []; for (var k in {b: 1, a: 2}) { ks.push(k) } ks"),
        HostValue::Array(vec![
            HostValue::String("b".to_owned()),
            HostValue::String("a".to_owned())
        ])
    );
    assert_eq!(
        eval("var ks = []; for (var k in ['x', 'y']) { ks.push(k) } ks"),
        HostValue::Array(vec![HostValue::Int(0), HostValue::Int(1)])
    );
}

#[test]
fn for_of_iterates_values() {
    assert_eq!(
        eval("var vs = []; for (const v of [10, 20]) { vs.push(v) } vs"),
        HostValue::Array(vec![HostValue::Int(10), HostValue::Int(20)])
    );
    assert_eq!(
        eval("var vs = []; for (const v of {a: 1, b: 2}) { vs.push(v) } vs"),
        HostValue::Array(vec![HostValue::Int(1), HostValue::Int(2)])
    );
    assert_eq!(
        eval("var cs = []; for (const c of 'ab') { cs.push(c) } cs"),
        HostValue::Array(vec![
            HostValue::String("a".to_owned()),
            HostValue::String("b".to_owned())
        ])
    );
}

/// `let` in a loop head rebinds per iteration, so closures capture each
/// pass's value; `var` shares one binding.
#[test]
fn loop_closures_capture_per_iteration_with_let() {
    assert_eq!(
        eval("var fs = []; for (let i = 0; i < 3; i++) { fs.push(() => i) } fs.map(f => f())"),
        HostValue::Array(vec![HostValue::Int(0), HostValue::Int(1), HostValue::Int(2)])
    );
    assert_eq!(
        eval("var fs = []; for (var i = 0; i < 3; i++) { fs.push(() => i) } fs.map(f => f())"),
        HostValue::Array(vec![HostValue::Int(3), HostValue::Int(3), HostValue::Int(3)])
    );
}

#[test]
fn for_of_let_rebinds_per_iteration() {
    assert_eq!(
        eval("var fs = []; for (let x of [1, 2]) { fs.push(() => x) } fs.map(f => f())"),
        HostValue::Array(vec![HostValue::Int(1), HostValue::Int(2)])
    );
}

/// A `let` inside a loop body is invisible to the next iteration; a `var`
/// is visible to the whole function.
#[test]
fn let_is_block_scoped_var_is_function_scoped() {
    assert_eq!(
        eval("function f() { { var a = 1; let b = 2; } return typeof a + ',' + typeof b } f()"),
        HostValue::String("number,undefined".to_owned())
    );
}

#[test]
fn switch_matches_strictly_and_falls_through() {
    let program = "
        function pick(x) {
            var out = [];
            switch (x) {
                case 1: out.push('one');
                case 2: out.push('two'); break;
                case 3: out.push('three'); break;
                default: out.push('other');
            }
            return out.join('+');
        }
        [pick(1), pick(2), pick(3), pick('1'), pick(9)]
    ";
    assert_eq!(
        eval(program),
        HostValue::Array(vec![
            HostValue::String("one+two".to_owned()),
            HostValue::String("two".to_owned()),
            HostValue::String("three".to_owned()),
            HostValue::String("other".to_owned()),
            HostValue::String("other".to_owned()),
        ])
    );
}

#[test]
fn switch_default_in_the_middle() {
    // default runs only when nothing matches, wherever it sits
    assert_eq!(
        eval("var r = []; switch (5) { case 1: r.push('a'); default: r.push('d'); case 2: r.push('b'); } r.join('')"),
        HostValue::String("db".to_owned())
    );
}

#[test]
fn try_catch_catches_and_resumes() {
    assert_eq!(
        eval("var r = 'before'; try { throw 'boom'; } catch (e) { r = e.message } r"),
        HostValue::String("boom".to_owned())
    );
}

#[test]
fn catch_without_binding() {
    assert_eq!(eval("try { null.x } catch { 'caught' }"), HostValue::String("caught".to_owned()));
}

#[test]
fn finally_always_runs() {
    assert_eq!(
        eval("var r = []; try { r.push('t'); throw 'x'; } catch (e) { r.push('c') } finally { r.push('f') } r.join('')"),
        HostValue::String("tcf".to_owned())
    );
    assert_eq!(
        eval("var r = []; try { r.push('t') } finally { r.push('f') } r.join('')"),
        HostValue::String("tf".to_owned())
    );
}

#[test]
fn finally_replaces_in_flight_exit() {
    assert_eq!(
        eval("function f() { try { return 'from try' } finally { return 'from finally' } } f()"),
        HostValue::String("from finally".to_owned())
    );
}

#[test]
fn return_unwinds_through_loops() {
    assert_eq!(
        eval("function f() { for (var i = 0; i < 100; i++) { if (i === 3) return i } } f()"),
        HostValue::Int(3)
    );
}

#[test]
fn throw_unwinds_through_loops_to_catch() {
    assert_eq!(
        eval("try { while (true) { throw new Error('stop') } } catch (e) { e.message }"),
        HostValue::String("stop".to_owned())
    );
}

#[test]
fn uncaught_throw_reaches_the_host() {
    let err = Engine::new().eval("throw new TypeError('bad')").unwrap_err();
    assert_eq!(err.kind(), ExceptionKind::TypeError);
    assert_eq!(err.message(), "bad");
}

#[test]
fn reference_error_for_unbound_names() {
    let err = Engine::new().eval("missing + 1").unwrap_err();
    assert_eq!(err.kind(), ExceptionKind::ReferenceError);
    assert_eq!(err.message(), "missing is not defined");
}

#[test]
fn type_error_for_nullish_property_reads() {
    let err = Engine::new().eval("var o = null; o.x").unwrap_err();
    assert_eq!(err.kind(), ExceptionKind::TypeError);
    assert_eq!(err.message(), "cannot read properties of null (reading 'x')");
}

#[test]
fn error_positions_are_reported() {
    let err = Engine::new().eval("var a = 1;\nb + 1").unwrap_err();
    let loc = err.loc().unwrap();
    assert_eq!(loc.to_string(), "[2:1]");
    assert_eq!(err.source_line(), Some("b + 1"));
}

#[test]
fn call_depth_is_bounded() {
    let err = Engine::new().eval("function f() { return f() } f()").unwrap_err();
    assert_eq!(err.kind(), ExceptionKind::RangeError);
    assert_eq!(err.message(), "Maximum call stack size exceeded");
}

#[test]
fn nested_block_scoping() {
    assert_eq!(
        eval("let x = 'outer'; { let x = 'inner'; } x"),
        HostValue::String("outer".to_owned())
    );
    assert_eq!(
        eval("var x = 'outer'; { x = 'changed'; } x"),
        HostValue::String("changed".to_owned())
    );
}
