//! The evaluation listener: event stream, variable writes, function calls,
//! and error recovery.

use std::{cell::RefCell, rc::Rc};

use pretty_assertions::assert_eq;
use vesper::{
    DeclKind, Engine, EngineListener, Event, EventKind, HostValue, Recorded, RecordingListener, Recovery,
};

#[test]
fn statement_and_expression_events_fire_in_pairs() {
    let recording = RecordingListener::new();
    let mut engine = Engine::new();
    engine.set_listener(recording.clone());
    engine.eval("var a = 1; a + 2").unwrap();

    let events = recording.events();
    assert!(!events.is_empty());
    let enters = events.iter().filter(|e| e.kind == EventKind::StatementEnter).count();
    let exits = events.iter().filter(|e| e.kind == EventKind::StatementExit).count();
    assert_eq!(enters, exits);
    assert_eq!(enters, 2);
    let expr_enters = events.iter().filter(|e| e.kind == EventKind::ExpressionEnter).count();
    let expr_exits = events.iter().filter(|e| e.kind == EventKind::ExpressionExit).count();
    assert_eq!(expr_enters, expr_exits);
}

#[test]
fn context_events_fire_for_blocks() {
    let recording = RecordingListener::new();
    let mut engine = Engine::new();
    engine.set_listener(recording.clone());
    engine.eval("{ var a = 1; }").unwrap();
    let events = recording.events();
    assert!(events.iter().any(|e| e.kind == EventKind::ContextEnter));
    assert!(events.iter().any(|e| e.kind == EventKind::ContextExit));
}

#[test]
fn variable_writes_report_their_declaration_kind() {
    let recording = RecordingListener::new();
    let mut engine = Engine::new();
    engine.set_listener(recording.clone());
    engine.eval("var a = 1; let b = 2; const c = 3; d = 4").unwrap();

    let writes: Vec<(DeclKind, String)> = recording
        .records()
        .into_iter()
        .filter_map(|r| match r {
            Recorded::VariableWrite { kind, name, .. } => Some((kind, name)),
            _ => None,
        })
        .collect();
    assert_eq!(
        writes,
        vec![
            (DeclKind::Var, "a".to_owned()),
            (DeclKind::Let, "b".to_owned()),
            (DeclKind::Const, "c".to_owned()),
            // an undeclared assignment is an implicit creation
            (DeclKind::Assign, "d".to_owned()),
        ]
    );
}

#[test]
fn function_calls_are_reported_with_arguments() {
    let recording = RecordingListener::new();
    let mut engine = Engine::new();
    engine.set_listener(recording.clone());
    engine.eval("function f(a, b) { return a + b } f(1, 2)").unwrap();
    let calls: Vec<(String, usize)> = recording
        .records()
        .into_iter()
        .filter_map(|r| match r {
            Recorded::FunctionCall { name, argc } => Some((name, argc)),
            _ => None,
        })
        .collect();
    assert_eq!(calls, vec![("f".to_owned(), 2)]);
}

#[test]
fn event_sequences_are_deterministic() {
    let run = || {
        let recording = RecordingListener::new();
        let mut engine = Engine::new();
        engine.set_listener(recording.clone());
        engine.eval("var t = 0; for (let i = 0; i < 3; i++) { t += i } t").unwrap();
        recording.events()
    };
    let first: Vec<Event> = run();
    let second: Vec<Event> = run();
    assert_eq!(first, second);
}

/// A listener that substitutes a value for any failed evaluation.
struct Recovering {
    seen: Rc<RefCell<Vec<String>>>,
    value: i64,
}

impl EngineListener for Recovering {
    fn on_error(&mut self, event: &Event, error: &HostValue) -> Option<Recovery> {
        self.seen.borrow_mut().push(format!("{}:{error:?}", event.node));
        Some(Recovery {
            ignore_error: true,
            return_value: HostValue::Int(self.value),
        })
    }
}

#[test]
fn error_recovery_replaces_the_failed_expression() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut engine = Engine::new();
    engine.set_listener(Recovering {
        seen: seen.clone(),
        value: 42,
    });
    // the unbound reference fails; the listener supplies 42 in its place
    let result = engine.eval("var x = missing + 1; x").unwrap();
    assert_eq!(result, HostValue::Int(43));
    assert_eq!(seen.borrow().len(), 1);
    assert!(seen.borrow()[0].starts_with("Ref:"));
}

/// A listener that declines to recover.
struct Observing {
    errors: Rc<RefCell<usize>>,
}

impl EngineListener for Observing {
    fn on_error(&mut self, _event: &Event, _error: &HostValue) -> Option<Recovery> {
        *self.errors.borrow_mut() += 1;
        None
    }
}

#[test]
fn unrecovered_errors_are_reported_once_and_still_propagate() {
    let errors = Rc::new(RefCell::new(0));
    let mut engine = Engine::new();
    engine.set_listener(Observing { errors: errors.clone() });
    let err = engine.eval("function f() { return missing } f() + 1").unwrap_err();
    assert_eq!(err.kind(), vesper::ExceptionKind::ReferenceError);
    // the throw crossed several expression boundaries but was offered once
    assert_eq!(*errors.borrow(), 1);
}

#[test]
fn caught_errors_can_be_reported_again_later() {
    let errors = Rc::new(RefCell::new(0));
    let mut engine = Engine::new();
    engine.set_listener(Observing { errors: errors.clone() });
    engine
        .eval("try { missing1 } catch (e) {} try { missing2 } catch (e) {}")
        .unwrap();
    assert_eq!(*errors.borrow(), 2);
}
