//! Evaluation event hooks.
//!
//! A host may install one [`EngineListener`] to observe evaluation at
//! context, statement, and expression boundaries, to veto or recover from
//! errors, and to watch variable writes. All hooks have default no-op
//! implementations, so a listener implements only what it needs.
//!
//! | Listener | Purpose |
//! |----------|---------|
//! | [`NoopListener`] | Default; every hook is a no-op |
//! | [`StderrListener`] | Human-readable event log on stderr |
//! | [`RecordingListener`] | Collects events into a shared buffer for assertions or replay |

use std::{cell::RefCell, rc::Rc};

use crate::{error::CodeLoc, host::HostValue};

/// What happened, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    /// Node kind name, e.g. `"FnCall"` or `"VarStmt"`.
    pub node: &'static str,
    pub loc: CodeLoc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum EventKind {
    ContextEnter,
    ContextExit,
    StatementEnter,
    StatementExit,
    ExpressionEnter,
    ExpressionExit,
}

/// Which binding form produced a variable write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum DeclKind {
    Var,
    Let,
    Const,
    /// Implicit global created by assigning an undeclared name.
    Assign,
}

/// A listener's answer to an error: substitute `return_value` for the failed
/// evaluation and, when `ignore_error` is set, clear the throw state.
#[derive(Debug, Clone)]
pub struct Recovery {
    pub ignore_error: bool,
    pub return_value: HostValue,
}

/// Host-installable evaluation hooks. Every method defaults to a no-op.
pub trait EngineListener {
    /// Called at each enter/exit boundary.
    fn on_event(&mut self, event: &Event) {
        let _ = event;
    }

    /// Called when an evaluation raised an error. Returning a [`Recovery`]
    /// with `ignore_error` substitutes its value for the failed expression
    /// and clears the throw state.
    fn on_error(&mut self, event: &Event, error: &HostValue) -> Option<Recovery> {
        let _ = (event, error);
        None
    }

    /// Called before each function invocation with the stringified receiver
    /// and arguments.
    fn on_function_call(&mut self, name: &str, args: &[HostValue]) {
        let _ = (name, args);
    }

    /// Called when a declaration or an implicit-global assignment writes a
    /// variable.
    fn on_variable_write(&mut self, kind: DeclKind, name: &str, value: &HostValue) {
        let _ = (kind, name, value);
    }
}

/// Zero-cost default listener.
#[derive(Debug, Default)]
pub struct NoopListener;

impl EngineListener for NoopListener {}

/// Logs every event to stderr; intended for debugging scripts.
#[derive(Debug, Default)]
pub struct StderrListener;

impl EngineListener for StderrListener {
    fn on_event(&mut self, event: &Event) {
        eprintln!("{} {} {}", event.kind, event.node, event.loc);
    }

    fn on_function_call(&mut self, name: &str, args: &[HostValue]) {
        eprintln!("call {name}({args:?})");
    }

    fn on_variable_write(&mut self, kind: DeclKind, name: &str, value: &HostValue) {
        eprintln!("{kind} {name} = {value:?}");
    }
}

/// A recorded entry from [`RecordingListener`].
#[derive(Debug, Clone)]
pub enum Recorded {
    Event(Event),
    FunctionCall { name: String, argc: usize },
    VariableWrite { kind: DeclKind, name: String, value: HostValue },
    Error { message: String },
}

/// Records all hook activity into a shared buffer.
///
/// Clone the listener before installing it; the clone shares the buffer, so
/// the host can inspect events after (or during) evaluation.
#[derive(Debug, Default, Clone)]
pub struct RecordingListener {
    records: Rc<RefCell<Vec<Recorded>>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<Recorded> {
        self.records.borrow().clone()
    }

    pub fn clear(&self) {
        self.records.borrow_mut().clear();
    }

    pub fn events(&self) -> Vec<Event> {
        self.records
            .borrow()
            .iter()
            .filter_map(|r| match r {
                Recorded::Event(e) => Some(e.clone()),
                _ => None,
            })
            .collect()
    }
}

impl EngineListener for RecordingListener {
    fn on_event(&mut self, event: &Event) {
        self.records.borrow_mut().push(Recorded::Event(event.clone()));
    }

    fn on_error(&mut self, _event: &Event, error: &HostValue) -> Option<Recovery> {
        self.records.borrow_mut().push(Recorded::Error {
            message: format!("{error:?}"),
        });
        None
    }

    fn on_function_call(&mut self, name: &str, args: &[HostValue]) {
        self.records.borrow_mut().push(Recorded::FunctionCall {
            name: name.to_owned(),
            argc: args.len(),
        });
    }

    fn on_variable_write(&mut self, kind: DeclKind, name: &str, value: &HostValue) {
        self.records.borrow_mut().push(Recorded::VariableWrite {
            kind,
            name: name.to_owned(),
            value: value.clone(),
        });
    }
}
