//! Public interface for evaluating JavaScript source.
//!
//! An [`Engine`] owns a root context whose global bindings persist across
//! `eval` calls, so a script can define functions one call and use them the
//! next. Everything that touches the outside world — console output, the
//! host bridge, the clock behind `Date.now`, the RNG behind `Math.random`,
//! and the evaluation listener — is pluggable.

use std::{path::Path, rc::Rc};

use crate::{
    context::{Context, EngineHooks, Exit, ScopeKind, ScopeRef},
    error::{CodeLoc, Exception, ExceptionKind},
    host::{HostBridge, HostValue},
    interp,
    io::ConsoleWriter,
    listener::EngineListener,
    parser,
    property::{self, SlotKey},
    terms,
    value::Value,
};

/// An embeddable JavaScript engine.
///
/// # Example
/// ```
/// use vesper::{Engine, HostValue};
///
/// let mut engine = Engine::new();
/// let result = engine.eval("1 + 2").unwrap();
/// assert_eq!(result, HostValue::Int(3));
///
/// let vars = [("x".to_owned(), HostValue::Int(41))];
/// let result = engine.eval_with("x + 1", vars).unwrap();
/// assert_eq!(result, HostValue::Int(42));
/// ```
pub struct Engine {
    hooks: Rc<EngineHooks>,
    root: ScopeRef,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        let hooks = Rc::new(EngineHooks::new());
        let root = Context::root(hooks.clone());
        Self { hooks, root }
    }

    /// Parses and evaluates `source` against the engine's globals, returning
    /// the value of the last statement. Undefined converts to
    /// [`HostValue::Null`] at this boundary.
    ///
    /// # Errors
    /// A lexical or syntactic failure, or an uncaught runtime throw, is
    /// returned as an [`Exception`] carrying the position and source line.
    pub fn eval(&mut self, source: &str) -> Result<HostValue, Exception> {
        let program = parser::parse(source).map_err(|e| e.with_source(source))?;
        self.run(&program, &self.root.clone(), source)
    }

    /// Like [`Self::eval`], but runs in a nested scope whose parent is the
    /// globals, seeded with the given named bindings. The bindings (and any
    /// `let`/`const` the script declares) are discarded afterwards;
    /// assignments to undeclared names still land in the nested scope, not
    /// the globals.
    pub fn eval_with(
        &mut self,
        source: &str,
        vars: impl IntoIterator<Item = (String, HostValue)>,
    ) -> Result<HostValue, Exception> {
        let program = parser::parse(source).map_err(|e| e.with_source(source))?;
        let scope = Context::child(&self.root, ScopeKind::Block);
        for (name, value) in vars {
            scope.borrow_mut().put(name, value.into_value());
        }
        self.run(&program, &scope, source)
    }

    /// Reads a UTF-8 source file and evaluates it.
    pub fn eval_file(&mut self, path: impl AsRef<Path>) -> Result<HostValue, Exception> {
        let source = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Exception::new(ExceptionKind::Error, format!("cannot read {}: {e}", path.as_ref().display())))?;
        self.eval(&source)
    }

    fn run(&self, program: &Rc<crate::node::Node>, scope: &ScopeRef, source: &str) -> Result<HostValue, Exception> {
        // clear any state a previous (failed) evaluation left behind
        self.root.borrow_mut().reset();
        self.hooks.call_depth.set(0);
        self.hooks.throw_reported.set(false);
        self.hooks.throw_loc.set(None);

        let result = interp::eval_program(program, scope);
        let exit = scope.borrow().exit;
        if exit == Exit::Throw {
            let error_value = scope.borrow().error_value.clone().unwrap_or(Value::Undefined);
            let loc = self.hooks.throw_loc.get().unwrap_or_default();
            scope.borrow_mut().reset();
            return Err(wrap_uncaught(&error_value, loc).with_source(source));
        }
        // a top-level `return` also ends evaluation with its value
        let result = if exit == Exit::Return {
            let value = scope.borrow().return_value.clone().unwrap_or(Value::Undefined);
            scope.borrow_mut().reset();
            value
        } else {
            result
        };
        Ok(HostValue::from_value(&result).undefined_to_null())
    }

    /// Reads a global binding as a host value.
    pub fn get(&self, name: &str) -> Option<HostValue> {
        let value = self.root.borrow().get_local(name)?;
        Some(HostValue::from_value(&value))
    }

    /// Defines or overwrites a global binding.
    pub fn put(&mut self, name: impl Into<String>, value: HostValue) {
        self.root.borrow_mut().put(name.into(), value.into_value());
    }

    /// Removes a global binding.
    pub fn remove(&mut self, name: &str) {
        self.root.borrow_mut().remove(name);
    }

    /// Replaces the sink behind `console.log`/`warn`/`error`.
    pub fn set_console_writer(&mut self, writer: impl ConsoleWriter + 'static) {
        *self.hooks.console.borrow_mut() = Box::new(writer);
    }

    /// Installs an evaluation listener (statement/expression/context events,
    /// error recovery, variable-write notifications).
    pub fn set_listener(&mut self, listener: impl EngineListener + 'static) {
        *self.hooks.listener.borrow_mut() = Some(Box::new(listener));
    }

    /// Removes the evaluation listener.
    pub fn clear_listener(&mut self) {
        *self.hooks.listener.borrow_mut() = None;
    }

    /// Enables host-world interop through the given bridge. Without one, any
    /// reference into the host world raises a TypeError.
    pub fn set_host_bridge(&mut self, bridge: impl HostBridge + 'static) {
        *self.hooks.bridge.borrow_mut() = Some(Box::new(bridge));
    }

    /// Seeds `Math.random` for deterministic runs.
    pub fn set_random_seed(&mut self, seed: u64) {
        self.hooks.seed_rng(seed);
    }

    /// Overrides the clock behind `Date.now` and `new Date()`. The closure
    /// returns epoch milliseconds.
    pub fn set_clock(&mut self, clock: impl Fn() -> f64 + 'static) {
        self.hooks.set_clock(Some(Box::new(clock)));
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").finish_non_exhaustive()
    }
}

/// Wraps an uncaught thrown value into a host-facing exception, pulling the
/// kind and message out of error-shaped objects.
fn wrap_uncaught(error_value: &Value, loc: CodeLoc) -> Exception {
    let name = property::get_property_quiet(error_value, &SlotKey::Name("name".to_owned()));
    let message = property::get_property_quiet(error_value, &SlotKey::Name("message".to_owned()));
    let kind = name
        .as_ref()
        .and_then(|n| terms::to_display_string(n).parse::<ExceptionKind>().ok())
        .unwrap_or(ExceptionKind::Error);
    let message = match message {
        Some(m) if !m.is_undefined() => terms::to_display_string(&m),
        _ => terms::to_display_string(error_value),
    };
    Exception::at(kind, message, loc)
}
