//! Runtime lexical environments.
//!
//! A [`Context`] owns a lazily allocated, insertion-ordered bindings map and
//! a back-reference to its parent. Contexts are created at block, function,
//! loop, and catch boundaries and shared through `Rc`: a closure keeps its
//! declaring context alive for as long as the closure itself lives, which is
//! exactly the ownership model the language needs. Child contexts spawned
//! during evaluation drop when evaluation leaves them, after propagating
//! their exit state to the parent.
//!
//! Non-local control flow (`break`/`continue`/`return`/`throw`) is modelled
//! as an exit flag on the current context rather than native unwinding;
//! evaluator loops test [`Context::is_stopped`] after every statement.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use indexmap::IndexMap;
use rand::{Rng, SeedableRng, rngs::SmallRng};

use crate::{
    builtins,
    host::HostBridge,
    io::{ConsoleWriter, StdConsole},
    listener::EngineListener,
    value::Value,
};

pub(crate) type ScopeRef = Rc<RefCell<Context>>;

/// Why a context was created; governs which exit flags it consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScopeKind {
    Global,
    Function,
    Block,
    Loop,
    Catch,
}

/// Single-slot non-local control transfer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Exit {
    #[default]
    None,
    Break,
    Continue,
    Return,
    Throw,
}

/// A lexical environment.
#[derive(Debug)]
pub(crate) struct Context {
    pub kind: ScopeKind,
    pub parent: Option<ScopeRef>,
    /// Lazily allocated to keep block entry cheap.
    bindings: Option<IndexMap<String, Value>>,
    /// `None` inherits `this` from the parent chain.
    this_value: Option<Value>,
    pub exit: Exit,
    pub return_value: Option<Value>,
    pub error_value: Option<Value>,
    /// Current iteration counter of the nearest loop; −1 outside loops.
    pub iteration_index: i64,
    /// Engine-wide pluggable collaborators, shared from the root.
    pub hooks: Rc<EngineHooks>,
}

impl Context {
    pub fn root(hooks: Rc<EngineHooks>) -> ScopeRef {
        Rc::new(RefCell::new(Self {
            kind: ScopeKind::Global,
            parent: None,
            bindings: None,
            this_value: Some(Value::Undefined),
            exit: Exit::None,
            return_value: None,
            error_value: None,
            iteration_index: -1,
            hooks,
        }))
    }

    pub fn child(parent: &ScopeRef, kind: ScopeKind) -> ScopeRef {
        let hooks = parent.borrow().hooks.clone();
        Rc::new(RefCell::new(Self {
            kind,
            parent: Some(parent.clone()),
            bindings: None,
            this_value: None,
            exit: Exit::None,
            return_value: None,
            error_value: None,
            iteration_index: if kind == ScopeKind::Loop { 0 } else { -1 },
            hooks,
        }))
    }

    /// A function activation chained to the *declaring* environment, with an
    /// explicit receiver. Arrow functions pass `this_value: None` so `this`
    /// resolves in the declaring chain.
    pub fn function(declaring: &ScopeRef, this_value: Option<Value>) -> ScopeRef {
        let scope = Self::child(declaring, ScopeKind::Function);
        scope.borrow_mut().this_value = this_value;
        scope
    }

    // === bindings ===

    pub fn get_local(&self, name: &str) -> Option<Value> {
        self.bindings.as_ref().and_then(|b| b.get(name)).cloned()
    }

    pub fn has_local(&self, name: &str) -> bool {
        self.bindings.as_ref().is_some_and(|b| b.contains_key(name))
    }

    /// Defines or overwrites a binding in *this* context, shadowing any
    /// outer definition.
    pub fn put(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.get_or_insert_with(IndexMap::new).insert(name.into(), value);
    }

    fn set_local(&mut self, name: &str, value: Value) -> bool {
        if let Some(bindings) = self.bindings.as_mut() {
            if let Some(slot) = bindings.get_mut(name) {
                *slot = value;
                return true;
            }
        }
        false
    }

    /// Removes a binding from this context only.
    pub fn remove(&mut self, name: &str) {
        if let Some(bindings) = self.bindings.as_mut() {
            bindings.shift_remove(name);
        }
    }

    /// Copy of the current bindings, used to give each loop iteration a
    /// fresh context that still sees the values from the previous pass.
    pub fn snapshot_bindings(&self) -> Option<IndexMap<String, Value>> {
        self.bindings.clone()
    }

    pub fn restore_bindings(&mut self, bindings: Option<IndexMap<String, Value>>) {
        self.bindings = bindings;
    }

    // === exit flags ===

    pub fn is_stopped(&self) -> bool {
        self.exit != Exit::None
    }

    pub fn stop_break(&mut self) {
        self.exit = Exit::Break;
    }

    pub fn stop_continue(&mut self) {
        self.exit = Exit::Continue;
    }

    pub fn stop_return(&mut self, value: Value) {
        self.exit = Exit::Return;
        self.return_value = Some(value);
    }

    pub fn stop_throw(&mut self, error: Value) {
        self.exit = Exit::Throw;
        self.error_value = Some(error);
    }

    /// Clears the exit flag; used by loops to consume `continue`/`break`
    /// and by `catch` to consume a throw.
    pub fn reset(&mut self) {
        if self.exit == Exit::Throw {
            self.hooks.throw_reported.set(false);
            self.hooks.throw_loc.set(None);
        }
        self.exit = Exit::None;
        self.return_value = None;
        self.error_value = None;
    }

    /// Propagates a finished child's exit state into this context. Lexical
    /// bindings created in the child are discarded with it.
    pub fn update_from(&mut self, child: &Self) {
        if child.is_stopped() {
            self.exit = child.exit;
            self.return_value = child.return_value.clone();
            self.error_value = child.error_value.clone();
        }
    }
}

/// Reads a name, searching this context then its ancestors. At the root,
/// unresolved names are tried against the builtin table and the builtin is
/// materialized into the root bindings on first use.
pub(crate) fn lookup(scope: &ScopeRef, name: &str) -> Option<Value> {
    if name == "this" {
        return Some(this_of(scope));
    }
    let mut current = scope.clone();
    loop {
        if let Some(value) = current.borrow().get_local(name) {
            return Some(value);
        }
        let parent = current.borrow().parent.clone();
        match parent {
            Some(p) => current = p,
            None => break,
        }
    }
    // `current` is now the root
    if let Some(builtin) = builtins::lookup_global(name) {
        current.borrow_mut().put(name, builtin.clone());
        return Some(builtin);
    }
    None
}

/// Whether a name resolves anywhere in the chain, including unmaterialized
/// builtins.
pub(crate) fn has(scope: &ScopeRef, name: &str) -> bool {
    if name == "this" {
        return true;
    }
    let mut current = scope.clone();
    loop {
        if current.borrow().has_local(name) {
            return true;
        }
        let parent = current.borrow().parent.clone();
        match parent {
            Some(p) => current = p,
            None => break,
        }
    }
    builtins::is_global_name(name)
}

/// The current receiver: nearest context with an explicit `this`.
pub(crate) fn this_of(scope: &ScopeRef) -> Value {
    let mut current = scope.clone();
    loop {
        if let Some(this_value) = current.borrow().this_value.clone() {
            return this_value;
        }
        let parent = current.borrow().parent.clone();
        match parent {
            Some(p) => current = p,
            None => return Value::Undefined,
        }
    }
}

/// Assigns a name: updates the nearest context that defines it, or creates
/// it in `scope` when undefined anywhere (implicit-global style assignment;
/// the caller fires the variable-write event in that case).
///
/// Returns `true` when the write created a new binding.
pub(crate) fn update(scope: &ScopeRef, name: &str, value: Value) -> bool {
    let mut current = scope.clone();
    loop {
        if current.borrow_mut().set_local(name, value.clone()) {
            return false;
        }
        let parent = current.borrow().parent.clone();
        match parent {
            Some(p) => current = p,
            None => break,
        }
    }
    scope.borrow_mut().put(name, value);
    true
}

/// Engine-wide pluggable collaborators, owned by the root context.
///
/// Everything that touches the outside world (console output, the host
/// bridge, wall-clock time, randomness) routes through here so hosts can
/// substitute deterministic versions for testing.
pub(crate) struct EngineHooks {
    pub console: RefCell<Box<dyn ConsoleWriter>>,
    pub listener: RefCell<Option<Box<dyn EngineListener>>>,
    pub bridge: RefCell<Option<Box<dyn HostBridge>>>,
    rng: RefCell<SmallRng>,
    clock_millis: RefCell<Option<Box<dyn Fn() -> f64>>>,
    /// Function-call nesting depth, bounded by [`MAX_CALL_DEPTH`].
    pub call_depth: Cell<usize>,
    /// Whether the in-flight throw has already been offered to the
    /// listener's `on_error`; prevents duplicate reports as it propagates.
    pub throw_reported: Cell<bool>,
    /// Statement position of the in-flight throw, for the uncaught-error
    /// wrapper at the program root.
    pub throw_loc: Cell<Option<crate::error::CodeLoc>>,
}

/// Maximum function-call nesting before a RangeError is raised.
pub(crate) const MAX_CALL_DEPTH: usize = 512;

impl EngineHooks {
    pub fn new() -> Self {
        Self {
            console: RefCell::new(Box::new(StdConsole)),
            listener: RefCell::new(None),
            bridge: RefCell::new(None),
            rng: RefCell::new(SmallRng::from_entropy()),
            clock_millis: RefCell::new(None),
            call_depth: Cell::new(0),
            throw_reported: Cell::new(false),
            throw_loc: Cell::new(None),
        }
    }

    pub fn seed_rng(&self, seed: u64) {
        *self.rng.borrow_mut() = SmallRng::seed_from_u64(seed);
    }

    pub fn random(&self) -> f64 {
        self.rng.borrow_mut().r#gen::<f64>()
    }

    pub fn set_clock(&self, clock: Option<Box<dyn Fn() -> f64>>) {
        *self.clock_millis.borrow_mut() = clock;
    }

    /// Current time in epoch milliseconds, from the override or the system
    /// clock.
    pub fn now_millis(&self) -> f64 {
        if let Some(clock) = self.clock_millis.borrow().as_ref() {
            return clock();
        }
        chrono::Utc::now().timestamp_millis() as f64
    }
}

impl std::fmt::Debug for EngineHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHooks")
            .field("call_depth", &self.call_depth.get())
            .finish_non_exhaustive()
    }
}
