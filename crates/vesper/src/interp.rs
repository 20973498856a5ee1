//! Tree-walking evaluator: one handler per node kind.
//!
//! Control flow discipline: every handler tests the context's exit flag
//! after each child evaluation and bails out without further side effects
//! once the context is stopped. Loops consume `Break`/`Continue`, function
//! activations consume `Return`, `try` consumes `Throw`; anything else
//! propagates upward through [`Context::update_from`].
//!
//! Optional chaining is evaluated through [`eval_chain`], which threads a
//! short-circuit flag: once a `?.` meets a nullish receiver, the rest of the
//! member chain (including calls and indexing) yields undefined without
//! evaluating further receivers.

use std::rc::Rc;

use crate::{
    builtins::{self, BuiltinCtor, error},
    context::{Context, EngineHooks, Exit, MAX_CALL_DEPTH, ScopeKind, ScopeRef, this_of},
    host::{HostValue, MirrorHandle},
    listener::{DeclKind, Event, EventKind},
    node::{Node, NodeKind},
    property::{self, Slot, SlotKey},
    terms::{self, ArithOp, BitOp, CompareOp},
    token::TokenKind,
    value::{Callable, Closure, JsFunction, JsObject, Value},
};

/// Evaluates a whole program in the given (usually root-adjacent) scope and
/// returns the value of the last statement.
pub(crate) fn eval_program(program: &Rc<Node>, scope: &ScopeRef) -> Value {
    eval_statements(&program.children, scope)
}

fn eval_statements(statements: &[Rc<Node>], scope: &ScopeRef) -> Value {
    let mut last = Value::Undefined;
    for statement in statements {
        if scope.borrow().is_stopped() {
            break;
        }
        last = eval_node(statement, scope);
        // remember where an uncaught throw started, for the root wrapper
        let borrowed = scope.borrow();
        if borrowed.exit == Exit::Throw && borrowed.hooks.throw_loc.get().is_none() {
            borrowed.hooks.throw_loc.set(Some(statement.loc()));
        }
    }
    last
}

/// Evaluates one node. Statement and expression events fire around the
/// evaluation when a listener is installed.
pub(crate) fn eval_node(node: &Rc<Node>, scope: &ScopeRef) -> Value {
    let hooks = scope.borrow().hooks.clone();
    let observing = hooks.listener.borrow().is_some();
    if !observing {
        return eval_dispatch(node, scope);
    }
    let (enter, exit) = if is_statement(node.kind) {
        (EventKind::StatementEnter, EventKind::StatementExit)
    } else {
        (EventKind::ExpressionEnter, EventKind::ExpressionExit)
    };
    fire_event(&hooks, enter, node);
    let was_stopped = scope.borrow().is_stopped();
    let mut result = eval_dispatch(node, scope);
    // offer the error to the listener exactly once, at the node that raised it
    if !was_stopped && scope.borrow().exit == Exit::Throw && !hooks.throw_reported.get() {
        hooks.throw_reported.set(true);
        let error_value = scope.borrow().error_value.clone().unwrap_or(Value::Undefined);
        let event = make_event(exit, node);
        let recovery = hooks
            .listener
            .borrow_mut()
            .as_mut()
            .and_then(|l| l.on_error(&event, &HostValue::from_value(&error_value)));
        if let Some(recovery) = recovery {
            if recovery.ignore_error {
                scope.borrow_mut().reset();
                hooks.throw_reported.set(false);
                result = recovery.return_value.into_value();
            }
        }
    }
    fire_event(&hooks, exit, node);
    result
}

fn is_statement(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Program
            | NodeKind::Block
            | NodeKind::EmptyStmt
            | NodeKind::ExprStmt
            | NodeKind::VarStmt
            | NodeKind::IfStmt
            | NodeKind::ForStmt
            | NodeKind::ForInStmt
            | NodeKind::ForOfStmt
            | NodeKind::WhileStmt
            | NodeKind::DoWhileStmt
            | NodeKind::SwitchStmt
            | NodeKind::BreakStmt
            | NodeKind::ContinueStmt
            | NodeKind::ReturnStmt
            | NodeKind::ThrowStmt
            | NodeKind::TryStmt
            | NodeKind::FnDeclStmt
    )
}

fn make_event(kind: EventKind, node: &Node) -> Event {
    Event {
        kind,
        node: node.kind.into(),
        loc: node.loc(),
    }
}

fn fire_event(hooks: &Rc<EngineHooks>, kind: EventKind, node: &Node) {
    if let Some(listener) = hooks.listener.borrow_mut().as_mut() {
        listener.on_event(&make_event(kind, node));
    }
}

fn fire_context_event(scope: &ScopeRef, kind: EventKind, node: &Node) {
    let hooks = scope.borrow().hooks.clone();
    if hooks.listener.borrow().is_some() {
        fire_event(&hooks, kind, node);
    }
}

pub(crate) fn notify_variable_write(scope: &ScopeRef, kind: DeclKind, name: &str, value: &Value) {
    let hooks = scope.borrow().hooks.clone();
    let has_listener = hooks.listener.borrow().is_some();
    if has_listener {
        let host = HostValue::from_value(value);
        if let Some(listener) = hooks.listener.borrow_mut().as_mut() {
            listener.on_variable_write(kind, name, &host);
        }
    }
}

fn eval_dispatch(node: &Rc<Node>, scope: &ScopeRef) -> Value {
    match node.kind {
        NodeKind::Program => eval_program(node, scope),
        NodeKind::Block => eval_block(node, scope),
        NodeKind::EmptyStmt | NodeKind::Elision => Value::Undefined,
        NodeKind::ExprStmt => eval_node(&node.children[0], scope),
        NodeKind::ExprList => eval_expr_list(node, scope),
        NodeKind::VarStmt => eval_var_statement(node, scope),
        NodeKind::IfStmt => eval_if(node, scope),
        NodeKind::ForStmt => eval_for(node, scope),
        NodeKind::ForInStmt => eval_for_in_of(node, scope, true),
        NodeKind::ForOfStmt => eval_for_in_of(node, scope, false),
        NodeKind::WhileStmt => eval_while(node, scope),
        NodeKind::DoWhileStmt => eval_do_while(node, scope),
        NodeKind::SwitchStmt => eval_switch(node, scope),
        NodeKind::BreakStmt => {
            scope.borrow_mut().stop_break();
            Value::Undefined
        }
        NodeKind::ContinueStmt => {
            scope.borrow_mut().stop_continue();
            Value::Undefined
        }
        NodeKind::ReturnStmt => {
            let value = match node.children.first() {
                Some(expr) => eval_node(expr, scope),
                None => Value::Undefined,
            };
            if !scope.borrow().is_stopped() {
                scope.borrow_mut().stop_return(value);
            }
            Value::Undefined
        }
        NodeKind::ThrowStmt => {
            let value = eval_node(&node.children[0], scope);
            if !scope.borrow().is_stopped() {
                scope.borrow_mut().stop_throw(error::wrap_thrown(value));
            }
            Value::Undefined
        }
        NodeKind::TryStmt => eval_try(node, scope),
        NodeKind::FnDeclStmt => eval_fn_declaration(node, scope),

        NodeKind::Ref => eval_ref(node, scope),
        NodeKind::Lit => eval_literal(node, scope),
        NodeKind::TemplateLit => eval_template(node, scope),
        NodeKind::ArrayLit => eval_array_literal(node, scope),
        NodeKind::ObjectLit => eval_object_literal(node, scope),
        NodeKind::Paren => eval_node(&node.children[0], scope),
        NodeKind::FnExpr => eval_fn_expression(node, scope, false),
        NodeKind::ArrowFnExpr => eval_fn_expression(node, scope, true),
        NodeKind::RefDot | NodeKind::RefBracket => eval_chain(node, scope).0,
        NodeKind::FnCall => eval_fn_call(node, scope).0,
        NodeKind::NewExpr => eval_new(node, scope),
        NodeKind::UnaryExpr => eval_unary(node, scope),
        NodeKind::PostfixExpr => eval_postfix(node, scope),
        NodeKind::DeleteExpr => eval_delete(node, scope),
        NodeKind::AssignExpr => eval_assign(node, scope),
        NodeKind::TernaryExpr => {
            let cond = eval_node(&node.children[0], scope);
            if scope.borrow().is_stopped() {
                return Value::Undefined;
            }
            if terms::truthy(&cond) {
                eval_node(&node.children[1], scope)
            } else {
                eval_node(&node.children[2], scope)
            }
        }
        NodeKind::OrExpr => {
            let lhs = eval_node(&node.children[0], scope);
            if scope.borrow().is_stopped() {
                return Value::Undefined;
            }
            let nullish = node.children[1].is_token(TokenKind::QuestionQuestion);
            let take_lhs = if nullish { !lhs.is_nullish() } else { terms::truthy(&lhs) };
            if take_lhs { lhs } else { eval_node(&node.children[2], scope) }
        }
        NodeKind::AndExpr => {
            let lhs = eval_node(&node.children[0], scope);
            if scope.borrow().is_stopped() {
                return Value::Undefined;
            }
            if terms::truthy(&lhs) {
                eval_node(&node.children[2], scope)
            } else {
                lhs
            }
        }
        NodeKind::BitOrExpr
        | NodeKind::BitXorExpr
        | NodeKind::BitAndExpr
        | NodeKind::ShiftExpr
        | NodeKind::EqualityExpr
        | NodeKind::RelationalExpr
        | NodeKind::AdditiveExpr
        | NodeKind::MultiplicativeExpr
        | NodeKind::ExponentExpr => eval_binary(node, scope),

        NodeKind::Leaf
        | NodeKind::VarDecl
        | NodeKind::CaseClause
        | NodeKind::DefaultClause
        | NodeKind::CatchClause
        | NodeKind::FinallyClause
        | NodeKind::PropertyElem
        | NodeKind::SpreadElem
        | NodeKind::Params => {
            // structural nodes are consumed by their parents
            Value::Undefined
        }
    }
}

// === statements ===

fn eval_block(node: &Rc<Node>, scope: &ScopeRef) -> Value {
    let block_scope = Context::child(scope, ScopeKind::Block);
    fire_context_event(scope, EventKind::ContextEnter, node);
    let value = eval_statements(&node.children, &block_scope);
    scope.borrow_mut().update_from(&block_scope.borrow());
    fire_context_event(scope, EventKind::ContextExit, node);
    value
}

fn eval_expr_list(node: &Rc<Node>, scope: &ScopeRef) -> Value {
    let mut last = Value::Undefined;
    for expr in &node.children {
        if scope.borrow().is_stopped() {
            break;
        }
        last = eval_node(expr, scope);
    }
    last
}

fn decl_kind_of(node: &Node) -> DeclKind {
    match node.token_kind() {
        Some(TokenKind::Let) => DeclKind::Let,
        Some(TokenKind::Const) => DeclKind::Const,
        _ => DeclKind::Var,
    }
}

fn eval_var_statement(node: &Rc<Node>, scope: &ScopeRef) -> Value {
    let kind = decl_kind_of(node);
    for declarator in &node.children {
        if scope.borrow().is_stopped() {
            break;
        }
        let pattern = &declarator.children[0];
        let value = match declarator.children.get(1) {
            Some(init) => {
                let value = eval_node(init, scope);
                if scope.borrow().is_stopped() {
                    return Value::Undefined;
                }
                value
            }
            None => Value::Undefined,
        };
        bind_pattern(pattern, value, scope, BindMode::Declare(kind));
    }
    Value::Undefined
}

fn eval_if(node: &Rc<Node>, scope: &ScopeRef) -> Value {
    let cond = eval_node(&node.children[0], scope);
    if scope.borrow().is_stopped() {
        return Value::Undefined;
    }
    if terms::truthy(&cond) {
        eval_node(&node.children[1], scope)
    } else if let Some(else_branch) = node.children.get(2) {
        eval_node(else_branch, scope)
    } else {
        Value::Undefined
    }
}

/// Handles a loop body's outcome. Returns `false` when the loop must stop.
fn loop_continue(loop_scope: &ScopeRef, outer: &ScopeRef) -> bool {
    let exit = loop_scope.borrow().exit;
    match exit {
        Exit::None => true,
        Exit::Continue => {
            loop_scope.borrow_mut().reset();
            true
        }
        Exit::Break => {
            loop_scope.borrow_mut().reset();
            false
        }
        Exit::Return | Exit::Throw => {
            outer.borrow_mut().update_from(&loop_scope.borrow());
            false
        }
    }
}

fn bump_iteration(loop_scope: &ScopeRef) {
    let mut borrowed = loop_scope.borrow_mut();
    borrowed.iteration_index += 1;
}

fn eval_while(node: &Rc<Node>, scope: &ScopeRef) -> Value {
    let loop_scope = Context::child(scope, ScopeKind::Loop);
    loop {
        let cond = eval_node(&node.children[0], &loop_scope);
        if loop_scope.borrow().is_stopped() {
            scope.borrow_mut().update_from(&loop_scope.borrow());
            break;
        }
        if !terms::truthy(&cond) {
            break;
        }
        eval_node(&node.children[1], &loop_scope);
        if !loop_continue(&loop_scope, scope) {
            break;
        }
        bump_iteration(&loop_scope);
    }
    Value::Undefined
}

fn eval_do_while(node: &Rc<Node>, scope: &ScopeRef) -> Value {
    let loop_scope = Context::child(scope, ScopeKind::Loop);
    loop {
        eval_node(&node.children[0], &loop_scope);
        if !loop_continue(&loop_scope, scope) {
            break;
        }
        let cond = eval_node(&node.children[1], &loop_scope);
        if loop_scope.borrow().is_stopped() {
            scope.borrow_mut().update_from(&loop_scope.borrow());
            break;
        }
        if !terms::truthy(&cond) {
            break;
        }
        bump_iteration(&loop_scope);
    }
    Value::Undefined
}

fn eval_for(node: &Rc<Node>, scope: &ScopeRef) -> Value {
    let init = &node.children[0];
    let cond = &node.children[1];
    let incr = &node.children[2];
    let body = &node.children[3];
    let loop_scope = Context::child(scope, ScopeKind::Loop);
    // `let`/`const` in the init gets a fresh inner context per iteration so
    // closures created in the body capture that iteration's values
    let per_iteration = init.kind == NodeKind::VarStmt
        && matches!(init.token_kind(), Some(TokenKind::Let | TokenKind::Const));
    eval_node(init, &loop_scope);
    if loop_scope.borrow().is_stopped() {
        scope.borrow_mut().update_from(&loop_scope.borrow());
        return Value::Undefined;
    }
    loop {
        if cond.kind != NodeKind::EmptyStmt {
            let cond_value = eval_node(cond, &loop_scope);
            if loop_scope.borrow().is_stopped() {
                scope.borrow_mut().update_from(&loop_scope.borrow());
                break;
            }
            if !terms::truthy(&cond_value) {
                break;
            }
        }
        if per_iteration {
            let iter_scope = Context::child(&loop_scope, ScopeKind::Block);
            let snapshot = loop_scope.borrow().snapshot_bindings();
            let keys: Vec<String> = snapshot
                .as_ref()
                .map(|b| b.keys().cloned().collect())
                .unwrap_or_default();
            iter_scope.borrow_mut().restore_bindings(snapshot);
            eval_node(body, &iter_scope);
            // write the loop variables back so the increment clause and the
            // next iteration observe body mutations
            for key in keys {
                if let Some(value) = iter_scope.borrow().get_local(&key) {
                    loop_scope.borrow_mut().put(key, value);
                }
            }
            loop_scope.borrow_mut().update_from(&iter_scope.borrow());
        } else {
            eval_node(body, &loop_scope);
        }
        if !loop_continue(&loop_scope, scope) {
            break;
        }
        if incr.kind != NodeKind::EmptyStmt {
            eval_node(incr, &loop_scope);
            if loop_scope.borrow().is_stopped() {
                scope.borrow_mut().update_from(&loop_scope.borrow());
                break;
            }
        }
        bump_iteration(&loop_scope);
    }
    Value::Undefined
}

fn eval_for_in_of(node: &Rc<Node>, scope: &ScopeRef, keys: bool) -> Value {
    let target = &node.children[0];
    let iterable = eval_node(&node.children[1], scope);
    if scope.borrow().is_stopped() {
        return Value::Undefined;
    }
    let body = &node.children[2];
    let pairs = terms::iterate(&iterable);
    let loop_scope = Context::child(scope, ScopeKind::Loop);
    let declared = target.kind == NodeKind::VarStmt;
    let per_iteration = declared && matches!(target.token_kind(), Some(TokenKind::Let | TokenKind::Const));
    for (key, value) in pairs {
        let bound = if keys { key } else { value };
        let iter_scope = if per_iteration {
            // rebind per iteration: closures over the loop variable see this
            // pass's value
            let iter_scope = Context::child(&loop_scope, ScopeKind::Block);
            iter_scope
                .borrow_mut()
                .restore_bindings(loop_scope.borrow().snapshot_bindings());
            iter_scope
        } else {
            loop_scope.clone()
        };
        if declared {
            let kind = decl_kind_of(target);
            let pattern = &target.children[0].children[0];
            bind_pattern(pattern, bound, &iter_scope, BindMode::Declare(kind));
        } else {
            bind_pattern(target, bound, &iter_scope, BindMode::Assign);
        }
        if iter_scope.borrow().is_stopped() {
            scope.borrow_mut().update_from(&iter_scope.borrow());
            return Value::Undefined;
        }
        eval_node(body, &iter_scope);
        if per_iteration {
            loop_scope.borrow_mut().update_from(&iter_scope.borrow());
        }
        if !loop_continue(&loop_scope, scope) {
            break;
        }
        bump_iteration(&loop_scope);
    }
    Value::Undefined
}

fn eval_switch(node: &Rc<Node>, scope: &ScopeRef) -> Value {
    let selector = eval_node(&node.children[0], scope);
    if scope.borrow().is_stopped() {
        return Value::Undefined;
    }
    let clauses = &node.children[1..];
    let switch_scope = Context::child(scope, ScopeKind::Block);
    // find the matching clause: cases in order, default only as fallback
    let mut start = None;
    for (i, clause) in clauses.iter().enumerate() {
        if clause.kind != NodeKind::CaseClause {
            continue;
        }
        let test = eval_node(&clause.children[0], &switch_scope);
        if switch_scope.borrow().is_stopped() {
            scope.borrow_mut().update_from(&switch_scope.borrow());
            return Value::Undefined;
        }
        if terms::eq_strict(&selector, &test) {
            start = Some(i);
            break;
        }
    }
    let start = start.or_else(|| clauses.iter().position(|c| c.kind == NodeKind::DefaultClause));
    let Some(start) = start else {
        return Value::Undefined;
    };
    // fall through from the matched clause until a break (or other exit)
    'clauses: for clause in &clauses[start..] {
        let statements = if clause.kind == NodeKind::CaseClause {
            &clause.children[1..]
        } else {
            &clause.children[..]
        };
        for statement in statements {
            eval_node(statement, &switch_scope);
            let exit = switch_scope.borrow().exit;
            match exit {
                Exit::None => {}
                Exit::Break => {
                    switch_scope.borrow_mut().reset();
                    break 'clauses;
                }
                _ => {
                    scope.borrow_mut().update_from(&switch_scope.borrow());
                    break 'clauses;
                }
            }
        }
    }
    Value::Undefined
}

fn eval_try(node: &Rc<Node>, scope: &ScopeRef) -> Value {
    let try_block = &node.children[0];
    let catch_clause = node.children.iter().find(|c| c.kind == NodeKind::CatchClause);
    let finally_clause = node.children.iter().find(|c| c.kind == NodeKind::FinallyClause);

    let try_scope = Context::child(scope, ScopeKind::Block);
    let mut value = eval_statements(&try_block.children, &try_scope);

    let hooks = scope.borrow().hooks.clone();
    if try_scope.borrow().exit == Exit::Throw {
        hooks.throw_reported.set(false);
        if let Some(catch_clause) = catch_clause {
            let error_value = try_scope.borrow().error_value.clone().unwrap_or(Value::Undefined);
            try_scope.borrow_mut().reset();
            let catch_scope = Context::child(scope, ScopeKind::Catch);
            let block = catch_clause.children.last().expect("catch block");
            if catch_clause.children.len() == 2 {
                let name = catch_clause.children[0].token_text().to_owned();
                catch_scope.borrow_mut().put(name, error::wrap_thrown(error_value));
            }
            value = eval_statements(&block.children, &catch_scope);
            scope.borrow_mut().update_from(&catch_scope.borrow());
        } else {
            value = Value::Undefined;
            scope.borrow_mut().update_from(&try_scope.borrow());
        }
    } else {
        scope.borrow_mut().update_from(&try_scope.borrow());
    }

    if let Some(finally_clause) = finally_clause {
        let finally_scope = Context::child(scope, ScopeKind::Block);
        eval_statements(&finally_clause.children[0].children, &finally_scope);
        if finally_scope.borrow().is_stopped() {
            // an exit in finally replaces any in-flight exit
            hooks.throw_reported.set(false);
            scope.borrow_mut().reset();
            scope.borrow_mut().update_from(&finally_scope.borrow());
        }
    }
    value
}

fn closure_value(name: String, params: Rc<Node>, body: Rc<Node>, scope: &ScopeRef, is_arrow: bool) -> Value {
    Value::Function(Rc::new(JsFunction {
        callable: Callable::Closure(Closure {
            name,
            params,
            body,
            scope: scope.clone(),
            is_arrow,
        }),
    }))
}

fn eval_fn_declaration(node: &Rc<Node>, scope: &ScopeRef) -> Value {
    let name = node.children[0].token_text().to_owned();
    let function = closure_value(
        name.clone(),
        node.children[1].clone(),
        node.children[2].clone(),
        scope,
        false,
    );
    scope.borrow_mut().put(name, function);
    Value::Undefined
}

fn eval_fn_expression(node: &Rc<Node>, scope: &ScopeRef, is_arrow: bool) -> Value {
    if is_arrow {
        closure_value(
            String::new(),
            node.children[0].clone(),
            node.children[1].clone(),
            scope,
            true,
        )
    } else {
        let (name, params, body) = if node.children.len() == 3 {
            (
                node.children[0].token_text().to_owned(),
                node.children[1].clone(),
                node.children[2].clone(),
            )
        } else {
            (String::new(), node.children[0].clone(), node.children[1].clone())
        };
        // a named function expression can call itself: the activation binds
        // the name, see `call_closure`
        closure_value(name, params, body, scope, false)
    }
}

// === expressions ===

fn eval_ref(node: &Rc<Node>, scope: &ScopeRef) -> Value {
    let name = node.token_text();
    if name == "this" {
        return this_of(scope);
    }
    property::slot_get(scope, &Slot::Binding(name.to_owned()))
}

fn eval_literal(node: &Rc<Node>, scope: &ScopeRef) -> Value {
    let token = node.token.as_ref().expect("literal token");
    match token.kind {
        TokenKind::Number => Value::number(terms::parse_number_literal(&token.text)),
        TokenKind::SString | TokenKind::DString => Value::String(terms::cook_string_literal(&token.text)),
        TokenKind::Regex => builtins::regexp::from_literal(scope, &token.text).unwrap_or(Value::Undefined),
        TokenKind::True => Value::Bool(true),
        TokenKind::False => Value::Bool(false),
        TokenKind::Null => Value::Null,
        _ => Value::Undefined,
    }
}

fn eval_template(node: &Rc<Node>, scope: &ScopeRef) -> Value {
    let mut out = String::new();
    let last = node.children.len() - 1;
    for (i, child) in node.children.iter().enumerate() {
        if child.kind == NodeKind::Leaf {
            out.push_str(&terms::cook_template_chunk(child.token_text(), i == 0, i == last));
        } else {
            let value = eval_node(child, scope);
            if scope.borrow().is_stopped() {
                return Value::Undefined;
            }
            if value.is_undefined() {
                error::throw(scope, &format!("{} is not defined", child.source_text()));
                return Value::Undefined;
            }
            out.push_str(&terms::to_display_string(&value));
        }
    }
    Value::str(out)
}

fn eval_array_literal(node: &Rc<Node>, scope: &ScopeRef) -> Value {
    let mut elements = Vec::new();
    for child in &node.children {
        match child.kind {
            NodeKind::Elision => elements.push(Value::Null),
            NodeKind::SpreadElem => {
                let source = eval_node(&child.children[0], scope);
                if scope.borrow().is_stopped() {
                    return Value::Undefined;
                }
                elements.extend(terms::iterate(&source).into_iter().map(|(_, v)| v));
            }
            _ => {
                let value = eval_node(child, scope);
                if scope.borrow().is_stopped() {
                    return Value::Undefined;
                }
                elements.push(value);
            }
        }
    }
    Value::new_array(elements)
}

/// Evaluates a property key node into its string form.
fn property_key(node: &Rc<Node>, scope: &ScopeRef) -> Option<String> {
    // computed keys carry the `[` marker token
    if node.token_kind() == Some(TokenKind::LBracket) {
        let value = eval_node(&node.children[0], scope);
        if scope.borrow().is_stopped() {
            return None;
        }
        return Some(terms::to_property_key(&value));
    }
    let key = node.children.first().expect("property key");
    let token = key.token.as_ref().expect("property key token");
    let name = match token.kind {
        TokenKind::SString | TokenKind::DString => terms::cook_string_literal(&token.text).to_string(),
        TokenKind::Number => terms::to_display_string(&Value::number(terms::parse_number_literal(&token.text))),
        _ => token.text.clone(),
    };
    Some(name)
}

fn eval_object_literal(node: &Rc<Node>, scope: &ScopeRef) -> Value {
    let mut object = JsObject::new();
    for element in &node.children {
        match element.kind {
            NodeKind::SpreadElem => {
                let source = eval_node(&element.children[0], scope);
                if scope.borrow().is_stopped() {
                    return Value::Undefined;
                }
                for (key, value) in terms::iterate(&source) {
                    object.entries.insert(terms::to_property_key(&key), value);
                }
            }
            NodeKind::PropertyElem => {
                let Some(key) = property_key(element, scope) else {
                    return Value::Undefined;
                };
                let value = match element.children.get(1) {
                    Some(value_node) => {
                        let value = eval_node(value_node, scope);
                        if scope.borrow().is_stopped() {
                            return Value::Undefined;
                        }
                        value
                    }
                    // shorthand `{x}` reads the binding
                    None => {
                        let value = property::slot_get(scope, &Slot::Binding(key.clone()));
                        if scope.borrow().is_stopped() {
                            return Value::Undefined;
                        }
                        value
                    }
                };
                object.entries.insert(key, value);
            }
            _ => {}
        }
    }
    Value::new_object(object)
}

/// Evaluates a member-expression chain, threading the optional-chaining
/// short-circuit flag. Returns `(value, short_circuited)`.
fn eval_chain(node: &Rc<Node>, scope: &ScopeRef) -> (Value, bool) {
    match node.kind {
        NodeKind::RefDot => {
            let (receiver, short) = eval_chain(&node.children[0], scope);
            if short || scope.borrow().is_stopped() {
                return (Value::Undefined, true);
            }
            let optional = node.token_kind() == Some(TokenKind::QuestionDot);
            if optional && receiver.is_nullish() {
                return (Value::Undefined, true);
            }
            let key = SlotKey::Name(node.children[1].token_text().to_owned());
            (property::get_property(scope, &receiver, &key, optional, false), false)
        }
        NodeKind::RefBracket => {
            let (receiver, short) = eval_chain(&node.children[0], scope);
            if short || scope.borrow().is_stopped() {
                return (Value::Undefined, true);
            }
            let optional = node.token_kind() == Some(TokenKind::QuestionDot);
            if optional && receiver.is_nullish() {
                return (Value::Undefined, true);
            }
            let index = eval_node(&node.children[1], scope);
            if scope.borrow().is_stopped() {
                return (Value::Undefined, true);
            }
            let key = SlotKey::Index(index);
            (property::get_property(scope, &receiver, &key, optional, false), false)
        }
        NodeKind::FnCall => eval_fn_call(node, scope),
        _ => (eval_node(node, scope), false),
    }
}

fn eval_spreadable_args(nodes: &[Rc<Node>], scope: &ScopeRef) -> Option<Vec<Value>> {
    let mut args = Vec::new();
    for node in nodes {
        if node.kind == NodeKind::SpreadElem {
            let source = eval_node(&node.children[0], scope);
            if scope.borrow().is_stopped() {
                return None;
            }
            args.extend(terms::iterate(&source).into_iter().map(|(_, v)| v));
        } else {
            let value = eval_node(node, scope);
            if scope.borrow().is_stopped() {
                return None;
            }
            args.push(value);
        }
    }
    Some(args)
}

fn eval_fn_call(node: &Rc<Node>, scope: &ScopeRef) -> (Value, bool) {
    let callee_node = &node.children[0];
    // resolve callee and receiver; method calls bind `this` to the receiver
    let (callee, this_value, short) = match callee_node.kind {
        NodeKind::RefDot => {
            let (receiver, short) = eval_chain(&callee_node.children[0], scope);
            if short || scope.borrow().is_stopped() {
                (Value::Undefined, Value::Undefined, true)
            } else {
                let optional = callee_node.token_kind() == Some(TokenKind::QuestionDot);
                if optional && receiver.is_nullish() {
                    (Value::Undefined, Value::Undefined, true)
                } else {
                    let key = SlotKey::Name(callee_node.children[1].token_text().to_owned());
                    let callee = property::get_property(scope, &receiver, &key, optional, true);
                    (callee, receiver, false)
                }
            }
        }
        NodeKind::RefBracket => {
            let (receiver, short) = eval_chain(&callee_node.children[0], scope);
            if short || scope.borrow().is_stopped() {
                (Value::Undefined, Value::Undefined, true)
            } else {
                let optional = callee_node.token_kind() == Some(TokenKind::QuestionDot);
                if optional && receiver.is_nullish() {
                    (Value::Undefined, Value::Undefined, true)
                } else {
                    let index = eval_node(&callee_node.children[1], scope);
                    if scope.borrow().is_stopped() {
                        (Value::Undefined, Value::Undefined, true)
                    } else {
                        let key = SlotKey::Index(index);
                        let callee = property::get_property(scope, &receiver, &key, optional, true);
                        (callee, receiver, false)
                    }
                }
            }
        }
        _ => {
            let (callee, short) = eval_chain(callee_node, scope);
            (callee, Value::Undefined, short)
        }
    };
    if short {
        return (Value::Undefined, true);
    }
    if scope.borrow().is_stopped() {
        return (Value::Undefined, true);
    }
    let optional_call = node.token_kind() == Some(TokenKind::QuestionDot);
    if optional_call && callee.is_nullish() {
        return (Value::Undefined, true);
    }
    let Some(args) = eval_spreadable_args(&node.children[1..], scope) else {
        return (Value::Undefined, true);
    };
    let description = callee_node.source_text();
    (call_value(scope, &callee, &this_value, &args, &description), false)
}

struct DepthGuard {
    hooks: Rc<EngineHooks>,
}

impl DepthGuard {
    fn enter(scope: &ScopeRef) -> Option<Self> {
        let hooks = scope.borrow().hooks.clone();
        let depth = hooks.call_depth.get();
        if depth >= MAX_CALL_DEPTH {
            error::throw_range(scope, "Maximum call stack size exceeded");
            return None;
        }
        hooks.call_depth.set(depth + 1);
        Some(Self { hooks })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        self.hooks.call_depth.set(self.hooks.call_depth.get() - 1);
    }
}

/// Invokes any callable value. `description` feeds the
/// "<expr> is not a function" error.
pub(crate) fn call_value(scope: &ScopeRef, callee: &Value, this: &Value, args: &[Value], description: &str) -> Value {
    let Value::Function(function) = callee else {
        error::throw_type(scope, &format!("{description} is not a function"));
        return Value::Undefined;
    };
    let Some(_guard) = DepthGuard::enter(scope) else {
        return Value::Undefined;
    };
    notify_function_call(scope, description, args);
    match &function.callable {
        Callable::Native(native) => {
            let receiver = native.bound_this.clone().unwrap_or_else(|| this.clone());
            (native.func)(scope, &receiver, args)
        }
        Callable::Ctor(ctor) => builtins::ctor_call(scope, *ctor, args, false),
        Callable::HostMethod { handle, name } => call_host_method(scope, handle, name, args),
        Callable::Closure(closure) => call_closure(scope, callee, closure, this, args),
    }
}

fn notify_function_call(scope: &ScopeRef, name: &str, args: &[Value]) {
    let hooks = scope.borrow().hooks.clone();
    let has_listener = hooks.listener.borrow().is_some();
    if has_listener {
        let host_args: Vec<HostValue> = args.iter().map(HostValue::from_value).collect();
        if let Some(listener) = hooks.listener.borrow_mut().as_mut() {
            listener.on_function_call(name, &host_args);
        }
    }
}

fn call_host_method(scope: &ScopeRef, handle: &MirrorHandle, name: &str, args: &[Value]) -> Value {
    let hooks = scope.borrow().hooks.clone();
    let mut bridge = hooks.bridge.borrow_mut();
    let Some(bridge) = bridge.as_mut() else {
        error::throw_type(scope, "host bridge is not enabled");
        return Value::Undefined;
    };
    let host_args: Vec<HostValue> = args.iter().map(HostValue::from_value).collect();
    let result = match handle {
        MirrorHandle::Class(class) => bridge.invoke_static(class, name, &host_args),
        MirrorHandle::Object(object) => bridge.invoke(object, name, &host_args),
    };
    drop(bridge);
    match result {
        Ok(value) => value.into_value(),
        Err(message) => {
            error::throw_type(scope, &message);
            Value::Undefined
        }
    }
}

/// Calls a user closure: builds a function-scoped context chained to the
/// declaring environment, binds parameters, runs the body, and consumes the
/// `Return` exit flag.
fn call_closure(scope: &ScopeRef, callee: &Value, closure: &Closure, this: &Value, args: &[Value]) -> Value {
    let this_value = if closure.is_arrow { None } else { Some(this.clone()) };
    let fn_scope = Context::function(&closure.scope, this_value);
    fire_context_event(&fn_scope, EventKind::ContextEnter, &closure.body);
    if !closure.name.is_empty() {
        // a named function expression can recurse by its own name
        fn_scope.borrow_mut().put(closure.name.clone(), callee.clone());
    }
    bind_parameters(&closure.params, args, &fn_scope);
    if fn_scope.borrow().is_stopped() {
        let result = propagate_call_exit(scope, &fn_scope);
        fire_context_event(&fn_scope, EventKind::ContextExit, &closure.body);
        return result;
    }
    if closure.body.kind == NodeKind::Block {
        eval_statements(&closure.body.children, &fn_scope);
    } else {
        // concise arrow body: the expression value is the return value
        let value = eval_node(&closure.body, &fn_scope);
        if !fn_scope.borrow().is_stopped() {
            fn_scope.borrow_mut().stop_return(value);
        }
    }
    let result = propagate_call_exit(scope, &fn_scope);
    fire_context_event(&fn_scope, EventKind::ContextExit, &closure.body);
    result
}

/// Consumes `Return` at the function boundary; rethrows `Throw` into the
/// caller. `Break`/`Continue` cannot cross a function boundary.
fn propagate_call_exit(scope: &ScopeRef, fn_scope: &ScopeRef) -> Value {
    let exit = fn_scope.borrow().exit;
    match exit {
        Exit::Return => fn_scope.borrow().return_value.clone().unwrap_or(Value::Undefined),
        Exit::Throw => {
            let error_value = fn_scope.borrow().error_value.clone().unwrap_or(Value::Undefined);
            scope.borrow_mut().stop_throw(error_value);
            Value::Undefined
        }
        _ => Value::Undefined,
    }
}

fn bind_parameters(params: &Rc<Node>, args: &[Value], fn_scope: &ScopeRef) {
    let mut position = 0usize;
    for param in &params.children {
        match param.kind {
            NodeKind::SpreadElem => {
                let rest: Vec<Value> = args.get(position..).unwrap_or(&[]).to_vec();
                bind_pattern(
                    &param.children[0],
                    Value::new_array(rest),
                    fn_scope,
                    BindMode::Declare(DeclKind::Let),
                );
                return;
            }
            NodeKind::AssignExpr => {
                let mut value = args.get(position).cloned().unwrap_or(Value::Undefined);
                if value.is_undefined() {
                    value = eval_node(&param.children[2], fn_scope);
                    if fn_scope.borrow().is_stopped() {
                        return;
                    }
                }
                bind_pattern(&param.children[0], value, fn_scope, BindMode::Declare(DeclKind::Let));
            }
            _ => {
                let value = args.get(position).cloned().unwrap_or(Value::Undefined);
                bind_pattern(param, value, fn_scope, BindMode::Declare(DeclKind::Let));
            }
        }
        position += 1;
    }
}

fn eval_new(node: &Rc<Node>, scope: &ScopeRef) -> Value {
    let callee = eval_node(&node.children[0], scope);
    if scope.borrow().is_stopped() {
        return Value::Undefined;
    }
    let Some(args) = eval_spreadable_args(&node.children[1..], scope) else {
        return Value::Undefined;
    };
    let description = node.children[0].source_text();
    match &callee {
        Value::Function(function) => match &function.callable {
            Callable::Ctor(ctor) => builtins::ctor_call(scope, *ctor, &args, true),
            Callable::Closure(_) => {
                // the constructed receiver remembers its constructor for
                // `instanceof`
                let mut this_object = JsObject::new();
                this_object.constructor = Some(callee.clone());
                let this_value = Value::new_object(this_object);
                let result = call_value(scope, &callee, &this_value, &args, &description);
                if scope.borrow().is_stopped() {
                    return Value::Undefined;
                }
                // a constructor returning an object supplies the result;
                // otherwise the callable itself stands in
                if result.is_object_like() { result } else { callee.clone() }
            }
            _ => {
                error::throw_type(scope, &format!("{description} is not a constructor"));
                Value::Undefined
            }
        },
        Value::Mirror(MirrorHandle::Class(class)) => {
            let hooks = scope.borrow().hooks.clone();
            let mut bridge = hooks.bridge.borrow_mut();
            let Some(bridge) = bridge.as_mut() else {
                error::throw_type(scope, "host bridge is not enabled");
                return Value::Undefined;
            };
            let host_args: Vec<HostValue> = args.iter().map(HostValue::from_value).collect();
            match bridge.construct(class, &host_args) {
                Ok(object) => Value::Mirror(MirrorHandle::Object(object)),
                Err(message) => {
                    drop(bridge);
                    error::throw_type(scope, &message);
                    Value::Undefined
                }
            }
        }
        _ => {
            error::throw_type(scope, &format!("{description} is not a constructor"));
            Value::Undefined
        }
    }
}

fn eval_unary(node: &Rc<Node>, scope: &ScopeRef) -> Value {
    let op = node.children[0].token_kind().expect("unary operator");
    let operand = &node.children[1];
    if op == TokenKind::Typeof {
        // `typeof` never throws on unbound names
        if operand.kind == NodeKind::Ref {
            let name = operand.token_text();
            if name != "this" && !crate::context::has(scope, name) {
                // an unbound name may still resolve as a host class
                if let Some(mirror) = property::lookup_host_class(scope, name) {
                    return Value::str(mirror.type_of());
                }
                return Value::str("undefined");
            }
        }
        let value = eval_node(operand, scope);
        if scope.borrow().is_stopped() {
            return Value::Undefined;
        }
        return Value::str(value.type_of());
    }
    if matches!(op, TokenKind::PlusPlus | TokenKind::MinusMinus) {
        return eval_incr_decr(operand, scope, op == TokenKind::PlusPlus, true);
    }
    let value = eval_node(operand, scope);
    if scope.borrow().is_stopped() {
        return Value::Undefined;
    }
    match op {
        TokenKind::Bang => Value::Bool(!terms::truthy(&value)),
        TokenKind::Tilde => Value::number(f64::from(!terms::to_int32(terms::to_number(&value)))),
        TokenKind::Plus => Value::number(terms::to_number(&value)),
        TokenKind::Minus => Value::number(-terms::to_number(&value)),
        _ => Value::Undefined,
    }
}

fn eval_postfix(node: &Rc<Node>, scope: &ScopeRef) -> Value {
    let op = node.children[1].token_kind().expect("postfix operator");
    eval_incr_decr(&node.children[0], scope, op == TokenKind::PlusPlus, false)
}

fn eval_incr_decr(target: &Rc<Node>, scope: &ScopeRef, increment: bool, prefix: bool) -> Value {
    let Some(slot) = resolve_slot(target, scope) else {
        return Value::Undefined;
    };
    let old = property::slot_get(scope, &slot);
    if scope.borrow().is_stopped() {
        return Value::Undefined;
    }
    let old_number = terms::to_number(&old);
    let new_number = if increment { old_number + 1.0 } else { old_number - 1.0 };
    property::slot_set(scope, &slot, Value::number(new_number));
    if scope.borrow().is_stopped() {
        return Value::Undefined;
    }
    if prefix {
        Value::number(new_number)
    } else {
        Value::number(old_number)
    }
}

fn eval_delete(node: &Rc<Node>, scope: &ScopeRef) -> Value {
    let target = &node.children[0];
    match target.kind {
        NodeKind::RefDot | NodeKind::RefBracket => {
            let Some(slot) = resolve_slot(target, scope) else {
                return Value::Undefined;
            };
            match slot {
                Slot::Property { receiver, key } => property::delete_property(&receiver, &key),
                _ => Value::Bool(true),
            }
        }
        NodeKind::Ref => {
            // removes the binding from the context that defines it
            let name = target.token_text().to_owned();
            let mut current = scope.clone();
            loop {
                if current.borrow().has_local(&name) {
                    current.borrow_mut().remove(&name);
                    break;
                }
                let parent = current.borrow().parent.clone();
                match parent {
                    Some(p) => current = p,
                    None => break,
                }
            }
            Value::Bool(true)
        }
        _ => {
            eval_node(target, scope);
            Value::Bool(true)
        }
    }
}

/// Resolves a reference node into an assignable slot, evaluating the
/// receiver (and computed key) eagerly. `None` means evaluation stopped.
fn resolve_slot(node: &Rc<Node>, scope: &ScopeRef) -> Option<Slot> {
    match node.kind {
        NodeKind::Ref => Some(Slot::Binding(node.token_text().to_owned())),
        NodeKind::Paren => resolve_slot(&node.children[0], scope),
        NodeKind::RefDot => {
            let (receiver, short) = eval_chain(&node.children[0], scope);
            if scope.borrow().is_stopped() {
                return None;
            }
            if short || (node.token_kind() == Some(TokenKind::QuestionDot) && receiver.is_nullish()) {
                return Some(Slot::ShortCircuited);
            }
            Some(Slot::Property {
                receiver,
                key: SlotKey::Name(node.children[1].token_text().to_owned()),
            })
        }
        NodeKind::RefBracket => {
            let (receiver, short) = eval_chain(&node.children[0], scope);
            if scope.borrow().is_stopped() {
                return None;
            }
            if short || (node.token_kind() == Some(TokenKind::QuestionDot) && receiver.is_nullish()) {
                return Some(Slot::ShortCircuited);
            }
            let index = eval_node(&node.children[1], scope);
            if scope.borrow().is_stopped() {
                return None;
            }
            Some(Slot::Property {
                receiver,
                key: SlotKey::Index(index),
            })
        }
        _ => {
            error::throw_type(scope, "invalid assignment target");
            None
        }
    }
}

fn eval_assign(node: &Rc<Node>, scope: &ScopeRef) -> Value {
    let lhs = &node.children[0];
    let op = node.children[1].token_kind().expect("assignment operator");
    let rhs = &node.children[2];

    // destructuring assignment
    if op == TokenKind::Assign && matches!(lhs.kind, NodeKind::ArrayLit | NodeKind::ObjectLit) {
        let value = eval_node(rhs, scope);
        if scope.borrow().is_stopped() {
            return Value::Undefined;
        }
        bind_pattern(lhs, value.clone(), scope, BindMode::Assign);
        return value;
    }

    let Some(slot) = resolve_slot(lhs, scope) else {
        return Value::Undefined;
    };
    let value = if op == TokenKind::Assign {
        let value = eval_node(rhs, scope);
        if scope.borrow().is_stopped() {
            return Value::Undefined;
        }
        value
    } else {
        let old = property::slot_get(scope, &slot);
        if scope.borrow().is_stopped() {
            return Value::Undefined;
        }
        let rhs_value = eval_node(rhs, scope);
        if scope.borrow().is_stopped() {
            return Value::Undefined;
        }
        match op {
            TokenKind::PlusAssign => terms::add(&old, &rhs_value),
            TokenKind::MinusAssign => terms::arith(ArithOp::Sub, &old, &rhs_value),
            TokenKind::StarAssign => terms::arith(ArithOp::Mul, &old, &rhs_value),
            TokenKind::SlashAssign => terms::arith(ArithOp::Div, &old, &rhs_value),
            TokenKind::PercentAssign => terms::arith(ArithOp::Rem, &old, &rhs_value),
            TokenKind::StarStarAssign => terms::arith(ArithOp::Pow, &old, &rhs_value),
            TokenKind::LtLtAssign => terms::bitwise(BitOp::Shl, &old, &rhs_value),
            TokenKind::GtGtAssign => terms::bitwise(BitOp::Shr, &old, &rhs_value),
            TokenKind::GtGtGtAssign => terms::bitwise(BitOp::UShr, &old, &rhs_value),
            _ => Value::Undefined,
        }
    };
    property::slot_set(scope, &slot, value.clone());
    if scope.borrow().is_stopped() {
        return Value::Undefined;
    }
    value
}

fn eval_binary(node: &Rc<Node>, scope: &ScopeRef) -> Value {
    let lhs = eval_node(&node.children[0], scope);
    if scope.borrow().is_stopped() {
        return Value::Undefined;
    }
    let op = node.children[1].token_kind().expect("binary operator");
    let rhs = eval_node(&node.children[2], scope);
    if scope.borrow().is_stopped() {
        return Value::Undefined;
    }
    match op {
        TokenKind::Pipe => terms::bitwise(BitOp::Or, &lhs, &rhs),
        TokenKind::Caret => terms::bitwise(BitOp::Xor, &lhs, &rhs),
        TokenKind::Amp => terms::bitwise(BitOp::And, &lhs, &rhs),
        TokenKind::LtLt => terms::bitwise(BitOp::Shl, &lhs, &rhs),
        TokenKind::GtGt => terms::bitwise(BitOp::Shr, &lhs, &rhs),
        TokenKind::GtGtGt => terms::bitwise(BitOp::UShr, &lhs, &rhs),
        TokenKind::EqEq => Value::Bool(terms::eq_loose(&lhs, &rhs)),
        TokenKind::NotEq => Value::Bool(!terms::eq_loose(&lhs, &rhs)),
        TokenKind::EqEqEq => Value::Bool(terms::eq_strict(&lhs, &rhs)),
        TokenKind::NotEqEq => Value::Bool(!terms::eq_strict(&lhs, &rhs)),
        TokenKind::Lt => Value::Bool(terms::compare(CompareOp::Lt, &lhs, &rhs)),
        TokenKind::LtEq => Value::Bool(terms::compare(CompareOp::LtEq, &lhs, &rhs)),
        TokenKind::Gt => Value::Bool(terms::compare(CompareOp::Gt, &lhs, &rhs)),
        TokenKind::GtEq => Value::Bool(terms::compare(CompareOp::GtEq, &lhs, &rhs)),
        TokenKind::Instanceof => Value::Bool(instance_of(&lhs, &rhs)),
        TokenKind::In => Value::Bool(key_in(&lhs, &rhs)),
        TokenKind::Plus => terms::add(&lhs, &rhs),
        TokenKind::Minus => terms::arith(ArithOp::Sub, &lhs, &rhs),
        TokenKind::Star => terms::arith(ArithOp::Mul, &lhs, &rhs),
        TokenKind::Slash => terms::arith(ArithOp::Div, &lhs, &rhs),
        TokenKind::Percent => terms::arith(ArithOp::Rem, &lhs, &rhs),
        TokenKind::StarStar => terms::arith(ArithOp::Pow, &lhs, &rhs),
        _ => Value::Undefined,
    }
}

/// `instanceof`: the left side's constructor must be the same reference as
/// the right side. Builtin containers know their constructor implicitly.
fn instance_of(left: &Value, right: &Value) -> bool {
    let Value::Function(function) = right else {
        return false;
    };
    if let Callable::Ctor(ctor) = &function.callable {
        return match (left, ctor) {
            (Value::Array(_), BuiltinCtor::Array) => true,
            (Value::Date(_), BuiltinCtor::Date) => true,
            (Value::Regex(_), BuiltinCtor::RegExp) => true,
            (Value::Object(object), BuiltinCtor::Object) => object.borrow().constructor.is_none(),
            (Value::Object(object), BuiltinCtor::Error) => {
                // TypeError instances also answer to Error
                matches!(
                    object.borrow().constructor.as_ref().map(constructor_ctor),
                    Some(Some(BuiltinCtor::Error | BuiltinCtor::TypeError))
                )
            }
            (Value::Object(object), _) => {
                object.borrow().constructor.as_ref().map(constructor_ctor) == Some(Some(*ctor))
            }
            _ => false,
        };
    }
    match left {
        Value::Object(object) => object
            .borrow()
            .constructor
            .as_ref()
            .is_some_and(|c| c.same_identity(right)),
        _ => false,
    }
}

fn constructor_ctor(constructor: &Value) -> Option<BuiltinCtor> {
    match constructor {
        Value::Function(function) => match &function.callable {
            Callable::Ctor(ctor) => Some(*ctor),
            _ => None,
        },
        _ => None,
    }
}

fn key_in(key: &Value, container: &Value) -> bool {
    match container {
        Value::Object(object) => object.borrow().entries.contains_key(&terms::to_property_key(key)),
        Value::Array(elements) => {
            let key = SlotKey::Index(key.clone());
            key.as_index().is_some_and(|i| i < elements.borrow().len())
        }
        _ => false,
    }
}

// === binding / destructuring ===

#[derive(Debug, Clone, Copy)]
pub(crate) enum BindMode {
    /// `var`/`let`/`const` declarations. `var` binds in the nearest function
    /// (or global) context; `let`/`const` bind locally.
    Declare(DeclKind),
    /// Plain assignment through the context chain.
    Assign,
}

/// The context a `var` declaration lands in: nearest function or global.
fn var_target(scope: &ScopeRef) -> ScopeRef {
    let mut current = scope.clone();
    loop {
        let (kind, parent) = {
            let borrowed = current.borrow();
            (borrowed.kind, borrowed.parent.clone())
        };
        if matches!(kind, ScopeKind::Function | ScopeKind::Global) {
            return current;
        }
        match parent {
            Some(p) => current = p,
            None => return current,
        }
    }
}

fn bind_name(name: &str, value: Value, scope: &ScopeRef, mode: BindMode) {
    match mode {
        BindMode::Declare(kind) => {
            let target = if kind == DeclKind::Var { var_target(scope) } else { scope.clone() };
            target.borrow_mut().put(name.to_owned(), value.clone());
            notify_variable_write(scope, kind, name, &value);
        }
        BindMode::Assign => {
            property::slot_set(scope, &Slot::Binding(name.to_owned()), value);
        }
    }
}

/// Binds a declaration/assignment pattern: a plain name, an array pattern,
/// or an object pattern, with defaults, renames, and rest collection.
pub(crate) fn bind_pattern(pattern: &Rc<Node>, value: Value, scope: &ScopeRef, mode: BindMode) {
    match pattern.kind {
        NodeKind::Ref => bind_name(pattern.token_text(), value, scope, mode),
        NodeKind::ArrayLit => bind_array_pattern(pattern, &value, scope, mode),
        NodeKind::ObjectLit => bind_object_pattern(pattern, &value, scope, mode),
        NodeKind::RefDot | NodeKind::RefBracket => {
            // assignment-style destructuring may target properties
            if let Some(slot) = resolve_slot(pattern, scope) {
                property::slot_set(scope, &slot, value);
            }
        }
        _ => error::throw_type(scope, "invalid binding pattern"),
    }
}

fn bind_array_pattern(pattern: &Rc<Node>, value: &Value, scope: &ScopeRef, mode: BindMode) {
    if value.is_nullish() {
        error::throw_type(
            scope,
            &format!("cannot destructure {}", terms::to_display_string(value)),
        );
        return;
    }
    let values: Vec<Value> = terms::iterate(value).into_iter().map(|(_, v)| v).collect();
    let mut position = 0usize;
    for sub in &pattern.children {
        if scope.borrow().is_stopped() {
            return;
        }
        match sub.kind {
            NodeKind::Elision => {
                position += 1;
            }
            NodeKind::SpreadElem => {
                let rest: Vec<Value> = values.get(position..).unwrap_or(&[]).to_vec();
                bind_pattern(&sub.children[0], Value::new_array(rest), scope, mode);
                return;
            }
            NodeKind::AssignExpr => {
                let mut slot_value = values.get(position).cloned().unwrap_or(Value::Undefined);
                if slot_value.is_undefined() {
                    // the default expression only runs for a missing slot
                    slot_value = eval_node(&sub.children[2], scope);
                    if scope.borrow().is_stopped() {
                        return;
                    }
                }
                bind_pattern(&sub.children[0], slot_value, scope, mode);
                position += 1;
            }
            _ => {
                let slot_value = values.get(position).cloned().unwrap_or(Value::Undefined);
                bind_pattern(sub, slot_value, scope, mode);
                position += 1;
            }
        }
    }
}

fn bind_object_pattern(pattern: &Rc<Node>, value: &Value, scope: &ScopeRef, mode: BindMode) {
    if value.is_nullish() {
        error::throw_type(
            scope,
            &format!("cannot destructure {}", terms::to_display_string(value)),
        );
        return;
    }
    let mut bound_keys: ahash::AHashSet<String> = ahash::AHashSet::new();
    for sub in &pattern.children {
        if scope.borrow().is_stopped() {
            return;
        }
        match sub.kind {
            NodeKind::SpreadElem => {
                // rest gathers the keys not consumed by earlier sub-patterns
                let mut rest = JsObject::new();
                for (key, entry) in terms::iterate(value) {
                    let key = terms::to_property_key(&key);
                    if !bound_keys.contains(&key) {
                        rest.entries.insert(key, entry);
                    }
                }
                bind_pattern(&sub.children[0], Value::new_object(rest), scope, mode);
            }
            NodeKind::PropertyElem => {
                let Some(key) = property_key(sub, scope) else {
                    return;
                };
                let slot_value = property::get_property(scope, value, &SlotKey::Name(key.clone()), true, false);
                bound_keys.insert(key.clone());
                match sub.children.get(1) {
                    None => bind_name(&key, slot_value, scope, mode),
                    Some(target) if target.kind == NodeKind::AssignExpr => {
                        let mut slot_value = slot_value;
                        if slot_value.is_undefined() {
                            slot_value = eval_node(&target.children[2], scope);
                            if scope.borrow().is_stopped() {
                                return;
                            }
                        }
                        bind_pattern(&target.children[0], slot_value, scope, mode);
                    }
                    Some(target) => bind_pattern(target, slot_value, scope, mode),
                }
            }
            _ => {}
        }
    }
}
