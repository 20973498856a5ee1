//! Parse tree nodes.
//!
//! The tree is concrete: each node is either a leaf wrapping a single primary
//! token, or an internal node with a kind tag and an ordered child sequence.
//! Children are reference-counted so closures can keep their body subtree
//! alive after the enclosing program node is dropped.

use std::{fmt::Write, rc::Rc};

use strum::{Display, IntoStaticStr};

use crate::{
    error::CodeLoc,
    token::{Token, TokenKind},
};

/// Kind tag for parse nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum NodeKind {
    /// Leaf node wrapping one primary token.
    Leaf,

    Program,
    Block,
    EmptyStmt,
    ExprStmt,
    /// `var`/`let`/`const` statement; the node token is the declaration
    /// keyword, children are [`NodeKind::VarDecl`] entries.
    VarStmt,
    /// One declarator: `[pattern]` or `[pattern, init]`.
    VarDecl,
    IfStmt,
    /// C-style loop: `[init?, cond?, incr?, body]` where absent clauses are
    /// [`NodeKind::EmptyStmt`] placeholders.
    ForStmt,
    /// `[decl-or-ref, iterable, body]`; node token is the loop keyword form.
    ForInStmt,
    /// `[decl-or-ref, iterable, body]`.
    ForOfStmt,
    WhileStmt,
    DoWhileStmt,
    /// `[selector, CaseClause | DefaultClause ...]`.
    SwitchStmt,
    /// `[test, stmt...]`.
    CaseClause,
    /// `[stmt...]`.
    DefaultClause,
    BreakStmt,
    ContinueStmt,
    ReturnStmt,
    ThrowStmt,
    /// `[try-block, CatchClause?, FinallyClause?]`.
    TryStmt,
    /// `[param?, block]`.
    CatchClause,
    /// `[block]`.
    FinallyClause,
    /// `[name, Params, Block]`.
    FnDeclStmt,

    /// Identifier reference; the node token is the identifier.
    Ref,
    /// Literal expression; the node token is the literal
    /// (number/string/regex/bool/null).
    Lit,
    /// `[element...]` where elements are expressions, [`NodeKind::Elision`]
    /// holes, or [`NodeKind::SpreadElem`].
    ArrayLit,
    /// `[PropertyElem | SpreadElem ...]`.
    ObjectLit,
    /// `[key, value]`; the key is a leaf (identifier, string, number) or a
    /// computed `[expr]` key marked by the node token `[`. Shorthand
    /// properties have one child.
    PropertyElem,
    /// `[expr]` — `...expr` in literals, calls, or patterns.
    SpreadElem,
    /// A hole in an array literal/pattern.
    Elision,
    /// Template literal: leaf TString chunks interleaved with interpolated
    /// expression nodes, in source order.
    TemplateLit,
    /// `[expr]`.
    Paren,
    /// `[name?, Params, Block]`.
    FnExpr,
    /// `[Params, body]` where body is a Block or an expression.
    ArrowFnExpr,
    /// `[param...]` — each param is Ref, a destructuring pattern, an
    /// AssignExpr (default), or SpreadElem (rest).
    Params,
    /// `[callee, arg...]`; node token is `?.` for optional calls.
    FnCall,
    /// `[callee, arg...]`.
    NewExpr,
    /// `[obj, name-leaf]`; node token is `.` or `?.`.
    RefDot,
    /// `[obj, index-expr]`; node token is `?.` when optional.
    RefBracket,
    /// `[op-leaf, operand]` for `!`, `~`, unary `+`/`-`, `++`/`--` prefix,
    /// `typeof`.
    UnaryExpr,
    /// `[operand, op-leaf]` for postfix `++`/`--`.
    PostfixExpr,
    /// `[expr]`.
    DeleteExpr,
    /// `[lhs, op-leaf, rhs]` — one kind per precedence tier below.
    AssignExpr,
    /// `[cond, then, else]`.
    TernaryExpr,
    /// `||` and `??`.
    OrExpr,
    AndExpr,
    BitOrExpr,
    BitXorExpr,
    BitAndExpr,
    EqualityExpr,
    /// `<`, `<=`, `>`, `>=`, `instanceof`, `in`.
    RelationalExpr,
    ShiftExpr,
    AdditiveExpr,
    MultiplicativeExpr,
    ExponentExpr,
    /// Comma-separated expression list in statement position.
    ExprList,
}

/// A parse node: a leaf token or an internal node with ordered children.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    /// The leaf token, or for internal nodes an optional marker token (e.g.
    /// the declaration keyword of a [`NodeKind::VarStmt`], the `?.` of an
    /// optional member access).
    pub token: Option<Token>,
    pub children: Vec<Rc<Node>>,
}

impl Node {
    pub(crate) fn leaf(token: Token) -> Self {
        Self {
            kind: NodeKind::Leaf,
            token: Some(token),
            children: Vec::new(),
        }
    }

    pub(crate) fn internal(kind: NodeKind, children: Vec<Rc<Node>>) -> Self {
        Self {
            kind,
            token: None,
            children,
        }
    }

    pub(crate) fn with_token(kind: NodeKind, token: Token, children: Vec<Rc<Node>>) -> Self {
        Self {
            kind,
            token: Some(token),
            children,
        }
    }

    /// The first token under this node, walking leftmost-first.
    pub fn first_token(&self) -> Option<&Token> {
        if let Some(token) = &self.token {
            return Some(token);
        }
        self.children.iter().find_map(|c| c.first_token())
    }

    /// Source position of this node, for error messages.
    pub fn loc(&self) -> CodeLoc {
        self.first_token().map(Token::loc).unwrap_or_default()
    }

    /// Whether this node is a leaf of the given token kind.
    pub(crate) fn is_token(&self, kind: TokenKind) -> bool {
        self.kind == NodeKind::Leaf && self.token.as_ref().is_some_and(|t| t.kind == kind)
    }

    /// The token kind of the marker/leaf token, if any.
    pub(crate) fn token_kind(&self) -> Option<TokenKind> {
        self.token.as_ref().map(|t| t.kind)
    }

    /// Leaf token text; empty for internal nodes without a marker token.
    pub(crate) fn token_text(&self) -> &str {
        self.token.as_ref().map_or("", |t| t.text.as_str())
    }

    /// Reconstructs a compact source-like rendering of this subtree by
    /// concatenating leaf token texts. Whitespace is not preserved (trivia
    /// never enters the tree); used for error messages such as
    /// `"a.b is not defined"`.
    pub fn source_text(&self) -> String {
        let mut out = String::new();
        self.write_source(&mut out);
        out
    }

    fn write_source(&self, out: &mut String) {
        if self.kind == NodeKind::Leaf {
            if let Some(token) = &self.token {
                let _ = write!(out, "{}", token.text);
            }
            return;
        }
        match self.kind {
            NodeKind::RefDot => {
                if let Some(obj) = self.children.first() {
                    obj.write_source(out);
                }
                out.push_str(if self.token_kind() == Some(TokenKind::QuestionDot) {
                    "?."
                } else {
                    "."
                });
                if let Some(name) = self.children.get(1) {
                    name.write_source(out);
                }
            }
            NodeKind::RefBracket => {
                if let Some(obj) = self.children.first() {
                    obj.write_source(out);
                }
                out.push('[');
                if let Some(index) = self.children.get(1) {
                    index.write_source(out);
                }
                out.push(']');
            }
            NodeKind::FnCall => {
                if let Some(callee) = self.children.first() {
                    callee.write_source(out);
                }
                out.push('(');
                for (i, arg) in self.children.iter().skip(1).enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    arg.write_source(out);
                }
                out.push(')');
            }
            _ => {
                for child in &self.children {
                    child.write_source(out);
                }
            }
        }
    }
}
