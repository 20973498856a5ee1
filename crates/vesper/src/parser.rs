//! Recursive-descent statement parser with a priority-climbing expression
//! core.
//!
//! Statements are attempted in a fixed order keyed off the leading token;
//! the only genuinely ambiguous head is `{`, which is first tried as an
//! expression statement beginning with an object literal and, if that
//! speculative parse fails, rewound and re-parsed as a block.
//!
//! Expressions climb the priority table from assignment (lowest) to unary
//! (highest), with postfix operators (calls, member access, `++`/`--`)
//! binding tighter still. Left associativity comes from the climb loop,
//! right associativity (assignment, ternary, `**`) from recursion.
//!
//! Speculative parses (arrow functions, object-literal statements) save the
//! cursor and depth and rewind on failure; node construction is purely
//! functional so a rewind has no side effects.
//!
//! Automatic semicolon insertion implements exactly two rules: a statement
//! terminator is synthesized when (a) the next primary token is `}` or EOF,
//! or (b) a line feed appears among the trivia before the next primary token.

use std::rc::Rc;

use crate::{
    error::{Exception, ExceptionKind},
    lexer::lex,
    node::{Node, NodeKind},
    token::{Token, TokenKind},
};

/// Maximum recursion depth while parsing.
///
/// Prevents stack overflow on pathological nesting like `((((((…))))))`.
const MAX_PARSE_DEPTH: u16 = 128;

/// Lexes and parses a complete program.
pub(crate) fn parse(source: &str) -> Result<Rc<Node>, Exception> {
    let tokens = lex(source)?;
    Parser::new(tokens).parse_program()
}

struct Parser {
    tokens: Vec<Token>,
    /// Raw index into `tokens`; navigation helpers skip trivia.
    pos: usize,
    depth: u16,
    /// When set, the relational tier does not consume `in` (used while
    /// parsing the init clause of a C-style `for`).
    no_in: bool,
}

/// Saved cursor state for speculative parsing.
#[derive(Clone, Copy)]
struct Checkpoint {
    pos: usize,
    depth: u16,
}

type ParseResult<T> = Result<T, Exception>;

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            no_in: false,
        }
    }

    // === cursor helpers ===

    fn next_primary_index(&self) -> usize {
        let mut i = self.pos;
        while i < self.tokens.len() && !self.tokens[i].kind.primary() {
            i += 1;
        }
        i
    }

    fn peek(&self) -> &Token {
        let i = self.next_primary_index();
        &self.tokens[i.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    /// Kind of the primary token after the next one.
    fn peek2_kind(&self) -> TokenKind {
        let mut i = self.next_primary_index();
        if i < self.tokens.len() - 1 {
            i += 1;
            while i < self.tokens.len() && !self.tokens[i].kind.primary() {
                i += 1;
            }
        }
        self.tokens[i.min(self.tokens.len() - 1)].kind
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn take(&mut self) -> Token {
        let i = self.next_primary_index();
        let token = self.tokens[i.min(self.tokens.len() - 1)].clone();
        self.pos = (i + 1).min(self.tokens.len());
        token
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.at(kind) { Some(self.take()) } else { None }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        if self.at(kind) {
            Ok(self.take())
        } else {
            Err(self.error_unexpected(&format!("expected '{kind}'")))
        }
    }

    /// True if a line feed appears among the trivia before the next primary
    /// token (the lookback used by ASI and restricted productions).
    fn newline_before_next(&self) -> bool {
        let mut i = self.pos;
        while i < self.tokens.len() && !self.tokens[i].kind.primary() {
            if self.tokens[i].kind == TokenKind::Lf {
                return true;
            }
            i += 1;
        }
        false
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            pos: self.pos,
            depth: self.depth,
        }
    }

    fn rewind(&mut self, cp: Checkpoint) {
        self.pos = cp.pos;
        self.depth = cp.depth;
    }

    fn enter(&mut self) -> ParseResult<()> {
        self.depth += 1;
        if self.depth > MAX_PARSE_DEPTH {
            return Err(Exception::at(
                ExceptionKind::SyntaxError,
                "too much nesting",
                self.peek().loc(),
            ));
        }
        Ok(())
    }

    fn exit(&mut self) {
        self.depth -= 1;
    }

    fn error_unexpected(&self, context: &str) -> Exception {
        let i = self.next_primary_index().min(self.tokens.len() - 1);
        let window: String = self.tokens[i.saturating_sub(4)..(i + 2).min(self.tokens.len())]
            .iter()
            .map(|t| t.text.as_str())
            .collect();
        let token = &self.tokens[i];
        Exception::at(
            ExceptionKind::SyntaxError,
            format!("unexpected token '{}', {} near '{}'", token.kind, context, window.trim()),
            token.loc(),
        )
    }

    // === statements ===

    fn parse_program(&mut self) -> ParseResult<Rc<Node>> {
        let mut statements = Vec::new();
        while !self.at(TokenKind::Eof) {
            statements.push(self.parse_statement()?);
        }
        Ok(Rc::new(Node::internal(NodeKind::Program, statements)))
    }

    fn parse_statement(&mut self) -> ParseResult<Rc<Node>> {
        self.enter()?;
        let result = self.parse_statement_inner();
        self.exit();
        result
    }

    fn parse_statement_inner(&mut self) -> ParseResult<Rc<Node>> {
        match self.peek_kind() {
            TokenKind::If => self.parse_if(),
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                let stmt = self.parse_var_statement()?;
                self.eat_semi()?;
                Ok(stmt)
            }
            TokenKind::Return => self.parse_return(),
            TokenKind::Throw => self.parse_throw(),
            TokenKind::Try => self.parse_try(),
            TokenKind::For => self.parse_for(),
            TokenKind::While => self.parse_while(),
            TokenKind::Do => self.parse_do_while(),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::Break => {
                let token = self.take();
                self.eat_semi()?;
                Ok(Rc::new(Node::with_token(NodeKind::BreakStmt, token, vec![])))
            }
            TokenKind::Continue => {
                let token = self.take();
                self.eat_semi()?;
                Ok(Rc::new(Node::with_token(NodeKind::ContinueStmt, token, vec![])))
            }
            TokenKind::Function => self.parse_fn_declaration(),
            TokenKind::Semi => {
                let token = self.take();
                Ok(Rc::new(Node::with_token(NodeKind::EmptyStmt, token, vec![])))
            }
            TokenKind::LCurly => {
                // `{` is an object literal when the contents parse as object
                // elements followed by a statement terminator; otherwise it
                // is a block
                let cp = self.checkpoint();
                match self.parse_expression_statement() {
                    Ok(stmt) => Ok(stmt),
                    Err(_) => {
                        self.rewind(cp);
                        self.parse_block()
                    }
                }
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_block(&mut self) -> ParseResult<Rc<Node>> {
        self.expect(TokenKind::LCurly)?;
        let mut statements = Vec::new();
        while !self.at(TokenKind::RCurly) {
            if self.at(TokenKind::Eof) {
                return Err(self.error_unexpected("unterminated block"));
            }
            statements.push(self.parse_statement()?);
        }
        self.expect(TokenKind::RCurly)?;
        Ok(Rc::new(Node::internal(NodeKind::Block, statements)))
    }

    fn parse_expression_statement(&mut self) -> ParseResult<Rc<Node>> {
        let expr = self.parse_expression()?;
        self.eat_semi()?;
        Ok(Rc::new(Node::internal(NodeKind::ExprStmt, vec![expr])))
    }

    /// Consumes a statement terminator, synthesizing one per the two ASI
    /// rules when no `;` is present.
    fn eat_semi(&mut self) -> ParseResult<()> {
        if self.eat(TokenKind::Semi).is_some() {
            return Ok(());
        }
        if matches!(self.peek_kind(), TokenKind::RCurly | TokenKind::Eof) {
            return Ok(());
        }
        if self.newline_before_next() {
            return Ok(());
        }
        Err(self.error_unexpected("expected ';'"))
    }

    fn parse_if(&mut self) -> ParseResult<Rc<Node>> {
        self.expect(TokenKind::If)?;
        self.expect(TokenKind::LParen)?;
        let cond = self.parse_expression()?;
        self.expect(TokenKind::RParen)?;
        let then_branch = self.parse_statement()?;
        let mut children = vec![cond, then_branch];
        if self.eat(TokenKind::Else).is_some() {
            children.push(self.parse_statement()?);
        }
        Ok(Rc::new(Node::internal(NodeKind::IfStmt, children)))
    }

    /// Parses `var`/`let`/`const` with its declarators, without the trailing
    /// terminator (shared between plain statements and `for` heads).
    fn parse_var_statement(&mut self) -> ParseResult<Rc<Node>> {
        let keyword = self.take();
        let mut declarators = Vec::new();
        loop {
            declarators.push(self.parse_var_declarator()?);
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        Ok(Rc::new(Node::with_token(NodeKind::VarStmt, keyword, declarators)))
    }

    fn parse_var_declarator(&mut self) -> ParseResult<Rc<Node>> {
        let pattern = self.parse_binding_pattern()?;
        let mut children = vec![pattern];
        if self.eat(TokenKind::Assign).is_some() {
            children.push(self.parse_assign()?);
        }
        Ok(Rc::new(Node::internal(NodeKind::VarDecl, children)))
    }

    /// A binding target: a plain name or an array/object destructuring
    /// pattern (which parses as the corresponding literal node kind —
    /// semantics diverge in the evaluator).
    fn parse_binding_pattern(&mut self) -> ParseResult<Rc<Node>> {
        match self.peek_kind() {
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LCurly => self.parse_object_literal(),
            TokenKind::Ident => {
                let token = self.take();
                Ok(Rc::new(Node::with_token(NodeKind::Ref, token, vec![])))
            }
            _ => Err(self.error_unexpected("expected a binding name or pattern")),
        }
    }

    fn parse_return(&mut self) -> ParseResult<Rc<Node>> {
        let token = self.expect(TokenKind::Return)?;
        let mut children = Vec::new();
        if !matches!(self.peek_kind(), TokenKind::Semi | TokenKind::RCurly | TokenKind::Eof)
            && !self.newline_before_next()
        {
            children.push(self.parse_expression()?);
        }
        self.eat_semi()?;
        Ok(Rc::new(Node::with_token(NodeKind::ReturnStmt, token, children)))
    }

    fn parse_throw(&mut self) -> ParseResult<Rc<Node>> {
        let token = self.expect(TokenKind::Throw)?;
        let value = self.parse_expression()?;
        self.eat_semi()?;
        Ok(Rc::new(Node::with_token(NodeKind::ThrowStmt, token, vec![value])))
    }

    fn parse_try(&mut self) -> ParseResult<Rc<Node>> {
        self.expect(TokenKind::Try)?;
        let try_block = self.parse_block()?;
        let mut children = vec![try_block];
        if self.eat(TokenKind::Catch).is_some() {
            let mut clause = Vec::new();
            if self.eat(TokenKind::LParen).is_some() {
                let name = self.expect(TokenKind::Ident)?;
                clause.push(Rc::new(Node::with_token(NodeKind::Ref, name, vec![])));
                self.expect(TokenKind::RParen)?;
            }
            clause.push(self.parse_block()?);
            children.push(Rc::new(Node::internal(NodeKind::CatchClause, clause)));
        }
        if self.eat(TokenKind::Finally).is_some() {
            let block = self.parse_block()?;
            children.push(Rc::new(Node::internal(NodeKind::FinallyClause, vec![block])));
        }
        if children.len() == 1 {
            return Err(self.error_unexpected("expected 'catch' or 'finally'"));
        }
        Ok(Rc::new(Node::internal(NodeKind::TryStmt, children)))
    }

    fn parse_for(&mut self) -> ParseResult<Rc<Node>> {
        let for_token = self.expect(TokenKind::For)?;
        self.expect(TokenKind::LParen)?;

        // empty init: definitely C-style
        if self.at(TokenKind::Semi) {
            self.take();
            return self.parse_for_rest(None);
        }

        let head = if matches!(self.peek_kind(), TokenKind::Var | TokenKind::Let | TokenKind::Const) {
            let keyword = self.take();
            let pattern = self.parse_binding_pattern()?;
            if matches!(self.peek_kind(), TokenKind::In | TokenKind::Of) {
                let target = Rc::new(Node::with_token(
                    NodeKind::VarStmt,
                    keyword,
                    vec![Rc::new(Node::internal(NodeKind::VarDecl, vec![pattern]))],
                ));
                return self.parse_for_in_of(for_token, target);
            }
            // continue the first declarator, then any further ones
            let mut first = vec![pattern];
            if self.eat(TokenKind::Assign).is_some() {
                self.no_in = true;
                let init = self.parse_assign();
                self.no_in = false;
                first.push(init?);
            }
            let mut declarators = vec![Rc::new(Node::internal(NodeKind::VarDecl, first))];
            while self.eat(TokenKind::Comma).is_some() {
                self.no_in = true;
                let declarator = self.parse_var_declarator();
                self.no_in = false;
                declarators.push(declarator?);
            }
            Rc::new(Node::with_token(NodeKind::VarStmt, keyword, declarators))
        } else {
            self.no_in = true;
            let expr = self.parse_expression();
            self.no_in = false;
            let expr = expr?;
            if matches!(self.peek_kind(), TokenKind::In | TokenKind::Of) {
                return self.parse_for_in_of(for_token, expr);
            }
            Rc::new(Node::internal(NodeKind::ExprStmt, vec![expr]))
        };
        self.expect(TokenKind::Semi)?;
        self.parse_for_rest(Some(head))
    }

    /// Parses `cond ; incr ) body` of a C-style `for`.
    fn parse_for_rest(&mut self, init: Option<Rc<Node>>) -> ParseResult<Rc<Node>> {
        let init = init.unwrap_or_else(|| Rc::new(Node::internal(NodeKind::EmptyStmt, vec![])));
        let cond = if self.at(TokenKind::Semi) {
            Rc::new(Node::internal(NodeKind::EmptyStmt, vec![]))
        } else {
            self.parse_expression()?
        };
        self.expect(TokenKind::Semi)?;
        let incr = if self.at(TokenKind::RParen) {
            Rc::new(Node::internal(NodeKind::EmptyStmt, vec![]))
        } else {
            self.parse_expression()?
        };
        self.expect(TokenKind::RParen)?;
        let body = self.parse_statement()?;
        Ok(Rc::new(Node::internal(NodeKind::ForStmt, vec![init, cond, incr, body])))
    }

    fn parse_for_in_of(&mut self, for_token: Token, target: Rc<Node>) -> ParseResult<Rc<Node>> {
        let kind = if self.eat(TokenKind::In).is_some() {
            NodeKind::ForInStmt
        } else {
            self.expect(TokenKind::Of)?;
            NodeKind::ForOfStmt
        };
        let iterable = self.parse_assign()?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_statement()?;
        Ok(Rc::new(Node::with_token(kind, for_token, vec![target, iterable, body])))
    }

    fn parse_while(&mut self) -> ParseResult<Rc<Node>> {
        self.expect(TokenKind::While)?;
        self.expect(TokenKind::LParen)?;
        let cond = self.parse_expression()?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_statement()?;
        Ok(Rc::new(Node::internal(NodeKind::WhileStmt, vec![cond, body])))
    }

    fn parse_do_while(&mut self) -> ParseResult<Rc<Node>> {
        self.expect(TokenKind::Do)?;
        let body = self.parse_statement()?;
        self.expect(TokenKind::While)?;
        self.expect(TokenKind::LParen)?;
        let cond = self.parse_expression()?;
        self.expect(TokenKind::RParen)?;
        self.eat_semi()?;
        Ok(Rc::new(Node::internal(NodeKind::DoWhileStmt, vec![body, cond])))
    }

    fn parse_switch(&mut self) -> ParseResult<Rc<Node>> {
        self.expect(TokenKind::Switch)?;
        self.expect(TokenKind::LParen)?;
        let selector = self.parse_expression()?;
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::LCurly)?;
        let mut children = vec![selector];
        while !self.at(TokenKind::RCurly) {
            if self.eat(TokenKind::Case).is_some() {
                let test = self.parse_expression()?;
                self.expect(TokenKind::Colon)?;
                let mut clause = vec![test];
                self.parse_clause_statements(&mut clause)?;
                children.push(Rc::new(Node::internal(NodeKind::CaseClause, clause)));
            } else if self.eat(TokenKind::Default).is_some() {
                self.expect(TokenKind::Colon)?;
                let mut clause = Vec::new();
                self.parse_clause_statements(&mut clause)?;
                children.push(Rc::new(Node::internal(NodeKind::DefaultClause, clause)));
            } else {
                return Err(self.error_unexpected("expected 'case' or 'default'"));
            }
        }
        self.expect(TokenKind::RCurly)?;
        Ok(Rc::new(Node::internal(NodeKind::SwitchStmt, children)))
    }

    fn parse_clause_statements(&mut self, out: &mut Vec<Rc<Node>>) -> ParseResult<()> {
        while !matches!(self.peek_kind(), TokenKind::Case | TokenKind::Default | TokenKind::RCurly) {
            if self.at(TokenKind::Eof) {
                return Err(self.error_unexpected("unterminated switch"));
            }
            out.push(self.parse_statement()?);
        }
        Ok(())
    }

    fn parse_fn_declaration(&mut self) -> ParseResult<Rc<Node>> {
        self.expect(TokenKind::Function)?;
        let name_token = self.expect(TokenKind::Ident)?;
        let name = Rc::new(Node::with_token(NodeKind::Ref, name_token, vec![]));
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        Ok(Rc::new(Node::internal(NodeKind::FnDeclStmt, vec![name, params, body])))
    }

    /// Parses a parenthesized parameter list into a [`NodeKind::Params`]
    /// node. Each parameter is a name or destructuring pattern, optionally
    /// with an `=` default; a trailing `...name` rest parameter is allowed.
    fn parse_params(&mut self) -> ParseResult<Rc<Node>> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.at(TokenKind::RParen) {
            if let Some(spread) = self.eat(TokenKind::Spread) {
                let pattern = self.parse_binding_pattern()?;
                params.push(Rc::new(Node::with_token(NodeKind::SpreadElem, spread, vec![pattern])));
                break; // rest must be last
            }
            let pattern = self.parse_binding_pattern()?;
            if let Some(eq) = self.eat(TokenKind::Assign) {
                let default = self.parse_assign()?;
                let eq_leaf = Rc::new(Node::leaf(eq));
                params.push(Rc::new(Node::internal(
                    NodeKind::AssignExpr,
                    vec![pattern, eq_leaf, default],
                )));
            } else {
                params.push(pattern);
            }
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(Rc::new(Node::internal(NodeKind::Params, params)))
    }

    // === expressions ===

    /// Full expression including the comma operator: condition positions,
    /// `for` clauses, bracket indices. Most sites call
    /// [`Self::parse_assign`] instead, where a comma means something else.
    fn parse_expression(&mut self) -> ParseResult<Rc<Node>> {
        let first = self.parse_assign()?;
        if !self.at(TokenKind::Comma) {
            return Ok(first);
        }
        let mut exprs = vec![first];
        while self.eat(TokenKind::Comma).is_some() {
            exprs.push(self.parse_assign()?);
        }
        Ok(Rc::new(Node::internal(NodeKind::ExprList, exprs)))
    }

    fn parse_assign(&mut self) -> ParseResult<Rc<Node>> {
        self.enter()?;
        let result = self.parse_assign_inner();
        self.exit();
        result
    }

    fn parse_assign_inner(&mut self) -> ParseResult<Rc<Node>> {
        let lhs = self.parse_ternary()?;
        let op = match self.peek_kind() {
            TokenKind::Assign
            | TokenKind::PlusAssign
            | TokenKind::MinusAssign
            | TokenKind::StarAssign
            | TokenKind::SlashAssign
            | TokenKind::PercentAssign
            | TokenKind::StarStarAssign
            | TokenKind::LtLtAssign
            | TokenKind::GtGtAssign
            | TokenKind::GtGtGtAssign => self.take(),
            _ => return Ok(lhs),
        };
        let rhs = self.parse_assign()?; // right-associative
        let op_leaf = Rc::new(Node::leaf(op));
        Ok(Rc::new(Node::internal(NodeKind::AssignExpr, vec![lhs, op_leaf, rhs])))
    }

    fn parse_ternary(&mut self) -> ParseResult<Rc<Node>> {
        let cond = self.parse_binary(2)?;
        if self.eat(TokenKind::Question).is_none() {
            return Ok(cond);
        }
        let then_value = self.parse_assign()?;
        self.expect(TokenKind::Colon)?;
        let else_value = self.parse_assign()?;
        Ok(Rc::new(Node::internal(
            NodeKind::TernaryExpr,
            vec![cond, then_value, else_value],
        )))
    }

    /// Left-associative binary tiers, priorities 2 (lowest bound here)
    /// through 12. Priority 12 (`**`) is right-associative and recurses.
    fn parse_binary(&mut self, prio: u8) -> ParseResult<Rc<Node>> {
        if prio == 12 {
            let lhs = self.parse_unary()?;
            if self.at(TokenKind::StarStar) {
                let op = self.take();
                let rhs = self.parse_binary(12)?; // right-associative
                let op_leaf = Rc::new(Node::leaf(op));
                return Ok(Rc::new(Node::internal(
                    NodeKind::ExponentExpr,
                    vec![lhs, op_leaf, rhs],
                )));
            }
            return Ok(lhs);
        }
        let (kind, ops): (NodeKind, &[TokenKind]) = match prio {
            2 => (NodeKind::OrExpr, &[TokenKind::PipePipe, TokenKind::QuestionQuestion]),
            3 => (NodeKind::AndExpr, &[TokenKind::AmpAmp]),
            4 => (NodeKind::BitOrExpr, &[TokenKind::Pipe]),
            5 => (NodeKind::BitXorExpr, &[TokenKind::Caret]),
            6 => (NodeKind::BitAndExpr, &[TokenKind::Amp]),
            7 => (
                NodeKind::EqualityExpr,
                &[TokenKind::EqEq, TokenKind::NotEq, TokenKind::EqEqEq, TokenKind::NotEqEq],
            ),
            8 => (
                NodeKind::RelationalExpr,
                &[
                    TokenKind::Lt,
                    TokenKind::LtEq,
                    TokenKind::Gt,
                    TokenKind::GtEq,
                    TokenKind::Instanceof,
                    TokenKind::In,
                ],
            ),
            9 => (
                NodeKind::ShiftExpr,
                &[TokenKind::LtLt, TokenKind::GtGt, TokenKind::GtGtGt],
            ),
            10 => (NodeKind::AdditiveExpr, &[TokenKind::Plus, TokenKind::Minus]),
            11 => (
                NodeKind::MultiplicativeExpr,
                &[TokenKind::Star, TokenKind::Slash, TokenKind::Percent],
            ),
            _ => unreachable!("binary priority out of range"),
        };
        let mut lhs = self.parse_binary(prio + 1)?;
        loop {
            let next = self.peek_kind();
            if !ops.contains(&next) || (next == TokenKind::In && self.no_in) {
                return Ok(lhs);
            }
            let op = self.take();
            let rhs = self.parse_binary(prio + 1)?;
            let op_leaf = Rc::new(Node::leaf(op));
            lhs = Rc::new(Node::internal(kind, vec![lhs, op_leaf, rhs]));
        }
    }

    fn parse_unary(&mut self) -> ParseResult<Rc<Node>> {
        self.enter()?;
        let result = self.parse_unary_inner();
        self.exit();
        result
    }

    fn parse_unary_inner(&mut self) -> ParseResult<Rc<Node>> {
        match self.peek_kind() {
            TokenKind::Bang
            | TokenKind::Tilde
            | TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::PlusPlus
            | TokenKind::MinusMinus
            | TokenKind::Typeof => {
                let op = self.take();
                let operand = self.parse_unary()?;
                let op_leaf = Rc::new(Node::leaf(op));
                Ok(Rc::new(Node::internal(NodeKind::UnaryExpr, vec![op_leaf, operand])))
            }
            TokenKind::Delete => {
                self.take();
                let operand = self.parse_unary()?;
                Ok(Rc::new(Node::internal(NodeKind::DeleteExpr, vec![operand])))
            }
            TokenKind::New => {
                self.take();
                // member expression without calls, so `new a.b.C(x)` news C
                let callee = self.parse_postfix(false)?;
                let mut children = vec![callee];
                if self.at(TokenKind::LParen) {
                    self.parse_args(&mut children)?;
                }
                // the construction result supports further member access and
                // calls: `new Foo(1).bar()`
                let new_expr = Rc::new(Node::internal(NodeKind::NewExpr, children));
                self.parse_postfix_chain(new_expr, true)
            }
            _ => self.parse_postfix(true),
        }
    }

    /// Postfix chain: calls, member access, indexing, and postfix `++`/`--`
    /// (the latter only when no line feed intervenes).
    fn parse_postfix(&mut self, allow_call: bool) -> ParseResult<Rc<Node>> {
        let operand = self.parse_primary()?;
        self.parse_postfix_chain(operand, allow_call)
    }

    fn parse_postfix_chain(&mut self, operand: Rc<Node>, allow_call: bool) -> ParseResult<Rc<Node>> {
        let mut operand = operand;
        loop {
            match self.peek_kind() {
                TokenKind::Dot => {
                    let dot = self.take();
                    let name = self.parse_property_name()?;
                    operand = Rc::new(Node::with_token(NodeKind::RefDot, dot, vec![operand, name]));
                }
                TokenKind::QuestionDot => {
                    let q = self.take();
                    match self.peek_kind() {
                        TokenKind::LParen if allow_call => {
                            let mut children = vec![operand];
                            self.parse_args(&mut children)?;
                            operand = Rc::new(Node::with_token(NodeKind::FnCall, q, children));
                        }
                        TokenKind::LBracket => {
                            self.take();
                            let index = self.parse_expression()?;
                            self.expect(TokenKind::RBracket)?;
                            operand = Rc::new(Node::with_token(NodeKind::RefBracket, q, vec![operand, index]));
                        }
                        _ => {
                            let name = self.parse_property_name()?;
                            operand = Rc::new(Node::with_token(NodeKind::RefDot, q, vec![operand, name]));
                        }
                    }
                }
                TokenKind::LBracket => {
                    self.take();
                    let index = self.parse_expression()?;
                    self.expect(TokenKind::RBracket)?;
                    operand = Rc::new(Node::internal(NodeKind::RefBracket, vec![operand, index]));
                }
                TokenKind::LParen if allow_call => {
                    let mut children = vec![operand];
                    self.parse_args(&mut children)?;
                    operand = Rc::new(Node::internal(NodeKind::FnCall, children));
                }
                TokenKind::PlusPlus | TokenKind::MinusMinus if !self.newline_before_next() => {
                    let op = self.take();
                    let op_leaf = Rc::new(Node::leaf(op));
                    operand = Rc::new(Node::internal(NodeKind::PostfixExpr, vec![operand, op_leaf]));
                }
                _ => return Ok(operand),
            }
        }
    }

    /// After `.` or `?.`, any keyword is accepted as a property name.
    fn parse_property_name(&mut self) -> ParseResult<Rc<Node>> {
        let kind = self.peek_kind();
        if kind == TokenKind::Ident || kind.keyword() {
            Ok(Rc::new(Node::leaf(self.take())))
        } else {
            Err(self.error_unexpected("expected a property name"))
        }
    }

    fn parse_args(&mut self, out: &mut Vec<Rc<Node>>) -> ParseResult<()> {
        self.expect(TokenKind::LParen)?;
        while !self.at(TokenKind::RParen) {
            if let Some(spread) = self.eat(TokenKind::Spread) {
                let value = self.parse_assign()?;
                out.push(Rc::new(Node::with_token(NodeKind::SpreadElem, spread, vec![value])));
            } else {
                out.push(self.parse_assign()?);
            }
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(())
    }

    fn parse_primary(&mut self) -> ParseResult<Rc<Node>> {
        self.enter()?;
        let result = self.parse_primary_inner();
        self.exit();
        result
    }

    fn parse_primary_inner(&mut self) -> ParseResult<Rc<Node>> {
        match self.peek_kind() {
            TokenKind::Number
            | TokenKind::SString
            | TokenKind::DString
            | TokenKind::Regex
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Null => {
                let token = self.take();
                Ok(Rc::new(Node::with_token(NodeKind::Lit, token, vec![])))
            }
            TokenKind::TString => self.parse_template(),
            TokenKind::Ident => {
                if self.peek2_kind() == TokenKind::Arrow {
                    // single-parameter arrow without parentheses
                    let name = self.take();
                    let param = Rc::new(Node::with_token(NodeKind::Ref, name, vec![]));
                    let params = Rc::new(Node::internal(NodeKind::Params, vec![param]));
                    self.expect(TokenKind::Arrow)?;
                    return self.parse_arrow_body(params);
                }
                let token = self.take();
                Ok(Rc::new(Node::with_token(NodeKind::Ref, token, vec![])))
            }
            TokenKind::This => {
                let token = self.take();
                Ok(Rc::new(Node::with_token(NodeKind::Ref, token, vec![])))
            }
            TokenKind::LParen => {
                // arrow parameters and parenthesized expressions are
                // indistinguishable until `=>`: speculate, rewind on failure
                let cp = self.checkpoint();
                match self.try_parse_paren_arrow() {
                    Ok(arrow) => Ok(arrow),
                    Err(_) => {
                        self.rewind(cp);
                        self.take();
                        let mut exprs = vec![self.parse_assign()?];
                        while self.eat(TokenKind::Comma).is_some() {
                            exprs.push(self.parse_assign()?);
                        }
                        self.expect(TokenKind::RParen)?;
                        let inner = if exprs.len() == 1 {
                            exprs.pop().expect("one expression")
                        } else {
                            Rc::new(Node::internal(NodeKind::ExprList, exprs))
                        };
                        Ok(Rc::new(Node::internal(NodeKind::Paren, vec![inner])))
                    }
                }
            }
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LCurly => self.parse_object_literal(),
            TokenKind::Function => {
                self.take();
                let mut children = Vec::new();
                if self.at(TokenKind::Ident) {
                    let name = self.take();
                    children.push(Rc::new(Node::with_token(NodeKind::Ref, name, vec![])));
                }
                children.push(self.parse_params()?);
                children.push(self.parse_block()?);
                Ok(Rc::new(Node::internal(NodeKind::FnExpr, children)))
            }
            _ => Err(self.error_unexpected("expected an expression")),
        }
    }

    fn try_parse_paren_arrow(&mut self) -> ParseResult<Rc<Node>> {
        let params = self.parse_params()?;
        self.expect(TokenKind::Arrow)?;
        self.parse_arrow_body(params)
    }

    fn parse_arrow_body(&mut self, params: Rc<Node>) -> ParseResult<Rc<Node>> {
        let body = if self.at(TokenKind::LCurly) {
            self.parse_block()?
        } else {
            self.parse_assign()?
        };
        Ok(Rc::new(Node::internal(NodeKind::ArrowFnExpr, vec![params, body])))
    }

    fn parse_array_literal(&mut self) -> ParseResult<Rc<Node>> {
        self.expect(TokenKind::LBracket)?;
        let mut elements = Vec::new();
        loop {
            if self.at(TokenKind::RBracket) {
                break;
            }
            if self.at(TokenKind::Comma) {
                // hole
                self.take();
                elements.push(Rc::new(Node::internal(NodeKind::Elision, vec![])));
                continue;
            }
            if let Some(spread) = self.eat(TokenKind::Spread) {
                let value = self.parse_assign()?;
                elements.push(Rc::new(Node::with_token(NodeKind::SpreadElem, spread, vec![value])));
            } else {
                elements.push(self.parse_assign()?);
            }
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.expect(TokenKind::RBracket)?;
        Ok(Rc::new(Node::internal(NodeKind::ArrayLit, elements)))
    }

    fn parse_object_literal(&mut self) -> ParseResult<Rc<Node>> {
        self.expect(TokenKind::LCurly)?;
        let mut elements = Vec::new();
        while !self.at(TokenKind::RCurly) {
            if let Some(spread) = self.eat(TokenKind::Spread) {
                let value = self.parse_assign()?;
                elements.push(Rc::new(Node::with_token(NodeKind::SpreadElem, spread, vec![value])));
            } else {
                elements.push(self.parse_property_elem()?);
            }
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.expect(TokenKind::RCurly)?;
        Ok(Rc::new(Node::internal(NodeKind::ObjectLit, elements)))
    }

    fn parse_property_elem(&mut self) -> ParseResult<Rc<Node>> {
        // computed key
        if let Some(bracket) = self.eat(TokenKind::LBracket) {
            let key = self.parse_assign()?;
            self.expect(TokenKind::RBracket)?;
            self.expect(TokenKind::Colon)?;
            let value = self.parse_assign()?;
            return Ok(Rc::new(Node::with_token(NodeKind::PropertyElem, bracket, vec![key, value])));
        }
        let kind = self.peek_kind();
        let valid_key = kind == TokenKind::Ident
            || kind.keyword()
            || matches!(kind, TokenKind::SString | TokenKind::DString | TokenKind::Number);
        if !valid_key {
            return Err(self.error_unexpected("expected a property key"));
        }
        let key_token = self.take();
        let key = Rc::new(Node::leaf(key_token.clone()));
        if self.eat(TokenKind::Colon).is_some() {
            let value = self.parse_assign()?;
            return Ok(Rc::new(Node::internal(NodeKind::PropertyElem, vec![key, value])));
        }
        // shorthand forms are only valid for identifier keys
        if key_token.kind != TokenKind::Ident {
            return Err(self.error_unexpected("expected ':'"));
        }
        if let Some(eq) = self.eat(TokenKind::Assign) {
            // `{x = 1}` — only meaningful as a destructuring default; kept as
            // an assignment so the binder sees the default expression
            let default = self.parse_assign()?;
            let target = Rc::new(Node::with_token(NodeKind::Ref, key_token, vec![]));
            let eq_leaf = Rc::new(Node::leaf(eq));
            let assign = Rc::new(Node::internal(NodeKind::AssignExpr, vec![target, eq_leaf, default]));
            return Ok(Rc::new(Node::internal(NodeKind::PropertyElem, vec![key, assign])));
        }
        Ok(Rc::new(Node::internal(NodeKind::PropertyElem, vec![key])))
    }

    fn parse_template(&mut self) -> ParseResult<Rc<Node>> {
        let first = self.expect(TokenKind::TString)?;
        let closed = template_chunk_closes(&first.text, true);
        let mut children = vec![Rc::new(Node::leaf(first))];
        if closed {
            return Ok(Rc::new(Node::internal(NodeKind::TemplateLit, children)));
        }
        loop {
            if self.eat(TokenKind::DollarLCurly).is_some() {
                children.push(self.parse_expression()?);
                self.expect(TokenKind::RCurly)?;
            } else if self.at(TokenKind::TString) {
                let chunk = self.take();
                let closes = template_chunk_closes(&chunk.text, false);
                children.push(Rc::new(Node::leaf(chunk)));
                if closes {
                    return Ok(Rc::new(Node::internal(NodeKind::TemplateLit, children)));
                }
            } else {
                return Err(self.error_unexpected("unterminated template literal"));
            }
        }
    }
}

/// Whether a template chunk's raw text ends the template (unescaped closing
/// backtick). The opening chunk's leading backtick is skipped first.
fn template_chunk_closes(text: &str, is_first: bool) -> bool {
    let body = if is_first { &text[1..] } else { text };
    if !body.ends_with('`') {
        return false;
    }
    let trailing_backslashes = body[..body.len() - 1].chars().rev().take_while(|c| *c == '\\').count();
    trailing_backslashes % 2 == 0
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse_ok(source: &str) -> Rc<Node> {
        parse(source).unwrap()
    }

    fn first_stmt(source: &str) -> Rc<Node> {
        parse_ok(source).children[0].clone()
    }

    fn first_expr(source: &str) -> Rc<Node> {
        let stmt = first_stmt(source);
        assert_eq!(stmt.kind, NodeKind::ExprStmt);
        stmt.children[0].clone()
    }

    #[test]
    fn precedence_additive_vs_multiplicative() {
        let expr = first_expr("1 + 2 * 3");
        assert_eq!(expr.kind, NodeKind::AdditiveExpr);
        assert_eq!(expr.children[2].kind, NodeKind::MultiplicativeExpr);
    }

    #[test]
    fn left_associativity() {
        // (1 - 2) - 3
        let expr = first_expr("1 - 2 - 3");
        assert_eq!(expr.kind, NodeKind::AdditiveExpr);
        assert_eq!(expr.children[0].kind, NodeKind::AdditiveExpr);
    }

    #[test]
    fn exponent_right_associativity() {
        // 2 ** (3 ** 2)
        let expr = first_expr("2 ** 3 ** 2");
        assert_eq!(expr.kind, NodeKind::ExponentExpr);
        assert_eq!(expr.children[2].kind, NodeKind::ExponentExpr);
    }

    #[test]
    fn assignment_right_associativity() {
        let expr = first_expr("a = b = 1");
        assert_eq!(expr.kind, NodeKind::AssignExpr);
        assert_eq!(expr.children[2].kind, NodeKind::AssignExpr);
    }

    #[test]
    fn postfix_chain() {
        let expr = first_expr("a.b[0](1, 2).c");
        assert_eq!(expr.kind, NodeKind::RefDot);
        assert_eq!(expr.children[0].kind, NodeKind::FnCall);
    }

    #[test]
    fn optional_chaining_marks_token() {
        let expr = first_expr("a?.b");
        assert_eq!(expr.kind, NodeKind::RefDot);
        assert_eq!(expr.token_kind(), Some(TokenKind::QuestionDot));
    }

    #[test]
    fn keywords_as_property_names() {
        let expr = first_expr("a.delete");
        assert_eq!(expr.kind, NodeKind::RefDot);
        assert_eq!(expr.children[1].token_kind(), Some(TokenKind::Delete));
    }

    #[test]
    fn asi_on_newline_and_brace() {
        let program = parse_ok("a = 1\nb = 2");
        assert_eq!(program.children.len(), 2);
        assert!(parse("if (x) { a = 1 }").is_ok());
        assert!(parse("a = 1 b = 2").is_err());
    }

    #[test]
    fn return_restricted_production() {
        // `return` followed by a newline returns undefined
        let program = parse_ok("function f() { return\n1 }");
        let body = &program.children[0].children[2];
        assert_eq!(body.children[0].kind, NodeKind::ReturnStmt);
        assert!(body.children[0].children.is_empty());
    }

    #[test]
    fn arrow_function_backtracking() {
        let expr = first_expr("(a, b) => a + b");
        assert_eq!(expr.kind, NodeKind::ArrowFnExpr);
        let paren = first_expr("(a)");
        assert_eq!(paren.kind, NodeKind::Paren);
        let single = first_expr("x => x * 2");
        assert_eq!(single.kind, NodeKind::ArrowFnExpr);
    }

    #[test]
    fn arrow_with_defaults_and_rest() {
        let expr = first_expr("(a = 1, ...rest) => rest");
        assert_eq!(expr.kind, NodeKind::ArrowFnExpr);
        let params = &expr.children[0];
        assert_eq!(params.children[0].kind, NodeKind::AssignExpr);
        assert_eq!(params.children[1].kind, NodeKind::SpreadElem);
    }

    #[test]
    fn object_literal_statement_vs_block() {
        // a lone `{}` is an object literal expression statement
        let stmt = first_stmt("{}");
        assert_eq!(stmt.kind, NodeKind::ExprStmt);
        assert_eq!(stmt.children[0].kind, NodeKind::ObjectLit);
        // `{ var x; }` can only be a block
        let stmt = first_stmt("{ var x; }");
        assert_eq!(stmt.kind, NodeKind::Block);
    }

    #[test]
    fn destructuring_patterns_share_literal_kinds() {
        let stmt = first_stmt("const [a, , ...rest] = xs;");
        assert_eq!(stmt.kind, NodeKind::VarStmt);
        let declarator = &stmt.children[0];
        assert_eq!(declarator.children[0].kind, NodeKind::ArrayLit);
        assert_eq!(declarator.children[0].children[1].kind, NodeKind::Elision);
        let stmt = first_stmt("let {x, y: z = 9, ...rest} = o;");
        assert_eq!(stmt.children[0].children[0].kind, NodeKind::ObjectLit);
    }

    #[test]
    fn for_variants() {
        assert_eq!(first_stmt("for (let i = 0; i < 3; i++) {}").kind, NodeKind::ForStmt);
        assert_eq!(first_stmt("for (var k in o) {}").kind, NodeKind::ForInStmt);
        assert_eq!(first_stmt("for (const v of xs) {}").kind, NodeKind::ForOfStmt);
        assert_eq!(first_stmt("for (;;) break").kind, NodeKind::ForStmt);
    }

    #[test]
    fn for_init_in_operator_is_not_for_in() {
        let stmt = first_stmt("for (var x = 'a' in o; x; x = false) {}");
        assert_eq!(stmt.kind, NodeKind::ForStmt);
    }

    #[test]
    fn switch_with_default_anywhere() {
        let stmt = first_stmt("switch (x) { case 1: a(); default: b(); case 2: c(); }");
        assert_eq!(stmt.kind, NodeKind::SwitchStmt);
        assert_eq!(stmt.children[2].kind, NodeKind::DefaultClause);
    }

    #[test]
    fn template_literal_children() {
        let expr = first_expr("`a ${x} b ${y} c`");
        assert_eq!(expr.kind, NodeKind::TemplateLit);
        let kinds: Vec<NodeKind> = expr.children.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![NodeKind::Leaf, NodeKind::Ref, NodeKind::Leaf, NodeKind::Ref, NodeKind::Leaf]
        );
    }

    #[test]
    fn parse_depth_is_limited() {
        let mut source = String::new();
        for _ in 0..200 {
            source.push('(');
        }
        source.push('1');
        for _ in 0..200 {
            source.push(')');
        }
        let err = parse(&source).unwrap_err();
        assert_eq!(err.kind(), ExceptionKind::SyntaxError);
    }

    #[test]
    fn reparse_is_structurally_identical() {
        let source = "var x = 0; for (let i = 1; i <= 5; i++) { x += i; } x";
        let tokens = lex(source).unwrap();
        let rebuilt: String = tokens.iter().map(|t| t.text.as_str()).collect();
        let a = format!("{:?}", parse(source).unwrap());
        let b = format!("{:?}", parse(&rebuilt).unwrap());
        assert_eq!(a, b);
    }
}
