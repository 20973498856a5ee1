//! Hand-written scanner producing the token stream consumed by the parser.
//!
//! Every character of the source is covered by exactly one token, including
//! whitespace and comments (emitted as non-primary trivia), so concatenating
//! all token texts reconstructs the source. Line feeds are their own trivia
//! tokens because automatic semicolon insertion looks back for them.
//!
//! Two pieces of trailing context steer the scanner:
//! - a `/` starts a regex literal iff the most recently emitted *primary*
//!   token's [`TokenKind::regex_allowed`] hint is true, otherwise it is
//!   division;
//! - inside a template literal, `${` suspends into normal lexing until the
//!   matching `}`; a stack of brace counters finds that match so nested
//!   object literals inside interpolations lex correctly.

use smallvec::SmallVec;

use crate::{
    error::{CodeLoc, Exception, ExceptionKind},
    token::{Token, TokenKind},
};

/// Lexes the whole source, appending a zero-width [`TokenKind::Eof`] token.
pub(crate) fn lex(source: &str) -> Result<Vec<Token>, Exception> {
    let mut lexer = Lexer::new(source);
    lexer.run()?;
    Ok(lexer.tokens)
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    byte_offset: u32,
    line: u32,
    col: u32,
    tokens: Vec<Token>,
    /// Kind of the most recently emitted primary token, for the regex hint.
    last_primary: Option<TokenKind>,
    /// One entry per suspended template literal: the number of unmatched `{`
    /// opened since its `${`. A `}` at depth 0 resumes the template.
    template_stack: SmallVec<[u32; 4]>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            byte_offset: 0,
            line: 0,
            col: 0,
            tokens: Vec::new(),
            last_primary: None,
            template_stack: SmallVec::new(),
        }
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn peek2(&self) -> Option<char> {
        self.chars.get(self.pos + 2).copied()
    }

    fn peek3(&self) -> Option<char> {
        self.chars.get(self.pos + 3).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        self.byte_offset += ch.len_utf8() as u32;
        if ch == '\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn loc_here(&self) -> CodeLoc {
        CodeLoc::new(self.line, self.col)
    }

    fn error(&self, message: impl Into<String>) -> Exception {
        Exception::at(ExceptionKind::SyntaxError, message, self.loc_here())
    }

    /// Marks the current position as a token start.
    fn mark(&self) -> Mark {
        Mark {
            pos: self.pos,
            byte_offset: self.byte_offset,
            line: self.line,
            col: self.col,
        }
    }

    fn emit(&mut self, kind: TokenKind, mark: Mark) {
        let text: String = self.chars[mark.pos..self.pos].iter().collect();
        if kind.primary() {
            self.last_primary = Some(kind);
        }
        self.tokens.push(Token {
            kind,
            start: mark.byte_offset,
            line: mark.line,
            col: mark.col,
            text,
        });
    }

    fn run(&mut self) -> Result<(), Exception> {
        while self.current().is_some() {
            self.scan_token()?;
        }
        let mark = self.mark();
        self.emit(TokenKind::Eof, mark);
        Ok(())
    }

    fn scan_token(&mut self) -> Result<(), Exception> {
        let mark = self.mark();
        let ch = self.current().expect("scan_token called at EOF");
        match ch {
            ' ' | '\t' => {
                while matches!(self.current(), Some(' ' | '\t')) {
                    self.advance();
                }
                self.emit(TokenKind::Ws, mark);
            }
            '\n' => {
                self.advance();
                self.emit(TokenKind::Lf, mark);
            }
            '\r' => {
                self.advance();
                if self.current() == Some('\n') {
                    self.advance();
                }
                self.emit(TokenKind::Lf, mark);
            }
            '/' if self.peek() == Some('/') => {
                while let Some(c) = self.current() {
                    if c == '\n' || c == '\r' {
                        break;
                    }
                    self.advance();
                }
                self.emit(TokenKind::LineComment, mark);
            }
            '/' if self.peek() == Some('*') => {
                self.advance();
                self.advance();
                loop {
                    match self.current() {
                        Some('*') if self.peek() == Some('/') => {
                            self.advance();
                            self.advance();
                            break;
                        }
                        Some(_) => {
                            self.advance();
                        }
                        None => return Err(self.error("unterminated block comment")),
                    }
                }
                self.emit(TokenKind::BlockComment, mark);
            }
            '/' if self.regex_allowed() => self.scan_regex(mark)?,
            '\'' | '"' => self.scan_string(mark, ch)?,
            '`' => self.scan_template_chunk(mark, true)?,
            '0'..='9' => self.scan_number(mark),
            '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => self.scan_number(mark),
            c if is_ident_start(c) => {
                while self.current().is_some_and(is_ident_part) {
                    self.advance();
                }
                let word: String = self.chars[mark.pos..self.pos].iter().collect();
                let kind = TokenKind::keyword_from_str(&word).unwrap_or(TokenKind::Ident);
                self.emit(kind, mark);
            }
            _ => self.scan_operator(mark)?,
        }
        Ok(())
    }

    fn regex_allowed(&self) -> bool {
        self.last_primary.is_none_or(TokenKind::regex_allowed)
    }

    fn scan_string(&mut self, mark: Mark, quote: char) -> Result<(), Exception> {
        self.advance();
        loop {
            match self.current() {
                Some('\\') => {
                    self.advance();
                    if self.advance().is_none() {
                        return Err(self.error("unterminated string"));
                    }
                }
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some('\n') | None => return Err(self.error("unterminated string")),
                Some(_) => {
                    self.advance();
                }
            }
        }
        let kind = if quote == '\'' { TokenKind::SString } else { TokenKind::DString };
        self.emit(kind, mark);
        Ok(())
    }

    /// Scans a template chunk starting either at the opening backtick
    /// (`opening == true`) or just after an interpolation's closing `}`.
    ///
    /// The chunk ends at `${` (emitting [`TokenKind::DollarLCurly`] and
    /// pushing a brace counter) or at the closing backtick. Newlines inside
    /// the chunk are legal and advance the line counter.
    fn scan_template_chunk(&mut self, mark: Mark, opening: bool) -> Result<(), Exception> {
        if opening {
            self.advance(); // backtick
        }
        loop {
            match self.current() {
                Some('\\') => {
                    self.advance();
                    if self.advance().is_none() {
                        return Err(self.error("unterminated template literal"));
                    }
                }
                Some('$') if self.peek() == Some('{') => {
                    if self.pos > mark.pos {
                        self.emit(TokenKind::TString, mark);
                    }
                    let dollar = self.mark();
                    self.advance();
                    self.advance();
                    self.emit(TokenKind::DollarLCurly, dollar);
                    self.template_stack.push(0);
                    return Ok(());
                }
                Some('`') => {
                    self.advance();
                    self.emit(TokenKind::TString, mark);
                    return Ok(());
                }
                Some(_) => {
                    self.advance();
                }
                None => return Err(self.error("unterminated template literal")),
            }
        }
    }

    fn scan_regex(&mut self, mark: Mark) -> Result<(), Exception> {
        self.advance(); // leading slash
        let mut in_class = false;
        loop {
            match self.current() {
                Some('\\') => {
                    self.advance();
                    if self.advance().is_none() {
                        return Err(self.error("unterminated regex literal"));
                    }
                }
                Some('[') => {
                    in_class = true;
                    self.advance();
                }
                Some(']') => {
                    in_class = false;
                    self.advance();
                }
                Some('/') if !in_class => {
                    self.advance();
                    break;
                }
                Some('\n') | None => return Err(self.error("unterminated regex literal")),
                Some(_) => {
                    self.advance();
                }
            }
        }
        while self.current().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.advance();
        }
        self.emit(TokenKind::Regex, mark);
        Ok(())
    }

    fn scan_number(&mut self, mark: Mark) {
        if self.current() == Some('0') && matches!(self.peek(), Some('x' | 'X')) {
            self.advance();
            self.advance();
            while self.current().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.advance();
            }
            self.emit(TokenKind::Number, mark);
            return;
        }
        while self.current().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.current() == Some('.') {
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                // covers both `1.5` and the leading-dot form `.5`
                self.advance();
                while self.current().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
            } else if self.pos > mark.pos && self.peek() != Some('.') {
                // trailing dot as in `5.`
                self.advance();
            }
        }
        if matches!(self.current(), Some('e' | 'E')) {
            let exp_start = self.pos;
            self.advance();
            if matches!(self.current(), Some('+' | '-')) {
                self.advance();
            }
            if self.current().is_some_and(|c| c.is_ascii_digit()) {
                while self.current().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
            } else {
                // not an exponent after all (e.g. `1e` followed by an identifier
                // character would still be consumed below as a lex error later);
                // rewind is unnecessary because `e` alone re-lexes as part of
                // this number's text — treat the bare `e` as covered.
                self.pos = exp_start;
                self.recompute_position(exp_start);
            }
        }
        self.emit(TokenKind::Number, mark);
    }

    /// Restores byte/line/col bookkeeping after a manual `pos` rewind.
    fn recompute_position(&mut self, pos: usize) {
        let mut byte_offset = 0u32;
        let mut line = 0u32;
        let mut col = 0u32;
        for &c in &self.chars[..pos] {
            byte_offset += c.len_utf8() as u32;
            if c == '\n' {
                line += 1;
                col = 0;
            } else {
                col += 1;
            }
        }
        self.byte_offset = byte_offset;
        self.line = line;
        self.col = col;
    }

    fn scan_operator(&mut self, mark: Mark) -> Result<(), Exception> {
        let c0 = self.current().expect("operator scan at EOF");
        let c1 = self.peek();
        let c2 = self.peek2();
        let c3 = self.peek3();
        let (kind, len) = match (c0, c1, c2, c3) {
            ('>', Some('>'), Some('>'), Some('=')) => (TokenKind::GtGtGtAssign, 4),
            ('>', Some('>'), Some('>'), _) => (TokenKind::GtGtGt, 3),
            ('>', Some('>'), Some('='), _) => (TokenKind::GtGtAssign, 3),
            ('<', Some('<'), Some('='), _) => (TokenKind::LtLtAssign, 3),
            ('*', Some('*'), Some('='), _) => (TokenKind::StarStarAssign, 3),
            ('=', Some('='), Some('='), _) => (TokenKind::EqEqEq, 3),
            ('!', Some('='), Some('='), _) => (TokenKind::NotEqEq, 3),
            ('.', Some('.'), Some('.'), _) => (TokenKind::Spread, 3),
            ('>', Some('>'), _, _) => (TokenKind::GtGt, 2),
            ('<', Some('<'), _, _) => (TokenKind::LtLt, 2),
            ('>', Some('='), _, _) => (TokenKind::GtEq, 2),
            ('<', Some('='), _, _) => (TokenKind::LtEq, 2),
            ('=', Some('='), _, _) => (TokenKind::EqEq, 2),
            ('=', Some('>'), _, _) => (TokenKind::Arrow, 2),
            ('!', Some('='), _, _) => (TokenKind::NotEq, 2),
            ('+', Some('+'), _, _) => (TokenKind::PlusPlus, 2),
            ('-', Some('-'), _, _) => (TokenKind::MinusMinus, 2),
            ('+', Some('='), _, _) => (TokenKind::PlusAssign, 2),
            ('-', Some('='), _, _) => (TokenKind::MinusAssign, 2),
            ('*', Some('*'), _, _) => (TokenKind::StarStar, 2),
            ('*', Some('='), _, _) => (TokenKind::StarAssign, 2),
            ('/', Some('='), _, _) => (TokenKind::SlashAssign, 2),
            ('%', Some('='), _, _) => (TokenKind::PercentAssign, 2),
            ('&', Some('&'), _, _) => (TokenKind::AmpAmp, 2),
            ('|', Some('|'), _, _) => (TokenKind::PipePipe, 2),
            ('?', Some('?'), _, _) => (TokenKind::QuestionQuestion, 2),
            ('?', Some('.'), _, _) => (TokenKind::QuestionDot, 2),
            ('(', ..) => (TokenKind::LParen, 1),
            (')', ..) => (TokenKind::RParen, 1),
            ('[', ..) => (TokenKind::LBracket, 1),
            (']', ..) => (TokenKind::RBracket, 1),
            ('{', ..) => {
                if let Some(depth) = self.template_stack.last_mut() {
                    *depth += 1;
                }
                (TokenKind::LCurly, 1)
            }
            ('}', ..) => {
                if self.template_stack.last() == Some(&0) {
                    // closes an interpolation: emit the brace, then resume
                    // the enclosing template literal
                    self.template_stack.pop();
                    self.advance();
                    self.emit(TokenKind::RCurly, mark);
                    let chunk = self.mark();
                    return self.scan_template_chunk(chunk, false);
                }
                if let Some(depth) = self.template_stack.last_mut() {
                    *depth -= 1;
                }
                (TokenKind::RCurly, 1)
            }
            (',', ..) => (TokenKind::Comma, 1),
            (';', ..) => (TokenKind::Semi, 1),
            (':', ..) => (TokenKind::Colon, 1),
            ('.', ..) => (TokenKind::Dot, 1),
            ('?', ..) => (TokenKind::Question, 1),
            ('=', ..) => (TokenKind::Assign, 1),
            ('+', ..) => (TokenKind::Plus, 1),
            ('-', ..) => (TokenKind::Minus, 1),
            ('*', ..) => (TokenKind::Star, 1),
            ('/', ..) => (TokenKind::Slash, 1),
            ('%', ..) => (TokenKind::Percent, 1),
            ('<', ..) => (TokenKind::Lt, 1),
            ('>', ..) => (TokenKind::Gt, 1),
            ('&', ..) => (TokenKind::Amp, 1),
            ('|', ..) => (TokenKind::Pipe, 1),
            ('^', ..) => (TokenKind::Caret, 1),
            ('!', ..) => (TokenKind::Bang, 1),
            ('~', ..) => (TokenKind::Tilde, 1),
            _ => return Err(self.error(format!("unexpected character '{c0}'"))),
        };
        for _ in 0..len {
            self.advance();
        }
        self.emit(kind, mark);
        Ok(())
    }
}

#[derive(Clone, Copy)]
struct Mark {
    pos: usize,
    byte_offset: u32,
    line: u32,
    col: u32,
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphabetic()
}

fn is_ident_part(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphanumeric()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn roundtrip(source: &str) {
        let tokens = lex(source).unwrap();
        let rebuilt: String = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(rebuilt, source);
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source)
            .unwrap()
            .into_iter()
            .filter(|t| t.kind.primary() && t.kind != TokenKind::Eof)
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn roundtrip_covers_every_character() {
        roundtrip("var x = 1;\nx += 2 // done\n");
        roundtrip("/* multi\nline */ let y = 'a\\'b' + \"c\"");
        roundtrip("a\r\nb");
        roundtrip("`tpl ${a + 1} mid ${b} end`");
        roundtrip("x = a / b / c");
        roundtrip("if (x) { y = /ab[/]c/g.test(s) }");
        roundtrip("0x1F + 1.5e-3 + .25");
    }

    #[test]
    fn regex_vs_division() {
        assert_eq!(kinds("a / b"), vec![TokenKind::Ident, TokenKind::Slash, TokenKind::Ident]);
        assert_eq!(kinds("x = /ab/g"), vec![TokenKind::Ident, TokenKind::Assign, TokenKind::Regex]);
        // after a closing paren, `/` is division
        assert_eq!(
            kinds("(a) / 2"),
            vec![
                TokenKind::LParen,
                TokenKind::Ident,
                TokenKind::RParen,
                TokenKind::Slash,
                TokenKind::Number
            ]
        );
        // after `return`, `/` starts a regex
        assert_eq!(kinds("return /x/"), vec![TokenKind::Return, TokenKind::Regex]);
    }

    #[test]
    fn template_with_nested_braces() {
        let ks = kinds("`a ${ {b: 1}.b } c`");
        assert_eq!(ks[0], TokenKind::TString);
        assert_eq!(ks[1], TokenKind::DollarLCurly);
        assert_eq!(*ks.last().unwrap(), TokenKind::TString);
        // the interpolation's own braces stay balanced
        let curls = ks.iter().filter(|k| **k == TokenKind::LCurly).count();
        let r_curls = ks.iter().filter(|k| **k == TokenKind::RCurly).count();
        assert_eq!(curls + 1, r_curls); // one extra RCurly closes the `${`
    }

    #[test]
    fn template_tracks_lines() {
        let tokens = lex("`a\nb`\nx").unwrap();
        let x = tokens.iter().find(|t| t.kind == TokenKind::Ident).unwrap();
        assert_eq!(x.line, 2);
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(kinds("instanceof"), vec![TokenKind::Instanceof]);
        assert_eq!(kinds("instanceofX"), vec![TokenKind::Ident]);
        assert_eq!(kinds("$_a1"), vec![TokenKind::Ident]);
    }

    #[test]
    fn unknown_character_is_positioned() {
        let err = lex("a\n  #").unwrap_err();
        assert_eq!(err.kind(), ExceptionKind::SyntaxError);
        assert_eq!(err.loc().unwrap().to_string(), "[2:3]");
    }

    #[test]
    fn unterminated_forms() {
        assert!(lex("'abc").is_err());
        assert!(lex("`abc").is_err());
        assert!(lex("/* abc").is_err());
        assert!(lex("x = /abc").is_err());
    }
}
