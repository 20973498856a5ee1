//! Lexical token categories and the token type produced by the lexer.

use strum::{Display, IntoStaticStr};

use crate::error::CodeLoc;

/// Closed enumeration of lexical categories.
///
/// Three derived properties drive the rest of the front end:
/// - [`primary`](Self::primary): whether the parser sees this token at all.
///   Whitespace and comments are non-primary; they exist so the token stream
///   reconstructs the source exactly and so automatic semicolon insertion can
///   observe line feeds.
/// - [`keyword`](Self::keyword): reserved words. After `.` or `?.` the parser
///   accepts any keyword as a property name.
/// - [`regex_allowed`](Self::regex_allowed): trailing-context hint consumed by
///   the lexer itself — a `/` begins a regex literal iff the most recently
///   emitted primary token allows one; otherwise it is division.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum TokenKind {
    // non-primary trivia
    #[strum(serialize = "<ws>")]
    Ws,
    #[strum(serialize = "<lf>")]
    Lf,
    #[strum(serialize = "<comment>")]
    LineComment,
    #[strum(serialize = "<comment>")]
    BlockComment,

    #[strum(serialize = "<eof>")]
    Eof,

    #[strum(serialize = "<identifier>")]
    Ident,
    #[strum(serialize = "<number>")]
    Number,
    /// Single-quoted string literal, quotes included in the text.
    #[strum(serialize = "<string>")]
    SString,
    /// Double-quoted string literal, quotes included in the text.
    #[strum(serialize = "<string>")]
    DString,
    /// A template-literal chunk: the opening/closing backtick plus the literal
    /// characters around interpolations. Interpolations themselves are lexed
    /// in normal mode between [`DollarLCurly`](Self::DollarLCurly) and the
    /// matching `}`.
    #[strum(serialize = "<template>")]
    TString,
    /// Regex literal including slashes and trailing flags.
    #[strum(serialize = "<regex>")]
    Regex,

    // keywords
    #[strum(serialize = "var")]
    Var,
    #[strum(serialize = "let")]
    Let,
    #[strum(serialize = "const")]
    Const,
    #[strum(serialize = "function")]
    Function,
    #[strum(serialize = "return")]
    Return,
    #[strum(serialize = "if")]
    If,
    #[strum(serialize = "else")]
    Else,
    #[strum(serialize = "for")]
    For,
    #[strum(serialize = "while")]
    While,
    #[strum(serialize = "do")]
    Do,
    #[strum(serialize = "switch")]
    Switch,
    #[strum(serialize = "case")]
    Case,
    #[strum(serialize = "default")]
    Default,
    #[strum(serialize = "break")]
    Break,
    #[strum(serialize = "continue")]
    Continue,
    #[strum(serialize = "try")]
    Try,
    #[strum(serialize = "catch")]
    Catch,
    #[strum(serialize = "finally")]
    Finally,
    #[strum(serialize = "throw")]
    Throw,
    #[strum(serialize = "new")]
    New,
    #[strum(serialize = "delete")]
    Delete,
    #[strum(serialize = "typeof")]
    Typeof,
    #[strum(serialize = "instanceof")]
    Instanceof,
    #[strum(serialize = "in")]
    In,
    #[strum(serialize = "of")]
    Of,
    #[strum(serialize = "null")]
    Null,
    #[strum(serialize = "true")]
    True,
    #[strum(serialize = "false")]
    False,
    #[strum(serialize = "this")]
    This,

    // punctuation
    #[strum(serialize = "(")]
    LParen,
    #[strum(serialize = ")")]
    RParen,
    #[strum(serialize = "[")]
    LBracket,
    #[strum(serialize = "]")]
    RBracket,
    #[strum(serialize = "{{")]
    LCurly,
    #[strum(serialize = "}}")]
    RCurly,
    /// `${` inside a template literal.
    #[strum(serialize = "${{")]
    DollarLCurly,
    #[strum(serialize = ",")]
    Comma,
    #[strum(serialize = ";")]
    Semi,
    #[strum(serialize = ":")]
    Colon,
    #[strum(serialize = ".")]
    Dot,
    #[strum(serialize = "?.")]
    QuestionDot,
    #[strum(serialize = "?")]
    Question,
    #[strum(serialize = "=>")]
    Arrow,
    #[strum(serialize = "...")]
    Spread,

    // assignment operators
    #[strum(serialize = "=")]
    Assign,
    #[strum(serialize = "+=")]
    PlusAssign,
    #[strum(serialize = "-=")]
    MinusAssign,
    #[strum(serialize = "*=")]
    StarAssign,
    #[strum(serialize = "/=")]
    SlashAssign,
    #[strum(serialize = "%=")]
    PercentAssign,
    #[strum(serialize = "**=")]
    StarStarAssign,
    #[strum(serialize = "<<=")]
    LtLtAssign,
    #[strum(serialize = ">>=")]
    GtGtAssign,
    #[strum(serialize = ">>>=")]
    GtGtGtAssign,

    // logical / nullish
    #[strum(serialize = "??")]
    QuestionQuestion,
    #[strum(serialize = "||")]
    PipePipe,
    #[strum(serialize = "&&")]
    AmpAmp,

    // bitwise
    #[strum(serialize = "|")]
    Pipe,
    #[strum(serialize = "^")]
    Caret,
    #[strum(serialize = "&")]
    Amp,

    // equality / relational
    #[strum(serialize = "==")]
    EqEq,
    #[strum(serialize = "!=")]
    NotEq,
    #[strum(serialize = "===")]
    EqEqEq,
    #[strum(serialize = "!==")]
    NotEqEq,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    LtEq,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    GtEq,

    // shifts
    #[strum(serialize = "<<")]
    LtLt,
    #[strum(serialize = ">>")]
    GtGt,
    #[strum(serialize = ">>>")]
    GtGtGt,

    // arithmetic
    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "-")]
    Minus,
    #[strum(serialize = "*")]
    Star,
    #[strum(serialize = "/")]
    Slash,
    #[strum(serialize = "%")]
    Percent,
    #[strum(serialize = "**")]
    StarStar,

    // unary
    #[strum(serialize = "!")]
    Bang,
    #[strum(serialize = "~")]
    Tilde,
    #[strum(serialize = "++")]
    PlusPlus,
    #[strum(serialize = "--")]
    MinusMinus,
}

impl TokenKind {
    /// Whether the parser sees this token. Trivia (whitespace, line feeds,
    /// comments) is emitted for round-tripping and ASI only.
    pub fn primary(self) -> bool {
        !matches!(self, Self::Ws | Self::Lf | Self::LineComment | Self::BlockComment)
    }

    /// Whether this token is a reserved word.
    pub fn keyword(self) -> bool {
        matches!(
            self,
            Self::Var
                | Self::Let
                | Self::Const
                | Self::Function
                | Self::Return
                | Self::If
                | Self::Else
                | Self::For
                | Self::While
                | Self::Do
                | Self::Switch
                | Self::Case
                | Self::Default
                | Self::Break
                | Self::Continue
                | Self::Try
                | Self::Catch
                | Self::Finally
                | Self::Throw
                | Self::New
                | Self::Delete
                | Self::Typeof
                | Self::Instanceof
                | Self::In
                | Self::Of
                | Self::Null
                | Self::True
                | Self::False
                | Self::This
        )
    }

    /// Trailing-context hint: may a `/` immediately after this token start a
    /// regex literal? True after opening brackets, separators, operators, and
    /// the keywords that can precede an expression; false after anything that
    /// can terminate an expression (identifiers, literals, closing brackets).
    pub fn regex_allowed(self) -> bool {
        matches!(
            self,
            Self::LParen
                | Self::LBracket
                | Self::LCurly
                | Self::DollarLCurly
                | Self::Comma
                | Self::Semi
                | Self::Colon
                | Self::Dot
                | Self::QuestionDot
                | Self::Question
                | Self::Arrow
                | Self::Spread
                | Self::Assign
                | Self::PlusAssign
                | Self::MinusAssign
                | Self::StarAssign
                | Self::SlashAssign
                | Self::PercentAssign
                | Self::StarStarAssign
                | Self::LtLtAssign
                | Self::GtGtAssign
                | Self::GtGtGtAssign
                | Self::QuestionQuestion
                | Self::PipePipe
                | Self::AmpAmp
                | Self::Pipe
                | Self::Caret
                | Self::Amp
                | Self::EqEq
                | Self::NotEq
                | Self::EqEqEq
                | Self::NotEqEq
                | Self::Lt
                | Self::LtEq
                | Self::Gt
                | Self::GtEq
                | Self::LtLt
                | Self::GtGt
                | Self::GtGtGt
                | Self::Plus
                | Self::Minus
                | Self::Star
                | Self::Slash
                | Self::Percent
                | Self::StarStar
                | Self::Bang
                | Self::Tilde
                | Self::Return
                | Self::Typeof
                | Self::Delete
                | Self::Instanceof
                | Self::In
                | Self::Do
                | Self::If
                | Self::Else
                | Self::Case
                | Self::Default
                | Self::Throw
        )
    }

    /// Looks up the keyword kind for an identifier-shaped word, if reserved.
    pub(crate) fn keyword_from_str(word: &str) -> Option<Self> {
        let kind = match word {
            "var" => Self::Var,
            "let" => Self::Let,
            "const" => Self::Const,
            "function" => Self::Function,
            "return" => Self::Return,
            "if" => Self::If,
            "else" => Self::Else,
            "for" => Self::For,
            "while" => Self::While,
            "do" => Self::Do,
            "switch" => Self::Switch,
            "case" => Self::Case,
            "default" => Self::Default,
            "break" => Self::Break,
            "continue" => Self::Continue,
            "try" => Self::Try,
            "catch" => Self::Catch,
            "finally" => Self::Finally,
            "throw" => Self::Throw,
            "new" => Self::New,
            "delete" => Self::Delete,
            "typeof" => Self::Typeof,
            "instanceof" => Self::Instanceof,
            "in" => Self::In,
            "of" => Self::Of,
            "null" => Self::Null,
            "true" => Self::True,
            "false" => Self::False,
            "this" => Self::This,
            _ => return None,
        };
        Some(kind)
    }
}

/// A single lexed token.
///
/// `text` holds the exact source characters the token covers, so that the
/// concatenation of all token texts reconstructs the source byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character in the source.
    pub start: u32,
    /// 0-indexed line of the first character.
    pub line: u32,
    /// 0-indexed column of the first character.
    pub col: u32,
    pub text: String,
}

impl Token {
    pub(crate) fn loc(&self) -> CodeLoc {
        CodeLoc::new(self.line, self.col)
    }
}
