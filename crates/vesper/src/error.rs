//! Public error types surfaced by the engine.
//!
//! Two families of failure exist:
//! - lexical/syntactic errors, which abort evaluation before any code runs,
//! - runtime errors (reference, type, thrown values), which travel through the
//!   evaluator as a throw flag and are only wrapped into an [`Exception`] if
//!   they reach the program root uncaught.

use std::fmt;

use strum::{Display, EnumString, IntoStaticStr};

/// A position in the source text.
///
/// Line and column are stored 0-indexed; the display form is 1-indexed
/// (`[line+1:col+1]`), which is what appears in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct CodeLoc {
    /// 0-indexed line number.
    pub line: u32,
    /// 0-indexed column number.
    pub col: u32,
}

impl CodeLoc {
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for CodeLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}]", self.line + 1, self.col + 1)
    }
}

/// Classification of a user-visible error.
///
/// The string form matches the `name` property of the corresponding error
/// object inside the interpreter (e.g. `TypeError` -> "TypeError").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, serde::Serialize, serde::Deserialize)]
pub enum ExceptionKind {
    /// Lexical or syntactic error: unknown character, unterminated string or
    /// template, unexpected token, missing terminator, excessive recursion.
    SyntaxError,
    /// Reading an unbound name outside `typeof`.
    ReferenceError,
    /// Calling a non-function, reading a property of null/undefined, bad
    /// operand for an operator.
    TypeError,
    /// Resource exhaustion, e.g. call depth.
    RangeError,
    /// A value thrown by user code, or a plain runtime error.
    Error,
}

/// An error raised to the host: either a parse failure or an uncaught throw.
///
/// Carries the position where the failure was detected and, when available,
/// the offending source line for context.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Exception {
    kind: ExceptionKind,
    message: String,
    loc: Option<CodeLoc>,
    source_line: Option<String>,
}

impl Exception {
    pub(crate) fn new(kind: ExceptionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            loc: None,
            source_line: None,
        }
    }

    pub(crate) fn at(kind: ExceptionKind, message: impl Into<String>, loc: CodeLoc) -> Self {
        Self {
            kind,
            message: message.into(),
            loc: Some(loc),
            source_line: None,
        }
    }

    /// Attaches the offending source line, extracted from the full source by
    /// the location's line number. A no-op if the location is unset.
    pub(crate) fn with_source(mut self, source: &str) -> Self {
        if let Some(loc) = self.loc {
            self.source_line = source.lines().nth(loc.line as usize).map(str::to_owned);
        }
        self
    }

    pub fn kind(&self) -> ExceptionKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The position where the error was detected, if known.
    pub fn loc(&self) -> Option<CodeLoc> {
        self.loc
    }

    /// The source line containing the error, if it could be extracted.
    pub fn source_line(&self) -> Option<&str> {
        self.source_line.as_deref()
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(loc) = self.loc {
            write!(f, " {loc}")?;
        }
        if let Some(line) = &self.source_line {
            write!(f, "\n  {}", line.trim_end())?;
        }
        Ok(())
    }
}

impl std::error::Error for Exception {}
