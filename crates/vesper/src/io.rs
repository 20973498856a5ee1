//! Output sink for the `console` builtin.
//!
//! Implement [`ConsoleWriter`] to capture or redirect console output from
//! evaluated code. The default [`StdConsole`] writes to stdout/stderr.

use std::{
    cell::RefCell,
    io::{self, Write as _},
    rc::Rc,
};

/// Severity tag forwarded with each console line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Log,
    Warn,
    Error,
}

/// Trait for handling `console.log`/`console.warn`/`console.error` output.
///
/// The engine space-joins the stringified arguments before calling; `line`
/// carries no trailing newline.
pub trait ConsoleWriter {
    fn write_line(&mut self, level: ConsoleLevel, line: &str);
}

/// Default writer: `Log` goes to stdout, `Warn` and `Error` to stderr.
#[derive(Debug, Default)]
pub struct StdConsole;

impl ConsoleWriter for StdConsole {
    fn write_line(&mut self, level: ConsoleLevel, line: &str) {
        match level {
            ConsoleLevel::Log => {
                let mut out = io::stdout().lock();
                let _ = writeln!(out, "{line}");
            }
            ConsoleLevel::Warn | ConsoleLevel::Error => {
                let mut err = io::stderr().lock();
                let _ = writeln!(err, "{line}");
            }
        }
    }
}

/// Writer that collects all output into a shared string buffer, one line per
/// call. Useful in tests and hosts that surface script logs elsewhere.
#[derive(Debug, Default, Clone)]
pub struct CollectStringConsole {
    buffer: Rc<RefCell<String>>,
}

impl CollectStringConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle to the shared buffer; keep a clone before handing the writer
    /// to the engine.
    pub fn handle(&self) -> Self {
        self.clone()
    }

    pub fn contents(&self) -> String {
        self.buffer.borrow().clone()
    }

    pub fn clear(&self) {
        self.buffer.borrow_mut().clear();
    }
}

impl ConsoleWriter for CollectStringConsole {
    fn write_line(&mut self, _level: ConsoleLevel, line: &str) {
        let mut buffer = self.buffer.borrow_mut();
        buffer.push_str(line);
        buffer.push('\n');
    }
}
