use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::token::{Kind, Token};

static HAD_ERROR: AtomicBool = AtomicBool::new(false);
static HAD_RUNTIME_ERROR: AtomicBool = AtomicBool::new(false);

/// Checks if an error occurred during scanning, parsing or standardizing.
pub fn did_error() -> bool {
    HAD_ERROR.load(Ordering::SeqCst) || HAD_RUNTIME_ERROR.load(Ordering::SeqCst)
}

/// Checks if an error occurred while the CSE machine was running.
pub fn did_runtime_error() -> bool {
    HAD_RUNTIME_ERROR.load(Ordering::SeqCst)
}

/// Resets both error flags. Used between successive runs in the same process.
pub fn reset_error() {
    HAD_ERROR.store(false, Ordering::SeqCst);
    HAD_RUNTIME_ERROR.store(false, Ordering::SeqCst);
}

/// Every error type must implement this trait.
pub trait Error {
    /// Prints a single-line diagnostic and sets the appropriate error flag.
    fn throw(&self);
}

/// Raised by the scanner: a malformed token or an unterminated literal.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl Error for LexError {
    fn throw(&self) {
        eprintln!("[line {}:{}] LexError: {}", self.line, self.column, self.message);
        HAD_ERROR.store(true, Ordering::SeqCst);
    }
}

/// Raised by the parser: a token mismatch or a grammar violation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub token: Token,
    pub message: String,
}

impl Error for ParseError {
    fn throw(&self) {
        if self.token.kind == Kind::EndOfFile {
            eprintln!(
                "[line {}:{}] ParseError at end: {}",
                self.token.location.line, self.token.location.column, self.message
            );
        } else {
            eprintln!(
                "[line {}:{}] ParseError at '{}': {}",
                self.token.location.line, self.token.location.column, self.token.lexeme, self.message
            );
        }
        HAD_ERROR.store(true, Ordering::SeqCst);
    }
}

/// Raised by the standardizer when the AST violates an invariant the parser
/// is supposed to guarantee. Should be unreachable in practice.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardizeError {
    pub message: String,
}

impl Error for StandardizeError {
    fn throw(&self) {
        eprintln!("StandardizeError: {}", self.message);
        HAD_ERROR.store(true, Ordering::SeqCst);
    }
}

/// The specific kind of failure raised by the CSE machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    UnboundIdentifier,
    TypeError,
    ArityError,
    IndexError,
    DivByZero,
    BuiltinError,
}

impl fmt::Display for RuntimeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuntimeErrorKind::UnboundIdentifier => "UnboundIdentifier",
            RuntimeErrorKind::TypeError => "TypeError",
            RuntimeErrorKind::ArityError => "ArityError",
            RuntimeErrorKind::IndexError => "IndexError",
            RuntimeErrorKind::DivByZero => "DivByZero",
            RuntimeErrorKind::BuiltinError => "BuiltinError",
        };
        write!(f, "{name}")
    }
}

/// Raised while the CSE machine is reducing the control/stack.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub message: String,
    /// A short trace of control markers active when the error was raised.
    pub trace: Vec<String>,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, message: impl Into<String>) -> Self {
        RuntimeError { kind, message: message.into(), trace: Vec::new() }
    }

    pub fn with_trace(mut self, trace: Vec<String>) -> Self {
        self.trace = trace;
        self
    }
}

impl Error for RuntimeError {
    fn throw(&self) {
        eprintln!("RuntimeError[{}]: {}", self.kind, self.message);
        if !self.trace.is_empty() {
            eprintln!("  trace: {}", self.trace.join(" -> "));
        }
        HAD_RUNTIME_ERROR.store(true, Ordering::SeqCst);
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for RuntimeError {}
