//! `rpal-lang` is an interpreter for RPAL (Right-reference Pedagogic
//! Algorithmic Language), a small applicative-order functional language used
//! to teach programming-language implementation.
//!
//! ## Scanning
//! The first step is scanning: turning the source text into a flat list of
//! tokens. The scanner is implemented in the [`scanner`](scanner) module over
//! a peekable character iterator, and reports malformed tokens as a
//! [`LexError`](error::LexError) as soon as they're found.
//!
//! ## Parsing
//! The token list is turned into an [`Ast`](ast::Ast) by a hand-written
//! recursive-descent parser in the [`parser`](parser) module, following
//! RPAL's published grammar directly: one rule per non-terminal. A grammar
//! violation is reported as a [`ParseError`](error::ParseError).
//!
//! ## Standardizing
//! RPAL's semantics are defined over a Standardized Tree (ST) in which the
//! only binder is `lambda` — `let`, `where`, `within`, `and` and `rec` are
//! all rewritten away before evaluation. This rewrite is implemented in
//! [`standardize`](standardize) and produces the [`St`](st::St) tree
//! evaluated by the CSE machine.
//!
//! ## Evaluating
//! [`cse`](cse) implements the Control/Stack/Environment abstract machine
//! that reduces a standardized tree to a [`Value`](value::Value). Unlike the
//! AST/ST stages, most failures here are genuine runtime conditions — an
//! unbound name, a type mismatch, a division by zero — reported as a
//! [`RuntimeError`](error::RuntimeError).

use std::fs;
use std::io::{self, Write};
use std::process;

pub mod ast;
pub mod builtins;
pub mod cse;
pub mod environment;
pub mod error;
pub mod parser;
pub mod scanner;
pub mod standardize;
pub mod st;
pub mod token;
pub mod value;

use ast::Ast;
use cse::Machine;
use error::Error;
use parser::Parser;
use scanner::Scanner;
use value::Value;

/// What a driver invocation should do with a successfully parsed program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Print the AST (pre-standardization) and stop.
    PrintAst,
    /// Print the standardized tree and stop.
    PrintSt,
    /// Run the program through the CSE machine.
    Run,
}

#[allow(non_camel_case_types)]
pub struct rpal;

impl rpal {
    pub fn new() -> Self {
        rpal
    }

    /// Reads `path`, runs it in `mode`, and exits the process with RPAL's
    /// exit-code convention: 0 on success, 65 on a scan/parse/standardize
    /// error, 70 on a runtime error.
    pub fn run_file(&mut self, path: &str, mode: RunMode) {
        let contents = fs::read_to_string(path).unwrap_or_else(|e| {
            eprintln!("could not read '{path}': {e}");
            process::exit(65);
        });

        let mut stdout = io::stdout();
        self.run(&contents, mode, &mut stdout);

        if error::did_runtime_error() {
            process::exit(70);
        }
        if error::did_error() {
            process::exit(65);
        }
    }

    /// Runs `source` in `mode`, writing `Print` output to `out`. Returns the
    /// final value on success, or `None` if a scan/parse/standardize/runtime
    /// error was thrown along the way (the error itself is already printed
    /// to stderr via [`Error::throw`]).
    pub fn run(&mut self, source: &str, mode: RunMode, out: &mut dyn Write) -> Option<Value> {
        error::reset_error();

        let ast = self.parse(source)?;

        if mode == RunMode::PrintAst {
            writeln!(out, "{}", ast.print_tree()).ok();
            return None;
        }

        let st = match standardize::standardize(&ast) {
            Ok(st) => st,
            Err(e) => {
                e.throw();
                return None;
            }
        };

        if mode == RunMode::PrintSt {
            writeln!(out, "{}", st.print_tree()).ok();
            return None;
        }

        let mut machine = Machine::new(out);
        match machine.run(&std::rc::Rc::new(st)) {
            Ok(value) => Some(value),
            Err(e) => {
                e.throw();
                None
            }
        }
    }

    fn parse(&mut self, source: &str) -> Option<Ast> {
        let tokens = Scanner::new(source).scan_tokens();
        if error::did_error() {
            return None;
        }

        match Parser::new(tokens).parse() {
            Ok(ast) => Some(ast),
            Err(e) => {
                e.throw();
                None
            }
        }
    }
}

impl Default for rpal {
    fn default() -> Self {
        Self::new()
    }
}
