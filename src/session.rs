//! One interpreter's lifetime: a file run, or a whole REPL conversation.
//!
//! Each call to [`Session::run`] pushes source text through
//! scan → parse → resolve → interpret.  Static problems (lexical, syntax,
//! resolution) are gathered together and stop the run before anything
//! executes; a runtime error stops the remaining statements of that run.
//! Either way the session survives: globals defined by earlier runs stay
//! visible to later ones.

use std::fmt;
use std::io::{Stdout, Write};

use log::{debug, info};

use crate::ast::{Expr, ExprId, Stmt};
use crate::error::LoxError;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::{Locals, Resolver};
use crate::scanner::Scanner;
use crate::token::Token;
use crate::value::Value;

/// Exit status for lexical, syntax, or resolution errors.
pub const EXIT_STATIC_ERROR: i32 = 65;

/// Exit status for runtime errors.
pub const EXIT_RUNTIME_ERROR: i32 = 70;

/// Why a run did not complete.
#[derive(Debug)]
pub enum RunError {
    /// Nothing was executed.  Holds every diagnostic, in source order per phase.
    Static(Vec<LoxError>),

    /// Execution started and was cut short.
    Runtime(LoxError),
}

impl RunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Static(_) => EXIT_STATIC_ERROR,
            RunError::Runtime(_) => EXIT_RUNTIME_ERROR,
        }
    }

    /// Every diagnostic carried, in reporting order.
    pub fn diagnostics(&self) -> Vec<&LoxError> {
        match self {
            RunError::Static(errors) => errors.iter().collect(),
            RunError::Runtime(error) => vec![error],
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.diagnostics().iter().map(|e| e.to_string()).collect();
        f.write_str(&lines.join("\n"))
    }
}

impl std::error::Error for RunError {}

pub struct Session<W: Write = Stdout> {
    interpreter: Interpreter<W>,
    next_id: ExprId,
}

impl Session<Stdout> {
    pub fn new() -> Self {
        Self::with_interpreter(Interpreter::new())
    }
}

impl Default for Session<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Session<W> {
    /// Session whose program output goes to `out`.
    pub fn with_output(out: W) -> Self {
        Self::with_interpreter(Interpreter::with_output(out))
    }

    fn with_interpreter(interpreter: Interpreter<W>) -> Self {
        info!("Session started");

        Self {
            interpreter,
            next_id: ExprId(0),
        }
    }

    pub fn output(&self) -> &W {
        self.interpreter.output()
    }

    /// Run a complete program.
    pub fn run(&mut self, source: &str) -> Result<(), RunError> {
        info!("Running {} byte(s) of source", source.len());

        let statements: Vec<Stmt> = self.parse_program(source)?;
        let locals: Locals = Resolver::new()
            .resolve(&statements)
            .map_err(RunError::Static)?;

        self.interpreter.resolve(locals);
        self.interpreter
            .interpret(&statements)
            .map_err(RunError::Runtime)?;

        info!("Run finished");
        Ok(())
    }

    /// Evaluate a single expression and return its value.
    pub fn evaluate(&mut self, source: &str) -> Result<Value, RunError> {
        info!("Evaluating expression of {} byte(s)", source.len());

        let (tokens, mut errors) = Scanner::new(source).scan_all();
        let mut parser = Parser::new(tokens).with_first_id(self.next_id);
        let parsed = parser.parse_expression();
        self.next_id = parser.next_id();

        let expr: Expr = merge(parsed, &mut errors)?;
        let locals: Locals = Resolver::new()
            .resolve_expression(&expr)
            .map_err(RunError::Static)?;

        self.interpreter.resolve(locals);
        self.interpreter.evaluate(&expr).map_err(RunError::Runtime)
    }

    /// Scan and parse without running.  Lexical and syntax errors are
    /// reported together.
    pub fn parse_program(&mut self, source: &str) -> Result<Vec<Stmt>, RunError> {
        let (tokens, mut errors): (Vec<Token>, Vec<LoxError>) = Scanner::new(source).scan_all();

        let mut parser = Parser::new(tokens).with_first_id(self.next_id);
        let parsed = parser.parse();
        self.next_id = parser.next_id();

        debug!("Next expression id is {}", self.next_id);

        merge(parsed, &mut errors)
    }
}

/// Combine scanner errors with the parse outcome.
fn merge<T>(
    parsed: Result<T, Vec<LoxError>>,
    scan_errors: &mut Vec<LoxError>,
) -> Result<T, RunError> {
    match parsed {
        Ok(value) if scan_errors.is_empty() => Ok(value),
        Ok(_) => Err(RunError::Static(std::mem::take(scan_errors))),
        Err(parse_errors) => {
            scan_errors.extend(parse_errors);
            Err(RunError::Static(std::mem::take(scan_errors)))
        }
    }
}
