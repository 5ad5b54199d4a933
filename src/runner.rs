//! A Lox session: scan → parse → resolve → execute against one persistent
//! interpreter.
//!
//! Each call to [`Lox::run`] is one request (a whole file, or one REPL line)
//! and produces a [`RunReport`] listing what went wrong at each stage. The
//! session itself never prints diagnostics; hosts decide how to show them.

use std::io::Write;

use log::{debug, info};

use crate::error::LoxError;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::scan_tokens;
use crate::value::Value;

/// Exit status for command line misuse (missing or unknown arguments).
pub const EXIT_USAGE: i32 = 64;

/// Exit status for static (lexical, syntax, binding) failures.
pub const EXIT_STATIC_ERROR: i32 = 65;

/// Exit status for runtime failures.
pub const EXIT_RUNTIME_ERROR: i32 = 70;

/// Outcome of one [`Lox::run`] request.
#[derive(Debug, Default)]
pub struct RunReport {
    pub lex_errors: Vec<LoxError>,
    pub parse_errors: Vec<LoxError>,
    pub resolve_errors: Vec<LoxError>,
    pub runtime_error: Option<LoxError>,
}

impl RunReport {
    /// Any lexical, syntax or binding error.
    pub fn had_error(&self) -> bool {
        !(self.lex_errors.is_empty() && self.parse_errors.is_empty() && self.resolve_errors.is_empty())
    }

    pub fn had_runtime_error(&self) -> bool {
        self.runtime_error.is_some()
    }

    /// 65 for static errors, 70 for a runtime error, 0 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.had_error() {
            EXIT_STATIC_ERROR
        } else if self.had_runtime_error() {
            EXIT_RUNTIME_ERROR
        } else {
            0
        }
    }

    /// Every diagnostic in stage order.
    pub fn errors(&self) -> impl Iterator<Item = &LoxError> {
        self.lex_errors
            .iter()
            .chain(&self.parse_errors)
            .chain(&self.resolve_errors)
            .chain(&self.runtime_error)
    }
}

/// Outcome of one [`Lox::evaluate`] request.
#[derive(Debug, Default)]
pub struct EvalReport {
    pub value: Option<Value>,
    pub static_errors: Vec<LoxError>,
    pub runtime_error: Option<LoxError>,
}

impl EvalReport {
    pub fn exit_code(&self) -> i32 {
        if !self.static_errors.is_empty() {
            EXIT_STATIC_ERROR
        } else if self.runtime_error.is_some() {
            EXIT_RUNTIME_ERROR
        } else {
            0
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = &LoxError> {
        self.static_errors.iter().chain(&self.runtime_error)
    }
}

/// Interpreter session. Globals, resolution entries and the expression id
/// counter persist across requests.
pub struct Lox {
    interpreter: Interpreter,
    next_expr_id: usize,
}

impl Default for Lox {
    fn default() -> Self {
        Self::new()
    }
}

impl Lox {
    /// Session printing to stdout.
    pub fn new() -> Self {
        Self::from_interpreter(Interpreter::new())
    }

    /// Session whose `print` output goes to `out`.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        Self::from_interpreter(Interpreter::with_output(out))
    }

    fn from_interpreter(interpreter: Interpreter) -> Self {
        info!("Lox session started");

        Self {
            interpreter,
            next_expr_id: 0,
        }
    }

    /// Run `source` as a program. Lexical and syntax errors are both
    /// reported; either one skips resolution and execution. Binding errors
    /// skip execution.
    pub fn run(&mut self, source: &str) -> RunReport {
        let mut report = RunReport::default();

        let (tokens, lex_errors) = scan_tokens(source);
        report.lex_errors = lex_errors;

        let mut parser = Parser::new(&tokens).starting_at(self.next_expr_id);
        let (statements, parse_errors) = parser.parse();
        self.next_expr_id = parser.next_id();
        report.parse_errors = parse_errors;

        if report.had_error() {
            debug!("Static errors before resolution, skipping execution");
            return report;
        }

        report.resolve_errors = Resolver::new(&mut self.interpreter).resolve(&statements);

        if report.had_error() {
            debug!("Binding errors, skipping execution");
            return report;
        }

        if let Err(e) = self.interpreter.interpret(&statements) {
            debug!("Runtime error: {}", e);
            report.runtime_error = Some(e);
        }

        report
    }

    /// Evaluate `source` as a single expression and hand back its value.
    pub fn evaluate(&mut self, source: &str) -> EvalReport {
        let mut report = EvalReport::default();

        let (tokens, lex_errors) = scan_tokens(source);
        report.static_errors = lex_errors;

        let mut parser = Parser::new(&tokens).starting_at(self.next_expr_id);
        let (expr, parse_errors) = parser.parse_expression();
        self.next_expr_id = parser.next_id();
        report.static_errors.extend(parse_errors);

        let Some(expr) = expr else {
            return report;
        };

        if !report.static_errors.is_empty() {
            return report;
        }

        report.static_errors = Resolver::new(&mut self.interpreter).resolve_expression(&expr);

        if !report.static_errors.is_empty() {
            return report;
        }

        match self.interpreter.evaluate(&expr) {
            Ok(value) => report.value = Some(value),
            Err(e) => report.runtime_error = Some(e),
        }

        report
    }
}
