//! CLI support for lingo.
//!
//! Provides programmatic access to the CLI functionality for embedding in
//! other tools.

mod eval;

pub use eval::{execute_check, execute_eval, EvalOptions};

use std::io;

use crate::evaluator::EvalError;
use crate::parser::ParseError;

/// Errors that can occur during CLI operations
#[derive(Debug)]
pub enum CliError {
    /// Parser error
    Parse(ParseError),
    /// Evaluation error
    Eval(EvalError),
    /// JSON parameter parsing error
    Json(serde_json::Error),
    /// IO error
    Io(io::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Parse(e) => write!(f, "Parse error: {}", e),
            CliError::Eval(e) => write!(f, "Evaluation error: {}", e),
            CliError::Json(e) => write!(f, "Invalid JSON parameter: {}", e),
            CliError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Parse(e) => Some(e),
            CliError::Eval(e) => Some(e),
            CliError::Json(e) => Some(e),
            CliError::Io(e) => Some(e),
        }
    }
}

impl From<crate::Error> for CliError {
    fn from(e: crate::Error) -> Self {
        match e {
            crate::Error::Parse(parse) => CliError::Parse(parse),
            crate::Error::Eval(eval) => CliError::Eval(eval),
        }
    }
}
