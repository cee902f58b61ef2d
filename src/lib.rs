//! lingo is a composable expression language kernel.
//!
//! Expressions are parsed against a [`Language`] — an immutable bundle of
//! parser and evaluator dispatch tables — into reusable [`Evaluable`] trees,
//! then evaluated against a host-supplied parameter value:
//!
//! ```
//! use lingo::Value;
//!
//! let result = lingo::evaluate("1 + 2 * 3", &Value::Null).unwrap();
//! assert_eq!(result, Value::Number(7.0));
//! ```
//!
//! Languages compose: the default [`full`] language is itself a union of
//! smaller ones (arithmetic, bitmask, text, propositional logic, JSON
//! literals), and hosts extend it the same way:
//!
//! ```
//! use lingo::{function, Value};
//!
//! let shout = function("shout", |args| {
//!     Ok(Value::String(args[0].render().to_uppercase()))
//! });
//! let result = lingo::evaluate_with("shout('ada')", &Value::Null, &[shout]).unwrap();
//! assert_eq!(result, Value::String("ADA".to_string()));
//! ```

pub mod cli;
mod dates;
pub mod evaluator;
pub mod language;
pub mod languages;
pub mod lexer;
pub mod output;
pub mod parser;
pub mod value;

pub use evaluator::{CancelHandle, Context, EvalError, Evaluable};
pub use language::{
    constant, function, ident_prefix_extension, infix_bool_operator, infix_date_operator,
    infix_eval_operator, infix_number_operator, infix_operator, infix_short_circuit,
    infix_text_operator, new_language, postfix_operator, precedence, prefix_extension,
    prefix_operator, Language, PrefixKey,
};
pub use languages::{arithmetic, base, bitmask, full, json, propositional_logic, text};
pub use lexer::{LexError, Lexer, Token, TokenKind};
pub use output::{to_json, to_json_pretty};
pub use parser::{ParseError, Parser};
pub use value::{Introspect, NativeFn, Value};

/// The first error encountered while parsing or evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Parsing failed; nothing was evaluated
    Parse(ParseError),
    /// Evaluation failed; the whole expression is aborted
    Eval(EvalError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Parse(e) => write!(f, "{}", e),
            Error::Eval(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse(e) => Some(e),
            Error::Eval(e) => Some(e),
        }
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error::Parse(e)
    }
}

impl From<EvalError> for Error {
    fn from(e: EvalError) -> Self {
        Error::Eval(e)
    }
}

/// Evaluates `expression` against `parameter` in the [`full`] language.
pub fn evaluate(expression: &str, parameter: &Value) -> Result<Value, Error> {
    full().evaluate(expression, parameter)
}

/// Evaluates `expression` against `parameter` in the [`full`] language
/// extended by `extensions`, later extensions overriding earlier ones.
pub fn evaluate_with(
    expression: &str,
    parameter: &Value,
    extensions: &[Language],
) -> Result<Value, Error> {
    if extensions.is_empty() {
        return evaluate(expression, parameter);
    }
    let language = new_language(std::iter::once(full()).chain(extensions.iter().cloned()));
    language.evaluate(expression, parameter)
}
