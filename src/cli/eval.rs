//! Evaluate expressions against JSON parameters.

use super::CliError;
use crate::languages::full;
use crate::output::{to_json, to_json_pretty};
use crate::value::Value;

/// Options for the eval command
#[derive(Debug, Clone, Default)]
pub struct EvalOptions {
    /// The expression to evaluate
    pub expression: String,
    /// JSON parameter string; null when absent
    pub param: Option<String>,
    /// Pretty-print the output
    pub pretty: bool,
}

/// Evaluates an expression and returns the result rendered as JSON.
pub fn execute_eval(options: &EvalOptions) -> Result<String, CliError> {
    let parameter = match &options.param {
        Some(text) => {
            let json: serde_json::Value = serde_json::from_str(text).map_err(CliError::Json)?;
            Value::from(json)
        }
        None => Value::Null,
    };

    let result = full().evaluate(&options.expression, &parameter)?;

    Ok(if options.pretty {
        to_json_pretty(&result)
    } else {
        to_json(&result)
    })
}

/// Parses an expression without evaluating it.
pub fn execute_check(expression: &str) -> Result<(), CliError> {
    full()
        .new_evaluable(expression)
        .map(|_| ())
        .map_err(CliError::Parse)
}
