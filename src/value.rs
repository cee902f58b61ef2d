use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, SecondsFormat};
use indexmap::IndexMap;

use crate::evaluator::EvalError;

/// Signature of a host-injected function.
///
/// Receives the evaluated arguments in order and returns a value or an
/// evaluation error.
pub type NativeFn = Arc<dyn Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync>;

/// Member access for host types the engine does not model directly.
///
/// A value the engine cannot represent as one of its own shapes can still
/// travel through an expression wrapped as [`Value::Foreign`]: it compares by
/// identity and resolves selector steps through this trait.
pub trait Introspect: Send + Sync {
    /// Resolve a named member, e.g. the `zip` in `addr.zip`.
    fn member(&self, name: &str) -> Option<Value>;

    /// Resolve a computed numeric index, e.g. the `0` in `addr[0]`.
    fn index(&self, index: usize) -> Option<Value> {
        let _ = index;
        None
    }

    /// Human-readable type name used in error messages.
    fn type_name(&self) -> &'static str {
        "foreign value"
    }
}

/// A dynamically typed value flowing through expression evaluation.
///
/// Parameters, literals, and results all share this representation. Numbers
/// are IEEE-754 doubles; objects preserve insertion order.
#[derive(Clone)]
pub enum Value {
    /// Absent / JSON null
    Null,

    /// Boolean (true/false)
    Boolean(bool),

    /// Number (IEEE-754 double)
    Number(f64),

    /// UTF-8 string
    String(String),

    /// Ordered sequence of values
    Array(Vec<Value>),

    /// Mapping from string keys to values, in insertion order
    Object(IndexMap<String, Value>),

    /// Point in time, as produced by the `date()` function
    Date(DateTime<FixedOffset>),

    /// Host-injected callable
    Function(NativeFn),

    /// Opaque host value, accessible through [`Introspect`]
    Foreign(Arc<dyn Introspect>),
}

impl Value {
    /// Returns a human-readable type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Date(_) => "date",
            Value::Function(_) => "function",
            Value::Foreign(f) => f.type_name(),
        }
    }

    /// Coerces to a number.
    ///
    /// Numbers pass through; booleans map to 1 and 0; strings are parsed as
    /// decimal, scientific, `0x` hex, or `0o` octal. Everything else is not
    /// a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Boolean(true) => Some(1.0),
            Value::Boolean(false) => Some(0.0),
            Value::String(s) => parse_number_str(s),
            _ => None,
        }
    }

    /// Coerces to a boolean.
    ///
    /// Booleans pass through; numbers other than 0 are true; the strings
    /// `"true"`/`"TRUE"` and `"false"`/`"FALSE"` convert. Everything else is
    /// not a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            Value::Number(n) => Some(*n != 0.0),
            Value::String(s) => match s.as_str() {
                "true" | "TRUE" => Some(true),
                "false" | "FALSE" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Default printable rendering.
    ///
    /// Whole numbers print without a fractional part, dates as RFC 3339,
    /// arrays and objects as compact JSON.
    pub fn render(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
            Value::Array(_) | Value::Object(_) => crate::output::to_json(self),
            Value::Date(d) => d.to_rfc3339_opts(SecondsFormat::Secs, true),
            Value::Function(_) => "<function>".to_string(),
            Value::Foreign(f) => format!("<{}>", f.type_name()),
        }
    }
}

/// Formats a double the way expression output expects: `7`, not `7.0`.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Parses the numeric notations accepted by both literals and string
/// coercion: decimal, scientific, `0x` hex, and `0o` octal.
pub(crate) fn parse_number_str(s: &str) -> Option<f64> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).ok().map(|n| n as f64);
    }
    if let Some(oct) = s.strip_prefix("0o").or_else(|| s.strip_prefix("0O")) {
        return i64::from_str_radix(oct, 8).ok().map(|n| n as f64);
    }
    s.parse::<f64>().ok()
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::Foreign(a), Value::Foreign(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Boolean(b) => write!(f, "Boolean({})", b),
            Value::Number(n) => write!(f, "Number({})", n),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Array(a) => f.debug_tuple("Array").field(a).finish(),
            Value::Object(o) => {
                let mut map = f.debug_map();
                for (k, v) in o {
                    map.entry(k, v);
                }
                map.finish()
            }
            Value::Date(d) => write!(f, "Date({})", d.to_rfc3339()),
            Value::Function(_) => write!(f, "Function(<native>)"),
            Value::Foreign(v) => write!(f, "Foreign(<{}>)", v.type_name()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => {
                Value::Array(arr.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(obj) => {
                Value::Object(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(b),
            Value::Number(n) => serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
            Value::Array(arr) => {
                serde_json::Value::Array(arr.into_iter().map(serde_json::Value::from).collect())
            }
            Value::Object(obj) => serde_json::Value::Object(
                obj.into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect(),
            ),
            Value::Date(d) => serde_json::Value::String(d.to_rfc3339()),
            Value::Function(_) | Value::Foreign(_) => serde_json::Value::Null,
        }
    }
}
