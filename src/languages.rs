//! The built-in sub-languages and the default full language.
//!
//! Each builder returns a plain [`Language`] value: compose them with
//! [`new_language`], or use them directly. [`full`] is the union of all of
//! them plus `in`, `??`, the ternary `?:`, date comparison, and `date()`.

use std::sync::OnceLock;

use regex::Regex;

use crate::dates;
use crate::evaluator::{EvalError, Evaluable};
use crate::language::{
    constant, ident_prefix_extension, infix_bool_operator, infix_date_operator,
    infix_eval_operator, infix_number_operator, infix_operator, infix_short_circuit,
    infix_text_operator, new_language, postfix_operator, precedence, prefix_extension,
    prefix_operator, Language, PrefixKey,
};
use crate::parser::{identifier_root, ParseError};
use crate::value::Value;

/// Equality, inequality, parentheses, literals, the `true`/`false`
/// constants, the precedence table, and variable/function resolution for
/// identifiers.
///
/// `==` and `!=` carry a quirk worth knowing: when the left value is an
/// array, `a == b` is true iff any element of `a` equals `b`, and `a != b`
/// is true iff any element differs. Use `in` for the symmetric membership
/// test.
pub fn base() -> Language {
    new_language([
        prefix_extension(PrefixKey::Int, |p, t| p.parse_number_literal(t)),
        prefix_extension(PrefixKey::Float, |p, t| p.parse_number_literal(t)),
        prefix_operator("-", |_, v| match v.as_number() {
            Some(n) => Ok(Value::Number(-n)),
            None => Err(EvalError::Type(format!(
                "unexpected {} expected number",
                v.type_name()
            ))),
        }),
        prefix_extension(PrefixKey::Str, |p, t| p.parse_string_literal(t)),
        prefix_extension(PrefixKey::Char, |p, t| p.parse_string_literal(t)),
        prefix_extension(PrefixKey::RawStr, |p, t| p.parse_string_literal(t)),
        constant("true", true),
        constant("false", false),
        infix_operator("==", |a, b| match a {
            Value::Array(items) => Ok(Value::Boolean(items.iter().any(|x| *x == b))),
            _ => Ok(Value::Boolean(a == b)),
        }),
        infix_operator("!=", |a, b| match a {
            Value::Array(items) => Ok(Value::Boolean(items.iter().any(|x| *x != b))),
            _ => Ok(Value::Boolean(a != b)),
        }),
        prefix_extension(PrefixKey::Symbol("(".to_string()), |p, _| {
            p.parse_parenthesized()
        }),
        precedence("??", 0),
        precedence("||", 20),
        precedence("&&", 21),
        precedence("==", 40),
        precedence("!=", 40),
        precedence(">", 40),
        precedence(">=", 40),
        precedence("<", 40),
        precedence("<=", 40),
        precedence("=~", 40),
        precedence("!~", 40),
        precedence("in", 40),
        precedence("^", 60),
        precedence("&", 60),
        precedence("|", 60),
        precedence("<<", 90),
        precedence(">>", 90),
        precedence("+", 120),
        precedence("-", 120),
        precedence("*", 150),
        precedence("/", 150),
        precedence("%", 150),
        precedence("**", 200),
        ident_prefix_extension(|_, token| Ok(identifier_root(token))),
    ])
}

/// Base plus `+ - * / % **`, numeric ordering, and numeric equality.
///
/// Operands are coerced to doubles; strings that parse as numbers count.
pub fn arithmetic() -> Language {
    new_language([
        infix_number_operator("+", |a, b| Ok(Value::Number(a + b))),
        infix_number_operator("-", |a, b| Ok(Value::Number(a - b))),
        infix_number_operator("*", |a, b| Ok(Value::Number(a * b))),
        infix_number_operator("/", |a, b| Ok(Value::Number(a / b))),
        infix_number_operator("%", |a, b| Ok(Value::Number(a % b))),
        infix_number_operator("**", |a, b| Ok(Value::Number(a.powf(b)))),
        infix_number_operator(">", |a, b| Ok(Value::Boolean(a > b))),
        infix_number_operator(">=", |a, b| Ok(Value::Boolean(a >= b))),
        infix_number_operator("<", |a, b| Ok(Value::Boolean(a < b))),
        infix_number_operator("<=", |a, b| Ok(Value::Boolean(a <= b))),
        infix_number_operator("==", |a, b| Ok(Value::Boolean(a == b))),
        infix_number_operator("!=", |a, b| Ok(Value::Boolean(a != b))),
        base(),
    ])
}

/// Bitwise `^ & | << >>` and the `~` prefix, over operands coerced to
/// doubles and truncated to 64-bit integers.
pub fn bitmask() -> Language {
    new_language([
        infix_number_operator("^", |a, b| {
            Ok(Value::Number(((a as i64) ^ (b as i64)) as f64))
        }),
        infix_number_operator("&", |a, b| {
            Ok(Value::Number(((a as i64) & (b as i64)) as f64))
        }),
        infix_number_operator("|", |a, b| {
            Ok(Value::Number(((a as i64) | (b as i64)) as f64))
        }),
        infix_number_operator("<<", |a, b| {
            let shift = b as i64;
            let shifted = if (0..64).contains(&shift) {
                (a as i64) << shift
            } else {
                0
            };
            Ok(Value::Number(shifted as f64))
        }),
        infix_number_operator(">>", |a, b| {
            let shift = (b as i64).clamp(0, 63);
            Ok(Value::Number(((a as i64) >> shift) as f64))
        }),
        prefix_operator("~", |_, v| match v.as_number() {
            Some(n) => Ok(Value::Number(!(n as i64) as f64)),
            None => Err(EvalError::Type(format!(
                "unexpected {} expected number",
                v.type_name()
            ))),
        }),
    ])
}

/// Base plus string concatenation with `+`, lexical ordering, and the regex
/// match operators `=~` / `!~`.
pub fn text() -> Language {
    new_language([
        infix_text_operator("+", |a, b| Ok(Value::String(format!("{}{}", a, b)))),
        infix_text_operator("<", |a, b| Ok(Value::Boolean(a < b))),
        infix_text_operator("<=", |a, b| Ok(Value::Boolean(a <= b))),
        infix_text_operator(">", |a, b| Ok(Value::Boolean(a > b))),
        infix_text_operator(">=", |a, b| Ok(Value::Boolean(a >= b))),
        infix_eval_operator("=~", |a, b| regex_operator(a, b, false)),
        infix_eval_operator("!~", |a, b| regex_operator(a, b, true)),
        base(),
    ])
}

/// Base plus `!`, short-circuiting `&&` / `||`, and boolean equality, over
/// operands coerced to booleans.
pub fn propositional_logic() -> Language {
    new_language([
        prefix_operator("!", |_, v| match v.as_bool() {
            Some(b) => Ok(Value::Boolean(!b)),
            None => Err(EvalError::Type(format!(
                "unexpected {} expected bool",
                v.type_name()
            ))),
        }),
        infix_short_circuit("&&", |a| match a {
            Value::Boolean(false) => Some(Value::Boolean(false)),
            _ => None,
        }),
        infix_bool_operator("&&", |a, b| Ok(Value::Boolean(a && b))),
        infix_short_circuit("||", |a| match a {
            Value::Boolean(true) => Some(Value::Boolean(true)),
            _ => None,
        }),
        infix_bool_operator("||", |a, b| Ok(Value::Boolean(a || b))),
        infix_bool_operator("==", |a, b| Ok(Value::Boolean(a == b))),
        infix_bool_operator("!=", |a, b| Ok(Value::Boolean(a != b))),
        base(),
    ])
}

/// JSON array (`[expr, …]`) and object (`{key: expr, …}`) literals.
pub fn json() -> Language {
    new_language([
        prefix_extension(PrefixKey::Symbol("[".to_string()), |p, _| {
            p.parse_json_array()
        }),
        prefix_extension(PrefixKey::Symbol("{".to_string()), |p, _| {
            p.parse_json_object()
        }),
    ])
}

/// The union of all built-in languages, plus:
///
/// - `a in b`: true iff `b` is an array with an element equal to `a`
/// - `a ?? b`: `a` unless it is `false` or null, otherwise `b`
/// - `c ? t : e`: ternary, evaluating exactly one branch
/// - chronological `<`, `<=`, `>`, `>=` on dates
/// - `date(s)`: parse a string against a fixed list of well-known formats
///
/// Constructed once and shared.
pub fn full() -> Language {
    static FULL: OnceLock<Language> = OnceLock::new();
    FULL.get_or_init(|| {
        new_language([
            arithmetic(),
            bitmask(),
            text(),
            propositional_logic(),
            json(),
            infix_operator("in", |a, b| match b {
                Value::Array(items) => Ok(Value::Boolean(items.iter().any(|x| *x == a))),
                other => Err(EvalError::Type(format!(
                    "unexpected {} expected array",
                    other.type_name()
                ))),
            }),
            infix_short_circuit("??", |a| match a {
                Value::Boolean(false) | Value::Null => None,
                keep => Some(keep.clone()),
            }),
            infix_operator("??", |a, b| match a {
                Value::Boolean(false) | Value::Null => Ok(b),
                keep => Ok(keep),
            }),
            postfix_operator("?", |p, left| p.parse_ternary(left)),
            infix_date_operator("<", |a, b| Ok(Value::Boolean(a < b))),
            infix_date_operator("<=", |a, b| Ok(Value::Boolean(a <= b))),
            infix_date_operator(">", |a, b| Ok(Value::Boolean(a > b))),
            infix_date_operator(">=", |a, b| Ok(Value::Boolean(a >= b))),
            crate::language::function("date", |args| match args {
                [Value::String(s)] => match dates::parse_date(s) {
                    Some(parsed) => Ok(Value::Date(parsed)),
                    None => Err(EvalError::Function(format!("date() could not parse {}", s))),
                },
                _ => Err(EvalError::Function(
                    "date() expects exactly one string argument".to_string(),
                )),
            }),
        ])
    })
    .clone()
}

/// Builds the match node for `=~` / `!~`. A constant pattern is compiled at
/// parse time; a dynamic one is compiled on every evaluation. Compile
/// failures surface as function errors.
fn regex_operator(
    left: Evaluable,
    right: Evaluable,
    negate: bool,
) -> Result<Evaluable, ParseError> {
    let precompiled = if right.is_const() {
        right
            .eval_with(&Value::Null)
            .ok()
            .and_then(|pattern| Regex::new(&pattern.render()).ok())
    } else {
        None
    };
    Ok(Evaluable::new(move |ctx, param| {
        let subject = left.eval(ctx, param)?;
        let matched = match &precompiled {
            Some(re) => re.is_match(&subject.render()),
            None => {
                let pattern = right.eval(ctx, param)?;
                let re = Regex::new(&pattern.render()).map_err(|e| {
                    EvalError::Function(format!("could not compile pattern: {}", e))
                })?;
                re.is_match(&subject.render())
            }
        };
        Ok(Value::Boolean(matched != negate))
    }))
}
