use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};

use crate::evaluator::{Context, EvalError, Evaluable};
use crate::lexer::{Lexer, Token};
use crate::parser::{ParseError, Parser};
use crate::value::{NativeFn, Value};

/// Parses a sub-expression that starts with the trigger token.
///
/// The trigger (a literal, an assembled operator symbol, or an identifier)
/// has already been consumed when the handler runs; the handler parses any
/// remaining tokens it needs through the parser handle.
pub type PrefixHandler =
    Arc<dyn Fn(&mut Parser<'_>, &Token) -> Result<Evaluable, ParseError> + Send + Sync>;

/// Transforms an already-parsed left operand into a new evaluable.
pub type PostfixHandler =
    Arc<dyn Fn(&mut Parser<'_>, Evaluable) -> Result<Evaluable, ParseError> + Send + Sync>;

/// Builds an evaluable from the two raw operand evaluables at parse time.
pub type LazyInfixHandler =
    Arc<dyn Fn(Evaluable, Evaluable) -> Result<Evaluable, ParseError> + Send + Sync>;

/// Evaluates a prefix operator applied to its operand value.
pub type PrefixOpFn = Arc<dyn Fn(&Context, Value) -> Result<Value, EvalError> + Send + Sync>;

/// Evaluates an infix operator on two arbitrary values.
pub type InfixOpFn = Arc<dyn Fn(Value, Value) -> Result<Value, EvalError> + Send + Sync>;

/// Decides from the left value alone whether evaluation can stop, and with
/// what result.
pub type ShortCircuitFn = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

type NumberOpFn = Arc<dyn Fn(f64, f64) -> Result<Value, EvalError> + Send + Sync>;
type TextOpFn = Arc<dyn Fn(&str, &str) -> Result<Value, EvalError> + Send + Sync>;
type BoolOpFn = Arc<dyn Fn(bool, bool) -> Result<Value, EvalError> + Send + Sync>;
type DateOpFn = Arc<
    dyn Fn(DateTime<FixedOffset>, DateTime<FixedOffset>) -> Result<Value, EvalError> + Send + Sync,
>;

/// Key into a language's prefix table.
///
/// Literal tokens dispatch on their kind, operators and named identifiers
/// (constants, functions) on their text, and any other identifier falls back
/// to the [`PrefixKey::Ident`] meta entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PrefixKey {
    /// Integer literal token
    Int,
    /// Float literal token
    Float,
    /// String literal token
    Str,
    /// Char literal token
    Char,
    /// Raw string literal token
    RawStr,
    /// An operator symbol (`(`, `-`, `[`, …) or a specific identifier
    Symbol(String),
    /// Any identifier without a [`PrefixKey::Symbol`] entry of its own
    Ident,
}

/// Everything a language knows about one operator symbol.
///
/// Typed slots let several meanings share a symbol: evaluation dispatches on
/// the shape of the operands and falls through to the `arbitrary` slot. Union
/// merges entries field by field, so a part that only sets precedence or a
/// short-circuit predicate relayers an operator without replacing it.
#[derive(Clone, Default)]
pub(crate) struct Operator {
    pub(crate) precedence: Option<i32>,
    pub(crate) number: Option<NumberOpFn>,
    pub(crate) text: Option<TextOpFn>,
    pub(crate) boolean: Option<BoolOpFn>,
    pub(crate) date: Option<DateOpFn>,
    pub(crate) arbitrary: Option<InfixOpFn>,
    pub(crate) lazy: Option<LazyInfixHandler>,
    pub(crate) short_circuit: Option<ShortCircuitFn>,
    pub(crate) postfix: Option<PostfixHandler>,
}

fn take_over<T: Clone>(slot: &mut Option<T>, other: &Option<T>) {
    if other.is_some() {
        *slot = other.clone();
    }
}

impl Operator {
    fn merge(&mut self, other: &Operator) {
        take_over(&mut self.precedence, &other.precedence);
        take_over(&mut self.number, &other.number);
        take_over(&mut self.text, &other.text);
        take_over(&mut self.boolean, &other.boolean);
        take_over(&mut self.date, &other.date);
        take_over(&mut self.arbitrary, &other.arbitrary);
        take_over(&mut self.lazy, &other.lazy);
        take_over(&mut self.short_circuit, &other.short_circuit);
        take_over(&mut self.postfix, &other.postfix);
    }

    /// Whether this entry can be parsed as a strict infix operator.
    pub(crate) fn has_infix(&self) -> bool {
        self.number.is_some()
            || self.text.is_some()
            || self.boolean.is_some()
            || self.date.is_some()
            || self.arbitrary.is_some()
    }

    /// Applies the operator to two evaluated operands, dispatching on their
    /// shape: numbers (coercing), dates, strings, booleans (coercing), then
    /// the arbitrary fallback.
    pub(crate) fn apply(&self, symbol: &str, a: Value, b: Value) -> Result<Value, EvalError> {
        if let Some(f) = &self.number {
            if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
                return f(x, y);
            }
        }
        if let Some(f) = &self.date {
            if let (Value::Date(x), Value::Date(y)) = (&a, &b) {
                return f(*x, *y);
            }
        }
        if let Some(f) = &self.text {
            if let (Value::String(x), Value::String(y)) = (&a, &b) {
                return f(x, y);
            }
        }
        if let Some(f) = &self.boolean {
            if let (Some(x), Some(y)) = (a.as_bool(), b.as_bool()) {
                return f(x, y);
            }
        }
        if let Some(f) = &self.arbitrary {
            return f(a, b);
        }
        Err(EvalError::Type(format!(
            "invalid operation: {} {} {}",
            a.type_name(),
            symbol,
            b.type_name()
        )))
    }
}

/// An immutable bundle of parser and evaluator dispatch tables.
///
/// A language is built once from parts (see [`new_language`] and the builder
/// functions), then shared freely: parsing never mutates it. Composition is a
/// union with right bias: later parts override earlier parts per table key,
/// and operator entries merge field by field.
#[derive(Clone, Default)]
pub struct Language {
    prefixes: HashMap<PrefixKey, PrefixHandler>,
    operators: HashMap<String, Operator>,
}

impl Language {
    pub(crate) fn merge(&mut self, other: &Language) {
        for (key, handler) in &other.prefixes {
            self.prefixes.insert(key.clone(), handler.clone());
        }
        for (symbol, op) in &other.operators {
            self.operators.entry(symbol.clone()).or_default().merge(op);
        }
    }

    pub(crate) fn prefix(&self, key: &PrefixKey) -> Option<&PrefixHandler> {
        self.prefixes.get(key)
    }

    pub(crate) fn operator(&self, symbol: &str) -> Option<&Operator> {
        self.operators.get(symbol)
    }

    /// Whether `candidate` is a prefix of any known operator symbol. Drives
    /// longest-match operator assembly in the parser.
    pub(crate) fn has_operator_with_prefix(&self, candidate: &str) -> bool {
        self.operators.keys().any(|sym| sym.starts_with(candidate))
    }

    /// Parses `expression` into a reusable [`Evaluable`].
    pub fn new_evaluable(&self, expression: &str) -> Result<Evaluable, ParseError> {
        let tokens = Lexer::new(expression).tokenize()?;
        let mut parser = Parser::new(self, tokens);
        parser.parse_expression()
    }

    /// Parses and evaluates `expression` against `parameter` with a
    /// background context.
    pub fn evaluate(&self, expression: &str, parameter: &Value) -> Result<Value, crate::Error> {
        let evaluable = self.new_evaluable(expression)?;
        Ok(evaluable.eval_with(parameter)?)
    }
}

impl std::fmt::Debug for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut symbols: Vec<&String> = self.operators.keys().collect();
        symbols.sort();
        f.debug_struct("Language")
            .field("prefixes", &self.prefixes.len())
            .field("operators", &symbols)
            .finish()
    }
}

/// Folds language parts left to right into one language; later parts
/// override earlier ones per key. The union is associative and idempotent.
pub fn new_language(parts: impl IntoIterator<Item = Language>) -> Language {
    let mut language = Language::default();
    for part in parts {
        language.merge(&part);
    }
    language
}

fn single_operator(symbol: &str, op: Operator) -> Language {
    let mut language = Language::default();
    language.operators.insert(symbol.to_string(), op);
    language
}

/// A language with one prefix table entry.
pub fn prefix_extension(
    key: PrefixKey,
    handler: impl Fn(&mut Parser<'_>, &Token) -> Result<Evaluable, ParseError> + Send + Sync + 'static,
) -> Language {
    let mut language = Language::default();
    language.prefixes.insert(key, Arc::new(handler));
    language
}

/// A language with the meta prefix entry handling any identifier that has no
/// entry of its own; the result is chained with selector and call suffixes.
pub fn ident_prefix_extension(
    handler: impl Fn(&mut Parser<'_>, &Token) -> Result<Evaluable, ParseError> + Send + Sync + 'static,
) -> Language {
    prefix_extension(PrefixKey::Ident, handler)
}

/// A language with one unary prefix operator, e.g. `-` or `!`.
///
/// The operand binds at the power-operator level, so `-2 ** 2` negates the
/// power.
pub fn prefix_operator(
    symbol: &str,
    f: impl Fn(&Context, Value) -> Result<Value, EvalError> + Send + Sync + 'static,
) -> Language {
    let f: PrefixOpFn = Arc::new(f);
    prefix_extension(PrefixKey::Symbol(symbol.to_string()), move |parser, _| {
        let operand = parser.parse_sub_expression(crate::parser::PREFIX_PRECEDENCE)?;
        let f = f.clone();
        Ok(Evaluable::new(move |ctx, param| {
            let value = operand.eval(ctx, param)?;
            f(ctx, value)
        }))
    })
}

/// A language with one infix operator over arbitrary values.
pub fn infix_operator(
    symbol: &str,
    f: impl Fn(Value, Value) -> Result<Value, EvalError> + Send + Sync + 'static,
) -> Language {
    single_operator(
        symbol,
        Operator {
            arbitrary: Some(Arc::new(f)),
            ..Operator::default()
        },
    )
}

/// A language with one infix operator over numbers; operands are coerced and
/// the operator fails with a type error when coercion fails.
pub fn infix_number_operator(
    symbol: &str,
    f: impl Fn(f64, f64) -> Result<Value, EvalError> + Send + Sync + 'static,
) -> Language {
    single_operator(
        symbol,
        Operator {
            number: Some(Arc::new(f)),
            ..Operator::default()
        },
    )
}

/// A language with one infix operator applying only when both operands are
/// strings.
pub fn infix_text_operator(
    symbol: &str,
    f: impl Fn(&str, &str) -> Result<Value, EvalError> + Send + Sync + 'static,
) -> Language {
    single_operator(
        symbol,
        Operator {
            text: Some(Arc::new(f)),
            ..Operator::default()
        },
    )
}

/// A language with one infix operator over booleans, coercing its operands.
pub fn infix_bool_operator(
    symbol: &str,
    f: impl Fn(bool, bool) -> Result<Value, EvalError> + Send + Sync + 'static,
) -> Language {
    single_operator(
        symbol,
        Operator {
            boolean: Some(Arc::new(f)),
            ..Operator::default()
        },
    )
}

/// A language with one infix operator applying only when both operands are
/// dates.
pub fn infix_date_operator(
    symbol: &str,
    f: impl Fn(DateTime<FixedOffset>, DateTime<FixedOffset>) -> Result<Value, EvalError>
        + Send
        + Sync
        + 'static,
) -> Language {
    single_operator(
        symbol,
        Operator {
            date: Some(Arc::new(f)),
            ..Operator::default()
        },
    )
}

/// A language with one infix operator that receives the raw operand
/// evaluables at parse time instead of evaluated values. Used by the regex
/// operators to pre-compile constant patterns.
pub fn infix_eval_operator(
    symbol: &str,
    f: impl Fn(Evaluable, Evaluable) -> Result<Evaluable, ParseError> + Send + Sync + 'static,
) -> Language {
    single_operator(
        symbol,
        Operator {
            lazy: Some(Arc::new(f)),
            ..Operator::default()
        },
    )
}

/// A language attaching a short-circuit predicate to an operator symbol.
///
/// When the predicate returns a result for the left value, that result is
/// returned and the right operand is never evaluated.
pub fn infix_short_circuit(
    symbol: &str,
    f: impl Fn(&Value) -> Option<Value> + Send + Sync + 'static,
) -> Language {
    single_operator(
        symbol,
        Operator {
            short_circuit: Some(Arc::new(f)),
            ..Operator::default()
        },
    )
}

/// A language with one postfix operator, e.g. the ternary `?`.
pub fn postfix_operator(
    symbol: &str,
    handler: impl Fn(&mut Parser<'_>, Evaluable) -> Result<Evaluable, ParseError>
        + Send
        + Sync
        + 'static,
) -> Language {
    single_operator(
        symbol,
        Operator {
            postfix: Some(Arc::new(handler)),
            ..Operator::default()
        },
    )
}

/// A language setting the precedence of an operator symbol. Higher numbers
/// bind tighter.
pub fn precedence(symbol: &str, precedence: i32) -> Language {
    single_operator(
        symbol,
        Operator {
            precedence: Some(precedence),
            ..Operator::default()
        },
    )
}

/// A language registering an identifier as a constant.
pub fn constant(name: &str, value: impl Into<Value>) -> Language {
    let value = value.into();
    prefix_extension(PrefixKey::Symbol(name.to_string()), move |_, _| {
        Ok(Evaluable::constant(value.clone()))
    })
}

/// A language registering an identifier as a callable function.
pub fn function(
    name: &str,
    f: impl Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
) -> Language {
    let f: NativeFn = Arc::new(f);
    prefix_extension(PrefixKey::Symbol(name.to_string()), move |_, _| {
        Ok(Evaluable::constant(Value::Function(f.clone())))
    })
}
