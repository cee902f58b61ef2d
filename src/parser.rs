use std::fmt;

use crate::evaluator::{EvalError, Evaluable};
use crate::language::{Language, Operator, PrefixKey};
use crate::lexer::{LexError, Token, TokenKind};
use crate::value::Value;

/// Operand binding level for prefix operators: everything except
/// exponentiation binds looser, so `-2 ** 2` negates the power.
pub(crate) const PREFIX_PRECEDENCE: i32 = 200;

/// Errors that can occur while parsing an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Lexer error (with position)
    Lex(LexError),
    /// Unexpected token
    Syntax {
        expected: String,
        got: String,
        position: usize,
    },
    /// Operator symbol known to the language but with no infix or postfix
    /// implementation
    UnknownOperator { symbol: String, position: usize },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Lex(e) => write!(f, "{}", e),
            ParseError::Syntax {
                expected,
                got,
                position,
            } => {
                write!(
                    f,
                    "syntax error at {}: expected {}, got {}",
                    position, expected, got
                )
            }
            ParseError::UnknownOperator { symbol, position } => {
                write!(f, "unknown operator '{}' at {}", symbol, position)
            }
        }
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError::Lex(e)
    }
}

fn describe(token: &Token) -> String {
    match token.kind {
        TokenKind::Eof => "end of expression".to_string(),
        TokenKind::Str | TokenKind::Char | TokenKind::RawStr => format!("\"{}\"", token.text),
        _ => format!("'{}'", token.text),
    }
}

/// Precedence-climbing parser over a pre-lexed token stream, guided by the
/// dispatch tables of a [`Language`].
pub struct Parser<'a> {
    language: &'a Language,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    /// Takes the token stream as produced by
    /// [`crate::lexer::Lexer::tokenize`]; a terminal Eof token is appended if
    /// missing.
    pub fn new(language: &'a Language, mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last(), Some(t) if t.kind == TokenKind::Eof) {
            let position = tokens
                .last()
                .map(|t| t.position + t.text.chars().count())
                .unwrap_or(0);
            tokens.push(Token {
                kind: TokenKind::Eof,
                text: String::new(),
                position,
            });
        }
        Parser {
            language,
            tokens,
            pos: 0,
        }
    }

    /// The current token. Never advances past the terminal Eof.
    pub fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    /// Consumes and returns the current token.
    pub fn consume(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn advance_by(&mut self, count: usize) {
        self.pos = (self.pos + count).min(self.tokens.len() - 1);
    }

    /// Source position of the current token.
    pub fn position(&self) -> usize {
        self.peek().position
    }

    fn check_punct(&self, symbol: &str) -> bool {
        let token = self.peek();
        token.kind == TokenKind::Punct && token.text == symbol
    }

    /// Requires the current token to be the given punctuation and consumes it.
    pub fn expect(&mut self, symbol: &str) -> Result<(), ParseError> {
        if self.check_punct(symbol) {
            self.consume();
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", symbol)))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::Syntax {
            expected: expected.to_string(),
            got: describe(self.peek()),
            position: self.position(),
        }
    }

    /// Parses a complete expression; trailing tokens are an error.
    pub fn parse_expression(&mut self) -> Result<Evaluable, ParseError> {
        let evaluable = self.parse_sub_expression(0)?;
        if self.peek().kind != TokenKind::Eof {
            return Err(self.unexpected("end of expression"));
        }
        Ok(evaluable)
    }

    /// The core precedence-climbing loop: parses a prefix expression, then
    /// keeps consuming infix and postfix operators whose precedence is at
    /// least `min_prec`.
    pub fn parse_sub_expression(&mut self, min_prec: i32) -> Result<Evaluable, ParseError> {
        let mut left = self.parse_prefix()?;

        loop {
            let Some((symbol, count)) = self.peek_operator_symbol() else {
                break;
            };
            let Some(op) = self.language.operator(&symbol).cloned() else {
                break;
            };
            let prec = op.precedence.unwrap_or(0);
            if prec < min_prec {
                break;
            }
            let position = self.position();

            if let Some(postfix) = op.postfix.clone() {
                self.advance_by(count);
                left = postfix(self, left)?;
                continue;
            }
            if let Some(lazy) = op.lazy.clone() {
                self.advance_by(count);
                let right = self.parse_sub_expression(prec + 1)?;
                left = lazy(left, right)?;
                continue;
            }
            if op.has_infix() {
                self.advance_by(count);
                // exponentiation chains to the right
                let next_min = if symbol == "**" { prec } else { prec + 1 };
                let right = self.parse_sub_expression(next_min)?;
                left = infix_node(symbol, op, left, right);
                continue;
            }
            return Err(ParseError::UnknownOperator { symbol, position });
        }

        Ok(left)
    }

    /// Assembles the longest operator symbol starting at the current token:
    /// adjacent punctuation joined by longest-prefix match against the
    /// language's operator symbols, or an identifier registered as an
    /// operator (e.g. `in`). Returns the symbol and how many tokens it spans.
    fn peek_operator_symbol(&self) -> Option<(String, usize)> {
        let first = self.peek();
        match first.kind {
            TokenKind::Ident => {
                if self.language.operator(&first.text).is_some() {
                    Some((first.text.clone(), 1))
                } else {
                    None
                }
            }
            TokenKind::Punct => {
                let mut candidate = first.text.clone();
                let mut count = 1;
                let mut end = first.position + 1;
                let mut best = None;
                loop {
                    if self.language.operator(&candidate).is_some() {
                        best = Some((candidate.clone(), count));
                    }
                    match self.tokens.get(self.pos + count) {
                        Some(next) if next.kind == TokenKind::Punct && next.position == end => {
                            let extended = format!("{}{}", candidate, next.text);
                            if !self.language.has_operator_with_prefix(&extended) {
                                break;
                            }
                            candidate = extended;
                            count += 1;
                            end += 1;
                        }
                        _ => break,
                    }
                }
                best
            }
            _ => None,
        }
    }

    /// Null denotation: dispatches the current token through the language's
    /// prefix table, then greedily applies member, computed-index, and call
    /// suffixes to the result.
    fn parse_prefix(&mut self) -> Result<Evaluable, ParseError> {
        let token = self.peek().clone();
        let (handler, trigger) = match token.kind {
            TokenKind::Eof => return Err(self.unexpected("expression")),
            TokenKind::Int => (self.prefix_handler(PrefixKey::Int)?, self.consume()),
            TokenKind::Float => (self.prefix_handler(PrefixKey::Float)?, self.consume()),
            TokenKind::Str => (self.prefix_handler(PrefixKey::Str)?, self.consume()),
            TokenKind::Char => (self.prefix_handler(PrefixKey::Char)?, self.consume()),
            TokenKind::RawStr => (self.prefix_handler(PrefixKey::RawStr)?, self.consume()),
            TokenKind::Punct => {
                let assembled = self
                    .peek_operator_symbol()
                    .filter(|(symbol, _)| symbol.len() > 1)
                    .and_then(|(symbol, count)| {
                        let key = PrefixKey::Symbol(symbol.clone());
                        self.language
                            .prefix(&key)
                            .cloned()
                            .map(|handler| (handler, symbol, count))
                    });
                match assembled {
                    Some((handler, symbol, count)) => {
                        self.advance_by(count);
                        let trigger = Token {
                            kind: TokenKind::Punct,
                            text: symbol,
                            position: token.position,
                        };
                        (handler, trigger)
                    }
                    None => {
                        let key = PrefixKey::Symbol(token.text.clone());
                        (self.prefix_handler(key)?, self.consume())
                    }
                }
            }
            TokenKind::Ident => {
                let named = PrefixKey::Symbol(token.text.clone());
                if let Some(handler) = self.language.prefix(&named).cloned() {
                    (handler, self.consume())
                } else {
                    (self.prefix_handler(PrefixKey::Ident)?, self.consume())
                }
            }
        };

        let mut left = handler(self, &trigger)?;
        let mut path = if trigger.kind == TokenKind::Ident {
            trigger.text.clone()
        } else {
            String::new()
        };

        loop {
            if self.check_punct(".") {
                self.consume();
                let name = self.peek().clone();
                if name.kind != TokenKind::Ident {
                    return Err(self.unexpected("identifier after '.'"));
                }
                self.consume();
                path = if path.is_empty() {
                    name.text.clone()
                } else {
                    format!("{}.{}", path, name.text)
                };
                left = select_member(left, name.text, path.clone());
            } else if self.check_punct("[") {
                self.consume();
                let key = self.parse_sub_expression(0)?;
                self.expect("]")?;
                path = format!("{}[..]", path);
                left = select_computed(left, key, path.clone());
            } else if self.check_punct("(") {
                self.consume();
                let args = self.parse_call_args()?;
                left = call_node(left, args, path.clone());
            } else {
                break;
            }
        }

        Ok(left)
    }

    fn prefix_handler(
        &self,
        key: PrefixKey,
    ) -> Result<crate::language::PrefixHandler, ParseError> {
        self.language
            .prefix(&key)
            .cloned()
            .ok_or_else(|| self.unexpected("expression"))
    }

    fn parse_call_args(&mut self) -> Result<Vec<Evaluable>, ParseError> {
        let mut args = Vec::new();
        if self.check_punct(")") {
            self.consume();
            return Ok(args);
        }
        loop {
            args.push(self.parse_sub_expression(0)?);
            if self.check_punct(",") {
                self.consume();
            } else {
                break;
            }
        }
        self.expect(")")?;
        Ok(args)
    }

    /// Parses a parenthesized sub-expression; the opening `(` has already
    /// been consumed.
    pub fn parse_parenthesized(&mut self) -> Result<Evaluable, ParseError> {
        let inner = self.parse_sub_expression(0)?;
        self.expect(")")?;
        Ok(inner)
    }

    /// Turns an Int or Float literal token into a constant.
    pub fn parse_number_literal(&mut self, token: &Token) -> Result<Evaluable, ParseError> {
        match crate::value::parse_number_str(&token.text) {
            Some(n) => Ok(Evaluable::constant(Value::Number(n))),
            None => Err(ParseError::Syntax {
                expected: "number".to_string(),
                got: format!("'{}'", token.text),
                position: token.position,
            }),
        }
    }

    /// Turns a string-like literal token into a constant.
    pub fn parse_string_literal(&mut self, token: &Token) -> Result<Evaluable, ParseError> {
        Ok(Evaluable::constant(Value::String(token.text.clone())))
    }

    /// Parses a JSON array literal; the opening `[` has already been
    /// consumed. Elements are arbitrary expressions; trailing commas are
    /// rejected.
    pub fn parse_json_array(&mut self) -> Result<Evaluable, ParseError> {
        let mut elements = Vec::new();
        if self.check_punct("]") {
            self.consume();
        } else {
            loop {
                elements.push(self.parse_sub_expression(0)?);
                if self.check_punct(",") {
                    self.consume();
                } else {
                    break;
                }
            }
            self.expect("]")?;
        }
        Ok(Evaluable::new(move |ctx, param| {
            let mut values = Vec::with_capacity(elements.len());
            for element in &elements {
                values.push(element.eval(ctx, param)?);
            }
            Ok(Value::Array(values))
        }))
    }

    /// Parses a JSON object literal; the opening `{` has already been
    /// consumed. Keys are string literals or bare identifiers; insertion
    /// order is preserved; trailing commas are rejected.
    pub fn parse_json_object(&mut self) -> Result<Evaluable, ParseError> {
        let mut entries: Vec<(String, Evaluable)> = Vec::new();
        if self.check_punct("}") {
            self.consume();
        } else {
            loop {
                let token = self.peek().clone();
                let key = match token.kind {
                    TokenKind::Str | TokenKind::Ident => {
                        self.consume();
                        token.text
                    }
                    _ => return Err(self.unexpected("string or identifier as object key")),
                };
                self.expect(":")?;
                let value = self.parse_sub_expression(0)?;
                entries.push((key, value));
                if self.check_punct(",") {
                    self.consume();
                } else {
                    break;
                }
            }
            self.expect("}")?;
        }
        Ok(Evaluable::new(move |ctx, param| {
            let mut object = indexmap::IndexMap::with_capacity(entries.len());
            for (key, value) in &entries {
                object.insert(key.clone(), value.eval(ctx, param)?);
            }
            Ok(Value::Object(object))
        }))
    }

    /// Parses the branches of a ternary after `?`: a then-branch, `:`, and an
    /// else-branch at the ternary's own precedence. Exactly one branch is
    /// evaluated.
    pub fn parse_ternary(&mut self, condition: Evaluable) -> Result<Evaluable, ParseError> {
        let then_branch = self.parse_sub_expression(0)?;
        self.expect(":")?;
        let else_branch = self.parse_sub_expression(0)?;
        Ok(Evaluable::new(move |ctx, param| {
            let decider = condition.eval(ctx, param)?;
            let Some(flag) = decider.as_bool() else {
                return Err(EvalError::Type(format!(
                    "unexpected {} expected bool",
                    decider.type_name()
                )));
            };
            if flag {
                then_branch.eval(ctx, param)
            } else {
                else_branch.eval(ctx, param)
            }
        }))
    }
}

/// The parameter itself; the root of every selector chain.
pub(crate) fn root() -> Evaluable {
    Evaluable::new(|_, param| Ok(param.clone()))
}

/// A member step: `base.name`. Absent mapping members resolve to null;
/// selecting into anything that has no members is a resolution error naming
/// the full path.
pub(crate) fn select_member(base: Evaluable, name: String, path: String) -> Evaluable {
    Evaluable::new(move |ctx, param| {
        let current = base.eval(ctx, param)?;
        match current {
            Value::Object(map) => Ok(map.get(&name).cloned().unwrap_or(Value::Null)),
            Value::Foreign(foreign) => foreign
                .member(&name)
                .ok_or_else(|| EvalError::Resolution(format!("unknown parameter {}", path))),
            _ => Err(EvalError::Resolution(format!("unknown parameter {}", path))),
        }
    })
}

/// A computed step: `base[key]`. Sequences require an in-range integer
/// index; mappings stringify the key.
pub(crate) fn select_computed(base: Evaluable, key: Evaluable, path: String) -> Evaluable {
    Evaluable::new(move |ctx, param| {
        let current = base.eval(ctx, param)?;
        let key = key.eval(ctx, param)?;
        match current {
            Value::Array(items) => {
                let index = sequence_index(&key, items.len())?;
                Ok(items[index].clone())
            }
            Value::Object(map) => {
                let name = match &key {
                    Value::String(s) => s.clone(),
                    other => other.render(),
                };
                Ok(map.get(&name).cloned().unwrap_or(Value::Null))
            }
            Value::Foreign(foreign) => {
                let resolved = match &key {
                    Value::Number(n) if n.fract() == 0.0 && *n >= 0.0 => {
                        foreign.index(*n as usize)
                    }
                    other => foreign.member(&other.render()),
                };
                resolved.ok_or_else(|| EvalError::Resolution(format!("unknown parameter {}", path)))
            }
            _ => Err(EvalError::Resolution(format!("unknown parameter {}", path))),
        }
    })
}

fn sequence_index(key: &Value, len: usize) -> Result<usize, EvalError> {
    let Some(number) = key.as_number() else {
        return Err(EvalError::Index(format!(
            "unexpected {} expected integer index",
            key.type_name()
        )));
    };
    if number.fract() != 0.0 {
        return Err(EvalError::Index(format!("{} is not an integer", number)));
    }
    if number < 0.0 || number >= len as f64 {
        return Err(EvalError::Index(format!(
            "index {} out of bounds [0, {})",
            crate::value::format_number(number),
            len
        )));
    }
    Ok(number as usize)
}

/// A call step: `callee(args…)`. The callee must evaluate to a function;
/// arguments are evaluated left to right after a cancellation check.
fn call_node(callee: Evaluable, args: Vec<Evaluable>, path: String) -> Evaluable {
    Evaluable::new(move |ctx, param| {
        let f = match callee.eval(ctx, param)? {
            Value::Function(f) => f,
            other => {
                let what = if path.is_empty() {
                    other.type_name().to_string()
                } else {
                    path.clone()
                };
                return Err(EvalError::Function(format!("{} is not a function", what)));
            }
        };
        let mut values = Vec::with_capacity(args.len());
        for arg in &args {
            values.push(arg.eval(ctx, param)?);
        }
        ctx.check()?;
        f(&values)
    })
}

/// A strict infix node: evaluates left, consults the short-circuit
/// predicate, then evaluates right and applies the operator.
fn infix_node(symbol: String, op: Operator, left: Evaluable, right: Evaluable) -> Evaluable {
    Evaluable::new(move |ctx, param| {
        let a = left.eval(ctx, param)?;
        if let Some(short_circuit) = &op.short_circuit {
            if let Some(result) = short_circuit(&a) {
                return Ok(result);
            }
        }
        let b = right.eval(ctx, param)?;
        op.apply(&symbol, a, b)
    })
}

/// Nud for identifiers without a prefix entry of their own: a selector chain
/// rooted at the parameter.
pub(crate) fn identifier_root(token: &Token) -> Evaluable {
    select_member(root(), token.text.clone(), token.text.clone())
}
