use lingo::{base, full, ParseError, Value};

fn eval(expr: &str) -> Value {
    lingo::evaluate(expr, &Value::Null).unwrap()
}

fn parse_err(expr: &str) -> ParseError {
    full().new_evaluable(expr).unwrap_err()
}

#[test]
fn test_precedence_climbing() {
    assert_eq!(eval("1 + 2 * 3"), Value::Number(7.0));
    assert_eq!(eval("2 * 3 + 1"), Value::Number(7.0));
    assert_eq!(eval("2 * (3 + 1)"), Value::Number(8.0));
    assert_eq!(eval("1 + 2 < 4"), Value::Boolean(true));
    assert_eq!(eval("1 + 1 == 2 && 2 + 2 == 4"), Value::Boolean(true));
}

#[test]
fn test_power_is_right_associative() {
    assert_eq!(eval("2 ** 3 ** 2"), Value::Number(512.0));
    assert_eq!(eval("(2 ** 3) ** 2"), Value::Number(64.0));
}

#[test]
fn test_prefix_minus_binds_looser_than_power() {
    assert_eq!(eval("-2 ** 2"), Value::Number(-4.0));
    assert_eq!(eval("(-2) ** 2"), Value::Number(4.0));
    assert_eq!(eval("-2 * 3"), Value::Number(-6.0));
}

#[test]
fn test_multi_char_operators_need_adjacency() {
    // `< <` is a comparison of a comparison, not a shift
    assert_eq!(eval("1 << 3"), Value::Number(8.0));
    assert!(lingo::evaluate("1 < < 3", &Value::Null).is_err());
}

#[test]
fn test_longest_operator_match_wins() {
    assert_eq!(eval("2 <= 2"), Value::Boolean(true));
    assert_eq!(eval("16 >> 2"), Value::Number(4.0));
}

#[test]
fn test_ternary_chains_to_the_right() {
    assert_eq!(eval("false ? 1 : false ? 2 : 3"), Value::Number(3.0));
    assert_eq!(eval("true ? 1 : false ? 2 : 3"), Value::Number(1.0));
    assert_eq!(eval("1 + 1 == 2 ? 'yes' : 'no'"), Value::from("yes"));
}

#[test]
fn test_ternary_requires_colon() {
    let err = parse_err("true ? 1");
    match err {
        ParseError::Syntax { expected, .. } => assert!(expected.contains(":")),
        other => panic!("expected syntax error, got {:?}", other),
    }
}

#[test]
fn test_json_literals() {
    assert_eq!(
        eval("[1, 'two', [3]]"),
        Value::Array(vec![
            Value::Number(1.0),
            Value::from("two"),
            Value::Array(vec![Value::Number(3.0)]),
        ])
    );
    assert_eq!(eval("{\"a\": 1}.a"), Value::Number(1.0));
    assert_eq!(eval("{a: 1 + 1}.a"), Value::Number(2.0));
    assert_eq!(eval("[]"), Value::Array(vec![]));
    assert_eq!(eval("{}"), Value::Object(Default::default()));
}

#[test]
fn test_trailing_commas_are_rejected() {
    assert!(full().new_evaluable("[1, 2,]").is_err());
    assert!(full().new_evaluable("{a: 1,}").is_err());
}

#[test]
fn test_object_keys_are_strings_or_identifiers() {
    let err = parse_err("{1: 2}");
    match err {
        ParseError::Syntax { expected, .. } => assert!(expected.contains("object key")),
        other => panic!("expected syntax error, got {:?}", other),
    }
}

#[test]
fn test_missing_closing_paren() {
    let err = parse_err("(1 + 2");
    match err {
        ParseError::Syntax { expected, got, .. } => {
            assert!(expected.contains(")"));
            assert_eq!(got, "end of expression");
        }
        other => panic!("expected syntax error, got {:?}", other),
    }
}

#[test]
fn test_trailing_tokens_are_an_error() {
    assert!(full().new_evaluable("1 2").is_err());
    assert!(full().new_evaluable("1 + 2 )").is_err());
}

#[test]
fn test_no_prefix_handler_is_a_syntax_error() {
    let err = parse_err("* 2");
    assert!(matches!(err, ParseError::Syntax { .. }));
}

#[test]
fn test_known_symbol_without_implementation_is_unknown_operator() {
    // base knows the precedence of `=~` but carries no implementation for it
    let err = base().new_evaluable("'a' =~ 'b'").unwrap_err();
    match err {
        ParseError::UnknownOperator { symbol, .. } => assert_eq!(symbol, "=~"),
        other => panic!("expected unknown operator, got {:?}", other),
    }
}

#[test]
fn test_error_positions_point_at_the_problem() {
    let err = parse_err("1 + )");
    match err {
        ParseError::Syntax { position, .. } => assert_eq!(position, 4),
        other => panic!("expected syntax error, got {:?}", other),
    }
}

#[test]
fn test_selector_suffixes_apply_to_any_prefix_result() {
    assert_eq!(eval("[10, 20, 30][1]"), Value::Number(20.0));
    assert_eq!(eval("{\"a\": {\"b\": 5}}.a.b"), Value::Number(5.0));
}
