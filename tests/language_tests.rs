use lingo::{
    constant, full, function, infix_number_operator, infix_operator, infix_short_circuit,
    new_language, postfix_operator, precedence, prefix_operator, EvalError, Evaluable, Language,
    Value,
};

fn eval_in(language: &Language, expr: &str) -> Value {
    language.evaluate(expr, &Value::Null).unwrap()
}

#[test]
fn test_custom_infix_operator() {
    let language = new_language([
        full(),
        infix_number_operator("min", |a, b| Ok(Value::Number(a.min(b)))),
        precedence("min", 40),
    ]);
    assert_eq!(eval_in(&language, "3 min 5"), Value::Number(3.0));
    assert_eq!(eval_in(&language, "1 + 3 min 5"), Value::Number(4.0));
}

#[test]
fn test_union_is_right_biased() {
    // base `==` on strings is structural equality; the override replaces it
    let language = new_language([
        full(),
        infix_operator("==", |_, _| Ok(Value::from("overridden"))),
    ]);
    assert_eq!(eval_in(&language, "'a' == 'a'"), Value::from("overridden"));
    // typed slots survive: numeric equality still dispatches to numbers
    assert_eq!(eval_in(&language, "1 == 1"), Value::Boolean(true));
}

#[test]
fn test_union_with_itself_changes_nothing() {
    let doubled = new_language([full(), full()]);
    assert_eq!(eval_in(&doubled, "1 + 2 * 3"), Value::Number(7.0));
    assert_eq!(eval_in(&doubled, "'a' + 'b'"), Value::from("ab"));
}

#[test]
fn test_union_is_associative() {
    let flat = new_language([full(), constant("x", 2.0), precedence("+", 200)]);
    let nested = new_language([full(), new_language([constant("x", 2.0), precedence("+", 200)])]);
    for expr in ["x + 2 * 3", "x ** 2"] {
        assert_eq!(eval_in(&flat, expr), eval_in(&nested, expr));
    }
}

#[test]
fn test_precedence_entry_relayers_an_operator() {
    // make + bind tighter than *
    let language = new_language([full(), precedence("+", 200)]);
    assert_eq!(eval_in(&language, "2 + 3 * 4"), Value::Number(20.0));
    assert_eq!(eval_in(&full(), "2 + 3 * 4"), Value::Number(14.0));
}

#[test]
fn test_short_circuit_attaches_independently_of_the_evaluator() {
    // a `+` that never evaluates its right side when the left is zero
    let language = new_language([
        full(),
        infix_short_circuit("+", |a| match a {
            Value::Number(n) if *n == 0.0 => Some(Value::from("zero")),
            _ => None,
        }),
    ]);
    assert_eq!(eval_in(&language, "0 + 1"), Value::from("zero"));
    assert_eq!(eval_in(&language, "1 + 1"), Value::Number(2.0));
}

#[test]
fn test_constants_and_functions() {
    let language = new_language([
        full(),
        constant("pi", std::f64::consts::PI),
        function("upper", |args| match args {
            [Value::String(s)] => Ok(Value::String(s.to_uppercase())),
            _ => Err(EvalError::Function(
                "upper() expects one string argument".to_string(),
            )),
        }),
    ]);
    assert_eq!(eval_in(&language, "pi > 3.14"), Value::Boolean(true));
    assert_eq!(eval_in(&language, "upper('ada')"), Value::from("ADA"));

    let err = language.evaluate("upper(1, 2)", &Value::Null).unwrap_err();
    assert_eq!(
        err,
        lingo::Error::Eval(EvalError::Function(
            "upper() expects one string argument".to_string()
        ))
    );
}

#[test]
fn test_custom_prefix_operator() {
    let language = new_language([
        full(),
        prefix_operator("#", |_, v| match v {
            Value::Array(items) => Ok(Value::Number(items.len() as f64)),
            Value::String(s) => Ok(Value::Number(s.chars().count() as f64)),
            other => Err(EvalError::Type(format!(
                "unexpected {} expected array or string",
                other.type_name()
            ))),
        }),
    ]);
    assert_eq!(eval_in(&language, "#[1, 2, 3]"), Value::Number(3.0));
    assert_eq!(eval_in(&language, "#'four' + 1"), Value::Number(5.0));
}

#[test]
fn test_custom_postfix_operator() {
    let language = new_language([
        full(),
        postfix_operator("!", |_, left: Evaluable| {
            Ok(Evaluable::new(move |ctx, param| {
                let value = left.eval(ctx, param)?;
                let Some(n) = value.as_number() else {
                    return Err(EvalError::Type(format!(
                        "unexpected {} expected number",
                        value.type_name()
                    )));
                };
                Ok(Value::Number((1..=n as i64).product::<i64>() as f64))
            }))
        }),
    ]);
    assert_eq!(eval_in(&language, "5!"), Value::Number(120.0));
    // longest match still resolves `!=` to the comparison
    assert_eq!(eval_in(&language, "5 != 4"), Value::Boolean(true));
}

#[test]
fn test_sub_languages_stay_separate() {
    // propositional logic alone has no arithmetic
    let logic = lingo::propositional_logic();
    assert_eq!(eval_in(&logic, "true && !false"), Value::Boolean(true));
    assert!(logic.evaluate("1 + 2", &Value::Null).is_err());

    // arithmetic alone has no `&&`
    let math = lingo::arithmetic();
    assert_eq!(eval_in(&math, "1 + 2"), Value::Number(3.0));
    assert!(math.evaluate("true && true", &Value::Null).is_err());
}

#[test]
fn test_languages_are_not_mutated_by_composition() {
    let plain = full();
    let _extended = new_language([plain.clone(), precedence("+", 200)]);
    assert_eq!(eval_in(&plain, "2 + 3 * 4"), Value::Number(14.0));
}
