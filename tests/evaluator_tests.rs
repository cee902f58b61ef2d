use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lingo::{
    full, function, new_language, Context, EvalError, Error, Introspect, NativeFn, Value,
};

fn obj(pairs: Vec<(&str, Value)>) -> Value {
    Value::Object(
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    )
}

fn eval(expr: &str, param: &Value) -> Value {
    lingo::evaluate(expr, param).unwrap()
}

fn eval_err(expr: &str, param: &Value) -> EvalError {
    match lingo::evaluate(expr, param).unwrap_err() {
        Error::Eval(e) => e,
        Error::Parse(e) => panic!("expected evaluation error, got parse error: {}", e),
    }
}

#[test]
fn test_selector_chains() {
    let param = obj(vec![(
        "user",
        obj(vec![("name", Value::from("Ada")), ("age", Value::Number(36.0))]),
    )]);
    assert_eq!(eval("user.name", &param), Value::from("Ada"));
    assert_eq!(eval("user['age']", &param), Value::Number(36.0));
    assert_eq!(eval("user['na' + 'me']", &param), Value::from("Ada"));
}

#[test]
fn test_absent_members_resolve_to_null() {
    let param = obj(vec![("present", Value::Number(1.0))]);
    assert_eq!(eval("absent", &param), Value::Null);
    assert_eq!(eval("absent == null_marker", &param), Value::Boolean(true));
}

#[test]
fn test_selecting_into_a_non_container_is_a_resolution_error() {
    let param = obj(vec![("n", Value::Number(5.0))]);
    match eval_err("n.deeper.still", &param) {
        EvalError::Resolution(msg) => assert!(msg.contains("n.deeper")),
        other => panic!("expected resolution error, got {:?}", other),
    }
}

#[test]
fn test_numeric_object_keys_are_stringified() {
    let param = obj(vec![("1", Value::from("one"))]);
    assert_eq!(eval("{\"1\": 'one'}[1]", &Value::Null), Value::from("one"));
    assert_eq!(eval("[1][0] == 1", &param), Value::Boolean(true));
}

#[test]
fn test_sequence_index_errors() {
    let param = obj(vec![("xs", Value::Array(vec![Value::Number(1.0)]))]);
    assert!(matches!(eval_err("xs[3]", &param), EvalError::Index(_)));
    assert!(matches!(eval_err("xs[-1]", &param), EvalError::Index(_)));
    assert!(matches!(eval_err("xs[0.5]", &param), EvalError::Index(_)));
    assert!(matches!(eval_err("xs['a']", &param), EvalError::Index(_)));
}

#[test]
fn test_calling_a_non_function() {
    let param = obj(vec![("n", Value::Number(5.0))]);
    match eval_err("n(1)", &param) {
        EvalError::Function(msg) => assert!(msg.contains("n is not a function")),
        other => panic!("expected function error, got {:?}", other),
    }
}

#[test]
fn test_functions_supplied_through_the_parameter() {
    let double: NativeFn = Arc::new(|args| match args {
        [value] => match value.as_number() {
            Some(n) => Ok(Value::Number(n * 2.0)),
            None => Err(EvalError::Function("double() expects a number".to_string())),
        },
        _ => Err(EvalError::Function("double() expects one argument".to_string())),
    });
    let param = obj(vec![
        ("double", Value::Function(double)),
        ("n", Value::Number(21.0)),
    ]);
    assert_eq!(eval("double(n)", &param), Value::Number(42.0));
    assert_eq!(eval("double(double(1)) + 1", &param), Value::Number(5.0));
}

#[test]
fn test_arguments_evaluate_left_to_right() {
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));
    let recorder = {
        let order = order.clone();
        function("mark", move |args| {
            order.lock().unwrap().push(args[0].render());
            Ok(args[0].clone())
        })
    };
    let language = new_language([full(), recorder]);
    language
        .evaluate("[mark(1), mark(2)] == mark(3)", &Value::Null)
        .unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["1", "2", "3"]);
}

#[test]
fn test_foreign_values_resolve_through_introspect() {
    struct Point {
        x: f64,
        y: f64,
    }
    impl Introspect for Point {
        fn member(&self, name: &str) -> Option<Value> {
            match name {
                "x" => Some(Value::Number(self.x)),
                "y" => Some(Value::Number(self.y)),
                _ => None,
            }
        }
        fn type_name(&self) -> &'static str {
            "point"
        }
    }

    let param = obj(vec![(
        "p",
        Value::Foreign(Arc::new(Point { x: 1.0, y: 2.0 })),
    )]);
    assert_eq!(eval("p.x + p.y", &param), Value::Number(3.0));
    match eval_err("p.z", &param) {
        EvalError::Resolution(msg) => assert!(msg.contains("p.z")),
        other => panic!("expected resolution error, got {:?}", other),
    }
}

#[test]
fn test_pre_canceled_context_invokes_no_host_function() {
    let calls = Arc::new(AtomicUsize::new(0));
    let probe = {
        let calls = calls.clone();
        function("probe", move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Boolean(true))
        })
    };
    let language = new_language([full(), probe]);
    let evaluable = language.new_evaluable("probe() && probe()").unwrap();

    let (ctx, handle) = Context::with_cancel();
    handle.cancel();
    assert_eq!(
        evaluable.eval(&ctx, &Value::Null),
        Err(EvalError::Canceled)
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // a fresh context still works; the evaluable is unharmed
    assert_eq!(
        evaluable.eval_with(&Value::Null),
        Ok(Value::Boolean(true))
    );
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_evaluables_are_reusable_and_shareable() {
    let evaluable = full().new_evaluable("n * 2").unwrap();
    let param = obj(vec![("n", Value::Number(21.0))]);
    assert_eq!(evaluable.eval_with(&param), evaluable.eval_with(&param));
    assert_eq!(
        evaluable.eval_with(&obj(vec![("n", Value::Number(1.0))])),
        Ok(Value::Number(2.0))
    );

    let worker = {
        let evaluable = evaluable.clone();
        std::thread::spawn(move || evaluable.eval_with(&obj(vec![("n", Value::Number(4.0))])))
    };
    assert_eq!(worker.join().unwrap(), Ok(Value::Number(8.0)));
}

#[test]
fn test_type_errors_from_coercion() {
    assert!(matches!(
        eval_err("{} + 1", &Value::Null),
        EvalError::Type(_)
    ));
    assert!(matches!(
        eval_err("-'abc'", &Value::Null),
        EvalError::Type(_)
    ));
    assert!(matches!(
        eval_err("!'abc'", &Value::Null),
        EvalError::Type(_)
    ));
    assert!(matches!(
        eval_err("'x' ? 1 : 2", &Value::Null),
        EvalError::Type(_)
    ));
}

#[test]
fn test_number_strings_coerce_in_numeric_operators() {
    assert_eq!(eval("'5' * '2'", &Value::Null), Value::Number(10.0));
    assert_eq!(eval("'0x10' + 1", &Value::Null), Value::Number(17.0));
    assert_eq!(eval("true + true", &Value::Null), Value::Number(2.0));
}

#[test]
fn test_deadline_expiry_cancels() {
    let evaluable = full().new_evaluable("1 + 1").unwrap();
    let ctx = Context::background().with_timeout(std::time::Duration::from_secs(0));
    assert_eq!(evaluable.eval(&ctx, &Value::Null), Err(EvalError::Canceled));
}
