use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::value::Value;

/// Errors that can occur while evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// An operator was applied to a value it cannot be coerced from
    Type(String),

    /// A selector referenced a member that cannot be resolved
    Resolution(String),

    /// A computed index was out of range or not an integer
    Index(String),

    /// A function invocation failed
    Function(String),

    /// The context was observed as canceled or past its deadline
    Canceled,
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::Type(msg) => write!(f, "type error: {}", msg),
            EvalError::Resolution(msg) => write!(f, "resolution error: {}", msg),
            EvalError::Index(msg) => write!(f, "index error: {}", msg),
            EvalError::Function(msg) => write!(f, "function error: {}", msg),
            EvalError::Canceled => write!(f, "evaluation canceled"),
        }
    }
}

impl std::error::Error for EvalError {}

/// Host-supplied cancellation and deadline carrier.
///
/// A context is passed to every evaluation. The engine schedules no timers of
/// its own: it only polls the flag and the deadline between evaluation steps
/// and fails fast with [`EvalError::Canceled`] once either trips.
#[derive(Debug, Clone, Default)]
pub struct Context {
    canceled: Option<Arc<AtomicBool>>,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that never cancels.
    pub fn background() -> Self {
        Context::default()
    }

    /// A context that can be canceled through the returned handle.
    pub fn with_cancel() -> (Self, CancelHandle) {
        let flag = Arc::new(AtomicBool::new(false));
        let ctx = Context {
            canceled: Some(flag.clone()),
            deadline: None,
        };
        (ctx, CancelHandle(flag))
    }

    /// A copy of this context that additionally expires at `deadline`.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        Context {
            canceled: self.canceled.clone(),
            deadline: Some(match self.deadline {
                Some(existing) => existing.min(deadline),
                None => deadline,
            }),
        }
    }

    /// A copy of this context that additionally expires after `timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Whether cancellation or deadline expiry has been observed.
    pub fn is_canceled(&self) -> bool {
        if let Some(flag) = &self.canceled {
            if flag.load(Ordering::Relaxed) {
                return true;
            }
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return true;
            }
        }
        false
    }

    pub(crate) fn check(&self) -> Result<(), EvalError> {
        if self.is_canceled() {
            Err(EvalError::Canceled)
        } else {
            Ok(())
        }
    }
}

/// Cancels the [`Context`] it was created with.
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

type EvalFn = dyn Fn(&Context, &Value) -> Result<Value, EvalError> + Send + Sync;

/// A parsed, ready-to-run expression.
///
/// Produced by parsing; immutable afterwards. The same evaluable may be
/// invoked repeatedly and concurrently with different parameters, provided
/// any host-supplied functions it calls are reentrant.
#[derive(Clone)]
pub struct Evaluable {
    eval: Arc<EvalFn>,
    constant: bool,
}

impl Evaluable {
    /// Wraps an evaluation closure.
    pub fn new(
        eval: impl Fn(&Context, &Value) -> Result<Value, EvalError> + Send + Sync + 'static,
    ) -> Self {
        Evaluable {
            eval: Arc::new(eval),
            constant: false,
        }
    }

    /// An evaluable that always yields `value`.
    pub fn constant(value: Value) -> Self {
        Evaluable {
            eval: Arc::new(move |_, _| Ok(value.clone())),
            constant: true,
        }
    }

    /// Whether this node is a parse-time constant. Used to pre-compile
    /// constant regex patterns.
    pub fn is_const(&self) -> bool {
        self.constant
    }

    /// Evaluates against `parameter`, polling `ctx` for cancellation.
    pub fn eval(&self, ctx: &Context, parameter: &Value) -> Result<Value, EvalError> {
        ctx.check()?;
        (self.eval)(ctx, parameter)
    }

    /// Evaluates with a background context.
    pub fn eval_with(&self, parameter: &Value) -> Result<Value, EvalError> {
        self.eval(&Context::background(), parameter)
    }
}

impl fmt::Debug for Evaluable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluable")
            .field("constant", &self.constant)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canceled_context_trips_before_work() {
        let (ctx, handle) = Context::with_cancel();
        let node = Evaluable::constant(Value::Number(1.0));
        assert_eq!(node.eval(&ctx, &Value::Null), Ok(Value::Number(1.0)));

        handle.cancel();
        assert_eq!(node.eval(&ctx, &Value::Null), Err(EvalError::Canceled));
    }

    #[test]
    fn test_deadline_in_the_past_cancels() {
        let ctx = Context::background().with_timeout(Duration::from_secs(0));
        let node = Evaluable::constant(Value::Null);
        assert_eq!(node.eval(&ctx, &Value::Null), Err(EvalError::Canceled));
    }
}
