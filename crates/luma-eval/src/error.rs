//! Runtime error types for the evaluator.

use thiserror::Error;

use crate::host::DeviceError;

/// Evaluation error: anything that ends a session from inside user code.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// The session's run token was invalidated. Not a failure.
    #[error("Program stopped.")]
    Stopped,

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("{0} is not defined")]
    UndefinedVariable(String),

    #[error("Identifier '{0}' has already been declared")]
    AlreadyDeclared(String),

    #[error("Assignment to constant variable '{0}'")]
    ConstAssignment(String),

    #[error("{0} is not a function")]
    NotAFunction(String),

    #[error("type error: {0}")]
    TypeMismatch(String),

    /// A builtin rejected its arguments.
    #[error("{0}")]
    Builtin(String),

    /// `delay(...)` reached without `await`, i.e. outside a suspendable body.
    #[error("delay() can only be used directly in setup(), loop() or an async function")]
    AwaitRequired,

    #[error("maximum call depth of {0} exceeded")]
    CallDepthExceeded(usize),
}

impl EvalError {
    /// Whether this is a stop unwind rather than a failure.
    pub fn is_stop(&self) -> bool {
        matches!(self, EvalError::Stopped)
    }
}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, EvalError>;
