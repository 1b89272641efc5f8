//! Runtime error types.

use thiserror::Error;

use crate::value::Value;

/// A fault raised by user code. Propagated to the caller verbatim.
#[derive(Debug, Clone, Error)]
pub enum Fault {
    #[error("object reference not set to an instance of an object")]
    NullReference,
    #[error("attempted to divide by zero")]
    DivideByZero,
    #[error("call depth exceeded {0}")]
    StackOverflow(usize),
    #[error("unhandled exception: {}", .0.display())]
    Thrown(Value),
}

/// Outcome of a failed execution.
#[derive(Debug, Clone, Error)]
pub enum ExecError {
    #[error(transparent)]
    Fault(#[from] Fault),
    #[error("execution interrupted")]
    Interrupted,
    /// Executor bookkeeping failed (thread spawn, panic on the run thread).
    #[error("internal executor error: {0}")]
    Internal(String),
}

/// Result alias for interpreter operations.
pub type ExecResult<T> = Result<T, ExecError>;
