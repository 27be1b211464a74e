use thiserror::Error;

/// Errors raised while compiling or invoking a kernel.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SymError {
    #[error("kernel expects {expected} arguments, got {got}")]
    Arity { expected: usize, got: usize },

    #[error("expression references unbound symbol `{0}`")]
    UnboundSymbol(String),

    #[error("parameter `{0}` is listed more than once")]
    DuplicateParameter(String),

    #[error("`{0}` is not a bare symbol and cannot be a kernel parameter")]
    NotAParameter(String),

    #[error("division by a zero or non-finite value")]
    SingularDivisor,
}
