//! Error types for cliffgen-core.

use cliffgen_sym::SymError;
use thiserror::Error;

use crate::algebra::Key;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GaError {
    #[error("length of keys ({keys}) and values ({values}) must match")]
    KeyValueLength { keys: usize, values: usize },

    #[error("grade {grade} is outside 0..={dimension}")]
    GradeOutOfRange { grade: usize, dimension: usize },

    #[error("no basis blade named `{0}`")]
    UnknownBlade(String),

    #[error("basis blade key {0} is not part of the requested grades")]
    KeyOutsideGrades(Key),

    #[error("basis blade key {0} appears more than once")]
    DuplicateKey(Key),

    #[error("symbolic construction needs a coefficient type that can hold symbols")]
    SymbolicRequired,

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("duality: {0}")]
    Duality(String),

    #[error("inverse did not converge within {iterations} iterations")]
    NonTermination { iterations: usize },

    #[error("multivector is not invertible")]
    NotInvertible,

    #[error("algebra dimension {dimension} exceeds the supported maximum of {max}")]
    DimensionTooLarge { dimension: usize, max: usize },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Sym(#[from] SymError),
}

impl From<toml::de::Error> for GaError {
    fn from(err: toml::de::Error) -> Self {
        GaError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GaError::KeyValueLength { keys: 3, values: 2 };
        assert!(err.to_string().contains('3'));
        assert!(err.to_string().contains('2'));
    }

    #[test]
    fn test_sym_error_is_transparent() {
        let err: GaError = SymError::UnboundSymbol("a1".into()).into();
        assert_eq!(err.to_string(), SymError::UnboundSymbol("a1".into()).to_string());
    }
}
