//! Error types for pipe and network assembly.

use pg_core::CoreError;
use pg_operators::OperatorError;
use thiserror::Error;

/// Errors raised while building or updating pipes and networks.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Non-physical value: {what}")]
    NonPhysical { what: &'static str },

    #[error("Dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Unsupported topology: {what}")]
    Topology { what: &'static str },

    #[error("Operator error: {0}")]
    Operator(#[from] OperatorError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type NetworkResult<T> = Result<T, NetworkError>;

pub(crate) fn check_len(what: &'static str, expected: usize, actual: usize) -> NetworkResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(NetworkError::DimensionMismatch {
            what,
            expected,
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = NetworkError::NonPhysical { what: "density" };
        assert!(err.to_string().contains("density"));
    }

    #[test]
    fn operator_errors_convert() {
        let err: NetworkError = OperatorError::NotInPattern { row: 1, col: 2 }.into();
        assert!(matches!(err, NetworkError::Operator(_)));
        assert!(err.to_string().contains("(1, 2)"));
    }

    #[test]
    fn check_len_reports_sizes() {
        assert!(check_len("state", 3, 3).is_ok());
        assert_eq!(
            check_len("state", 3, 2),
            Err(NetworkError::DimensionMismatch {
                what: "state",
                expected: 3,
                actual: 2
            })
        );
    }
}
