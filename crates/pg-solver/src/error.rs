//! Error types for residual evaluation and solving.

use pg_network::NetworkError;
use pg_operators::OperatorError;
use thiserror::Error;

/// Errors that can occur while setting up or running a solve.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Problem setup error: {what}")]
    ProblemSetup { what: String },

    #[error("Dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Numeric error: {what}")]
    Numeric { what: String },

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Operator error: {0}")]
    Operator(#[from] OperatorError),
}

pub type SolverResult<T> = Result<T, SolverError>;

pub(crate) fn check_len(what: &'static str, expected: usize, actual: usize) -> SolverResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(SolverError::DimensionMismatch {
            what,
            expected,
            actual,
        })
    }
}
