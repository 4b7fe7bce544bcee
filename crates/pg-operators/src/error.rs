//! Error types for operator construction and application.

use pg_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OperatorError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Entry ({row}, {col}) outside a {nrows}x{ncols} operator")]
    OutOfBounds {
        row: usize,
        col: usize,
        nrows: usize,
        ncols: usize,
    },

    #[error("Entry ({row}, {col}) is not part of the sparsity pattern")]
    NotInPattern { row: usize, col: usize },

    #[error("Dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Singular system: {what}")]
    Singular { what: &'static str },

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type OperatorResult<T> = Result<T, OperatorError>;

pub(crate) fn check_len(what: &'static str, expected: usize, actual: usize) -> OperatorResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(OperatorError::DimensionMismatch {
            what,
            expected,
            actual,
        })
    }
}
