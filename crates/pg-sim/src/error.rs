//! Error types for scenario runs.

use thiserror::Error;

/// Errors encountered while building or running a scenario.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Backend error: {message}")]
    Backend { message: String },
}

pub type SimResult<T> = Result<T, SimError>;

impl From<pg_project::ValidationError> for SimError {
    fn from(e: pg_project::ValidationError) -> Self {
        SimError::Config {
            message: e.to_string(),
        }
    }
}

impl From<pg_project::ProjectError> for SimError {
    fn from(e: pg_project::ProjectError) -> Self {
        SimError::Config {
            message: e.to_string(),
        }
    }
}

impl From<pg_solver::SolverError> for SimError {
    fn from(e: pg_solver::SolverError) -> Self {
        SimError::Backend {
            message: e.to_string(),
        }
    }
}

impl From<pg_network::NetworkError> for SimError {
    fn from(e: pg_network::NetworkError) -> Self {
        SimError::Backend {
            message: e.to_string(),
        }
    }
}

impl From<pg_core::CoreError> for SimError {
    fn from(e: pg_core::CoreError) -> Self {
        SimError::Backend {
            message: e.to_string(),
        }
    }
}
