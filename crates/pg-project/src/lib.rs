//! pg-project: scenario configuration format and validation.
//!
//! The schema mirrors the JSON layout the reference drivers read
//! (`GAS_CONSTANT`, `pipe`, `fluid`, `boundary_conditions`, `compressor`,
//! `initial_conditions`, `discretization`, `io`). Reading files is left to
//! the caller; this crate parses and checks text it is handed.

pub mod schema;
pub mod validate;

pub use schema::*;
pub use validate::{ValidationError, validate_config};

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse and validate a scenario from JSON text.
pub fn from_json_str(content: &str) -> ProjectResult<ScenarioConfig> {
    let config: ScenarioConfig = serde_json::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate and serialize a scenario as pretty JSON.
pub fn to_json_string(config: &ScenarioConfig) -> ProjectResult<String> {
    validate_config(config)?;
    Ok(serde_json::to_string_pretty(config)?)
}
