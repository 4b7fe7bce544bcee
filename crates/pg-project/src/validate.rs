//! Scenario validation logic.
//!
//! Everything a pipe, compressor or time loop would reject later is caught
//! here, before any operator is assembled.

use crate::schema::{CompressorDef, ScenarioConfig, TimeDef};
use pg_network::CompressorKind;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing value: {field} ({reason})")]
    MissingValue { field: String, reason: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn positive(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(field, value, "must be positive and finite"));
    }
    Ok(())
}

pub fn validate_config(config: &ScenarioConfig) -> Result<(), ValidationError> {
    positive("GAS_CONSTANT", config.gas_constant)?;

    positive("pipe.length", config.pipe.length)?;
    positive("pipe.diameter", config.pipe.diameter)?;
    if !config.pipe.friction.is_finite() || config.pipe.friction < 0.0 {
        return Err(invalid(
            "pipe.friction",
            config.pipe.friction,
            "must be non-negative and finite",
        ));
    }

    if let Some(t) = config.fluid.temperature {
        positive("fluid.temperature", t)?;
    }
    if let Some(t) = config.boundary_conditions.inlet.temperature {
        positive("boundary_conditions.inlet.temperature", t)?;
    }
    if config.inlet_temperature().is_none() {
        return Err(ValidationError::MissingValue {
            field: "boundary_conditions.inlet.temperature".to_string(),
            reason: "an inlet or fluid temperature is required".to_string(),
        });
    }
    positive(
        "boundary_conditions.inlet.pressure",
        config.boundary_conditions.inlet.pressure,
    )?;

    if let Some(compressor) = &config.compressor {
        validate_compressor(compressor, config.fluid.isentropic_exponent)?;
    }

    positive("initial_conditions.pressure", config.initial_conditions.pressure)?;
    if !config.initial_conditions.momentum.is_finite() {
        return Err(invalid(
            "initial_conditions.momentum",
            config.initial_conditions.momentum,
            "must be finite",
        ));
    }

    let resolution = config.discretization.space.resolution;
    if resolution < 2 {
        return Err(invalid(
            "discretization.space.resolution",
            resolution,
            "must be at least 2 (three nodes per pipe)",
        ));
    }
    validate_time(&config.discretization.time)?;

    if config.io.frequency == 0 {
        return Err(invalid("io.frequency", 0, "must be at least 1"));
    }
    if config.io.filename.trim().is_empty() {
        return Err(invalid(
            "io.filename",
            &config.io.filename,
            "must not be empty",
        ));
    }

    Ok(())
}

fn validate_compressor(
    compressor: &CompressorDef,
    isentropic_exponent: Option<f64>,
) -> Result<(), ValidationError> {
    let Some(kappa) = isentropic_exponent else {
        return Err(ValidationError::MissingValue {
            field: "fluid.isentropic_exponent".to_string(),
            reason: "required when a compressor is present".to_string(),
        });
    };
    if !kappa.is_finite() || kappa <= 1.0 {
        return Err(invalid(
            "fluid.isentropic_exponent",
            kappa,
            "must be finite and greater than 1",
        ));
    }

    let field = match compressor.kind {
        CompressorKind::FixedRatio => "compressor.specification (ratio)",
        CompressorKind::FixedOutletPressure => "compressor.specification (outlet pressure)",
    };
    positive(field, compressor.specification)
}

fn validate_time(time: &TimeDef) -> Result<(), ValidationError> {
    if !time.start.is_finite() {
        return Err(invalid("discretization.time.start", time.start, "must be finite"));
    }
    if !time.end.is_finite() || time.end < time.start {
        return Err(invalid(
            "discretization.time.end",
            time.end,
            "must be finite and not before start",
        ));
    }
    positive("discretization.time.step", time.step)
}
