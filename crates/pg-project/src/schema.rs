//! Scenario schema definitions.

use pg_network::{CompressorKind, ControlLaw, MassFlowCoupling};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioConfig {
    /// Specific gas constant in J/(kg·K).
    #[serde(rename = "GAS_CONSTANT", default = "default_gas_constant")]
    pub gas_constant: f64,
    pub pipe: PipeDef,
    #[serde(default)]
    pub fluid: FluidDef,
    pub boundary_conditions: BoundaryConditionsDef,
    /// Present for a two-pipe compressor chain, absent for a single pipe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compressor: Option<CompressorDef>,
    pub initial_conditions: InitialConditionsDef,
    pub discretization: DiscretizationDef,
    pub io: IoDef,
}

fn default_gas_constant() -> f64 {
    530.0
}

/// Geometry shared by every pipe of the scenario.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipeDef {
    /// m
    pub length: f64,
    /// m
    pub diameter: f64,
    /// Darcy friction factor, dimensionless.
    pub friction: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FluidDef {
    /// Gas temperature in K for a single pipe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Required when a compressor is present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isentropic_exponent: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoundaryConditionsDef {
    pub inlet: InletDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InletDef {
    /// Pa
    pub pressure: f64,
    /// K; takes precedence over `fluid.temperature`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompressorDef {
    #[serde(rename = "type", default = "default_compressor_kind")]
    pub kind: CompressorKind,
    #[serde(default = "default_control_law")]
    pub model: ControlLaw,
    /// Ratio for `FC`, outlet pressure in Pa for `FP`.
    #[serde(alias = "compression_ratio")]
    pub specification: f64,
    #[serde(default)]
    pub mass_flow_coupling: MassFlowCoupling,
}

fn default_compressor_kind() -> CompressorKind {
    CompressorKind::FixedRatio
}

fn default_control_law() -> ControlLaw {
    ControlLaw::ValveActuated
}

/// Uniform state the steady solve starts from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InitialConditionsDef {
    /// Pa
    pub pressure: f64,
    pub momentum: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscretizationDef {
    pub space: SpaceDef,
    pub time: TimeDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpaceDef {
    /// Number of intervals per pipe; each pipe has `resolution + 1` nodes.
    pub resolution: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeDef {
    /// Hours.
    pub start: f64,
    /// Hours.
    pub end: f64,
    /// Seconds.
    pub step: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IoDef {
    /// Emit a snapshot every `frequency` accepted steps.
    pub frequency: usize,
    /// Output file stem, without extension.
    pub filename: String,
}

impl ScenarioConfig {
    /// Temperature at the network inlet: the inlet boundary value if given,
    /// otherwise the fluid temperature.
    pub fn inlet_temperature(&self) -> Option<f64> {
        self.boundary_conditions
            .inlet
            .temperature
            .or(self.fluid.temperature)
    }

    pub fn has_compressor(&self) -> bool {
        self.compressor.is_some()
    }
}
