//! Compressor between two pipes.
//!
//! The operating mode fixes either the compression ratio or the outlet
//! pressure; in the latter case the ratio follows the live upstream
//! pressure. The control law decides how the momentum across the machine
//! is coupled.

use crate::error::{NetworkError, NetworkResult};
use pg_core::{Real, Scalar, ensure_finite, ensure_positive};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressorKind {
    /// Specification is the compression ratio.
    #[serde(rename = "FC")]
    FixedRatio,
    /// Specification is the outlet pressure in Pa.
    #[serde(rename = "FP")]
    FixedOutletPressure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlLaw {
    #[serde(rename = "AV")]
    ValveActuated,
    #[serde(rename = "AM")]
    MassFlowActuated,
}

/// Momentum coupling of a fixed-outlet-pressure, mass-flow-actuated compressor.
///
/// `Unscaled` couples the momenta one to one. `PressureScaled` applies the
/// valve-actuated scaling (`p_pre^(1/kappa)` on the coupling entry and
/// `1/spec^(1/kappa)` on the input channel). Other modes ignore this switch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MassFlowCoupling {
    #[default]
    Unscaled,
    PressureScaled,
}

/// Isentropic scale factors derived from one compression ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorScales {
    /// `r^((kappa - 1) / kappa)`
    pub temperature: Real,
    /// `r^(1 / kappa)`
    pub momentum: Real,
    /// `r^(1 / kappa)`
    pub density: Real,
    /// `r`
    pub pressure: Real,
}

impl CompressorScales {
    pub fn for_ratio(ratio: Real, isentropic_exponent: Real) -> Self {
        let inverse = 1.0 / isentropic_exponent;
        Self {
            temperature: ratio.powf((isentropic_exponent - 1.0) / isentropic_exponent),
            momentum: ratio.powf(inverse),
            density: ratio.powf(inverse),
            pressure: ratio,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Compressor {
    kind: CompressorKind,
    control: ControlLaw,
    coupling: MassFlowCoupling,
    specification: Real,
    isentropic_exponent: Real,
    ratio: Real,
    scales: CompressorScales,
}

impl Compressor {
    /// A fixed-ratio compressor starts at its specified ratio; a
    /// fixed-outlet-pressure one at ratio 1 until the first state update.
    pub fn new(
        kind: CompressorKind,
        control: ControlLaw,
        specification: Real,
        isentropic_exponent: Real,
    ) -> NetworkResult<Self> {
        let specification = ensure_positive(specification, "compressor specification")?;
        if ensure_finite(isentropic_exponent, "isentropic exponent")? <= 1.0 {
            return Err(NetworkError::NonPhysical {
                what: "isentropic exponent must exceed 1",
            });
        }
        let mut compressor = Self {
            kind,
            control,
            coupling: MassFlowCoupling::default(),
            specification,
            isentropic_exponent,
            ratio: 1.0,
            scales: CompressorScales::for_ratio(1.0, isentropic_exponent),
        };
        if kind == CompressorKind::FixedRatio {
            compressor.update_compression_ratio(specification)?;
        }
        Ok(compressor)
    }

    pub fn with_mass_flow_coupling(mut self, coupling: MassFlowCoupling) -> Self {
        self.coupling = coupling;
        self
    }

    pub fn kind(&self) -> CompressorKind {
        self.kind
    }

    pub fn control_law(&self) -> ControlLaw {
        self.control
    }

    pub fn mass_flow_coupling(&self) -> MassFlowCoupling {
        self.coupling
    }

    pub fn specification(&self) -> Real {
        self.specification
    }

    pub fn isentropic_exponent(&self) -> Real {
        self.isentropic_exponent
    }

    pub fn compression_ratio(&self) -> Real {
        self.ratio
    }

    pub fn scales(&self) -> CompressorScales {
        self.scales
    }

    /// Set the ratio and recompute every scale from it.
    pub fn update_compression_ratio(&mut self, ratio: Real) -> NetworkResult<()> {
        let ratio = ensure_positive(ratio, "compression ratio")?;
        self.ratio = ratio;
        self.scales = CompressorScales::for_ratio(ratio, self.isentropic_exponent);
        Ok(())
    }

    /// Ratio implied by the pressure just upstream of the machine.
    pub fn ratio_for<T: Scalar>(&self, precompressor_pressure: T) -> T {
        match self.kind {
            CompressorKind::FixedRatio => T::from_real(self.specification),
            CompressorKind::FixedOutletPressure => {
                T::from_real(self.specification) / precompressor_pressure
            }
        }
    }

    /// Whether the momentum coupling carries the `1/kappa` pressure scaling.
    pub fn valve_scaled(&self) -> bool {
        match (self.control, self.kind) {
            (ControlLaw::ValveActuated, _) => true,
            (ControlLaw::MassFlowActuated, CompressorKind::FixedOutletPressure) => {
                self.coupling == MassFlowCoupling::PressureScaled
            }
            (ControlLaw::MassFlowActuated, CompressorKind::FixedRatio) => false,
        }
    }

    /// Value of the input channel driving the momentum coupling.
    pub fn momentum_input(&self) -> Real {
        if self.valve_scaled() {
            1.0 / self.specification.powf(1.0 / self.isentropic_exponent)
        } else {
            1.0
        }
    }
}
