//! Specific gas constant, passed explicitly to every model entity.

use crate::error::{CoreError, CoreResult};
use crate::numeric::{Real, ensure_positive};

/// Default specific gas constant in J/(kg·K) used by the reference scenarios.
pub const DEFAULT_GAS_CONSTANT: Real = 530.0;

/// Validated specific gas constant `R` (J/(kg·K)).
///
/// Configure it once before building pipes; every pipe copies the value at
/// construction, so later changes never leak into a running solve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GasConstant(Real);

impl GasConstant {
    pub fn new(value: Real) -> CoreResult<Self> {
        ensure_positive(value, "gas constant").map(Self)
    }

    #[inline]
    pub fn value(self) -> Real {
        self.0
    }

    /// Replace the stored value, keeping the old one if the new one is invalid.
    pub fn set(&mut self, value: Real) -> CoreResult<()> {
        *self = Self::new(value)?;
        Ok(())
    }

    /// `R·T`, the factor that turns density into pressure.
    #[inline]
    pub fn rt(self, temperature: Real) -> Real {
        self.0 * temperature
    }
}

impl Default for GasConstant {
    fn default() -> Self {
        Self(DEFAULT_GAS_CONSTANT)
    }
}

impl TryFrom<Real> for GasConstant {
    type Error = CoreError;

    fn try_from(value: Real) -> CoreResult<Self> {
        Self::new(value)
    }
}
