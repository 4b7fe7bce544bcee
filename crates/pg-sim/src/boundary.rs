//! Time-dependent boundary values.

use pg_core::Real;
use pg_network::PortHamiltonian;

const HOUR_S: Real = 3600.0;
const DAY_S: Real = 24.0 * HOUR_S;

/// A scalar boundary value as a function of time in seconds.
///
/// Implementations must be defined for every finite time, including times
/// before the start of the run (the first midpoint input looks back one step).
pub trait BoundaryCondition: Send + Sync {
    fn value_at(&self, time: Real) -> Real;
}

/// The same value at every time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantBoundary(pub Real);

impl BoundaryCondition for ConstantBoundary {
    fn value_at(&self, _time: Real) -> Real {
        self.0
    }
}

/// Piecewise-constant daily cycle of four 6-hour windows.
///
/// Times past 24 h wrap around the day; negative times fall in the first
/// window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiurnalProfile {
    levels: [Real; 4],
}

impl DiurnalProfile {
    /// Outlet momentum demand of the reference scenarios.
    pub const REFERENCE_OUTLET_MOMENTUM: [Real; 4] = [463.33, 540.55, 386.11, 463.33];

    pub const WINDOW_S: Real = 6.0 * HOUR_S;

    pub fn new(levels: [Real; 4]) -> Self {
        Self { levels }
    }

    pub fn levels(&self) -> [Real; 4] {
        self.levels
    }
}

impl Default for DiurnalProfile {
    fn default() -> Self {
        Self::new(Self::REFERENCE_OUTLET_MOMENTUM)
    }
}

impl BoundaryCondition for DiurnalProfile {
    fn value_at(&self, time: Real) -> Real {
        let within_day = time.max(0.0).rem_euclid(DAY_S);
        let window = ((within_day / Self::WINDOW_S) as usize).min(self.levels.len() - 1);
        self.levels[window]
    }
}

/// The two boundary drivers of a run: inlet pressure (Pa) and outlet momentum.
pub struct BoundarySet {
    pub inlet_pressure: Box<dyn BoundaryCondition>,
    pub outlet_momentum: Box<dyn BoundaryCondition>,
}

impl BoundarySet {
    pub fn new(
        inlet_pressure: impl BoundaryCondition + 'static,
        outlet_momentum: impl BoundaryCondition + 'static,
    ) -> Self {
        Self {
            inlet_pressure: Box::new(inlet_pressure),
            outlet_momentum: Box::new(outlet_momentum),
        }
    }

    /// `(inlet pressure, outlet momentum)` at `time`.
    pub fn values_at(&self, time: Real) -> (Real, Real) {
        (
            self.inlet_pressure.value_at(time),
            self.outlet_momentum.value_at(time),
        )
    }

    /// System input vector at `time`.
    pub fn inputs_at<S: PortHamiltonian>(&self, system: &S, time: Real) -> Vec<Real> {
        let (p_in, m_out) = self.values_at(time);
        system.boundary_inputs(p_in, m_out)
    }
}

impl std::fmt::Debug for BoundarySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundarySet")
            .field("inlet_pressure_at_0", &self.inlet_pressure.value_at(0.0))
            .field("outlet_momentum_at_0", &self.outlet_momentum.value_at(0.0))
            .finish()
    }
}
