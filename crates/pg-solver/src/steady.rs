//! Steady residual: `(J - K - R) e(x) + G u = 0`.

use crate::error::{SolverError, SolverResult};
use crate::levenberg::{LmConfig, LmReport, least_squares};
use crate::residual::{Residual, accumulate_dynamics, check_buffers};
use pg_core::{Real, Scalar};
use pg_network::PortHamiltonian;

/// Steady residual of `system` under constant boundary inputs.
///
/// Holds only a shared reference, every evaluation builds its own terms.
pub struct SteadyResidual<'a, S> {
    system: &'a S,
    inputs: Vec<Real>,
}

impl<'a, S: PortHamiltonian> SteadyResidual<'a, S> {
    pub fn new(system: &'a S, inputs: Vec<Real>) -> SolverResult<Self> {
        if inputs.len() != system.input_len() {
            return Err(SolverError::DimensionMismatch {
                what: "boundary inputs",
                expected: system.input_len(),
                actual: inputs.len(),
            });
        }
        Ok(Self { system, inputs })
    }

    pub fn inputs(&self) -> &[Real] {
        &self.inputs
    }
}

impl<S: PortHamiltonian> Residual for SteadyResidual<'_, S> {
    fn num_parameters(&self) -> usize {
        self.system.state_len()
    }

    fn num_residuals(&self) -> usize {
        self.system.residual_len()
    }

    fn evaluate<T: Scalar>(&self, x: &[T], out: &mut [T]) -> SolverResult<()> {
        check_buffers(self, x, out)?;
        let terms = self.system.terms(x)?;
        out.fill(T::zero());
        accumulate_dynamics(self.system, &terms, &self.inputs, 1.0, out)
    }
}

/// Solve for the steady state starting from the system's owned state and
/// store the result back into it.
///
/// The owned state is replaced even when the solver stops without
/// converging; check `LmReport::converged`.
pub fn solve_steady<S: PortHamiltonian>(
    system: &mut S,
    inputs: Vec<Real>,
    config: &LmConfig,
) -> SolverResult<LmReport> {
    let x0 = system.state();
    let report = {
        let residual = SteadyResidual::new(&*system, inputs)?;
        least_squares(&residual, &x0, config)?
    };
    system.set_state(&report.x)?;
    tracing::info!(
        system = system.name(),
        converged = report.converged,
        iterations = report.iterations,
        cost = report.cost,
        "steady solve finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pg_core::GasConstant;
    use pg_core::units::{k, m};
    use pg_network::{DiscretePipe, PipeGeometry};

    fn pipe(friction: Real) -> DiscretePipe {
        let geometry = PipeGeometry::new(m(1000.0), m(0.5), friction).unwrap();
        DiscretePipe::new("p", geometry, 10, k(300.0), GasConstant::default()).unwrap()
    }

    #[test]
    fn uniform_frictionless_state_has_zero_residual() {
        let mut p = pipe(0.0);
        p.set_uniform_pressure(50.0e5);
        p.set_uniform_momentum(463.33);
        let residual = SteadyResidual::new(&p, p.boundary_inputs(50.0e5, 463.33)).unwrap();
        let values = residual.values(&p.state()).unwrap();
        assert_eq!(values.len(), 24);
        for v in values {
            assert!(v.abs() < 1e-6, "{v}");
        }
    }

    #[test]
    fn wrong_buffer_lengths_are_rejected() {
        let p = pipe(0.0);
        let residual = SteadyResidual::new(&p, vec![1.0, 1.0]).unwrap();
        let err = residual.values(&[1.0; 5]).unwrap_err();
        assert!(matches!(
            err,
            SolverError::DimensionMismatch {
                expected: 22,
                actual: 5,
                ..
            }
        ));
        let mut out = vec![0.0; 3];
        assert!(residual.evaluate(&[1.0; 22], &mut out).is_err());
        assert!(SteadyResidual::new(&p, vec![1.0]).is_err());
    }

    proptest::proptest! {
        #[test]
        fn any_uniform_frictionless_state_is_steady(
            pressure in 1.0e5f64..1.0e7,
            momentum in -1.0e3f64..1.0e3,
        ) {
            let mut p = pipe(0.0);
            p.set_uniform_pressure(pressure);
            p.set_uniform_momentum(momentum);
            let residual = SteadyResidual::new(&p, p.boundary_inputs(pressure, momentum)).unwrap();
            for v in residual.values(&p.state()).unwrap() {
                proptest::prop_assert!(v.abs() <= 1e-12 * pressure);
            }
        }
    }

    #[test]
    fn friction_breaks_uniform_steady_state() {
        let mut p = pipe(0.05);
        p.set_uniform_pressure(50.0e5);
        p.set_uniform_momentum(463.33);
        let residual = SteadyResidual::new(&p, p.boundary_inputs(50.0e5, 463.33)).unwrap();
        let values = residual.values(&p.state()).unwrap();
        let momentum_rows = &values[11..22];
        assert!(momentum_rows.iter().all(|v| *v < -1.0));
    }
}
