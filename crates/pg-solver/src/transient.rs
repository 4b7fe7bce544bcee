//! Implicit-midpoint residual for one time step.
//!
//! With `z = (x + x_prev) / 2` and `dz = (x - x_prev) / dt` the residual is
//! `E dz - (J - K - R(z)) e(z) - G(z) u_mid`.

use crate::error::{SolverError, SolverResult, check_len};
use crate::levenberg::{LmConfig, LmReport, least_squares};
use crate::residual::{Residual, accumulate_dynamics, check_buffers};
use pg_core::{Real, Scalar};
use pg_network::PortHamiltonian;

pub struct TransientResidual<'a, S> {
    system: &'a S,
    previous: Vec<Real>,
    dt: Real,
    inputs: Vec<Real>,
}

impl<'a, S: PortHamiltonian> TransientResidual<'a, S> {
    /// `inputs` are the time-centered boundary inputs of the step.
    pub fn new(system: &'a S, previous: Vec<Real>, dt: Real, inputs: Vec<Real>) -> SolverResult<Self> {
        check_len("previous state", system.state_len(), previous.len())?;
        check_len("boundary inputs", system.input_len(), inputs.len())?;
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SolverError::ProblemSetup {
                what: format!("time step must be positive and finite, got {dt}"),
            });
        }
        Ok(Self {
            system,
            previous,
            dt,
            inputs,
        })
    }

    pub fn dt(&self) -> Real {
        self.dt
    }

    pub fn previous(&self) -> &[Real] {
        &self.previous
    }
}

impl<S: PortHamiltonian> Residual for TransientResidual<'_, S> {
    fn num_parameters(&self) -> usize {
        self.system.state_len()
    }

    fn num_residuals(&self) -> usize {
        self.system.residual_len()
    }

    fn evaluate<T: Scalar>(&self, x: &[T], out: &mut [T]) -> SolverResult<()> {
        check_buffers(self, x, out)?;
        let inverse_dt = 1.0 / self.dt;
        let (midpoint, rate): (Vec<T>, Vec<T>) = x
            .iter()
            .zip(&self.previous)
            .map(|(&new, &old)| {
                let old = T::from_real(old);
                ((new + old).scale(0.5), (new - old).scale(inverse_dt))
            })
            .unzip();

        let terms = self.system.terms(&midpoint)?;
        out.fill(T::zero());
        self.system.energy().mul_acc_lifted(1.0, &rate, out)?;
        accumulate_dynamics(self.system, &terms, &self.inputs, -1.0, out)
    }
}

/// Average of the boundary inputs at the start and end of a step.
pub fn midpoint_inputs(start: &[Real], end: &[Real]) -> SolverResult<Vec<Real>> {
    check_len("boundary inputs", start.len(), end.len())?;
    Ok(start.iter().zip(end).map(|(a, b)| 0.5 * (a + b)).collect())
}

/// Advance the owned state by one step from `guess`, storing the result.
pub fn step_transient<S: PortHamiltonian>(
    system: &mut S,
    guess: &[Real],
    dt: Real,
    inputs: Vec<Real>,
    config: &LmConfig,
) -> SolverResult<LmReport> {
    let previous = system.state();
    let report = {
        let residual = TransientResidual::new(&*system, previous, dt, inputs)?;
        least_squares(&residual, guess, config)?
    };
    system.set_state(&report.x)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pg_core::GasConstant;
    use pg_core::units::{k, m};
    use pg_network::{DiscretePipe, PipeGeometry};

    fn steady_pipe() -> DiscretePipe {
        let geometry = PipeGeometry::new(m(1000.0), m(0.5), 0.0).unwrap();
        let mut p = DiscretePipe::new("p", geometry, 6, k(300.0), GasConstant::default()).unwrap();
        p.set_uniform_pressure(50.0e5);
        p.set_uniform_momentum(400.0);
        p
    }

    #[test]
    fn steady_state_is_a_fixed_point() {
        let p = steady_pipe();
        let u = p.boundary_inputs(50.0e5, 400.0);
        let residual = TransientResidual::new(&p, p.state(), 60.0, u).unwrap();
        for v in residual.values(&p.state()).unwrap() {
            assert!(v.abs() < 1e-6, "{v}");
        }
    }

    #[test]
    fn rate_term_sees_state_change() {
        let p = steady_pipe();
        let u = p.boundary_inputs(50.0e5, 400.0);
        let dt = 10.0;
        let residual = TransientResidual::new(&p, p.state(), dt, u).unwrap();
        let mut x = p.state();
        x[3] += 1.0;
        let values = residual.values(&x).unwrap();
        // E dz contributes 1/dt on the perturbed density row
        assert!((values[3] - 1.0 / dt).abs() < 1e-6);
    }

    #[test]
    fn invalid_step_is_rejected() {
        let p = steady_pipe();
        let u = p.boundary_inputs(50.0e5, 400.0);
        assert!(TransientResidual::new(&p, p.state(), 0.0, u.clone()).is_err());
        assert!(TransientResidual::new(&p, p.state(), Real::NAN, u.clone()).is_err());
        assert!(TransientResidual::new(&p, vec![1.0; 3], 1.0, u).is_err());
    }

    #[test]
    fn midpoint_inputs_average() {
        let u = midpoint_inputs(&[1.0, -2.0], &[3.0, -4.0]).unwrap();
        assert_eq!(u, vec![2.0, -3.0]);
        assert!(midpoint_inputs(&[1.0], &[1.0, 2.0]).is_err());
    }
}
