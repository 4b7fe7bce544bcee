//! Jacobians of a `Residual`, one column per task on the rayon pool.

use crate::error::{SolverError, SolverResult};
use crate::residual::Residual;
use nalgebra::DMatrix;
use num_dual::Dual64;
use pg_core::{Real, lift};
use rayon::prelude::*;

/// How the driver differentiates the residual.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum JacobianMethod {
    /// Forward-mode dual numbers, exact to rounding.
    #[default]
    Dual,
    /// Forward differences with step `epsilon * max(|x_j|, 1)`.
    FiniteDifference { epsilon: Real },
}

impl JacobianMethod {
    pub fn jacobian<R: Residual>(&self, residual: &R, x: &[Real]) -> SolverResult<DMatrix<Real>> {
        match *self {
            JacobianMethod::Dual => dual_jacobian(residual, x),
            JacobianMethod::FiniteDifference { epsilon } => {
                finite_difference_jacobian(residual, x, epsilon)
            }
        }
    }
}

fn assemble(rows: usize, columns: Vec<Vec<Real>>) -> DMatrix<Real> {
    let ncols = columns.len();
    DMatrix::from_fn(rows, ncols, |i, j| columns[j][i])
}

/// Seed one dual direction per column and read the derivative parts.
pub fn dual_jacobian<R: Residual>(residual: &R, x: &[Real]) -> SolverResult<DMatrix<Real>> {
    let rows = residual.num_residuals();
    let base: Vec<Dual64> = lift(x);
    let columns = (0..x.len())
        .into_par_iter()
        .map(|j| {
            let mut seeded = base.clone();
            seeded[j] = seeded[j].derivative();
            let values = residual.values(&seeded)?;
            Ok(values.iter().map(|v| v.eps).collect())
        })
        .collect::<SolverResult<Vec<Vec<Real>>>>()?;
    Ok(assemble(rows, columns))
}

/// Forward-difference Jacobian.
pub fn finite_difference_jacobian<R: Residual>(
    residual: &R,
    x: &[Real],
    epsilon: Real,
) -> SolverResult<DMatrix<Real>> {
    if !(epsilon.is_finite() && epsilon > 0.0) {
        return Err(SolverError::ProblemSetup {
            what: format!("finite difference step must be positive, got {epsilon}"),
        });
    }
    let rows = residual.num_residuals();
    let f_x = residual.values(x)?;
    let columns = (0..x.len())
        .into_par_iter()
        .map(|j| {
            let mut perturbed = x.to_vec();
            let dx = epsilon * x[j].abs().max(1.0);
            perturbed[j] += dx;
            let f_perturbed = residual.values(&perturbed)?;
            Ok(f_perturbed
                .iter()
                .zip(&f_x)
                .map(|(a, b)| (a - b) / dx)
                .collect())
        })
        .collect::<SolverResult<Vec<Vec<Real>>>>()?;
    Ok(assemble(rows, columns))
}
