//! Levenberg-Marquardt least squares with Jacobi column scaling.
//!
//! Each trial step solves the damped system
//! `[J D^-1; sqrt(lambda) I] y = [-r; 0]` by QR, with `D` the column norms of
//! `J`, and maps back with `dx = D^-1 y`. Accepted steps shrink `lambda`,
//! rejected ones grow it.

use crate::error::{SolverError, SolverResult, check_len};
use crate::jacobian::JacobianMethod;
use crate::residual::Residual;
use nalgebra::{DMatrix, DVector};
use pg_core::Real;
use pg_core::timing::AccumulatingTimer;

const MIN_LAMBDA: Real = 1e-14;
const MAX_LAMBDA: Real = 1e16;

/// Least-squares configuration.
#[derive(Clone, Debug)]
pub struct LmConfig {
    /// Maximum outer iterations (Jacobian evaluations)
    pub max_iterations: usize,
    /// Stop when an accepted step lowers the cost by less than this fraction
    pub function_tolerance: Real,
    /// Stop when `max |J^T r|` drops below this
    pub gradient_tolerance: Real,
    /// Stop when `|dx| <= tol * (|x| + tol)`
    pub parameter_tolerance: Real,
    /// Starting damping
    pub initial_lambda: Real,
    pub jacobian: JacobianMethod,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            function_tolerance: 1e-12,
            gradient_tolerance: 1e-10,
            parameter_tolerance: 1e-8,
            initial_lambda: 1e-4,
            jacobian: JacobianMethod::Dual,
        }
    }
}

/// Why the driver stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    FunctionTolerance,
    GradientTolerance,
    ParameterTolerance,
    MaxIterations,
    /// Damping grew past its cap without finding a lower cost.
    NoProgress,
}

impl Termination {
    pub fn is_converged(self) -> bool {
        matches!(
            self,
            Termination::FunctionTolerance
                | Termination::GradientTolerance
                | Termination::ParameterTolerance
        )
    }
}

/// Outcome of a least-squares run.
#[derive(Clone, Debug)]
pub struct LmReport {
    /// Best parameters found
    pub x: Vec<Real>,
    /// `0.5 |r(x0)|^2`
    pub initial_cost: Real,
    /// `0.5 |r(x)|^2`
    pub cost: Real,
    /// Outer iterations performed
    pub iterations: usize,
    pub converged: bool,
    pub termination: Termination,
    /// Wall-clock seconds spent building Jacobians
    pub jacobian_time_s: Real,
}

fn residual_vector<R: Residual>(residual: &R, x: &DVector<Real>) -> SolverResult<DVector<Real>> {
    Ok(DVector::from_vec(residual.values(x.as_slice())?))
}

fn solve_damped(scaled: &DMatrix<Real>, r: &DVector<Real>, lambda: Real) -> Option<DVector<Real>> {
    let (m, n) = scaled.shape();
    let mut a = DMatrix::zeros(m + n, n);
    a.view_mut((0, 0), (m, n)).copy_from(scaled);
    let damping = lambda.sqrt();
    for j in 0..n {
        a[(m + j, j)] = damping;
    }
    let mut b = DVector::zeros(m + n);
    for i in 0..m {
        b[i] = -r[i];
    }
    let qr = a.qr();
    let qtb = qr.q().transpose() * b;
    qr.r().solve_upper_triangular(&qtb)
}

/// Minimize `0.5 |r(x)|^2` from `x0`.
///
/// # Errors
/// `DimensionMismatch` if `x0` has the wrong length, `Numeric` if the cost
/// at `x0` is not finite. Running out of iterations is not an error.
pub fn least_squares<R: Residual>(
    residual: &R,
    x0: &[Real],
    config: &LmConfig,
) -> SolverResult<LmReport> {
    check_len("initial guess", residual.num_parameters(), x0.len())?;

    let mut x = DVector::from_column_slice(x0);
    let mut r = residual_vector(residual, &x)?;
    let mut cost = 0.5 * r.norm_squared();
    if !cost.is_finite() {
        return Err(SolverError::Numeric {
            what: format!("non-finite cost {cost} at the initial guess"),
        });
    }
    let initial_cost = cost;
    let mut lambda = config.initial_lambda;
    let jacobian_timer = AccumulatingTimer::new();

    let report = |x: DVector<Real>, cost: Real, iterations: usize, termination: Termination| {
        tracing::debug!(
            iterations,
            initial_cost,
            cost,
            ?termination,
            jacobian_evals = jacobian_timer.count(),
            jacobian_s = jacobian_timer.total_seconds(),
            "least squares finished"
        );
        LmReport {
            x: x.as_slice().to_vec(),
            initial_cost,
            cost,
            iterations,
            converged: termination.is_converged(),
            termination,
            jacobian_time_s: jacobian_timer.total_seconds(),
        }
    };

    if cost == 0.0 {
        return Ok(report(x, cost, 0, Termination::FunctionTolerance));
    }

    for iteration in 1..=config.max_iterations {
        let jac = jacobian_timer.time(|| config.jacobian.jacobian(residual, x.as_slice()))?;
        let gradient = jac.transpose() * &r;
        if gradient.amax() <= config.gradient_tolerance {
            return Ok(report(x, cost, iteration, Termination::GradientTolerance));
        }

        let (m, n) = jac.shape();
        let mut column_scale = DVector::from_element(n, 1.0);
        let mut scaled = jac;
        for j in 0..n {
            let norm = scaled.column(j).norm();
            if norm > 0.0 && norm.is_finite() {
                column_scale[j] = norm;
                for i in 0..m {
                    scaled[(i, j)] /= norm;
                }
            }
        }

        loop {
            let Some(y) = solve_damped(&scaled, &r, lambda) else {
                lambda *= 10.0;
                if lambda > MAX_LAMBDA {
                    return Ok(report(x, cost, iteration, Termination::NoProgress));
                }
                continue;
            };
            let step = y.component_div(&column_scale);
            if step.norm() <= config.parameter_tolerance * (x.norm() + config.parameter_tolerance) {
                return Ok(report(x, cost, iteration, Termination::ParameterTolerance));
            }

            let candidate = &x + &step;
            let r_candidate = residual_vector(residual, &candidate)?;
            let cost_candidate = 0.5 * r_candidate.norm_squared();

            if cost_candidate.is_finite() && cost_candidate < cost {
                let decrease = (cost - cost_candidate) / cost;
                x = candidate;
                r = r_candidate;
                cost = cost_candidate;
                lambda = (lambda * 0.1).max(MIN_LAMBDA);
                tracing::debug!(iteration, cost, lambda, "step accepted");
                if decrease <= config.function_tolerance || cost == 0.0 {
                    return Ok(report(x, cost, iteration, Termination::FunctionTolerance));
                }
                break;
            }

            lambda *= 10.0;
            if lambda > MAX_LAMBDA {
                return Ok(report(x, cost, iteration, Termination::NoProgress));
            }
        }
    }

    Ok(report(x, cost, config.max_iterations, Termination::MaxIterations))
}
