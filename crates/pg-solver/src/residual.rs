//! The residual contract and the shared right-hand-side assembly.

use crate::error::{SolverResult, check_len};
use pg_core::{Real, Scalar, lift};
use pg_network::{PortHamiltonian, SystemTerms};

/// A vector function the least-squares driver drives to zero.
///
/// `evaluate` must depend only on `x`, so the driver may call it from many
/// threads at once.
pub trait Residual: Sync {
    fn num_parameters(&self) -> usize;

    fn num_residuals(&self) -> usize;

    /// Write the residual at `x` into `out`.
    ///
    /// # Errors
    /// `DimensionMismatch` if either buffer has the wrong length.
    fn evaluate<T: Scalar>(&self, x: &[T], out: &mut [T]) -> SolverResult<()>;

    /// Allocate-and-evaluate convenience.
    fn values<T: Scalar>(&self, x: &[T]) -> SolverResult<Vec<T>> {
        let mut out = vec![T::zero(); self.num_residuals()];
        self.evaluate(x, &mut out)?;
        Ok(out)
    }
}

pub(crate) fn check_buffers<R: Residual, T>(
    residual: &R,
    x: &[T],
    out: &[T],
) -> SolverResult<()> {
    check_len("residual parameters", residual.num_parameters(), x.len())?;
    check_len("residual output", residual.num_residuals(), out.len())
}

/// `out += sign * ((J - K - R) e + G u)`.
pub(crate) fn accumulate_dynamics<S, T>(
    system: &S,
    terms: &SystemTerms<T>,
    inputs: &[Real],
    sign: Real,
    out: &mut [T],
) -> SolverResult<()>
where
    S: PortHamiltonian,
    T: Scalar,
{
    let effort = &terms.effort;
    system.skew().mul_acc_lifted(sign, effort, out)?;
    system.closure().mul_acc_lifted(-sign, effort, out)?;
    terms
        .friction
        .mul_acc(T::from_real(-sign), effort, out)?;
    terms
        .input
        .mul_acc(T::from_real(sign), &lift::<T>(inputs), out)?;
    Ok(())
}
