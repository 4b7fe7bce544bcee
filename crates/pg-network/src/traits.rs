//! The system contract shared by single pipes and networks.

use crate::error::NetworkResult;
use crate::snapshot::NetworkSnapshot;
use pg_core::{Real, Scalar};
use pg_operators::SparseOperator;

/// State-dependent parts of `E z' = (J - K - R) e(z) + G u`, evaluated for one
/// state.
///
/// Every evaluation owns its values; the sparsity patterns inside are shared
/// with the system that produced them.
#[derive(Clone, Debug)]
pub struct SystemTerms<T> {
    /// `R`, friction on the momentum diagonal.
    pub friction: SparseOperator<T>,
    /// `e`, the effort vector including the boundary efforts.
    pub effort: Vec<T>,
    /// `G`, with compressor coupling entries filled in for this state.
    pub input: SparseOperator<T>,
    /// Compression ratio implied by this state, if the system has a compressor.
    pub compression_ratio: Option<T>,
}

/// A discretized port-Hamiltonian system.
///
/// Implementors are deterministic functions of the state passed to `terms`,
/// so they can be shared across threads evaluating residuals concurrently.
/// The owned state is only touched through `&mut self`.
pub trait PortHamiltonian: Send + Sync {
    /// Name for logging and snapshots.
    fn name(&self) -> &str;

    fn state_len(&self) -> usize;

    fn residual_len(&self) -> usize;

    /// Number of boundary input channels, the column count of `G`.
    fn input_len(&self) -> usize;

    /// `E`.
    fn energy(&self) -> &SparseOperator<Real>;

    /// `J`, skew-symmetric.
    fn skew(&self) -> &SparseOperator<Real>;

    /// `K`, the symmetric boundary closure with `J - K` the assembled divergence.
    fn closure(&self) -> &SparseOperator<Real>;

    /// Evaluate `R`, `e` and `G` for `state` without touching `self`.
    ///
    /// # Errors
    /// `DimensionMismatch` when `state` is not `state_len()` long. Degenerate
    /// states (zero density) are not errors; they yield non-finite terms.
    fn terms<T: Scalar>(&self, state: &[T]) -> NetworkResult<SystemTerms<T>>;

    /// Current owned state, flattened.
    fn state(&self) -> Vec<Real>;

    /// Replace the owned state wholesale.
    fn set_state(&mut self, state: &[Real]) -> NetworkResult<()>;

    /// Boundary input vector for the given inlet pressure (Pa) and outlet momentum.
    fn boundary_inputs(&self, inlet_pressure: Real, outlet_momentum: Real) -> Vec<Real>;

    /// Overwrite the inlet density and outlet momentum of `guess` with the
    /// values the boundary conditions prescribe.
    fn pin_boundary(
        &self,
        guess: &mut [Real],
        inlet_pressure: Real,
        outlet_momentum: Real,
    ) -> NetworkResult<()>;

    /// Owned state of every pipe, tagged with `time` in seconds.
    fn snapshot(&self, time: Real) -> NetworkSnapshot;

    /// Owned-state terms, for inspection between solves.
    fn refresh(&self) -> NetworkResult<SystemTerms<Real>> {
        self.terms(&self.state())
    }
}
