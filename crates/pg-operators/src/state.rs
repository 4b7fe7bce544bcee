//! State-dependent operators: friction `R` and the effort vector.
//!
//! Both are evaluated from the guess of the current call into fresh
//! buffers. Near-zero densities are not guarded: they show up as large or
//! non-finite values for the solver to reject.

use crate::error::{OperatorError, OperatorResult, check_len};
use crate::sparse::{SparseOperator, SparsityPattern, Triplet};
use pg_core::{Real, Scalar, ensure_finite, ensure_positive};
use std::sync::Arc;

/// Diagonal friction on the momentum block, `f |m / rho| / (2 D)`.
#[derive(Clone, Debug)]
pub struct FrictionOperator {
    nodes: usize,
    coefficient: Real,
    pattern: Arc<SparsityPattern>,
}

impl FrictionOperator {
    pub fn new(nodes: usize, friction: Real, diameter: Real) -> OperatorResult<Self> {
        let friction = ensure_finite(friction, "friction factor")?;
        if friction < 0.0 {
            return Err(OperatorError::InvalidArg {
                what: "friction factor must be non-negative",
            });
        }
        let diameter = ensure_positive(diameter, "pipe diameter")?;
        let size = 2 * nodes + 2;
        let template = SparseOperator::from_triplets(
            size,
            size,
            (nodes..2 * nodes).map(|i| Triplet::new(i, i, 0.0)),
        )?;
        Ok(Self {
            nodes,
            coefficient: friction / (2.0 * diameter),
            pattern: Arc::clone(template.pattern()),
        })
    }

    pub fn pattern(&self) -> &Arc<SparsityPattern> {
        &self.pattern
    }

    /// `f / (2 D)`.
    pub fn coefficient(&self) -> Real {
        self.coefficient
    }

    /// Diagonal values, one per node, in storage order.
    pub fn values<T: Scalar>(&self, density: &[T], momentum: &[T]) -> OperatorResult<Vec<T>> {
        check_len("density", self.nodes, density.len())?;
        check_len("momentum", self.nodes, momentum.len())?;
        Ok(density
            .iter()
            .zip(momentum)
            .map(|(&rho, &m)| (m / rho).abs().scale(self.coefficient))
            .collect())
    }

    pub fn evaluate<T: Scalar>(
        &self,
        density: &[T],
        momentum: &[T],
    ) -> OperatorResult<SparseOperator<T>> {
        let values = self.values(density, momentum)?;
        SparseOperator::from_pattern(Arc::clone(&self.pattern), values)
    }
}

/// Maps `(rho, m)` to `[R T rho; m; Y [R T rho; m]]`.
#[derive(Clone, Debug)]
pub struct EffortMap {
    nodes: usize,
    output: SparseOperator<Real>,
}

impl EffortMap {
    /// `output` is the pipe's `Y`.
    pub fn new(nodes: usize, output: SparseOperator<Real>) -> OperatorResult<Self> {
        check_len("output operator columns", 2 * nodes + 2, output.ncols())?;
        check_len("output operator rows", 2, output.nrows())?;
        Ok(Self { nodes, output })
    }

    /// Length of the effort vector, `2n + 2`.
    pub fn effort_len(&self) -> usize {
        2 * self.nodes + 2
    }

    /// `rt` is the product of gas constant and pipe temperature.
    pub fn evaluate<T: Scalar>(&self, density: &[T], momentum: &[T], rt: Real) -> OperatorResult<Vec<T>> {
        let mut effort = vec![T::zero(); self.effort_len()];
        self.evaluate_into(density, momentum, rt, &mut effort)?;
        Ok(effort)
    }

    /// Fill `out` with `[p; m; Y·e]`. The two trailing entries meet empty
    /// columns of the divergence, so they act only through the output and input channels.
    pub fn evaluate_into<T: Scalar>(
        &self,
        density: &[T],
        momentum: &[T],
        rt: Real,
        out: &mut [T],
    ) -> OperatorResult<()> {
        let n = self.nodes;
        check_len("density", n, density.len())?;
        check_len("momentum", n, momentum.len())?;
        check_len("effort", self.effort_len(), out.len())?;

        for (slot, &rho) in out[..n].iter_mut().zip(density) {
            *slot = rho.scale(rt);
        }
        out[n..2 * n].copy_from_slice(momentum);
        out[2 * n] = T::zero();
        out[2 * n + 1] = T::zero();

        let mut boundary = [T::zero(); 2];
        self.output.mul_acc_lifted(1.0, out, &mut boundary)?;
        out[2 * n..].copy_from_slice(&boundary);
        Ok(())
    }
}
