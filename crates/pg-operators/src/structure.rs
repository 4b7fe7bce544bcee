//! Mesh-only operators of one pipe.
//!
//! Layout for `n` nodes: the state is `[rho_0..rho_{n-1}, m_0..m_{n-1}]`
//! (length `2n`), the effort and residual spaces append the two boundary
//! efforts (length `2n + 2`).
//!
//! The divergence `M` places `-D` twice (momentum into the density rate,
//! pressure effort into the momentum rate) and adds the boundary rows tying
//! the end efforts to the two input channels. With one-sided boundary
//! stencils `M` is not skew, so it is kept as `M = J - K` with
//! `J = (M - M^T) / 2` exactly skew and `K = -(M + M^T) / 2` a symmetric
//! closure supported near the pipe ends.

use crate::derivative::derivative_operator;
use crate::error::{OperatorError, OperatorResult};
use crate::sparse::{SparseOperator, Triplet};
use pg_core::Real;

#[derive(Clone, Debug)]
pub struct PipeStructure {
    nodes: usize,
    mesh_width: Real,
    energy: SparseOperator<Real>,
    divergence: SparseOperator<Real>,
    skew: SparseOperator<Real>,
    closure: SparseOperator<Real>,
    output: SparseOperator<Real>,
    input: SparseOperator<Real>,
}

impl PipeStructure {
    pub fn new(nodes: usize, mesh_width: Real) -> OperatorResult<Self> {
        let derivative = derivative_operator(nodes, mesh_width)?;
        let divergence = divergence_operator(nodes, &derivative)?;
        let transposed = divergence.transpose();
        let skew = divergence.linear_combination(0.5, &transposed, -0.5)?;
        let closure = divergence.linear_combination(-0.5, &transposed, -0.5)?;

        Ok(Self {
            nodes,
            mesh_width,
            energy: energy_operator(nodes)?,
            divergence,
            skew,
            closure,
            output: output_operator(nodes)?,
            input: input_operator(nodes)?,
        })
    }

    pub fn nodes(&self) -> usize {
        self.nodes
    }

    pub fn mesh_width(&self) -> Real {
        self.mesh_width
    }

    pub fn state_len(&self) -> usize {
        2 * self.nodes
    }

    pub fn residual_len(&self) -> usize {
        2 * self.nodes + 2
    }

    /// `E`: identity on the state, padded with two zero rows.
    pub fn energy(&self) -> &SparseOperator<Real> {
        &self.energy
    }

    /// `M = J - K`, the assembled divergence with boundary coupling.
    pub fn divergence(&self) -> &SparseOperator<Real> {
        &self.divergence
    }

    /// `J`, skew-symmetric.
    pub fn skew(&self) -> &SparseOperator<Real> {
        &self.skew
    }

    /// `K`, symmetric boundary closure.
    pub fn closure(&self) -> &SparseOperator<Real> {
        &self.closure
    }

    /// `Y`, selects inlet pressure effort and outlet momentum from the effort.
    pub fn output(&self) -> &SparseOperator<Real> {
        &self.output
    }

    /// `G` of a standalone pipe: unit injections on the two boundary rows.
    pub fn input(&self) -> &SparseOperator<Real> {
        &self.input
    }
}

fn check_nodes(nodes: usize) -> OperatorResult<()> {
    if nodes < 3 {
        return Err(OperatorError::InvalidArg {
            what: "pipe needs at least 3 nodes",
        });
    }
    Ok(())
}

pub fn energy_operator(nodes: usize) -> OperatorResult<SparseOperator<Real>> {
    check_nodes(nodes)?;
    let state = 2 * nodes;
    SparseOperator::from_triplets(state + 2, state, (0..state).map(|i| Triplet::new(i, i, 1.0)))
}

/// `M` of size `(2n + 2) x (2n + 2)` built from the derivative operator.
pub fn divergence_operator(
    nodes: usize,
    derivative: &SparseOperator<Real>,
) -> OperatorResult<SparseOperator<Real>> {
    check_nodes(nodes)?;
    if derivative.shape() != (nodes, nodes) {
        return Err(OperatorError::DimensionMismatch {
            what: "derivative operator",
            expected: nodes,
            actual: derivative.nrows(),
        });
    }
    let size = 2 * nodes + 2;
    let mut entries = Vec::with_capacity(2 * derivative.nnz() + 2);
    for t in derivative.triplets() {
        entries.push(Triplet::new(t.row, nodes + t.col, -t.value));
        entries.push(Triplet::new(nodes + t.row, t.col, -t.value));
    }
    entries.push(Triplet::new(2 * nodes, 0, -1.0));
    entries.push(Triplet::new(2 * nodes + 1, 2 * nodes - 1, 1.0));
    SparseOperator::from_triplets(size, size, entries)
}

/// `Y` of size `2 x 2(N + 1)`, where `N + 1 = nodes`. Picks the first
/// pressure effort and the last momentum effort.
pub fn output_operator(nodes: usize) -> OperatorResult<SparseOperator<Real>> {
    check_nodes(nodes)?;
    SparseOperator::from_triplets(
        2,
        2 * nodes + 2,
        [Triplet::new(0, 0, 1.0), Triplet::new(1, 2 * nodes - 1, 1.0)],
    )
}

/// `G` of size `(2n + 2) x 2`.
pub fn input_operator(nodes: usize) -> OperatorResult<SparseOperator<Real>> {
    check_nodes(nodes)?;
    SparseOperator::from_triplets(
        2 * nodes + 2,
        2,
        [
            Triplet::new(2 * nodes, 0, 1.0),
            Triplet::new(2 * nodes + 1, 1, 1.0),
        ],
    )
}
