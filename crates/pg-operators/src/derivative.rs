//! Finite-difference weights from Taylor tables.
//!
//! For stencil offsets `s_j` the weights `w` of the `order`-th derivative
//! solve `A w = e_order` with `A[i][j] = s_j^i / i!`. The system is square,
//! so every stencil of `k` points resolves derivatives up to order `k - 1`.

use crate::error::{OperatorError, OperatorResult};
use crate::sparse::{SparseOperator, Triplet};
use nalgebra::{DMatrix, DVector};
use pg_core::{Real, ensure_finite};

const CENTRAL: [Real; 3] = [-1.0, 0.0, 1.0];
const FORWARD: [Real; 3] = [0.0, 1.0, 2.0];
const BACKWARD: [Real; 3] = [-2.0, -1.0, 0.0];

fn factorial(i: usize) -> Real {
    (1..=i).map(|k| k as Real).product()
}

/// Weights of the `order`-th derivative on unit spacing for the given offsets.
pub fn taylor_table(offsets: &[Real], order: usize) -> OperatorResult<DVector<Real>> {
    let n = offsets.len();
    if order >= n {
        return Err(OperatorError::InvalidArg {
            what: "derivative order must be below the stencil size",
        });
    }
    let table = DMatrix::from_fn(n, n, |i, j| offsets[j].powi(i as i32) / factorial(i));
    let mut rhs = DVector::zeros(n);
    rhs[order] = 1.0;
    table.col_piv_qr().solve(&rhs).ok_or(OperatorError::Singular {
        what: "taylor table with repeated stencil offsets",
    })
}

/// First-derivative operator on `n` uniformly spaced nodes with spacing `h`.
///
/// Interior rows use the central stencil; the first and last rows use
/// one-sided stencils reaching into the domain.
pub fn derivative_operator(n: usize, h: Real) -> OperatorResult<SparseOperator<Real>> {
    if n < 3 {
        return Err(OperatorError::InvalidArg {
            what: "derivative operator needs at least 3 nodes",
        });
    }
    let h = ensure_finite(h, "mesh width")?;
    if h <= 0.0 {
        return Err(OperatorError::InvalidArg {
            what: "mesh width must be positive",
        });
    }

    let central = taylor_table(&CENTRAL, 1)?;
    let forward = taylor_table(&FORWARD, 1)?;
    let backward = taylor_table(&BACKWARD, 1)?;

    let mut entries = Vec::with_capacity(3 * n);
    let mut push_row = |row: usize, first_col: usize, weights: &DVector<Real>| {
        for (j, w) in weights.iter().enumerate() {
            entries.push(Triplet::new(row, first_col + j, w / h));
        }
    };

    push_row(0, 0, &forward);
    for row in 1..n - 1 {
        push_row(row, row - 1, &central);
    }
    push_row(n - 1, n - 3, &backward);

    tracing::debug!(nodes = n, width = h, "assembled derivative operator");
    SparseOperator::from_triplets(n, n, entries)
}
