//! Sparse operators with a frozen pattern and a swappable value buffer.
//!
//! A `SparsityPattern` is assembled once through `sprs` (rows sorted,
//! duplicates merged) and shared through `Arc`. A `SparseOperator<T>` pairs such a pattern with its
//! own values, so state-dependent operators re-evaluate into fresh buffers
//! without touching anything another evaluation might be reading.

use crate::error::{OperatorError, OperatorResult, check_len};
use nalgebra::DMatrix;
use pg_core::{Real, Scalar};
use sprs::{CsMat, TriMat};
use std::ops::Range;
use std::sync::Arc;

/// One (row, col, value) entry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triplet<T> {
    pub row: usize,
    pub col: usize,
    pub value: T,
}

impl<T> Triplet<T> {
    pub fn new(row: usize, col: usize, value: T) -> Self {
        Self { row, col, value }
    }
}

/// Compressed-row sparsity pattern. Immutable once assembled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SparsityPattern {
    nrows: usize,
    ncols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
}

impl SparsityPattern {
    /// Compress arbitrary in-bounds coordinates. Order does not matter and
    /// repeated coordinates collapse to one entry.
    fn from_coords(nrows: usize, ncols: usize, coords: &[(usize, usize)]) -> Self {
        let mut tri = TriMat::with_capacity((nrows, ncols), coords.len());
        for &(row, col) in coords {
            tri.add_triplet(row, col, 1.0);
        }
        let csr: CsMat<Real> = tri.to_csr();
        let indptr = csr.indptr();
        Self {
            nrows,
            ncols,
            row_ptr: (0..=nrows).map(|row| indptr.index(row)).collect(),
            col_idx: csr.indices().to_vec(),
        }
    }

    /// Stack patterns along the diagonal.
    ///
    /// Storage order of the result is the concatenation of the blocks'
    /// storage orders, so block values can simply be appended.
    pub fn block_diagonal(blocks: &[&SparsityPattern]) -> Self {
        let nrows = blocks.iter().map(|b| b.nrows).sum();
        let ncols = blocks.iter().map(|b| b.ncols).sum();
        let nnz = blocks.iter().map(|b| b.nnz()).sum();

        let mut row_ptr = Vec::with_capacity(nrows + 1);
        let mut col_idx = Vec::with_capacity(nnz);
        row_ptr.push(0);

        let mut col_offset = 0;
        for block in blocks {
            let base = col_idx.len();
            for row in 0..block.nrows {
                col_idx.extend(block.row_cols(row).iter().map(|&c| c + col_offset));
                row_ptr.push(base + block.row_ptr[row + 1]);
            }
            col_offset += block.ncols;
        }

        Self {
            nrows,
            ncols,
            row_ptr,
            col_idx,
        }
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn nnz(&self) -> usize {
        self.col_idx.len()
    }

    /// Storage range of one row.
    pub fn row_range(&self, row: usize) -> Range<usize> {
        self.row_ptr[row]..self.row_ptr[row + 1]
    }

    /// Column indices stored in one row, ascending.
    pub fn row_cols(&self, row: usize) -> &[usize] {
        &self.col_idx[self.row_range(row)]
    }

    /// Storage index of (row, col), if present.
    pub fn position(&self, row: usize, col: usize) -> Option<usize> {
        if row >= self.nrows {
            return None;
        }
        let range = self.row_range(row);
        self.col_idx[range.clone()]
            .binary_search(&col)
            .ok()
            .map(|k| range.start + k)
    }

    /// (row, col) of every stored entry, in storage order.
    pub fn coords(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.nrows).flat_map(move |row| self.row_cols(row).iter().map(move |&col| (row, col)))
    }
}

/// Sparse linear operator: shared pattern plus owned values.
#[derive(Clone, Debug)]
pub struct SparseOperator<T> {
    pattern: Arc<SparsityPattern>,
    values: Vec<T>,
}

impl<T: Scalar> SparseOperator<T> {
    /// Assemble from entries. Duplicates are summed, explicit zeros are kept
    /// as structural entries.
    pub fn from_triplets<I>(nrows: usize, ncols: usize, triplets: I) -> OperatorResult<Self>
    where
        I: IntoIterator<Item = Triplet<T>>,
    {
        let entries: Vec<Triplet<T>> = triplets.into_iter().collect();
        if let Some(bad) = entries.iter().find(|t| t.row >= nrows || t.col >= ncols) {
            return Err(OperatorError::OutOfBounds {
                row: bad.row,
                col: bad.col,
                nrows,
                ncols,
            });
        }
        Ok(Self::assemble(nrows, ncols, entries))
    }

    fn assemble(nrows: usize, ncols: usize, entries: Vec<Triplet<T>>) -> Self {
        let coords: Vec<(usize, usize)> = entries.iter().map(|t| (t.row, t.col)).collect();
        let pattern = SparsityPattern::from_coords(nrows, ncols, &coords);
        let mut values = vec![T::zero(); pattern.nnz()];
        for t in entries {
            if let Some(k) = pattern.position(t.row, t.col) {
                values[k] = values[k] + t.value;
            }
        }
        Self {
            pattern: Arc::new(pattern),
            values,
        }
    }

    /// All-zero values on an existing pattern.
    pub fn zeros(pattern: Arc<SparsityPattern>) -> Self {
        let values = vec![T::zero(); pattern.nnz()];
        Self { pattern, values }
    }

    /// Attach values to an existing pattern.
    pub fn from_pattern(pattern: Arc<SparsityPattern>, values: Vec<T>) -> OperatorResult<Self> {
        check_len("operator values", pattern.nnz(), values.len())?;
        Ok(Self { pattern, values })
    }

    /// Block-diagonal composite. Values are the blocks' values in order.
    pub fn block_diagonal(blocks: &[&SparseOperator<T>]) -> Self {
        let patterns: Vec<&SparsityPattern> = blocks.iter().map(|b| b.pattern.as_ref()).collect();
        let values = blocks
            .iter()
            .flat_map(|b| b.values.iter().copied())
            .collect();
        Self {
            pattern: Arc::new(SparsityPattern::block_diagonal(&patterns)),
            values,
        }
    }

    pub fn pattern(&self) -> &Arc<SparsityPattern> {
        &self.pattern
    }

    pub fn nrows(&self) -> usize {
        self.pattern.nrows
    }

    pub fn ncols(&self) -> usize {
        self.pattern.ncols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Values in storage order. The pattern cannot be changed through this.
    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.values
    }

    /// True when both operators refer to the same pattern allocation or to
    /// equal patterns.
    pub fn same_pattern(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.pattern, &other.pattern) || self.pattern == other.pattern
    }

    /// Stored value at (row, col), `None` if the entry is structurally absent.
    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        self.pattern.position(row, col).map(|k| self.values[k])
    }

    /// Value at (row, col), zero when absent.
    pub fn value_at(&self, row: usize, col: usize) -> T {
        self.get(row, col).unwrap_or_else(T::zero)
    }

    /// Overwrite an existing entry. Positions outside the pattern are rejected.
    pub fn set(&mut self, row: usize, col: usize, value: T) -> OperatorResult<()> {
        let k = self
            .pattern
            .position(row, col)
            .ok_or(OperatorError::NotInPattern { row, col })?;
        self.values[k] = value;
        Ok(())
    }

    pub fn triplets(&self) -> impl Iterator<Item = Triplet<T>> + '_ {
        self.pattern
            .coords()
            .zip(self.values.iter())
            .map(|((row, col), &value)| Triplet { row, col, value })
    }

    /// Same pattern, transformed values.
    pub fn map<U: Scalar>(&self, f: impl Fn(T) -> U) -> SparseOperator<U> {
        SparseOperator {
            pattern: Arc::clone(&self.pattern),
            values: self.values.iter().map(|&v| f(v)).collect(),
        }
    }

    pub fn transpose(&self) -> Self {
        let entries = self
            .triplets()
            .map(|t| Triplet::new(t.col, t.row, t.value))
            .collect();
        Self::assemble(self.ncols(), self.nrows(), entries)
    }

    /// `a * self + b * other` on the union of both patterns.
    pub fn linear_combination(&self, a: Real, other: &Self, b: Real) -> OperatorResult<Self> {
        check_len("combined operator rows", self.nrows(), other.nrows())?;
        check_len("combined operator cols", self.ncols(), other.ncols())?;
        let entries = self
            .triplets()
            .map(|t| Triplet::new(t.row, t.col, t.value.scale(a)))
            .chain(
                other
                    .triplets()
                    .map(|t| Triplet::new(t.row, t.col, t.value.scale(b))),
            )
            .collect();
        Ok(Self::assemble(self.nrows(), self.ncols(), entries))
    }

    /// `y += alpha * (self * x)`.
    pub fn mul_acc(&self, alpha: T, x: &[T], y: &mut [T]) -> OperatorResult<()> {
        check_len("operand", self.ncols(), x.len())?;
        check_len("accumulator", self.nrows(), y.len())?;
        for (row, out) in y.iter_mut().enumerate() {
            let mut acc = T::zero();
            for k in self.pattern.row_range(row) {
                acc = acc + self.values[k] * x[self.pattern.col_idx[k]];
            }
            *out = *out + alpha * acc;
        }
        Ok(())
    }

    pub fn mul_vec(&self, x: &[T]) -> OperatorResult<Vec<T>> {
        let mut y = vec![T::zero(); self.nrows()];
        self.mul_acc(T::one(), x, &mut y)?;
        Ok(y)
    }
}

impl SparseOperator<Real> {
    /// Plain operator lifted to another scalar type, sharing the pattern.
    pub fn lift<U: Scalar>(&self) -> SparseOperator<U> {
        self.map(U::from_real)
    }

    /// `y += alpha * (self * x)` with plain coefficients applied to generic operands.
    pub fn mul_acc_lifted<U: Scalar>(&self, alpha: Real, x: &[U], y: &mut [U]) -> OperatorResult<()> {
        check_len("operand", self.ncols(), x.len())?;
        check_len("accumulator", self.nrows(), y.len())?;
        for (row, out) in y.iter_mut().enumerate() {
            let mut acc = U::zero();
            for k in self.pattern.row_range(row) {
                acc = acc + x[self.pattern.col_idx[k]].scale(self.values[k]);
            }
            *out = *out + acc.scale(alpha);
        }
        Ok(())
    }

    pub fn to_dense(&self) -> DMatrix<Real> {
        let mut dense = DMatrix::zeros(self.nrows(), self.ncols());
        for t in self.triplets() {
            dense[(t.row, t.col)] += t.value;
        }
        dense
    }

    /// `|A[i,j] + A[j,i]| <= tol` for every stored entry.
    pub fn is_antisymmetric(&self, tol: Real) -> bool {
        self.nrows() == self.ncols()
            && self
                .triplets()
                .all(|t| (t.value + self.value_at(t.col, t.row)).abs() <= tol)
    }

    /// `|A[i,j] - A[j,i]| <= tol` for every stored entry.
    pub fn is_symmetric(&self, tol: Real) -> bool {
        self.nrows() == self.ncols()
            && self
                .triplets()
                .all(|t| (t.value - self.value_at(t.col, t.row)).abs() <= tol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> SparseOperator<Real> {
        SparseOperator::from_triplets(
            2,
            3,
            vec![
                Triplet::new(1, 2, 4.0),
                Triplet::new(0, 0, 1.0),
                Triplet::new(0, 2, 2.0),
                Triplet::new(0, 0, 0.5),
            ],
        )
        .unwrap()
    }

    #[test]
    fn duplicates_are_summed_and_sorted() {
        let op = small();
        assert_eq!(op.nnz(), 3);
        assert_eq!(op.get(0, 0), Some(1.5));
        assert_eq!(op.get(0, 1), None);
        assert_eq!(op.value_at(0, 1), 0.0);
        let coords: Vec<_> = op.pattern().coords().collect();
        assert_eq!(coords, vec![(0, 0), (0, 2), (1, 2)]);
    }

    #[test]
    fn explicit_zero_is_structural() {
        let mut op =
            SparseOperator::from_triplets(2, 2, vec![Triplet::new(1, 0, 0.0)]).unwrap();
        assert_eq!(op.nnz(), 1);
        op.set(1, 0, 3.0).unwrap();
        assert_eq!(op.get(1, 0), Some(3.0));
    }

    #[test]
    fn cancelling_duplicates_stay_structural() {
        let op = SparseOperator::from_triplets(
            3,
            3,
            vec![
                Triplet::new(2, 1, 1.0),
                Triplet::new(0, 2, 5.0),
                Triplet::new(2, 1, -1.0),
                Triplet::new(2, 0, 2.0),
            ],
        )
        .unwrap();
        assert_eq!(op.nnz(), 3);
        assert_eq!(op.get(2, 1), Some(0.0));
        assert_eq!(op.pattern().row_range(1), 1..1);
        assert_eq!(op.pattern().row_cols(2), &[0, 1]);
        assert_eq!(op.to_dense()[(0, 2)], 5.0);
    }

    #[test]
    fn set_outside_pattern_is_rejected() {
        let mut op = small();
        let err = op.set(1, 1, 1.0).unwrap_err();
        assert_eq!(err, OperatorError::NotInPattern { row: 1, col: 1 });
        assert_eq!(op.nnz(), 3);
    }

    #[test]
    fn out_of_bounds_triplet_is_rejected() {
        let err = SparseOperator::from_triplets(2, 2, vec![Triplet::new(2, 0, 1.0)]).unwrap_err();
        assert!(matches!(err, OperatorError::OutOfBounds { row: 2, .. }));
    }

    #[test]
    fn mul_vec_matches_dense() {
        let op = small();
        let x = [1.0, 2.0, 3.0];
        let y = op.mul_vec(&x).unwrap();
        let dense = op.to_dense() * nalgebra::DVector::from_column_slice(&x);
        assert_eq!(y, dense.as_slice());
        assert_eq!(y, vec![1.5 + 6.0, 12.0]);
    }

    #[test]
    fn mul_vec_checks_dimensions() {
        let err = small().mul_vec(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            OperatorError::DimensionMismatch {
                expected: 3,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn transpose_swaps_entries() {
        let t = small().transpose();
        assert_eq!(t.shape(), (3, 2));
        assert_eq!(t.get(2, 1), Some(4.0));
        assert_eq!(t.get(2, 0), Some(2.0));
    }

    #[test]
    fn block_diagonal_offsets_and_appends_values() {
        let a = small();
        let b = SparseOperator::from_triplets(1, 1, vec![Triplet::new(0, 0, 7.0)]).unwrap();
        let bd = SparseOperator::block_diagonal(&[&a, &b]);
        assert_eq!(bd.shape(), (3, 4));
        assert_eq!(bd.get(2, 3), Some(7.0));
        assert_eq!(bd.get(1, 2), Some(4.0));
        assert_eq!(bd.values(), &[1.5, 2.0, 4.0, 7.0]);
    }

    #[test]
    fn map_shares_pattern() {
        let op = small();
        let doubled = op.map(|v| 2.0 * v);
        assert!(Arc::ptr_eq(op.pattern(), doubled.pattern()));
        assert!(op.same_pattern(&doubled));
        assert_eq!(doubled.get(1, 2), Some(8.0));
    }

    #[test]
    fn linear_combination_unions_patterns() {
        let a = SparseOperator::from_triplets(2, 2, vec![Triplet::new(0, 1, 1.0)]).unwrap();
        let skew = a.linear_combination(1.0, &a.transpose(), -1.0).unwrap();
        assert_eq!(skew.get(0, 1), Some(1.0));
        assert_eq!(skew.get(1, 0), Some(-1.0));
        assert!(skew.is_antisymmetric(0.0));
        assert!(!skew.is_symmetric(0.0));
    }

    #[test]
    fn from_pattern_checks_value_count() {
        let op = small();
        assert!(SparseOperator::from_pattern(Arc::clone(op.pattern()), vec![1.0; 2]).is_err());
        let zeros = SparseOperator::<Real>::zeros(Arc::clone(op.pattern()));
        assert_eq!(zeros.values(), &[0.0; 3]);
    }

    #[test]
    fn lifted_product_matches_plain() {
        use num_dual::Dual64;
        let op = small();
        let x = [1.0, 2.0, 3.0];
        let xd: Vec<Dual64> = pg_core::lift(&x);
        let mut yd = vec![Dual64::from(0.0); 2];
        op.mul_acc_lifted(-2.0, &xd, &mut yd).unwrap();
        let y = op.mul_vec(&x).unwrap();
        for (d, p) in yd.iter().zip(&y) {
            assert_eq!(d.re, -2.0 * p);
        }
    }
}
