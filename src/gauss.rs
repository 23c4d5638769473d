//! Dense GF(2) Gaussian elimination.
//!
//! Triangularizes the residual system with partial pivoting over a pivot
//! permutation; physical rows never move. Eliminating a column XORs the
//! pivot row into lower rows restricted to the bits strictly above that
//! column, so the eliminated bit stays set in the target row. Those
//! sub-diagonal bits record the row-operation schedule that the block-level
//! solve replays; bits above the diagonal are the residual coefficients
//! consumed by back substitution.

use crate::bitmatrix::BitMatrix;

/// Triangularization failure: some column has no eligible pivot row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Singular;

/// Triangularizes `matrix` in place and returns the pivot permutation.
///
/// `pivots[k]` names the physical row eliminating column `k`; the
/// lowest-index eligible row always wins, so the permutation is
/// deterministic. The matrix may have more rows than columns, in which case
/// the extra rows only widen the pivot search.
pub fn triangularize(matrix: &mut BitMatrix) -> Result<Vec<usize>, Singular> {
    let rows = matrix.rows();
    let cols = matrix.cols();
    debug_assert!(rows >= cols);
    let mut pivots: Vec<usize> = (0..rows).collect();
    let mut pivot_row = vec![0u64; matrix.pitch()];
    for k in 0..cols {
        let found = (k..rows)
            .find(|&i| matrix.bit(pivots[i], k))
            .ok_or(Singular)?;
        pivots.swap(k, found);
        pivot_row.copy_from_slice(matrix.row(pivots[k]));
        for i in k + 1..rows {
            let r = pivots[i];
            if matrix.bit(r, k) {
                matrix.xor_words_above(r, &pivot_row, k);
            }
        }
    }
    Ok(pivots)
}
