//! # Residual system assembly
//!
//! After peeling, the columns the peeler deferred plus the mixing columns
//! form a small dense GF(2) system. This module assembles it from two
//! matrices:
//!
//! * the *history* matrix, one row per dense equation over all message
//!   columns, recording which observed blocks feed the equation's right-hand
//!   side, and
//! * the *dense* matrix over the mixing and deferred columns, which the
//!   Gaussian elimination stage actually reduces.
//!
//! Deferred rows contribute their peel signature and their two mixing bits.
//! The mixing rows contribute a pseudorandom signature and one identity bit
//! that pins the mixing block each of them defines.
//!
//! Peel-solved columns are then substituted back out in reverse solve order.
//! Substituting column `c`, solved by row `t`, toggles the bits of `t`'s
//! other columns in every dense equation currently referencing `c`, and
//! leaves bit `c` itself set as a receipt: a set bit at a peel-solved column
//! position afterwards means "XOR the observed block of the row that solved
//! this column into the right-hand side". Deferred-column bits are genuine
//! coefficients and move into the dense matrix once substitution completes.

use log::trace;

use crate::bitmatrix::{BitMatrix, WORD_BITS};
use crate::params::Params;
use crate::peel::Peeled;
use crate::rand::{RngCore, dense_stream};

/// The compressed residual system handed to the dense solver.
#[derive(Debug, Clone)]
pub struct DenseSystem {
    /// System over the mixing and deferred columns, one row per deferred row
    /// followed by one row per mixing block. At least as many rows as
    /// columns.
    pub ge: BitMatrix,
    /// Right-hand-side history over all message columns.
    pub compress: BitMatrix,
    /// Dense column index to recovery block index (mixing blocks first,
    /// deferred columns after).
    pub col_map: Vec<usize>,
    /// Deferred dense row index to solver row index.
    pub row_map: Vec<u32>,
}

/// Builds the dense system for a peeled structure.
pub fn build(params: &Params, seed: u32, peeled: &Peeled) -> DenseSystem {
    let n = params.block_count;
    let d = params.mix_count;
    let deferred = peeled.deferred_rows.len();
    let ge_rows = deferred + d;
    let ge_cols = d + peeled.deferred_columns.len();
    let mut ge = BitMatrix::new(ge_rows, ge_cols);
    let mut compress = BitMatrix::new(ge_rows, n);

    // Deferred rows: peel signature into the history, mixing bits into the
    // dense system.
    for (i, &ri) in peeled.deferred_rows.iter().enumerate() {
        let spec = peeled.rows[ri as usize].spec;
        for col in spec.peel_columns(params) {
            compress.set(i, col);
        }
        ge.set(i, spec.mix[0]);
        ge.set(i, spec.mix[1]);
    }

    // Mixing rows: pseudorandom signature plus the identity bit of the
    // mixing block the row defines. Tail bits beyond the column count are
    // masked off.
    let mut rng = dense_stream(seed, n);
    let pitch = compress.pitch();
    let mut words = vec![0u64; pitch];
    for j in 0..d {
        let row = deferred + j;
        for w in words.iter_mut() {
            *w = rng.next_u64();
        }
        if n % WORD_BITS != 0 {
            words[pitch - 1] &= (1u64 << (n % WORD_BITS)) - 1;
        }
        compress.xor_words(row, &words);
        ge.set(row, j);
    }

    // Substitute peel-solved columns back out, most recently solved first.
    let mut signature = vec![0u64; pitch];
    let mut targets: Vec<usize> = Vec::new();
    for &(ri, col) in peeled.solve_stack.iter().rev() {
        let col = col as usize;
        targets.clear();
        targets.extend((0..ge_rows).filter(|&r| compress.bit(r, col)));
        if targets.is_empty() {
            continue;
        }
        let spec = peeled.rows[ri as usize].spec;
        signature.fill(0);
        for c in spec.peel_columns(params) {
            signature[c / WORD_BITS] ^= 1u64 << (c % WORD_BITS);
        }
        for &r in &targets {
            compress.xor_words(r, &signature);
            // The signature cleared the solved column's bit; set it back as
            // the right-hand-side receipt.
            compress.set(r, col);
            ge.flip(r, spec.mix[0]);
            ge.flip(r, spec.mix[1]);
        }
    }

    // Move the residual deferred-column coefficients into the dense system.
    let mut col_map: Vec<usize> = (0..d).map(|j| n + j).collect();
    for (k, &col) in peeled.deferred_columns.iter().enumerate() {
        let col = col as usize;
        for r in 0..ge_rows {
            if compress.bit(r, col) {
                ge.set(r, d + k);
                compress.clear(r, col);
            }
        }
        col_map.push(col);
    }

    trace!(
        "dense system is {} x {} over {} deferred and {} mixing columns",
        ge_rows,
        ge_cols,
        peeled.deferred_columns.len(),
        d
    );
    DenseSystem {
        ge,
        compress,
        col_map,
        row_map: peeled.deferred_rows.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peel::peel;

    fn system(blocks: usize, seed: u32) -> (Params, Peeled, DenseSystem) {
        let params = Params::new(blocks * 8, 8).unwrap();
        let ids: Vec<u32> = (0..blocks as u32).collect();
        let peeled = peel(&params, seed, &ids);
        let dense = build(&params, seed, &peeled);
        (params, peeled, dense)
    }

    #[test]
    fn dimensions_match_the_peel_outcome() {
        let (params, peeled, dense) = system(64, 2);
        assert_eq!(
            dense.ge.rows(),
            peeled.deferred_rows.len() + params.mix_count
        );
        assert_eq!(
            dense.ge.cols(),
            peeled.deferred_columns.len() + params.mix_count
        );
        assert_eq!(dense.compress.cols(), params.block_count);
        assert_eq!(dense.col_map.len(), dense.ge.cols());
        assert_eq!(dense.row_map, peeled.deferred_rows);
    }

    #[test]
    fn history_only_references_peel_solved_columns() {
        let (_, peeled, dense) = system(64, 4);
        for r in 0..dense.compress.rows() {
            for col in dense.compress.iter_set(r) {
                assert!(
                    peeled.columns[col].solver().is_some(),
                    "history bit at column {col} without a solving row"
                );
            }
        }
    }

    #[test]
    fn column_map_covers_mixing_then_deferred() {
        let (params, peeled, dense) = system(48, 6);
        let d = params.mix_count;
        for (j, &block) in dense.col_map.iter().enumerate() {
            if j < d {
                assert_eq!(block, params.block_count + j);
            } else {
                assert_eq!(block, peeled.deferred_columns[j - d] as usize);
            }
        }
    }

    #[test]
    fn deterministic() {
        let (_, _, a) = system(40, 11);
        let (_, _, b) = system(40, 11);
        assert_eq!(a.ge, b.ge);
        assert_eq!(a.compress, b.compress);
    }
}
