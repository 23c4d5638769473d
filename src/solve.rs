//! Solve orchestration and generator seed selection.
//!
//! A solve runs the structural phases in order: peel the sparse system,
//! compress the residue into the dense system, and triangularize it. The
//! result holds everything the block phase needs except the observed bytes,
//! which lets seed selection run without any message data: the encoder and
//! the decoder walk the same deterministic candidate schedule and keep the
//! first seed whose message-aligned system is invertible, so both sides
//! always agree on the seed without exchanging it.

use log::debug;

use crate::Error;
use crate::compress::{self, DenseSystem};
use crate::gauss;
use crate::params::Params;
use crate::peel::{self, Peeled};

/// Number of perturbed seed candidates tried before giving up.
///
/// Roughly one candidate in three yields an invertible dense system, so the
/// chance that every candidate fails is far below one in a million. Only
/// failed attempts pay for the extra headroom.
const SEED_ATTEMPTS: u32 = 128;

/// Base generator seeds, indexed by block count.
const SEED_TABLE: [u32; 16] = [
    0x5a1f_8c2b, 0x93d4_e607, 0x2f6b_9a1d, 0xc8e1_5374, 0x7b3d_a9f1,
    0x1e94_c6a8, 0xe257_8b3c, 0x4ac1_f295, 0x8d62_e7b0, 0x35f9_a44e,
    0xb708_1d63, 0x69cd_52f7, 0xf413_b88a, 0x0da7_261c, 0xa1ce_49d5,
    0x5820_6e39,
];

/// Fully reduced structural state: peel outcome, dense system and pivot
/// permutation.
#[derive(Debug, Clone)]
pub struct Structure {
    /// Peeling outcome.
    pub peeled: Peeled,
    /// Compressed residual system.
    pub dense: DenseSystem,
    /// Pivot permutation from triangularization.
    pub pivots: Vec<usize>,
}

/// Runs the structural phases for one seed over the given solver rows.
///
/// # Errors
/// [`Error::Singular`] if the dense system cannot be triangularized with
/// these rows.
pub fn solve_structure(params: &Params, seed: u32, ids: &[u32]) -> Result<Structure, Error> {
    let peeled = peel::peel(params, seed, ids);
    let mut dense = compress::build(params, seed, &peeled);
    match gauss::triangularize(&mut dense.ge) {
        Ok(pivots) => Ok(Structure {
            peeled,
            dense,
            pivots,
        }),
        Err(gauss::Singular) => Err(Error::Singular),
    }
}

fn seed_candidate(block_count: usize, attempt: u32) -> u32 {
    SEED_TABLE[block_count % SEED_TABLE.len()] ^ attempt.wrapping_mul(0x9e37_79b9)
}

/// Deterministically selects the generator seed for the given parameters,
/// returning it along with the solved message-aligned structure.
///
/// # Errors
/// [`Error::Singular`] if no candidate seed yields an invertible system.
pub fn select_seed(params: &Params) -> Result<(u32, Structure), Error> {
    let ids: Vec<u32> = (0..params.block_count as u32).collect();
    for attempt in 0..SEED_ATTEMPTS {
        let seed = seed_candidate(params.block_count, attempt);
        match solve_structure(params, seed, &ids) {
            Ok(structure) => {
                debug!("selected generator seed {seed:#010x} on attempt {attempt}");
                return Ok((seed, structure));
            }
            Err(_) => continue,
        }
    }
    Err(Error::Singular)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_selection_is_deterministic() {
        let params = Params::new(200, 10).unwrap();
        let (a, _) = select_seed(&params).unwrap();
        let (b, _) = select_seed(&params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn seed_selection_succeeds_across_sizes() {
        for blocks in [2usize, 3, 5, 16, 100] {
            let params = Params::new(blocks * 4, 4).unwrap();
            let (_, structure) = select_seed(&params).unwrap();
            assert_eq!(structure.pivots.len(), structure.dense.ge.rows());
        }
    }

    #[test]
    fn structure_covers_every_column() {
        let params = Params::new(512, 8).unwrap();
        let (_, structure) = select_seed(&params).unwrap();
        let solved = structure.peeled.solve_stack.len();
        let deferred = structure.peeled.deferred_columns.len();
        assert_eq!(solved + deferred, params.block_count);
    }
}
