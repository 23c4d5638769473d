//! # Deterministic row generation
//!
//! A row identifier expands into the complete description of one codec
//! equation: a small set of peel columns in `[0, N)` and exactly two mixing
//! columns in `[0, d)`. The expansion is a pure function of the identifier
//! and the generator seed, and is shared verbatim by the encoder and the
//! decoder, so both sides always agree on what any identifier means.
//!
//! Columns are drawn by walking an arithmetic progression modulo the next
//! prime above the column count and skipping values that land outside the
//! valid range. Because the modulus is prime, any nonzero stride visits every
//! residue before repeating, which makes the first `count` accepted values
//! distinct without bookkeeping.

use crate::params::Params;
use crate::rand::{RngCore, row_stream};

/// Cumulative 16-bit thresholds for the peel weight distribution.
///
/// Weight `2 + i` is selected for the first entry `i` exceeding a 16-bit
/// variate. The distribution strongly favors weights 2 and 3 (mean about
/// 4.5) and keeps a heavy bucket at the maximum weight to help column
/// coverage.
const WEIGHT_THRESHOLDS: [u16; 18] = [
    33096, 44018, 49480, 52757, 54941, 56501, 57672, 58582, 59310, 59906,
    60402, 60823, 61183, 61495, 61768, 62009, 62223, 62414,
];

/// Largest weight the threshold table can select.
pub const MAX_PEEL_WEIGHT: usize = WEIGHT_THRESHOLDS.len() + 2;

fn peel_weight(variate: u16, max_weight: usize) -> usize {
    let w = 2 + WEIGHT_THRESHOLDS.partition_point(|&t| variate >= t);
    debug_assert!(w <= MAX_PEEL_WEIGHT);
    w.min(max_weight)
}

/// Odd primes up to 257, enough to trial-divide anything below 66049.
const PRIMES: [u16; 54] = [
    3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71,
    73, 79, 83, 89, 97, 101, 103, 107, 109, 113, 127, 131, 137, 139, 149,
    151, 157, 163, 167, 173, 179, 181, 191, 193, 197, 199, 211, 223, 227,
    229, 233, 239, 241, 251, 257,
];

/// Returns the smallest prime greater than or equal to `n`.
///
/// Valid for `n` up to 2^16 (the largest value ever requested is 65537).
pub fn next_prime(n: u32) -> u32 {
    if n <= 2 {
        return 2;
    }
    let mut candidate = n | 1;
    while !is_odd_prime(candidate) {
        candidate += 2;
    }
    candidate
}

fn is_odd_prime(n: u32) -> bool {
    for &p in PRIMES.iter() {
        let p = u32::from(p);
        if p * p > n {
            return true;
        }
        if n % p == 0 {
            return n == p;
        }
    }
    true
}

/// Iterator over the columns selected by one arithmetic progression.
///
/// Yields values in `[0, count)` by stepping `x -> (x + stride) mod modulus`
/// and skipping values in `[count, modulus)`.
#[derive(Debug, Clone)]
pub struct ColumnWalk {
    x: u32,
    stride: u32,
    modulus: u32,
    count: u32,
    remaining: usize,
}

impl ColumnWalk {
    fn new(start: u32, stride: u32, modulus: u32, count: u32, len: usize) -> ColumnWalk {
        let mut walk = ColumnWalk {
            x: start % modulus,
            stride,
            modulus,
            count,
            remaining: len,
        };
        while walk.x >= count {
            walk.x = (walk.x + stride) % modulus;
        }
        walk
    }

    fn advance(&mut self) {
        self.x = (self.x + self.stride) % self.modulus;
        while self.x >= self.count {
            self.x = (self.x + self.stride) % self.modulus;
        }
    }
}

impl Iterator for ColumnWalk {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let current = self.x as usize;
        self.advance();
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for ColumnWalk {}

/// Complete description of one generated row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSpec {
    /// Number of peel columns referenced by the row.
    pub weight: usize,
    peel_start: u32,
    peel_stride: u32,
    /// The two mixing columns referenced by the row.
    pub mix: [usize; 2],
}

impl RowSpec {
    /// Expands a row identifier under the given parameters and seed.
    pub fn generate(params: &Params, seed: u32, id: u32) -> RowSpec {
        debug_assert!(params.block_count >= 2);
        let mut rng = row_stream(seed, id);
        let weight = peel_weight(rng.next_u32() as u16, params.block_count);
        let rv = rng.next_u32();
        let peel_stride = 1 + (rv & 0xffff) % (params.block_prime - 1);
        let peel_start = (rv >> 16) % params.block_prime;
        let rv = rng.next_u32();
        let mix_stride = 1 + (rv & 0xffff) % (params.mix_prime - 1);
        let mut mix_walk = ColumnWalk::new(
            rv >> 16,
            mix_stride,
            params.mix_prime,
            params.mix_count as u32,
            2,
        );
        let mix = [
            mix_walk.next().expect("mixing walk yields two columns"),
            mix_walk.next().expect("mixing walk yields two columns"),
        ];
        RowSpec {
            weight,
            peel_start,
            peel_stride,
            mix,
        }
    }

    /// Returns an iterator over the peel columns of this row.
    pub fn peel_columns(&self, params: &Params) -> ColumnWalk {
        ColumnWalk::new(
            self.peel_start,
            self.peel_stride,
            params.block_prime,
            params.block_count as u32,
            self.weight,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Params;

    fn params(blocks: usize) -> Params {
        Params::new(blocks * 4, 4).unwrap()
    }

    #[test]
    fn next_primes() {
        assert_eq!(next_prime(2), 2);
        assert_eq!(next_prime(3), 3);
        assert_eq!(next_prime(4), 5);
        assert_eq!(next_prime(10), 11);
        assert_eq!(next_prime(90), 97);
        assert_eq!(next_prime(1024), 1031);
        assert_eq!(next_prime(65535), 65537);
    }

    #[test]
    fn generation_is_deterministic() {
        let p = params(100);
        let a = RowSpec::generate(&p, 0xdead_beef, 12345);
        let b = RowSpec::generate(&p, 0xdead_beef, 12345);
        assert_eq!(a, b);
        assert_eq!(
            a.peel_columns(&p).collect::<Vec<_>>(),
            b.peel_columns(&p).collect::<Vec<_>>()
        );
    }

    #[test]
    fn columns_are_distinct_and_in_range() {
        let p = params(37);
        for id in 0..500 {
            let spec = RowSpec::generate(&p, 1, id);
            let cols: Vec<usize> = spec.peel_columns(&p).collect();
            assert_eq!(cols.len(), spec.weight);
            let mut sorted = cols.clone();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted.len(), cols.len(), "duplicate column in row {id}");
            assert!(cols.iter().all(|&c| c < 37));
            assert_ne!(spec.mix[0], spec.mix[1]);
            assert!(spec.mix.iter().all(|&m| m < p.mix_count));
        }
    }

    #[test]
    fn weights_follow_the_table() {
        let p = params(1024);
        let mut total = 0usize;
        for id in 0..4096 {
            let spec = RowSpec::generate(&p, 99, id);
            assert!(spec.weight >= 2);
            assert!(spec.weight <= MAX_PEEL_WEIGHT);
            total += spec.weight;
        }
        let mean = total as f64 / 4096.0;
        assert!((3.5..5.5).contains(&mean), "mean weight {mean}");
    }

    #[test]
    fn weights_clamp_to_small_block_counts() {
        let p = params(2);
        for id in 0..100 {
            assert_eq!(RowSpec::generate(&p, 5, id).weight, 2);
        }
    }

    #[test]
    fn every_column_is_reachable() {
        let p = params(50);
        let mut hit = vec![false; 50];
        for id in 0..2000 {
            for c in RowSpec::generate(&p, 3, id).peel_columns(&p) {
                hit[c] = true;
            }
        }
        assert!(hit.iter().all(|&h| h));
    }
}
