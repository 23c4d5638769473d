//! Streaming fountain decoder.
//!
//! The decoder is the dual of the encoder: received blocks become the
//! observed right-hand sides of the same linear system, with the message
//! columns unknown. Blocks accumulate in a pool; once the pool holds as
//! many distinct rows as there are message blocks, every further ingest
//! attempts a full solve over the pool. A singular attempt just waits for
//! more blocks, each of which sharply reduces the failure probability.

use std::collections::HashSet;

use log::debug;

use crate::Error;
use crate::params::Params;
use crate::solve;
use crate::substitute::{self, PackedBlocks};

/// Pooled rows kept beyond the block count. Redundancy this deep has no
/// practical chance of being needed, so later blocks only update the
/// duplicate filter.
const POOL_SLACK: usize = 1024;

/// Streaming fountain decoder.
///
/// Feed it blocks produced by an [`Encoder`](crate::Encoder) built with the
/// same message length and block length, in any order and with any losses;
/// it reports completion as soon as the collected blocks determine the
/// message.
#[derive(Debug, Clone)]
pub struct Decoder {
    params: Params,
    seed: u32,
    ids: Vec<u32>,
    seen: HashSet<u32>,
    payloads: Vec<u8>,
    message: Option<Vec<u8>>,
}

impl Decoder {
    /// Prepares a decoder for a message of `message_len` bytes split into
    /// blocks of `block_bytes` bytes.
    ///
    /// Construction replays the encoder's deterministic seed selection,
    /// which performs the structural half of a solve; the two sides never
    /// need to exchange the seed.
    ///
    /// # Errors
    /// Fails on the same dimension errors as the encoder, and with
    /// [`Error::Singular`] if no candidate seed works (in which case the
    /// matching encoder could not have been built either).
    pub fn new(message_len: usize, block_bytes: usize) -> Result<Decoder, Error> {
        let params = Params::new(message_len, block_bytes)?;
        let seed = if params.block_count == 1 {
            0
        } else {
            solve::select_seed(&params)?.0
        };
        Ok(Decoder {
            params,
            seed,
            ids: Vec::new(),
            seen: HashSet::new(),
            payloads: Vec::new(),
            message: None,
        })
    }

    /// Consumes one received block and returns `true` once the message is
    /// recovered.
    ///
    /// `block` must be exactly one block long. Duplicate identifiers and
    /// blocks arriving after completion are silently ignored.
    pub fn ingest(&mut self, id: u32, block: &[u8]) -> bool {
        assert_eq!(block.len(), self.params.block_bytes);
        if self.message.is_some() {
            return true;
        }
        if !self.seen.insert(id) {
            return false;
        }
        if self.params.block_count == 1 {
            let mut message = block.to_vec();
            message.truncate(self.params.message_bytes);
            self.message = Some(message);
            return true;
        }
        if self.ids.len() < self.params.block_count + POOL_SLACK {
            self.ids.push(id);
            self.payloads.extend_from_slice(block);
        }
        if self.ids.len() >= self.params.block_count {
            self.try_solve();
        }
        self.message.is_some()
    }

    fn try_solve(&mut self) {
        let structure = match solve::solve_structure(&self.params, self.seed, &self.ids) {
            Ok(structure) => structure,
            Err(_) => {
                debug!(
                    "solve attempt with {} received blocks is still singular",
                    self.ids.len()
                );
                return;
            }
        };
        let source = PackedBlocks {
            bytes: &self.payloads,
            block_bytes: self.params.block_bytes,
        };
        let blocks = substitute::recover(
            &self.params,
            &structure.peeled,
            &structure.dense,
            &structure.pivots,
            &source,
        );
        // The recovered columns are the encoder's recovery blocks, not the
        // message itself; combining them per message-aligned identifier
        // reconstitutes the original bytes.
        let bb = self.params.block_bytes;
        let mut message = vec![0u8; self.params.block_count * bb];
        for i in 0..self.params.block_count {
            substitute::combine(
                &self.params,
                self.seed,
                &blocks,
                i as u32,
                &mut message[i * bb..(i + 1) * bb],
            );
        }
        message.truncate(self.params.message_bytes);
        debug!(
            "decoded {} bytes from {} received blocks",
            message.len(),
            self.ids.len()
        );
        self.message = Some(message);
    }

    /// Returns `true` once the message has been recovered.
    pub fn is_decoded(&self) -> bool {
        self.message.is_some()
    }

    /// Returns the recovered message.
    ///
    /// # Errors
    /// [`Error::NotDecoded`] until enough blocks have been ingested.
    pub fn finalize(&self) -> Result<Vec<u8>, Error> {
        self.message.clone().ok_or(Error::NotDecoded)
    }

    /// Number of message blocks.
    pub fn block_count(&self) -> usize {
        self.params.block_count
    }

    /// Block length in bytes.
    pub fn block_bytes(&self) -> usize {
        self.params.block_bytes
    }
}
