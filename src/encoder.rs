//! Streaming fountain encoder.
//!
//! Initialization performs the expensive one-time setup: it solves the
//! message-aligned system once to derive the recovery blocks. Everything
//! after that is cheap: generating a block for any identifier XORs a
//! handful of recovery blocks together. Initialization is CPU-bound and can
//! take milliseconds for large block counts, so callers with latency
//! constraints should run it off their hot path.

use log::debug;

use crate::Error;
use crate::params::Params;
use crate::solve;
use crate::substitute::{self, PackedBlocks};

/// Streaming fountain encoder.
///
/// Splits a message into `N` equal-sized blocks and emits an unbounded
/// stream of encoded blocks tagged with `u32` identifiers. Identifiers
/// below `N` reproduce the message blocks themselves (the code is
/// systematic); the rest are check blocks. A decoder that collects roughly
/// `N` distinct blocks, of any identifiers, recovers the message.
#[derive(Debug, Clone)]
pub struct Encoder {
    params: Params,
    seed: u32,
    blocks: Vec<u8>,
}

impl Encoder {
    /// Builds the encoder for a message, deriving all recovery blocks.
    ///
    /// The message is split into blocks of `block_bytes` bytes; the final
    /// block is zero-padded internally.
    ///
    /// # Errors
    /// Fails when `block_bytes` is zero, the message is empty, the message
    /// splits into more than 65535 blocks, or no generator seed yields an
    /// invertible system (vanishingly rare; there is no recovery other than
    /// changing the dimensions).
    ///
    /// # Examples
    /// ```
    /// # use fountain_fec::Encoder;
    /// let encoder = Encoder::new(b"hello world", 4).unwrap();
    /// let mut block = [0u8; 4];
    /// encoder.generate(0, &mut block);
    /// assert_eq!(&block, b"hell");
    /// ```
    pub fn new(message: &[u8], block_bytes: usize) -> Result<Encoder, Error> {
        let params = Params::new(message.len(), block_bytes)?;
        if params.block_count == 1 {
            let mut blocks = message.to_vec();
            blocks.resize(block_bytes, 0);
            return Ok(Encoder {
                params,
                seed: 0,
                blocks,
            });
        }
        let (seed, structure) = solve::select_seed(&params)?;
        let source = PackedBlocks {
            bytes: message,
            block_bytes,
        };
        let blocks = substitute::recover(
            &params,
            &structure.peeled,
            &structure.dense,
            &structure.pivots,
            &source,
        );
        debug!(
            "encoder ready: {} message blocks of {} bytes, {} mixing blocks",
            params.block_count, block_bytes, params.mix_count
        );
        Ok(Encoder {
            params,
            seed,
            blocks,
        })
    }

    /// Fills `block` with the encoded block for `id`.
    ///
    /// Infallible after construction; `block` must be exactly one block
    /// long. Any `u32` is a valid identifier and the same identifier always
    /// yields the same bytes.
    pub fn generate(&self, id: u32, block: &mut [u8]) {
        assert_eq!(block.len(), self.params.block_bytes);
        if self.params.block_count == 1 {
            block.copy_from_slice(&self.blocks);
            return;
        }
        substitute::combine(&self.params, self.seed, &self.blocks, id, block);
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
