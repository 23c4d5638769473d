//! # fountain-fec
//!
//! `fountain_fec` is a streaming forward-error-correction codec for binary
//! erasure channels. A message of M bytes is split into N blocks of B bytes;
//! the encoder derives recovery state once at initialization and then
//! produces an effectively unbounded stream of encoded blocks, each tagged
//! with a `u32` identifier. A receiver that collects roughly N distinct
//! blocks, with any identifiers and in any order, recovers the message.
//!
//! The code is systematic: identifiers below N reproduce the message blocks
//! themselves, so a lossless channel costs nothing extra. Encoder setup
//! solves a sparse GF(2) system by peeling, compresses the residue into a
//! small dense system, and finishes it with Gaussian elimination; generating
//! or ingesting a block afterwards costs a handful of block XORs.
//!
//! The transport is out of scope: callers carry the identifier alongside the
//! block bytes in whatever framing they use.
//!
//! # Examples
//! ```
//! use fountain_fec::{Decoder, Encoder};
//!
//! let message = b"an example message split into blocks";
//! let encoder = Encoder::new(message, 8).unwrap();
//! let mut decoder = Decoder::new(message.len(), 8).unwrap();
//!
//! let mut block = [0u8; 8];
//! for id in 0..encoder.block_count() as u32 {
//!     encoder.generate(id, &mut block);
//!     decoder.ingest(id, &block);
//! }
//! assert_eq!(decoder.finalize().unwrap(), message);
//! ```

mod bitmatrix;
mod compress;
mod decoder;
mod encoder;
mod gauss;
mod params;
mod peel;
mod rand;
mod rowgen;
mod solve;
mod substitute;

pub use decoder::Decoder;
pub use encoder::Encoder;
pub use params::MAX_BLOCK_COUNT;

/// Codec errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum Error {
    /// The block length is zero.
    #[error("the block length must be at least one byte")]
    ZeroBlockLength,
    /// The message is empty.
    #[error("the message must contain at least one byte")]
    EmptyMessage,
    /// The message splits into more blocks than the codec supports.
    #[error("the message splits into {count} blocks, more than the maximum of 65535")]
    TooManyBlocks {
        /// Number of blocks the message would need.
        count: usize,
    },
    /// No generator seed produced an invertible dense system.
    #[error("no generator seed produced an invertible dense system")]
    Singular,
    /// The decoder has not collected enough blocks to recover the message.
    #[error("decoding is not complete")]
    NotDecoded,
}
