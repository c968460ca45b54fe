//! DEFLATE (RFC 1951) decompression.
//!
//! The pipeline, leaves first:
//!
//! ```text
//! Compressed bytes
//!       ↓
//! ┌─────────────┐
//! │ BitReader   │ ← LSB-first bit access to the stream
//! └─────────────┘
//!       ↓
//! ┌─────────────┐
//! │ HuffmanTree │ ← canonical codes, rebuilt per block
//! └─────────────┘
//!       ↓
//! ┌─────────────┐
//! │ Decoder     │ ← block loop, literals and back-references
//! └─────────────┘
//!       ↓
//! Decompressed bytes
//! ```
//!
//! Three block kinds exist: stored (raw bytes behind a length/complement
//! pair), fixed Huffman (trees mandated by the RFC), and dynamic Huffman
//! (trees described by a compressed code-length sequence at the head of the
//! block). Back-references copy from the output produced so far, so a match
//! may overlap its own destination.
//!
//! Decoding is deterministic and never reads past the last bit it needs;
//! truncated or malformed streams surface a single fatal [`InflateError`].

mod decoder;
mod huffman;


pub use decoder::{deflate_decompress, DeflateDecoder};
pub use huffman::HuffmanTree;

use thiserror::Error;

use crate::bit_reader::TruncatedInput;

/// Decompression errors.
///
/// All are fatal: a decode either returns the complete output or exactly
/// one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InflateError {
    /// A stored block's length field is not the one's complement of its
    /// check field.
    #[error("stored block length {length:#06x} does not complement {nlength:#06x}")]
    WrongUncompressedBlockLengths {
        /// The LEN field.
        length: u16,
        /// The NLEN field.
        nlength: u16,
    },

    /// Reserved block type 0b11.
    #[error("reserved block type")]
    WrongBlockType,

    /// A decoded symbol falls outside its alphabet: a literal/length symbol
    /// above 285, a distance code above 29, or a code-length symbol above 18.
    #[error("symbol {0} is outside its alphabet")]
    WrongSymbol(u16),

    /// No assigned Huffman code matches the input, or the input ran out
    /// mid-code.
    #[error("no Huffman code matches the input")]
    SymbolNotFound,

    /// A back-reference points before the start of the output.
    #[error("back-reference distance {distance} exceeds the {available} bytes produced")]
    InvalidBackReference {
        /// Decoded match distance.
        distance: usize,
        /// Output bytes available to copy from.
        available: usize,
    },

    /// The input ended before the final block did.
    #[error(transparent)]
    TruncatedInput(#[from] TruncatedInput),
}

pub type Result<T> = std::result::Result<T, InflateError>;
