//! Decoder-only reading of DEFLATE streams and tar archives.
//!
//! Two independent subsystems share one bit/byte cursor:
//!
//! | Subsystem | Entry point | Format |
//! |-----------|-------------|--------|
//! | [`inflate`] | [`deflate_decompress`] | RFC 1951 DEFLATE |
//! | [`gzip`] | [`gunzip`] | RFC 1952 gzip members |
//! | [`tar`] | [`tar_walk`] | POSIX `ustar`, GNU long names, PAX |
//!
//! Everything operates on fully materialised byte buffers: no I/O, no
//! threads, no shared state. The tar walker hands back entry data as
//! zero-copy slices of the input; decompressors return owned vectors.
//! Errors are structured enums, fatal at the call boundary.
//!
//! ```
//! // final stored block: length 5, its complement, then the raw bytes
//! let stream = [0x01, 0x05, 0x00, 0xFA, 0xFF, b'H', b'e', b'l', b'l', b'o'];
//! assert_eq!(tarflate::deflate_decompress(&stream).unwrap(), b"Hello");
//! ```

mod bit_reader;
mod crc32;
pub mod gzip;
pub mod inflate;
pub mod tar;

pub use bit_reader::{BitOrder, BitReader, TruncatedInput};
pub use crc32::crc32;
pub use gzip::{gunzip, GzipError, GzipHeader, GzipMember};
pub use inflate::{deflate_decompress, DeflateDecoder, HuffmanTree, InflateError};
pub use tar::{tar_walk, EntryInfo, EntryType, PaxOverlay, TarEntry, TarError, TarWalker};
