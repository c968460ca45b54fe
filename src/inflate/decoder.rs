//! DEFLATE block and symbol loops.

use tracing::trace;

use crate::bit_reader::{BitOrder, BitReader};

use super::huffman::HuffmanTree;
use super::{InflateError, Result};

/// End-of-block symbol in the literal/length alphabet.
const END_OF_BLOCK: u16 = 256;

/// Base match lengths for literal/length symbols 257..=285.
const LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131,
    163, 195, 227, 258,
];

/// Base match distances for distance codes 0..=29.
const DISTANCE_BASE: [u32; 30] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];

/// Placement order of the code-length code lengths in a dynamic block header.
const CODE_LENGTH_ORDER: [usize; 19] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// Bootstrap for the fixed literal/length tree (RFC 1951 §3.2.6).
const FIXED_LITERAL_BOOTSTRAP: [(usize, i32); 5] =
    [(0, 8), (144, 9), (256, 7), (280, 8), (288, -1)];

/// Bootstrap for the fixed distance tree.
const FIXED_DISTANCE_BOOTSTRAP: [(usize, i32); 2] = [(0, 5), (32, -1)];

/// Decompress a complete DEFLATE stream.
pub fn deflate_decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut reader = BitReader::new(data, BitOrder::LsbFirst);
    DeflateDecoder::new().decompress(&mut reader)
}

/// Stateful decoder over a sequence of DEFLATE blocks.
///
/// The output buffer doubles as the back-reference window: matches copy
/// from the bytes produced so far, which is the full history since DEFLATE
/// distances never exceed 32 KiB.
pub struct DeflateDecoder {
    out: Vec<u8>,
}

impl DeflateDecoder {
    pub fn new() -> Self {
        Self { out: Vec::new() }
    }

    /// Decode blocks from `reader` until the final block ends.
    ///
    /// The reader must consume bits LSB-first. Bits after the final block
    /// are left untouched, so outer formats (gzip, zlib) can pick up their
    /// trailers where decompression stopped.
    pub fn decompress(mut self, reader: &mut BitReader<'_>) -> Result<Vec<u8>> {
        loop {
            let is_final = reader.read_bit()? == 1;
            let block_type = reader.read_int(2)?;
            trace!(is_final, block_type, "deflate block");

            match block_type {
                0 => self.stored_block(reader)?,
                1 => self.fixed_block(reader)?,
                2 => self.dynamic_block(reader)?,
                _ => return Err(InflateError::WrongBlockType),
            }

            if is_final {
                return Ok(self.out);
            }
        }
    }

    /// btype 00: raw bytes behind a 16-bit length and its one's complement.
    fn stored_block(&mut self, reader: &mut BitReader<'_>) -> Result<()> {
        reader.align_to_byte();
        let length = u16::from_le_bytes([reader.read_byte()?, reader.read_byte()?]);
        let nlength = u16::from_le_bytes([reader.read_byte()?, reader.read_byte()?]);
        if length != !nlength {
            return Err(InflateError::WrongUncompressedBlockLengths { length, nlength });
        }
        let bytes = reader.read_bytes(length as usize)?;
        self.out.extend_from_slice(bytes);
        Ok(())
    }

    /// btype 01: trees mandated by the RFC.
    fn fixed_block(&mut self, reader: &mut BitReader<'_>) -> Result<()> {
        let literal_tree = HuffmanTree::from_bootstrap(&FIXED_LITERAL_BOOTSTRAP);
        let distance_tree = HuffmanTree::from_bootstrap(&FIXED_DISTANCE_BOOTSTRAP);
        self.symbol_loop(reader, &literal_tree, &distance_tree)
    }

    /// btype 10: trees described by a compressed code-length sequence.
    fn dynamic_block(&mut self, reader: &mut BitReader<'_>) -> Result<()> {
        let hlit = reader.read_int(5)? as usize + 257;
        let hdist = reader.read_int(5)? as usize + 1;
        let hclen = reader.read_int(4)? as usize + 4;

        let mut code_lengths = [0u8; 19];
        for &position in CODE_LENGTH_ORDER.iter().take(hclen) {
            code_lengths[position] = reader.read_int(3)? as u8;
        }
        let code_length_tree = HuffmanTree::from_lengths(&code_lengths);

        let total = hlit + hdist;
        let mut lengths = Vec::with_capacity(total);
        while lengths.len() < total {
            let symbol = code_length_tree.decode_next(reader)?;
            match symbol {
                0..=15 => lengths.push(symbol as u8),
                16 => {
                    let Some(&previous) = lengths.last() else {
                        return Err(InflateError::WrongSymbol(symbol));
                    };
                    let count = reader.read_int(2)? as usize + 3;
                    for _ in 0..count.min(total - lengths.len()) {
                        lengths.push(previous);
                    }
                }
                17 => {
                    let count = reader.read_int(3)? as usize + 3;
                    for _ in 0..count.min(total - lengths.len()) {
                        lengths.push(0);
                    }
                }
                18 => {
                    let count = reader.read_int(7)? as usize + 11;
                    for _ in 0..count.min(total - lengths.len()) {
                        lengths.push(0);
                    }
                }
                other => return Err(InflateError::WrongSymbol(other)),
            }
        }

        let literal_tree = HuffmanTree::from_lengths(&lengths[..hlit]);
        let distance_tree = HuffmanTree::from_lengths(&lengths[hlit..]);
        self.symbol_loop(reader, &literal_tree, &distance_tree)
    }

    /// Decode literals and matches until the end-of-block symbol.
    fn symbol_loop(
        &mut self,
        reader: &mut BitReader<'_>,
        literal_tree: &HuffmanTree,
        distance_tree: &HuffmanTree,
    ) -> Result<()> {
        loop {
            let symbol = literal_tree.decode_next(reader)?;
            match symbol {
                0..=255 => self.out.push(symbol as u8),
                END_OF_BLOCK => return Ok(()),
                257..=285 => {
                    let length = read_match_length(reader, symbol)?;
                    let distance = read_match_distance(reader, distance_tree)?;
                    self.copy_match(distance, length)?;
                }
                other => return Err(InflateError::WrongSymbol(other)),
            }
        }
    }

    /// Append `length` bytes starting `distance` back from the end of the
    /// output. Byte-at-a-time so a match may read bytes it just produced.
    fn copy_match(&mut self, distance: usize, length: usize) -> Result<()> {
        if distance > self.out.len() {
            return Err(InflateError::InvalidBackReference {
                distance,
                available: self.out.len(),
            });
        }
        let start = self.out.len() - distance;
        self.out.reserve(length);
        for i in 0..length {
            let byte = self.out[start + i];
            self.out.push(byte);
        }
        Ok(())
    }
}

impl Default for DeflateDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Match length for symbols 257..=285: a table base plus extra bits.
fn read_match_length(reader: &mut BitReader<'_>, symbol: u16) -> Result<usize> {
    let extra_bits = match symbol {
        257..=260 | 285 => 0,
        _ => ((symbol - 257) >> 2) - 1,
    };
    let base = LENGTH_BASE[usize::from(symbol - 257)] as usize;
    Ok(base + reader.read_int(extra_bits as usize)? as usize)
}

/// Match distance: a 0..=29 distance code plus extra bits.
fn read_match_distance(reader: &mut BitReader<'_>, distance_tree: &HuffmanTree) -> Result<usize> {
    let code = distance_tree.decode_next(reader)?;
    if code > 29 {
        return Err(InflateError::WrongSymbol(code));
    }
    let extra_bits = match code {
        0 | 1 => 0,
        _ => (code >> 1) - 1,
    };
    let base = DISTANCE_BASE[usize::from(code)] as usize;
    Ok(base + reader.read_int(extra_bits as usize)? as usize)
}
