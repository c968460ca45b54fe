//! gzip (RFC 1952) member reading on top of the DEFLATE decoder.
//!
//! A member is a fixed 10-byte header, optional extra/name/comment/header-CRC
//! fields gated by FLG bits, the DEFLATE body, and an 8-byte trailer holding
//! the CRC32 and the modulo-2^32 length of the decompressed data. Both
//! trailer fields are verified.

use thiserror::Error;
use tracing::trace;

use crate::bit_reader::{BitOrder, BitReader, TruncatedInput};
use crate::crc32::crc32;
use crate::inflate::{DeflateDecoder, InflateError};

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// The only compression method RFC 1952 defines.
const CM_DEFLATE: u8 = 8;

// FLG bits. FTEXT (bit 0) is a hint and ignored.
const FHCRC: u8 = 1 << 1;
const FEXTRA: u8 = 1 << 2;
const FNAME: u8 = 1 << 3;
const FCOMMENT: u8 = 1 << 4;

/// gzip reading errors.
#[derive(Debug, Error)]
pub enum GzipError {
    /// The input does not start with `1f 8b`.
    #[error("not a gzip stream")]
    WrongMagic,

    /// The CM field names a method other than DEFLATE.
    #[error("unsupported compression method {0}")]
    WrongCompressionMethod(u8),

    /// The trailer CRC32 does not match the decompressed data.
    #[error("CRC mismatch: stored {expected:#010x}, computed {computed:#010x}")]
    WrongCrc {
        /// CRC32 stored in the trailer.
        expected: u32,
        /// CRC32 of the decompressed output.
        computed: u32,
    },

    /// The trailer ISIZE does not match the decompressed length.
    #[error("length mismatch: stored {expected}, computed {computed}")]
    WrongLength {
        /// ISIZE stored in the trailer.
        expected: u32,
        /// Decompressed length modulo 2^32.
        computed: u32,
    },

    /// The DEFLATE body failed to decode.
    #[error(transparent)]
    Inflate(#[from] InflateError),

    /// The input ended inside the header or trailer.
    #[error(transparent)]
    TruncatedInput(#[from] TruncatedInput),
}

/// Metadata parsed out of a member header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GzipHeader {
    /// Modification time of the original file, Unix seconds, 0 if unset.
    pub mtime: u32,
    /// FEXTRA payload.
    pub extra: Option<Vec<u8>>,
    /// Original file name (FNAME), without its terminator.
    pub file_name: Option<String>,
    /// Free-form comment (FCOMMENT).
    pub comment: Option<String>,
    /// Originating operating system; 255 means unknown.
    pub os: u8,
}

/// A decoded member: header metadata plus decompressed data.
#[derive(Debug)]
pub struct GzipMember {
    pub header: GzipHeader,
    pub data: Vec<u8>,
}

/// Decompress a single gzip member, discarding header metadata.
pub fn gunzip(data: &[u8]) -> Result<Vec<u8>, GzipError> {
    Ok(read_member(data)?.data)
}

/// Decode a single gzip member. Bytes after its trailer are ignored.
pub fn read_member(data: &[u8]) -> Result<GzipMember, GzipError> {
    let mut reader = BitReader::new(data, BitOrder::LsbFirst);
    let header = read_header(&mut reader)?;
    trace!(file_name = header.file_name.as_deref(), "gzip member");

    let out = DeflateDecoder::new().decompress(&mut reader)?;
    reader.align_to_byte();

    let expected_crc = read_u32_le(&mut reader)?;
    let computed_crc = crc32(&out);
    if expected_crc != computed_crc {
        return Err(GzipError::WrongCrc {
            expected: expected_crc,
            computed: computed_crc,
        });
    }

    let expected_length = read_u32_le(&mut reader)?;
    let computed_length = out.len() as u32;
    if expected_length != computed_length {
        return Err(GzipError::WrongLength {
            expected: expected_length,
            computed: computed_length,
        });
    }

    Ok(GzipMember { header, data: out })
}

fn read_header(reader: &mut BitReader<'_>) -> Result<GzipHeader, GzipError> {
    if reader.read_bytes(2)? != GZIP_MAGIC {
        return Err(GzipError::WrongMagic);
    }
    let method = reader.read_byte()?;
    if method != CM_DEFLATE {
        return Err(GzipError::WrongCompressionMethod(method));
    }
    let flags = reader.read_byte()?;
    let mtime = read_u32_le(reader)?;
    let _extra_flags = reader.read_byte()?;
    let os = reader.read_byte()?;

    let extra = if flags & FEXTRA != 0 {
        let length = u16::from_le_bytes([reader.read_byte()?, reader.read_byte()?]);
        Some(reader.read_bytes(length as usize)?.to_vec())
    } else {
        None
    };
    let file_name = if flags & FNAME != 0 {
        let cutoff = reader.remaining();
        Some(reader.null_ended_ascii(cutoff))
    } else {
        None
    };
    let comment = if flags & FCOMMENT != 0 {
        let cutoff = reader.remaining();
        Some(reader.null_ended_ascii(cutoff))
    } else {
        None
    };
    if flags & FHCRC != 0 {
        // CRC16 over the header; present but not verified
        reader.read_bytes(2)?;
    }

    Ok(GzipHeader {
        mtime,
        extra,
        file_name,
        comment,
        os,
    })
}

fn read_u32_le(reader: &mut BitReader<'_>) -> Result<u32, TruncatedInput> {
    let bytes = reader.read_bytes(4)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::write::GzEncoder;
    use flate2::Compression;

    use super::*;

    /// Hand-build a member holding `payload` in a single stored block.
    fn stored_member(flags: u8, optional: &[u8], payload: &[u8]) -> Vec<u8> {
        assert!(payload.len() <= u16::MAX as usize);
        let mut member = vec![0x1F, 0x8B, 8, flags, 0, 0, 0, 0, 0, 255];
        member.extend_from_slice(optional);
        let length = payload.len() as u16;
        member.push(0x01); // final, stored
        member.extend_from_slice(&length.to_le_bytes());
        member.extend_from_slice(&(!length).to_le_bytes());
        member.extend_from_slice(payload);
        member.extend_from_slice(&crc32(payload).to_le_bytes());
        member.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        member
    }

    #[test]
    fn test_flate2_round_trip() {
        let original = b"gzip wraps a deflate stream in a checksummed envelope".repeat(10);
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&original).unwrap();
        let compressed = encoder.finish().unwrap();

        assert_eq!(gunzip(&compressed).unwrap(), original);
    }

    #[test]
    fn test_member_with_file_name() {
        let member = stored_member(FNAME, b"greeting.txt\0", b"hi");
        let decoded = read_member(&member).unwrap();

        assert_eq!(decoded.header.file_name.as_deref(), Some("greeting.txt"));
        assert_eq!(decoded.data, b"hi");
    }

    #[test]
    fn test_wrong_magic() {
        assert!(matches!(
            gunzip(b"PK\x03\x04 not gzip"),
            Err(GzipError::WrongMagic)
        ));
    }

    #[test]
    fn test_wrong_compression_method() {
        let mut member = stored_member(0, b"", b"hi");
        member[2] = 7;
        assert!(matches!(
            gunzip(&member),
            Err(GzipError::WrongCompressionMethod(7))
        ));
    }

    #[test]
    fn test_corrupted_crc() {
        let mut member = stored_member(0, b"", b"payload");
        let crc_offset = member.len() - 8;
        member[crc_offset] ^= 0xFF;
        assert!(matches!(gunzip(&member), Err(GzipError::WrongCrc { .. })));
    }

    #[test]
    fn test_wrong_length_field() {
        let mut member = stored_member(0, b"", b"payload");
        let length_offset = member.len() - 4;
        member[length_offset] ^= 0x01;
        assert!(matches!(
            gunzip(&member),
            Err(GzipError::WrongLength { .. })
        ));
    }

    #[test]
    fn test_truncated_trailer() {
        let member = stored_member(0, b"", b"payload");
        assert!(matches!(
            gunzip(&member[..member.len() - 3]),
            Err(GzipError::TruncatedInput(_))
        ));
    }
}
