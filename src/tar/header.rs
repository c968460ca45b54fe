//! `ustar` header record parsing.
//!
//! All header fields sit at fixed offsets inside the 512-byte record:
//!
//! | Offset | Size | Field    | Offset | Size | Field    |
//! |--------|------|----------|--------|------|----------|
//! | 0      | 100  | name     | 257    | 6    | magic    |
//! | 100    | 8    | mode     | 263    | 2    | version  |
//! | 108    | 8    | uid      | 265    | 32   | uname    |
//! | 116    | 8    | gid      | 297    | 32   | gname    |
//! | 124    | 12   | size     | 329    | 8    | devmajor |
//! | 136    | 12   | mtime    | 337    | 8    | devminor |
//! | 148    | 8    | checksum | 345    | 155  | prefix   |
//! | 156    | 1    | typeflag |        |      |          |
//! | 157    | 100  | linkname |        |      |          |
//!
//! Numeric fields are null/space-terminated octal ASCII; GNU tar stores
//! values too large for octal as big-endian binary with the high bit of the
//! first byte set. The checksum is the unsigned byte sum of the record with
//! the checksum field itself read as spaces.

use crate::bit_reader::{BitOrder, BitReader};

use super::{Result, TarError};

/// Magic for POSIX `ustar` headers; only these carry a meaningful prefix
/// field (GNU headers reuse those bytes for timestamps).
const USTAR_MAGIC: &[u8; 6] = b"ustar\0";

/// Byte range of the checksum field.
const CHECKSUM_FIELD: std::ops::Range<usize> = 148..156;

/// Entry type flag at offset 156.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryType {
    /// Regular file (`'0'`, or NUL in pre-POSIX archives).
    Regular,
    /// Hard link (`'1'`).
    HardLink,
    /// Symbolic link (`'2'`).
    Symlink,
    /// Character device (`'3'`).
    Char,
    /// Block device (`'4'`).
    Block,
    /// Directory (`'5'`).
    Directory,
    /// FIFO (`'6'`).
    Fifo,
    /// Contiguous file (`'7'`, treated like a regular file).
    Contiguous,
    /// PAX extended header for the next member (`'x'`).
    PaxLocal,
    /// PAX global extended header (`'g'`).
    PaxGlobal,
    /// GNU long name (`'L'`).
    GnuLongName,
    /// GNU long link-name (`'K'`).
    GnuLongLink,
    /// Anything else.
    Other(u8),
}

impl EntryType {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            b'0' | b'\0' => EntryType::Regular,
            b'1' => EntryType::HardLink,
            b'2' => EntryType::Symlink,
            b'3' => EntryType::Char,
            b'4' => EntryType::Block,
            b'5' => EntryType::Directory,
            b'6' => EntryType::Fifo,
            b'7' => EntryType::Contiguous,
            b'x' => EntryType::PaxLocal,
            b'g' => EntryType::PaxGlobal,
            b'L' => EntryType::GnuLongName,
            b'K' => EntryType::GnuLongLink,
            other => EntryType::Other(other),
        }
    }

    /// True for regular and contiguous files.
    pub fn is_file(self) -> bool {
        matches!(self, EntryType::Regular | EntryType::Contiguous)
    }

    pub fn is_dir(self) -> bool {
        self == EntryType::Directory
    }
}

/// Fully-resolved descriptor for one archive member.
///
/// Built from the header record, then overlaid with any pending GNU
/// long-name and PAX state by the walker. Immutable once yielded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    /// Member path, after prefix joining and any long-name or PAX override.
    pub name: String,
    /// Link target for hard and symbolic links, empty otherwise.
    pub link_name: String,
    /// Data length in bytes.
    pub size: usize,
    pub type_flag: EntryType,
    /// Permission bits.
    pub mode: u32,
    pub uid: u64,
    pub gid: u64,
    /// Modification time, Unix seconds.
    pub mtime: u64,
    /// Access time; PAX only.
    pub atime: Option<u64>,
    /// Status-change time; PAX only.
    pub ctime: Option<u64>,
    pub uname: String,
    pub gname: String,
    pub dev_major: u32,
    pub dev_minor: u32,
    /// Byte offset of this member's header record in the input.
    pub block_start: usize,
}

impl EntryInfo {
    /// Whether this descriptor came from a PAX global extended header.
    pub fn is_global_extended_header(&self) -> bool {
        self.type_flag == EntryType::PaxGlobal
    }

    /// Whether this descriptor came from a per-member PAX extended header.
    pub fn is_local_extended_header(&self) -> bool {
        self.type_flag == EntryType::PaxLocal
    }
}

/// Parse one 512-byte header record into an [`EntryInfo`], verifying the
/// checksum first. Overlays are the walker's business.
pub(super) fn parse_record(record: &[u8], block_start: usize) -> Result<EntryInfo> {
    verify_checksum(record)?;

    let mut reader = BitReader::new(record, BitOrder::MsbFirst);
    let name = string_field(reader.read_bytes(100)?);
    let mode = numeric_field(reader.read_bytes(8)?, "mode")? as u32;
    let uid = numeric_field(reader.read_bytes(8)?, "uid")?;
    let gid = numeric_field(reader.read_bytes(8)?, "gid")?;
    let size = numeric_field(reader.read_bytes(12)?, "size")? as usize;
    let mtime = numeric_field(reader.read_bytes(12)?, "mtime")?;
    let _checksum = reader.read_bytes(8)?;
    let type_flag = EntryType::from_byte(reader.read_byte()?);
    let link_name = string_field(reader.read_bytes(100)?);
    let magic = reader.read_bytes(6)?;
    let _version = reader.read_bytes(2)?;
    let uname = string_field(reader.read_bytes(32)?);
    let gname = string_field(reader.read_bytes(32)?);
    let dev_major = numeric_field(reader.read_bytes(8)?, "devmajor")? as u32;
    let dev_minor = numeric_field(reader.read_bytes(8)?, "devminor")? as u32;
    let prefix = string_field(reader.read_bytes(155)?);

    let name = if magic == USTAR_MAGIC && !prefix.is_empty() {
        format!("{prefix}/{name}")
    } else {
        name
    };

    Ok(EntryInfo {
        name,
        link_name,
        size,
        type_flag,
        mode,
        uid,
        gid,
        mtime,
        atime: None,
        ctime: None,
        uname,
        gname,
        dev_major,
        dev_minor,
        block_start,
    })
}

fn verify_checksum(record: &[u8]) -> Result<()> {
    let expected = numeric_field(&record[CHECKSUM_FIELD], "checksum")?;
    let computed = record
        .iter()
        .enumerate()
        .map(|(i, &byte)| {
            if CHECKSUM_FIELD.contains(&i) {
                u64::from(b' ')
            } else {
                u64::from(byte)
            }
        })
        .sum();
    if expected != computed {
        return Err(TarError::WrongHeaderCrc { expected, computed });
    }
    Ok(())
}

/// Extract a NUL-terminated string field.
fn string_field(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Parse a numeric field: null/space-terminated octal ASCII, or GNU
/// base-256 when the first byte has its high bit set. Empty fields are 0.
pub(super) fn numeric_field(bytes: &[u8], field: &'static str) -> Result<u64> {
    if bytes.first().is_some_and(|&b| b & 0x80 != 0) {
        let mut value = 0u64;
        for (i, &byte) in bytes.iter().enumerate() {
            let byte = if i == 0 { byte & 0x7F } else { byte };
            value = value
                .checked_mul(256)
                .and_then(|v| v.checked_add(u64::from(byte)))
                .ok_or(TarError::FieldIsNotNumber { field })?;
        }
        return Ok(value);
    }

    let start = bytes.iter().position(|&b| b != b' ').unwrap_or(bytes.len());
    let end = bytes[start..]
        .iter()
        .position(|&b| b == b' ' || b == 0)
        .map_or(bytes.len(), |i| start + i);

    let mut value = 0u64;
    for &byte in &bytes[start..end] {
        if !(b'0'..=b'7').contains(&byte) {
            return Err(TarError::FieldIsNotNumber { field });
        }
        value = value
            .checked_mul(8)
            .and_then(|v| v.checked_add(u64::from(byte - b'0')))
            .ok_or(TarError::FieldIsNotNumber { field })?;
    }
    Ok(value)
}
