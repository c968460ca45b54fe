//! POSIX/GNU tar archive walking.
//!
//! A tar stream is a sequence of 512-byte records. Each member starts with a
//! `ustar` header record followed by its data, padded up to the next record
//! boundary; the archive ends with two zero records. Three extension
//! mechanisms complicate the walk:
//!
//! | Type flag | Meaning |
//! |-----------|---------|
//! | `'L'` / `'K'` | GNU long name / long link-name: the record body is a path overriding the next member's `name` / `linkname` |
//! | `'x'` | PAX extended header applying to the next member only |
//! | `'g'` | PAX global extended header applying to all subsequent members |
//!
//! The walker resolves all of these and emits one [`TarEntry`] per actual
//! member, with its data as a zero-copy slice of the input. Extension
//! records are consumed, never emitted.

mod header;
mod pax;
mod walker;


pub use header::{EntryInfo, EntryType};
pub use pax::PaxOverlay;
pub use walker::{tar_walk, TarEntry, TarWalker};

use thiserror::Error;

use crate::bit_reader::TruncatedInput;

/// Size of one tar record.
pub const RECORD_SIZE: usize = 512;

/// Archive walking errors. All are fatal; the walk yields either every
/// entry or exactly one of these.
#[derive(Debug, Error)]
pub enum TarError {
    /// The input is shorter than a single record.
    #[error("input of {0} bytes is smaller than one tar record")]
    InputTooSmall(usize),

    /// A numeric header field holds something other than octal ASCII or a
    /// base-256 value.
    #[error("header field `{field}` is not a number")]
    FieldIsNotNumber {
        /// Header field name.
        field: &'static str,
    },

    /// The stored header checksum does not match the record contents.
    #[error("header checksum mismatch: stored {expected}, computed {computed}")]
    WrongHeaderCrc {
        /// Checksum stored in the header.
        expected: u64,
        /// Unsigned byte sum of the record.
        computed: u64,
    },

    /// A PAX extended-header record violates the `"<len> <key>=<value>\n"`
    /// grammar.
    #[error("malformed extended header record")]
    MalformedExtendedHeader,

    /// A record or data run extends past the end of the input.
    #[error(transparent)]
    TruncatedInput(#[from] TruncatedInput),
}

pub type Result<T> = std::result::Result<T, TarError>;

/// Round `n` up to the next multiple of the record size.
pub fn round_to_512(n: usize) -> usize {
    ((n + 511) / 512) * 512
}
