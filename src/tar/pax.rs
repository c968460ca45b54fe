//! PAX extended-header overlays.
//!
//! The body of an `'x'` or `'g'` member is a sequence of records
//!
//! ```text
//! <len> <key>=<value>\n
//! ```
//!
//! where `<len>` is the decimal byte length of the whole record, its own
//! digits and the trailing newline included. The length prefix governs the
//! record extent, so values are free to contain `=`, spaces, and newlines.
//! Later records win when a key repeats.

use std::collections::BTreeMap;

use super::{Result, TarError};

/// Key/value overlay parsed from one extended-header body.
///
/// Scoping is the walker's business: a local overlay applies to the next
/// member only, a global one to every member that follows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaxOverlay {
    records: BTreeMap<String, String>,
}

impl PaxOverlay {
    /// Parse an extended-header body.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let mut records = BTreeMap::new();
        let mut rest = body;
        while !rest.is_empty() {
            let space = rest
                .iter()
                .position(|&b| b == b' ')
                .ok_or(TarError::MalformedExtendedHeader)?;
            let length: usize = std::str::from_utf8(&rest[..space])
                .ok()
                .and_then(|digits| digits.parse().ok())
                .ok_or(TarError::MalformedExtendedHeader)?;
            // the length covers its own digits, the separator, and the newline
            if length <= space + 1 || length > rest.len() || rest[length - 1] != b'\n' {
                return Err(TarError::MalformedExtendedHeader);
            }

            let pair = &rest[space + 1..length - 1];
            let equals = pair
                .iter()
                .position(|&b| b == b'=')
                .ok_or(TarError::MalformedExtendedHeader)?;
            records.insert(
                String::from_utf8_lossy(&pair[..equals]).into_owned(),
                String::from_utf8_lossy(&pair[equals + 1..]).into_owned(),
            );
            rest = &rest[length..];
        }
        Ok(Self { records })
    }

    /// Raw lookup of any record.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.records.get(key).map(String::as_str)
    }

    pub fn path(&self) -> Option<&str> {
        self.get("path")
    }

    pub fn link_path(&self) -> Option<&str> {
        self.get("linkpath")
    }

    pub fn size(&self) -> Option<u64> {
        self.decimal("size")
    }

    pub fn uid(&self) -> Option<u64> {
        self.decimal("uid")
    }

    pub fn gid(&self) -> Option<u64> {
        self.decimal("gid")
    }

    pub fn mode(&self) -> Option<u32> {
        self.decimal("mode").map(|mode| mode as u32)
    }

    pub fn mtime(&self) -> Option<u64> {
        self.seconds("mtime")
    }

    pub fn atime(&self) -> Option<u64> {
        self.seconds("atime")
    }

    pub fn ctime(&self) -> Option<u64> {
        self.seconds("ctime")
    }

    pub fn uname(&self) -> Option<&str> {
        self.get("uname")
    }

    pub fn gname(&self) -> Option<&str> {
        self.get("gname")
    }

    fn decimal(&self, key: &str) -> Option<u64> {
        self.get(key)?.parse().ok()
    }

    /// Timestamps may carry a fractional part; only whole seconds are kept.
    fn seconds(&self, key: &str) -> Option<u64> {
        let value = self.get(key)?;
        let whole = value.split('.').next().unwrap_or(value);
        whole.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_record() {
        let overlay = PaxOverlay::parse(b"20 path=foo/bar.txt\n").unwrap();
        assert_eq!(overlay.path(), Some("foo/bar.txt"));
    }

    #[test]
    fn test_parse_several_records() {
        let overlay =
            PaxOverlay::parse(b"20 path=foo/bar.txt\n15 uid=1000000\n17 mtime=123.456\n").unwrap();
        assert_eq!(overlay.path(), Some("foo/bar.txt"));
        assert_eq!(overlay.uid(), Some(1_000_000));
        assert_eq!(overlay.mtime(), Some(123));
    }

    #[test]
    fn test_value_may_contain_equals_and_newline() {
        // the length prefix, not the separators, delimits the record
        let overlay = PaxOverlay::parse(b"26 comment=a=b\nstill here\n").unwrap();
        assert_eq!(overlay.get("comment"), Some("a=b\nstill here"));
    }

    #[test]
    fn test_later_record_wins() {
        let overlay = PaxOverlay::parse(b"12 path=one\n12 path=two\n").unwrap();
        assert_eq!(overlay.path(), Some("two"));
    }

    #[test]
    fn test_malformed_length() {
        assert!(matches!(
            PaxOverlay::parse(b"99 path=short\n"),
            Err(TarError::MalformedExtendedHeader)
        ));
        assert!(matches!(
            PaxOverlay::parse(b"nonsense"),
            Err(TarError::MalformedExtendedHeader)
        ));
    }

    #[test]
    fn test_missing_newline() {
        assert!(matches!(
            PaxOverlay::parse(b"12 path=onex"),
            Err(TarError::MalformedExtendedHeader)
        ));
    }
}
