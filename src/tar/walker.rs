//! Record-level archive walk with GNU and PAX continuation state.

use tracing::trace;

use crate::bit_reader::{BitOrder, BitReader, TruncatedInput};

use super::header::{self, EntryInfo, EntryType};
use super::pax::PaxOverlay;
use super::{round_to_512, Result, TarError, RECORD_SIZE};

/// One archive member: its resolved descriptor plus a zero-copy view of its
/// data. The slice borrows from the walked input.
#[derive(Debug)]
pub struct TarEntry<'a> {
    pub info: EntryInfo,
    pub data: &'a [u8],
}

/// Walk an entire archive, collecting every member.
pub fn tar_walk(data: &[u8]) -> Result<Vec<TarEntry<'_>>> {
    let mut walker = TarWalker::new(data)?;
    let mut entries = Vec::new();
    while let Some(entry) = walker.next_entry()? {
        entries.push(entry);
    }
    Ok(entries)
}

/// Incremental archive walker.
///
/// Extension records (`'K'`, `'L'`, `'x'`, `'g'`) are absorbed into pending
/// state and applied to the next real member; only real members are yielded.
pub struct TarWalker<'a> {
    data: &'a [u8],
    offset: usize,
    global: Option<PaxOverlay>,
    local: Option<PaxOverlay>,
    long_name: Option<String>,
    long_link_name: Option<String>,
    done: bool,
}

impl<'a> TarWalker<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self> {
        if data.len() < RECORD_SIZE {
            return Err(TarError::InputTooSmall(data.len()));
        }
        Ok(Self {
            data,
            offset: 0,
            global: None,
            local: None,
            long_name: None,
            long_link_name: None,
            done: false,
        })
    }

    /// Yield the next member, or `None` once the terminating zero records
    /// (or the end of the input) are reached.
    pub fn next_entry(&mut self) -> Result<Option<TarEntry<'a>>> {
        while !self.done {
            let Some(record) = self.data.get(self.offset..self.offset + RECORD_SIZE) else {
                self.done = true;
                break;
            };
            // A zero record is the archive terminator; well-formed archives
            // carry two of them.
            if record.iter().all(|&byte| byte == 0) {
                self.done = true;
                break;
            }

            match EntryType::from_byte(record[156]) {
                EntryType::GnuLongName => {
                    let name = self.read_gnu_long(record)?;
                    trace!(name = %name, "gnu long name");
                    self.long_name = Some(name);
                }
                EntryType::GnuLongLink => {
                    let link = self.read_gnu_long(record)?;
                    trace!(link = %link, "gnu long link-name");
                    self.long_link_name = Some(link);
                }
                _ => {
                    if let Some(entry) = self.read_member(record)? {
                        return Ok(Some(entry));
                    }
                }
            }
        }
        Ok(None)
    }

    /// Read the path carried by a `'K'`/`'L'` record and advance past it.
    /// Only the size field matters; the body is a null-terminated path.
    fn read_gnu_long(&mut self, record: &[u8]) -> Result<String> {
        let size = header::numeric_field(&record[124..136], "size")? as usize;
        let body = self.slice_data(size)?;
        let mut reader = BitReader::new(body, BitOrder::MsbFirst);
        let path = reader.null_ended_ascii(size);
        self.advance(size);
        Ok(path)
    }

    /// Parse a full header record; stash extended headers, emit the rest.
    fn read_member(&mut self, record: &[u8]) -> Result<Option<TarEntry<'a>>> {
        let mut info = header::parse_record(record, self.offset)?;

        match info.type_flag {
            EntryType::PaxGlobal | EntryType::PaxLocal => {
                let body = self.slice_data(info.size)?;
                let overlay = PaxOverlay::parse(body)?;
                trace!(global = info.is_global_extended_header(), "pax overlay");
                if info.is_global_extended_header() {
                    self.global = Some(overlay);
                } else {
                    self.local = Some(overlay);
                }
                self.advance(info.size);
                Ok(None)
            }
            _ => {
                self.apply_overlays(&mut info);
                let data = self.slice_data(info.size)?;
                self.advance(info.size);
                self.local = None;
                self.long_name = None;
                self.long_link_name = None;
                Ok(Some(TarEntry { info, data }))
            }
        }
    }

    /// Resolve `info` against the pending overlay state.
    ///
    /// Name precedence, highest first: local PAX `path`, GNU long name,
    /// global PAX `path`, then the header's own (prefix-joined) name. The
    /// link-name mirrors it with `linkpath` and the `'K'` override. Scalar
    /// fields take PAX overrides, local shadowing global.
    fn apply_overlays(&self, info: &mut EntryInfo) {
        for overlay in self.global.iter().chain(self.local.iter()) {
            if let Some(size) = overlay.size() {
                info.size = size as usize;
            }
            if let Some(mode) = overlay.mode() {
                info.mode = mode;
            }
            if let Some(uid) = overlay.uid() {
                info.uid = uid;
            }
            if let Some(gid) = overlay.gid() {
                info.gid = gid;
            }
            if let Some(mtime) = overlay.mtime() {
                info.mtime = mtime;
            }
            if let Some(atime) = overlay.atime() {
                info.atime = Some(atime);
            }
            if let Some(ctime) = overlay.ctime() {
                info.ctime = Some(ctime);
            }
            if let Some(uname) = overlay.uname() {
                info.uname = uname.to_owned();
            }
            if let Some(gname) = overlay.gname() {
                info.gname = gname.to_owned();
            }
        }

        if let Some(path) = self.local.as_ref().and_then(PaxOverlay::path) {
            info.name = path.to_owned();
        } else if let Some(name) = &self.long_name {
            info.name = name.clone();
        } else if let Some(path) = self.global.as_ref().and_then(PaxOverlay::path) {
            info.name = path.to_owned();
        }

        if let Some(link) = self.local.as_ref().and_then(PaxOverlay::link_path) {
            info.link_name = link.to_owned();
        } else if let Some(link) = &self.long_link_name {
            info.link_name = link.clone();
        } else if let Some(link) = self.global.as_ref().and_then(PaxOverlay::link_path) {
            info.link_name = link.to_owned();
        }
    }

    /// Data run of the record at the current offset.
    fn slice_data(&self, size: usize) -> Result<&'a [u8]> {
        let start = self.offset + RECORD_SIZE;
        let end = start
            .checked_add(size)
            .filter(|&end| end <= self.data.len())
            .ok_or(TarError::TruncatedInput(TruncatedInput {
                index: self.data.len(),
            }))?;
        Ok(&self.data[start..end])
    }

    /// Step over the current record and its padded data run.
    fn advance(&mut self, size: usize) {
        self.offset += RECORD_SIZE + round_to_512(size);
    }
}

impl<'a> Iterator for TarWalker<'a> {
    type Item = Result<TarEntry<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}
