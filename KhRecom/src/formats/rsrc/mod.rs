//! RSRC packed-resource archives.
//!
//! The table of contents is a run of 0x20-byte slots at the start of the
//! container, ended by the first slot whose size field is zero:
//!
//! | size field | layout                                                  |
//! |------------|---------------------------------------------------------|
//! | `< 0`      | offset `u32` @0x00, name (20 bytes) @0x04               |
//! | `> 0`      | name (16 bytes) @0x00, offset `u32` @0x10               |
//!
//! The size itself lives at slot+0x1C; for the negative form the sign bit
//! is cleared to get the byte count.

mod preamble;

pub use preamble::{PLATFORM_PREAMBLE_SIZE, detect_platform_preamble, skip_platform_preamble};

use crate::error::{Error, Result};
use crate::utils::ByteCursor;

/// Size of one directory slot.
pub const ENTRY_SIZE: usize = 0x20;
const SIZE_FIELD_OFFSET: usize = 0x1C;
const SHORT_NAME_LENGTH: usize = 0x10;
const LONG_NAME_LENGTH: usize = 0x14;

/// One file in a resource archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    /// Data offset, relative to the cursor base the directory was read with.
    pub offset: usize,
    pub size: usize,
    /// Entry used the sign-bit (offset-first, 20-byte name) slot layout.
    pub extended_name: bool,
}

impl ArchiveEntry {
    /// Decode the slot starting at the cursor's current position.
    ///
    /// Returns `None` for the zero-size terminator slot.
    fn read(cursor: &mut ByteCursor) -> Result<Option<Self>> {
        let slot = cursor.tell();
        cursor.seek(slot + SIZE_FIELD_OFFSET);
        let size_field = cursor.read_i32()?;
        if size_field == 0 {
            return Ok(None);
        }

        cursor.seek(slot);
        let entry = if size_field < 0 {
            let offset = cursor.read_u32()? as usize;
            let name = cursor.read_string(LONG_NAME_LENGTH)?;
            Self {
                name,
                offset,
                size: (size_field & 0x7FFF_FFFF) as usize,
                extended_name: true,
            }
        } else {
            let name = cursor.read_string(SHORT_NAME_LENGTH)?;
            let offset = cursor.read_u32()? as usize;
            Self {
                name,
                offset,
                size: size_field as usize,
                extended_name: false,
            }
        };
        Ok(Some(entry))
    }

    /// Name with a trailing `.tm2` extension removed.
    pub fn logical_name(&self) -> &str {
        self.name.strip_suffix(".tm2").unwrap_or(&self.name)
    }

    /// Borrow this entry's bytes from the container the directory was read from.
    ///
    /// `None` when the entry does not fit in `cursor`, e.g. a cursor over a
    /// different buffer.
    pub fn data<'a>(&self, cursor: &ByteCursor<'a>) -> Option<&'a [u8]> {
        let start = cursor.base().checked_add(self.offset)?;
        cursor.data().get(start..start.checked_add(self.size)?)
    }
}

/// Parsed table of contents of a resource archive.
#[derive(Debug, Clone, Default)]
pub struct ArchiveDirectory {
    /// Absolute offset of the first slot.
    base: usize,
    entries: Vec<ArchiveEntry>,
}

impl ArchiveDirectory {
    /// Read the directory starting at relative offset 0 of `cursor`.
    ///
    /// Stops at the first zero-size slot or when fewer than 0x20 bytes remain.
    /// An entry whose data range leaves the container is an error naming the
    /// slot offset.
    pub fn read(cursor: &mut ByteCursor) -> Result<Self> {
        let len = cursor.relative_len();
        let mut entries = Vec::new();
        let mut slot = 0;
        while slot + ENTRY_SIZE <= len {
            cursor.seek(slot);
            let Some(entry) = ArchiveEntry::read(cursor)? else {
                break;
            };
            let end = entry.offset.saturating_add(entry.size);
            if end > len {
                return Err(Error::EntryOutOfBounds {
                    offset: cursor.base() + slot,
                    name: entry.name,
                    start: entry.offset,
                    end,
                    len,
                });
            }
            entries.push(entry);
            slot += ENTRY_SIZE;
        }
        tracing::debug!("Read {} archive entries", entries.len());
        Ok(Self {
            base: cursor.base(),
            entries,
        })
    }

    /// Fail with [`Error::EmptyDirectory`] when no entries were found.
    pub fn require_non_empty(self) -> Result<Self> {
        if self.entries.is_empty() {
            return Err(Error::EmptyDirectory { offset: self.base });
        }
        Ok(self)
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArchiveEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find an entry by exact name.
    pub fn find(&self, name: &str) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

impl<'d> IntoIterator for &'d ArchiveDirectory {
    type Item = &'d ArchiveEntry;
    type IntoIter = std::slice::Iter<'d, ArchiveEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
