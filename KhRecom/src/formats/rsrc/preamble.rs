//! Detection of the optional preamble that later console re-releases put in
//! front of the PS2 containers.

use crate::utils::ByteCursor;

/// Size of the fixed preamble header.
pub const PLATFORM_PREAMBLE_SIZE: usize = 0x10;
const GNF_TABLE_ENTRY_SIZE: usize = 0x30;
const GNF_NAME_LENGTH: usize = 0x20;

/// Return the number of preamble bytes at the start of `data` (0 if none).
///
/// Two variants are recognised:
/// - a bare 16-byte header whose first word is the remaining file size and
///   whose table count is zero;
/// - a header followed by `count` 0x30-byte GNF texture records, detected by
///   the first record's name ending in `.gnf`.
///
/// Any read failure while probing means "no preamble".
pub fn detect_platform_preamble(data: &[u8]) -> usize {
    let mut cursor = ByteCursor::new(data);
    let (Ok(size_field), Ok(table_count)) = (cursor.read_u32(), cursor.read_i32()) else {
        return 0;
    };
    cursor.skip(8);

    let Some(payload_len) = data.len().checked_sub(PLATFORM_PREAMBLE_SIZE) else {
        return 0;
    };

    if table_count == 0 && size_field as usize == payload_len {
        return cursor.tell();
    }

    if table_count > 0 && (table_count as usize) < payload_len / GNF_TABLE_ENTRY_SIZE {
        if let Ok(name) = cursor.read_string(GNF_NAME_LENGTH) {
            if name.to_ascii_lowercase().ends_with(".gnf") {
                return PLATFORM_PREAMBLE_SIZE + table_count as usize * GNF_TABLE_ENTRY_SIZE;
            }
        }
    }

    0
}

/// Detect the preamble and move the cursor's base past it.
///
/// The cursor is left at relative offset 0 either way. Returns the preamble
/// size.
pub fn skip_platform_preamble(cursor: &mut ByteCursor) -> usize {
    let size = detect_platform_preamble(cursor.data());
    if size > 0 {
        tracing::debug!("Skipping {size:#x}-byte platform preamble");
    }
    cursor.set_base(size);
    cursor.seek(0);
    size
}
