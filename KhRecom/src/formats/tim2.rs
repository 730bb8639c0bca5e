//! TIM2 indexed-color images.
//!
//! Only the first picture of a TIM2 block is decoded, and only the two
//! palette formats the games ship: 4-bit and 8-bit CLUT indices. Palette
//! entries are packed RGBA8888 where an alpha of `0x80` means opaque, so
//! decoded alpha can exceed 1.0. That overbright range is kept as-is.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::utils::ByteCursor;

/// "TIM2" read as a little-endian u32.
pub const TIM2_MAGIC: u32 = 0x324D4954;

const PICTURE_HEADER_OFFSET: usize = 0x18;
const FILE_HEADER_SIZE: usize = 0x10;
const PICTURE_HEADER_SIZE: usize = 0x30;
const MIPMAP_HEADER_SIZE: usize = 0x10;

/// Pixel storage of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PixelFormat {
    /// 4-bit palette indices, two pixels per byte, low nibble first.
    Indexed4,
    /// 8-bit palette indices with bits 3 and 4 swapped.
    Indexed8,
}

impl PixelFormat {
    fn from_code(code: u8, texture: &str) -> Result<Self> {
        match code {
            0x4 => Ok(Self::Indexed4),
            0x5 => Ok(Self::Indexed8),
            _ => Err(Error::UnsupportedPixelFormat {
                format: code,
                texture: texture.to_string(),
            }),
        }
    }

    /// Bytes of index data needed for `pixel_count` pixels.
    fn index_bytes(self, pixel_count: usize) -> usize {
        match self {
            Self::Indexed4 => pixel_count.div_ceil(2),
            Self::Indexed8 => pixel_count,
        }
    }
}

/// A decoded texture.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    /// Logical name (archive entry name without `.tm2`).
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Row-major RGBA, bottom row first.
    pub pixels: Vec<[f32; 4]>,
}

impl Texture {
    /// Color at `(x, y)` in output order (row 0 is the bottom of the image).
    pub fn pixel(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }

    /// Flattened `[r, g, b, a, r, g, b, a, ...]` buffer.
    pub fn rgba(&self) -> Vec<f32> {
        self.pixels.iter().flatten().copied().collect()
    }
}

/// Undo the CLUT ordering of 8-bit indices by swapping bits 3 and 4.
pub fn swizzle_index(raw: u8) -> u8 {
    ((raw >> 1) & 0x8) | ((raw << 1) & 0x10) | (raw & 0xE7)
}

/// Expand a packed palette word into normalized RGBA.
///
/// RGB are divided by 255 and alpha by 128.
pub fn palette_color(packed: u32) -> [f32; 4] {
    let channel = |k: u32| ((packed >> (8 * k)) & 0xFF) as f32;
    [
        channel(0) / 255.0,
        channel(1) / 255.0,
        channel(2) / 255.0,
        channel(3) / 128.0,
    ]
}

/// Decode the TIM2 block at relative offset `offset` of `cursor`.
pub fn decode_tim2(cursor: &mut ByteCursor, offset: usize, name: &str) -> Result<Texture> {
    cursor.seek(offset);
    let magic = cursor.read_u32()?;
    if magic != TIM2_MAGIC {
        return Err(Error::InvalidMagic {
            offset: cursor.base() + offset,
            expected: "TIM2",
            found: magic,
        });
    }
    cursor.skip(2);
    let image_count = cursor.read_u16()? as usize;

    // First picture header
    cursor.seek(offset + PICTURE_HEADER_OFFSET);
    let image_data_size = cursor.read_u32()? as usize;
    let color_count = cursor.read_u16s(2)?[1] as usize;
    let mode = cursor.read_u8s(4)?;
    let mipmap_count = mode[1] as usize;
    let format = PixelFormat::from_code(mode[3], name)?;
    let width = cursor.read_u16()? as u32;
    let height = cursor.read_u16()? as u32;

    let data_offset = offset + FILE_HEADER_SIZE + image_count * PICTURE_HEADER_SIZE
        + mipmap_count * MIPMAP_HEADER_SIZE
        - MIPMAP_HEADER_SIZE;
    cursor.seek(data_offset);
    let image = cursor.read_u8s(image_data_size)?;
    let palette: Vec<[f32; 4]> = cursor
        .read_u32s(color_count)?
        .into_iter()
        .map(palette_color)
        .collect();

    let pixel_count = (width * height) as usize;
    let needed = format.index_bytes(pixel_count);
    if image.len() < needed {
        return Err(Error::InconsistentOffsets {
            offset: cursor.base() + offset + PICTURE_HEADER_OFFSET,
            message: format!(
                "texture {name} is {width}x{height} but holds only {} of {needed} index bytes",
                image.len()
            ),
        });
    }

    let (w, h) = (width as usize, height as usize);
    let mut pixels = vec![[0.0; 4]; pixel_count];
    for i in 0..pixel_count {
        let index = match format {
            PixelFormat::Indexed8 => swizzle_index(image[i]),
            PixelFormat::Indexed4 => (image[i / 2] >> if i % 2 == 1 { 4 } else { 0 }) & 0xF,
        } as usize;
        let color = palette.get(index).ok_or_else(|| Error::PaletteIndexOutOfRange {
            texture: name.to_string(),
            index,
            color_count,
        })?;
        // Rows are stored top-down; output is bottom-up.
        let dst = (h - 1 - i / w) * w + i % w;
        pixels[dst] = *color;
    }

    tracing::debug!("Decoded texture {name} ({width}x{height}, {format:?})");
    Ok(Texture {
        name: name.to_string(),
        width,
        height,
        format,
        pixels,
    })
}
