//! Model header, texture table and region dispatch.

use super::skeleton::Skeleton;
use super::types::Model;
use super::vif::VifDecoder;
use crate::error::Result;
use crate::utils::ByteCursor;

const TEXTURE_COUNT_OFFSET: usize = 0xC;
const TEXTURE_NAME_LENGTH: usize = 0x20;

/// Fixed header at the root of every model.
///
/// All offsets are relative to the model root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelHeader {
    pub bone_count: u16,
    pub texture_count: usize,
    pub texture_table_offset: usize,
    pub opaque_region: Option<usize>,
    pub translucent_region: Option<usize>,
}

impl ModelHeader {
    pub fn read(cursor: &mut ByteCursor, model_offset: usize) -> Result<Self> {
        cursor.seek(model_offset);
        let bone_count = cursor.read_u16()?;
        cursor.seek(model_offset + TEXTURE_COUNT_OFFSET);
        let texture_count = cursor.read_u32()? as usize;
        let texture_table_offset = cursor.read_u32()? as usize;
        let opaque = cursor.read_u32()? as usize;
        let translucent = cursor.read_u32()? as usize;
        Ok(Self {
            bone_count,
            texture_count,
            texture_table_offset,
            opaque_region: (opaque != 0).then_some(opaque),
            translucent_region: (translucent != 0).then_some(translucent),
        })
    }

    /// Models without textures only cast shadows.
    pub fn is_shadow(&self) -> bool {
        self.texture_count == 0
    }

    pub fn read_texture_names(&self, cursor: &mut ByteCursor, model_offset: usize) -> Result<Vec<String>> {
        cursor.seek(model_offset + self.texture_table_offset);
        (0..self.texture_count)
            .map(|_| cursor.read_string(TEXTURE_NAME_LENGTH))
            .collect()
    }
}

/// Decode the model rooted at `model_offset`, posing vertices with `skeleton`.
///
/// The opaque region is decoded before the translucent one; each is skipped
/// when its offset is zero.
pub fn decode_model(
    cursor: &mut ByteCursor,
    model_offset: usize,
    header: &ModelHeader,
    name: &str,
    skeleton: &Skeleton,
) -> Result<Model> {
    let texture_names = header.read_texture_names(cursor, model_offset)?;
    let decoder = VifDecoder::new(skeleton, &texture_names, name);

    let mut submeshes = Vec::new();
    if let Some(region) = header.opaque_region {
        submeshes.extend(decoder.decode_region(cursor, model_offset + region, false)?);
    }
    if let Some(region) = header.translucent_region {
        submeshes.extend(decoder.decode_region(cursor, model_offset + region, true)?);
    }

    Ok(Model {
        name: name.to_string(),
        texture_names,
        submeshes,
        shadow: header.is_shadow(),
    })
}
