//! VIF vertex streams.
//!
//! A region is a chain of packets, each opened by a DMA tag whose low byte is
//! the packet's quadword count minus one. After a 16-byte block of unpack
//! commands comes a small header (vertex table count, vertex count, render
//! mode) and then fixed-size vertex records starting at packet+0x30.
//!
//! A logical vertex can be spread over several consecutive records, one per
//! influencing bone. Records that belong together carry a strictly
//! increasing split index at +8; their bone-space positions are transformed
//! and summed with the weight in the homogeneous component.

use glam::Vec4;
use indexmap::IndexMap;

use super::skeleton::Skeleton;
use super::types::{BoneWeights, Submesh};
use crate::error::{Error, Result};
use crate::utils::ByteCursor;

/// DMA tag that ends a region.
pub const RETURN_TAG: u32 = 0x6000_0000;
/// Render mode whose UVs come from reflection, so no texture index is stored.
pub const REFLECTIVE_MODE: u16 = 0x4205;

const PACKET_HEADER_OFFSET: usize = 0x14;
const RENDER_MODE_OFFSET: usize = 0x1C;
const VERTEX_DATA_OFFSET: usize = 0x30;
const TEXTURE_INDEX_OFFSET: usize = 0x2C;
const SPLIT_INDEX_OFFSET: usize = 0x8;
/// Bone influences per logical vertex.
pub const MAX_SPLIT_RECORDS: usize = 8;

const COLOR_DIVISORS: [f32; 4] = [256.0, 256.0, 256.0, 128.0];

// Filler for vertices whose packet lacks an attribute the submesh carries.
const DEFAULT_NORMAL: [f32; 3] = [0.0; 3];
const DEFAULT_COLOR: [f32; 4] = [1.0; 4];
const DEFAULT_UV: [f32; 2] = [0.0, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorEncoding {
    /// Four `u32` channels.
    Integer,
    /// Four `f32` channels.
    Float,
}

/// Vertex record layout selected by a packet's render mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderMode {
    pub mode: u16,
    pub record_size: usize,
    pub has_normal: bool,
    pub has_uv: bool,
    pub color: Option<ColorEncoding>,
    pub invert_normals: bool,
}

impl RenderMode {
    /// Look up the layout for a render mode value. `None` for unknown modes.
    pub fn lookup(mode: u16) -> Option<Self> {
        let layout = |record_size, has_normal, has_uv, color, invert_normals| Self {
            mode,
            record_size,
            has_normal,
            has_uv,
            color,
            invert_normals,
        };
        let layout = match mode {
            // Position only
            0x10 => layout(0x20, false, false, None, false),
            0x6 | REFLECTIVE_MODE => layout(0x30, false, true, None, false),
            // Inverse hull outlines
            0x4009 => layout(0x30, false, false, Some(ColorEncoding::Float), true),
            0x0 | 0x5 | 0x24 | 0x200 => layout(0x40, false, true, Some(ColorEncoding::Integer), false),
            0x406 | 0x400B => layout(0x40, false, true, Some(ColorEncoding::Float), false),
            0x406E => layout(0x50, true, true, Some(ColorEncoding::Float), false),
            _ => return None,
        };
        Some(layout)
    }

    /// Whether the first record of a packet stores the texture index.
    pub fn has_texture_index(&self) -> bool {
        self.has_uv && self.mode != REFLECTIVE_MODE
    }
}

/// Decodes the VIF regions of one model.
#[derive(Debug, Clone, Copy)]
pub struct VifDecoder<'a> {
    skeleton: &'a Skeleton,
    texture_names: &'a [String],
    basename: &'a str,
}

impl<'a> VifDecoder<'a> {
    pub fn new(skeleton: &'a Skeleton, texture_names: &'a [String], basename: &'a str) -> Self {
        Self {
            skeleton,
            texture_names,
            basename,
        }
    }

    /// Decode the region starting at relative offset `offset`.
    ///
    /// Returns one submesh per distinct texture index, in first-seen order.
    pub fn decode_region(
        &self,
        cursor: &mut ByteCursor,
        offset: usize,
        translucent: bool,
    ) -> Result<Vec<Submesh>> {
        let mut submeshes: IndexMap<u16, SubmeshBuilder> = IndexMap::new();
        let mut packet = offset;
        let mut packet_count = 0usize;

        while packet < cursor.relative_len() {
            cursor.seek(packet);
            let tag = cursor.read_u32()?;
            if tag == RETURN_TAG {
                break;
            }
            let qword_count = (tag & 0xFF) as usize;

            cursor.seek(packet + PACKET_HEADER_OFFSET);
            let header = cursor.read_u16s(5)?;
            let (vertex_table_count, vertex_count, mode_value) =
                (header[0] as usize, header[2] as usize, header[4]);
            let mode = RenderMode::lookup(mode_value).ok_or(Error::UnsupportedRenderMode {
                offset: cursor.base() + packet + RENDER_MODE_OFFSET,
                mode: mode_value,
            })?;

            let texture_index = if mode.has_texture_index() {
                cursor.seek(packet + mode.record_size + TEXTURE_INDEX_OFFSET);
                cursor.read_u16()?
            } else {
                0
            };

            let builder = submeshes.entry(texture_index).or_insert_with(|| {
                SubmeshBuilder::new(
                    submesh_name(self.basename, texture_index, translucent),
                    texture_index,
                    translucent,
                    mode.invert_normals,
                    self.skeleton.len(),
                )
            });
            self.decode_packet(
                cursor,
                packet + VERTEX_DATA_OFFSET,
                vertex_table_count,
                vertex_count,
                &mode,
                builder,
            )?;

            packet_count += 1;
            packet += (qword_count + 1) * 0x10;
        }

        tracing::debug!(
            "Decoded {packet_count} VIF packets into {} submeshes for {}",
            submeshes.len(),
            self.basename
        );
        Ok(submeshes
            .into_values()
            .map(|builder| builder.finish(self.skeleton, self.texture_names))
            .collect())
    }

    fn decode_packet(
        &self,
        cursor: &mut ByteCursor,
        records_offset: usize,
        vertex_table_count: usize,
        vertex_count: usize,
        mode: &RenderMode,
        builder: &mut SubmeshBuilder,
    ) -> Result<()> {
        let v_start = builder.positions.len();
        builder.backfill(mode);
        let mut record = records_offset;
        let mut table_index = 0usize;

        for v in 0..vertex_count {
            let split_count = split_record_count(
                cursor,
                record,
                mode.record_size,
                vertex_table_count.saturating_sub(table_index),
            )?;
            let vertex_index = (v_start + v) as u32;

            let mut blended = Vec4::ZERO;
            let mut flag = 0i16;
            let mut normal = [0.0; 3];
            let mut color = [0.0; 4];
            let mut uv = [0.0; 2];
            for _ in 0..split_count {
                table_index += 1;
                cursor.seek(record);
                flag = cursor.read_i16()?;
                cursor.skip(2);
                let weight = cursor.read_f32()?;
                cursor.skip(8);
                let [x, y, z] = cursor.read_f32_array::<3>()?;
                cursor.skip(2);
                let bone_index = cursor.read_i16()?;
                let bone = usize::try_from(bone_index)
                    .ok()
                    .and_then(|i| self.skeleton.bone(i).map(|bone| (i, bone)));
                let Some((bone_slot, bone)) = bone else {
                    return Err(Error::BoneIndexOutOfRange {
                        offset: cursor.base() + record,
                        index: bone_index,
                        bone_count: self.skeleton.len(),
                    });
                };
                if let Some(weights) = builder.bone_weights.get_mut(bone_slot) {
                    weights.push((vertex_index, weight));
                }
                blended += bone.global * Vec4::new(x, y, z, weight);

                if mode.has_normal {
                    let [nx, ny, nz, _] = cursor.read_f32_array::<4>()?;
                    normal = [nx, ny, nz];
                }
                if let Some(encoding) = mode.color {
                    color = read_color(cursor, encoding)?;
                }
                if mode.has_uv {
                    uv = cursor.read_f32_array::<2>()?;
                }
                record += mode.record_size;
            }

            builder.positions.push(blended.truncate().to_array());
            push_or_pad(&mut builder.normals, mode.has_normal.then_some(normal), DEFAULT_NORMAL);
            push_or_pad(&mut builder.colors, mode.color.map(|_| color), DEFAULT_COLOR);
            push_or_pad(&mut builder.uvs, mode.has_uv.then_some([uv[0], 1.0 - uv[1]]), DEFAULT_UV);

            if v > 1 {
                match flag {
                    0x00 => builder.triangles.push([vertex_index, vertex_index - 1, vertex_index - 2]),
                    0x20 => builder.triangles.push([vertex_index - 2, vertex_index - 1, vertex_index]),
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

/// Count the consecutive records starting at `record` that make up one
/// logical vertex. `remaining` is the number of unread vertex table entries.
pub fn split_record_count(
    cursor: &mut ByteCursor,
    record: usize,
    record_size: usize,
    remaining: usize,
) -> Result<usize> {
    cursor.seek(record + SPLIT_INDEX_OFFSET);
    let mut split_index = cursor.read_i16()?;
    let mut count = 1;
    if split_index > 0 {
        let extra = (MAX_SPLIT_RECORDS - 1).min(remaining.saturating_sub(1));
        for i in 1..=extra {
            cursor.seek(record + i * record_size + SPLIT_INDEX_OFFSET);
            let next = cursor.read_i16()?;
            if next <= split_index {
                break;
            }
            split_index = next;
            count += 1;
        }
    }
    Ok(count)
}

fn read_color(cursor: &mut ByteCursor, encoding: ColorEncoding) -> Result<[f32; 4]> {
    let raw: [f32; 4] = match encoding {
        ColorEncoding::Integer => {
            let words = cursor.read_u32s(4)?;
            [words[0] as f32, words[1] as f32, words[2] as f32, words[3] as f32]
        }
        ColorEncoding::Float => cursor.read_f32_array::<4>()?,
    };
    Ok([
        raw[0] / COLOR_DIVISORS[0],
        raw[1] / COLOR_DIVISORS[1],
        raw[2] / COLOR_DIVISORS[2],
        raw[3] / COLOR_DIVISORS[3],
    ])
}

/// Push `value`, or `default` when the packet lacks the attribute but earlier
/// vertices of the submesh have it.
fn push_or_pad<T: Copy>(values: &mut Vec<T>, value: Option<T>, default: T) {
    match value {
        Some(value) => values.push(value),
        None if !values.is_empty() => values.push(default),
        None => {}
    }
}

fn submesh_name(basename: &str, texture_index: u16, translucent: bool) -> String {
    format!("{basename}_mat{texture_index}{}", if translucent { "_t" } else { "" })
}

/// Accumulates one submesh across all packets of a region.
#[derive(Debug)]
struct SubmeshBuilder {
    name: String,
    texture_index: u16,
    translucent: bool,
    invert_normals: bool,
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
    colors: Vec<[f32; 4]>,
    triangles: Vec<[u32; 3]>,
    bone_weights: Vec<Vec<(u32, f32)>>,
}

impl SubmeshBuilder {
    fn new(name: String, texture_index: u16, translucent: bool, invert_normals: bool, bone_count: usize) -> Self {
        Self {
            name,
            texture_index,
            translucent,
            invert_normals,
            positions: Vec::new(),
            normals: Vec::new(),
            uvs: Vec::new(),
            colors: Vec::new(),
            triangles: Vec::new(),
            bone_weights: vec![Vec::new(); bone_count],
        }
    }

    /// Pad attributes the packet brings for the first time so they stay
    /// parallel to `positions`.
    fn backfill(&mut self, mode: &RenderMode) {
        let len = self.positions.len();
        if mode.has_normal && self.normals.is_empty() {
            self.normals.resize(len, DEFAULT_NORMAL);
        }
        if mode.color.is_some() && self.colors.is_empty() {
            self.colors.resize(len, DEFAULT_COLOR);
        }
        if mode.has_uv && self.uvs.is_empty() {
            self.uvs.resize(len, DEFAULT_UV);
        }
    }

    fn finish(self, skeleton: &Skeleton, texture_names: &[String]) -> Submesh {
        let mut triangles = self.triangles;
        let mut normals = self.normals;
        if self.invert_normals {
            for triangle in &mut triangles {
                triangle.swap(1, 2);
            }
            for normal in &mut normals {
                *normal = normal.map(|c| -c);
            }
        }

        let bone_weights = if skeleton.is_renderable() {
            self.bone_weights
                .into_iter()
                .zip(&skeleton.bones)
                .enumerate()
                .filter(|(_, (weights, _))| !weights.is_empty())
                .map(|(bone, (weights, b))| BoneWeights {
                    bone,
                    bone_name: b.name.clone(),
                    weights,
                })
                .collect()
        } else {
            Vec::new()
        };

        let texture_name = if self.uvs.is_empty() {
            None
        } else {
            texture_names.get(self.texture_index as usize).cloned()
        };

        Submesh {
            name: self.name,
            texture_index: self.texture_index,
            translucent: self.translucent,
            positions: self.positions,
            normals,
            uvs: self.uvs,
            colors: self.colors,
            triangles,
            bone_weights,
            normals_inverted: self.invert_normals,
            texture_name,
        }
    }
}
