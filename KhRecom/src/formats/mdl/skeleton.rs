//! Bone table parsing.

use glam::{Mat4, Vec3};

use crate::error::{Error, Result};
use crate::utils::ByteCursor;

const BONE_ENTRY_SIZE: usize = 0x14;
const BONE_NAME_LENGTH: usize = 0x10;
const TRANSFORM_ENTRY_SIZE: usize = 0x40;

/// Tail handed to hosts that draw bones as sticks.
pub const BONE_TAIL: Vec3 = Vec3::new(0.025, 0.0, 0.0);

/// +90° about X: maps the asset's Y-up space onto a Z-up host.
pub fn root_alignment() -> Mat4 {
    Mat4::from_rotation_x(std::f32::consts::FRAC_PI_2)
}

/// How a skeleton is going to be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkeletonKind {
    /// Handed to the host as an armature: bones carry a tail and the whole
    /// skeleton sits under [`root_alignment`]. Submeshes get skin weights.
    Renderable,
    /// Only used to pose vertices while decoding (stage geometry).
    LookupOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    pub parent: Option<usize>,
    /// Transform relative to the parent bone.
    pub local: Mat4,
    /// Transform in model space.
    pub global: Mat4,
    pub tail: Option<Vec3>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    pub name: String,
    pub kind: SkeletonKind,
    pub bones: Vec<Bone>,
}

impl Skeleton {
    pub fn empty(name: impl Into<String>, kind: SkeletonKind) -> Self {
        Self {
            name: name.into(),
            kind,
            bones: Vec::new(),
        }
    }

    /// Read the bone table of the model rooted at relative offset `model_offset`.
    ///
    /// The table header is a bone count (`u16`), two reserved bytes, then the
    /// model-relative offsets of the name/parent table and the matrix table.
    /// A zero bone count yields an empty skeleton.
    pub fn read(
        cursor: &mut ByteCursor,
        model_offset: usize,
        name: impl Into<String>,
        kind: SkeletonKind,
    ) -> Result<Self> {
        let mut skeleton = Self::empty(name, kind);

        cursor.seek(model_offset);
        let bone_count = cursor.read_u16()? as usize;
        if bone_count == 0 {
            return Ok(skeleton);
        }
        cursor.skip(2);
        let bone_table_offset = model_offset + cursor.read_u32()? as usize;
        let transform_table_offset = model_offset + cursor.read_u32()? as usize;

        skeleton.bones.reserve(bone_count);
        for i in 0..bone_count {
            cursor.seek(bone_table_offset + i * BONE_ENTRY_SIZE);
            let bone_name = cursor.read_string(BONE_NAME_LENGTH)?;
            let parent_index = cursor.read_i16()?;

            // Matrices are stored column by column.
            cursor.seek(transform_table_offset + i * TRANSFORM_ENTRY_SIZE);
            let local = Mat4::from_cols_array(&cursor.read_f32_array::<16>()?);

            let parent = if parent_index >= 0 {
                let p = parent_index as usize;
                if p >= i {
                    return Err(Error::ParentIndexOutOfRange {
                        bone: i,
                        name: bone_name,
                        parent: parent_index,
                    });
                }
                Some(p)
            } else {
                None
            };
            let global = match parent {
                Some(p) => skeleton.bones[p].global * local,
                None => local,
            };

            skeleton.bones.push(Bone {
                name: bone_name,
                parent,
                local,
                global,
                tail: (kind == SkeletonKind::Renderable).then_some(BONE_TAIL),
            });
        }

        tracing::debug!("Read skeleton '{}' with {} bones", skeleton.name, skeleton.bones.len());
        Ok(skeleton)
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn is_renderable(&self) -> bool {
        self.kind == SkeletonKind::Renderable
    }

    pub fn bone(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index)
    }

    pub fn bone_names(&self) -> impl Iterator<Item = &str> {
        self.bones.iter().map(|b| b.name.as_str())
    }

    /// Transform applied once at the skeleton root.
    pub fn root_transform(&self) -> Mat4 {
        match self.kind {
            SkeletonKind::Renderable => root_alignment(),
            SkeletonKind::LookupOnly => Mat4::IDENTITY,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use byteorder::{LittleEndian, WriteBytesExt};
    use pretty_assertions::assert_eq;

    /// Bone table at offset 0: header, names at 0x10, matrices after them.
    pub(crate) fn bone_table(bones: &[(&str, i16, Mat4)]) -> Vec<u8> {
        let names_offset = 0x10;
        let matrices_offset = names_offset + bones.len() * BONE_ENTRY_SIZE;
        let mut data = Vec::new();
        data.write_u16::<LittleEndian>(bones.len() as u16).unwrap();
        data.write_u16::<LittleEndian>(0).unwrap();
        data.write_u32::<LittleEndian>(names_offset as u32).unwrap();
        data.write_u32::<LittleEndian>(matrices_offset as u32).unwrap();
        data.resize(names_offset, 0);
        for (name, parent, _) in bones {
            let start = data.len();
            data.extend_from_slice(name.as_bytes());
            data.resize(start + BONE_NAME_LENGTH, 0);
            data.write_i16::<LittleEndian>(*parent).unwrap();
            data.resize(start + BONE_ENTRY_SIZE, 0);
        }
        for (_, _, matrix) in bones {
            for value in matrix.to_cols_array() {
                data.write_f32::<LittleEndian>(value).unwrap();
            }
        }
        data
    }

    #[test]
    fn test_global_transforms() {
        let root = Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0));
        let child = Mat4::from_rotation_z(0.5) * Mat4::from_translation(Vec3::X);
        let data = bone_table(&[("root", -1, root), ("arm", 0, child)]);

        let skeleton =
            Skeleton::read(&mut ByteCursor::new(&data), 0, "test", SkeletonKind::Renderable).unwrap();
        assert_eq!(skeleton.len(), 2);
        assert_eq!(skeleton.bones[0].global, root);
        assert_eq!(skeleton.bones[0].parent, None);
        assert_eq!(skeleton.bones[1].parent, Some(0));
        assert_eq!(skeleton.bones[1].name, "arm");
        assert!(skeleton.bones[1].global.abs_diff_eq(root * child, 1e-6));
        assert_eq!(skeleton.bones[1].tail, Some(BONE_TAIL));
        assert!(skeleton.root_transform().abs_diff_eq(root_alignment(), 1e-6));
    }

    #[test]
    fn test_matrix_is_transposed_on_load() {
        let translation = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let data = bone_table(&[("root", -1, translation)]);
        // The translation lands in the last stored row of four floats.
        let stored = &data[0x10 + BONE_ENTRY_SIZE + 48..0x10 + BONE_ENTRY_SIZE + 60];
        assert_eq!(stored, [1.0f32, 2.0, 3.0].map(f32::to_le_bytes).concat());

        let skeleton =
            Skeleton::read(&mut ByteCursor::new(&data), 0, "t", SkeletonKind::LookupOnly).unwrap();
        assert_eq!(skeleton.bones[0].local.w_axis.truncate(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(skeleton.bones[0].tail, None);
        assert_eq!(skeleton.root_transform(), Mat4::IDENTITY);
    }

    #[test]
    fn test_zero_bones_is_empty() {
        let data = [0u8; 16];
        let skeleton =
            Skeleton::read(&mut ByteCursor::new(&data), 0, "t", SkeletonKind::Renderable).unwrap();
        assert!(skeleton.is_empty());
    }

    #[test]
    fn test_forward_parent_is_rejected() {
        let data = bone_table(&[("a", 1, Mat4::IDENTITY), ("b", -1, Mat4::IDENTITY)]);
        let err = Skeleton::read(&mut ByteCursor::new(&data), 0, "t", SkeletonKind::LookupOnly)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
        assert!(matches!(err, Error::ParentIndexOutOfRange { bone: 0, parent: 1, .. }));
    }

    #[test]
    fn test_self_parent_is_rejected() {
        let data = bone_table(&[("a", -1, Mat4::IDENTITY), ("b", 1, Mat4::IDENTITY)]);
        assert!(Skeleton::read(&mut ByteCursor::new(&data), 0, "t", SkeletonKind::LookupOnly).is_err());
    }
}
