//! Decoded model data handed to scene hosts.

/// Skin weights of one bone.
#[derive(Debug, Clone, PartialEq)]
pub struct BoneWeights {
    pub bone: usize,
    pub bone_name: String,
    /// `(vertex index, weight)` pairs, in decode order.
    pub weights: Vec<(u32, f32)>,
}

/// Geometry of one texture within one VIF region.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Submesh {
    pub name: String,
    pub texture_index: u16,
    /// Decoded from the translucent region.
    pub translucent: bool,
    pub positions: Vec<[f32; 3]>,
    /// Empty unless some packet's render mode carries normals. Otherwise one
    /// per position, zero for vertices whose packet has none.
    pub normals: Vec<[f32; 3]>,
    /// Empty or one per position; V is already flipped. Vertices without
    /// UVs get `[0, 1]`.
    pub uvs: Vec<[f32; 2]>,
    /// Empty or one per position, white where the packet has no colors.
    /// Alpha may exceed 1.0.
    pub colors: Vec<[f32; 4]>,
    pub triangles: Vec<[u32; 3]>,
    /// Only filled for renderable skeletons; bones without weights are omitted.
    pub bone_weights: Vec<BoneWeights>,
    /// Winding (and normals) were flipped at finalization.
    pub normals_inverted: bool,
    /// Texture bound to this submesh, when it has UVs and the index resolves.
    pub texture_name: Option<String>,
}

impl Submesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty()
    }

    pub fn has_uvs(&self) -> bool {
        !self.uvs.is_empty()
    }

    pub fn has_colors(&self) -> bool {
        !self.colors.is_empty()
    }

    /// UV-mapped but with no texture to show, e.g. particle effect markers.
    pub fn is_placeholder(&self) -> bool {
        self.has_uvs() && self.texture_name.is_none()
    }
}

/// One model of a container: its texture table and decoded submeshes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    pub name: String,
    pub texture_names: Vec<String>,
    pub submeshes: Vec<Submesh>,
    /// Model has no textures and was imported as a shadow caster.
    pub shadow: bool,
}
