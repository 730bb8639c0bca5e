//! Serializable overview of a decoded scene, used by tooling and tests.

use serde::Serialize;

use super::{Instance, SceneBuilder};
use crate::formats::mdl::{Skeleton, Submesh};
use crate::formats::tim2::{PixelFormat, Texture};
use crate::session::{Material, UnitFailure};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoneSummary {
    pub name: String,
    pub parent: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkeletonSummary {
    pub resource: usize,
    pub name: String,
    pub bones: Vec<BoneSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmeshSummary {
    pub resource: usize,
    pub name: String,
    pub vertices: usize,
    pub triangles: usize,
    pub has_normals: bool,
    pub has_uvs: bool,
    pub has_colors: bool,
    pub translucent: bool,
    pub texture: Option<String>,
    pub weighted_bones: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceSummary {
    pub name: String,
    pub resource: usize,
    pub translation: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
    pub duplicate: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextureSummary {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

/// Collects everything emitted into it as plain records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SceneSummary {
    pub skeletons: Vec<SkeletonSummary>,
    pub submeshes: Vec<SubmeshSummary>,
    pub instances: Vec<InstanceSummary>,
    pub materials: Vec<Material>,
    pub textures: Vec<TextureSummary>,
    pub failures: Vec<String>,
}

impl SceneSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Submeshes emitted under `resource`.
    pub fn resource_submeshes(&self, resource: usize) -> impl Iterator<Item = &SubmeshSummary> {
        self.submeshes.iter().filter(move |s| s.resource == resource)
    }
}

impl SceneBuilder for SceneSummary {
    fn skeleton(&mut self, resource: usize, skeleton: &Skeleton) {
        self.skeletons.push(SkeletonSummary {
            resource,
            name: skeleton.name.clone(),
            bones: skeleton
                .bones
                .iter()
                .map(|b| BoneSummary {
                    name: b.name.clone(),
                    parent: b.parent,
                })
                .collect(),
        });
    }

    fn submesh(&mut self, resource: usize, submesh: &Submesh, _skeleton: Option<&Skeleton>) {
        self.submeshes.push(SubmeshSummary {
            resource,
            name: submesh.name.clone(),
            vertices: submesh.vertex_count(),
            triangles: submesh.triangles.len(),
            has_normals: submesh.has_normals(),
            has_uvs: submesh.has_uvs(),
            has_colors: submesh.has_colors(),
            translucent: submesh.translucent,
            texture: submesh.texture_name.clone(),
            weighted_bones: submesh.bone_weights.iter().map(|w| w.bone_name.clone()).collect(),
        });
    }

    fn instance(&mut self, instance: &Instance) {
        self.instances.push(InstanceSummary {
            name: instance.name.clone(),
            resource: instance.resource,
            translation: instance.placement.translation.to_array(),
            rotation: instance.placement.rotation.to_array(),
            scale: instance.placement.scale.to_array(),
            duplicate: instance.duplicate,
        });
    }

    fn material(&mut self, material: &Material) {
        self.materials.push(material.clone());
    }

    fn texture(&mut self, texture: &Texture) {
        self.textures.push(TextureSummary {
            name: texture.name.clone(),
            width: texture.width,
            height: texture.height,
            format: texture.format,
        });
    }

    fn failure(&mut self, failure: &UnitFailure) {
        self.failures.push(failure.to_string());
    }
}
