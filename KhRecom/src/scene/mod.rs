//! Handing decoded data to a scene host.
//!
//! Containers never build scene objects themselves. Instead each decoded
//! container exposes an `emit` method that walks its plain data into a
//! [`SceneBuilder`]. Resources are numbered per container: an [`Instance`]
//! refers to the resource index its geometry was emitted under.

mod summary;

pub use summary::{BoneSummary, InstanceSummary, SceneSummary, SkeletonSummary, SubmeshSummary, TextureSummary};

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::formats::mdl::{Skeleton, Submesh, root_alignment};
use crate::formats::tim2::Texture;
use crate::session::{Material, UnitFailure};

/// Receiver of decoded scene data.
///
/// Only geometry callbacks are required; the rest default to no-ops.
pub trait SceneBuilder {
    fn skeleton(&mut self, resource: usize, skeleton: &Skeleton);

    fn submesh(&mut self, resource: usize, submesh: &Submesh, skeleton: Option<&Skeleton>);

    fn instance(&mut self, _instance: &Instance) {}

    fn material(&mut self, _material: &Material) {}

    fn texture(&mut self, _texture: &Texture) {}

    fn failure(&mut self, _failure: &UnitFailure) {}
}

/// Position, Euler rotation (radians, applied X then Y then Z) and scale of
/// a placed object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub translation: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Placement {
    pub fn rotation_matrix(&self) -> Mat4 {
        Mat4::from_quat(Quat::from_euler(
            EulerRot::ZYX,
            self.rotation.z,
            self.rotation.y,
            self.rotation.x,
        ))
    }

    /// `root alignment · translation · rotation · scale`.
    pub fn world_transform(&self) -> Mat4 {
        root_alignment()
            * Mat4::from_translation(self.translation)
            * self.rotation_matrix()
            * Mat4::from_scale(self.scale)
    }
}

/// One placement of a decoded resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub name: String,
    /// Index of the resource (stage mesh or gimmick model) this places.
    pub resource: usize,
    pub placement: Placement,
    pub transform: Mat4,
    /// Identifier read from the placement record, if it has one.
    pub unique_id: Option<u32>,
    /// The resource was already placed by an earlier instance.
    pub duplicate: bool,
    pub skybox: bool,
}

impl Instance {
    pub fn new(name: String, resource: usize, placement: Placement) -> Self {
        Self {
            name,
            resource,
            placement,
            transform: placement.world_transform(),
            unique_id: None,
            duplicate: false,
            skybox: false,
        }
    }
}
