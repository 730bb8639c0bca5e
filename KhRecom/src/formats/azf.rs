//! AZF stage containers: a mesh table and an instance table placing the
//! meshes in the world.
//!
//! ```text
//! 0x00  u32         instance header offset (H)
//! 0x04  u32 * n     mesh offsets, n = (H - 4) / 4
//! H     u16, u16    instance count, skybox instance count
//! H+4   u32         instance table offset, relative to H
//! ```
//!
//! Instance records are 0x40 bytes. The first `skybox count` instances
//! belong to the skybox.

use glam::Vec3;

use crate::error::{Error, Result};
use crate::formats::mdl::{ModelHeader, Skeleton, SkeletonKind, Submesh, decode_model};
use crate::scene::{Instance, Placement, SceneBuilder};
use crate::session::ImportSession;
use crate::utils::ByteCursor;

const INSTANCE_RECORD_SIZE: usize = 0x40;

/// A decoded stage mesh, shared by every instance that places it.
#[derive(Debug, Clone, PartialEq)]
pub struct StageMesh {
    /// Index in the stage's mesh table.
    pub mesh_index: u16,
    /// Named after the first instance that placed it.
    pub name: String,
    /// Pose-only skeleton used while decoding.
    pub skeleton: Skeleton,
    pub submeshes: Vec<Submesh>,
}

/// Raw instance record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceRecord {
    pub mesh_index: u16,
    /// Euler angles in tenths of a degree.
    pub rotation: [i16; 3],
    pub position: [f32; 4],
    pub scale: [f32; 4],
}

impl InstanceRecord {
    pub fn read(cursor: &mut ByteCursor, offset: usize) -> Result<Self> {
        cursor.seek(offset);
        let mesh_index = cursor.read_u16()?;
        cursor.skip(6);
        let rotation = cursor.read_i16s(3)?;
        cursor.skip(2);
        let position = cursor.read_f32_array::<4>()?;
        let scale = cursor.read_f32_array::<4>()?;
        Ok(Self {
            mesh_index,
            rotation: [rotation[0], rotation[1], rotation[2]],
            position,
            scale,
        })
    }

    pub fn placement(&self) -> Placement {
        let angle = |tenths: i16| (f32::from(tenths) / 10.0).to_radians();
        Placement {
            translation: Vec3::new(self.position[0], self.position[1], self.position[2]),
            rotation: Vec3::new(angle(self.rotation[0]), angle(self.rotation[1]), angle(self.rotation[2])),
            scale: Vec3::new(self.scale[0], self.scale[1], self.scale[2]),
        }
    }
}

/// Decode state of one mesh table slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MeshSlot {
    Pending,
    Decoded(usize),
    /// Nothing to show (placeholder) or decoding failed.
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub name: String,
    /// Size of the mesh table.
    pub mesh_count: usize,
    pub skybox_count: usize,
    /// Decoded meshes, in order of first use. [`Instance::resource`] indexes this.
    pub meshes: Vec<StageMesh>,
    pub instances: Vec<Instance>,
}

impl Stage {
    /// Decode a stage container named `name` (usually the file stem).
    ///
    /// Each referenced mesh is decoded once, the first time an instance
    /// refers to it; later instances reuse it. Meshes and instances that
    /// fail are recorded in `session` and skipped.
    pub fn read(data: &[u8], name: &str, session: &mut ImportSession) -> Result<Self> {
        let mut cursor = ByteCursor::new(data);
        let header_offset = cursor.read_u32()?;
        if header_offset == 0 || header_offset as usize >= data.len() {
            return Err(Error::InvalidInstanceSector { offset: header_offset });
        }
        let header_offset = header_offset as usize;

        let mesh_count = header_offset.saturating_sub(4) / 4;
        let mesh_offsets = cursor.read_u32s(mesh_count)?;

        cursor.seek(header_offset);
        let instance_count = cursor.read_u16()? as usize;
        let skybox_count = cursor.read_u16()? as usize;
        let table_offset = header_offset + cursor.read_u32()? as usize;

        let options = *session.options();
        let mut stage = Self {
            name: name.to_string(),
            mesh_count,
            skybox_count,
            meshes: Vec::new(),
            instances: Vec::new(),
        };
        let mut slots = vec![MeshSlot::Pending; mesh_count];

        for i in 0..instance_count {
            let skybox = i < skybox_count;
            if skybox && !options.import_skybox {
                continue;
            }
            let record = match InstanceRecord::read(&mut cursor, table_offset + i * INSTANCE_RECORD_SIZE) {
                Ok(record) => record,
                Err(err) => {
                    session.record_failure(format!("{name} instance {i}"), err);
                    continue;
                }
            };

            let instance_name = format!(
                "{name}{}_i{}_m{}",
                if skybox { "-sky" } else { "" },
                if skybox { i } else { i - skybox_count },
                record.mesh_index
            );
            let mesh_index = record.mesh_index as usize;
            let Some(slot) = slots.get_mut(mesh_index) else {
                session.record_failure(
                    instance_name,
                    Error::MeshIndexOutOfRange {
                        instance: i,
                        mesh_index: record.mesh_index,
                        mesh_count,
                    },
                );
                continue;
            };

            let duplicate = *slot != MeshSlot::Pending;
            if *slot == MeshSlot::Pending {
                *slot = match decode_stage_mesh(
                    &mut cursor,
                    mesh_offsets[mesh_index] as usize,
                    record.mesh_index,
                    &instance_name,
                    options.ignore_placeholders,
                ) {
                    Ok(Some(mesh)) => {
                        session.register_materials(&mesh.submeshes);
                        stage.meshes.push(mesh);
                        MeshSlot::Decoded(stage.meshes.len() - 1)
                    }
                    Ok(None) => {
                        tracing::debug!("Mesh {mesh_index} of {name} is a placeholder");
                        MeshSlot::Empty
                    }
                    Err(err) => {
                        session.record_failure(instance_name.clone(), err);
                        MeshSlot::Empty
                    }
                };
            }

            if let MeshSlot::Decoded(resource) = *slot {
                if duplicate {
                    tracing::debug!("Reusing mesh {mesh_index} for {instance_name}");
                }
                let mut instance = Instance::new(instance_name, resource, record.placement());
                instance.duplicate = duplicate;
                instance.skybox = skybox;
                stage.instances.push(instance);
            }
        }

        tracing::info!(
            "Read stage {name}: {} of {mesh_count} meshes, {} instances",
            stage.meshes.len(),
            stage.instances.len()
        );
        Ok(stage)
    }

    pub fn emit(&self, builder: &mut dyn SceneBuilder) {
        for (resource, mesh) in self.meshes.iter().enumerate() {
            for submesh in &mesh.submeshes {
                builder.submesh(resource, submesh, None);
            }
        }
        for instance in &self.instances {
            builder.instance(instance);
        }
    }
}

/// Decode one stage mesh. `None` when it only holds placeholders.
fn decode_stage_mesh(
    cursor: &mut ByteCursor,
    offset: usize,
    mesh_index: u16,
    name: &str,
    ignore_placeholders: bool,
) -> Result<Option<StageMesh>> {
    let header = ModelHeader::read(cursor, offset)?;
    if ignore_placeholders && header.texture_count == 0 {
        return Ok(None);
    }
    let skeleton = Skeleton::read(cursor, offset, format!("{name}_Armature"), SkeletonKind::LookupOnly)?;
    let mut model = decode_model(cursor, offset, &header, name, &skeleton)?;
    if ignore_placeholders {
        model.submeshes.retain(|s| !s.is_placeholder());
    }
    Ok(Some(StageMesh {
        mesh_index,
        name: name.to_string(),
        skeleton,
        submeshes: model.submeshes,
    }))
}
