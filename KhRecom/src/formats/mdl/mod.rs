//! MDL model containers.
//!
//! A container starts (after the optional platform preamble) with a
//! zero-terminated table of up to 0x100 model offsets. Each model carries
//! its own header, bone table, texture table and VIF regions; all models of
//! a container share the first non-empty skeleton found.

mod model;
mod skeleton;
mod types;
mod vif;

pub use model::{ModelHeader, decode_model};
pub use skeleton::{BONE_TAIL, Bone, Skeleton, SkeletonKind, root_alignment};
pub use types::{BoneWeights, Model, Submesh};
pub use vif::{ColorEncoding, MAX_SPLIT_RECORDS, REFLECTIVE_MODE, RETURN_TAG, RenderMode, VifDecoder, split_record_count};

#[cfg(test)]
pub(crate) use model::tests::model_block;
#[cfg(test)]
pub(crate) use vif::tests::{packet, rec, region};

use crate::error::Result;
use crate::formats::rsrc::skip_platform_preamble;
use crate::scene::SceneBuilder;
use crate::session::ImportSession;
use crate::utils::ByteCursor;

/// Maximum number of model offsets in a container.
pub const MAX_MODELS: usize = 0x100;

/// A decoded model container.
#[derive(Debug, Clone, PartialEq)]
pub struct MdlFile {
    pub name: String,
    /// Shared renderable skeleton, if any model had bones.
    pub skeleton: Option<Skeleton>,
    pub models: Vec<Model>,
}

impl MdlFile {
    /// Decode a model container named `name` (usually the file stem).
    ///
    /// A model that fails to decode is recorded in `session` and skipped;
    /// the offset table itself must be readable. Shadow models are skipped
    /// unless the session options ask for them.
    pub fn read(data: &[u8], name: &str, session: &mut ImportSession) -> Result<Self> {
        let mut cursor = ByteCursor::new(data);
        skip_platform_preamble(&mut cursor);

        let mut offsets = Vec::new();
        for _ in 0..MAX_MODELS {
            let offset = cursor.read_u32()? as usize;
            if offset == 0 {
                break;
            }
            offsets.push(offset);
        }

        let mut file = Self {
            name: name.to_string(),
            skeleton: None,
            models: Vec::new(),
        };
        for (i, offset) in offsets.into_iter().enumerate() {
            let mut model_name = format!("{name}_{i}");
            let header = match ModelHeader::read(&mut cursor, offset) {
                Ok(header) => header,
                Err(err) => {
                    session.record_failure(model_name, err);
                    continue;
                }
            };
            if header.is_shadow() {
                if !session.options().import_shadow_model {
                    tracing::debug!("Skipping shadow model {model_name}");
                    continue;
                }
                model_name.push_str("_shadow");
            }

            match read_model(&mut cursor, offset, &header, &model_name, file.skeleton.as_ref()) {
                Ok((model, skeleton)) => {
                    if file.skeleton.is_none() {
                        file.skeleton = skeleton;
                    }
                    session.register_materials(&model.submeshes);
                    file.models.push(model);
                }
                Err(err) => session.record_failure(model_name, err),
            }
        }

        tracing::info!(
            "Read {} models from {name} ({} bones)",
            file.models.len(),
            file.skeleton.as_ref().map_or(0, Skeleton::len)
        );
        Ok(file)
    }

    pub fn submeshes(&self) -> impl Iterator<Item = &Submesh> {
        self.models.iter().flat_map(|m| m.submeshes.iter())
    }

    /// Hand the skeleton and every submesh to `builder` as resource `resource`.
    pub fn emit(&self, resource: usize, builder: &mut dyn SceneBuilder) {
        if let Some(skeleton) = &self.skeleton {
            builder.skeleton(resource, skeleton);
        }
        for submesh in self.submeshes() {
            builder.submesh(resource, submesh, self.skeleton.as_ref());
        }
    }
}

/// Decode one model, parsing its own skeleton when none is shared yet.
///
/// Returns the newly parsed skeleton if it has bones.
fn read_model(
    cursor: &mut ByteCursor,
    offset: usize,
    header: &ModelHeader,
    name: &str,
    shared: Option<&Skeleton>,
) -> Result<(Model, Option<Skeleton>)> {
    let mut own = None;
    let skeleton = match shared {
        Some(skeleton) => skeleton,
        None => &*own.insert(Skeleton::read(
            cursor,
            offset,
            format!("{name}_Armature"),
            SkeletonKind::Renderable,
        )?),
    };
    let model = decode_model(cursor, offset, header, name, skeleton)?;
    Ok((model, own.filter(|s| !s.is_empty())))
}
