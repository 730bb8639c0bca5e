//! Per-import state: requested materials, decoded textures and failures.
//!
//! Model readers register a material for every texture their submeshes
//! reference. Texture containers fed to the session afterwards only decode
//! the entries that were requested, and each texture at most once.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::formats::mdl::Submesh;
use crate::formats::rsrc::{ArchiveDirectory, skip_platform_preamble};
use crate::formats::tim2::{Texture, decode_tim2};
use crate::options::ImportOptions;
use crate::scene::SceneBuilder;
use crate::utils::ByteCursor;

/// A material named after the texture it shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Material {
    pub name: String,
    /// The submesh that first requested this material has vertex colors.
    pub uses_vertex_color: bool,
    /// Hosts should multiply vertex colors into the base color.
    pub blend_vertex_color: bool,
}

/// A unit (model, mesh, instance, texture) that failed to import.
#[derive(Debug)]
pub struct UnitFailure {
    pub unit: String,
    pub error: Error,
}

impl fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.unit, self.error)
    }
}

#[derive(Debug)]
pub struct ImportSession {
    options: ImportOptions,
    materials: IndexMap<String, Material>,
    textures: IndexMap<String, Texture>,
    failures: Vec<UnitFailure>,
}

impl ImportSession {
    pub fn new(options: ImportOptions) -> Self {
        Self {
            options,
            materials: IndexMap::new(),
            textures: IndexMap::new(),
            failures: Vec::new(),
        }
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Register the material for `texture_name`. The first request wins.
    pub fn request_material(&mut self, texture_name: &str, uses_vertex_color: bool) -> &Material {
        let blend = uses_vertex_color && self.options.use_vertex_color_materials;
        self.materials
            .entry(texture_name.to_string())
            .or_insert_with(|| Material {
                name: texture_name.to_string(),
                uses_vertex_color,
                blend_vertex_color: blend,
            })
    }

    /// Register materials for every submesh with a resolved texture.
    pub fn register_materials(&mut self, submeshes: &[Submesh]) {
        for submesh in submeshes {
            if let Some(texture) = &submesh.texture_name {
                self.request_material(texture, submesh.has_colors());
            }
        }
    }

    pub fn is_requested(&self, texture_name: &str) -> bool {
        self.materials.contains_key(texture_name)
    }

    pub fn material(&self, name: &str) -> Option<&Material> {
        self.materials.get(name)
    }

    pub fn texture(&self, name: &str) -> Option<&Texture> {
        self.textures.get(name)
    }

    pub fn textures(&self) -> impl Iterator<Item = &Texture> {
        self.textures.values()
    }

    /// Decode the requested textures of one texture container.
    ///
    /// Entries nobody asked for are skipped, as are textures decoded from an
    /// earlier container. A texture that fails to decode is recorded as a
    /// failure of unit `<label>/<texture>`. Returns the number of textures
    /// newly decoded.
    pub fn load_texture_container(&mut self, label: &str, data: &[u8]) -> Result<usize> {
        let mut cursor = ByteCursor::new(data);
        skip_platform_preamble(&mut cursor);
        let directory = ArchiveDirectory::read(&mut cursor)?;

        let mut decoded = 0;
        for entry in &directory {
            let name = entry.logical_name();
            if !self.is_requested(name) {
                tracing::debug!("Texture is unused: {name}");
                continue;
            }
            if self.textures.contains_key(name) {
                continue;
            }
            match decode_tim2(&mut cursor, entry.offset, name) {
                Ok(texture) => {
                    self.textures.insert(name.to_string(), texture);
                    decoded += 1;
                }
                Err(err) => self.record_failure(format!("{label}/{name}"), err),
            }
        }

        tracing::info!("Loaded {decoded} textures from {label}");
        Ok(decoded)
    }

    /// Decode every texture of a container, requested or not.
    pub fn load_all_textures(&mut self, label: &str, data: &[u8]) -> Result<usize> {
        let mut cursor = ByteCursor::new(data);
        skip_platform_preamble(&mut cursor);
        for entry in &ArchiveDirectory::read(&mut cursor)? {
            self.request_material(entry.logical_name(), false);
        }
        self.load_texture_container(label, data)
    }

    pub fn record_failure(&mut self, unit: impl Into<String>, error: Error) {
        let unit = unit.into();
        tracing::warn!("Failed to import {unit}: {error}");
        self.failures.push(UnitFailure { unit, error });
    }

    pub fn failures(&self) -> &[UnitFailure] {
        &self.failures
    }

    pub fn finish(self) -> ImportResult {
        let missing = self
            .materials
            .keys()
            .filter(|name| !self.textures.contains_key(*name))
            .count();
        if missing > 0 {
            tracing::debug!("{missing} requested textures were never found");
        }
        ImportResult {
            materials: self.materials.into_values().collect(),
            textures: self.textures.into_values().collect(),
            failures: self.failures,
        }
    }
}

/// Everything an import produced besides the container data itself.
#[derive(Debug)]
pub struct ImportResult {
    pub materials: Vec<Material>,
    pub textures: Vec<Texture>,
    pub failures: Vec<UnitFailure>,
}

impl ImportResult {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// One message listing every failed unit, or `None` if nothing failed.
    pub fn failure_message(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        let mut message = format!("{} unit(s) failed to import:", self.failures.len());
        for failure in &self.failures {
            message.push_str("\n  ");
            message.push_str(&failure.to_string());
        }
        Some(message)
    }

    pub fn emit(&self, builder: &mut dyn SceneBuilder) {
        for texture in &self.textures {
            builder.texture(texture);
        }
        for material in &self.materials {
            builder.material(material);
        }
        for failure in &self.failures {
            builder.failure(failure);
        }
    }
}
