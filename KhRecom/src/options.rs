//! Import options shared by the container readers.

use serde::{Deserialize, Serialize};

/// Options controlling what gets imported.
///
/// None of the options change how bytes are decoded; they select which
/// units are kept and what metadata is attached to materials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Keep texture-less (shadow) models, suffixed `_shadow`.
    pub import_shadow_model: bool,
    /// Keep stage instances that belong to the skybox.
    pub import_skybox: bool,
    /// Drop stage meshes without textures and submeshes whose texture
    /// cannot be resolved (particle effect markers).
    pub ignore_placeholders: bool,
    /// Ask hosts to blend vertex colors into textured materials.
    pub use_vertex_color_materials: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            import_shadow_model: false,
            import_skybox: true,
            ignore_placeholders: true,
            use_vertex_color_materials: true,
        }
    }
}

impl ImportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_import_shadow_model(mut self, enabled: bool) -> Self {
        self.import_shadow_model = enabled;
        self
    }

    #[must_use]
    pub fn with_import_skybox(mut self, enabled: bool) -> Self {
        self.import_skybox = enabled;
        self
    }

    #[must_use]
    pub fn with_ignore_placeholders(mut self, enabled: bool) -> Self {
        self.ignore_placeholders = enabled;
        self
    }

    #[must_use]
    pub fn with_vertex_color_materials(mut self, enabled: bool) -> Self {
        self.use_vertex_color_materials = enabled;
        self
    }
}
