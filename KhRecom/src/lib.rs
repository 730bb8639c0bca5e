//! # KhRecom
//!
//! A pure-Rust library for the PS2 asset formats of Kingdom Hearts
//! Re:Chain of Memories.
//!
//! ## Supported Formats
//!
//! - **RSRC archives** - Packed resource directories, with the optional
//!   preamble of later re-releases
//! - **TIM2** - 4-bit and 8-bit indexed textures
//! - **MDL** - Skinned models (bone tables and VIF vertex streams)
//! - **AZF** - Stage geometry and its instance table
//! - **GSD** - Gimmick placement
//! - **LZSS** - Compressed disc archive members
//!
//! ## Quick Start
//!
//! ```no_run
//! use khrecom::prelude::*;
//!
//! let mut session = ImportSession::new(ImportOptions::default());
//! let model = MdlFile::read(&std::fs::read("pc_sora.mdl")?, "pc_sora", &mut session)?;
//! session.load_texture_container("pc_sora.rtm", &std::fs::read("pc_sora.rtm")?)?;
//!
//! let mut summary = SceneSummary::new();
//! model.emit(0, &mut summary);
//! let result = session.finish();
//! result.emit(&mut summary);
//! if let Some(message) = result.failure_message() {
//!     eprintln!("{message}");
//! }
//! # Ok::<(), khrecom::Error>(())
//! ```
//!
//! Decoding never builds scene objects. Hosts implement
//! [`scene::SceneBuilder`] and receive plain buffers.
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `khrecom` command-line binary

pub mod compression;
pub mod converter;
pub mod error;
pub mod formats;
pub mod options;
pub mod scene;
pub mod session;
pub mod utils;

// Re-exports for convenience
pub use error::{Error, ErrorKind, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::formats::azf::{Stage, StageMesh};
    pub use crate::formats::gsd::{DirectoryGimmickSource, GimmickLayout, GimmickResource, GimmickSource};
    pub use crate::formats::mdl::{Bone, BoneWeights, MdlFile, Model, Skeleton, SkeletonKind, Submesh};
    pub use crate::formats::rsrc::{ArchiveDirectory, ArchiveEntry, skip_platform_preamble};
    pub use crate::formats::tim2::{PixelFormat, Texture, decode_tim2};
    pub use crate::options::ImportOptions;
    pub use crate::scene::{Instance, Placement, SceneBuilder, SceneSummary};
    pub use crate::session::{ImportResult, ImportSession, Material, UnitFailure};
    pub use crate::utils::ByteCursor;

    pub use crate::converter;
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
