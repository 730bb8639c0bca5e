//! Container and asset formats.

pub mod azf;
pub mod gsd;
pub mod mdl;
pub mod rsrc;
pub mod tim2;

pub use azf::{Stage, StageMesh};
pub use gsd::{DirectoryGimmickSource, GimmickLayout, GimmickResource, GimmickSource};
pub use mdl::{MdlFile, Model, Skeleton, Submesh};
pub use rsrc::{ArchiveDirectory, ArchiveEntry};
pub use tim2::{PixelFormat, Texture, decode_tim2};
