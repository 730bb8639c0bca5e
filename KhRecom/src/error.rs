//! Error types for `khrecom`

use thiserror::Error;

/// Broad classification of decode failures.
///
/// Every [`Error`] maps onto exactly one kind; callers that only care about
/// the category (e.g. to decide whether to skip a unit) match on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Filesystem error.
    Io,
    /// Bad magic, empty or invalid directory, inconsistent offsets.
    MalformedContainer,
    /// Unknown render mode or pixel format.
    UnsupportedEncoding,
    /// Bone, texture, palette or mesh index outside valid bounds.
    OutOfRange,
    /// A read ran past the end of the buffer.
    Truncated,
    /// Failure while handing decoded data to an output format.
    Export,
}

/// The error type for `khrecom` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ==================== Buffer Errors ====================
    /// A read ran past the end of the buffer.
    #[error("unexpected end of data at offset {offset:#x}: wanted {wanted} bytes, {available} available")]
    UnexpectedEof {
        /// Absolute offset of the failed read.
        offset: usize,
        /// Number of bytes requested.
        wanted: usize,
        /// Number of bytes left in the buffer.
        available: usize,
    },

    /// A fixed-length string field did not hold ASCII text.
    #[error("invalid ASCII string at offset {offset:#x}")]
    InvalidString {
        /// Absolute offset of the string field.
        offset: usize,
    },

    // ==================== Container Errors ====================
    /// A block did not start with the expected magic tag.
    #[error("expected {expected} magic at offset {offset:#x}, found {found:#010x}")]
    InvalidMagic {
        /// Absolute offset of the magic tag.
        offset: usize,
        /// Human-readable tag name.
        expected: &'static str,
        /// The value actually read.
        found: u32,
    },

    /// A resource archive contained no entries where at least one is required.
    #[error("resource archive directory at offset {offset:#x} is empty")]
    EmptyDirectory {
        /// Absolute offset of the first directory slot.
        offset: usize,
    },

    /// A directory entry points outside the container.
    #[error("archive entry '{name}' at offset {offset:#x} spans {start:#x}..{end:#x}, past the container end {len:#x}")]
    EntryOutOfBounds {
        /// Offset of the directory slot.
        offset: usize,
        /// Entry name.
        name: String,
        /// Entry data start.
        start: usize,
        /// Entry data end.
        end: usize,
        /// Container length.
        len: usize,
    },

    /// The stage instance-header offset is zero or beyond the file.
    #[error("invalid instance sector offset {offset:#x}")]
    InvalidInstanceSector {
        /// The offset read from the stage header.
        offset: u32,
    },

    /// The OSD block version is not supported.
    #[error("unexpected OSD version {version} at offset {offset:#x}")]
    UnsupportedOsdVersion {
        /// Absolute offset of the OSD block.
        offset: usize,
        /// Version found.
        version: u32,
    },

    /// Offsets inside a container are inconsistent with each other.
    #[error("inconsistent container at offset {offset:#x}: {message}")]
    InconsistentOffsets {
        /// Absolute offset where the inconsistency was detected.
        offset: usize,
        /// Description of the problem.
        message: String,
    },

    // ==================== Encoding Errors ====================
    /// The VIF packet render mode is not one of the known layouts.
    #[error("unrecognized render mode {mode:#x} at offset {offset:#x}")]
    UnsupportedRenderMode {
        /// Absolute offset of the render mode field.
        offset: usize,
        /// The mode value.
        mode: u16,
    },

    /// The TIM2 pixel format is not an indexed format we decode.
    #[error("unhandled image pixel format {format:#x} for texture {texture}")]
    UnsupportedPixelFormat {
        /// Pixel format code.
        format: u8,
        /// Texture name.
        texture: String,
    },

    // ==================== Range Errors ====================
    /// A vertex record referenced a bone outside the skeleton.
    #[error("bad bone index {index} at offset {offset:#x} (skeleton has {bone_count} bones)")]
    BoneIndexOutOfRange {
        /// Absolute offset of the vertex record.
        offset: usize,
        /// The bone index read.
        index: i16,
        /// Number of bones available.
        bone_count: usize,
    },

    /// A bone's parent is not defined before the bone itself.
    #[error("bone {bone} '{name}' has parent index {parent}, which must be below its own index")]
    ParentIndexOutOfRange {
        /// Index of the offending bone.
        bone: usize,
        /// Bone name.
        name: String,
        /// Parent index read.
        parent: i16,
    },

    /// A pixel index points past the end of the palette.
    #[error("palette index {index} out of range for texture {texture} ({color_count} colors)")]
    PaletteIndexOutOfRange {
        /// Texture name.
        texture: String,
        /// The pixel index.
        index: usize,
        /// Palette size.
        color_count: usize,
    },

    /// A placement record references a mesh outside the mesh table.
    #[error("instance {instance} references mesh {mesh_index}, but only {mesh_count} meshes exist")]
    MeshIndexOutOfRange {
        /// Instance index within the placement table.
        instance: usize,
        /// Mesh index read.
        mesh_index: u16,
        /// Size of the mesh table.
        mesh_count: usize,
    },

    // ==================== Compression Errors ====================
    /// LZSS stream would write past the expected output size.
    #[error("LZSS output overrun at compressed offset {offset:#x} (expected {expected} bytes)")]
    LzssOverrun {
        /// Offset into the compressed input.
        offset: usize,
        /// Expected decompressed size.
        expected: usize,
    },

    // ==================== Export Errors ====================
    /// Failed to create an image buffer from texture data.
    #[error("failed to create image buffer for texture {texture}")]
    ImageBufferFailed {
        /// Texture name.
        texture: String,
    },

    /// Failed to encode PNG image.
    #[error("failed to encode PNG: {message}")]
    PngEncodeFailed {
        /// The encoding error message.
        message: String,
    },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl Error {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) => ErrorKind::Io,
            Error::UnexpectedEof { .. } => ErrorKind::Truncated,
            Error::InvalidString { .. }
            | Error::InvalidMagic { .. }
            | Error::EmptyDirectory { .. }
            | Error::EntryOutOfBounds { .. }
            | Error::InvalidInstanceSector { .. }
            | Error::UnsupportedOsdVersion { .. }
            | Error::InconsistentOffsets { .. }
            | Error::LzssOverrun { .. } => ErrorKind::MalformedContainer,
            Error::UnsupportedRenderMode { .. } | Error::UnsupportedPixelFormat { .. } => {
                ErrorKind::UnsupportedEncoding
            }
            Error::BoneIndexOutOfRange { .. }
            | Error::ParentIndexOutOfRange { .. }
            | Error::PaletteIndexOutOfRange { .. }
            | Error::MeshIndexOutOfRange { .. } => ErrorKind::OutOfRange,
            Error::ImageBufferFailed { .. } | Error::PngEncodeFailed { .. } | Error::JsonError(_) => {
                ErrorKind::Export
            }
        }
    }
}

/// A specialized Result type for `khrecom` operations.
pub type Result<T> = std::result::Result<T, Error>;
