//! GSD gimmick placement (the `@OSD` block).
//!
//! A GSD file is a resource archive whose first entry holds the placement
//! data. Offsets inside the block are relative to its start:
//!
//! ```text
//! +0x00  "@OSD", u32 version (4)
//! +0x08  u32 * 0x20   formation offsets, zero-terminated
//! formation: 0x80 bytes of other categories, u32 * 0x10 group offsets
//! group:     +4 u32 object count, +8 u32 object table offset
//! ```
//!
//! The placed models (`GMnnnn.mdl`) live next to the GSD file and are
//! fetched through a [`GimmickSource`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use glam::Vec3;
use regex::Regex;

use crate::error::{Error, Result};
use crate::formats::mdl::MdlFile;
use crate::formats::rsrc::ArchiveDirectory;
use crate::scene::{Instance, Placement, SceneBuilder};
use crate::session::ImportSession;
use crate::utils::ByteCursor;

pub const OSD_MAGIC: &[u8; 4] = b"@OSD";
pub const OSD_VERSION: u32 = 4;
const FORMATION_COUNT: usize = 0x20;
const GROUP_COUNT: usize = 0x10;
const FORMATION_SKIP: usize = 0x80;
const FALLBACK_DIRECTORY: &str = "g014.DAT";
const FALLBACK_OFFSET: u32 = 1100;

lazy_static::lazy_static! {
    static ref GROUP_DIRECTORY: Regex = Regex::new(r"(?i)g([0-9]+)\.DAT").expect("group directory pattern is valid");
}

/// Object record flag: x and z rotations follow the record.
const FLAG_FULL_ROTATION: u32 = 0x2;

/// Raw bytes of a gimmick model container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GimmickResource {
    /// Container name, used as the prefix of instance names.
    pub name: String,
    pub data: Vec<u8>,
}

/// Supplies gimmick model containers by resource id.
pub trait GimmickSource {
    /// `Ok(None)` when the resource does not exist.
    fn load(&mut self, resource_id: u16) -> Result<Option<GimmickResource>>;
}

impl<F> GimmickSource for F
where
    F: FnMut(u16) -> Result<Option<GimmickResource>>,
{
    fn load(&mut self, resource_id: u16) -> Result<Option<GimmickResource>> {
        self(resource_id)
    }
}

/// Looks up `GMnnnn.mdl` next to the GSD file, then in the shared gimmick
/// directory of the extracted disc layout.
#[derive(Debug, Clone)]
pub struct DirectoryGimmickSource {
    directory: PathBuf,
    fallback: Option<PathBuf>,
}

impl DirectoryGimmickSource {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        let directory = directory.into();
        let fallback = fallback_directory(&directory);
        Self { directory, fallback }
    }

    /// Source for the GSD file at `path`.
    pub fn for_gsd(path: &Path) -> Self {
        Self::new(path.parent().unwrap_or_else(|| Path::new(".")))
    }

    pub fn file_name(resource_id: u16) -> String {
        format!("GM{resource_id:04}.mdl")
    }

    /// Directories searched, in order.
    pub fn directories(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.directory.as_path()).chain(self.fallback.as_deref())
    }
}

/// `<dir>/../../g014.DAT/<n + 1100>` when the grandparent of the files is a
/// `gNNN.DAT` directory.
fn fallback_directory(directory: &Path) -> Option<PathBuf> {
    let group = directory.parent()?.file_name()?.to_str()?;
    let number: u32 = GROUP_DIRECTORY.captures(group)?.get(1)?.as_str().parse().ok()?;
    Some(
        directory
            .join("..")
            .join("..")
            .join(FALLBACK_DIRECTORY)
            .join((number + FALLBACK_OFFSET).to_string()),
    )
}

impl GimmickSource for DirectoryGimmickSource {
    fn load(&mut self, resource_id: u16) -> Result<Option<GimmickResource>> {
        let file_name = Self::file_name(resource_id);
        for directory in self.directories() {
            let path = directory.join(&file_name);
            if path.is_file() {
                let name = path
                    .file_stem()
                    .map_or_else(|| file_name.clone(), |s| s.to_string_lossy().into_owned());
                return Ok(Some(GimmickResource {
                    name,
                    data: std::fs::read(&path)?,
                }));
            }
        }
        Ok(None)
    }
}

/// One placed object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectRecord {
    pub position: Vec3,
    /// Radians.
    pub rotation: Vec3,
    pub resource_type: u16,
    pub resource_id: u16,
    pub flags: u32,
    pub unique_id: u32,
}

impl ObjectRecord {
    /// Read the record at the cursor; records have variable length.
    pub fn read(cursor: &mut ByteCursor) -> Result<Self> {
        let [x, y, z] = cursor.read_f32_array::<3>()?;
        let y = y + cursor.read_f32()?;
        let rotation_y = cursor.read_f32()?.to_radians();
        let resource_type = cursor.read_u16()?;
        let resource_id = cursor.read_u16()?;
        let flags = cursor.read_u32()?;
        cursor.skip(8);
        let unique_id = cursor.read_u32()?;
        let mut rotation = Vec3::new(0.0, rotation_y, 0.0);
        if flags & FLAG_FULL_ROTATION != 0 {
            rotation.x = cursor.read_f32()?.to_radians();
            rotation.z = cursor.read_f32()?.to_radians();
        }
        Ok(Self {
            position: Vec3::new(x, y, z),
            rotation,
            resource_type,
            resource_id,
            flags,
            unique_id,
        })
    }

    pub fn placement(&self) -> Placement {
        Placement {
            translation: self.position,
            rotation: self.rotation,
            scale: Vec3::ONE,
        }
    }
}

/// Decoded gimmick placement with the models it uses.
#[derive(Debug, Clone, PartialEq)]
pub struct GimmickLayout {
    pub name: String,
    /// Loaded models, in order of first use. [`Instance::resource`] indexes this.
    pub resources: Vec<MdlFile>,
    pub instances: Vec<Instance>,
    /// Resource ids no model could be found for.
    pub missing: Vec<u16>,
}

impl GimmickLayout {
    /// Decode the GSD file `data` and load every referenced model from
    /// `source`, once per resource id.
    pub fn read(
        data: &[u8],
        name: &str,
        session: &mut ImportSession,
        source: &mut dyn GimmickSource,
    ) -> Result<Self> {
        let mut cursor = ByteCursor::new(data);
        let directory = ArchiveDirectory::read(&mut cursor)?.require_non_empty()?;
        let osd = directory.entries()[0].offset;

        cursor.seek(osd);
        let magic = cursor.read_u8s(4)?;
        if magic != OSD_MAGIC {
            return Err(Error::InvalidMagic {
                offset: osd,
                expected: "@OSD",
                found: u32::from_le_bytes([magic[0], magic[1], magic[2], magic[3]]),
            });
        }
        let version = cursor.read_u32()?;
        if version != OSD_VERSION {
            return Err(Error::UnsupportedOsdVersion { offset: osd, version });
        }

        let mut records = Vec::new();
        let formations = cursor.read_u32s(FORMATION_COUNT)?;
        for formation in formations.into_iter().take_while(|&f| f != 0) {
            cursor.seek(osd + formation as usize + FORMATION_SKIP);
            let groups = cursor.read_u32s(GROUP_COUNT)?;
            for group in groups.into_iter().take_while(|&g| g != 0) {
                cursor.seek(osd + group as usize + 4);
                let count = cursor.read_u32()? as usize;
                let table = osd + cursor.read_u32()? as usize;
                cursor.seek(table);
                for _ in 0..count {
                    records.push(ObjectRecord::read(&mut cursor)?);
                }
            }
        }

        let mut layout = Self {
            name: name.to_string(),
            resources: Vec::new(),
            instances: Vec::new(),
            missing: Vec::new(),
        };
        let mut loaded: HashMap<u16, Option<usize>> = HashMap::new();
        for record in &records {
            let id = record.resource_id;
            let duplicate = loaded.contains_key(&id);
            let slot = match loaded.get(&id) {
                Some(slot) => *slot,
                None => {
                    let slot = layout.load_resource(id, session, source);
                    loaded.insert(id, slot);
                    slot
                }
            };
            let Some(resource) = slot else {
                continue;
            };
            let instance_name = format!("{}_{}", layout.resources[resource].name, record.unique_id);
            let mut instance = Instance::new(instance_name, resource, record.placement());
            instance.unique_id = Some(record.unique_id);
            instance.duplicate = duplicate;
            layout.instances.push(instance);
        }

        tracing::info!(
            "Read gimmick layout {name}: {} objects, {} models, {} missing",
            records.len(),
            layout.resources.len(),
            layout.missing.len()
        );
        Ok(layout)
    }

    fn load_resource(
        &mut self,
        id: u16,
        session: &mut ImportSession,
        source: &mut dyn GimmickSource,
    ) -> Option<usize> {
        let resource = match source.load(id) {
            Ok(Some(resource)) => resource,
            Ok(None) => {
                tracing::warn!("Gimmick resource not found: {}", DirectoryGimmickSource::file_name(id));
                self.missing.push(id);
                return None;
            }
            Err(err) => {
                session.record_failure(DirectoryGimmickSource::file_name(id), err);
                return None;
            }
        };
        match MdlFile::read(&resource.data, &resource.name, session) {
            Ok(file) => {
                self.resources.push(file);
                Some(self.resources.len() - 1)
            }
            Err(err) => {
                session.record_failure(resource.name, err);
                None
            }
        }
    }

    pub fn emit(&self, builder: &mut dyn SceneBuilder) {
        for (resource, file) in self.resources.iter().enumerate() {
            file.emit(resource, builder);
        }
        for instance in &self.instances {
            builder.instance(instance);
        }
    }
}
