use byteorder::{LittleEndian, WriteBytesExt};
use khrecom::formats::mdl::{MAX_SPLIT_RECORDS, split_record_count};
use khrecom::prelude::*;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

// ==================== Buffer builders ====================

#[derive(Clone, Copy)]
struct Rec {
    flag: i16,
    split: i16,
    weight: f32,
    position: [f32; 3],
    color: [u32; 4],
    uv: [f32; 2],
    texture: u16,
}

fn rec(flag: i16, position: [f32; 3]) -> Rec {
    Rec {
        flag,
        split: 0,
        weight: 1.0,
        position,
        color: [128, 64, 0, 128],
        uv: [0.25, 0.75],
        texture: 0,
    }
}

/// Record size, UV presence and integer colour presence for the modes used here.
fn layout(mode: u16) -> (usize, bool, bool) {
    match mode {
        0x6 => (0x30, true, false),
        0x0 => (0x40, true, true),
        _ => (0x20, false, false),
    }
}

fn packet(mode: u16, vertex_count: u16, records: &[Rec]) -> Vec<u8> {
    let (record_size, has_uv, has_color) = layout(mode);
    let size = (0x30 + records.len() * record_size).div_ceil(0x10) * 0x10;
    let mut data = Vec::new();
    data.write_u32::<LittleEndian>(0x1000_0000 | (size / 0x10 - 1) as u32).unwrap();
    data.resize(0x14, 0);
    for field in [records.len() as u16, 0, vertex_count, 0, mode] {
        data.write_u16::<LittleEndian>(field).unwrap();
    }
    data.resize(0x30, 0);
    for r in records {
        let start = data.len();
        data.write_i16::<LittleEndian>(r.flag).unwrap();
        data.write_u16::<LittleEndian>(0).unwrap();
        data.write_f32::<LittleEndian>(r.weight).unwrap();
        data.write_i16::<LittleEndian>(r.split).unwrap();
        data.resize(start + 0x10, 0);
        for c in r.position {
            data.write_f32::<LittleEndian>(c).unwrap();
        }
        data.write_u16::<LittleEndian>(0).unwrap();
        data.write_i16::<LittleEndian>(0).unwrap(); // bone
        if has_color {
            for c in r.color {
                data.write_u32::<LittleEndian>(c).unwrap();
            }
        }
        if has_uv {
            for c in r.uv {
                data.write_f32::<LittleEndian>(c).unwrap();
            }
            data.resize(start + record_size - 4, 0);
            data.write_u16::<LittleEndian>(r.texture).unwrap();
        }
        data.resize(start + record_size, 0);
    }
    data.resize(size, 0);
    data
}

fn region(packets: &[Vec<u8>]) -> Vec<u8> {
    let mut data = packets.concat();
    data.write_u32::<LittleEndian>(0x6000_0000).unwrap();
    data.resize(data.len() + 0xC, 0);
    data
}

/// A model with one identity bone named `root`.
fn model(textures: &[&str], opaque: &[u8]) -> Vec<u8> {
    let mut data = Vec::new();
    data.write_u16::<LittleEndian>(1).unwrap();
    data.write_u16::<LittleEndian>(0).unwrap();
    data.write_u32::<LittleEndian>(0x20).unwrap();
    data.write_u32::<LittleEndian>(0x34).unwrap();
    data.resize(0x20, 0);
    data.extend_from_slice(b"root");
    data.resize(0x30, 0);
    data.write_i16::<LittleEndian>(-1).unwrap();
    data.resize(0x34, 0);
    for value in glam::Mat4::IDENTITY.to_cols_array() {
        data.write_f32::<LittleEndian>(value).unwrap();
    }
    let texture_table = data.len();
    for name in textures {
        let start = data.len();
        data.extend_from_slice(name.as_bytes());
        data.resize(start + 0x20, 0);
    }
    data.resize(data.len().div_ceil(0x10) * 0x10, 0);
    let opaque_offset = data.len();
    data.extend_from_slice(opaque);

    let mut header = Vec::new();
    header.write_u32::<LittleEndian>(textures.len() as u32).unwrap();
    header.write_u32::<LittleEndian>(texture_table as u32).unwrap();
    header.write_u32::<LittleEndian>(opaque_offset as u32).unwrap();
    header.write_u32::<LittleEndian>(0).unwrap();
    data[0xC..0x1C].copy_from_slice(&header);
    data
}

/// Model container: zero-terminated offset table, then the models.
fn container(models: &[Vec<u8>]) -> Vec<u8> {
    let table_size = ((models.len() + 1) * 4).div_ceil(0x10) * 0x10;
    let mut offsets = Vec::new();
    let mut body = Vec::new();
    for m in models {
        offsets.push((table_size + body.len()) as u32);
        body.extend_from_slice(m);
        body.resize(body.len().div_ceil(0x10) * 0x10, 0);
    }
    let mut data = Vec::new();
    for offset in offsets {
        data.write_u32::<LittleEndian>(offset).unwrap();
    }
    data.resize(table_size, 0);
    data.extend_from_slice(&body);
    data
}

/// Resource archive with short-name slots and a terminator slot.
fn archive(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut offset = (entries.len() + 1) * 0x20;
    let mut data = Vec::new();
    for (name, bytes) in entries {
        let start = data.len();
        data.extend_from_slice(name.as_bytes());
        data.resize(start + 0x10, 0);
        data.write_u32::<LittleEndian>(offset as u32).unwrap();
        data.resize(start + 0x1C, 0);
        data.write_i32::<LittleEndian>(bytes.len() as i32).unwrap();
        offset += bytes.len().div_ceil(0x10) * 0x10;
    }
    data.resize(data.len() + 0x20, 0);
    for (_, bytes) in entries {
        data.extend_from_slice(bytes);
        data.resize(data.len().div_ceil(0x10) * 0x10, 0);
    }
    data
}

fn tim2_4bit(image: &[u8], palette: &[u32]) -> Vec<u8> {
    let mut data = b"TIM2".to_vec();
    data.write_u16::<LittleEndian>(4).unwrap();
    data.write_u16::<LittleEndian>(1).unwrap();
    data.resize(0x18, 0);
    data.write_u32::<LittleEndian>(image.len() as u32).unwrap();
    data.write_u16::<LittleEndian>(0x30).unwrap();
    data.write_u16::<LittleEndian>(palette.len() as u16).unwrap();
    data.extend_from_slice(&[0, 1, 0, 0x4]);
    data.write_u16::<LittleEndian>(2).unwrap();
    data.write_u16::<LittleEndian>(2).unwrap();
    data.resize(0x40, 0);
    data.extend_from_slice(image);
    for &color in palette {
        data.write_u32::<LittleEndian>(color).unwrap();
    }
    data
}

const RED: u32 = 0x80_00_00_FF;
const BLUE: u32 = 0x80_FF_00_00;

fn textured_model(texture: &str) -> Vec<u8> {
    model(&[texture], &region(&[packet(0x0, 1, &[rec(0, [1.0, 2.0, 3.0])])]))
}

// ==================== Models and textures ====================

#[test]
fn test_model_with_texture_end_to_end() {
    let mut session = ImportSession::new(ImportOptions::default());
    let file = MdlFile::read(&container(&[textured_model("tex")]), "pc", &mut session).unwrap();

    let submesh = &file.models[0].submeshes[0];
    assert_eq!(submesh.name, "pc_0_mat0");
    assert_eq!(submesh.texture_name.as_deref(), Some("tex"));
    assert_eq!(submesh.positions, vec![[1.0, 2.0, 3.0]]);
    assert_eq!(submesh.colors, vec![[0.5, 0.25, 0.0, 1.0]]);
    assert_eq!(submesh.uvs, vec![[0.25, 0.25]]);
    assert!(session.is_requested("tex"));

    // Later re-releases prefix texture containers with a bare preamble.
    let textures = archive(&[("tex.tm2", tim2_4bit(&[0x10, 0x11], &[RED, BLUE])), ("unused.tm2", vec![0; 4])]);
    let mut rtm = Vec::new();
    rtm.write_u32::<LittleEndian>(textures.len() as u32).unwrap();
    rtm.resize(0x10, 0);
    rtm.extend_from_slice(&textures);
    assert_eq!(session.load_texture_container("pc.rtm", &rtm).unwrap(), 1);

    let result = session.finish();
    assert!(result.is_complete());
    let texture = &result.textures[0];
    assert_eq!((texture.name.as_str(), texture.width, texture.height), ("tex", 2, 2));
    assert_eq!(texture.pixel(0, 1), Some([1.0, 0.0, 0.0, 1.0]));
    let image = converter::texture_to_rgba8(texture).unwrap();
    assert_eq!(image.get_pixel(0, 0).0, [255, 0, 0, 255]);

    assert_eq!(
        result.materials,
        vec![Material {
            name: "tex".to_string(),
            uses_vertex_color: true,
            blend_vertex_color: true,
        }]
    );

    let mut summary = SceneSummary::new();
    file.emit(0, &mut summary);
    result.emit(&mut summary);
    assert_eq!(summary.skeletons[0].bones[0].name, "root");
    assert_eq!(summary.submeshes[0].weighted_bones, vec!["root"]);
    assert_eq!(summary.textures[0].name, "tex");
    assert!(summary.to_json().unwrap().contains("pc_0_mat0"));
}

#[test]
fn test_bad_texture_is_a_unit_failure() {
    let mut session = ImportSession::new(ImportOptions::default());
    session.request_material("broken", false);
    let mut bad = tim2_4bit(&[0x10, 0x11], &[RED, BLUE]);
    bad[0x23] = 0x3; // 16-bit direct colour
    let count = session.load_texture_container("w.rtm", &archive(&[("broken.tm2", bad)])).unwrap();

    assert_eq!(count, 0);
    let result = session.finish();
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].unit, "w.rtm/broken");
    assert_eq!(result.failures[0].error.kind(), ErrorKind::UnsupportedEncoding);
    let message = result.failure_message().unwrap();
    assert!(message.starts_with("1 unit(s) failed to import:"));
}

#[test]
fn test_shadow_model_is_optional() {
    let shadow = model(&[], &region(&[packet(0x10, 1, &[rec(0, [0.0; 3])])]));
    let data = container(&[textured_model("tex"), shadow]);

    let mut session = ImportSession::new(ImportOptions::default());
    let file = MdlFile::read(&data, "pc", &mut session).unwrap();
    assert_eq!(file.models.len(), 1);

    let mut session = ImportSession::new(ImportOptions::default().with_import_shadow_model(true));
    let file = MdlFile::read(&data, "pc", &mut session).unwrap();
    let names: Vec<_> = file.models.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["pc_0", "pc_1_shadow"]);
    assert!(file.models[1].shadow);
}

#[test]
fn test_strip_winding() {
    let records = [
        rec(0x10, [0.0, 0.0, 0.0]),
        rec(0x10, [1.0, 0.0, 0.0]),
        rec(0x00, [0.0, 1.0, 0.0]),
        rec(0x20, [1.0, 1.0, 0.0]),
        rec(0x10, [2.0, 1.0, 0.0]),
    ];
    let data = container(&[model(&["tex"], &region(&[packet(0x10, 5, &records)]))]);
    let mut session = ImportSession::new(ImportOptions::default());
    let file = MdlFile::read(&data, "pc", &mut session).unwrap();

    let submesh = &file.models[0].submeshes[0];
    assert_eq!(submesh.vertex_count(), 5);
    assert_eq!(submesh.triangles, vec![[2, 1, 0], [1, 2, 3]]);
    assert!(!submesh.has_uvs());
    assert_eq!(submesh.texture_name, None);
}

#[test]
fn test_unknown_render_modes_are_rejected() {
    for mode in [0x400C, 0x11] {
        let data = container(&[model(&["tex"], &region(&[packet(mode, 1, &[rec(0, [0.0; 3])])]))]);
        let mut session = ImportSession::new(ImportOptions::default());
        let file = MdlFile::read(&data, "pc", &mut session).unwrap();

        assert!(file.models.is_empty());
        let failure = &session.failures()[0];
        assert_eq!(failure.unit, "pc_0");
        assert_eq!(failure.error.kind(), ErrorKind::UnsupportedEncoding);
        assert!(matches!(failure.error, Error::UnsupportedRenderMode { mode: m, .. } if m == mode));
    }
}

#[test]
fn test_split_vertex_blends_and_stays_in_table() {
    let mut first = rec(0, [2.0, 0.0, 0.0]);
    first.split = 1;
    first.weight = 0.5;
    let mut second = rec(0, [0.0, 2.0, 0.0]);
    second.split = 2;
    second.weight = 0.5;
    let data = container(&[model(&["tex"], &region(&[packet(0x10, 1, &[first, second])]))]);
    let mut session = ImportSession::new(ImportOptions::default());
    let file = MdlFile::read(&data, "pc", &mut session).unwrap();

    let submesh = &file.models[0].submeshes[0];
    assert_eq!(submesh.positions, vec![[2.0, 2.0, 0.0]]);
    assert_eq!(submesh.bone_weights[0].weights, vec![(0, 0.5), (0, 0.5)]);

    // Increasing split indices past the vertex table are not consumed.
    let records: Vec<_> = (1..=3)
        .map(|i| {
            let mut r = rec(0, [0.0; 3]);
            r.split = i;
            r
        })
        .collect();
    let bytes = packet(0x10, 1, &records);
    let mut cursor = ByteCursor::new(&bytes);
    assert_eq!(split_record_count(&mut cursor, 0x30, 0x20, 2).unwrap(), 2);
    assert_eq!(split_record_count(&mut cursor, 0x30, 0x20, 3).unwrap(), 3);

    let records: Vec<_> = (1..=10)
        .map(|i| {
            let mut r = rec(0, [0.0; 3]);
            r.split = i;
            r
        })
        .collect();
    let bytes = packet(0x10, 1, &records);
    let mut cursor = ByteCursor::new(&bytes);
    assert_eq!(split_record_count(&mut cursor, 0x30, 0x20, 10).unwrap(), MAX_SPLIT_RECORDS);
}

// ==================== Stages ====================

fn stage(meshes: &[Vec<u8>], skybox_count: u16, instances: &[(u16, [i16; 3], [f32; 3])]) -> Vec<u8> {
    let header_offset = 4 + meshes.len() * 4;
    let mut data = Vec::new();
    data.write_u32::<LittleEndian>(header_offset as u32).unwrap();
    let mut offset = (header_offset + 8 + instances.len() * 0x40).div_ceil(0x10) * 0x10;
    for mesh in meshes {
        data.write_u32::<LittleEndian>(offset as u32).unwrap();
        offset += mesh.len().div_ceil(0x10) * 0x10;
    }
    data.write_u16::<LittleEndian>(instances.len() as u16).unwrap();
    data.write_u16::<LittleEndian>(skybox_count).unwrap();
    data.write_u32::<LittleEndian>(8).unwrap();
    for (mesh, rotation, position) in instances {
        let start = data.len();
        data.write_u16::<LittleEndian>(*mesh).unwrap();
        data.resize(start + 8, 0);
        for r in rotation {
            data.write_i16::<LittleEndian>(*r).unwrap();
        }
        data.resize(start + 0x10, 0);
        for c in position.iter().chain(&[1.0, 1.0, 1.0, 1.0, 1.0]) {
            data.write_f32::<LittleEndian>(*c).unwrap();
        }
        data.resize(start + 0x40, 0);
    }
    for mesh in meshes {
        data.resize(data.len().div_ceil(0x10) * 0x10, 0);
        data.extend_from_slice(mesh);
    }
    data
}

#[test]
fn test_stage_instances_share_meshes() {
    let floor = model(&["wo_floor"], &region(&[packet(0x6, 1, &[rec(0, [1.0, 0.0, 0.0])])]));
    let data = stage(&[floor], 1, &[(0, [0; 3], [0.0; 3]), (0, [0, 900, 0], [5.0, 0.0, 0.0]), (3, [0; 3], [0.0; 3])]);

    let mut session = ImportSession::new(ImportOptions::default());
    let stage_file = Stage::read(&data, "st", &mut session).unwrap();
    assert_eq!(stage_file.meshes.len(), 1);
    let names: Vec<_> = stage_file.instances.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["st-sky_i0_m0", "st_i0_m0"]);
    assert!(stage_file.instances[0].skybox);
    assert!(stage_file.instances[1].duplicate);
    let rotation = stage_file.instances[1].placement.rotation;
    assert!((rotation.y - std::f32::consts::FRAC_PI_2).abs() < 1e-6);

    // The third instance points past the mesh table.
    assert_eq!(session.failures().len(), 1);
    assert_eq!(session.failures()[0].error.kind(), ErrorKind::OutOfRange);
    assert!(session.is_requested("wo_floor"));

    let mut session = ImportSession::new(ImportOptions::default().with_import_skybox(false));
    let stage_file = Stage::read(&data, "st", &mut session).unwrap();
    let names: Vec<_> = stage_file.instances.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["st_i0_m0"]);
    assert!(!stage_file.instances[0].duplicate);
}

#[test]
fn test_stage_rejects_bad_instance_sector() {
    let mut session = ImportSession::new(ImportOptions::default());
    let err = Stage::read(&[0xFF, 0, 0, 0, 0, 0, 0, 0], "st", &mut session).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedContainer);
}

// ==================== Gimmicks ====================

fn object(resource_id: u16, unique_id: u32) -> Vec<u8> {
    let mut data = Vec::new();
    for c in [1.0, 2.0, 3.0, 0.5, 180.0] {
        data.write_f32::<LittleEndian>(c).unwrap();
    }
    data.write_u16::<LittleEndian>(1).unwrap();
    data.write_u16::<LittleEndian>(resource_id).unwrap();
    data.write_u32::<LittleEndian>(0).unwrap();
    data.extend_from_slice(&[0; 8]);
    data.write_u32::<LittleEndian>(unique_id).unwrap();
    data
}

fn gsd(objects: &[Vec<u8>]) -> Vec<u8> {
    let mut osd = b"@OSD".to_vec();
    osd.write_u32::<LittleEndian>(4).unwrap();
    osd.write_u32::<LittleEndian>(0x100).unwrap();
    osd.resize(0x180, 0);
    osd.write_u32::<LittleEndian>(0x200).unwrap();
    osd.resize(0x204, 0);
    osd.write_u32::<LittleEndian>(objects.len() as u32).unwrap();
    osd.write_u32::<LittleEndian>(0x220).unwrap();
    osd.resize(0x220, 0);
    for o in objects {
        osd.extend_from_slice(o);
    }
    archive(&[("layout.osd", osd)])
}

#[test]
fn test_gimmick_layout_from_directory() {
    let dir = tempdir().unwrap();
    let gimmick = container(&[model(&["gm_tex"], &region(&[packet(0x10, 1, &[rec(0, [0.0; 3])])]))]);
    std::fs::write(dir.path().join("GM0012.mdl"), gimmick).unwrap();
    let gsd_path = dir.path().join("layout.gsd");
    let data = gsd(&[object(12, 100), object(7, 101), object(12, 102)]);
    std::fs::write(&gsd_path, &data).unwrap();

    let mut source = DirectoryGimmickSource::for_gsd(&gsd_path);
    let mut session = ImportSession::new(ImportOptions::default());
    let layout = GimmickLayout::read(&std::fs::read(&gsd_path).unwrap(), "layout", &mut session, &mut source).unwrap();

    assert_eq!(layout.resources.len(), 1);
    assert_eq!(layout.missing, vec![7]);
    let names: Vec<_> = layout.instances.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["GM0012_100", "GM0012_102"]);
    assert_eq!(layout.instances[0].unique_id, Some(100));
    assert!(layout.instances[1].duplicate);
    let placement = layout.instances[0].placement;
    assert_eq!(placement.translation.to_array(), [1.0, 2.5, 3.0]);
    assert!((placement.rotation.y - std::f32::consts::PI).abs() < 1e-6);

    let mut summary = SceneSummary::new();
    layout.emit(&mut summary);
    assert_eq!(summary.instances.len(), 2);
    assert_eq!(summary.resource_submeshes(0).count(), 1);
}

#[test]
fn test_gimmick_version_mismatch() {
    let mut data = gsd(&[]);
    data[0x44] = 5;
    let mut session = ImportSession::new(ImportOptions::default());
    let mut source = |_id: u16| -> khrecom::Result<Option<GimmickResource>> { Ok(None) };
    let err = GimmickLayout::read(&data, "layout", &mut session, &mut source).unwrap_err();
    assert!(matches!(err, Error::UnsupportedOsdVersion { version: 5, .. }));
}

// ==================== Compression ====================

#[test]
fn test_lzss_member() {
    // 'A', 'B', copy 2 from dictionary position 1, end of block
    let compressed = [0xA0, 0xD0, 0x80, 0x20, 0x00];
    assert_eq!(khrecom::compression::decompress(&compressed, 6).unwrap(), b"ABAB\0\0");
    assert!(khrecom::compression::decompress(&compressed, 3).is_err());
}
