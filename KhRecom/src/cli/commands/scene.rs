//! CLI commands that decode model, stage and gimmick containers into a
//! JSON scene summary.

use std::path::{Path, PathBuf};
use std::time::Instant;

use walkdir::WalkDir;

use super::ImportArgs;
use crate::cli::progress::{CUBE, DISK, PICTURE, print_done, print_step};
use crate::formats::azf::Stage;
use crate::formats::gsd::{DirectoryGimmickSource, GimmickLayout};
use crate::formats::mdl::MdlFile;
use crate::scene::SceneSummary;
use crate::session::ImportSession;

const TEXTURE_EXTENSIONS: [&str; 2] = ["rtm", "vtm"];
const WORLD_TEXTURE_PREFIX: &str = "wo";
const GIMMICK_TEXTURE_PREFIX: &str = "gm";

pub fn model(source: &Path, args: &ImportArgs) -> anyhow::Result<()> {
    let start = Instant::now();
    let name = file_stem(source);
    let mut session = ImportSession::new(args.options());

    print_step(1, 3, CUBE, &format!("Decoding {}...", source.display()));
    let model = MdlFile::read(&std::fs::read(source)?, &name, &mut session)?;

    let lower = name.to_ascii_lowercase();
    let textures = texture_containers(args, &[parent_directory(source)], |stem| {
        stem == lower || stem.starts_with(WORLD_TEXTURE_PREFIX)
    });
    load_textures(&mut session, &textures)?;

    let mut summary = SceneSummary::new();
    model.emit(0, &mut summary);
    finish(session, summary, args, start)
}

pub fn stage(source: &Path, args: &ImportArgs) -> anyhow::Result<()> {
    let start = Instant::now();
    let name = file_stem(source);
    let mut session = ImportSession::new(args.options());

    print_step(1, 3, CUBE, &format!("Decoding {}...", source.display()));
    let stage = Stage::read(&std::fs::read(source)?, &name, &mut session)?;

    let lower = name.to_ascii_lowercase();
    let textures = texture_containers(args, &[parent_directory(source)], |stem| {
        stem == lower || stem.starts_with(WORLD_TEXTURE_PREFIX)
    });
    load_textures(&mut session, &textures)?;

    let mut summary = SceneSummary::new();
    stage.emit(&mut summary);
    finish(session, summary, args, start)
}

pub fn gimmick(source: &Path, args: &ImportArgs) -> anyhow::Result<()> {
    let start = Instant::now();
    let name = file_stem(source);
    let mut session = ImportSession::new(args.options());
    let mut gimmicks = DirectoryGimmickSource::for_gsd(source);
    let directories: Vec<PathBuf> = gimmicks.directories().map(Path::to_path_buf).collect();

    print_step(1, 3, CUBE, &format!("Decoding {}...", source.display()));
    let layout = GimmickLayout::read(&std::fs::read(source)?, &name, &mut session, &mut gimmicks)?;
    for id in &layout.missing {
        eprintln!("Missing gimmick model {}", DirectoryGimmickSource::file_name(*id));
    }

    let textures = texture_containers(args, &directories, |stem| {
        stem.starts_with(GIMMICK_TEXTURE_PREFIX) || stem.starts_with(WORLD_TEXTURE_PREFIX)
    });
    load_textures(&mut session, &textures)?;

    let mut summary = SceneSummary::new();
    layout.emit(&mut summary);
    finish(session, summary, args, start)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map_or_else(String::new, |s| s.to_string_lossy().into_owned())
}

fn parent_directory(path: &Path) -> PathBuf {
    path.parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Explicit `--textures`, or the containers in `directories` whose
/// lowercase stem passes `accept`.
fn texture_containers(
    args: &ImportArgs,
    directories: &[PathBuf],
    accept: impl Fn(&str) -> bool,
) -> Vec<PathBuf> {
    if !args.textures.is_empty() {
        return args.textures.clone();
    }

    let mut found = Vec::new();
    for directory in directories {
        for entry in WalkDir::new(directory)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
        {
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            let is_texture = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| TEXTURE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
            if is_texture && accept(&file_stem(path).to_ascii_lowercase()) {
                found.push(path.to_path_buf());
            }
        }
    }
    tracing::debug!("Discovered {} texture containers", found.len());
    found
}

fn load_textures(session: &mut ImportSession, containers: &[PathBuf]) -> anyhow::Result<()> {
    print_step(2, 3, PICTURE, &format!("Loading {} texture containers...", containers.len()));
    for path in containers {
        let label = path.display().to_string();
        let data = std::fs::read(path)?;
        if let Err(err) = session.load_texture_container(&label, &data) {
            session.record_failure(label, err);
        }
    }
    Ok(())
}

fn finish(
    session: ImportSession,
    mut summary: SceneSummary,
    args: &ImportArgs,
    start: Instant,
) -> anyhow::Result<()> {
    let result = session.finish();
    result.emit(&mut summary);
    let json = summary.to_json()?;

    match &args.output {
        Some(path) => {
            print_step(3, 3, DISK, &format!("Writing {}...", path.display()));
            std::fs::write(path, json)?;
        }
        None => println!("{json}"),
    }

    if let Some(message) = result.failure_message() {
        eprintln!("{message}");
    }
    print_done(start.elapsed());
    Ok(())
}
