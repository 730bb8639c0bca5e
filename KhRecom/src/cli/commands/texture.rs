//! CLI command for texture container export

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::cli::progress::{LOOKING_GLASS, PICTURE, print_done, print_step, simple_bar};
use crate::converter::save_texture_png;
use crate::options::ImportOptions;
use crate::session::ImportSession;

/// Decode every texture in `sources` and write one PNG per texture.
pub fn execute(sources: &[PathBuf], destination: &Path, quiet: bool) -> anyhow::Result<()> {
    let start = Instant::now();
    let mut session = ImportSession::new(ImportOptions::default());

    print_step(1, 2, LOOKING_GLASS, "Decoding texture containers...");
    for source in sources {
        let data = std::fs::read(source)?;
        let label = source
            .file_name()
            .map_or_else(|| source.display().to_string(), |n| n.to_string_lossy().into_owned());
        session.load_all_textures(&label, &data)?;
    }

    std::fs::create_dir_all(destination)?;
    let result = session.finish();

    print_step(2, 2, PICTURE, &format!("Writing {} textures...", result.textures.len()));
    let pb = (!quiet).then(|| simple_bar(result.textures.len() as u64, "Exporting"));
    for texture in &result.textures {
        save_texture_png(texture, destination.join(format!("{}.png", texture.name)))?;
        if let Some(pb) = &pb {
            pb.inc(1);
        }
    }
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    if let Some(message) = result.failure_message() {
        eprintln!("{message}");
    }
    print_done(start.elapsed());
    Ok(())
}
