//! CLI command for LZSS-compressed archive members

use std::path::Path;
use std::time::Instant;

use crate::cli::progress::{DISK, PACKAGE, print_done, print_step};
use crate::compression;

pub fn execute(source: &Path, destination: &Path, size: usize) -> anyhow::Result<()> {
    let start = Instant::now();

    print_step(1, 2, PACKAGE, &format!("Decompressing {}...", source.display()));
    let compressed = std::fs::read(source)?;
    let data = compression::decompress(&compressed, size)?;

    print_step(2, 2, DISK, &format!("Writing {}...", destination.display()));
    std::fs::write(destination, data)?;

    print_done(start.elapsed());
    Ok(())
}
