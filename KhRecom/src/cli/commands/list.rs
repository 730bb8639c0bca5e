//! CLI command for listing resource archive contents

use std::path::Path;

use crate::formats::rsrc::{ArchiveDirectory, skip_platform_preamble};
use crate::utils::ByteCursor;

/// Format byte size for human-readable output
fn format_size(bytes: usize) -> String {
    if bytes >= 1_048_576 {
        format!("{:.1}M", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1}K", bytes as f64 / 1024.0)
    } else {
        format!("{bytes}")
    }
}

pub fn execute(source: &Path) -> anyhow::Result<()> {
    let data = std::fs::read(source)?;
    let mut cursor = ByteCursor::new(&data);
    let preamble = skip_platform_preamble(&mut cursor);
    let directory = ArchiveDirectory::read(&mut cursor)?;

    println!("{}", source.display());
    if preamble > 0 {
        println!("Platform preamble: {preamble:#x} bytes");
    }
    for entry in &directory {
        println!(
            "{:>8x}  {:>8}  {}",
            entry.offset,
            format_size(entry.size),
            entry.name
        );
    }
    println!("{} entries", directory.len());

    Ok(())
}
