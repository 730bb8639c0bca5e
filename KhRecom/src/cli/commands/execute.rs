//! Command execution implementations

use super::Commands;
use super::{decompress, list, scene, texture};

impl Commands {
    /// Execute the selected command.
    ///
    /// # Errors
    /// Returns an error if the underlying command fails.
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            Commands::List { source } => list::execute(source),
            Commands::Textures {
                source,
                destination,
                quiet,
            } => texture::execute(source, destination, *quiet),
            Commands::Model { source, import } => scene::model(source, import),
            Commands::Stage { source, import } => scene::stage(source, import),
            Commands::Gimmick { source, import } => scene::gimmick(source, import),
            Commands::Decompress {
                source,
                destination,
                size,
            } => decompress::execute(source, destination, *size),
        }
    }
}
