use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::options::ImportOptions;

pub mod decompress;
pub mod execute;
pub mod list;
pub mod scene;
pub mod texture;

/// Import flags shared by the model, stage and gimmick commands.
#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    /// Texture containers (.rtm/.vtm). Discovered next to the input when omitted
    #[arg(short, long, num_args = 1..)]
    pub textures: Vec<PathBuf>,

    /// Write the scene summary as JSON to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Import shadow models
    #[arg(long)]
    pub shadow: bool,

    /// Skip skybox instances of a stage
    #[arg(long)]
    pub no_skybox: bool,

    /// Keep stage meshes that have UVs but no resolvable texture
    #[arg(long)]
    pub keep_placeholders: bool,

    /// Do not blend vertex colours into materials
    #[arg(long)]
    pub no_vertex_color: bool,
}

impl ImportArgs {
    pub fn options(&self) -> ImportOptions {
        ImportOptions::default()
            .with_import_shadow_model(self.shadow)
            .with_import_skybox(!self.no_skybox)
            .with_ignore_placeholders(!self.keep_placeholders)
            .with_vertex_color_materials(!self.no_vertex_color)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the entries of a resource archive
    List {
        /// Source archive (.rtm, .vtm, .mdl, .gsd, ...)
        #[arg(short, long)]
        source: PathBuf,
    },

    /// Decode every texture of one or more texture containers to PNG
    Textures {
        /// Texture containers (.rtm/.vtm)
        #[arg(short, long, num_args = 1..)]
        source: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        destination: PathBuf,

        /// Suppress progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// Decode a model container (.mdl)
    Model {
        /// Source model container
        #[arg(short, long)]
        source: PathBuf,

        #[command(flatten)]
        import: ImportArgs,
    },

    /// Decode a stage container (.azf)
    Stage {
        /// Source stage container
        #[arg(short, long)]
        source: PathBuf,

        #[command(flatten)]
        import: ImportArgs,
    },

    /// Decode a gimmick placement file (.gsd) and the models it places
    Gimmick {
        /// Source placement file
        #[arg(short, long)]
        source: PathBuf,

        #[command(flatten)]
        import: ImportArgs,
    },

    /// Decompress an LZSS-compressed archive member
    Decompress {
        /// Compressed input file
        #[arg(short, long)]
        source: PathBuf,

        /// Output file
        #[arg(short, long)]
        destination: PathBuf,

        /// Decompressed size in bytes
        #[arg(long)]
        size: usize,
    },
}
