use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "anchorcast",
    about = "Generate short news-anchor videos from a topic hint: script, portrait, voice, talking head, mix",
    version,
    after_help = "\x1b[1mExamples:\x1b[0m
  anchorcast run                                  Run with the default topic
  anchorcast run --topic \"robots run the DMV\"     Run with a custom topic hint
  anchorcast run --anchor-image me.png            Reuse an existing portrait
  anchorcast build-tags                           Synthesize the spoken station tags
  anchorcast models                               List available video models"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Produce one video and print its manifest as JSON
    Run {
        /// Topic hint for the script
        #[arg(long, short = 't')]
        topic: Option<String>,

        /// Output directory (overrides OUT_DIR)
        #[arg(long, short = 'o')]
        out_dir: Option<PathBuf>,

        /// Audio pack directory (overrides AUDIO_PACK_DIR)
        #[arg(long)]
        pack_dir: Option<PathBuf>,

        /// Existing portrait to use instead of generating one
        #[arg(long)]
        anchor_image: Option<PathBuf>,
    },
    /// Synthesize the spoken tags into <pack>/tags/
    BuildTags {
        /// Audio pack directory (overrides AUDIO_PACK_DIR)
        #[arg(long)]
        pack_dir: Option<PathBuf>,
    },
    /// List the talking-head models available to the configured key
    Models,
}
