mod audio;
mod cli;
mod clock;
mod commands;
mod config;
mod error;
mod generate;
mod http;
mod pipeline;
mod retry;
mod tags;
mod tts;
mod video;

use clap::Parser;
use cli::{Cli, Command};
use colored::*;
use error::AnchorcastResult;

fn main() {
    let cli = Cli::parse();

    // A missing .env is fine; the process environment may already be complete.
    let _ = dotenvy::dotenv();

    // Initialize tracing, gated on RUST_LOG env var
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .try_init();
    }

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "error:".red().bold(), e);
        if let Some(hint) = e.hint() {
            eprintln!("{} {}", "hint:".yellow().bold(), hint);
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> AnchorcastResult<()> {
    match cli.command {
        Command::Run {
            topic,
            out_dir,
            pack_dir,
            anchor_image,
        } => commands::run::run(topic, out_dir, pack_dir, anchor_image),
        Command::BuildTags { pack_dir } => commands::tags::run(pack_dir),
        Command::Models => commands::models::run(),
    }
}
