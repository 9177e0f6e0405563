use crate::audio::Ffmpeg;
use crate::clock::{Clock, SystemClock};
use crate::config::Settings;
use crate::error::AnchorcastResult;
use crate::generate::openai::OpenAiGenerator;
use crate::pipeline::{Pipeline, RunOptions, DEFAULT_TOPIC};
use crate::tts::SpeechSynthesizer;
use crate::video::hedra::HedraClient;
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;

/// Produce one video and print the manifest to stdout.
pub fn run(
    topic: Option<String>,
    out_dir: Option<PathBuf>,
    pack_dir: Option<PathBuf>,
    anchor_image: Option<PathBuf>,
) -> AnchorcastResult<()> {
    let mut settings = Settings::from_env()?;
    if let Some(dir) = out_dir {
        settings.output.out_dir = dir;
    }
    if let Some(dir) = pack_dir {
        settings.output.audio_pack_dir = dir;
    }
    let topic = topic.unwrap_or_else(|| DEFAULT_TOPIC.to_string());

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let content = OpenAiGenerator::new(&settings.openai)?;
    let speech = SpeechSynthesizer::from_settings(&settings, Arc::clone(&clock));
    let video = HedraClient::new(&settings.hedra, Arc::clone(&clock));
    let media = Ffmpeg::new();

    let pipeline = Pipeline {
        settings: &settings,
        content: &content,
        speech: &speech,
        video: &video,
        media: &media,
        clock: clock.as_ref(),
    };
    let manifest = pipeline.run(&topic, &RunOptions { anchor_image })?;

    eprintln!(
        "{} {}",
        "done:".green().bold(),
        manifest.artifacts["final_video"].display()
    );
    println!("{}", serde_json::to_string_pretty(&manifest)?);
    Ok(())
}
