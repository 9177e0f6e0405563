use crate::audio::Ffmpeg;
use crate::clock::SystemClock;
use crate::config::Settings;
use crate::error::AnchorcastResult;
use crate::tags::build_tags;
use crate::tts::SpeechSynthesizer;
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;

pub fn run(pack_dir: Option<PathBuf>) -> AnchorcastResult<()> {
    let settings = Settings::from_env()?;
    let pack_dir = pack_dir.unwrap_or_else(|| settings.output.audio_pack_dir.clone());
    let speech = SpeechSynthesizer::from_settings(&settings, Arc::new(SystemClock::new()));

    let built = build_tags(&speech, &Ffmpeg::new(), &pack_dir)?;
    for tag in &built {
        eprintln!(
            "{} {} via {} -> {}",
            "tags:".cyan().bold(),
            tag.name,
            tag.provider.bold(),
            tag.wav.display()
        );
    }
    eprintln!(
        "{} {} tags written to {}",
        "done:".green().bold(),
        built.len(),
        pack_dir.join("tags").display()
    );
    Ok(())
}
