use crate::audio::MediaTool;
use crate::error::AnchorcastResult;
use crate::tts::SpeechSynthesizer;
use std::path::{Path, PathBuf};
use tracing::info;

/// Spoken station tags: file stem and phrase.
pub const STATION_TAGS: [(&str, &str); 4] = [
    ("TAG_open", "Broadcasting from an alternate timeline."),
    ("TAG_close", "Which timeline are we in?"),
    ("TAG_break", "Developing."),
    ("TAG_warn", "Signal interference detected."),
];

/// One tag written to the pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltTag {
    pub name: &'static str,
    pub wav: PathBuf,
    pub provider: &'static str,
}

/// Synthesize every station tag and write `<pack>/tags/<name>.{mp3,wav}`.
///
/// Existing files are overwritten. Stops at the first tag that cannot be
/// synthesized or converted.
pub fn build_tags(
    speech: &SpeechSynthesizer,
    media: &dyn MediaTool,
    pack_dir: &Path,
) -> AnchorcastResult<Vec<BuiltTag>> {
    let tags_dir = pack_dir.join("tags");
    std::fs::create_dir_all(&tags_dir)?;

    let mut built = Vec::with_capacity(STATION_TAGS.len());
    for (name, phrase) in STATION_TAGS {
        let spoken = speech.synthesize(phrase)?;
        let mp3 = tags_dir.join(format!("{name}.mp3"));
        let wav = tags_dir.join(format!("{name}.wav"));
        std::fs::write(&mp3, &spoken.audio)?;
        media.to_wav(&mp3, &wav)?;

        info!("Tag {name} via {} written to {}", spoken.provider, wav.display());
        built.push(BuiltTag {
            name,
            wav,
            provider: spoken.provider,
        });
    }
    Ok(built)
}
