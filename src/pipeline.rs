use crate::audio::MediaTool;
use crate::clock::Clock;
use crate::config::Settings;
use crate::error::AnchorcastResult;
use crate::generate::prompt::anchor_portrait_prompt;
use crate::generate::ContentGenerator;
use crate::tts::SpeechSynthesizer;
use crate::video::{self, AssetKind, GenerationRequest, VideoService};
use colored::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_TOPIC: &str = "BREAKING: a timeline where AI runs city hall";

/// Every artifact path of one run. All share the same UTC stamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub stamp: String,
    pub script: PathBuf,
    pub image: PathBuf,
    pub voice: PathBuf,
    pub raw_video: PathBuf,
    pub mixed_audio: PathBuf,
    pub final_video: PathBuf,
}

impl RunPaths {
    pub fn new(out_dir: &Path, stamp: &str) -> Self {
        let path = |prefix: &str, ext: &str| out_dir.join(format!("{prefix}_{stamp}.{ext}"));
        Self {
            stamp: stamp.to_string(),
            script: path("script", "txt"),
            image: path("anchor", "png"),
            voice: path("voice", "mp3"),
            raw_video: path("video_raw", "mp4"),
            mixed_audio: path("audio_mix", "wav"),
            final_video: path("video_final", "mp4"),
        }
    }

    /// `%Y%m%d_%H%M%S` in UTC.
    pub fn stamp_now() -> String {
        chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string()
    }

    /// Logical artifact name → path.
    pub fn artifacts(&self) -> BTreeMap<String, PathBuf> {
        [
            ("script", &self.script),
            ("image", &self.image),
            ("voice", &self.voice),
            ("raw_video", &self.raw_video),
            ("mixed_audio", &self.mixed_audio),
            ("final_video", &self.final_video),
        ]
        .into_iter()
        .map(|(name, path)| (name.to_string(), path.clone()))
        .collect()
    }
}

/// What one run produced.
#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub artifacts: BTreeMap<String, PathBuf>,
    pub generation_id: String,
    pub video_url: String,
    pub tts_provider: String,
}

/// Per-run choices that are not part of the environment.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Use this portrait instead of generating one.
    pub anchor_image: Option<PathBuf>,
}

/// Sequences one run: script → portrait → voice → talking-head video →
/// mix → mux. The first failing step ends the run; artifacts already
/// written stay on disk.
pub struct Pipeline<'a> {
    pub settings: &'a Settings,
    pub content: &'a dyn ContentGenerator,
    pub speech: &'a SpeechSynthesizer,
    pub video: &'a dyn VideoService,
    pub media: &'a dyn MediaTool,
    pub clock: &'a dyn Clock,
}

impl Pipeline<'_> {
    pub fn run(&self, topic_hint: &str, options: &RunOptions) -> AnchorcastResult<Manifest> {
        let paths = RunPaths::new(&self.settings.output.out_dir, &RunPaths::stamp_now());
        self.run_with_paths(topic_hint, options, &paths)
    }

    pub fn run_with_paths(
        &self,
        topic_hint: &str,
        options: &RunOptions,
        paths: &RunPaths,
    ) -> AnchorcastResult<Manifest> {
        let output = &self.settings.output;
        std::fs::create_dir_all(&output.out_dir)?;
        info!("Run {} starting (topic: {topic_hint})", paths.stamp);

        step(1, "Writing script");
        let script = self.content.generate_script(topic_hint)?;
        std::fs::write(&paths.script, &script)?;

        match &options.anchor_image {
            Some(existing) => {
                step(2, "Using supplied anchor image");
                std::fs::copy(existing, &paths.image)?;
            }
            None => {
                step(2, "Generating anchor image");
                self.content
                    .generate_anchor_image(anchor_portrait_prompt(), &paths.image)?;
            }
        }

        step(3, "Synthesizing voice");
        let speech = self.speech.synthesize(&script)?;
        std::fs::write(&paths.voice, &speech.audio)?;
        eprintln!("  voice via {}", speech.provider.bold());

        step(4, "Generating talking-head video");
        let model_id = video::pick_model_id(self.video, video::PREFERRED_MODELS)?;
        let image_asset = self.video.create_asset(&file_name(&paths.image), AssetKind::Image)?;
        let audio_asset = self.video.create_asset(&file_name(&paths.voice), AssetKind::Audio)?;
        self.video.upload_asset(&image_asset, &paths.image)?;
        self.video.upload_asset(&audio_asset, &paths.voice)?;

        let generation_id = self.video.generate_video(&GenerationRequest {
            model_id,
            start_keyframe_id: image_asset,
            audio_id: audio_asset,
            duration_ms: output.video_duration_ms,
            aspect_ratio: output.aspect_ratio.clone(),
            resolution: output.resolution.clone(),
            text_prompt: video::ANCHOR_DELIVERY_PROMPT.to_string(),
        })?;
        eprintln!("  generation {}", generation_id.bold());
        let video_url = video::wait_for_video_url(
            self.video,
            self.clock,
            &generation_id,
            self.settings.hedra.poll_timeout,
        )?;
        self.video.download_file(&video_url, &paths.raw_video)?;

        step(5, "Mixing music, sfx and tags");
        self.media.mix(
            &paths.voice,
            &paths.mixed_audio,
            &output.audio_pack_dir,
            output.duration_secs(),
        )?;

        step(6, "Muxing final video");
        self.media
            .mux(&paths.raw_video, &paths.mixed_audio, &paths.final_video)?;

        info!("Run {} complete", paths.stamp);
        Ok(Manifest {
            artifacts: paths.artifacts(),
            generation_id,
            video_url,
            tts_provider: speech.provider.to_string(),
        })
    }
}

fn step(n: u32, message: &str) {
    eprintln!("{} [{n}/6] {message}", "run:".cyan().bold());
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
