use crate::error::{AnchorcastError, AnchorcastResult};
use std::path::PathBuf;
use std::time::Duration;

/// Run configuration, resolved once at startup and passed by reference into
/// every component. Nothing else in the crate reads the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub hedra: HedraSettings,
    pub openai: OpenAiSettings,
    pub elevenlabs: ElevenLabsSettings,
    pub output: OutputSettings,
}

#[derive(Debug, Clone)]
pub struct HedraSettings {
    pub api_key: String,
    pub base_url: String,
    pub poll_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub base_url: String,
    pub script_model: String,
    pub image_model: String,
    pub tts_model: String,
    pub tts_voice: String,
}

#[derive(Debug, Clone)]
pub struct ElevenLabsSettings {
    /// `None` disables the primary speech provider.
    pub api_key: Option<String>,
    /// `None` means auto-select (and cache) the first voice on the account.
    pub voice_id: Option<String>,
    pub base_url: String,
    pub model_id: String,
    pub output_format: String,
}

#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub out_dir: PathBuf,
    pub video_duration_ms: u64,
    pub aspect_ratio: String,
    pub resolution: String,
    pub audio_pack_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl OutputSettings {
    pub fn duration_secs(&self) -> f64 {
        self.video_duration_ms as f64 / 1000.0
    }
}

// Defaults
const DEFAULT_HEDRA_BASE_URL: &str = "https://api.hedra.com/web-app/public";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io/v1";
const DEFAULT_SCRIPT_MODEL: &str = "gpt-4.1-mini";
const DEFAULT_IMAGE_MODEL: &str = "gpt-image-1-mini";
const DEFAULT_TTS_MODEL: &str = "gpt-4o-mini-tts";
const DEFAULT_TTS_VOICE: &str = "alloy";
const DEFAULT_ELEVENLABS_MODEL: &str = "eleven_multilingual_v2";
const DEFAULT_ELEVENLABS_FORMAT: &str = "mp3_44100_128";
const DEFAULT_OUT_DIR: &str = "out";
const DEFAULT_DURATION_MS: u64 = 15_000;
const DEFAULT_ASPECT_RATIO: &str = "9:16";
const DEFAULT_RESOLUTION: &str = "720p";
const DEFAULT_PACK_DIR: &str = "audio/pack_v1";
const DEFAULT_CACHE_DIR: &str = ".cache";
const DEFAULT_POLL_TIMEOUT_SECS: u64 = 900;

impl Settings {
    /// Resolve settings from the process environment.
    pub fn from_env() -> AnchorcastResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve settings through an arbitrary variable lookup.
    ///
    /// Required keys are checked first so a missing credential is reported
    /// before any optional value is parsed. Empty strings count as unset.
    pub fn from_lookup<F>(lookup: F) -> AnchorcastResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let or_default = |name: &str, default: &str| get(name).unwrap_or_else(|| default.into());

        let hedra_key = get("HEDRA_API_KEY").ok_or(AnchorcastError::MissingEnv("HEDRA_API_KEY"))?;
        let openai_key =
            get("OPENAI_API_KEY").ok_or(AnchorcastError::MissingEnv("OPENAI_API_KEY"))?;

        let video_duration_ms = parse_u64(&get, "VIDEO_DURATION_MS", DEFAULT_DURATION_MS)?;
        let poll_timeout_secs =
            parse_u64(&get, "HEDRA_POLL_TIMEOUT_SECS", DEFAULT_POLL_TIMEOUT_SECS)?;

        Ok(Self {
            hedra: HedraSettings {
                api_key: hedra_key,
                base_url: or_default("HEDRA_BASE_URL", DEFAULT_HEDRA_BASE_URL),
                poll_timeout: Duration::from_secs(poll_timeout_secs),
            },
            openai: OpenAiSettings {
                api_key: openai_key,
                base_url: or_default("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
                script_model: or_default("OPENAI_SCRIPT_MODEL", DEFAULT_SCRIPT_MODEL),
                image_model: or_default("OPENAI_IMAGE_MODEL", DEFAULT_IMAGE_MODEL),
                tts_model: or_default("OPENAI_TTS_MODEL", DEFAULT_TTS_MODEL),
                tts_voice: or_default("OPENAI_TTS_VOICE", DEFAULT_TTS_VOICE),
            },
            elevenlabs: ElevenLabsSettings {
                api_key: get("ELEVENLABS_API_KEY"),
                voice_id: get("ELEVENLABS_VOICE_ID"),
                base_url: or_default("ELEVENLABS_BASE_URL", DEFAULT_ELEVENLABS_BASE_URL),
                model_id: or_default("ELEVENLABS_MODEL_ID", DEFAULT_ELEVENLABS_MODEL),
                output_format: or_default("ELEVENLABS_OUTPUT_FORMAT", DEFAULT_ELEVENLABS_FORMAT),
            },
            output: OutputSettings {
                out_dir: PathBuf::from(or_default("OUT_DIR", DEFAULT_OUT_DIR)),
                video_duration_ms,
                aspect_ratio: or_default("ASPECT_RATIO", DEFAULT_ASPECT_RATIO),
                resolution: or_default("RESOLUTION", DEFAULT_RESOLUTION),
                audio_pack_dir: PathBuf::from(or_default("AUDIO_PACK_DIR", DEFAULT_PACK_DIR)),
                cache_dir: PathBuf::from(or_default("CACHE_DIR", DEFAULT_CACHE_DIR)),
            },
        })
    }
}

fn parse_u64<G>(get: &G, name: &'static str, default: u64) -> AnchorcastResult<u64>
where
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| AnchorcastError::InvalidEnv { name, value: raw }),
        None => Ok(default),
    }
}
