use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnchorcastError {
    #[error("Missing env var: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for env var {name}: '{value}'")]
    InvalidEnv { name: &'static str, value: String },

    #[error("{provider} returned HTTP {status}: {body}")]
    Http {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} request failed: {message}")]
    Transport {
        provider: &'static str,
        message: String,
    },

    #[error("Malformed {provider} response: {message}")]
    MalformedResponse {
        provider: &'static str,
        message: String,
    },

    #[error("Timed out waiting for generation {job_id}. Last status: {last_status}")]
    Timeout {
        job_id: String,
        last_status: serde_json::Value,
    },

    #[error("Generation {job_id} failed. Status payload: {payload}")]
    GenerationFailed {
        job_id: String,
        payload: serde_json::Value,
    },

    #[error("Could not find model containing any of: {wanted:?}. Models returned: {available:?}")]
    ModelNotFound {
        wanted: Vec<String>,
        available: Vec<String>,
    },

    #[error("All speech providers failed: {0}")]
    SpeechUnavailable(String),

    #[error("Audio pack file missing: {0}")]
    PackFileMissing(PathBuf),

    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    #[error("Prompt template error: {0}")]
    Template(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AnchorcastError {
    /// Whether a retry of the same request could plausibly succeed. Only
    /// HTTP and transport failures count.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AnchorcastError::Http { .. } | AnchorcastError::Transport { .. }
        )
    }

    /// Return an actionable hint for the user, if applicable.
    pub fn hint(&self) -> Option<String> {
        match self {
            AnchorcastError::MissingEnv(name) => Some(format!(
                "Export {name} in your shell or add it to a .env file in the working directory."
            )),
            AnchorcastError::InvalidEnv { name, .. } => {
                Some(format!("{name} must be a whole number (e.g. 15000)."))
            }
            AnchorcastError::Http { status: 401, .. } | AnchorcastError::Http { status: 403, .. } => {
                Some("The provider rejected the API key. Check the key and its plan limits.".into())
            }
            AnchorcastError::ModelNotFound { .. } => Some(
                "Run 'anchorcast models' to see which models your Hedra key can use.".into(),
            ),
            AnchorcastError::SpeechUnavailable(_) => Some(
                "Set ELEVENLABS_API_KEY for the primary voice; OPENAI_API_KEY is used as fallback."
                    .into(),
            ),
            AnchorcastError::PackFileMissing(_) => Some(
                "Populate the audio pack (music/, sfx/, tags/). Run 'anchorcast build-tags' to create the spoken tags.".into(),
            ),
            AnchorcastError::Ffmpeg(_) => Some(
                "Ensure FFmpeg is installed and on your PATH. Install via: brew install ffmpeg (macOS) or apt install ffmpeg (Linux).".into(),
            ),
            AnchorcastError::Timeout { .. } => Some(
                "Raise HEDRA_POLL_TIMEOUT_SECS or check the generation in the Hedra dashboard."
                    .into(),
            ),
            _ => None,
        }
    }
}

pub type AnchorcastResult<T> = Result<T, AnchorcastError>;
