pub mod hedra;
pub mod poll;

use crate::error::{AnchorcastError, AnchorcastResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

pub use poll::wait_for_video_url;

/// Model names tried in order when picking the talking-head model.
pub const PREFERRED_MODELS: &[&str] = &["character-3", "hedra character-3"];

/// Prompt sent with every generation job.
pub const ANCHOR_DELIVERY_PROMPT: &str =
    "TikTok news anchor delivery, crisp studio lighting, subtle head motion, realistic lip sync.";

/// A model advertised by the video service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Declared type of a remote asset placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Image,
    Audio,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Image => "image",
            AssetKind::Audio => "audio",
        }
    }
}

/// Everything needed to submit one talking-head generation job.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model_id: String,
    pub start_keyframe_id: String,
    pub audio_id: String,
    pub duration_ms: u64,
    pub aspect_ratio: String,
    pub resolution: String,
    pub text_prompt: String,
}

/// Operations of a remote talking-head video service.
///
/// Each call is one blocking round trip (plus any retry the implementation
/// documents). Higher-level flows, such as model selection and waiting for a
/// job, are free functions over this trait.
pub trait VideoService {
    fn list_models(&self) -> AnchorcastResult<Vec<ModelInfo>>;

    /// Create a named placeholder and return its asset id.
    fn create_asset(&self, name: &str, kind: AssetKind) -> AnchorcastResult<String>;

    fn upload_asset(&self, asset_id: &str, file: &Path) -> AnchorcastResult<()>;

    /// Submit a generation job and return its id.
    fn generate_video(&self, request: &GenerationRequest) -> AnchorcastResult<String>;

    /// Raw status payload of a job.
    fn get_generation_status(&self, job_id: &str) -> AnchorcastResult<serde_json::Value>;

    /// Stream `url` to `path`, returning the number of bytes written.
    fn download_file(&self, url: &str, path: &Path) -> AnchorcastResult<u64>;
}

/// List models and pick one by preferred name.
pub fn pick_model_id(
    service: &dyn VideoService,
    preferred_names: &[&str],
) -> AnchorcastResult<String> {
    let models = service.list_models()?;
    select_model(&models, preferred_names)
}

/// Case-insensitive substring match of each preferred name, in priority
/// order, against every model's display name. First hit wins.
pub fn select_model(models: &[ModelInfo], preferred_names: &[&str]) -> AnchorcastResult<String> {
    for wanted in preferred_names {
        let wanted = wanted.to_lowercase();
        if let Some(model) = models.iter().find(|m| {
            m.name
                .as_deref()
                .is_some_and(|name| name.to_lowercase().contains(&wanted))
        }) {
            debug!("Picked model {} ({:?}) for '{wanted}'", model.id, model.name);
            return Ok(model.id.clone());
        }
    }

    Err(AnchorcastError::ModelNotFound {
        wanted: preferred_names.iter().map(|s| s.to_string()).collect(),
        available: models
            .iter()
            .map(|m| m.name.clone().unwrap_or_else(|| format!("<unnamed {}>", m.id)))
            .collect(),
    })
}
