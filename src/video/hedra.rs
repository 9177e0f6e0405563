use crate::clock::Clock;
use crate::config::HedraSettings;
use crate::error::{AnchorcastError, AnchorcastResult};
use crate::http;
use crate::retry::RetryPolicy;
use crate::video::{AssetKind, GenerationRequest, ModelInfo, VideoService};
use serde::Deserialize;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use ureq::unversioned::multipart::Form;

const PROVIDER: &str = "hedra";
const LIST_MODELS_RETRY: RetryPolicy = RetryPolicy::new(5, 1, 20);
const API_TIMEOUT: Duration = Duration::from_secs(120);
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(600);
const DOWNLOAD_CHUNK: usize = 1024 * 1024;

/// Hedra public API client (`X-API-Key` auth).
///
/// Only `list_models` retries; asset, generation, status and download calls
/// are single attempts.
pub struct HedraClient {
    api: ureq::Agent,
    transfer: ureq::Agent,
    api_key: String,
    base_url: String,
    clock: Arc<dyn Clock>,
}

#[derive(Deserialize)]
struct IdResponse {
    id: String,
}

impl HedraClient {
    pub fn new(settings: &HedraSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            api: http::agent(API_TIMEOUT),
            transfer: http::agent(TRANSFER_TIMEOUT),
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            clock,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn read_id(response: ureq::http::Response<ureq::Body>, what: &str) -> AnchorcastResult<String> {
        let value: serde_json::Value = http::read_json(PROVIDER, response)?;
        serde_json::from_value::<IdResponse>(value.clone())
            .map(|r| r.id)
            .map_err(|_| AnchorcastError::MalformedResponse {
                provider: PROVIDER,
                message: format!("{what} response has no id: {value}"),
            })
    }
}

/// JSON body of `POST /generations`.
fn generation_payload(request: &GenerationRequest) -> serde_json::Value {
    serde_json::json!({
        "generated_video_inputs": {
            "text_prompt": request.text_prompt,
            "resolution": request.resolution,
            "aspect_ratio": request.aspect_ratio,
            "duration_ms": request.duration_ms,
            "bounding_box_target": {"[0]": 0.5, "[1]": 0.5},
        },
        "type": "video",
        "ai_model_id": request.model_id,
        "start_keyframe_id": request.start_keyframe_id,
        "audio_id": request.audio_id,
    })
}

impl VideoService for HedraClient {
    fn list_models(&self) -> AnchorcastResult<Vec<ModelInfo>> {
        let url = self.url("/models");
        LIST_MODELS_RETRY.run(self.clock.as_ref(), "Hedra list models", || {
            let response = http::expect_success(
                PROVIDER,
                self.api
                    .get(&url)
                    .header("X-API-Key", self.api_key.as_str())
                    .call(),
            )?;
            http::read_json(PROVIDER, response)
        })
    }

    fn create_asset(&self, name: &str, kind: AssetKind) -> AnchorcastResult<String> {
        let body = serde_json::json!({"name": name, "type": kind.as_str()});
        let response = http::expect_success(
            PROVIDER,
            self.api
                .post(self.url("/assets"))
                .header("X-API-Key", self.api_key.as_str())
                .header("Content-Type", "application/json")
                .send(body.to_string().as_bytes()),
        )?;
        let id = Self::read_id(response, "create asset")?;
        debug!("Created {} asset {id} ({name})", kind.as_str());
        Ok(id)
    }

    fn upload_asset(&self, asset_id: &str, file: &Path) -> AnchorcastResult<()> {
        // Streams the file; part name, filename and MIME type come from the path.
        let form = Form::new().file("file", file)?;

        http::expect_success(
            PROVIDER,
            self.transfer
                .post(self.url(&format!("/assets/{asset_id}/upload")))
                .header("X-API-Key", self.api_key.as_str())
                .send(form),
        )?;
        debug!("Uploaded {} to asset {asset_id}", file.display());
        Ok(())
    }

    fn generate_video(&self, request: &GenerationRequest) -> AnchorcastResult<String> {
        let body = generation_payload(request);
        let response = http::expect_success(
            PROVIDER,
            self.api
                .post(self.url("/generations"))
                .header("X-API-Key", self.api_key.as_str())
                .header("Content-Type", "application/json")
                .send(body.to_string().as_bytes()),
        )?;
        let id = Self::read_id(response, "generation")?;
        info!("Submitted generation {id} (model {})", request.model_id);
        Ok(id)
    }

    fn get_generation_status(&self, job_id: &str) -> AnchorcastResult<serde_json::Value> {
        let response = http::expect_success(
            PROVIDER,
            self.api
                .get(self.url(&format!("/generations/{job_id}/status")))
                .header("X-API-Key", self.api_key.as_str())
                .call(),
        )?;
        http::read_json(PROVIDER, response)
    }

    fn download_file(&self, url: &str, path: &Path) -> AnchorcastResult<u64> {
        // Result URLs are pre-signed; no API key.
        let response = http::expect_success(PROVIDER, self.transfer.get(url).call())?;
        let mut reader = response.into_body().into_reader();
        let mut file = std::fs::File::create(path)?;

        let mut buf = vec![0u8; DOWNLOAD_CHUNK];
        let mut written = 0u64;
        loop {
            let n = reader.read(&mut buf).map_err(|e| AnchorcastError::Transport {
                provider: PROVIDER,
                message: format!("download interrupted: {e}"),
            })?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n])?;
            written += n as u64;
        }
        file.flush()?;

        info!("Downloaded {written} bytes to {}", path.display());
        Ok(written)
    }
}
