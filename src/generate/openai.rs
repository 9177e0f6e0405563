use crate::config::OpenAiSettings;
use crate::error::{AnchorcastError, AnchorcastResult};
use crate::generate::prompt::PromptBook;
use crate::generate::ContentGenerator;
use crate::http;
use base64::Engine;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::info;

const PROVIDER: &str = "openai";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);
const IMAGE_SIZE: &str = "1024x1536";
const IMAGE_QUALITY: &str = "low";

/// Script and portrait generation over the OpenAI REST API
/// (`POST /responses`, `POST /images/generations`). Single attempts.
pub struct OpenAiGenerator<'a> {
    agent: ureq::Agent,
    api_key: String,
    base_url: String,
    script_model: String,
    image_model: String,
    prompts: PromptBook<'a>,
}

impl<'a> OpenAiGenerator<'a> {
    pub fn new(settings: &OpenAiSettings) -> AnchorcastResult<Self> {
        Ok(Self {
            agent: http::agent(REQUEST_TIMEOUT),
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            script_model: settings.script_model.clone(),
            image_model: settings.image_model.clone(),
            prompts: PromptBook::new()?,
        })
    }

    fn post_json(&self, path: &str, body: &Value) -> AnchorcastResult<Value> {
        let response = http::expect_success(
            PROVIDER,
            self.agent
                .post(format!("{}{path}", self.base_url))
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .send(body.to_string().as_bytes()),
        )?;
        http::read_json(PROVIDER, response)
    }
}

impl ContentGenerator for OpenAiGenerator<'_> {
    fn generate_script(&self, topic_hint: &str) -> AnchorcastResult<String> {
        let input = self.prompts.script(topic_hint)?;
        let body = serde_json::json!({
            "model": self.script_model,
            "input": input,
        });
        let response = self.post_json("/responses", &body)?;
        let script = output_text(&response)
            .map(|text| text.trim().to_string())
            .ok_or_else(|| AnchorcastError::MalformedResponse {
                provider: PROVIDER,
                message: "response contained no output text".into(),
            })?;
        info!("Script generated ({} words)", script.split_whitespace().count());
        Ok(script)
    }

    fn generate_anchor_image(&self, prompt: &str, out_path: &Path) -> AnchorcastResult<()> {
        let body = serde_json::json!({
            "model": self.image_model,
            "prompt": prompt,
            "n": 1,
            "size": IMAGE_SIZE,
            "quality": IMAGE_QUALITY,
        });
        let response = self.post_json("/images/generations", &body)?;
        let image = decode_first_image(&response)?;
        std::fs::write(out_path, &image)?;
        info!("Anchor image written to {} ({} bytes)", out_path.display(), image.len());
        Ok(())
    }
}

/// Concatenated `output_text` parts of a Responses API payload. A top-level
/// `output_text` string, when present, wins.
fn output_text(response: &Value) -> Option<String> {
    if let Some(text) = response.get("output_text").and_then(Value::as_str) {
        return Some(text.to_string());
    }

    let parts: Vec<&str> = response
        .get("output")?
        .as_array()?
        .iter()
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .filter(|part| part.get("type").and_then(Value::as_str) == Some("output_text"))
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.concat())
    }
}

fn decode_first_image(response: &Value) -> AnchorcastResult<Vec<u8>> {
    let encoded = response
        .pointer("/data/0/b64_json")
        .and_then(Value::as_str)
        .ok_or_else(|| AnchorcastError::MalformedResponse {
            provider: PROVIDER,
            message: "image response has no data[0].b64_json".into(),
        })?;
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| AnchorcastError::MalformedResponse {
            provider: PROVIDER,
            message: format!("image payload is not valid base64: {e}"),
        })
}
