use crate::config::OpenAiSettings;
use crate::error::AnchorcastResult;
use crate::http;
use crate::tts::{SpeechProvider, FALLBACK_PROVIDER};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// OpenAI speech endpoint (`POST /audio/speech`), MP3 output.
/// Single attempt; it is the last provider in the chain.
pub struct OpenAiSpeech {
    agent: ureq::Agent,
    api_key: String,
    base_url: String,
    model: String,
    voice: String,
}

impl OpenAiSpeech {
    pub fn new(settings: &OpenAiSettings) -> Self {
        Self {
            agent: http::agent(REQUEST_TIMEOUT),
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.tts_model.clone(),
            voice: settings.tts_voice.clone(),
        }
    }
}

impl SpeechProvider for OpenAiSpeech {
    fn synthesize(&self, text: &str) -> AnchorcastResult<Vec<u8>> {
        let body = serde_json::json!({
            "model": self.model,
            "voice": self.voice,
            "input": text,
            "response_format": "mp3",
        });

        let response = http::expect_success(
            FALLBACK_PROVIDER,
            self.agent
                .post(format!("{}/audio/speech", self.base_url))
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .send(body.to_string().as_bytes()),
        )?;
        http::read_bytes(FALLBACK_PROVIDER, response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnchorcastError;
    use httpmock::Method::POST;
    use httpmock::MockServer;

    fn settings(base_url: String) -> OpenAiSettings {
        OpenAiSettings {
            api_key: "sk-test".into(),
            base_url,
            script_model: "gpt-4.1-mini".into(),
            image_model: "gpt-image-1-mini".into(),
            tts_model: "gpt-4o-mini-tts".into(),
            tts_voice: "alloy".into(),
        }
    }

    #[test]
    fn test_speech_request() {
        let server = MockServer::start();
        let speech = server.mock(|when, then| {
            when.method(POST)
                .path("/audio/speech")
                .header("authorization", "Bearer sk-test")
                .json_body_partial(
                    r#"{"model": "gpt-4o-mini-tts", "voice": "alloy", "input": "Hi", "response_format": "mp3"}"#,
                );
            then.status(200).body(b"mp3-bytes".to_vec());
        });

        let audio = OpenAiSpeech::new(&settings(server.base_url()))
            .synthesize("Hi")
            .unwrap();

        assert_eq!(audio, b"mp3-bytes");
        speech.assert();
    }

    #[test]
    fn test_speech_error_is_single_attempt() {
        let server = MockServer::start();
        let speech = server.mock(|when, then| {
            when.method(POST).path("/audio/speech");
            then.status(500).body("{\"error\": \"boom\"}");
        });

        let err = OpenAiSpeech::new(&settings(server.base_url()))
            .synthesize("Hi")
            .unwrap_err();

        assert!(matches!(err, AnchorcastError::Http { status: 500, .. }));
        assert!(err.to_string().contains("boom"));
        speech.assert_hits(1);
    }
}
