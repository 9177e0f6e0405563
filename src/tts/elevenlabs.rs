use crate::clock::Clock;
use crate::config::ElevenLabsSettings;
use crate::error::{AnchorcastError, AnchorcastResult};
use crate::http;
use crate::retry::RetryPolicy;
use crate::tts::cache::VoiceCache;
use crate::tts::{SpeechProvider, PRIMARY_PROVIDER};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const LIST_VOICES_RETRY: RetryPolicy = RetryPolicy::new(4, 1, 12);
const SYNTHESIZE_RETRY: RetryPolicy = RetryPolicy::new(3, 1, 10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// ElevenLabs text-to-speech over the REST API
/// (`GET /voices`, `POST /text-to-speech/{voice_id}`).
///
/// When no voice id is configured, the first voice on the account is picked
/// once and remembered in the voice cache.
pub struct ElevenLabsClient {
    agent: ureq::Agent,
    api_key: String,
    base_url: String,
    model_id: String,
    output_format: String,
    voice_id: Option<String>,
    cache: VoiceCache,
    clock: Arc<dyn Clock>,
}

impl ElevenLabsClient {
    pub fn new(
        api_key: &str,
        settings: &ElevenLabsSettings,
        cache_dir: &Path,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            agent: http::agent(REQUEST_TIMEOUT),
            api_key: api_key.to_string(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model_id: settings.model_id.clone(),
            output_format: settings.output_format.clone(),
            voice_id: settings.voice_id.clone(),
            cache: VoiceCache::new(cache_dir),
            clock,
        }
    }

    /// Voice to synthesize with: configured id, else cached id, else the
    /// first voice the account lists (which is then cached).
    ///
    /// A failed cache write is logged and ignored; the listed voice is still
    /// returned and synthesis stays on ElevenLabs.
    pub fn resolve_voice_id(&self) -> AnchorcastResult<String> {
        if let Some(id) = &self.voice_id {
            return Ok(id.clone());
        }
        if let Some(id) = self.cache.load() {
            debug!("Using cached ElevenLabs voice {id}");
            return Ok(id);
        }

        let voices = self.list_voices()?;
        let voice_id = first_voice_id(&voices)?;
        info!("Auto-selected ElevenLabs voice {voice_id}");

        if let Err(e) = self.cache.store(&voice_id) {
            tracing::warn!(
                "Could not write voice cache {}: {e}",
                self.cache.path().display()
            );
        }
        Ok(voice_id)
    }

    /// Raw `GET /voices` payload, retried on transient failures.
    pub fn list_voices(&self) -> AnchorcastResult<serde_json::Value> {
        let url = format!("{}/voices", self.base_url);
        LIST_VOICES_RETRY.run(self.clock.as_ref(), "ElevenLabs list voices", || {
            let response = http::expect_success(
                PRIMARY_PROVIDER,
                self.agent
                    .get(&url)
                    .header("xi-api-key", self.api_key.as_str())
                    .call(),
            )?;
            http::read_json(PRIMARY_PROVIDER, response)
        })
    }

    fn text_to_speech(&self, voice_id: &str, text: &str) -> AnchorcastResult<Vec<u8>> {
        let url = format!("{}/text-to-speech/{voice_id}", self.base_url);
        let body = serde_json::json!({
            "text": text,
            "model_id": self.model_id,
            "voice_settings": {
                "stability": 0.6,
                "similarity_boost": 0.7,
                "style": 0.1,
                "use_speaker_boost": true,
            },
        })
        .to_string();

        SYNTHESIZE_RETRY.run(self.clock.as_ref(), "ElevenLabs text-to-speech", || {
            let response = http::expect_success(
                PRIMARY_PROVIDER,
                self.agent
                    .post(&url)
                    .query("output_format", &self.output_format)
                    .header("xi-api-key", self.api_key.as_str())
                    .header("Content-Type", "application/json")
                    .header("Accept", "audio/mpeg")
                    .send(body.as_bytes()),
            )?;
            http::read_bytes(PRIMARY_PROVIDER, response)
        })
    }
}

impl SpeechProvider for ElevenLabsClient {
    fn synthesize(&self, text: &str) -> AnchorcastResult<Vec<u8>> {
        let voice_id = self.resolve_voice_id()?;
        self.text_to_speech(&voice_id, text)
    }
}

/// First voice in provider order. An empty list or an entry without an id is
/// a malformed response; there is no default voice to fall back to.
fn first_voice_id(voices: &serde_json::Value) -> AnchorcastResult<String> {
    let first = voices
        .get("voices")
        .and_then(|v| v.as_array())
        .and_then(|list| list.first())
        .ok_or_else(|| AnchorcastError::MalformedResponse {
            provider: PRIMARY_PROVIDER,
            message: "no voices returned for this account/key".into(),
        })?;

    first
        .get("voice_id")
        .or_else(|| first.get("id"))
        .and_then(|v| v.as_str())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AnchorcastError::MalformedResponse {
            provider: PRIMARY_PROVIDER,
            message: format!("could not parse voice_id from voices response: {first}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;
    use serde_json::json;

    fn settings(base_url: String, voice_id: Option<&str>) -> ElevenLabsSettings {
        ElevenLabsSettings {
            api_key: Some("xi-key".into()),
            voice_id: voice_id.map(str::to_string),
            base_url,
            model_id: "eleven_multilingual_v2".into(),
            output_format: "mp3_44100_128".into(),
        }
    }

    fn client(server: &MockServer, voice_id: Option<&str>, cache_dir: &Path) -> ElevenLabsClient {
        ElevenLabsClient::new(
            "xi-key",
            &settings(server.base_url(), voice_id),
            cache_dir,
            Arc::new(FakeClock::new()),
        )
    }

    #[test]
    fn test_first_voice_id() {
        let voices = json!({"voices": [{"voice_id": "abc"}, {"voice_id": "def"}]});
        assert_eq!(first_voice_id(&voices).unwrap(), "abc");

        let voices = json!({"voices": [{"id": "legacy"}]});
        assert_eq!(first_voice_id(&voices).unwrap(), "legacy");
    }

    #[test]
    fn test_first_voice_id_malformed() {
        assert!(matches!(
            first_voice_id(&json!({"voices": []})),
            Err(AnchorcastError::MalformedResponse { .. })
        ));
        assert!(matches!(
            first_voice_id(&json!({})),
            Err(AnchorcastError::MalformedResponse { .. })
        ));
        assert!(matches!(
            first_voice_id(&json!({"voices": [{"name": "Rachel"}]})),
            Err(AnchorcastError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn test_configured_voice_skips_network() {
        let server = MockServer::start();
        let voices = server.mock(|when, then| {
            when.method(GET).path("/voices");
            then.status(200).json_body(json!({"voices": [{"voice_id": "other"}]}));
        });
        let dir = tempfile::tempdir().unwrap();

        let id = client(&server, Some("configured"), dir.path())
            .resolve_voice_id()
            .unwrap();

        assert_eq!(id, "configured");
        voices.assert_hits(0);
        assert!(!dir.path().join("eleven_voice.json").exists());
    }

    #[test]
    fn test_auto_selection_lists_once_then_uses_cache() {
        let server = MockServer::start();
        let voices = server.mock(|when, then| {
            when.method(GET).path("/voices").header("xi-api-key", "xi-key");
            then.status(200).json_body(json!({
                "voices": [
                    {"voice_id": "first-voice", "name": "Rachel"},
                    {"voice_id": "second-voice", "name": "Adam"}
                ]
            }));
        });
        let dir = tempfile::tempdir().unwrap();

        let first = client(&server, None, dir.path()).resolve_voice_id().unwrap();
        let second = client(&server, None, dir.path()).resolve_voice_id().unwrap();

        assert_eq!(first, "first-voice");
        assert_eq!(second, "first-voice");
        voices.assert_hits(1);
    }

    #[test]
    fn test_cache_write_failure_keeps_listed_voice() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/voices");
            then.status(200).json_body(json!({"voices": [{"voice_id": "listed"}]}));
        });
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the cache directory should be.
        let blocked = dir.path().join("not-a-dir");
        std::fs::write(&blocked, b"").unwrap();

        let id = client(&server, None, &blocked).resolve_voice_id().unwrap();

        assert_eq!(id, "listed");
        assert!(blocked.is_file());
    }

    #[test]
    fn test_list_voices_retries_then_surfaces() {
        let server = MockServer::start();
        let voices = server.mock(|when, then| {
            when.method(GET).path("/voices");
            then.status(503);
        });
        let dir = tempfile::tempdir().unwrap();

        let err = client(&server, None, dir.path())
            .resolve_voice_id()
            .unwrap_err();

        assert!(matches!(err, AnchorcastError::Http { status: 503, .. }));
        voices.assert_hits(4);
    }

    #[test]
    fn test_empty_voice_list_is_not_retried() {
        let server = MockServer::start();
        let voices = server.mock(|when, then| {
            when.method(GET).path("/voices");
            then.status(200).json_body(json!({"voices": []}));
        });
        let dir = tempfile::tempdir().unwrap();

        let err = client(&server, None, dir.path())
            .resolve_voice_id()
            .unwrap_err();

        assert!(matches!(err, AnchorcastError::MalformedResponse { .. }));
        voices.assert_hits(1);
    }

    #[test]
    fn test_synthesize_posts_text() {
        let server = MockServer::start();
        let tts = server.mock(|when, then| {
            when.method(POST)
                .path("/text-to-speech/voice-9")
                .query_param("output_format", "mp3_44100_128")
                .header("xi-api-key", "xi-key")
                .json_body_partial(r#"{"text": "Hello there", "model_id": "eleven_multilingual_v2"}"#);
            then.status(200)
                .header("content-type", "audio/mpeg")
                .body(b"ID3-fake-mp3".to_vec());
        });
        let dir = tempfile::tempdir().unwrap();

        let audio = client(&server, Some("voice-9"), dir.path())
            .synthesize("Hello there")
            .unwrap();

        assert_eq!(audio, b"ID3-fake-mp3");
        tts.assert();
    }

    #[test]
    fn test_synthesize_retry_budget() {
        let server = MockServer::start();
        let tts = server.mock(|when, then| {
            when.method(POST).path("/text-to-speech/voice-9");
            then.status(429).body("too many requests");
        });
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(FakeClock::new());
        let client = ElevenLabsClient::new(
            "xi-key",
            &settings(server.base_url(), Some("voice-9")),
            dir.path(),
            clock.clone(),
        );

        let err = client.synthesize("Hello").unwrap_err();

        assert!(matches!(err, AnchorcastError::Http { status: 429, .. }));
        tts.assert_hits(3);
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }
}
