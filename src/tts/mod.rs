pub mod cache;
pub mod elevenlabs;
pub mod openai;

use crate::clock::Clock;
use crate::config::Settings;
use crate::error::{AnchorcastError, AnchorcastResult};
use std::sync::Arc;
use tracing::{info, warn};

/// Provider tag for the primary (ElevenLabs) voice.
pub const PRIMARY_PROVIDER: &str = "elevenlabs";
/// Provider tag for the OpenAI speech fallback.
pub const FALLBACK_PROVIDER: &str = "openai_fallback";

/// Trait for pluggable speech backends.
///
/// Implementations are synchronous and own their retry policy; a returned
/// error means the provider is done trying.
pub trait SpeechProvider: Send + Sync {
    fn synthesize(&self, text: &str) -> AnchorcastResult<Vec<u8>>;
}

/// Synthesized audio and the tag of the provider that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Speech {
    pub audio: Vec<u8>,
    pub provider: &'static str,
}

/// One position in the fallback order. `provider` is `None` when the
/// provider has no credentials.
pub struct ProviderSlot {
    pub name: &'static str,
    pub provider: Option<Box<dyn SpeechProvider>>,
}

impl ProviderSlot {
    pub fn configured(name: &'static str, provider: Box<dyn SpeechProvider>) -> Self {
        Self {
            name,
            provider: Some(provider),
        }
    }

    pub fn unconfigured(name: &'static str) -> Self {
        Self {
            name,
            provider: None,
        }
    }
}

/// Ordered speech providers, tried until one succeeds.
pub struct SpeechSynthesizer {
    slots: Vec<ProviderSlot>,
}

impl SpeechSynthesizer {
    pub fn new(slots: Vec<ProviderSlot>) -> Self {
        Self { slots }
    }

    /// ElevenLabs first when a key is configured, then OpenAI speech.
    pub fn from_settings(settings: &Settings, clock: Arc<dyn Clock>) -> Self {
        let primary = match &settings.elevenlabs.api_key {
            Some(key) => ProviderSlot::configured(
                PRIMARY_PROVIDER,
                Box::new(elevenlabs::ElevenLabsClient::new(
                    key,
                    &settings.elevenlabs,
                    &settings.output.cache_dir,
                    clock,
                )),
            ),
            None => ProviderSlot::unconfigured(PRIMARY_PROVIDER),
        };
        let fallback = ProviderSlot::configured(
            FALLBACK_PROVIDER,
            Box::new(openai::OpenAiSpeech::new(&settings.openai)),
        );
        Self::new(vec![primary, fallback])
    }

    /// Synthesize `text` with the first provider that succeeds.
    ///
    /// Every failure is recorded in order; if no provider succeeds the error
    /// lists each provider with its reason (or "not configured").
    pub fn synthesize(&self, text: &str) -> AnchorcastResult<Speech> {
        let mut failures: Vec<(&'static str, String)> = Vec::new();

        for slot in &self.slots {
            let Some(provider) = &slot.provider else {
                failures.push((slot.name, "not configured".into()));
                continue;
            };
            match provider.synthesize(text) {
                Ok(audio) => {
                    info!("Speech synthesized via {} ({} bytes)", slot.name, audio.len());
                    return Ok(Speech {
                        audio,
                        provider: slot.name,
                    });
                }
                Err(e) => {
                    warn!("Speech provider {} failed: {e}", slot.name);
                    failures.push((slot.name, e.to_string()));
                }
            }
        }

        let reasons = failures
            .iter()
            .map(|(name, reason)| format!("{name}: {reason}"))
            .collect::<Vec<_>>()
            .join("; ");
        Err(AnchorcastError::SpeechUnavailable(reasons))
    }
}
