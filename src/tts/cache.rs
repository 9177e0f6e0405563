use crate::error::AnchorcastResult;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

const CACHE_FILE: &str = "eleven_voice.json";
const AUTO_SELECTED_NOTE: &str = "Auto-selected first available voice.";

/// On-disk record of the auto-selected voice.
#[derive(Debug, Serialize, Deserialize)]
struct VoiceRecord {
    voice_id: String,
    #[serde(default)]
    note: String,
}

/// Voice id remembered across runs when no voice is configured explicitly.
///
/// Shared by every process using the same cache directory and never
/// invalidated automatically. Writes replace the file atomically, so
/// concurrent runs are last-writer-wins and a reader sees either the old or
/// the new record, never a torn one.
#[derive(Debug, Clone)]
pub struct VoiceCache {
    path: PathBuf,
}

impl VoiceCache {
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            path: cache_dir.join(CACHE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached voice id. Missing, unreadable, or malformed files read as `None`.
    pub fn load(&self) -> Option<String> {
        let contents = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<VoiceRecord>(&contents) {
            Ok(record) if !record.voice_id.trim().is_empty() => Some(record.voice_id),
            Ok(_) => None,
            Err(e) => {
                debug!("Ignoring malformed voice cache {}: {e}", self.path.display());
                None
            }
        }
    }

    pub fn store(&self, voice_id: &str) -> AnchorcastResult<()> {
        let dir = self.path.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(dir)?;

        let record = VoiceRecord {
            voice_id: voice_id.to_string(),
            note: AUTO_SELECTED_NOTE.into(),
        };
        let json = serde_json::to_vec(&record).map_err(std::io::Error::from)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&json)?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        debug!("Cached voice id {voice_id} at {}", self.path.display());
        Ok(())
    }
}
