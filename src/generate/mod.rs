pub mod openai;
pub mod prompt;

use crate::error::AnchorcastResult;
use std::path::Path;

/// Language-model script writing and portrait generation.
pub trait ContentGenerator {
    /// Spoken script for `topic_hint`, trimmed but otherwise unvalidated.
    fn generate_script(&self, topic_hint: &str) -> AnchorcastResult<String>;

    /// Generate one portrait for `prompt` and write it to `out_path`.
    fn generate_anchor_image(&self, prompt: &str, out_path: &Path) -> AnchorcastResult<()>;
}
