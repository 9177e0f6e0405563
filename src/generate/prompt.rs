use crate::error::{AnchorcastError, AnchorcastResult};
use handlebars::Handlebars;
use serde_json::json;
use tracing::trace;

const SCRIPT_TEMPLATE: &str = include_str!("prompts/script.hbs");
const ANCHOR_PORTRAIT: &str = include_str!("prompts/anchor_portrait.txt");

/// Prompt used for the anchor portrait.
pub fn anchor_portrait_prompt() -> &'static str {
    ANCHOR_PORTRAIT.trim()
}

/// Instruction text for the script model. The topic hint is the only
/// parameter; word and length limits are advisory text for the model.
pub struct PromptBook<'a> {
    hbs: Handlebars<'a>,
}

impl<'a> PromptBook<'a> {
    pub fn new() -> AnchorcastResult<Self> {
        let mut hbs = Handlebars::new();
        hbs.set_strict_mode(true);
        // Prompts are plain text; HTML escaping would mangle quotes in topics.
        hbs.register_escape_fn(handlebars::no_escape);
        hbs.register_template_string("script", SCRIPT_TEMPLATE)
            .map_err(|e| AnchorcastError::Template(e.to_string()))?;
        Ok(Self { hbs })
    }

    pub fn script(&self, topic_hint: &str) -> AnchorcastResult<String> {
        let rendered = self
            .hbs
            .render("script", &json!({ "topic": topic_hint }))
            .map_err(|e| AnchorcastError::Template(e.to_string()))?;
        trace!("Script prompt: {rendered}");
        Ok(rendered.trim().to_string())
    }
}
