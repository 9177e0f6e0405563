use crate::clock::SystemClock;
use crate::config::Settings;
use crate::error::AnchorcastResult;
use crate::video::hedra::HedraClient;
use crate::video::{self, VideoService};
use colored::*;
use std::sync::Arc;

/// Print every model as `<id>  <name>`, marking the one a run would pick.
pub fn run() -> AnchorcastResult<()> {
    let settings = Settings::from_env()?;
    let client = HedraClient::new(&settings.hedra, Arc::new(SystemClock::new()));

    let models = client.list_models()?;
    let picked = video::select_model(&models, video::PREFERRED_MODELS).ok();
    for model in &models {
        let name = model.name.as_deref().unwrap_or("<unnamed>");
        if picked.as_deref() == Some(model.id.as_str()) {
            println!("{}  {} {}", model.id, name.bold(), "(default)".green());
        } else {
            println!("{}  {}", model.id, name);
        }
    }
    eprintln!("{} {} model(s)", "models:".cyan().bold(), models.len());
    Ok(())
}
