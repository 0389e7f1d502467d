//! Config command handler.

use ankivec_core::{config::AppConfig, load_addon_config, AppResult, FileConfigStore};
use clap::Args;

/// Show the effective add-on settings
#[derive(Args, Debug)]
pub struct ConfigCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ConfigCommand {
    /// Load (and persist) the merged settings, then print them.
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let mut store = FileConfigStore::new(config.settings_dir()?);
        let addon = load_addon_config(&mut store)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&addon)?);
        } else {
            print!("{}", serde_yaml::to_string(&addon)?);
            eprintln!("(from {})", store.dir().display());
        }

        Ok(())
    }
}
