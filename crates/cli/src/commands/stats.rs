//! Stats command handler.
//!
//! Handles index statistics display.

use super::open_context;
use ankivec_core::{config::AppConfig, AppResult};
use clap::Args;

/// Show index statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let context = open_context(config).await?;
        let stats = context.engine().stats()?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!("Collection: {}", context.collection_path().display());
            println!("  Entries: {}", stats.entries);
            println!(
                "  Model: {}",
                stats.model_name.as_deref().unwrap_or("(not synced)")
            );
            println!("  Watermark: {}", stats.watermark);
            if let Some(size) = stats.db_size_bytes {
                println!("  DB size: {} bytes", size);
            }
        }

        Ok(())
    }
}
