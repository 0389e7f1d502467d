//! Clean command handler.

use super::open_context;
use ankivec_core::{config::AppConfig, AppResult};
use clap::Args;

/// Remove every indexed vector; the next sync re-embeds the whole collection
#[derive(Args, Debug)]
pub struct CleanCommand {}

impl CleanCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing clean command");

        let mut context = open_context(config).await?;
        context.engine_mut().reset()?;

        println!("Index cleared for {}", context.collection_path().display());

        Ok(())
    }
}
