//! Search and rewrite command handlers.

use super::open_context;
use ankivec_core::{config::AppConfig, AppResult};
use ankivec_knowledge::SyncCoordinator;
use clap::Args;

/// Search notes by meaning
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Query text
    pub query: String,

    /// Number of notes to return (default: search_results_limit)
    #[arg(short = 'k', long)]
    pub limit: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing search command");

        let context = open_context(config).await?;
        let limit = self
            .limit
            .unwrap_or(context.config().search_results_limit);

        let results = context.engine().search_scored(&self.query, limit).await?;

        if self.json {
            let output: Vec<_> = results
                .iter()
                .map(|(id, score)| serde_json::json!({ "id": id, "score": score }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else if results.is_empty() {
            println!("No matching notes (has the collection been synced?)");
        } else {
            for (id, score) in &results {
                println!("{}\t{:.4}", id, score);
            }
        }

        Ok(())
    }
}

/// Rewrite a host search string containing `vec:`
#[derive(Args, Debug)]
pub struct RewriteCommand {
    /// Raw search string, e.g. "deck:French vec:kitchen tools"
    pub raw: String,
}

impl RewriteCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing rewrite command");

        let coordinator = SyncCoordinator::new(open_context(config).await?);
        println!("{}", coordinator.rewrite_search(&self.raw).await?);

        Ok(())
    }
}
