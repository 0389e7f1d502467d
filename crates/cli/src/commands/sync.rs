//! Sync command handler.
//!
//! Brings the vector index up to date with the collection.

use super::open_context;
use ankivec_core::{config::AppConfig, AppResult};
use ankivec_knowledge::{ProgressEvent, ProgressReporter, SyncCoordinator};
use clap::Args;
use std::sync::Arc;

/// Embed notes changed since the last sync
#[derive(Args, Debug)]
pub struct SyncCommand {
    /// Hide progress lines
    #[arg(short, long)]
    pub quiet: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SyncCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing sync command");

        let mut context = open_context(config).await?;

        if !self.quiet {
            context
                .engine_mut()
                .set_progress(ProgressReporter::new(Arc::new(|event: ProgressEvent| {
                    eprintln!("{}", event.format_simple());
                })));
        }

        // Ctrl-C stops the sync between batches.
        let cancel = context.engine().cancellation_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("Cancelling after the current batch...");
                cancel.cancel();
            }
        });

        let mut coordinator = SyncCoordinator::new(context);
        let stats = coordinator.on_startup().await?;
        coordinator.shutdown()?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!(
                "Indexed {} of {} changed notes in {:.2}s ({} embedding calls)",
                stats.notes_indexed, stats.notes_changed, stats.duration_secs, stats.embed_calls
            );
            if stats.model_reset {
                println!("Index was rebuilt for a new embedding model");
            }
            if stats.failed_batches > 0 {
                println!(
                    "{} batches failed and will be retried on the next sync",
                    stats.failed_batches
                );
            }
            if stats.cancelled {
                println!("Sync cancelled; run it again to continue");
            }
        }

        Ok(())
    }
}
