//! Command handlers for the ankivec CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod clean;
pub mod config;
pub mod search;
pub mod stats;
pub mod sync;

// Re-export command types for convenience
pub use clean::CleanCommand;
pub use config::ConfigCommand;
pub use search::{RewriteCommand, SearchCommand};
pub use stats::StatsCommand;
pub use sync::SyncCommand;

use ankivec_core::{config::AppConfig, AppResult, FileConfigStore};
use ankivec_knowledge::AppContext;

/// Load settings and open the index for the configured collection.
pub(crate) async fn open_context(config: &AppConfig) -> AppResult<AppContext> {
    let collection = config.collection_path()?;
    let mut store = FileConfigStore::new(config.settings_dir()?);
    AppContext::initialize(&mut store, collection).await
}
