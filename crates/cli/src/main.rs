//! Ankivec CLI
//!
//! Main entry point for the ankivec command-line tool.
//! Syncs a collection's notes into the vector index and runs semantic
//! searches against it without the host application.

mod commands;

use ankivec_core::{config::AppConfig, logging, AppResult};
use clap::{Parser, Subcommand};
use commands::{
    CleanCommand, ConfigCommand, RewriteCommand, SearchCommand, StatsCommand, SyncCommand,
};
use std::path::PathBuf;

/// Ankivec CLI - semantic search for flashcard collections
#[derive(Parser, Debug)]
#[command(name = "ankivec")]
#[command(about = "Semantic search for flashcard collections", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the collection database
    #[arg(short, long, global = true, env = "ANKIVEC_COLLECTION")]
    collection: Option<PathBuf>,

    /// Directory holding the add-on settings (default: collection directory)
    #[arg(long, global = true, env = "ANKIVEC_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Embed notes changed since the last sync
    Sync(SyncCommand),

    /// Search notes by meaning
    Search(SearchCommand),

    /// Rewrite a host search string containing `vec:`
    Rewrite(RewriteCommand),

    /// Show index statistics
    Stats(StatsCommand),

    /// Remove every indexed vector
    Clean(CleanCommand),

    /// Show the effective add-on settings
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    let config = AppConfig::load()?.with_overrides(
        cli.collection,
        cli.config_dir,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::debug!("Collection: {:?}", config.collection);

    let command_name = match &cli.command {
        Commands::Sync(_) => "sync",
        Commands::Search(_) => "search",
        Commands::Rewrite(_) => "rewrite",
        Commands::Stats(_) => "stats",
        Commands::Clean(_) => "clean",
        Commands::Config(_) => "config",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Sync(cmd) => cmd.execute(&config).await,
        Commands::Search(cmd) => cmd.execute(&config).await,
        Commands::Rewrite(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
        Commands::Clean(cmd) => cmd.execute(&config).await,
        Commands::Config(cmd) => cmd.execute(&config),
    };

    match &result {
        Ok(_) => tracing::debug!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_with_global_flags() {
        let cli = Cli::try_parse_from([
            "ankivec",
            "search",
            "kitchen tools",
            "-k",
            "5",
            "--json",
            "--collection",
            "/tmp/collection.anki2",
        ])
        .unwrap();

        assert_eq!(cli.collection, Some(PathBuf::from("/tmp/collection.anki2")));
        match cli.command {
            Commands::Search(cmd) => {
                assert_eq!(cmd.query, "kitchen tools");
                assert_eq!(cmd.limit, Some(5));
                assert!(cmd.json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rewrite_keeps_raw_string() {
        let cli = Cli::try_parse_from(["ankivec", "rewrite", "deck:French vec:animals"]).unwrap();
        match cli.command {
            Commands::Rewrite(cmd) => assert_eq!(cmd.raw, "deck:French vec:animals"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["ankivec"]).is_err());
    }
}
