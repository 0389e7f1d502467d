//! Process-level configuration for ankivec.
//!
//! This module handles loading and merging the settings that decide *where*
//! ankivec works, from multiple sources:
//! - Environment variables
//! - Command-line flags
//!
//! The per-collection search settings (model, limits, embedding host) live in
//! [`crate::addon`] and are persisted next to the collection.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the host collection database (contains the `notes` table)
    pub collection: Option<PathBuf>,

    /// Directory holding persisted add-on settings
    pub config_dir: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

impl AppConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// Environment variables:
    /// - `ANKIVEC_COLLECTION`: Path to the collection database
    /// - `ANKIVEC_CONFIG_DIR`: Directory for persisted add-on settings
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(collection) = std::env::var("ANKIVEC_COLLECTION") {
            config.collection = Some(PathBuf::from(collection));
        }

        if let Ok(config_dir) = std::env::var("ANKIVEC_CONFIG_DIR") {
            config.config_dir = Some(PathBuf::from(config_dir));
        }

        config.log_level = std::env::var("RUST_LOG").ok();

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables.
    pub fn with_overrides(
        mut self,
        collection: Option<PathBuf>,
        config_dir: Option<PathBuf>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(collection) = collection {
            self.collection = Some(collection);
        }

        if let Some(config_dir) = config_dir {
            self.config_dir = Some(config_dir);
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Path to the collection database, which must exist.
    pub fn collection_path(&self) -> AppResult<&Path> {
        let path = self.collection.as_deref().ok_or_else(|| {
            AppError::Config(
                "No collection configured. Pass --collection or set ANKIVEC_COLLECTION"
                    .to_string(),
            )
        })?;

        if !path.exists() {
            return Err(AppError::Config(format!(
                "Collection database does not exist: {:?}",
                path
            )));
        }

        Ok(path)
    }

    /// Directory for persisted add-on settings.
    ///
    /// Defaults to the directory containing the collection.
    pub fn settings_dir(&self) -> AppResult<PathBuf> {
        if let Some(ref dir) = self.config_dir {
            return Ok(dir.clone());
        }

        let collection = self.collection_path()?;
        Ok(collection
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.collection.is_none());
        assert!(!config.verbose);
        assert!(!config.no_color);
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            Some(PathBuf::from("/tmp/collection.anki2")),
            None,
            None,
            true,
            false,
        );

        assert_eq!(
            overridden.collection,
            Some(PathBuf::from("/tmp/collection.anki2"))
        );
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_explicit_log_level_wins_over_verbose() {
        let overridden =
            AppConfig::default().with_overrides(None, None, Some("warn".into()), true, false);
        assert_eq!(overridden.log_level, Some("warn".to_string()));
    }

    #[test]
    fn test_missing_collection_is_config_error() {
        let config = AppConfig::default();
        assert!(matches!(config.collection_path(), Err(AppError::Config(_))));

        let config = AppConfig::default().with_overrides(
            Some(PathBuf::from("/definitely/not/here.anki2")),
            None,
            None,
            false,
            false,
        );
        assert!(config.collection_path().is_err());
    }

    #[test]
    fn test_settings_dir_defaults_to_collection_parent() {
        let temp = TempDir::new().unwrap();
        let collection = temp.path().join("collection.anki2");
        std::fs::write(&collection, b"").unwrap();

        let config =
            AppConfig::default().with_overrides(Some(collection), None, None, false, false);
        assert_eq!(config.settings_dir().unwrap(), temp.path());
    }
}
