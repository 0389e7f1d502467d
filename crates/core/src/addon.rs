//! Per-collection add-on settings.
//!
//! Settings are stored by key in a [`ConfigStore`]. On first load the stored
//! values (or the values under the legacy key) are merged over the defaults
//! and written straight back, so every later load sees a complete set.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Key the settings are persisted under.
pub const ADDON_ID: &str = "1516019916";

/// Key used by releases that stored settings under the add-on name.
pub const LEGACY_CONFIG_KEY: &str = "ankivec";

/// Reserved separator between the fields of a note.
pub const DEFAULT_FIELD_SEPARATOR: char = '\u{1f}';

/// Search settings for one collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AddonConfig {
    /// Embedding model name as known to the embedding backend
    pub model_name: String,

    /// Maximum number of notes a semantic query contributes
    pub search_results_limit: usize,

    /// Base URL of the Ollama-compatible embedding service
    pub ollama_host: String,

    /// Embedding provider: "ollama" or "hashing"
    pub provider: String,

    /// Notes per embedding request during reconcile
    pub batch_size: usize,

    /// Separator between the fields of a stored note
    pub field_separator: char,

    /// Marker prepended to note text before embedding
    pub document_prefix: String,

    /// Marker prepended to search text before embedding
    pub query_prefix: String,

    /// Field name used when rewriting results into the host's filter syntax
    pub id_field: String,

    /// Optional per-request timeout for the embedding service
    pub request_timeout_secs: Option<u64>,

    /// Vector index backend: "sqlite" or "lancedb"
    pub index_backend: String,
}

impl Default for AddonConfig {
    fn default() -> Self {
        Self {
            model_name: "nomic-embed-text".to_string(),
            search_results_limit: 20,
            ollama_host: "http://localhost:11434".to_string(),
            provider: "ollama".to_string(),
            batch_size: 128,
            field_separator: DEFAULT_FIELD_SEPARATOR,
            document_prefix: "search_document: ".to_string(),
            query_prefix: "search_query: ".to_string(),
            id_field: "id".to_string(),
            request_timeout_secs: None,
            index_backend: "sqlite".to_string(),
        }
    }
}

impl AddonConfig {
    /// Check that the settings can drive a sync.
    pub fn validate(&self) -> AppResult<()> {
        if self.model_name.trim().is_empty() {
            return Err(AppError::Config("model_name must not be empty".to_string()));
        }

        if self.search_results_limit == 0 {
            return Err(AppError::Config(
                "search_results_limit must be a positive integer".to_string(),
            ));
        }

        if self.batch_size == 0 {
            return Err(AppError::Config(
                "batch_size must be a positive integer".to_string(),
            ));
        }

        if !matches!(self.index_backend.as_str(), "sqlite" | "lancedb") {
            return Err(AppError::Config(format!(
                "Unknown index_backend '{}'. Supported backends: sqlite, lancedb",
                self.index_backend
            )));
        }

        url::Url::parse(&self.ollama_host).map_err(|e| {
            AppError::Config(format!("Invalid ollama_host '{}': {}", self.ollama_host, e))
        })?;

        Ok(())
    }
}

/// Key-value persistence for add-on settings, as provided by the host.
pub trait ConfigStore {
    /// Read the settings stored under `key`, if any.
    fn read(&self, key: &str) -> AppResult<Option<Value>>;

    /// Replace the settings stored under `key`.
    fn write(&mut self, key: &str, value: &Value) -> AppResult<()>;
}

/// Stores each key as `<dir>/<key>.yaml`.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    dir: PathBuf,
}

impl FileConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.yaml", key))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ConfigStore for FileConfigStore {
    fn read(&self, key: &str) -> AppResult<Option<Value>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            AppError::Config(format!("Failed to read config at {:?}: {}", path, e))
        })?;

        let value: Value = serde_yaml::from_str(&content).map_err(|e| {
            AppError::Config(format!("Failed to parse config at {:?}: {}", path, e))
        })?;

        // An empty file parses as null
        Ok(match value {
            Value::Null => None,
            other => Some(other),
        })
    }

    fn write(&mut self, key: &str, value: &Value) -> AppResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            AppError::Config(format!("Failed to create config directory: {}", e))
        })?;

        let path = self.path_for(key);
        let yaml = serde_yaml::to_string(value)?;
        fs::write(&path, yaml).map_err(|e| {
            AppError::Config(format!("Failed to write config to {:?}: {}", path, e))
        })?;

        tracing::debug!("Saved add-on config '{}' to {:?}", key, path);
        Ok(())
    }
}

/// Load the add-on settings, merging stored values over the defaults.
///
/// Lookup order is [`ADDON_ID`], then [`LEGACY_CONFIG_KEY`], then defaults.
/// The merged settings are persisted under [`ADDON_ID`] before returning.
/// Unknown stored keys are preserved in the persisted copy.
pub fn load_addon_config(store: &mut dyn ConfigStore) -> AppResult<AddonConfig> {
    let stored = match store.read(ADDON_ID)? {
        Some(value) => Some(value),
        None => {
            let legacy = store.read(LEGACY_CONFIG_KEY)?;
            if legacy.is_some() {
                tracing::info!(
                    "Migrating add-on config from legacy key '{}'",
                    LEGACY_CONFIG_KEY
                );
            }
            legacy
        }
    };

    let mut merged = match serde_yaml::to_value(AddonConfig::default())? {
        Value::Mapping(map) => map,
        _ => Mapping::new(),
    };

    match stored {
        Some(Value::Mapping(map)) => {
            for (key, value) in map {
                merged.insert(key, value);
            }
        }
        Some(other) => {
            return Err(AppError::Config(format!(
                "Stored add-on config must be a mapping, found: {:?}",
                other
            )));
        }
        None => {
            tracing::debug!("No stored add-on config, using defaults");
        }
    }

    let merged = Value::Mapping(merged);
    let config: AddonConfig = serde_yaml::from_value(merged.clone())
        .map_err(|e| AppError::Config(format!("Invalid add-on config: {}", e)))?;
    config.validate()?;

    store.write(ADDON_ID, &merged)?;

    Ok(config)
}
