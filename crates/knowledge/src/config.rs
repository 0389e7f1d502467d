//! Sync settings and on-disk locations.

use crate::types::NoteRecord;
use ankivec_core::AddonConfig;
use std::path::{Path, PathBuf};

/// Directory created next to the collection to hold the vector index.
pub const INDEX_DIR_NAME: &str = "ankivec_index";

/// Tunables for the sync engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOptions {
    /// Embedding model name
    pub model_name: String,

    /// Notes per embedding request
    pub batch_size: usize,

    /// Separator between the fields of a stored note
    pub field_separator: char,

    /// Marker prepended to note text
    pub document_prefix: String,

    /// Marker prepended to query text
    pub query_prefix: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::from_addon(&AddonConfig::default())
    }
}

impl SyncOptions {
    pub fn from_addon(config: &AddonConfig) -> Self {
        Self {
            model_name: config.model_name.clone(),
            batch_size: config.batch_size.max(1),
            field_separator: config.field_separator,
            document_prefix: config.document_prefix.clone(),
            query_prefix: config.query_prefix.clone(),
        }
    }

    /// Options for `model_name` with every other setting at its default.
    pub fn for_model(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            ..Default::default()
        }
    }

    /// Text sent to the model for a stored note.
    pub fn document_text(&self, record: &NoteRecord) -> String {
        format!(
            "{}{}",
            self.document_prefix,
            record.joined_text(self.field_separator)
        )
    }

    /// Text sent to the model for a search.
    pub fn query_text(&self, query: &str) -> String {
        format!("{}{}", self.query_prefix, query)
    }
}

/// Get the index directory for a collection.
pub fn get_index_dir(collection_path: &Path) -> PathBuf {
    collection_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(INDEX_DIR_NAME)
}

/// Get the SQLite index path for a collection.
pub fn get_index_path(collection_path: &Path) -> PathBuf {
    get_index_dir(collection_path).join("index.sqlite")
}

/// Get the LanceDB directory for a collection.
pub fn get_lancedb_path(collection_path: &Path) -> PathBuf {
    get_index_dir(collection_path).join("lancedb")
}
