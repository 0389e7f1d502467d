//! Shared type definitions for notes, index metadata and sync results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a note, assigned by the host collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(pub i64);

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for NoteId {
    fn from(id: i64) -> Self {
        NoteId(id)
    }
}

/// A note as delivered by host change notifications.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: NoteId,

    /// Field values in display order
    pub fields: Vec<String>,

    /// Modification timestamp
    pub mod_time: i64,
}

impl Note {
    /// All fields joined by a single space.
    pub fn joined_text(&self) -> String {
        self.fields.join(" ")
    }
}

/// A row of the host note store.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteRecord {
    pub id: NoteId,

    /// Field values joined by the reserved separator
    pub flds: String,

    /// Modification timestamp
    pub mod_time: i64,
}

impl NoteRecord {
    /// Split on `separator` and rejoin with single spaces.
    pub fn joined_text(&self, separator: char) -> String {
        self.flds.split(separator).collect::<Vec<_>>().join(" ")
    }
}

/// Index-level metadata stored alongside all entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Model that produced every current entry
    pub model_name: Option<String>,

    /// Highest note modification time reflected in the index
    pub watermark: i64,
}

impl IndexMetadata {
    pub fn new(model_name: impl Into<String>, watermark: i64) -> Self {
        Self {
            model_name: Some(model_name.into()),
            watermark,
        }
    }
}

/// Summary of one reconcile run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcileStats {
    /// Notes modified after the starting watermark
    pub notes_changed: u64,

    /// Notes whose vectors were written to the index
    pub notes_indexed: u64,

    /// Embedding requests issued
    pub embed_calls: u32,

    /// Batches skipped because embedding failed
    pub failed_batches: u32,

    /// Whether the index was purged because the model changed
    pub model_reset: bool,

    /// Whether the run stopped early on request
    pub cancelled: bool,

    /// Watermark persisted at the end of the run
    pub watermark: i64,

    /// Duration in seconds
    pub duration_secs: f64,
}

/// Statistics for the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of indexed notes
    pub entries: usize,

    /// Model recorded in the index metadata
    pub model_name: Option<String>,

    /// Persisted watermark
    pub watermark: i64,

    /// Index size on disk, when the backend is file-based
    pub db_size_bytes: Option<u64>,

    /// When the stats were collected
    pub collected_at: DateTime<Utc>,
}
