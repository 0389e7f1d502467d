//! Semantic search over a flashcard collection.
//!
//! Keeps a vector index of note embeddings in step with the collection's
//! note table and turns `vec:` search clauses into note-id filters the host
//! can evaluate.

pub mod config;
pub mod coordinator;
#[cfg(feature = "lancedb")]
pub mod lancedb_index;
pub mod note_store;
pub mod progress;
pub mod query;
pub mod sqlite_index;
pub mod sync;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use config::SyncOptions;
pub use coordinator::{open_index, AppContext, NoteEventOutcome, SyncCoordinator};
#[cfg(feature = "lancedb")]
pub use lancedb_index::LanceDbVectorIndex;
pub use note_store::{NoteStore, SqliteNoteStore};
pub use progress::{CancellationToken, ProgressEvent, ProgressReporter};
pub use query::{ParsedQuery, QueryRewriter};
pub use sqlite_index::SqliteVectorIndex;
pub use sync::SyncEngine;
pub use types::{IndexMetadata, IndexStats, Note, NoteId, NoteRecord, ReconcileStats};
pub use vector_index::VectorIndex;
