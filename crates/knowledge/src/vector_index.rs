//! Vector index abstraction.
//!
//! Defines a trait for backend-agnostic storage of one vector per note plus a
//! small metadata record describing the whole index.

use crate::types::{IndexMetadata, NoteId};
use ankivec_core::AppResult;

/// Trait for vector index backends.
///
/// Implementations must support:
/// - Upserting one vector per note id (later writes overwrite)
/// - Deleting entries by note id
/// - Nearest-neighbour lookup by cosine similarity
/// - Reading and writing the index metadata
/// - Recreating the index from scratch
///
/// The vector dimension is fixed by the first entry written after creation
/// or [`VectorIndex::recreate`]; writing a vector of another dimension fails.
pub trait VectorIndex: Send {
    /// Insert or overwrite the vector for `id`.
    fn upsert(&mut self, id: NoteId, vector: &[f32]) -> AppResult<()>;

    /// Insert or overwrite several entries.
    fn upsert_batch(&mut self, entries: &[(NoteId, Vec<f32>)]) -> AppResult<()> {
        for (id, vector) in entries {
            self.upsert(*id, vector)?;
        }
        Ok(())
    }

    /// Remove entries; ids without an entry are ignored.
    fn delete(&mut self, ids: &[NoteId]) -> AppResult<()>;

    /// Up to `k` entries closest to `vector`, nearest first, with their
    /// cosine similarity.
    fn query_nearest(&self, vector: &[f32], k: usize) -> AppResult<Vec<(NoteId, f32)>>;

    /// Current index metadata (default when never written).
    fn metadata(&self) -> AppResult<IndexMetadata>;

    /// Replace the index metadata.
    fn set_metadata(&mut self, metadata: &IndexMetadata) -> AppResult<()>;

    /// Drop every entry and the metadata, then store `metadata`.
    fn recreate(&mut self, metadata: &IndexMetadata) -> AppResult<()>;

    /// Number of entries.
    fn count(&self) -> AppResult<usize>;

    /// Size of the index on disk, for backends that can tell.
    fn size_bytes(&self) -> Option<u64> {
        None
    }

    /// Commit any pending changes (for backends that buffer writes).
    fn flush(&mut self) -> AppResult<()> {
        // Default implementation does nothing
        Ok(())
    }
}

/// Calculate cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Sort by similarity descending, ties by id, and keep the first `k`.
pub(crate) fn rank(mut scored: Vec<(NoteId, f32)>, k: usize) -> Vec<(NoteId, f32)> {
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    scored.truncate(k);
    scored
}
