//! Sync engine: keeps the vector index consistent with the note store.
//!
//! The engine owns the incremental reconcile (watermark-based change
//! detection, batched embedding, model-change reset) and the single-note
//! operations used by change notifications and search.

use crate::config::SyncOptions;
use crate::note_store::NoteStore;
use crate::progress::{CancellationToken, ProgressReporter};
use crate::types::{IndexMetadata, IndexStats, Note, NoteId, NoteRecord, ReconcileStats};
use crate::vector_index::VectorIndex;
use ankivec_core::{AppError, AppResult};
use ankivec_embed::EmbeddingClient;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

/// Keeps a [`VectorIndex`] in step with a [`NoteStore`].
pub struct SyncEngine {
    client: Arc<dyn EmbeddingClient>,
    index: Box<dyn VectorIndex>,
    notes: Box<dyn NoteStore>,
    options: SyncOptions,
    progress: ProgressReporter,
    cancel: CancellationToken,
}

impl SyncEngine {
    pub fn new(
        client: Arc<dyn EmbeddingClient>,
        index: Box<dyn VectorIndex>,
        notes: Box<dyn NoteStore>,
        options: SyncOptions,
    ) -> Self {
        Self {
            client,
            index,
            notes,
            options,
            progress: ProgressReporter::noop(),
            cancel: CancellationToken::new(),
        }
    }

    /// Report reconcile progress through `progress`.
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Stop reconciles when `cancel` is triggered.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn set_progress(&mut self, progress: ProgressReporter) {
        self.progress = progress;
    }

    /// Token checked between reconcile batches.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn index(&self) -> &dyn VectorIndex {
        self.index.as_ref()
    }

    /// Bring the index up to date with every note modified since the last
    /// committed watermark.
    ///
    /// Connectivity failures abort the run and are returned; batches that
    /// fail for any other embedding reason are skipped and counted. Whatever
    /// was committed before an abort stays committed. Each call starts with
    /// a cleared cancellation token, so a cancelled run resumes from the
    /// committed watermark on the next call.
    pub async fn reconcile(&mut self) -> AppResult<ReconcileStats> {
        self.cancel.reset();
        let start = Instant::now();
        let model = self.options.model_name.clone();
        let mut stats = ReconcileStats::default();

        let metadata = self.index.metadata()?;
        let mut watermark = metadata.watermark;

        if metadata.model_name.as_deref() != Some(model.as_str()) {
            match &metadata.model_name {
                Some(previous) => tracing::info!(
                    "Embedding model changed from '{}' to '{}', rebuilding index",
                    previous,
                    model
                ),
                None => tracing::info!("Initializing index for model '{}'", model),
            }
            self.index.recreate(&IndexMetadata::new(model.as_str(), 0))?;
            self.progress.reset(metadata.model_name.as_deref(), &model);
            stats.model_reset = metadata.model_name.is_some();
            watermark = 0;
        }

        let (changed, _) = self.notes.count_and_max_mod(watermark)?;
        self.progress.check(changed, watermark);
        stats.notes_changed = changed;
        stats.watermark = watermark;

        if changed == 0 {
            tracing::debug!("Index is up to date (watermark {})", watermark);
            stats.duration_secs = start.elapsed().as_secs_f64();
            return Ok(stats);
        }

        let records = self.notes.select_notes(watermark)?;
        let total = records.len() as u64;
        let batch_size = self.options.batch_size.max(1);
        let mut committed = watermark;
        let mut contiguous = true;
        let mut processed = 0u64;

        tracing::info!(
            "Embedding {} changed notes in batches of {} with '{}'",
            total,
            batch_size,
            model
        );

        for (batch_no, batch) in records.chunks(batch_size).enumerate() {
            if self.cancel.is_cancelled() {
                tracing::info!("Reconcile cancelled after {} of {} notes", processed, total);
                stats.cancelled = true;
                break;
            }

            stats.embed_calls += 1;
            match self.embed_batch(batch).await {
                Ok(entries) => {
                    self.index.upsert_batch(&entries)?;
                    stats.notes_indexed += entries.len() as u64;

                    if contiguous {
                        let next_mod = records
                            .get((batch_no + 1) * batch_size)
                            .map(|r| r.mod_time);
                        let candidate = batch_watermark(batch, next_mod);
                        if candidate > committed {
                            committed = candidate;
                            self.index
                                .set_metadata(&IndexMetadata::new(model.as_str(), committed))?;
                        }
                    }
                }
                Err(err) if err.is_connectivity() => {
                    tracing::error!("Aborting reconcile: {}", err);
                    self.index.flush()?;
                    return Err(err);
                }
                Err(err) => {
                    tracing::warn!(
                        "Skipping batch {} ({} notes): {}",
                        batch_no + 1,
                        batch.len(),
                        err
                    );
                    stats.failed_batches += 1;
                    contiguous = false;
                }
            }

            processed += batch.len() as u64;
            self.progress.embed(processed, total, &model);
        }

        self.index.flush()?;

        stats.watermark = committed;
        stats.duration_secs = start.elapsed().as_secs_f64();

        tracing::info!(
            "Reconcile finished: {} indexed, {} failed batches, watermark {} in {:.2}s",
            stats.notes_indexed,
            stats.failed_batches,
            stats.watermark,
            stats.duration_secs
        );

        Ok(stats)
    }

    async fn embed_batch(&self, batch: &[NoteRecord]) -> AppResult<Vec<(NoteId, Vec<f32>)>> {
        let texts: Vec<String> = batch
            .iter()
            .map(|record| self.options.document_text(record))
            .collect();

        let vectors = self.client.embed(&self.options.model_name, &texts).await?;
        if vectors.len() != batch.len() {
            return Err(AppError::Embedding(format!(
                "Expected {} embeddings, got {}",
                batch.len(),
                vectors.len()
            )));
        }

        Ok(batch.iter().map(|r| r.id).zip(vectors).collect())
    }

    /// Ids of up to `limit` notes most similar to `query`, nearest first.
    pub async fn search(&self, query: &str, limit: usize) -> AppResult<Vec<NoteId>> {
        let scored = self.search_scored(query, limit).await?;
        Ok(scored.into_iter().map(|(id, _)| id).collect())
    }

    /// Like [`SyncEngine::search`], with the cosine similarity of each hit.
    pub async fn search_scored(&self, query: &str, limit: usize) -> AppResult<Vec<(NoteId, f32)>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let text = self.options.query_text(query);
        let vector = self
            .client
            .embed_one(&self.options.model_name, &text)
            .await?;

        let results = self.index.query_nearest(&vector, limit)?;
        tracing::debug!("Semantic search for {:?} returned {} notes", query, results.len());
        Ok(results)
    }

    /// Embed and store a single note. The watermark is left alone.
    pub async fn upsert_one(&mut self, note: &Note) -> AppResult<()> {
        let text = format!("{}{}", self.options.document_prefix, note.joined_text());
        let vector = self
            .client
            .embed_one(&self.options.model_name, &text)
            .await?;

        self.index.upsert(note.id, &vector)?;
        tracing::debug!("Indexed note {}", note.id);
        Ok(())
    }

    /// Remove notes from the index; unknown ids are ignored.
    pub fn delete(&mut self, ids: &[NoteId]) -> AppResult<()> {
        self.index.delete(ids)
    }

    /// Probe the embedding backend with the configured model.
    pub async fn check_service(&self) -> AppResult<()> {
        self.client.probe(&self.options.model_name).await?;
        tracing::debug!(
            "Embedding service '{}' is ready with model '{}'",
            self.client.provider_name(),
            self.options.model_name
        );
        Ok(())
    }

    pub fn stats(&self) -> AppResult<IndexStats> {
        let metadata = self.index.metadata()?;
        Ok(IndexStats {
            entries: self.index.count()?,
            model_name: metadata.model_name,
            watermark: metadata.watermark,
            db_size_bytes: self.index.size_bytes(),
            collected_at: Utc::now(),
        })
    }

    /// Drop every entry; the next reconcile re-embeds the whole collection.
    pub fn reset(&mut self) -> AppResult<()> {
        self.index
            .recreate(&IndexMetadata::new(self.options.model_name.as_str(), 0))?;
        tracing::info!("Index cleared");
        Ok(())
    }

    pub fn flush(&mut self) -> AppResult<()> {
        self.index.flush()
    }
}

/// Watermark that may be committed once `batch` is indexed.
///
/// Notes sharing a modification time can straddle a batch boundary. In that
/// case the shared time is not yet fully covered, so commit one below it.
fn batch_watermark(batch: &[NoteRecord], next_mod: Option<i64>) -> i64 {
    let batch_max = batch.iter().map(|r| r.mod_time).max().unwrap_or(i64::MIN);
    match next_mod {
        Some(next) if next <= batch_max => batch_max - 1,
        _ => batch_max,
    }
}
