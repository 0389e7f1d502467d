//! Wiring between host events and the sync engine.
//!
//! [`AppContext`] is built once per collection. [`SyncCoordinator`] is what a
//! host calls into: startup, note saves and deletions, search rewriting and
//! shutdown.

use crate::config::{get_index_path, SyncOptions};
use crate::note_store::SqliteNoteStore;
use crate::query::{ParsedQuery, QueryRewriter};
use crate::sqlite_index::SqliteVectorIndex;
use crate::sync::SyncEngine;
use crate::types::{Note, NoteId, ReconcileStats};
use crate::vector_index::VectorIndex;
use ankivec_core::{load_addon_config, AddonConfig, AppError, AppResult, ConfigStore};
use ankivec_embed::create_client;
use std::path::{Path, PathBuf};

/// Settings and sync engine for one open collection.
pub struct AppContext {
    config: AddonConfig,
    collection_path: PathBuf,
    engine: SyncEngine,
}

impl AppContext {
    /// Load settings, create the embedding client, then open the index and
    /// note store for `collection_path`.
    pub async fn initialize(store: &mut dyn ConfigStore, collection_path: &Path) -> AppResult<Self> {
        let config = load_addon_config(store)?;
        let client = create_client(&config)?;
        let index = open_index(&config, collection_path).await?;
        let notes = SqliteNoteStore::open(collection_path)?;

        tracing::info!(
            "Initialized semantic search for {:?} (model '{}', backend '{}')",
            collection_path,
            config.model_name,
            config.index_backend
        );

        let engine = SyncEngine::new(
            client,
            index,
            Box::new(notes),
            SyncOptions::from_addon(&config),
        );
        Ok(Self::from_parts(config, collection_path, engine))
    }

    /// Assemble a context from an already-built engine.
    pub fn from_parts(config: AddonConfig, collection_path: &Path, engine: SyncEngine) -> Self {
        Self {
            config,
            collection_path: collection_path.to_path_buf(),
            engine,
        }
    }

    pub fn config(&self) -> &AddonConfig {
        &self.config
    }

    pub fn collection_path(&self) -> &Path {
        &self.collection_path
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut SyncEngine {
        &mut self.engine
    }
}

/// Open the configured vector index backend for a collection.
pub async fn open_index(
    config: &AddonConfig,
    collection_path: &Path,
) -> AppResult<Box<dyn VectorIndex>> {
    match config.index_backend.as_str() {
        #[cfg(feature = "lancedb")]
        "lancedb" => {
            let path = crate::config::get_lancedb_path(collection_path);
            let index = crate::lancedb_index::LanceDbVectorIndex::open(&path).await?;
            Ok(Box::new(index))
        }
        #[cfg(not(feature = "lancedb"))]
        "lancedb" => Err(AppError::Config(
            "index_backend 'lancedb' requires building with the 'lancedb' feature".to_string(),
        )),
        _ => Ok(Box::new(SqliteVectorIndex::open(&get_index_path(
            collection_path,
        ))?)),
    }
}

/// Result of handling a single-note change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteEventOutcome {
    /// The note's vector was written.
    Indexed,

    /// Embedding failed; the next reconcile picks the note up.
    Skipped,
}

/// Entry points for host lifecycle and search events.
pub struct SyncCoordinator {
    context: AppContext,
    rewriter: QueryRewriter,
}

impl SyncCoordinator {
    pub fn new(context: AppContext) -> Self {
        let rewriter = QueryRewriter::new(context.config.id_field.as_str());
        Self { context, rewriter }
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut AppContext {
        &mut self.context
    }

    /// Check the embedding service, then catch the index up with the
    /// collection.
    pub async fn on_startup(&mut self) -> AppResult<ReconcileStats> {
        let engine = self.context.engine_mut();
        engine.check_service().await?;
        engine.reconcile().await
    }

    /// Index a note that was just saved.
    ///
    /// Embedding failures are logged and reported as
    /// [`NoteEventOutcome::Skipped`]; index failures are returned.
    pub async fn on_note_saved(&mut self, note: &Note) -> AppResult<NoteEventOutcome> {
        match self.context.engine_mut().upsert_one(note).await {
            Ok(()) => Ok(NoteEventOutcome::Indexed),
            Err(
                err @ (AppError::ServiceUnavailable(_)
                | AppError::ModelNotFound { .. }
                | AppError::Embedding(_)),
            ) => {
                tracing::warn!("Could not index note {}: {}", note.id, err);
                Ok(NoteEventOutcome::Skipped)
            }
            Err(err) => Err(err),
        }
    }

    pub fn on_notes_deleted(&mut self, ids: &[NoteId]) -> AppResult<()> {
        self.context.engine_mut().delete(ids)?;
        tracing::debug!("Removed {} deleted notes from the index", ids.len());
        Ok(())
    }

    /// Rewrite a host search string, resolving any `vec:` clause into note
    /// ids. Strings without the delimiter are returned unchanged.
    pub async fn rewrite_search(&self, raw: &str) -> AppResult<String> {
        let parsed = ParsedQuery::parse(raw);
        let ids = match parsed.semantic() {
            Some(query) => {
                self.context
                    .engine()
                    .search(query, self.context.config.search_results_limit)
                    .await?
            }
            None => return Ok(raw.to_string()),
        };

        Ok(self.rewriter.rewrite(&parsed, &ids))
    }

    /// Flush pending index writes.
    pub fn shutdown(&mut self) -> AppResult<()> {
        self.context.engine_mut().flush()?;
        tracing::debug!("Semantic search shut down");
        Ok(())
    }
}
