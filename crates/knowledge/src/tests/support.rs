//! Test doubles shared by the scenario tests.

use crate::config::SyncOptions;
use crate::note_store::SqliteNoteStore;
use crate::progress::CancellationToken;
use crate::sqlite_index::SqliteVectorIndex;
use crate::sync::SyncEngine;
use crate::types::{IndexMetadata, NoteId};
use crate::vector_index::VectorIndex;
use ankivec_core::{AppError, AppResult};
use ankivec_embed::{EmbeddingClient, HashingEmbedder};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Kind of failure to inject into an embedding call.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Failure {
    Embedding,
    Unavailable,
    ModelNotFound,
}

impl Failure {
    fn to_error(self, model: &str) -> AppError {
        match self {
            Failure::Embedding => AppError::Embedding("model returned garbage".to_string()),
            Failure::Unavailable => AppError::ServiceUnavailable("connection refused".to_string()),
            Failure::ModelNotFound => AppError::ModelNotFound {
                model: model.to_string(),
            },
        }
    }
}

/// Hashing embedder that counts calls and can fail or cancel on chosen calls.
///
/// Call numbers are 1-based and count every `embed` invocation, including
/// probes and single-note embeds.
pub(crate) struct ScriptedEmbedder {
    inner: HashingEmbedder,
    calls: AtomicUsize,
    batch_sizes: Mutex<Vec<usize>>,
    failures: Mutex<HashMap<usize, Failure>>,
    cancel_on: Mutex<Option<(usize, CancellationToken)>>,
}

impl ScriptedEmbedder {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: HashingEmbedder::default(),
            calls: AtomicUsize::new(0),
            batch_sizes: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            cancel_on: Mutex::new(None),
        })
    }

    pub(crate) fn fail_call(&self, call: usize, failure: Failure) {
        self.failures.lock().unwrap().insert(call, failure);
    }

    pub(crate) fn cancel_on_call(&self, call: usize, token: CancellationToken) {
        *self.cancel_on.lock().unwrap() = Some((call, token));
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl EmbeddingClient for ScriptedEmbedder {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn embed(&self, model: &str, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.batch_sizes.lock().unwrap().push(texts.len());

        let cancel_on = self.cancel_on.lock().unwrap().clone();
        if let Some((on, token)) = cancel_on {
            if on == call {
                token.cancel();
            }
        }

        let failure = self.failures.lock().unwrap().get(&call).copied();
        if let Some(failure) = failure {
            return Err(failure.to_error(model));
        }

        self.inner.embed(model, texts).await
    }
}

/// Index whose writes always fail.
pub(crate) struct BrokenIndex {
    inner: SqliteVectorIndex,
}

impl BrokenIndex {
    pub(crate) fn new() -> Self {
        Self {
            inner: SqliteVectorIndex::open_in_memory().unwrap(),
        }
    }
}

impl VectorIndex for BrokenIndex {
    fn upsert(&mut self, _id: NoteId, _vector: &[f32]) -> AppResult<()> {
        Err(AppError::Index("disk full".to_string()))
    }

    fn upsert_batch(&mut self, _entries: &[(NoteId, Vec<f32>)]) -> AppResult<()> {
        Err(AppError::Index("disk full".to_string()))
    }

    fn delete(&mut self, ids: &[NoteId]) -> AppResult<()> {
        self.inner.delete(ids)
    }

    fn query_nearest(&self, vector: &[f32], k: usize) -> AppResult<Vec<(NoteId, f32)>> {
        self.inner.query_nearest(vector, k)
    }

    fn metadata(&self) -> AppResult<IndexMetadata> {
        self.inner.metadata()
    }

    fn set_metadata(&mut self, metadata: &IndexMetadata) -> AppResult<()> {
        self.inner.set_metadata(metadata)
    }

    fn recreate(&mut self, metadata: &IndexMetadata) -> AppResult<()> {
        self.inner.recreate(metadata)
    }

    fn count(&self) -> AppResult<usize> {
        self.inner.count()
    }
}

/// Options with empty prefixes so stored and query texts embed identically.
pub(crate) fn plain_options(model: &str, batch_size: usize) -> SyncOptions {
    SyncOptions {
        batch_size,
        document_prefix: String::new(),
        query_prefix: String::new(),
        ..SyncOptions::for_model(model)
    }
}

pub(crate) fn engine_for(
    collection: &Path,
    index: Box<dyn VectorIndex>,
    client: Arc<dyn EmbeddingClient>,
    options: SyncOptions,
) -> SyncEngine {
    let notes = SqliteNoteStore::open(collection).unwrap();
    SyncEngine::new(client, index, Box::new(notes), options)
}

pub(crate) fn memory_index() -> Box<dyn VectorIndex> {
    Box::new(SqliteVectorIndex::open_in_memory().unwrap())
}
