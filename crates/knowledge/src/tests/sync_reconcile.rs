//! Reconcile behaviour: change detection, batching, watermark commits and
//! failure containment.

use super::support::{engine_for, memory_index, plain_options, Failure, ScriptedEmbedder};
use crate::note_store::tests::{create_collection, create_collection_at};
use crate::progress::{CancellationToken, ProgressEvent, ProgressReporter};
use crate::sqlite_index::SqliteVectorIndex;
use crate::types::{Note, NoteId};
use ankivec_core::AppError;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn six_notes() -> Vec<(i64, &'static str, i64)> {
    vec![
        (1, "cat\u{1f}gato", 10),
        (2, "dog\u{1f}perro", 20),
        (3, "house\u{1f}casa", 30),
        (4, "tree\u{1f}arbol", 40),
        (5, "river\u{1f}rio", 50),
        (6, "bread\u{1f}pan", 60),
    ]
}

#[tokio::test]
async fn test_second_reconcile_makes_no_embedding_calls() {
    let collection = create_collection(&six_notes());
    let embedder = ScriptedEmbedder::new();
    let mut engine = engine_for(
        collection.path(),
        memory_index(),
        embedder.clone(),
        plain_options("m", 4),
    );

    let first = engine.reconcile().await.unwrap();
    assert_eq!(first.notes_changed, 6);
    assert_eq!(first.embed_calls, 2);
    assert_eq!(embedder.batch_sizes(), vec![4, 2]);

    let second = engine.reconcile().await.unwrap();
    assert_eq!(second.notes_changed, 0);
    assert_eq!(second.embed_calls, 0);
    assert_eq!(second.watermark, 60);
    assert_eq!(embedder.calls(), 2);
    assert_eq!(engine.index().count().unwrap(), 6);
}

#[tokio::test]
async fn test_reconcile_picks_up_new_and_edited_notes() {
    let collection = create_collection(&six_notes());
    let embedder = ScriptedEmbedder::new();
    let mut engine = engine_for(
        collection.path(),
        memory_index(),
        embedder.clone(),
        plain_options("m", 2),
    );

    let stats = engine.reconcile().await.unwrap();
    assert_eq!(stats.notes_indexed, 6);
    assert_eq!(stats.watermark, 60);
    assert_eq!(engine.index().metadata().unwrap().watermark, 60);

    create_collection_at(
        collection.path(),
        &[(2, "dog\u{1f}chien", 70), (7, "moon\u{1f}luna", 75)],
    );

    let stats = engine.reconcile().await.unwrap();
    assert_eq!(stats.notes_changed, 2);
    assert_eq!(stats.notes_indexed, 2);
    assert_eq!(stats.embed_calls, 1);
    assert_eq!(stats.watermark, 75);
    assert_eq!(engine.index().count().unwrap(), 7);

    let hits = engine.search("dog chien", 1).await.unwrap();
    assert_eq!(hits, vec![NoteId(2)]);
}

#[tokio::test]
async fn test_empty_collection_needs_no_embedding() {
    let collection = create_collection(&[]);
    let embedder = ScriptedEmbedder::new();
    let mut engine = engine_for(
        collection.path(),
        memory_index(),
        embedder.clone(),
        plain_options("m", 2),
    );

    let stats = engine.reconcile().await.unwrap();
    assert_eq!(stats.notes_changed, 0);
    assert_eq!(stats.watermark, 0);
    assert_eq!(embedder.calls(), 0);
    assert_eq!(
        engine.index().metadata().unwrap().model_name.as_deref(),
        Some("m")
    );
}

#[tokio::test]
async fn test_model_change_purges_before_reindexing() {
    let temp = TempDir::new().unwrap();
    let index_path = temp.path().join("index.sqlite");
    let collection = create_collection(&six_notes()[..3]);

    {
        let mut engine = engine_for(
            collection.path(),
            Box::new(SqliteVectorIndex::open(&index_path).unwrap()),
            ScriptedEmbedder::new(),
            plain_options("model-a", 8),
        );
        let stats = engine.reconcile().await.unwrap();
        assert!(!stats.model_reset);

        // A note the collection no longer has.
        engine
            .upsert_one(&Note {
                id: NoteId(99),
                fields: vec!["ghost".into()],
                mod_time: 5,
            })
            .await
            .unwrap();
        assert_eq!(engine.index().count().unwrap(), 4);
    }

    let embedder = ScriptedEmbedder::new();
    let mut engine = engine_for(
        collection.path(),
        Box::new(SqliteVectorIndex::open(&index_path).unwrap()),
        embedder.clone(),
        plain_options("model-b", 8),
    );

    let stats = engine.reconcile().await.unwrap();
    assert!(stats.model_reset);
    assert_eq!(stats.notes_changed, 3);
    assert_eq!(embedder.calls(), 1);

    let metadata = engine.index().metadata().unwrap();
    assert_eq!(metadata.model_name.as_deref(), Some("model-b"));
    assert_eq!(metadata.watermark, 30);
    assert_eq!(engine.index().count().unwrap(), 3);
    assert!(!engine
        .search("ghost", 10)
        .await
        .unwrap()
        .contains(&NoteId(99)));
}

#[tokio::test]
async fn test_failed_batch_is_skipped_and_freezes_watermark() {
    let collection = create_collection(&six_notes());
    let embedder = ScriptedEmbedder::new();
    embedder.fail_call(2, Failure::Embedding);
    let mut engine = engine_for(
        collection.path(),
        memory_index(),
        embedder.clone(),
        plain_options("m", 2),
    );

    let stats = engine.reconcile().await.unwrap();
    assert_eq!(stats.embed_calls, 3);
    assert_eq!(stats.failed_batches, 1);
    assert_eq!(stats.notes_indexed, 4);
    assert_eq!(stats.watermark, 20);
    assert_eq!(engine.index().count().unwrap(), 4);
    assert_eq!(engine.index().metadata().unwrap().watermark, 20);

    // The next run retries everything after the frozen watermark.
    let stats = engine.reconcile().await.unwrap();
    assert_eq!(stats.notes_changed, 4);
    assert_eq!(stats.failed_batches, 0);
    assert_eq!(stats.watermark, 60);
    assert_eq!(engine.index().count().unwrap(), 6);
}

#[tokio::test]
async fn test_connectivity_failure_aborts_and_keeps_progress() {
    let collection = create_collection(&six_notes());
    let embedder = ScriptedEmbedder::new();
    embedder.fail_call(2, Failure::Unavailable);
    let mut engine = engine_for(
        collection.path(),
        memory_index(),
        embedder.clone(),
        plain_options("m", 2),
    );

    let result = engine.reconcile().await;
    assert!(matches!(result, Err(AppError::ServiceUnavailable(_))));
    assert_eq!(embedder.calls(), 2);
    assert_eq!(engine.index().count().unwrap(), 2);
    assert_eq!(engine.index().metadata().unwrap().watermark, 20);
}

#[tokio::test]
async fn test_missing_model_aborts_first_batch() {
    let collection = create_collection(&six_notes());
    let embedder = ScriptedEmbedder::new();
    embedder.fail_call(1, Failure::ModelNotFound);
    let mut engine = engine_for(
        collection.path(),
        memory_index(),
        embedder.clone(),
        plain_options("nomic-embed-text", 2),
    );

    let err = engine.reconcile().await.unwrap_err();
    assert!(err.to_string().contains("ollama pull nomic-embed-text"));
    assert_eq!(engine.index().count().unwrap(), 0);
    assert_eq!(engine.index().metadata().unwrap().watermark, 0);
}

#[tokio::test]
async fn test_shared_mod_time_across_batch_boundary() {
    let notes = [(1, "alpha", 10), (2, "beta", 20), (3, "gamma", 20), (4, "delta", 30)];

    let collection = create_collection(&notes);
    let embedder = ScriptedEmbedder::new();
    embedder.fail_call(2, Failure::Embedding);
    let mut engine = engine_for(
        collection.path(),
        memory_index(),
        embedder.clone(),
        plain_options("m", 2),
    );

    let stats = engine.reconcile().await.unwrap();
    assert_eq!(stats.watermark, 19);

    // Note 3 shares mod 20 with note 2 and must be selected again.
    let stats = engine.reconcile().await.unwrap();
    assert_eq!(stats.notes_changed, 3);
    assert_eq!(stats.watermark, 30);
    assert_eq!(engine.index().count().unwrap(), 4);
}

#[tokio::test]
async fn test_successful_run_ends_at_max_mod_despite_shared_times() {
    let notes = [(1, "alpha", 10), (2, "beta", 20), (3, "gamma", 20), (4, "delta", 30)];
    let collection = create_collection(&notes);
    let mut engine = engine_for(
        collection.path(),
        memory_index(),
        ScriptedEmbedder::new(),
        plain_options("m", 2),
    );

    let stats = engine.reconcile().await.unwrap();
    assert_eq!(stats.watermark, 30);
    assert_eq!(stats.notes_indexed, 4);
}

#[tokio::test]
async fn test_cancellation_stops_between_batches() {
    let collection = create_collection(&six_notes());
    let embedder = ScriptedEmbedder::new();
    let token = CancellationToken::new();
    embedder.cancel_on_call(1, token.clone());

    let mut engine = engine_for(
        collection.path(),
        memory_index(),
        embedder.clone(),
        plain_options("m", 2),
    )
    .with_cancellation(token.clone());

    let stats = engine.reconcile().await.unwrap();
    assert!(stats.cancelled);
    assert_eq!(stats.embed_calls, 1);
    assert_eq!(stats.notes_indexed, 2);
    assert_eq!(stats.watermark, 20);

    token.reset();
    let stats = engine.reconcile().await.unwrap();
    assert!(!stats.cancelled);
    assert_eq!(stats.notes_changed, 4);
    assert_eq!(engine.index().count().unwrap(), 6);
}

#[tokio::test]
async fn test_reconcile_after_cancel_resumes_without_manual_reset() {
    let collection = create_collection(&six_notes());
    let embedder = ScriptedEmbedder::new();
    let mut engine = engine_for(
        collection.path(),
        memory_index(),
        embedder.clone(),
        plain_options("m", 2),
    );
    embedder.cancel_on_call(1, engine.cancellation_token());

    let first = engine.reconcile().await.unwrap();
    assert!(first.cancelled);
    assert_eq!(first.notes_indexed, 2);

    let second = engine.reconcile().await.unwrap();
    assert!(!second.cancelled);
    assert_eq!(second.notes_changed, 4);
    assert_eq!(second.notes_indexed, 4);
    assert_eq!(second.watermark, 60);
    assert_eq!(embedder.calls(), 3);
    assert_eq!(engine.index().count().unwrap(), 6);
}

#[tokio::test]
async fn test_reconcile_reports_progress_phases() {
    let collection = create_collection(&six_notes());
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();

    let mut engine = engine_for(
        collection.path(),
        memory_index(),
        ScriptedEmbedder::new(),
        plain_options("m", 4),
    )
    .with_progress(ProgressReporter::new(Arc::new(move |event: ProgressEvent| {
        sink.lock().unwrap().push(event);
    })));

    engine.reconcile().await.unwrap();

    let events = events.lock().unwrap();
    let phases: Vec<&str> = events.iter().map(|e| e.phase.as_str()).collect();
    assert_eq!(phases, vec!["reset", "check", "embed", "embed"]);
    assert_eq!(events[3].current, 6);
    assert_eq!(events[3].total, Some(6));
}

#[tokio::test]
async fn test_stats_and_reset() {
    let collection = create_collection(&six_notes());
    let mut engine = engine_for(
        collection.path(),
        memory_index(),
        ScriptedEmbedder::new(),
        plain_options("m", 8),
    );
    engine.reconcile().await.unwrap();

    let stats = engine.stats().unwrap();
    assert_eq!(stats.entries, 6);
    assert_eq!(stats.model_name.as_deref(), Some("m"));
    assert_eq!(stats.watermark, 60);
    assert!(stats.db_size_bytes.is_none());

    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["entries"], 6);

    engine.reset().unwrap();
    let stats = engine.stats().unwrap();
    assert_eq!(stats.entries, 0);
    assert_eq!(stats.watermark, 0);

    let rerun = engine.reconcile().await.unwrap();
    assert!(!rerun.model_reset);
    assert_eq!(rerun.notes_indexed, 6);
}
