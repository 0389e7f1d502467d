//! LanceDB-backed vector index implementation.
//!
//! Entries live in a table named after the vector dimension (`notes_384`,
//! ...) so that a model change with a different dimension starts a fresh
//! table. Index metadata is kept in a YAML sidecar next to the database.
//!
//! The [`VectorIndex`] trait is synchronous; calls are bridged onto the
//! current Tokio runtime with `block_in_place`, which requires the
//! multi-threaded runtime.

use crate::types::{IndexMetadata, NoteId};
use crate::vector_index::{cosine_similarity, rank, VectorIndex};
use ankivec_core::{AppError, AppResult};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, Int64Array, RecordBatch, RecordBatchIterator,
};
use arrow_schema::{DataType, Field, Schema};
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const METADATA_FILE: &str = "index_meta.yaml";

#[derive(Debug, Default, Serialize, Deserialize)]
struct Sidecar {
    model_name: Option<String>,
    watermark: i64,
    dimensions: Option<usize>,
}

/// LanceDB-backed vector index.
pub struct LanceDbVectorIndex {
    conn: Connection,
    db_path: PathBuf,
    table: Option<Table>,
    sidecar: Sidecar,
}

impl LanceDbVectorIndex {
    /// Create or open a LanceDB index in the directory `db_path`.
    pub async fn open(db_path: &Path) -> AppResult<Self> {
        std::fs::create_dir_all(db_path)
            .map_err(|e| AppError::Index(format!("Failed to create index directory: {}", e)))?;

        let uri = db_path.to_string_lossy().to_string();
        let conn = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| AppError::Index(format!("Failed to connect to LanceDB: {}", e)))?;

        let sidecar = read_sidecar(&db_path.join(METADATA_FILE))?;

        let table = match sidecar.dimensions {
            Some(dim) => Some(open_or_create_table(&conn, dim).await?),
            None => None,
        };

        tracing::debug!("Initialized LanceDB index at {:?}", db_path);

        Ok(Self {
            conn,
            db_path: db_path.to_path_buf(),
            table,
            sidecar,
        })
    }

    fn save_sidecar(&self) -> AppResult<()> {
        let yaml = serde_yaml::to_string(&self.sidecar)?;
        std::fs::write(self.db_path.join(METADATA_FILE), yaml)?;
        Ok(())
    }

    /// Table for vectors of length `dim`, created on first use.
    fn table_for(&mut self, dim: usize) -> AppResult<Table> {
        match (self.sidecar.dimensions, &self.table) {
            (Some(expected), _) if expected != dim => Err(AppError::Index(format!(
                "Embedding dimension mismatch: expected {}, got {}",
                expected, dim
            ))),
            (Some(_), Some(table)) => Ok(table.clone()),
            _ => {
                let table = block_on(open_or_create_table(&self.conn, dim))?;
                self.sidecar.dimensions = Some(dim);
                self.save_sidecar()?;
                self.table = Some(table.clone());
                Ok(table)
            }
        }
    }

    fn to_batch(dim: usize, entries: &[(NoteId, Vec<f32>)]) -> AppResult<RecordBatch> {
        let schema = create_schema(dim);

        let mut values = Vec::with_capacity(entries.len() * dim);
        for (id, vector) in entries {
            if vector.len() != dim {
                return Err(AppError::Index(format!(
                    "Embedding dimension mismatch for note {}: expected {}, got {}",
                    id,
                    dim,
                    vector.len()
                )));
            }
            values.extend_from_slice(vector);
        }

        let ids = Int64Array::from(entries.iter().map(|(id, _)| id.0).collect::<Vec<_>>());
        let embeddings = FixedSizeListArray::new(
            Arc::new(Field::new("item", DataType::Float32, true)),
            dim as i32,
            Arc::new(Float32Array::from(values)),
            None,
        );

        RecordBatch::try_new(schema, vec![Arc::new(ids), Arc::new(embeddings)])
            .map_err(|e| AppError::Index(format!("Failed to create RecordBatch: {}", e)))
    }

    fn delete_where(table: &Table, predicate: &str) -> AppResult<()> {
        block_on(async {
            table
                .delete(predicate)
                .await
                .map_err(|e| AppError::Index(format!("Failed to delete entries: {}", e)))?;
            Ok(())
        })
    }
}

impl VectorIndex for LanceDbVectorIndex {
    fn upsert(&mut self, id: NoteId, vector: &[f32]) -> AppResult<()> {
        self.upsert_batch(&[(id, vector.to_vec())])
    }

    fn upsert_batch(&mut self, entries: &[(NoteId, Vec<f32>)]) -> AppResult<()> {
        let Some((_, first)) = entries.first() else {
            return Ok(());
        };

        let dim = first.len();
        let batch = Self::to_batch(dim, entries)?;
        let table = self.table_for(dim)?;

        // Lance has no upsert by key; replace existing rows.
        let ids: Vec<NoteId> = entries.iter().map(|(id, _)| *id).collect();
        Self::delete_where(&table, &id_predicate(&ids))?;

        block_on(async {
            let schema = batch.schema();
            table
                .add(RecordBatchIterator::new(vec![Ok(batch)], schema))
                .execute()
                .await
                .map_err(|e| AppError::Index(format!("Failed to add entries: {}", e)))?;
            Ok(())
        })?;

        tracing::debug!("Upserted {} entries into LanceDB", entries.len());
        Ok(())
    }

    fn delete(&mut self, ids: &[NoteId]) -> AppResult<()> {
        match &self.table {
            Some(table) if !ids.is_empty() => Self::delete_where(table, &id_predicate(ids)),
            _ => Ok(()),
        }
    }

    fn query_nearest(&self, vector: &[f32], k: usize) -> AppResult<Vec<(NoteId, f32)>> {
        let table = match &self.table {
            Some(table) if k > 0 => table,
            _ => return Ok(Vec::new()),
        };

        if let Some(expected) = self.sidecar.dimensions {
            if expected != vector.len() {
                return Err(AppError::Index(format!(
                    "Query dimension mismatch: expected {}, got {}",
                    expected,
                    vector.len()
                )));
            }
        }

        let batches = block_on(async {
            use futures::TryStreamExt;

            table
                .query()
                .nearest_to(vector.to_vec())
                .map_err(|e| AppError::Index(format!("Failed to create query: {}", e)))?
                .distance_type(DistanceType::Cosine)
                .limit(k)
                .execute()
                .await
                .map_err(|e| AppError::Index(format!("Failed to execute search: {}", e)))?
                .try_collect::<Vec<_>>()
                .await
                .map_err(|e| AppError::Index(format!("Failed to collect results: {}", e)))
        })?;

        let mut scored = Vec::new();
        for batch in &batches {
            let ids = batch
                .column_by_name("note_id")
                .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
                .ok_or_else(|| AppError::Index("Invalid note_id column".to_string()))?;
            let embeddings = batch
                .column_by_name("embedding")
                .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
                .ok_or_else(|| AppError::Index("Invalid embedding column".to_string()))?;

            for row in 0..batch.num_rows() {
                let values = embeddings.value(row);
                let values = values
                    .as_any()
                    .downcast_ref::<Float32Array>()
                    .ok_or_else(|| AppError::Index("Invalid embedding values".to_string()))?;
                let embedding: Vec<f32> = values.values().to_vec();
                scored.push((NoteId(ids.value(row)), cosine_similarity(vector, &embedding)));
            }
        }

        Ok(rank(scored, k))
    }

    fn metadata(&self) -> AppResult<IndexMetadata> {
        Ok(IndexMetadata {
            model_name: self.sidecar.model_name.clone(),
            watermark: self.sidecar.watermark,
        })
    }

    fn set_metadata(&mut self, metadata: &IndexMetadata) -> AppResult<()> {
        self.sidecar.model_name = metadata.model_name.clone();
        self.sidecar.watermark = metadata.watermark;
        self.save_sidecar()
    }

    fn recreate(&mut self, metadata: &IndexMetadata) -> AppResult<()> {
        if let Some(table) = self.table.take() {
            Self::delete_where(&table, "note_id IS NOT NULL")?;
        }

        self.sidecar = Sidecar {
            model_name: metadata.model_name.clone(),
            watermark: metadata.watermark,
            dimensions: None,
        };
        self.save_sidecar()?;

        tracing::info!("Recreated LanceDB index");
        Ok(())
    }

    fn count(&self) -> AppResult<usize> {
        match &self.table {
            Some(table) => block_on(async {
                table
                    .count_rows(None)
                    .await
                    .map_err(|e| AppError::Index(format!("Failed to count rows: {}", e)))
            }),
            None => Ok(0),
        }
    }
}

fn create_schema(dim: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("note_id", DataType::Int64, false),
        Field::new(
            "embedding",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                dim as i32,
            ),
            false,
        ),
    ]))
}

async fn open_or_create_table(conn: &Connection, dim: usize) -> AppResult<Table> {
    let name = format!("notes_{}", dim);

    let table_names = conn
        .table_names()
        .execute()
        .await
        .map_err(|e| AppError::Index(format!("Failed to list tables: {}", e)))?;

    if table_names.contains(&name) {
        return conn
            .open_table(&name)
            .execute()
            .await
            .map_err(|e| AppError::Index(format!("Failed to open table: {}", e)));
    }

    let schema = create_schema(dim);
    let empty_batch = RecordBatch::new_empty(schema.clone());
    conn.create_table(
        &name,
        RecordBatchIterator::new(vec![Ok(empty_batch)], schema),
    )
    .execute()
    .await
    .map_err(|e| AppError::Index(format!("Failed to create table: {}", e)))
}

fn read_sidecar(path: &Path) -> AppResult<Sidecar> {
    if !path.exists() {
        return Ok(Sidecar::default());
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}

fn id_predicate(ids: &[NoteId]) -> String {
    let list: Vec<String> = ids.iter().map(|id| id.0.to_string()).collect();
    format!("note_id IN ({})", list.join(", "))
}

/// Run a LanceDB future to completion from synchronous trait code.
fn block_on<F: Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
