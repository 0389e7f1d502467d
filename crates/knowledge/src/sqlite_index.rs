//! SQLite-backed vector index.
//!
//! Vectors are stored as little-endian `f32` blobs keyed by note id and
//! searched exhaustively with cosine similarity. Index metadata lives in a
//! key/value table in the same database. Entries and the watermark are
//! written in separate transactions; a crash between the two leaves entries
//! past the watermark, which the next reconcile embeds again.

use crate::types::{IndexMetadata, NoteId};
use crate::vector_index::{cosine_similarity, rank, VectorIndex};
use ankivec_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

const META_MODEL_NAME: &str = "model_name";
const META_WATERMARK: &str = "watermark";
const META_DIMENSIONS: &str = "dimensions";
const META_METRIC: &str = "metric";

/// Distance metric recorded at creation; only cosine is supported.
const METRIC_COSINE: &str = "cosine";

/// SQLite-backed vector index.
pub struct SqliteVectorIndex {
    conn: Connection,
    path: Option<PathBuf>,
    dimensions: Option<usize>,
}

impl SqliteVectorIndex {
    /// Create or open the index database at `db_path`.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Index(format!("Failed to create index directory: {}", e)))?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Index(format!("Failed to open SQLite index: {}", e)))?;

        let index = Self::init(conn, Some(db_path.to_path_buf()))?;
        tracing::debug!("Opened SQLite index at {:?}", db_path);
        Ok(index)
    }

    /// Create a throwaway in-memory index.
    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Index(format!("Failed to open in-memory index: {}", e)))?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> AppResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                note_id INTEGER PRIMARY KEY,
                embedding BLOB NOT NULL
            );

            CREATE TABLE IF NOT EXISTS index_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            INSERT OR IGNORE INTO index_meta (key, value) VALUES ('metric', 'cosine');
            "#,
        )
        .map_err(|e| AppError::Index(format!("Failed to create tables: {}", e)))?;

        let metric = read_meta(&conn, META_METRIC)?;
        if metric.as_deref() != Some(METRIC_COSINE) {
            return Err(AppError::Index(format!(
                "Unsupported distance metric {:?}; recreate the index",
                metric
            )));
        }

        let dimensions = read_meta(&conn, META_DIMENSIONS)?
            .map(|v| {
                v.parse::<usize>()
                    .map_err(|e| AppError::Index(format!("Corrupt dimensions value: {}", e)))
            })
            .transpose()?;

        Ok(Self {
            conn,
            path,
            dimensions,
        })
    }
}

impl VectorIndex for SqliteVectorIndex {
    fn upsert(&mut self, id: NoteId, vector: &[f32]) -> AppResult<()> {
        self.upsert_batch(&[(id, vector.to_vec())])
    }

    fn upsert_batch(&mut self, entries: &[(NoteId, Vec<f32>)]) -> AppResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut dimensions = self.dimensions;
        let tx = self
            .conn
            .transaction()
            .map_err(|e| AppError::Index(format!("Failed to begin transaction: {}", e)))?;

        for (id, vector) in entries {
            match dimensions {
                Some(expected) if expected != vector.len() => {
                    return Err(AppError::Index(format!(
                        "Embedding dimension mismatch: expected {}, got {}",
                        expected,
                        vector.len()
                    )));
                }
                Some(_) => {}
                None => {
                    write_meta(&tx, META_DIMENSIONS, &vector.len().to_string())?;
                    dimensions = Some(vector.len());
                }
            }

            tx.execute(
                "INSERT OR REPLACE INTO entries (note_id, embedding) VALUES (?1, ?2)",
                params![id.0, embedding_to_bytes(vector)],
            )
            .map_err(|e| AppError::Index(format!("Failed to upsert entry {}: {}", id, e)))?;
        }

        tx.commit()
            .map_err(|e| AppError::Index(format!("Failed to commit upsert: {}", e)))?;
        self.dimensions = dimensions;

        tracing::debug!("Upserted {} entries", entries.len());
        Ok(())
    }

    fn delete(&mut self, ids: &[NoteId]) -> AppResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let tx = self
            .conn
            .transaction()
            .map_err(|e| AppError::Index(format!("Failed to begin transaction: {}", e)))?;

        {
            let mut stmt = tx
                .prepare("DELETE FROM entries WHERE note_id = ?1")
                .map_err(|e| AppError::Index(format!("Failed to prepare delete: {}", e)))?;
            for id in ids {
                stmt.execute(params![id.0])
                    .map_err(|e| AppError::Index(format!("Failed to delete entry {}: {}", id, e)))?;
            }
        }

        tx.commit()
            .map_err(|e| AppError::Index(format!("Failed to commit delete: {}", e)))?;

        tracing::debug!("Deleted {} entries", ids.len());
        Ok(())
    }

    fn query_nearest(&self, vector: &[f32], k: usize) -> AppResult<Vec<(NoteId, f32)>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        if let Some(expected) = self.dimensions {
            if expected != vector.len() {
                return Err(AppError::Index(format!(
                    "Query dimension mismatch: expected {}, got {}",
                    expected,
                    vector.len()
                )));
            }
        }

        let mut stmt = self
            .conn
            .prepare("SELECT note_id, embedding FROM entries")
            .map_err(|e| AppError::Index(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                let id: i64 = row.get(0)?;
                let bytes: Vec<u8> = row.get(1)?;
                Ok((NoteId(id), bytes))
            })
            .map_err(|e| AppError::Index(format!("Failed to query entries: {}", e)))?;

        let mut scored = Vec::new();
        for row in rows {
            let (id, bytes) =
                row.map_err(|e| AppError::Index(format!("Failed to read entry: {}", e)))?;
            let embedding = bytes_to_embedding(&bytes)?;
            scored.push((id, cosine_similarity(vector, &embedding)));
        }

        let results = rank(scored, k);
        tracing::debug!("Retrieved {} entries (requested top-{})", results.len(), k);
        Ok(results)
    }

    fn metadata(&self) -> AppResult<IndexMetadata> {
        let model_name = read_meta(&self.conn, META_MODEL_NAME)?;
        let watermark = read_meta(&self.conn, META_WATERMARK)?
            .map(|v| {
                v.parse::<i64>()
                    .map_err(|e| AppError::Index(format!("Corrupt watermark value: {}", e)))
            })
            .transpose()?
            .unwrap_or(0);

        Ok(IndexMetadata {
            model_name,
            watermark,
        })
    }

    fn set_metadata(&mut self, metadata: &IndexMetadata) -> AppResult<()> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| AppError::Index(format!("Failed to begin transaction: {}", e)))?;
        write_metadata(&tx, metadata)?;
        tx.commit()
            .map_err(|e| AppError::Index(format!("Failed to commit metadata: {}", e)))
    }

    fn recreate(&mut self, metadata: &IndexMetadata) -> AppResult<()> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| AppError::Index(format!("Failed to begin transaction: {}", e)))?;

        tx.execute("DELETE FROM entries", [])
            .map_err(|e| AppError::Index(format!("Failed to delete entries: {}", e)))?;
        tx.execute("DELETE FROM index_meta", [])
            .map_err(|e| AppError::Index(format!("Failed to delete metadata: {}", e)))?;
        write_meta(&tx, META_METRIC, METRIC_COSINE)?;
        write_metadata(&tx, metadata)?;

        tx.commit()
            .map_err(|e| AppError::Index(format!("Failed to commit recreate: {}", e)))?;
        self.dimensions = None;

        tracing::info!("Recreated vector index");
        Ok(())
    }

    fn size_bytes(&self) -> Option<u64> {
        self.path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
    }

    fn count(&self) -> AppResult<usize> {
        self.conn
            .query_row("SELECT COUNT(*) FROM entries", [], |row| {
                row.get::<_, i64>(0).map(|v| v as usize)
            })
            .map_err(|e| AppError::Index(format!("Failed to count entries: {}", e)))
    }
}

fn read_meta(conn: &Connection, key: &str) -> AppResult<Option<String>> {
    conn.query_row(
        "SELECT value FROM index_meta WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
    .map_err(|e| AppError::Index(format!("Failed to read metadata '{}': {}", key, e)))
}

fn write_meta(conn: &Connection, key: &str, value: &str) -> AppResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO index_meta (key, value) VALUES (?1, ?2)",
        params![key, value],
    )
    .map_err(|e| AppError::Index(format!("Failed to write metadata '{}': {}", key, e)))?;
    Ok(())
}

fn write_metadata(conn: &Connection, metadata: &IndexMetadata) -> AppResult<()> {
    match &metadata.model_name {
        Some(model) => write_meta(conn, META_MODEL_NAME, model)?,
        None => {
            conn.execute(
                "DELETE FROM index_meta WHERE key = ?1",
                params![META_MODEL_NAME],
            )
            .map_err(|e| AppError::Index(format!("Failed to clear model name: {}", e)))?;
        }
    }
    write_meta(conn, META_WATERMARK, &metadata.watermark.to_string())
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Index("Invalid embedding bytes length".to_string()));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
