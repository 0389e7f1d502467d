//! Read-only access to the host's note table.

use crate::types::{NoteId, NoteRecord};
use ankivec_core::{AppError, AppResult};
use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;

/// Source of notes to index.
pub trait NoteStore: Send {
    /// Count notes modified after `since` and the largest modification time
    /// among them (`since` when there are none).
    fn count_and_max_mod(&self, since: i64) -> AppResult<(u64, i64)>;

    /// Notes modified after `since`, oldest modification first.
    fn select_notes(&self, since: i64) -> AppResult<Vec<NoteRecord>>;
}

/// Note store over a collection database with a `notes(id, flds, mod)` table.
pub struct SqliteNoteStore {
    conn: Connection,
}

impl SqliteNoteStore {
    /// Open the collection read-only.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        let conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            AppError::NoteStore(format!("Failed to open collection {:?}: {}", db_path, e))
        })?;

        tracing::debug!("Opened note store at {:?}", db_path);
        Ok(Self { conn })
    }
}

impl NoteStore for SqliteNoteStore {
    fn count_and_max_mod(&self, since: i64) -> AppResult<(u64, i64)> {
        self.conn
            .query_row(
                "SELECT COUNT(*), MAX(mod) FROM notes WHERE mod > ?1",
                params![since],
                |row| {
                    let count: i64 = row.get(0)?;
                    let max_mod: Option<i64> = row.get(1)?;
                    Ok((count as u64, max_mod.unwrap_or(since)))
                },
            )
            .map_err(|e| AppError::NoteStore(format!("Failed to count changed notes: {}", e)))
    }

    fn select_notes(&self, since: i64) -> AppResult<Vec<NoteRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, flds, mod FROM notes WHERE mod > ?1 ORDER BY mod, id")
            .map_err(|e| AppError::NoteStore(format!("Failed to prepare note query: {}", e)))?;

        let rows = stmt
            .query_map(params![since], |row| {
                Ok(NoteRecord {
                    id: NoteId(row.get(0)?),
                    flds: row.get(1)?,
                    mod_time: row.get(2)?,
                })
            })
            .map_err(|e| AppError::NoteStore(format!("Failed to query notes: {}", e)))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::NoteStore(format!("Failed to read note row: {}", e)))
    }
}
