//! SQLite primary backend.
//!
//! Implements `StorageBackend` using rusqlite (bundled). One `records` table
//! keyed by `(kind, id)` holds all three entity kinds as JSON, with
//! `json_extract` expression indexes standing in for the original's IndexedDB
//! secondary indexes. The connection is protected by a
//! `parking_lot::ReentrantMutex<RefCell<Connection>>`.

use std::cell::RefCell;
use std::path::Path;

use parking_lot::ReentrantMutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use crate::error::{Result, StorageError};
use crate::types::EntityKind;

use super::traits::{IndexField, RawRecord, StorageBackend};

/// SQLite storage backend.
#[derive(Debug)]
pub struct SqliteBackend {
    conn: ReentrantMutex<RefCell<Connection>>,
}

impl SqliteBackend {
    /// Open a file-backed database and create the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(StorageError::from)?;
        Ok(Self::from_connection(conn)?)
    }

    /// Open an in-memory database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        Ok(Self::from_connection(conn)?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA busy_timeout=5000;",
        )?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS records (
                kind TEXT NOT NULL,
                id   TEXT NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (kind, id)
            );
            CREATE INDEX IF NOT EXISTS idx_records_user_id
                ON records (kind, json_extract(data, '$.user_id'));
            CREATE INDEX IF NOT EXISTS idx_records_log_date
                ON records (kind, json_extract(data, '$.log_date'));",
        )?;

        Ok(Self {
            conn: ReentrantMutex::new(RefCell::new(conn)),
        })
    }

    /// Execute `f` with a shared reference to the underlying connection.
    fn with_conn<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let guard = self.conn.lock();
        let conn = guard.borrow();
        f(&conn).map_err(StorageError::from)
    }

    fn parse_row(kind: EntityKind, id: String, data: String) -> Result<RawRecord, StorageError> {
        let data: Value = serde_json::from_str(&data).map_err(|source| StorageError::Corruption {
            kind: kind.as_str().to_string(),
            id: id.clone(),
            source,
        })?;
        Ok(RawRecord { kind, id, data })
    }
}

impl StorageBackend for SqliteBackend {
    fn get_raw(&self, kind: EntityKind, id: &str) -> Result<Option<RawRecord>, StorageError> {
        let row: Option<String> = self.with_conn(|conn| {
            conn.query_row(
                "SELECT data FROM records WHERE kind = ?1 AND id = ?2",
                params![kind.as_str(), id],
                |row| row.get(0),
            )
            .optional()
        })?;

        row.map(|data| Self::parse_row(kind, id.to_string(), data))
            .transpose()
    }

    fn put_raw(&self, record: &RawRecord) -> Result<(), StorageError> {
        let data = serde_json::to_string(&record.data)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO records (kind, id, data) VALUES (?1, ?2, ?3)
                 ON CONFLICT (kind, id) DO UPDATE SET data = excluded.data",
                params![record.kind.as_str(), record.id, data],
            )
        })?;
        Ok(())
    }

    fn delete_raw(&self, kind: EntityKind, id: &str) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM records WHERE kind = ?1 AND id = ?2",
                params![kind.as_str(), id],
            )
        })?;
        Ok(())
    }

    fn scan_raw(&self, kind: EntityKind) -> Result<Vec<RawRecord>, StorageError> {
        let rows: Vec<(String, String)> = self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, data FROM records WHERE kind = ?1")?;
            let rows = stmt.query_map(params![kind.as_str()], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?;
            rows.collect()
        })?;

        rows.into_iter()
            .map(|(id, data)| Self::parse_row(kind, id, data))
            .collect()
    }

    fn scan_index_raw(
        &self,
        kind: EntityKind,
        field: IndexField,
        value: &str,
    ) -> Result<Vec<RawRecord>, StorageError> {
        // Field name comes from the closed IndexField enum, not caller input.
        let sql = format!(
            "SELECT id, data FROM records
             WHERE kind = ?1 AND json_extract(data, '$.{}') = ?2",
            field.as_str()
        );
        let rows: Vec<(String, String)> = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![kind.as_str(), value], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?;
            rows.collect()
        })?;

        rows.into_iter()
            .map(|(id, data)| Self::parse_row(kind, id, data))
            .collect()
    }

    fn clear_raw(&self) -> Result<(), StorageError> {
        self.with_conn(|conn| conn.execute("DELETE FROM records", []))?;
        Ok(())
    }
}
