//! Storage backend trait for life-os-core.
//!
//! `StorageBackend` is the narrow raw I/O seam implemented by concrete
//! backends (SQLite primary, flat key/value fallback). Records cross this
//! boundary untyped as JSON so one table/keyspace can hold all three kinds;
//! the typed surface lives in `storage::store`.

use serde_json::Value;

use crate::error::StorageError;
use crate::types::EntityKind;

/// The two secondary indexes the data model defines: `user_id` on baselines
/// and daily logs, `log_date` on daily logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexField {
    UserId,
    LogDate,
}

impl IndexField {
    pub fn as_str(self) -> &'static str {
        match self {
            IndexField::UserId => "user_id",
            IndexField::LogDate => "log_date",
        }
    }
}

/// A record as it crosses the backend boundary: kind-tagged id plus the
/// materialized JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub kind: EntityKind,
    pub id: String,
    pub data: Value,
}

/// Low-level storage backend — raw record I/O with no entity semantics.
///
/// Implementors must be `Send + Sync` so they can be shared across threads.
/// All methods are synchronous; callers hold no lock across them.
pub trait StorageBackend: Send + Sync {
    /// Fetch a single record. `Ok(None)` means absent — not an error.
    fn get_raw(&self, kind: EntityKind, id: &str) -> Result<Option<RawRecord>, StorageError>;

    /// Persist (insert or replace) a record. The record is durable before
    /// this returns.
    fn put_raw(&self, record: &RawRecord) -> Result<(), StorageError>;

    /// Remove a record. Deleting an absent key is not an error.
    fn delete_raw(&self, kind: EntityKind, id: &str) -> Result<(), StorageError>;

    /// All records of one kind, unordered.
    fn scan_raw(&self, kind: EntityKind) -> Result<Vec<RawRecord>, StorageError>;

    /// Records of one kind whose indexed field equals `value`. Backends
    /// without index support answer with a full scan and filter.
    fn scan_index_raw(
        &self,
        kind: EntityKind,
        field: IndexField,
        value: &str,
    ) -> Result<Vec<RawRecord>, StorageError>;

    /// Wipe all three kinds. Reset tooling only; never called by normal
    /// app flow.
    fn clear_raw(&self) -> Result<(), StorageError>;
}
