//! Flat key/value fallback backend.
//!
//! Stands in for the original's localStorage: a namespaced string keyspace
//! with no index support, optionally persisted as one JSON file rewritten on
//! every mutation. Besides implementing `StorageBackend` for the entity
//! record keys (`{namespace}:{kind}:{id}`), it exposes plain key/value
//! methods used by the sync queue blob and the local pointers.

use std::collections::BTreeMap;
use std::path::PathBuf;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::warn;

use crate::error::StorageError;
use crate::types::EntityKind;

use super::traits::{IndexField, RawRecord, StorageBackend};

pub const DEFAULT_NAMESPACE: &str = "life-os";

/// Fallback flat store: namespaced keys over an in-memory map, with optional
/// whole-file JSON persistence.
pub struct FlatBackend {
    namespace: String,
    state: Mutex<BTreeMap<String, Value>>,
    path: Option<PathBuf>,
}

impl FlatBackend {
    /// Purely in-memory store under the default namespace.
    pub fn in_memory() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            state: Mutex::new(BTreeMap::new()),
            path: None,
        }
    }

    /// File-backed store. A missing file starts empty; a corrupt file is
    /// logged and discarded rather than failing the open, matching the
    /// tolerant load the original applied to localStorage blobs.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(map) => map,
                Err(error) => {
                    warn!(path = %path.display(), %error, "flat store file corrupt; starting empty");
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            state: Mutex::new(state),
            path: Some(path),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// `{namespace}:{key}` — pointer and blob keys.
    fn value_key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    /// `{namespace}:{kind}:{id}` — entity record keys.
    fn record_key(&self, kind: EntityKind, id: &str) -> String {
        format!("{}:{}:{}", self.namespace, kind.as_str(), id)
    }

    fn record_prefix(&self, kind: EntityKind) -> String {
        format!("{}:{}:", self.namespace, kind.as_str())
    }

    /// Rewrite the whole map to disk. Called under the state lock so writes
    /// cannot interleave.
    fn persist(&self, state: &BTreeMap<String, Value>) -> Result<(), StorageError> {
        if let Some(path) = &self.path {
            let contents = serde_json::to_string(state)?;
            std::fs::write(path, contents)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Plain key/value surface (queue blob, pointers)
    // -----------------------------------------------------------------------

    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.state.lock().get(&self.value_key(key)).cloned()
    }

    pub fn set_value(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let mut state = self.state.lock();
        state.insert(self.value_key(key), value);
        self.persist(&state)
    }

    pub fn remove_value(&self, key: &str) -> Result<(), StorageError> {
        let mut state = self.state.lock();
        state.remove(&self.value_key(key));
        self.persist(&state)
    }

    /// Remove every key under `{namespace}:{prefix}`.
    pub fn remove_prefix(&self, prefix: &str) -> Result<(), StorageError> {
        let full = self.value_key(prefix);
        let mut state = self.state.lock();
        state.retain(|key, _| !key.starts_with(&full));
        self.persist(&state)
    }
}

impl StorageBackend for FlatBackend {
    fn get_raw(&self, kind: EntityKind, id: &str) -> Result<Option<RawRecord>, StorageError> {
        let state = self.state.lock();
        Ok(state.get(&self.record_key(kind, id)).map(|data| RawRecord {
            kind,
            id: id.to_string(),
            data: data.clone(),
        }))
    }

    fn put_raw(&self, record: &RawRecord) -> Result<(), StorageError> {
        let mut state = self.state.lock();
        state.insert(self.record_key(record.kind, &record.id), record.data.clone());
        self.persist(&state)
    }

    fn delete_raw(&self, kind: EntityKind, id: &str) -> Result<(), StorageError> {
        let mut state = self.state.lock();
        state.remove(&self.record_key(kind, id));
        self.persist(&state)
    }

    fn scan_raw(&self, kind: EntityKind) -> Result<Vec<RawRecord>, StorageError> {
        let prefix = self.record_prefix(kind);
        let state = self.state.lock();
        Ok(state
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .map(|(key, data)| RawRecord {
                kind,
                id: key[prefix.len()..].to_string(),
                data: data.clone(),
            })
            .collect())
    }

    fn scan_index_raw(
        &self,
        kind: EntityKind,
        field: IndexField,
        value: &str,
    ) -> Result<Vec<RawRecord>, StorageError> {
        // No index support here: full scan and filter on the JSON field.
        let records = self.scan_raw(kind)?;
        Ok(records
            .into_iter()
            .filter(|record| {
                record
                    .data
                    .get(field.as_str())
                    .and_then(Value::as_str)
                    .map(|v| v == value)
                    .unwrap_or(false)
            })
            .collect())
    }

    fn clear_raw(&self) -> Result<(), StorageError> {
        // Entity kinds only; pointers and the queue blob survive a clear.
        let prefixes: Vec<String> = EntityKind::ALL
            .iter()
            .map(|kind| self.record_prefix(*kind))
            .collect();
        let mut state = self.state.lock();
        state.retain(|key, _| !prefixes.iter().any(|prefix| key.starts_with(prefix)));
        self.persist(&state)
    }
}
