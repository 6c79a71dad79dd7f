//! `LocalStore` — the two-tier write-through wrapper over the backends.
//!
//! Primary storage (SQLite) plus a flat fallback store. Every write goes to
//! both tiers so a later primary failure can still recover the last-known
//! value; reads prefer the primary and degrade transparently. Per the error
//! design, nothing here returns `Err`: storage failures are logged at `warn`
//! and callers see absent reads or silently-continued writes.

use std::sync::Arc;

use tracing::warn;

use crate::types::Entity;

use super::flat::FlatBackend;
use super::traits::{IndexField, RawRecord, StorageBackend};

pub struct LocalStore {
    primary: Option<Box<dyn StorageBackend>>,
    fallback: Arc<FlatBackend>,
}

impl LocalStore {
    pub fn new(primary: Option<Box<dyn StorageBackend>>, fallback: Arc<FlatBackend>) -> Self {
        Self { primary, fallback }
    }

    /// The shared fallback store, also home to the queue blob and pointers.
    pub fn fallback(&self) -> Arc<FlatBackend> {
        Arc::clone(&self.fallback)
    }

    fn decode<T: Entity>(record: RawRecord) -> Option<T> {
        match serde_json::from_value(record.data) {
            Ok(entity) => Some(entity),
            Err(error) => {
                warn!(kind = %record.kind, id = %record.id, %error, "record failed to decode; skipping");
                None
            }
        }
    }

    fn decode_all<T: Entity>(records: Vec<RawRecord>) -> Vec<T> {
        records.into_iter().filter_map(Self::decode).collect()
    }

    pub fn get<T: Entity>(&self, id: &str) -> Option<T> {
        if let Some(primary) = &self.primary {
            match primary.get_raw(T::KIND, id) {
                Ok(Some(record)) => return Self::decode(record),
                Ok(None) => return None,
                Err(error) => {
                    warn!(kind = %T::KIND, id, %error, "primary get failed; using fallback");
                }
            }
        }
        match self.fallback.get_raw(T::KIND, id) {
            Ok(record) => record.and_then(Self::decode),
            Err(error) => {
                warn!(kind = %T::KIND, id, %error, "fallback get failed");
                None
            }
        }
    }

    /// Write-through: the primary write must land before this returns, and
    /// the value is mirrored into the fallback either way. The mirror is a
    /// durability hedge, not a cache.
    pub fn put<T: Entity>(&self, entity: &T) {
        let data = match serde_json::to_value(entity) {
            Ok(data) => data,
            Err(error) => {
                warn!(kind = %T::KIND, id = entity.id(), %error, "record failed to encode; dropped");
                return;
            }
        };
        let record = RawRecord {
            kind: T::KIND,
            id: entity.id().to_string(),
            data,
        };

        if let Some(primary) = &self.primary {
            if let Err(error) = primary.put_raw(&record) {
                warn!(kind = %T::KIND, id = %record.id, %error, "primary put failed; fallback only");
            }
        }
        if let Err(error) = self.fallback.put_raw(&record) {
            warn!(kind = %T::KIND, id = %record.id, %error, "fallback put failed");
        }
    }

    /// Idempotent — deleting an absent key is not an error.
    pub fn delete<T: Entity>(&self, id: &str) {
        if let Some(primary) = &self.primary {
            if let Err(error) = primary.delete_raw(T::KIND, id) {
                warn!(kind = %T::KIND, id, %error, "primary delete failed");
            }
        }
        if let Err(error) = self.fallback.delete_raw(T::KIND, id) {
            warn!(kind = %T::KIND, id, %error, "fallback delete failed");
        }
    }

    pub fn get_all<T: Entity>(&self) -> Vec<T> {
        if let Some(primary) = &self.primary {
            match primary.scan_raw(T::KIND) {
                Ok(records) => return Self::decode_all(records),
                Err(error) => {
                    warn!(kind = %T::KIND, %error, "primary scan failed; using fallback");
                }
            }
        }
        match self.fallback.scan_raw(T::KIND) {
            Ok(records) => Self::decode_all(records),
            Err(error) => {
                warn!(kind = %T::KIND, %error, "fallback scan failed");
                Vec::new()
            }
        }
    }

    pub fn get_by_index<T: Entity>(&self, field: IndexField, value: &str) -> Vec<T> {
        if let Some(primary) = &self.primary {
            match primary.scan_index_raw(T::KIND, field, value) {
                Ok(records) => return Self::decode_all(records),
                Err(error) => {
                    warn!(kind = %T::KIND, field = field.as_str(), %error, "primary index scan failed; using fallback");
                }
            }
        }
        match self.fallback.scan_index_raw(T::KIND, field, value) {
            Ok(records) => Self::decode_all(records),
            Err(error) => {
                warn!(kind = %T::KIND, field = field.as_str(), %error, "fallback index scan failed");
                Vec::new()
            }
        }
    }

    /// Wipe all three entity kinds in both tiers. Reset tooling only.
    pub fn clear(&self) {
        if let Some(primary) = &self.primary {
            if let Err(error) = primary.clear_raw() {
                warn!(%error, "primary clear failed");
            }
        }
        if let Err(error) = self.fallback.clear_raw() {
            warn!(%error, "fallback clear failed");
        }
    }

    /// `get_by_index(UserId, ...)` narrowed to the single-owner case:
    /// at most one baseline per user.
    pub fn first_by_user<T: Entity>(&self, user_id: &str) -> Option<T> {
        self.get_by_index(IndexField::UserId, user_id).into_iter().next()
    }
}
