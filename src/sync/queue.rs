//! Durable sync queue.
//!
//! At-least-once record of write intents that could not be pushed
//! immediately. The whole queue persists as one JSON blob under a single
//! flat-store key on every mutation — O(queue size) per write, acceptable at
//! single-user scale. Every mutating method does its read-modify-write of
//! the full queue under one lock guard, so interleaved callers cannot lose
//! updates.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::storage::flat::FlatBackend;

use super::connectivity::{Connectivity, NetworkCallback, SubscriptionGuard};
use super::types::{QueuePayload, QueueStatus, SyncEntry, SyncOperation};

/// Retries before an entry is evicted as permanently failed.
pub const MAX_RETRY_COUNT: u32 = 3;

const QUEUE_KEY: &str = "sync-queue";

/// Persisted blob shape.
#[derive(Debug, Serialize, Deserialize)]
struct QueueBlob {
    queue: Vec<SyncEntry>,
    last_updated: DateTime<Utc>,
}

pub struct SyncQueue {
    storage: Arc<FlatBackend>,
    connectivity: Arc<dyn Connectivity>,
    entries: Mutex<Vec<SyncEntry>>,
}

impl SyncQueue {
    /// Build the queue and load any persisted entries from storage.
    pub fn new(storage: Arc<FlatBackend>, connectivity: Arc<dyn Connectivity>) -> Self {
        let queue = Self {
            storage,
            connectivity,
            entries: Mutex::new(Vec::new()),
        };
        queue.load();
        queue
    }

    /// Re-read the blob from storage. A missing or corrupt blob resets to
    /// an empty queue.
    pub fn load(&self) {
        let entries = match self.storage.get_value(QUEUE_KEY) {
            Some(value) => match serde_json::from_value::<QueueBlob>(value) {
                Ok(blob) => blob.queue,
                Err(error) => {
                    warn!(%error, "sync queue blob corrupt; resetting to empty");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        *self.entries.lock() = entries;
    }

    /// Persist the given state. Called with the entries lock held.
    fn save(&self, entries: &[SyncEntry]) {
        let blob = QueueBlob {
            queue: entries.to_vec(),
            last_updated: Utc::now(),
        };
        match serde_json::to_value(&blob) {
            Ok(value) => {
                if let Err(error) = self.storage.set_value(QUEUE_KEY, value) {
                    warn!(%error, "sync queue persist failed");
                }
            }
            Err(error) => warn!(%error, "sync queue encode failed"),
        }
    }

    /// Append a new entry with `retry_count = 0`. Returns the entry id.
    pub fn add(&self, operation: SyncOperation, payload: QueuePayload) -> String {
        let entry = SyncEntry {
            id: Uuid::new_v4().to_string(),
            operation,
            payload,
            queued_at: Utc::now(),
            retry_count: 0,
        };
        let id = entry.id.clone();
        let mut entries = self.entries.lock();
        entries.push(entry);
        self.save(&entries);
        id
    }

    /// The entry with the lowest retry count (ties broken arbitrarily), so
    /// never-yet-retried items drain before repeatedly-failing ones and a
    /// single poison entry cannot starve the queue.
    pub fn next(&self) -> Option<SyncEntry> {
        let entries = self.entries.lock();
        entries
            .iter()
            .min_by_key(|entry| entry.retry_count)
            .cloned()
    }

    /// Remove an entry. Unknown ids are a no-op.
    pub fn complete(&self, id: &str) {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        if entries.len() != before {
            self.save(&entries);
        }
    }

    /// Increment an entry's retry count; at the ceiling the entry is evicted
    /// and the failure logged as permanent. No dead-letter store.
    pub fn fail(&self, id: &str) {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.iter_mut().find(|entry| entry.id == id) else {
            return;
        };
        entry.retry_count += 1;
        if entry.retry_count >= MAX_RETRY_COUNT {
            warn!(
                id,
                operation = ?entry.operation,
                kind = %entry.payload.kind(),
                retry_count = entry.retry_count,
                "sync entry exceeded retry ceiling; dropped permanently"
            );
            entries.retain(|entry| entry.id != id);
        }
        self.save(&entries);
    }

    pub fn status(&self) -> QueueStatus {
        let entries = self.entries.lock();
        QueueStatus {
            total: entries.len(),
            pending: entries.iter().filter(|e| e.retry_count == 0).count(),
            failed: entries
                .iter()
                .filter(|e| e.retry_count >= MAX_RETRY_COUNT)
                .count(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.clear();
        self.save(&entries);
    }

    // -----------------------------------------------------------------------
    // Network observation
    // -----------------------------------------------------------------------

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    pub fn on_network_change(&self, callback: NetworkCallback) -> SubscriptionGuard {
        self.connectivity.subscribe(callback)
    }
}
