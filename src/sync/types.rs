//! Sync-specific types: queue entries, status structs, and outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Baseline, DailyLog, EntityKind, User};

// ============================================================================
// Queue entry types
// ============================================================================

/// Write intent recorded in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOperation {
    Create,
    Update,
    Delete,
}

/// Kind-tagged queue payload. The tag reuses the entity store names, so the
/// serialized entry carries `"store": "user" | "baseline" | "daily_logs"`
/// next to the data, and drain logic dispatches without shape inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "store", content = "data", rename_all = "snake_case")]
pub enum QueuePayload {
    User(User),
    Baseline(Baseline),
    DailyLogs(DailyLog),
}

impl QueuePayload {
    pub fn kind(&self) -> EntityKind {
        match self {
            QueuePayload::User(_) => EntityKind::User,
            QueuePayload::Baseline(_) => EntityKind::Baseline,
            QueuePayload::DailyLogs(_) => EntityKind::DailyLog,
        }
    }

    /// The user whose snapshot this entry belongs to. Drain reconstructs the
    /// owner's snapshot from the local store rather than replaying the
    /// payload; the store is authoritative.
    pub fn owner_id(&self) -> &str {
        match self {
            QueuePayload::User(user) => &user.id,
            QueuePayload::Baseline(baseline) => &baseline.user_id,
            QueuePayload::DailyLogs(log) => &log.user_id,
        }
    }
}

/// One pending write in the sync queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEntry {
    pub id: String,
    pub operation: SyncOperation,
    #[serde(flatten)]
    pub payload: QueuePayload,
    pub queued_at: DateTime<Utc>,
    pub retry_count: u32,
}

/// Queue counters: `pending` are never-yet-retried entries, `failed` are
/// entries at or past the retry ceiling (normally absent, since the ceiling
/// evicts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStatus {
    pub total: usize,
    pub pending: usize,
    pub failed: usize,
}

// ============================================================================
// Engine status and outcomes
// ============================================================================

/// Coarse engine state machine: `Idle → Syncing → {Success, Error}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncStatus {
    #[default]
    Idle,
    Syncing,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineStatus {
    pub status: SyncStatus,
    pub last_sync_at: Option<DateTime<Utc>>,
}

/// Result of an engine operation. Engine methods never return `Err`; failure
/// is a `success: false` outcome with a message.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome<T = ()> {
    pub success: bool,
    pub error: Option<String>,
    pub data: Option<T>,
    /// Daily logs that failed to push individually and were skipped.
    pub skipped_logs: Vec<String>,
}

impl<T> SyncOutcome<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            error: None,
            data: Some(data),
            skipped_logs: Vec::new(),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            data: None,
            skipped_logs: Vec::new(),
        }
    }
}
