//! Entity types shared by the storage, sync, and merge layers.
//!
//! Field names match the remote `users` / `baselines` / `daily_logs` tables,
//! so the same serde shapes serve both the local record store and the wire.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::InvalidPhase;

// ============================================================================
// EntityKind
// ============================================================================

/// The three persisted record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    Baseline,
    DailyLog,
}

impl EntityKind {
    /// Store name — the key segment used by the local store and the queue.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Baseline => "baseline",
            EntityKind::DailyLog => "daily_logs",
        }
    }

    pub const ALL: [EntityKind; 3] = [EntityKind::User, EntityKind::Baseline, EntityKind::DailyLog];
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted record type. Implementors are the three entity structs; the
/// local store is generic over this so each kind lands in its own store.
pub trait Entity: Serialize + serde::de::DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    fn id(&self) -> &str;
}

// ============================================================================
// Phase
// ============================================================================

/// Self-declared routine-building stage, 1 through 4.
///
/// Serializes as a bare number; any other number fails deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
}

impl Phase {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Phase {
    type Error = InvalidPhase;

    fn try_from(value: u8) -> Result<Self, InvalidPhase> {
        match value {
            1 => Ok(Phase::One),
            2 => Ok(Phase::Two),
            3 => Ok(Phase::Three),
            4 => Ok(Phase::Four),
            other => Err(InvalidPhase(other)),
        }
    }
}

impl Serialize for Phase {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for Phase {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = u8::deserialize(deserializer)?;
        Phase::try_from(raw).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// User
// ============================================================================

/// One row per local identity and per authenticated account.
///
/// `is_anonymous` flips to `false` exactly once, when the identity merge
/// attaches `auth_user_id`; it never reverses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub current_phase: Phase,
    pub is_anonymous: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kakao_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
}

impl User {
    /// Fresh anonymous local identity at phase 1.
    pub fn new_anonymous() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            current_phase: Phase::One,
            is_anonymous: true,
            auth_user_id: None,
            kakao_id: None,
            email: None,
            nickname: None,
            profile_image: None,
        }
    }
}

impl Entity for User {
    const KIND: EntityKind = EntityKind::User;

    fn id(&self) -> &str {
        &self.id
    }
}

// ============================================================================
// Baseline
// ============================================================================

/// The user's self-declared minimum daily standard. At most one per user,
/// enforced by the remote upsert conflict target on `user_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub id: String,
    pub user_id: String,
    /// e.g. "22:00-05:00"
    pub sleep: String,
    /// Distance in km, e.g. 1.0
    pub movement: f64,
    /// e.g. "3 lines"
    pub record: String,
    pub updated_at: DateTime<Utc>,
}

impl Baseline {
    pub fn new(user_id: impl Into<String>, sleep: impl Into<String>, movement: f64, record: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            sleep: sleep.into(),
            movement,
            record: record.into(),
            updated_at: Utc::now(),
        }
    }

    /// Replace the standard and advance `updated_at`.
    pub fn update(&mut self, sleep: impl Into<String>, movement: f64, record: impl Into<String>) {
        self.sleep = sleep.into();
        self.movement = movement;
        self.record = record.into();
        self.updated_at = Utc::now();
    }
}

impl Entity for Baseline {
    const KIND: EntityKind = EntityKind::Baseline;

    fn id(&self) -> &str {
        &self.id
    }
}

// ============================================================================
// DailyLog
// ============================================================================

/// Per-dimension check state for one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BaselineCheck {
    pub sleep: bool,
    pub movement: bool,
    pub record: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyState {
    Good,
    Normal,
    Heavy,
}

/// One log entry per `(user_id, log_date)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLog {
    pub id: String,
    pub user_id: String,
    pub log_date: NaiveDate,
    pub baseline_check: BaselineCheck,
    pub one_line: String,
    pub body_state: Option<BodyState>,
    pub memo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DailyLog {
    pub fn new(user_id: impl Into<String>, log_date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            log_date,
            baseline_check: BaselineCheck::default(),
            one_line: String::new(),
            body_state: None,
            memo: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Advance `updated_at` after a mutation.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Soft daily reset: clear all three check flags, keep the record itself.
    pub fn reset_checks(&mut self) {
        self.baseline_check = BaselineCheck::default();
        self.touch();
    }
}

impl Entity for DailyLog {
    const KIND: EntityKind = EntityKind::DailyLog;

    fn id(&self) -> &str {
        &self.id
    }
}

// ============================================================================
// LocalSnapshot
// ============================================================================

/// The unit pushed and pulled by the sync engine: everything the local store
/// holds for one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalSnapshot {
    pub user: Option<User>,
    pub baseline: Option<Baseline>,
    pub daily_logs: Vec<DailyLog>,
}

impl LocalSnapshot {
    pub fn is_empty(&self) -> bool {
        self.user.is_none() && self.baseline.is_none() && self.daily_logs.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
