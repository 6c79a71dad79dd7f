//! Denormalized local pointers: current user id, phase mirror, last sync.
//!
//! Plain key/value entries on the flat store, outside the entity kinds, so
//! the UI layer can read them synchronously. The entity stores stay
//! authoritative; these are collaborator state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::warn;

use crate::storage::flat::FlatBackend;
use crate::types::Phase;

const USER_ID_KEY: &str = "user-id";
const PHASE_KEY: &str = "phase";
const LAST_SYNC_KEY: &str = "last-sync";

#[derive(Clone)]
pub struct LocalPointers {
    flat: Arc<FlatBackend>,
}

impl LocalPointers {
    pub fn new(flat: Arc<FlatBackend>) -> Self {
        Self { flat }
    }

    fn set(&self, key: &str, value: Value) {
        if let Err(error) = self.flat.set_value(key, value) {
            warn!(key, %error, "pointer write failed");
        }
    }

    pub fn user_id(&self) -> Option<String> {
        self.flat
            .get_value(USER_ID_KEY)
            .and_then(|v| v.as_str().map(str::to_string))
    }

    pub fn set_user_id(&self, user_id: &str) {
        self.set(USER_ID_KEY, json!(user_id));
    }

    pub fn clear_user_id(&self) {
        if let Err(error) = self.flat.remove_value(USER_ID_KEY) {
            warn!(%error, "pointer remove failed");
        }
    }

    pub fn phase(&self) -> Option<Phase> {
        self.flat
            .get_value(PHASE_KEY)
            .and_then(|v| v.as_u64())
            .and_then(|n| Phase::try_from(n as u8).ok())
    }

    pub fn set_phase(&self, phase: Phase) {
        self.set(PHASE_KEY, json!(phase.as_u8()));
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.flat
            .get_value(LAST_SYNC_KEY)
            .and_then(|v| serde_json::from_value(v).ok())
    }

    pub fn set_last_sync(&self, at: DateTime<Utc>) {
        self.set(LAST_SYNC_KEY, json!(at));
    }
}
