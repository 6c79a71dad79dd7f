//! Sync engine: push, pull+merge, and background queue draining.
//!
//! Single authority for moving data between the local store and the remote
//! persistence API. Owns the coarse status machine
//! (`Idle → Syncing → {Success, Error}`) and the reentrancy latch that
//! collapses concurrent background syncs into no-ops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::storage::{IndexField, LocalPointers, LocalStore};
use crate::types::{Baseline, DailyLog, LocalSnapshot, User};

use super::queue::SyncQueue;
use super::remote::RemoteStore;
use super::types::{EngineStatus, QueuePayload, SyncOperation, SyncOutcome, SyncStatus};

pub struct SyncEngine {
    store: Arc<LocalStore>,
    queue: Arc<SyncQueue>,
    remote: Arc<dyn RemoteStore>,
    pointers: LocalPointers,
    status: Mutex<EngineStatus>,
    /// Held for a whole background drain; concurrent drains are no-ops.
    draining: AtomicBool,
}

impl SyncEngine {
    pub fn new(
        store: Arc<LocalStore>,
        queue: Arc<SyncQueue>,
        remote: Arc<dyn RemoteStore>,
        pointers: LocalPointers,
    ) -> Self {
        Self {
            store,
            queue,
            remote,
            pointers,
            status: Mutex::new(EngineStatus {
                status: SyncStatus::Idle,
                last_sync_at: None,
            }),
            draining: AtomicBool::new(false),
        }
    }

    pub fn status(&self) -> EngineStatus {
        self.status.lock().clone()
    }

    fn set_status(&self, status: SyncStatus) {
        self.status.lock().status = status;
    }

    fn record_success(&self) {
        let now = Utc::now();
        let mut state = self.status.lock();
        state.status = SyncStatus::Success;
        state.last_sync_at = Some(now);
        drop(state);
        self.pointers.set_last_sync(now);
    }

    // -----------------------------------------------------------------------
    // Push: local → remote
    // -----------------------------------------------------------------------

    /// Upsert the snapshot remotely in dependency order: User, then
    /// Baseline, then each DailyLog. Offline short-circuits to enqueueing
    /// every non-null entity without network I/O. A User or Baseline failure
    /// aborts the batch and routes the snapshot to the queue; individual
    /// daily-log failures are skipped, since each log is independent.
    pub async fn push_snapshot(&self, snapshot: &LocalSnapshot) -> SyncOutcome {
        self.push_snapshot_inner(snapshot, true).await
    }

    /// `enqueue_on_failure` is false during a background drain, where the
    /// queue entry being processed already carries the retry accounting.
    async fn push_snapshot_inner(
        &self,
        snapshot: &LocalSnapshot,
        enqueue_on_failure: bool,
    ) -> SyncOutcome {
        if !self.queue.is_online() {
            if enqueue_on_failure {
                self.enqueue_snapshot(snapshot);
            }
            return SyncOutcome::failed("offline; snapshot queued for background sync");
        }

        self.set_status(SyncStatus::Syncing);

        if let Some(user) = &snapshot.user {
            if let Err(error) = self.remote.upsert_user(user).await {
                warn!(user_id = %user.id, %error, kind = ?error.kind, "user push failed");
                self.set_status(SyncStatus::Error);
                if enqueue_on_failure {
                    self.enqueue_snapshot(snapshot);
                }
                return SyncOutcome::failed(format!("user sync failed: {error}"));
            }
        }

        if let Some(baseline) = &snapshot.baseline {
            if let Err(error) = self.remote.upsert_baseline(baseline).await {
                warn!(user_id = %baseline.user_id, %error, kind = ?error.kind, "baseline push failed");
                self.set_status(SyncStatus::Error);
                if enqueue_on_failure {
                    self.enqueue_snapshot(snapshot);
                }
                return SyncOutcome::failed(format!("baseline sync failed: {error}"));
            }
        }

        let mut skipped_logs = Vec::new();
        for log in &snapshot.daily_logs {
            if let Err(error) = self.remote.upsert_daily_log(log).await {
                warn!(id = %log.id, log_date = %log.log_date, %error, "daily log push failed; skipped");
                skipped_logs.push(log.id.clone());
            }
        }

        self.record_success();
        let mut outcome = SyncOutcome::ok(());
        outcome.skipped_logs = skipped_logs;
        outcome
    }

    // -----------------------------------------------------------------------
    // Pull: remote → local, with merge
    // -----------------------------------------------------------------------

    /// Fetch the account's remote state, merge it with the current local
    /// snapshot (local wins unless remote is strictly newer), persist the
    /// merged result locally, and return it. Used on cold start / re-login.
    pub async fn pull_snapshot(&self, user_id: &str) -> SyncOutcome<LocalSnapshot> {
        if !self.queue.is_online() {
            return SyncOutcome::failed("offline; pull skipped");
        }

        self.set_status(SyncStatus::Syncing);

        let remote = match self.fetch_remote_snapshot(user_id).await {
            Ok(snapshot) => snapshot,
            Err(message) => {
                self.set_status(SyncStatus::Error);
                return SyncOutcome::failed(message);
            }
        };

        let local = self.local_snapshot(user_id);
        let merged = merge_snapshots(local, remote);
        self.persist_snapshot(&merged);

        self.record_success();
        SyncOutcome::ok(merged)
    }

    async fn fetch_remote_snapshot(&self, user_id: &str) -> Result<LocalSnapshot, String> {
        let user = self
            .remote
            .get_user(user_id)
            .await
            .map_err(|error| format!("user fetch failed: {error}"))?;
        let baseline = self
            .remote
            .get_baseline(user_id)
            .await
            .map_err(|error| format!("baseline fetch failed: {error}"))?;
        let daily_logs = self
            .remote
            .get_daily_logs(user_id)
            .await
            .map_err(|error| format!("daily logs fetch failed: {error}"))?;
        Ok(LocalSnapshot {
            user,
            baseline,
            daily_logs,
        })
    }

    // -----------------------------------------------------------------------
    // Background drain
    // -----------------------------------------------------------------------

    /// Drain the sync queue one entry at a time. No-op when offline or when
    /// a sync is already in flight. The iteration count is bounded by the
    /// queue length at loop start; retries happen on later calls, so a
    /// permanently failing entry self-limits at the queue's retry ceiling.
    pub async fn background_sync(&self) {
        if !self.queue.is_online() {
            return;
        }
        if self.draining.swap(true, Ordering::SeqCst) {
            return;
        }
        if self.status.lock().status == SyncStatus::Syncing {
            self.draining.store(false, Ordering::SeqCst);
            return;
        }

        self.queue.load();
        let budget = self.queue.len();
        debug!(budget, "background sync draining queue");

        for _ in 0..budget {
            if !self.queue.is_online() {
                break;
            }
            let Some(entry) = self.queue.next() else {
                break;
            };

            let snapshot = self.local_snapshot(entry.payload.owner_id());
            let result = self.push_snapshot_inner(&snapshot, false).await;
            if result.success {
                self.queue.complete(&entry.id);
            } else {
                self.queue.fail(&entry.id);
            }
        }

        self.draining.store(false, Ordering::SeqCst);
    }

    // -----------------------------------------------------------------------
    // Snapshot helpers
    // -----------------------------------------------------------------------

    /// Everything the local store holds for one user.
    pub fn local_snapshot(&self, user_id: &str) -> LocalSnapshot {
        LocalSnapshot {
            user: self.store.get::<User>(user_id),
            baseline: self.store.first_by_user::<Baseline>(user_id),
            daily_logs: self.store.get_by_index::<DailyLog>(IndexField::UserId, user_id),
        }
    }

    fn persist_snapshot(&self, snapshot: &LocalSnapshot) {
        if let Some(user) = &snapshot.user {
            self.store.put(user);
        }
        if let Some(baseline) = &snapshot.baseline {
            self.store.put(baseline);
        }
        for log in &snapshot.daily_logs {
            self.store.put(log);
        }
    }

    fn enqueue_snapshot(&self, snapshot: &LocalSnapshot) {
        if let Some(user) = &snapshot.user {
            self.queue
                .add(SyncOperation::Update, QueuePayload::User(user.clone()));
        }
        if let Some(baseline) = &snapshot.baseline {
            self.queue.add(
                SyncOperation::Update,
                QueuePayload::Baseline(baseline.clone()),
            );
        }
        for log in &snapshot.daily_logs {
            self.queue
                .add(SyncOperation::Update, QueuePayload::DailyLogs(log.clone()));
        }
    }
}

// ============================================================================
// Merge policy (pull direction only)
// ============================================================================

/// "Local wins unless remote is strictly newer." Applied entity by entity;
/// the User record has no timestamp and resolves by unconditional local
/// preference.
pub fn merge_snapshots(local: LocalSnapshot, remote: LocalSnapshot) -> LocalSnapshot {
    LocalSnapshot {
        user: merge_user(local.user, remote.user),
        baseline: merge_baseline(local.baseline, remote.baseline),
        daily_logs: merge_daily_logs(local.daily_logs, remote.daily_logs),
    }
}

fn merge_user(local: Option<User>, remote: Option<User>) -> Option<User> {
    local.or(remote)
}

fn merge_baseline(local: Option<Baseline>, remote: Option<Baseline>) -> Option<Baseline> {
    match (local, remote) {
        (Some(local), Some(remote)) => {
            // Tie goes to local.
            if local.updated_at >= remote.updated_at {
                Some(local)
            } else {
                Some(remote)
            }
        }
        (local, remote) => local.or(remote),
    }
}

/// Union keyed by `log_date`, per-date winner by `updated_at`, ties to local.
fn merge_daily_logs(local: Vec<DailyLog>, remote: Vec<DailyLog>) -> Vec<DailyLog> {
    let mut by_date: std::collections::BTreeMap<chrono::NaiveDate, DailyLog> =
        remote.into_iter().map(|log| (log.log_date, log)).collect();
    for log in local {
        match by_date.get(&log.log_date) {
            Some(existing) if existing.updated_at > log.updated_at => {}
            _ => {
                by_date.insert(log.log_date, log);
            }
        }
    }
    by_date.into_values().collect()
}
