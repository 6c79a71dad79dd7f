//! Identity merge: one-time transplant of an anonymous local user's history
//! onto a freshly authenticated account.
//!
//! Callers gate this on `is_anonymous == true` with a local user id present;
//! the procedure itself is safe to re-run because the baseline and daily-log
//! steps are upsert-by-natural-key, not blind inserts. Local values always
//! win — this merges *into* the new account, it is not a bidirectional
//! reconciliation.

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::storage::{LocalPointers, LocalStore};
use crate::sync::remote::RemoteStore;
use crate::types::{Baseline, DailyLog, User};

/// Structured merge result. `success: false` only when the account row
/// lookup or the User-row update failed; individual baseline/daily-log
/// failures are logged and skipped.
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub success: bool,
    pub error: Option<String>,
    pub user: Option<User>,
    pub baseline: Option<Baseline>,
    pub daily_logs: Vec<DailyLog>,
}

impl MergeOutcome {
    fn nothing_to_merge() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

pub struct IdentityMerger {
    store: Arc<LocalStore>,
    remote: Arc<dyn RemoteStore>,
    pointers: LocalPointers,
}

impl IdentityMerger {
    pub fn new(
        store: Arc<LocalStore>,
        remote: Arc<dyn RemoteStore>,
        pointers: LocalPointers,
    ) -> Self {
        Self {
            store,
            remote,
            pointers,
        }
    }

    /// Transplant the anonymous local user's phase, baseline, and daily-log
    /// history onto the account identified by `auth_user_id`, then repoint
    /// local storage at the account id.
    pub async fn merge_into_account(
        &self,
        auth_user_id: &str,
        local_user_id: Option<&str>,
    ) -> MergeOutcome {
        // No local identity: nothing to transplant.
        let Some(local_user_id) = local_user_id else {
            return MergeOutcome::nothing_to_merge();
        };
        let Some(local_user) = self.store.get::<User>(local_user_id) else {
            return MergeOutcome::nothing_to_merge();
        };

        // Step 1: the account row. The auth collaborator creates it on
        // login; if the first read misses, re-read once.
        match self.lookup_account(auth_user_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                return MergeOutcome::failed(format!(
                    "no account row for auth user {auth_user_id}"
                ))
            }
            Err(error) => return MergeOutcome::failed(format!("account lookup failed: {error}")),
        }

        // Step 2: the anonymous user's history.
        let local_baseline = self.store.first_by_user::<Baseline>(local_user_id);
        let local_logs = self
            .store
            .get_by_index::<DailyLog>(crate::storage::IndexField::UserId, local_user_id);

        // Step 3: carry the phase over and drop anonymity.
        let merged_user = match self
            .remote
            .update_user_for_merge(auth_user_id, local_user.current_phase)
            .await
        {
            Ok(user) => user,
            Err(error) => return MergeOutcome::failed(format!("user update failed: {error}")),
        };

        // Steps 4 and 5 degrade per entity: a failure is logged and skipped,
        // the merge itself still succeeds.
        let merged_baseline = match local_baseline {
            Some(local_baseline) => self.merge_baseline(&merged_user, &local_baseline).await,
            None => None,
        };
        let merged_logs = self.merge_daily_logs(&merged_user, &local_logs).await;

        // Step 6: persist under the account id and repoint the local user.
        self.store.put(&merged_user);
        self.pointers.set_user_id(&merged_user.id);
        if let Some(baseline) = &merged_baseline {
            self.store.put(baseline);
        }
        for log in &merged_logs {
            self.store.put(log);
        }

        MergeOutcome {
            success: true,
            error: None,
            user: Some(merged_user),
            baseline: merged_baseline,
            daily_logs: merged_logs,
        }
    }

    async fn lookup_account(&self, auth_user_id: &str) -> Result<Option<User>, String> {
        match self.remote.get_user_by_auth(auth_user_id).await {
            Ok(Some(account)) => Ok(Some(account)),
            Ok(None) => self
                .remote
                .get_user_by_auth(auth_user_id)
                .await
                .map_err(|error| error.to_string()),
            Err(error) => Err(error.to_string()),
        }
    }

    /// Insert or update the account's baseline from the local values.
    async fn merge_baseline(&self, account: &User, local: &Baseline) -> Option<Baseline> {
        let existing = match self.remote.get_baseline(&account.id).await {
            Ok(existing) => existing,
            Err(error) => {
                warn!(user_id = %account.id, %error, "baseline lookup failed; skipped");
                return None;
            }
        };

        let result = match existing {
            Some(_) => {
                let mut update = local.clone();
                update.user_id = account.id.clone();
                self.remote.update_baseline(&account.id, &update).await
            }
            None => {
                let insert = Baseline {
                    id: Uuid::new_v4().to_string(),
                    user_id: account.id.clone(),
                    sleep: local.sleep.clone(),
                    movement: local.movement,
                    record: local.record.clone(),
                    updated_at: local.updated_at,
                };
                self.remote.insert_baseline(&insert).await
            }
        };

        match result {
            Ok(baseline) => Some(baseline),
            Err(error) => {
                warn!(user_id = %account.id, %error, "baseline merge failed; skipped");
                None
            }
        }
    }

    /// Each local log is processed independently against the account's
    /// `(user_id, log_date)` key; one failure does not abort the rest.
    async fn merge_daily_logs(&self, account: &User, local_logs: &[DailyLog]) -> Vec<DailyLog> {
        let mut merged = Vec::new();

        for local_log in local_logs {
            let existing = match self
                .remote
                .get_daily_log(&account.id, local_log.log_date)
                .await
            {
                Ok(existing) => existing,
                Err(error) => {
                    warn!(log_date = %local_log.log_date, %error, "daily log lookup failed; skipped");
                    continue;
                }
            };

            let result = match existing {
                Some(existing) => {
                    let mut update = local_log.clone();
                    update.user_id = account.id.clone();
                    self.remote.update_daily_log(&existing.id, &update).await
                }
                None => {
                    let insert = DailyLog {
                        id: Uuid::new_v4().to_string(),
                        user_id: account.id.clone(),
                        log_date: local_log.log_date,
                        baseline_check: local_log.baseline_check,
                        one_line: local_log.one_line.clone(),
                        body_state: local_log.body_state,
                        memo: local_log.memo.clone(),
                        created_at: local_log.created_at,
                        updated_at: local_log.updated_at,
                    };
                    self.remote.insert_daily_log(&insert).await
                }
            };

            match result {
                Ok(log) => merged.push(log),
                Err(error) => {
                    warn!(log_date = %local_log.log_date, %error, "daily log merge failed; skipped");
                }
            }
        }

        merged
    }
}
