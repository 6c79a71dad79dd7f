//! `RemoteStore` — the remote persistence API consumed by the sync engine
//! and the identity merge.
//!
//! Get methods map the remote's "no rows" sentinel to `Ok(None)`; every
//! other failure is a `RemoteError` carrying its transient/terminal kind.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::RemoteError;
use crate::types::{Baseline, DailyLog, Phase, User};

#[async_trait]
pub trait RemoteStore: Send + Sync {
    // users — read by id or auth_user_id, upsert conflict target `id`

    async fn get_user(&self, id: &str) -> Result<Option<User>, RemoteError>;

    async fn get_user_by_auth(&self, auth_user_id: &str) -> Result<Option<User>, RemoteError>;

    async fn upsert_user(&self, user: &User) -> Result<(), RemoteError>;

    /// Merge step: set the account's phase and flip `is_anonymous` to false.
    /// Returns the updated row.
    async fn update_user_for_merge(
        &self,
        auth_user_id: &str,
        phase: Phase,
    ) -> Result<User, RemoteError>;

    // baselines — upsert conflict target `user_id`

    async fn get_baseline(&self, user_id: &str) -> Result<Option<Baseline>, RemoteError>;

    async fn upsert_baseline(&self, baseline: &Baseline) -> Result<(), RemoteError>;

    async fn insert_baseline(&self, baseline: &Baseline) -> Result<Baseline, RemoteError>;

    /// Update the existing row owned by `user_id` with the given values.
    async fn update_baseline(
        &self,
        user_id: &str,
        baseline: &Baseline,
    ) -> Result<Baseline, RemoteError>;

    // daily_logs — upsert conflict target `(user_id, log_date)`

    /// The account's full log history, newest date first.
    async fn get_daily_logs(&self, user_id: &str) -> Result<Vec<DailyLog>, RemoteError>;

    async fn get_daily_log(
        &self,
        user_id: &str,
        log_date: NaiveDate,
    ) -> Result<Option<DailyLog>, RemoteError>;

    async fn upsert_daily_log(&self, log: &DailyLog) -> Result<(), RemoteError>;

    async fn insert_daily_log(&self, log: &DailyLog) -> Result<DailyLog, RemoteError>;

    /// Update the mutable fields of the row with the given id from `log`.
    async fn update_daily_log(&self, id: &str, log: &DailyLog) -> Result<DailyLog, RemoteError>;
}
