//! `PostgrestRemote` — HTTP implementation of `RemoteStore` over PostgREST
//! conventions (the Supabase REST surface the original app talks to).
//!
//! Filters are `?col=eq.value` query params; single-row reads send
//! `Accept: application/vnd.pgrst.object+json` and treat the PGRST116
//! no-rows code as absent; upserts are `POST` with
//! `Prefer: resolution=merge-duplicates` and an `on_conflict` target.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use crate::error::{RemoteError, RemoteErrorKind, Result};
use crate::types::{Baseline, DailyLog, Phase, User};

use super::remote::RemoteStore;

/// PostgREST error code for "JSON object requested, multiple (or no) rows
/// returned" — the no-rows sentinel on single-row reads.
const NO_ROWS_CODE: &str = "PGRST116";

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Error body shape returned by PostgREST.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<String>,
    message: Option<String>,
    #[allow(dead_code)]
    details: Option<String>,
    #[allow(dead_code)]
    hint: Option<String>,
}

#[derive(Debug)]
pub struct PostgrestRemote {
    base_url: Url,
    api_key: String,
    http: Client,
}

impl PostgrestRemote {
    /// `base_url` is the PostgREST root, e.g. `https://x.supabase.co/rest/v1`.
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/')).map_err(|error| {
            RemoteError::with_kind(
                format!("invalid PostgREST base url: {error}"),
                RemoteErrorKind::Terminal,
            )
        })?;
        Ok(Self {
            base_url,
            api_key: api_key.into(),
            http: Client::new(),
        })
    }

    fn table_url(&self, table: &str) -> Result<Url, RemoteError> {
        Url::parse(&format!("{}/{}", self.base_url, table)).map_err(|error| {
            RemoteError::with_kind(
                format!("invalid table url for {table}: {error}"),
                RemoteErrorKind::Terminal,
            )
        })
    }

    fn request(
        &self,
        method: Method,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<RequestBuilder, RemoteError> {
        let mut url = self.table_url(table)?;
        for (column, value) in filters {
            url.query_pairs_mut().append_pair(column, value);
        }
        Ok(self
            .http
            .request(method, url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key)))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, RemoteError> {
        builder
            .send()
            .await
            .map_err(|error| RemoteError::new(format!("request failed: {error}")))
    }

    /// Turn a non-success response into a classified error: 4xx payloads the
    /// remote rejected are terminal, everything else retries.
    async fn response_error(&self, table: &str, response: Response) -> RemoteError {
        let status = response.status();
        let (code, message) = Self::parse_error_body(response).await;
        let kind = if status.is_client_error() {
            RemoteErrorKind::Terminal
        } else {
            RemoteErrorKind::Transient
        };
        RemoteError::with_kind(
            format!("{table}: {message} (status {status}, code {code})"),
            kind,
        )
    }

    async fn parse_error_body(response: Response) -> (String, String) {
        match response.json::<ApiErrorBody>().await {
            Ok(body) => (
                body.code.unwrap_or_else(|| "unknown".to_string()),
                body.message.unwrap_or_else(|| "no message".to_string()),
            ),
            Err(_) => ("unknown".to_string(), "unparseable error body".to_string()),
        }
    }

    /// GET a single row. `Ok(None)` when the remote answers with the
    /// no-rows code.
    async fn get_single<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Option<T>, RemoteError> {
        let builder = self
            .request(Method::GET, table, filters)?
            .header("Accept", SINGLE_OBJECT);
        let response = self.send(builder).await?;
        if response.status().is_success() {
            let row = response
                .json::<T>()
                .await
                .map_err(|error| RemoteError::new(format!("{table}: bad response body: {error}")))?;
            return Ok(Some(row));
        }

        let status = response.status();
        let (code, message) = Self::parse_error_body(response).await;
        if code == NO_ROWS_CODE {
            return Ok(None);
        }
        let kind = if status.is_client_error() {
            RemoteErrorKind::Terminal
        } else {
            RemoteErrorKind::Transient
        };
        Err(RemoteError::with_kind(
            format!("{table}: {message} (status {status}, code {code})"),
            kind,
        ))
    }

    async fn get_list<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>, RemoteError> {
        let builder = self.request(Method::GET, table, filters)?;
        let response = self.send(builder).await?;
        if !response.status().is_success() {
            return Err(self.response_error(table, response).await);
        }
        response
            .json::<Vec<T>>()
            .await
            .map_err(|error| RemoteError::new(format!("{table}: bad response body: {error}")))
    }

    /// POST with merge-duplicates resolution against the given conflict
    /// target.
    async fn upsert<B: Serialize>(
        &self,
        table: &str,
        on_conflict: &str,
        body: &B,
    ) -> Result<(), RemoteError> {
        let builder = self
            .request(
                Method::POST,
                table,
                &[("on_conflict", on_conflict.to_string())],
            )?
            .header("Prefer", "resolution=merge-duplicates")
            .json(body);
        let response = self.send(builder).await?;
        if !response.status().is_success() {
            return Err(self.response_error(table, response).await);
        }
        Ok(())
    }

    async fn insert_returning<T: DeserializeOwned, B: Serialize>(
        &self,
        table: &str,
        body: &B,
    ) -> Result<T, RemoteError> {
        let builder = self
            .request(Method::POST, table, &[])?
            .header("Prefer", "return=representation")
            .header("Accept", SINGLE_OBJECT)
            .json(body);
        let response = self.send(builder).await?;
        if !response.status().is_success() {
            return Err(self.response_error(table, response).await);
        }
        response
            .json::<T>()
            .await
            .map_err(|error| RemoteError::new(format!("{table}: bad response body: {error}")))
    }

    async fn patch_returning<T: DeserializeOwned, B: Serialize>(
        &self,
        table: &str,
        filters: &[(&str, String)],
        body: &B,
    ) -> Result<T, RemoteError> {
        let builder = self
            .request(Method::PATCH, table, filters)?
            .header("Prefer", "return=representation")
            .header("Accept", SINGLE_OBJECT)
            .json(body);
        let response = self.send(builder).await?;
        if !response.status().is_success() {
            return Err(self.response_error(table, response).await);
        }
        response
            .json::<T>()
            .await
            .map_err(|error| RemoteError::new(format!("{table}: bad response body: {error}")))
    }
}

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

#[async_trait]
impl RemoteStore for PostgrestRemote {
    async fn get_user(&self, id: &str) -> Result<Option<User>, RemoteError> {
        self.get_single("users", &[("id", eq(id))]).await
    }

    async fn get_user_by_auth(&self, auth_user_id: &str) -> Result<Option<User>, RemoteError> {
        self.get_single("users", &[("auth_user_id", eq(auth_user_id))])
            .await
    }

    async fn upsert_user(&self, user: &User) -> Result<(), RemoteError> {
        self.upsert("users", "id", user).await
    }

    async fn update_user_for_merge(
        &self,
        auth_user_id: &str,
        phase: Phase,
    ) -> Result<User, RemoteError> {
        self.patch_returning(
            "users",
            &[("auth_user_id", eq(auth_user_id))],
            &json!({
                "current_phase": phase,
                "is_anonymous": false,
            }),
        )
        .await
    }

    async fn get_baseline(&self, user_id: &str) -> Result<Option<Baseline>, RemoteError> {
        self.get_single("baselines", &[("user_id", eq(user_id))])
            .await
    }

    async fn upsert_baseline(&self, baseline: &Baseline) -> Result<(), RemoteError> {
        self.upsert("baselines", "user_id", baseline).await
    }

    async fn insert_baseline(&self, baseline: &Baseline) -> Result<Baseline, RemoteError> {
        self.insert_returning("baselines", baseline).await
    }

    async fn update_baseline(
        &self,
        user_id: &str,
        baseline: &Baseline,
    ) -> Result<Baseline, RemoteError> {
        self.patch_returning(
            "baselines",
            &[("user_id", eq(user_id))],
            &json!({
                "sleep": baseline.sleep,
                "movement": baseline.movement,
                "record": baseline.record,
                "updated_at": baseline.updated_at,
            }),
        )
        .await
    }

    async fn get_daily_logs(&self, user_id: &str) -> Result<Vec<DailyLog>, RemoteError> {
        self.get_list(
            "daily_logs",
            &[
                ("user_id", eq(user_id)),
                ("order", "log_date.desc".to_string()),
            ],
        )
        .await
    }

    async fn get_daily_log(
        &self,
        user_id: &str,
        log_date: NaiveDate,
    ) -> Result<Option<DailyLog>, RemoteError> {
        self.get_single(
            "daily_logs",
            &[
                ("user_id", eq(user_id)),
                ("log_date", eq(&log_date.to_string())),
            ],
        )
        .await
    }

    async fn upsert_daily_log(&self, log: &DailyLog) -> Result<(), RemoteError> {
        self.upsert("daily_logs", "user_id,log_date", log).await
    }

    async fn insert_daily_log(&self, log: &DailyLog) -> Result<DailyLog, RemoteError> {
        self.insert_returning("daily_logs", log).await
    }

    async fn update_daily_log(&self, id: &str, log: &DailyLog) -> Result<DailyLog, RemoteError> {
        self.patch_returning(
            "daily_logs",
            &[("id", eq(id))],
            &json!({
                "baseline_check": log.baseline_check,
                "one_line": log.one_line,
                "body_state": log.body_state,
                "memo": log.memo,
                "updated_at": log.updated_at,
            }),
        )
        .await
    }
}
