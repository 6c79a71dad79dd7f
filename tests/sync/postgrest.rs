//! Wire-level tests for `PostgrestRemote` against a mock PostgREST server.

use chrono::NaiveDate;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use life_os_core::error::{LifeOsError, RemoteErrorKind};
use life_os_core::sync::postgrest::PostgrestRemote;
use life_os_core::sync::remote::RemoteStore;
use life_os_core::types::{Baseline, DailyLog, Phase, User};

async fn remote_for(server: &MockServer) -> PostgrestRemote {
    PostgrestRemote::new(&server.uri(), "test-key").expect("valid base url")
}

#[test]
fn invalid_base_url_is_rejected_at_construction() {
    let error = PostgrestRemote::new("not a url", "test-key").unwrap_err();
    assert!(matches!(error, LifeOsError::Remote(_)));
}

fn user_json(user: &User) -> serde_json::Value {
    serde_json::to_value(user).unwrap()
}

#[tokio::test]
async fn get_user_sends_eq_filter_and_auth_headers() {
    let server = MockServer::start().await;
    let user = User::new_anonymous();

    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("id", format!("eq.{}", user.id)))
        .and(header("apikey", "test-key"))
        .and(header("Authorization", "Bearer test-key"))
        .and(header("Accept", "application/vnd.pgrst.object+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json(&user)))
        .expect(1)
        .mount(&server)
        .await;

    let remote = remote_for(&server).await;
    let fetched = remote.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(fetched.id, user.id);
}

#[tokio::test]
async fn no_rows_code_maps_to_none_instead_of_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(406).set_body_json(json!({
            "code": "PGRST116",
            "message": "JSON object requested, multiple (or no) rows returned",
            "details": "The result contains 0 rows",
            "hint": null,
        })))
        .mount(&server)
        .await;

    let remote = remote_for(&server).await;
    assert!(remote.get_user("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn upsert_user_posts_with_merge_duplicates_on_id() {
    let server = MockServer::start().await;
    let user = User::new_anonymous();

    Mock::given(method("POST"))
        .and(path("/users"))
        .and(query_param("on_conflict", "id"))
        .and(header("Prefer", "resolution=merge-duplicates"))
        .and(body_partial_json(json!({ "id": user.id })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let remote = remote_for(&server).await;
    remote.upsert_user(&user).await.unwrap();
}

#[tokio::test]
async fn upsert_daily_log_targets_the_composite_conflict_key() {
    let server = MockServer::start().await;
    let log = DailyLog::new("u1", NaiveDate::from_ymd_opt(2025, 1, 27).unwrap());

    Mock::given(method("POST"))
        .and(path("/daily_logs"))
        .and(query_param("on_conflict", "user_id,log_date"))
        .and(body_partial_json(json!({ "log_date": "2025-01-27" })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let remote = remote_for(&server).await;
    remote.upsert_daily_log(&log).await.unwrap();
}

#[tokio::test]
async fn update_user_for_merge_patches_phase_and_anonymity() {
    let server = MockServer::start().await;
    let mut account = User::new_anonymous();
    account.auth_user_id = Some("auth-1".to_string());
    account.current_phase = Phase::Three;
    account.is_anonymous = false;

    Mock::given(method("PATCH"))
        .and(path("/users"))
        .and(query_param("auth_user_id", "eq.auth-1"))
        .and(header("Prefer", "return=representation"))
        .and(body_partial_json(json!({
            "current_phase": 3,
            "is_anonymous": false,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json(&account)))
        .expect(1)
        .mount(&server)
        .await;

    let remote = remote_for(&server).await;
    let updated = remote
        .update_user_for_merge("auth-1", Phase::Three)
        .await
        .unwrap();
    assert_eq!(updated.current_phase, Phase::Three);
    assert!(!updated.is_anonymous);
}

#[tokio::test]
async fn update_baseline_patches_only_the_mutable_fields() {
    let server = MockServer::start().await;
    let baseline = Baseline::new("u1", "23:00-06:00", 2.0, "5 lines");

    Mock::given(method("PATCH"))
        .and(path("/baselines"))
        .and(query_param("user_id", "eq.u1"))
        .and(body_partial_json(json!({
            "sleep": "23:00-06:00",
            "movement": 2.0,
            "record": "5 lines",
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::to_value(&baseline).unwrap()),
        )
        .mount(&server)
        .await;

    let remote = remote_for(&server).await;
    let updated = remote.update_baseline("u1", &baseline).await.unwrap();
    assert_eq!(updated.record, "5 lines");
}

#[tokio::test]
async fn get_daily_logs_requests_newest_first() {
    let server = MockServer::start().await;
    let newer = DailyLog::new("u1", NaiveDate::from_ymd_opt(2025, 1, 28).unwrap());
    let older = DailyLog::new("u1", NaiveDate::from_ymd_opt(2025, 1, 27).unwrap());

    Mock::given(method("GET"))
        .and(path("/daily_logs"))
        .and(query_param("user_id", "eq.u1"))
        .and(query_param("order", "log_date.desc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::to_value([&newer, &older]).unwrap()),
        )
        .mount(&server)
        .await;

    let remote = remote_for(&server).await;
    let logs = remote.get_daily_logs("u1").await.unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].id, newer.id);
}

#[tokio::test]
async fn server_errors_are_transient() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/baselines"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "code": "503",
            "message": "upstream unavailable",
        })))
        .mount(&server)
        .await;

    let remote = remote_for(&server).await;
    let error = remote.get_baseline("u1").await.unwrap_err();
    assert_eq!(error.kind, RemoteErrorKind::Transient);
    assert!(error.is_transient());
}

#[tokio::test]
async fn client_errors_are_terminal() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "22P02",
            "message": "invalid input syntax",
        })))
        .mount(&server)
        .await;

    let remote = remote_for(&server).await;
    let error = remote.upsert_user(&User::new_anonymous()).await.unwrap_err();
    assert_eq!(error.kind, RemoteErrorKind::Terminal);
    assert!(!error.is_transient());
}

#[tokio::test]
async fn insert_baseline_returns_the_created_row() {
    let server = MockServer::start().await;
    let baseline = Baseline::new("u1", "22:00-05:00", 1.0, "3 lines");

    Mock::given(method("POST"))
        .and(path("/baselines"))
        .and(header("Prefer", "return=representation"))
        .and(body_partial_json(json!({ "user_id": "u1" })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(serde_json::to_value(&baseline).unwrap()),
        )
        .mount(&server)
        .await;

    let remote = remote_for(&server).await;
    let created = remote.insert_baseline(&baseline).await.unwrap();
    assert_eq!(created.id, baseline.id);
}
