mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::*;
use literary_hall::{
    config::{BackendMode, Config},
    error::AppError,
    routes,
    services::{
        backend::{Backend, BackendError, Query, RestBackend},
        Database,
    },
};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::{
    matchers::{body_json, header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

fn backend(server: &MockServer) -> RestBackend {
    RestBackend::new(&server.uri(), "anon-key", "service-key", 5).unwrap()
}

#[tokio::test]
async fn select_renders_filters_and_service_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/works"))
        .and(header("apikey", "service-key"))
        .and(header("authorization", "Bearer service-key"))
        .and(query_param("genre", "eq.시"))
        .and(query_param("is_public", "eq.true"))
        .and(query_param("themes", "cs.{\"미래\"}"))
        .and(query_param("order", "like_count.desc,created_at.desc"))
        .and(query_param("limit", "5"))
        .and(query_param("select", "*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "w1", "title": "별" }])))
        .expect(1)
        .mount(&server)
        .await;

    let query = Query::new()
        .eq("genre", "시")
        .eq("is_public", true)
        .contains("themes", "미래")
        .order_desc("like_count")
        .order_desc("created_at")
        .limit(5);
    let rows = backend(&server).select("works", &query).await.unwrap();
    assert_eq!(rows, vec![json!({ "id": "w1", "title": "별" })]);
}

#[tokio::test]
async fn count_reads_content_range() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/rest/v1/interactions"))
        .and(header("prefer", "count=exact"))
        .and(query_param("work_id", "eq.w1"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-range", "0-6/7"))
        .expect(1)
        .mount(&server)
        .await;

    let count = backend(&server)
        .count("interactions", &Query::new().eq("work_id", "w1").limit(1))
        .await
        .unwrap();
    assert_eq!(count, 7);
}

#[tokio::test]
async fn duplicate_insert_maps_to_unique_violation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/library_followers"))
        .and(header("prefer", "return=representation"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"library_followers_library_id_follower_id_key\""
        })))
        .mount(&server)
        .await;

    let db = Database::new(Arc::new(backend(&server)));
    let err = db
        .create::<serde_json::Value, _>("library_followers", &json!({ "library_id": "l1", "follower_id": "u1" }))
        .await
        .unwrap_err();
    assert!(err.is_unique_violation());
    assert!(matches!(err, AppError::Backend(BackendError::Conflict(ref m)) if m.contains("duplicate key")));
}

#[tokio::test]
async fn increment_goes_through_rpc() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/increment_counter"))
        .and(body_json(json!({
            "p_table": "works",
            "p_id": "w1",
            "p_column": "view_count",
            "p_delta": 1
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(12)))
        .expect(1)
        .mount(&server)
        .await;

    let value = backend(&server).increment("works", "w1", "view_count", 1).await.unwrap();
    assert_eq!(value, 12);
}

#[tokio::test]
async fn sign_in_uses_anon_key_and_parses_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(header("apikey", "anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "jwt-token",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "ignored",
            "user": { "id": "u1", "email": "reader@example.com", "aud": "authenticated" }
        })))
        .mount(&server)
        .await;

    let session = backend(&server).sign_in("reader@example.com", "secret123").await.unwrap();
    assert_eq!(session.access_token, "jwt-token");
    assert_eq!(session.expires_in, 3600);
    assert_eq!(session.user.id, "u1");
}

#[tokio::test]
async fn auth_errors_are_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({ "msg": "User already registered" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&server)
        .await;

    let rest = backend(&server);
    let err = rest.sign_up("reader@example.com", "secret123").await.unwrap_err();
    assert!(matches!(err, BackendError::Conflict(_)));

    let err = rest.sign_in("reader@example.com", "wrong").await.unwrap_err();
    assert!(matches!(err, BackendError::Status { status: 400, .. }));
}

#[tokio::test]
async fn storage_upload_and_public_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/storage/v1/object/covers/1700000000000_cover.png"))
        .and(header("content-type", "image/png"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Key": "covers/1700000000000_cover.png" })))
        .expect(1)
        .mount(&server)
        .await;

    let rest = backend(&server);
    rest.upload("covers", "1700000000000_cover.png", vec![1, 2, 3], "image/png")
        .await
        .unwrap();
    assert_eq!(
        rest.public_url("covers", "1700000000000_cover.png"),
        format!("{}/storage/v1/object/public/covers/1700000000000_cover.png", server.uri())
    );
}

async fn mount_invalid_uuid(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/works"))
        .and(query_param("id", "eq.abc"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "22P02",
            "details": null,
            "hint": null,
            "message": "invalid input syntax for type uuid: \"abc\""
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn malformed_id_is_reported_as_not_found() {
    let server = MockServer::start().await;
    mount_invalid_uuid(&server).await;

    let rest = backend(&server);
    let err = rest.select("works", &Query::new().eq("id", "abc")).await.unwrap_err();
    assert!(matches!(err, BackendError::NotFound(ref m) if m.contains("uuid")));

    let db = Database::new(Arc::new(rest));
    let found: Option<serde_json::Value> = db.get_by_id("works", "abc").await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn malformed_work_id_returns_404_over_http() {
    let server = MockServer::start().await;
    mount_invalid_uuid(&server).await;

    let config = Config {
        backend_mode: BackendMode::Rest,
        supabase_url: server.uri(),
        supabase_anon_key: "anon-key".to_string(),
        supabase_service_key: "service-key".to_string(),
        ..test_config()
    };
    let state = state_with(config, Arc::new(backend(&server))).await;
    let app = routes::app(state);

    let response = app
        .oneshot(Request::builder().uri("/api/hall/works/abc").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn other_bad_requests_stay_status_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/works"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "PGRST100",
            "message": "failed to parse filter"
        })))
        .mount(&server)
        .await;

    let err = backend(&server).select("works", &Query::new()).await.unwrap_err();
    assert!(matches!(err, BackendError::Status { status: 400, .. }));
}
