mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use common::*;
use literary_hall::{
    routes,
    services::backend::{
        schema::{COMMENTS, INTERACTIONS},
        Query,
    },
    AppState,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const OWNER: &str = "11111111-1111-1111-1111-111111111111";
const READER: &str = "22222222-2222-2222-2222-222222222222";

async fn setup() -> (Arc<AppState>, Router) {
    let state = memory_state().await;
    let app = routes::app(state.clone());
    (state, app)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

#[tokio::test]
async fn health_reports_backend() {
    let (_, app) = setup().await;
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["backend"], "memory");
}

#[tokio::test]
async fn unauthenticated_mutations_fail_fast() {
    let (state, app) = setup().await;
    let work_id = seed_work(&state.db, OWNER, None, "잠긴 문").await;

    let (status, body) = send(&app, Method::POST, &format!("/api/hall/works/{}/like", work_id), None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTHENTICATION_ERROR");
    assert_eq!(body["error"]["message"], "Authentication required");

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/hall/comments/work/{}", work_id),
        Some("not-a-valid-token"),
        Some(json!({ "content": "안녕하세요" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(state.db.count(INTERACTIONS, &Query::new()).await.unwrap(), 0);
    assert_eq!(state.db.count(COMMENTS, &Query::new()).await.unwrap(), 0);
}

#[tokio::test]
async fn signup_login_and_session_flow() {
    let (state, app) = setup().await;
    let credentials = json!({ "email": "reader@example.com", "password": "secret123" });

    let (status, body) = send(&app, Method::POST, "/api/hall/auth/signup", None, Some(credentials.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let user_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, Method::POST, "/api/hall/auth/signup", None, Some(credentials.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/hall/auth/login",
        None,
        Some(json!({ "email": "reader@example.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, Method::POST, "/api/hall/auth/login", None, Some(credentials)).await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["access_token"].as_str().unwrap().to_string();

    let (status, body) = send(&app, Method::GET, "/api/hall/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user_id"], user_id.as_str());
    assert_eq!(body["data"]["is_admin"], false);
    assert!(state.user_service.find_profile(&user_id).await.unwrap().is_some());

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/hall/users/me",
        Some(&token),
        Some(json!({ "full_name": "독자", "bio": "시를 읽습니다" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["full_name"], "독자");

    let (status, _) = send(&app, Method::POST, "/api/hall/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn signup_rejects_short_password() {
    let (_, app) = setup().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/hall/auth/signup",
        None,
        Some(json!({ "email": "reader@example.com", "password": "123" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn like_comment_and_notifications_over_http() {
    let (state, app) = setup().await;
    seed_profile(&state.db, READER, "독자").await;
    let work_id = seed_work(&state.db, OWNER, None, "봄비").await;
    let reader = token_for(&state.config, READER);
    let owner = token_for(&state.config, OWNER);

    let (status, body) = send(&app, Method::POST, &format!("/api/hall/works/{}/like", work_id), Some(&reader), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["liked"], true);
    assert_eq!(body["data"]["like_count"], 1);

    let (_, body) = send(&app, Method::GET, &format!("/api/hall/works/{}/like", work_id), Some(&reader), None).await;
    assert_eq!(body["data"]["liked"], true);
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/hall/comments/work/{}", work_id),
        Some(&reader),
        Some(json!({ "content": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/hall/comments/work/{}", work_id),
        Some(&reader),
        Some(json!({ "content": "좋은 시입니다" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["author_name"], "독자");

    let (_, body) = send(&app, Method::GET, "/api/hall/notifications/unread-count", Some(&owner), None).await;
    assert_eq!(body["data"]["unread"], 2);

    let (status, body) = send(&app, Method::GET, "/api/hall/notifications", Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["type"], "comment");
    assert_eq!(items[0]["actor_name"], "독자");
    assert_eq!(items[0]["work_title"], "봄비");

    let id = items[1]["id"].as_str().unwrap();
    let (status, body) = send(&app, Method::POST, &format!("/api/hall/notifications/{}/read", id), Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_read"], true);

    let (_, body) = send(&app, Method::POST, "/api/hall/notifications/read-all", Some(&owner), None).await;
    assert_eq!(body["data"]["updated"], 1);
}

#[tokio::test]
async fn only_admin_can_delete_works() {
    let (state, app) = setup().await;
    let work_id = seed_work(&state.db, OWNER, None, "지울 수 없는 시").await;
    let owner = token_for(&state.config, OWNER);
    let admin = token_for(&state.config, ADMIN_ID);

    let (status, _) = send(&app, Method::DELETE, &format!("/api/hall/works/{}", work_id), Some(&owner), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::DELETE, &format!("/api/hall/works/{}", work_id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::GET, &format!("/api/hall/works/{}", work_id), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_and_list_works() {
    let (state, app) = setup().await;
    let owner = token_for(&state.config, OWNER);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/hall/libraries",
        Some(&owner),
        Some(json!({ "name": "작가의 서재" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/hall/works",
        Some(&owner),
        Some(json!({ "title": "미래의 편지", "genre": "시", "themes": ["미래", " 미래 ", ""] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["themes"], json!(["미래"]));
    assert!(body["data"]["library_id"].is_string());

    let uri = format!("/api/hall/works/themes/{}", urlencoding::encode("미래"));
    let (_, body) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(body["data"]["total"], 1);

    let uri = format!("/api/hall/works/genres/{}", urlencoding::encode("소설"));
    let (_, body) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(body["data"]["total"], 0);

    let (status, body) = send(&app, Method::GET, &format!("/api/hall/libraries/user/{}", OWNER), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_works"], 1);
    assert_eq!(body["data"]["is_owner"], false);
}

#[tokio::test]
async fn cover_upload_and_serve() {
    let (state, app) = setup().await;
    let token = token_for(&state.config, OWNER);
    let png = tiny_png(2, 3);

    let boundary = "hall-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"표지 1.png\"\r\nContent-Type: image/png\r\n\r\n",
            b = boundary
        )
        .as_bytes(),
    );
    body.extend_from_slice(&png);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/hall/media/covers")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
        .body(Body::from(body))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let uploaded: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(uploaded["data"]["width"], 2);
    assert_eq!(uploaded["data"]["height"], 3);
    assert_eq!(uploaded["data"]["content_type"], "image/png");
    assert!(uploaded["data"]["key"].as_str().unwrap().ends_with("___1.png"));

    let url = uploaded["data"]["url"].as_str().unwrap();
    let path = url.trim_start_matches(state.config.public_base_url.as_str());
    let response = app
        .clone()
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let served = hyper::body::to_bytes(response.into_body()).await.unwrap();
    assert_eq!(served.to_vec(), png);
}

#[tokio::test]
async fn admin_inspector_requires_admin() {
    let (state, app) = setup().await;
    seed_work(&state.db, OWNER, None, "표본").await;
    let user = token_for(&state.config, OWNER);
    let admin = token_for(&state.config, ADMIN_ID);

    let (status, _) = send(&app, Method::GET, "/api/hall/admin/tables", Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::GET, "/api/hall/admin/tables", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let works = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["table_name"] == "works")
        .cloned()
        .unwrap();
    assert_eq!(works["row_count"], 1);

    let (status, body) = send(&app, Method::GET, "/api/hall/admin/tables/works", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["sample_rows"].as_array().unwrap().len(), 1);

    let (status, _) = send(&app, Method::GET, "/api/hall/admin/tables/nope", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::GET, "/api/hall/admin/schema.txt", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let text = body.as_str().unwrap();
    assert!(text.starts_with("=== "));
    assert!(text.contains("=== works 테이블 구조 ==="));
    assert!(text.contains("- like_count (integer, nullable: NO, default: 0)"));
}

#[tokio::test]
async fn huge_page_number_returns_empty_page() {
    let (state, app) = setup().await;
    let work_id = seed_work(&state.db, OWNER, None, "끝없는 페이지").await;
    let reader = token_for(&state.config, READER);
    send(
        &app,
        Method::POST,
        &format!("/api/hall/comments/work/{}", work_id),
        Some(&reader),
        Some(json!({ "content": "첫 댓글" })),
    )
    .await;

    let uri = format!("/api/hall/comments/work/{}?page={}&limit=2", work_id, usize::MAX);
    let (status, body) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
}
