#![allow(dead_code)]

use jsonwebtoken::{encode, EncodingKey, Header};
use literary_hall::{
    config::Config,
    models::session::{Claims, SessionContext},
    services::{
        backend::{
            schema::{PROFILES, USER_LIBRARIES, WORKS},
            Backend, MemoryBackend,
        },
        Database,
    },
    state::AppState,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub const ADMIN_ID: &str = "00000000-0000-0000-0000-00000000a001";

pub fn test_config() -> Config {
    Config {
        admin_user_ids: vec![ADMIN_ID.to_string()],
        rate_limit_requests: 10_000,
        ..Config::default()
    }
}

pub fn memory_backend(config: &Config) -> Arc<MemoryBackend> {
    Arc::new(MemoryBackend::new(
        &config.jwt_secret,
        config.jwt_expiry_secs,
        &config.media_base_url(),
    ))
}

pub async fn state_with(config: Config, backend: Arc<dyn Backend>) -> Arc<AppState> {
    Arc::new(AppState::new(config, backend).await.expect("state"))
}

pub async fn memory_state() -> Arc<AppState> {
    let config = test_config();
    let backend = memory_backend(&config);
    state_with(config, backend).await
}

pub fn session(user_id: &str) -> SessionContext {
    SessionContext::new(user_id, "test-token")
}

pub fn admin_session() -> SessionContext {
    SessionContext::new(ADMIN_ID, "test-token").with_admin(true)
}

/// 按测试配置签发访问令牌
pub fn token_for(config: &Config, user_id: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        email: None,
        aud: Some("authenticated".to_string()),
        role: Some("authenticated".to_string()),
        exp: now + 3600,
        iat: now,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(config.jwt_secret.as_bytes()))
        .expect("token")
}

pub async fn seed_profile(db: &Database, user_id: &str, full_name: &str) {
    db.create::<Value, _>(PROFILES, &json!({ "id": user_id, "full_name": full_name, "bio": "" }))
        .await
        .expect("profile");
}

pub async fn seed_library(db: &Database, owner_id: &str, name: &str, is_public: bool) -> String {
    let row: Value = db
        .create(
            USER_LIBRARIES,
            &json!({ "user_id": owner_id, "name": name, "is_public": is_public }),
        )
        .await
        .expect("library");
    row["id"].as_str().expect("library id").to_string()
}

pub async fn seed_work(db: &Database, owner_id: &str, library_id: Option<&str>, title: &str) -> String {
    let row: Value = db
        .create(
            WORKS,
            &json!({
                "title": title,
                "genre": "시",
                "themes": ["미래"],
                "user_id": owner_id,
                "library_id": library_id,
            }),
        )
        .await
        .expect("work");
    row["id"].as_str().expect("work id").to_string()
}

pub async fn seed_private_work(db: &Database, owner_id: &str, title: &str) -> String {
    let row: Value = db
        .create(
            WORKS,
            &json!({ "title": title, "genre": "소설", "user_id": owner_id, "is_public": false }),
        )
        .await
        .expect("work");
    row["id"].as_str().expect("work id").to_string()
}

/// 最小 PNG：签名 + IHDR
pub fn tiny_png(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.extend_from_slice(&[0, 0, 0, 13]);
    bytes.extend_from_slice(b"IHDR");
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&height.to_be_bytes());
    bytes.extend_from_slice(&[8, 6, 0, 0, 0]);
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes
}
