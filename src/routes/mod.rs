use crate::{
    state::AppState,
    utils::middleware::{auth_middleware, rate_limit_middleware, request_logging_middleware},
};
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, Method},
    middleware,
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

pub mod admin;
pub mod auth;
pub mod comments;
pub mod follows;
pub mod libraries;
pub mod media;
pub mod notifications;
pub mod users;
pub mod works;

/// multipart 头部等额外开销
const BODY_LIMIT_SLACK: usize = 64 * 1024;

fn cors_layer(allowed_origins: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    if allowed_origins.split(',').any(|origin| origin.trim() == "*") {
        return cors.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

/// 构建应用路由，统一使用 /api/hall 前缀
pub fn app(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_size as usize + BODY_LIMIT_SLACK;
    let timeout = Duration::from_secs(state.config.request_timeout_secs.max(1));

    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .nest("/api/hall/auth", auth::router())
        .nest("/api/hall/works", works::router())
        .nest("/api/hall/comments", comments::router())
        .nest("/api/hall/libraries", libraries::router())
        .nest("/api/hall/follows", follows::router())
        .nest("/api/hall/users", users::router())
        .nest("/api/hall/notifications", notifications::router())
        .nest("/api/hall/media", media::router())
        .nest("/api/hall/admin", admin::router())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TimeoutLayer::new(timeout))
        .layer(cors_layer(&state.config.cors_allowed_origins))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "literary-hall",
        "backend": state.db.backend().name(),
    }))
}
