use crate::{
    error::Result,
    models::session::SessionContext,
    services::auth::{SignInRequest, SignUpRequest},
    state::AppState,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/signup", post(sign_up))
        .route("/login", post(sign_in))
        .route("/logout", post(sign_out))
        .route("/me", get(current_session))
}

/// 注册
/// POST /api/hall/auth/signup
async fn sign_up(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let user = state.auth_service.sign_up(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": user
        })),
    ))
}

/// 登录
/// POST /api/hall/auth/login
async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SignInRequest>,
) -> Result<Json<Value>> {
    let session = state.auth_service.sign_in(request).await?;

    Ok(Json(json!({
        "success": true,
        "data": session
    })))
}

/// POST /api/hall/auth/logout
async fn sign_out(State(state): State<Arc<AppState>>, session: SessionContext) -> Result<Json<Value>> {
    state.auth_service.sign_out(&session).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Signed out"
    })))
}

/// 当前会话
/// GET /api/hall/auth/me
async fn current_session(State(state): State<Arc<AppState>>, session: SessionContext) -> Result<Json<Value>> {
    let profile = state.user_service.find_profile(&session.user_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "user_id": session.user_id,
            "email": session.email,
            "is_admin": session.is_admin,
            "profile": profile,
        }
    })))
}
