use crate::{
    error::Result,
    models::{session::SessionContext, PaginationQuery},
    state::AppState,
    utils::middleware::OptionalAuth,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/library/:library_id", post(toggle_follow))
        .route("/library/:library_id/followers", get(list_followers))
        .route("/library/:library_id/is-following", get(is_following))
}

/// 关注或取消关注书房
/// POST /api/hall/follows/library/:library_id
async fn toggle_follow(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    Path(library_id): Path<String>,
) -> Result<Json<Value>> {
    let result = state.interaction_service.toggle_follow(&session, &library_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": result
    })))
}

async fn list_followers(
    State(state): State<Arc<AppState>>,
    OptionalAuth(viewer): OptionalAuth,
    Path(library_id): Path<String>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<Value>> {
    let (page, limit) = pagination.resolve(20);
    let followers = state
        .library_service
        .list_followers(&library_id, viewer.as_ref(), page, limit)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": followers
    })))
}

async fn is_following(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    Path(library_id): Path<String>,
) -> Result<Json<Value>> {
    let following = state.interaction_service.is_following(&session, &library_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "library_id": library_id, "following": following }
    })))
}
