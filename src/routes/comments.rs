use crate::{
    error::Result,
    models::{comment::*, session::SessionContext, PaginationQuery},
    state::AppState,
    utils::middleware::OptionalAuth,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/work/:work_id", get(list_comments).post(post_comment))
}

/// 作品评论，按时间正序
/// GET /api/hall/comments/work/:work_id
async fn list_comments(
    State(state): State<Arc<AppState>>,
    OptionalAuth(viewer): OptionalAuth,
    Path(work_id): Path<String>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<Value>> {
    let (page, limit) = pagination.resolve(state.get_page_size("comments"));
    let comments = state
        .interaction_service
        .list_comments(viewer.as_ref(), &work_id, page, limit)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": comments
    })))
}

/// POST /api/hall/comments/work/:work_id
async fn post_comment(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    Path(work_id): Path<String>,
    Json(request): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let comment = state
        .interaction_service
        .post_comment(&session, &work_id, &request.content)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": comment
        })),
    ))
}
