use crate::{
    error::Result,
    models::{notification::*, session::SessionContext, ApiResponse, PaginationQuery},
    state::AppState,
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
        .route("/", get(list_notifications))
        .route("/unread-count", get(unread_count))
        .route("/read-all", post(mark_all_read))
        .route("/:id/read", post(mark_read))
}

/// 通知列表，最新的在前
/// GET /api/hall/notifications
async fn list_notifications(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<ApiResponse<Vec<NotificationView>>>> {
    let (page, limit) = pagination.resolve(20);
    let notifications = state
        .interaction_service
        .list_notifications(&session, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(notifications)))
}

async fn unread_count(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
) -> Result<Json<ApiResponse<UnreadCount>>> {
    let unread = state.notification_service.unread_count(&session).await?;
    Ok(Json(ApiResponse::success(UnreadCount { unread })))
}

async fn mark_all_read(State(state): State<Arc<AppState>>, session: SessionContext) -> Result<Json<Value>> {
    let updated = state.notification_service.mark_all_read(&session).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "updated": updated }
    })))
}

/// POST /api/hall/notifications/:id/read
async fn mark_read(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Notification>>> {
    let notification = state.interaction_service.mark_notification_read(&session, &id).await?;
    Ok(Json(ApiResponse::success(notification)))
}
