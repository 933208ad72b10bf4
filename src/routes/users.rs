use crate::{
    error::Result,
    models::{library::Library, profile::*, session::SessionContext, work::Work, ApiResponse},
    state::AppState,
    utils::middleware::OptionalAuth,
};
use axum::{
    extract::{Path, State},
    response::Json,
    routing::get,
    Router,
};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/me", get(my_profile).put(update_profile))
        .route("/me/likes", get(liked_works))
        .route("/:id", get(get_profile))
        .route("/:id/works", get(user_works))
        .route("/:id/libraries", get(user_libraries))
}

/// 当前用户资料，缺失时补建
/// GET /api/hall/users/me
async fn my_profile(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
) -> Result<Json<ApiResponse<Profile>>> {
    let profile = state.user_service.create_profile(&session.user_id).await?;
    Ok(Json(ApiResponse::success(profile)))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<Profile>>> {
    let profile = state.user_service.update_profile(&session, request).await?;
    Ok(Json(ApiResponse::success_with_message(profile, "Profile updated".to_string())))
}

/// 我赞过的作品
async fn liked_works(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
) -> Result<Json<ApiResponse<Vec<Work>>>> {
    let works = state.user_service.liked_works(&session).await?;
    Ok(Json(ApiResponse::success(works)))
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Profile>>> {
    let profile = state.user_service.get_profile(&id).await?;
    Ok(Json(ApiResponse::success(profile)))
}

async fn user_works(
    State(state): State<Arc<AppState>>,
    OptionalAuth(viewer): OptionalAuth,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Work>>>> {
    let works = state.user_service.user_works(&id, viewer.as_ref()).await?;
    Ok(Json(ApiResponse::success(works)))
}

async fn user_libraries(
    State(state): State<Arc<AppState>>,
    OptionalAuth(viewer): OptionalAuth,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Library>>>> {
    let libraries = state.user_service.user_libraries(&id, viewer.as_ref()).await?;
    Ok(Json(ApiResponse::success(libraries)))
}
