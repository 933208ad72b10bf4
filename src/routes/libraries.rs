use crate::{
    error::Result,
    models::{library::*, session::SessionContext, work::Work, ApiResponse},
    state::AppState,
    utils::middleware::OptionalAuth,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_library))
        .route("/recommended", get(recommended_libraries))
        .route("/me", put(update_settings))
        .route("/user/:user_id", get(library_by_user))
        .route("/:id/works", get(library_works))
}

#[derive(Debug, Deserialize)]
struct RecommendedQuery {
    limit: Option<usize>,
}

/// POST /api/hall/libraries
async fn create_library(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    Json(request): Json<CreateLibraryRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let library = state.library_service.create_library(&session, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": library
        })),
    ))
}

async fn recommended_libraries(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecommendedQuery>,
) -> Result<Json<ApiResponse<Vec<Library>>>> {
    let libraries = state.library_service.recommended(query.limit.unwrap_or(3)).await?;
    Ok(Json(ApiResponse::success(libraries)))
}

/// 书房设置
/// PUT /api/hall/libraries/me
async fn update_settings(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    Json(request): Json<UpdateLibraryRequest>,
) -> Result<Json<ApiResponse<Library>>> {
    let library = state.library_service.update_settings(&session, request).await?;
    Ok(Json(ApiResponse::success(library)))
}

async fn library_by_user(
    State(state): State<Arc<AppState>>,
    OptionalAuth(viewer): OptionalAuth,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<LibraryView>>> {
    let view = state.library_service.get_library_by_user(&user_id, viewer.as_ref()).await?;
    Ok(Json(ApiResponse::success(view)))
}

async fn library_works(
    State(state): State<Arc<AppState>>,
    OptionalAuth(viewer): OptionalAuth,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Work>>>> {
    let works = state.library_service.list_library_works(&id, viewer.as_ref()).await?;
    Ok(Json(ApiResponse::success(works)))
}
