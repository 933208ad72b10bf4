use crate::{
    error::Result,
    models::{
        session::SessionContext,
        work::*,
        ApiResponse,
    },
    services::PaginatedResult,
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
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const SECTION_LIMIT: usize = 5;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_works).post(create_work))
        .route("/latest", get(latest_works))
        .route("/popular", get(popular_works))
        .route("/home", get(home_feed))
        .route("/genres/:genre", get(works_by_genre))
        .route("/themes/:theme", get(works_by_theme))
        .route("/:id", get(get_work).put(update_work).delete(delete_work))
        .route("/:id/like", get(like_state).post(toggle_like))
}

#[derive(Debug, Deserialize)]
struct SectionQuery {
    limit: Option<usize>,
}

impl SectionQuery {
    fn limit(&self) -> usize {
        self.limit.unwrap_or(SECTION_LIMIT).clamp(1, 50)
    }
}

/// GET /api/hall/works
async fn list_works(
    State(state): State<Arc<AppState>>,
    OptionalAuth(viewer): OptionalAuth,
    Query(filter): Query<WorkListQuery>,
) -> Result<Json<ApiResponse<PaginatedResult<Work>>>> {
    let works = state.work_service.list_works(&filter, viewer.as_ref()).await?;
    Ok(Json(ApiResponse::success(works)))
}

async fn latest_works(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SectionQuery>,
) -> Result<Json<ApiResponse<Vec<Work>>>> {
    let works = state.work_service.latest(query.limit()).await?;
    Ok(Json(ApiResponse::success(works)))
}

async fn popular_works(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SectionQuery>,
) -> Result<Json<ApiResponse<Vec<Work>>>> {
    let works = state.work_service.popular(query.limit()).await?;
    Ok(Json(ApiResponse::success(works)))
}

/// 首页：最新、热门、推荐书房与主题书架
async fn home_feed(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse<HomeFeed>>> {
    let feed = state.work_service.home_feed().await?;
    Ok(Json(ApiResponse::success(feed)))
}

async fn works_by_genre(
    State(state): State<Arc<AppState>>,
    OptionalAuth(viewer): OptionalAuth,
    Path(genre): Path<String>,
    Query(mut filter): Query<WorkListQuery>,
) -> Result<Json<ApiResponse<PaginatedResult<Work>>>> {
    filter.genre = Some(genre);
    let works = state.work_service.list_works(&filter, viewer.as_ref()).await?;
    Ok(Json(ApiResponse::success(works)))
}

async fn works_by_theme(
    State(state): State<Arc<AppState>>,
    OptionalAuth(viewer): OptionalAuth,
    Path(theme): Path<String>,
    Query(mut filter): Query<WorkListQuery>,
) -> Result<Json<ApiResponse<PaginatedResult<Work>>>> {
    filter.theme = Some(theme);
    let works = state.work_service.list_works(&filter, viewer.as_ref()).await?;
    Ok(Json(ApiResponse::success(works)))
}

/// POST /api/hall/works
async fn create_work(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    Json(request): Json<CreateWorkRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let work = state.work_service.create_work(&session, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": work
        })),
    ))
}

/// 作品详情，每次读取计一次浏览
async fn get_work(
    State(state): State<Arc<AppState>>,
    OptionalAuth(viewer): OptionalAuth,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<WorkDetail>>> {
    let detail = state.work_service.get_work(&id, viewer.as_ref()).await?;
    Ok(Json(ApiResponse::success(detail)))
}

async fn update_work(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    Path(id): Path<String>,
    Json(request): Json<UpdateWorkRequest>,
) -> Result<Json<ApiResponse<Work>>> {
    let work = state.work_service.update_work(&session, &id, request).await?;
    Ok(Json(ApiResponse::success(work)))
}

async fn delete_work(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    state.work_service.delete_work(&session, &id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Work deleted"
    })))
}

/// POST /api/hall/works/:id/like
async fn toggle_like(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<LikeToggle>>> {
    let result = state.interaction_service.toggle_like(&session, &id).await?;
    Ok(Json(ApiResponse::success(result)))
}

async fn like_state(
    State(state): State<Arc<AppState>>,
    OptionalAuth(viewer): OptionalAuth,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<LikeState>>> {
    let result = state.interaction_service.like_state(viewer.as_ref(), &id).await?;
    Ok(Json(ApiResponse::success(result)))
}
