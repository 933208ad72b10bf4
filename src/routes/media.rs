use crate::{
    error::{AppError, Result},
    models::{media::UploadedCover, session::SessionContext, ApiResponse},
    state::AppState,
};
use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tracing::{debug, error};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/covers", post(upload_cover))
        .route("/objects/:bucket/*key", get(serve_object))
}

/// 上传封面图片
/// POST /api/hall/media/covers
async fn upload_cover(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<UploadedCover>>)> {
    debug!("Processing cover upload for user: {}", session.user_id);

    let mut upload: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error!("Failed to process multipart field: {}", e);
        AppError::BadRequest("Could not read multipart body".to_string())
    })? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("cover").to_string();
        let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
        let data = field.bytes().await.map_err(|e| {
            error!("Failed to read file data: {}", e);
            AppError::BadRequest("Could not read file data".to_string())
        })?;
        upload = Some((filename, content_type, data.to_vec()));
        break;
    }

    let (filename, content_type, bytes) =
        upload.ok_or_else(|| AppError::BadRequest("Missing 'file' field".to_string()))?;

    let cover = state
        .media_service
        .upload_cover(&session, &filename, &content_type, bytes)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(cover))))
}

/// 读取存储对象
/// GET /api/hall/media/objects/:bucket/*key
async fn serve_object(
    State(state): State<Arc<AppState>>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<Response> {
    let key = key.trim_start_matches('/');
    let (bytes, content_type) = state.media_service.fetch_object(&bucket, key).await?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "public, max-age=31536000".to_string()),
        ],
        bytes,
    )
        .into_response())
}
