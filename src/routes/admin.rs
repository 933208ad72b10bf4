use crate::{
    error::Result,
    models::{
        admin::{TableDescription, TableInfo},
        session::SessionContext,
        ApiResponse,
    },
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use std::sync::Arc;

/// 管理诊断，只读
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tables", get(list_tables))
        .route("/tables/:name", get(describe_table))
        .route("/schema.txt", get(schema_text))
}

async fn list_tables(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
) -> Result<Json<ApiResponse<Vec<TableInfo>>>> {
    let tables = state.inspector_service.list_tables(&session).await?;
    Ok(Json(ApiResponse::success(tables)))
}

async fn describe_table(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<TableDescription>>> {
    let description = state.inspector_service.describe_table(&session, &name).await?;
    Ok(Json(ApiResponse::success(description)))
}

async fn schema_text(State(state): State<Arc<AppState>>, session: SessionContext) -> Result<Response> {
    let text = state.inspector_service.schema_text(&session).await?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text).into_response())
}
