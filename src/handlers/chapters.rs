use axum::{
    extract::{Path, Query, State},
    routing::get,
    Router,
};
use uuid::Uuid;

use crate::{
    entities::chapter,
    handlers::common::ok,
    services::chapters::ChapterFilter,
    ApiResult, AppState, ListQuery, PaginatedResponse,
};

/// Public chapter directory; changes go through `/admin/chapters`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chapters", get(list_chapters))
        .route("/chapters/:id", get(get_chapter))
}

#[utoipa::path(
    get,
    path = "/api/v1/chapters",
    params(ListQuery, ChapterFilter),
    responses(
        (status = 200, description = "Chapters", body = crate::ApiResponse<PaginatedResponse<chapter::Model>>)
    ),
    tag = "Chapters"
)]
pub async fn list_chapters(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Query(filter): Query<ChapterFilter>,
) -> ApiResult<PaginatedResponse<chapter::Model>> {
    let page = state
        .services
        .chapters
        .list(filter, query.pagination())
        .await?;
    Ok(ok(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/chapters/{id}",
    params(("id" = Uuid, Path, description = "Chapter id")),
    responses(
        (status = 200, description = "Chapter", body = crate::ApiResponse<chapter::Model>),
        (status = 404, description = "Unknown chapter", body = crate::errors::ErrorResponse)
    ),
    tag = "Chapters"
)]
pub async fn get_chapter(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<chapter::Model> {
    Ok(ok(state.services.chapters.get(id).await?))
}
