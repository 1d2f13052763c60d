use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};

use crate::{
    auth::{AuthRouterExt, AuthUser},
    entities::{steward, steward_listing},
    handlers::common::{created, ok, CreatedResult},
    services::stewards::StewardApplicationRequest,
    ApiResult, AppState, ListQuery, PaginatedResponse,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stewards/apply", post(apply))
        .route("/stewards/me", get(get_mine))
        .route("/stewards/me/listings", get(list_my_listings))
        .with_auth()
}

/// Apply to give away legacy items on behalf of an active chapter
#[utoipa::path(
    post,
    path = "/api/v1/stewards/apply",
    request_body = StewardApplicationRequest,
    responses(
        (status = 201, description = "Application submitted", body = crate::ApiResponse<steward::Model>),
        (status = 400, description = "Invalid payload or inactive chapter", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not a verified member", body = crate::errors::ErrorResponse),
        (status = 409, description = "Application already pending or approved", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Stewards"
)]
pub async fn apply(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<StewardApplicationRequest>,
) -> CreatedResult<steward::Model> {
    let steward = state.services.stewards.apply(user.user_id, payload).await?;
    Ok(created(steward))
}

#[utoipa::path(
    get,
    path = "/api/v1/stewards/me",
    responses(
        (status = 200, description = "Own steward application", body = crate::ApiResponse<steward::Model>),
        (status = 404, description = "No application yet", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Stewards"
)]
pub async fn get_mine(State(state): State<AppState>, user: AuthUser) -> ApiResult<steward::Model> {
    Ok(ok(state.services.stewards.get_mine(user.user_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/stewards/me/listings",
    params(ListQuery),
    responses(
        (status = 200, description = "Own listings, any status", body = crate::ApiResponse<PaginatedResponse<steward_listing::Model>>),
        (status = 403, description = "Not an approved steward", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Stewards"
)]
pub async fn list_my_listings(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<steward_listing::Model>> {
    let page = state
        .services
        .listings
        .list_mine(user.user_id, query.pagination())
        .await?;
    Ok(ok(page))
}
