use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::{
    auth::{AuthRouterExt, AuthUser},
    entities::{event, order, promoter},
    handlers::common::{created, ok, CreatedResult},
    services::{orders::OrderFilter, promoters::PromoterApplicationRequest},
    ApiResult, AppState, ListQuery, PaginatedResponse,
};

pub fn router() -> Router<AppState> {
    let account = Router::new()
        .route("/promoters/apply", post(apply))
        .route("/promoters/me", get(get_mine))
        .route("/promoters/me/events", get(list_my_events))
        .route("/promoters/me/orders", get(list_my_orders))
        .with_auth();

    account.route("/promoters/:id", get(get_promoter))
}

/// Apply to host events; verified members only
#[utoipa::path(
    post,
    path = "/api/v1/promoters/apply",
    request_body = PromoterApplicationRequest,
    responses(
        (status = 201, description = "Application submitted", body = crate::ApiResponse<promoter::Model>),
        (status = 403, description = "Not a verified member", body = crate::errors::ErrorResponse),
        (status = 409, description = "Application already pending or approved", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Promoters"
)]
pub async fn apply(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<PromoterApplicationRequest>,
) -> CreatedResult<promoter::Model> {
    let promoter = state.services.promoters.apply(user.user_id, payload).await?;
    Ok(created(promoter))
}

#[utoipa::path(
    get,
    path = "/api/v1/promoters/me",
    responses(
        (status = 200, description = "Own promoter application", body = crate::ApiResponse<promoter::Model>),
        (status = 404, description = "No application yet", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Promoters"
)]
pub async fn get_mine(State(state): State<AppState>, user: AuthUser) -> ApiResult<promoter::Model> {
    Ok(ok(state.services.promoters.get_mine(user.user_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/promoters/me/events",
    params(ListQuery),
    responses(
        (status = 200, description = "Own events, any status", body = crate::ApiResponse<PaginatedResponse<event::Model>>),
        (status = 403, description = "Not an approved promoter", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Promoters"
)]
pub async fn list_my_events(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<event::Model>> {
    let page = state
        .services
        .events
        .list_mine(user.user_id, query.pagination())
        .await?;
    Ok(ok(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/promoters/me/orders",
    params(ListQuery, OrderFilter),
    responses(
        (status = 200, description = "Ticket orders for own events", body = crate::ApiResponse<PaginatedResponse<order::Model>>),
        (status = 403, description = "Not an approved promoter", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Promoters"
)]
pub async fn list_my_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListQuery>,
    Query(filter): Query<OrderFilter>,
) -> ApiResult<PaginatedResponse<order::Model>> {
    let page = state
        .services
        .orders
        .list_for_promoter(user.user_id, filter, query.pagination())
        .await?;
    Ok(ok(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/promoters/{id}",
    params(("id" = Uuid, Path, description = "Promoter id")),
    responses(
        (status = 200, description = "Approved promoter", body = crate::ApiResponse<promoter::Model>),
        (status = 404, description = "Unknown or unapproved promoter", body = crate::errors::ErrorResponse)
    ),
    tag = "Promoters"
)]
pub async fn get_promoter(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<promoter::Model> {
    Ok(ok(state.services.promoters.get_public(id).await?))
}
