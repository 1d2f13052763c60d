use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use crate::{
    auth::{AuthRouterExt, AuthUser},
    entities::order,
    handlers::common::ok,
    services::orders::OrderFilter,
    ApiResult, AppState, ListQuery, PaginatedResponse,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/cancel", post(cancel_order))
        .with_auth()
}

/// The caller's own purchases, newest first
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(ListQuery, OrderFilter),
    responses(
        (status = 200, description = "Orders", body = crate::ApiResponse<PaginatedResponse<order::Model>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListQuery>,
    Query(filter): Query<OrderFilter>,
) -> ApiResult<PaginatedResponse<order::Model>> {
    let page = state
        .services
        .orders
        .list_for_user(user.user_id, filter, query.pagination())
        .await?;
    Ok(ok(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order", body = crate::ApiResponse<order::Model>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<order::Model> {
    let order = state
        .services
        .orders
        .get_for_viewer(user.user_id, user.is_admin, id)
        .await?;
    Ok(ok(order))
}

/// Abandon an unpaid order; a reserved steward listing becomes claimable again
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order cancelled", body = crate::ApiResponse<order::Model>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order is not pending", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<order::Model> {
    let order = state
        .services
        .checkout
        .cancel_for_user(user.user_id, id)
        .await?;
    Ok(ok(order))
}
