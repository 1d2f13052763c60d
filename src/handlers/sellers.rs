use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::{
    auth::{AuthRouterExt, AuthUser, MaybeAuthUser},
    entities::{order, product, seller},
    handlers::common::{created, ok, CreatedResult},
    services::{
        access::{Purchasable, Viewer},
        orders::OrderFilter,
        sellers::SellerApplicationRequest,
    },
    ApiResult, AppState, ListQuery, PaginatedResponse,
};

pub fn router() -> Router<AppState> {
    let account = Router::new()
        .route("/sellers/apply", post(apply))
        .route("/sellers/me", get(get_mine))
        .route("/sellers/me/products", get(list_my_products))
        .route("/sellers/me/orders", get(list_my_orders))
        .with_auth();

    let storefront = Router::new()
        .route("/sellers/:id", get(get_seller))
        .route("/sellers/:id/products", get(list_seller_products))
        .with_optional_auth();

    account.merge(storefront)
}

/// Apply to sell; a rejected application may be resubmitted
#[utoipa::path(
    post,
    path = "/api/v1/sellers/apply",
    request_body = SellerApplicationRequest,
    responses(
        (status = 201, description = "Application submitted", body = crate::ApiResponse<seller::Model>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 409, description = "Application already pending or approved", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Sellers"
)]
pub async fn apply(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<SellerApplicationRequest>,
) -> CreatedResult<seller::Model> {
    let seller = state.services.sellers.apply(user.user_id, payload).await?;
    Ok(created(seller))
}

#[utoipa::path(
    get,
    path = "/api/v1/sellers/me",
    responses(
        (status = 200, description = "Own seller application", body = crate::ApiResponse<seller::Model>),
        (status = 404, description = "No application yet", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Sellers"
)]
pub async fn get_mine(State(state): State<AppState>, user: AuthUser) -> ApiResult<seller::Model> {
    Ok(ok(state.services.sellers.get_mine(user.user_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/sellers/me/products",
    params(ListQuery),
    responses(
        (status = 200, description = "Own products, any status", body = crate::ApiResponse<PaginatedResponse<product::Model>>),
        (status = 403, description = "Not an approved seller", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Sellers"
)]
pub async fn list_my_products(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<product::Model>> {
    let page = state
        .services
        .products
        .list_mine(user.user_id, query.pagination())
        .await?;
    Ok(ok(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/sellers/me/orders",
    params(ListQuery, OrderFilter),
    responses(
        (status = 200, description = "Orders for own products", body = crate::ApiResponse<PaginatedResponse<order::Model>>),
        (status = 403, description = "Not an approved seller", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Sellers"
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
        .list_for_seller(user.user_id, filter, query.pagination())
        .await?;
    Ok(ok(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/sellers/{id}",
    params(("id" = Uuid, Path, description = "Seller id")),
    responses(
        (status = 200, description = "Approved seller", body = crate::ApiResponse<seller::Model>),
        (status = 404, description = "Unknown or unapproved seller", body = crate::errors::ErrorResponse)
    ),
    tag = "Sellers"
)]
pub async fn get_seller(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<seller::Model> {
    Ok(ok(state.services.sellers.get_public(id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/sellers/{id}/products",
    params(("id" = Uuid, Path, description = "Seller id"), ListQuery),
    responses(
        (status = 200, description = "Active products of the seller", body = crate::ApiResponse<PaginatedResponse<Purchasable<product::Model>>>)
    ),
    tag = "Sellers"
)]
pub async fn list_seller_products(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Path(id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<Purchasable<product::Model>>> {
    let viewer = Viewer::from(user.as_ref());
    let page = state
        .services
        .products
        .list_for_seller(id, &viewer, query.pagination())
        .await?;
    Ok(ok(page))
}
