//! Moderation endpoints, mounted under `/api/v1/admin`.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::{
    auth::AuthRouterExt,
    entities::{chapter, order, promoter, seller, steward, user},
    handlers::common::{created, ok, ApplicationFilter, CreatedResult},
    services::{
        admin::{ApprovalsOverview, ReviewApplicationRequest},
        chapters::{CreateChapterRequest, UpdateChapterRequest},
        orders::OrderFilter,
        users::UserFilter,
    },
    ApiResult, AppState, ListQuery, PaginatedResponse,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/approvals", get(approvals))
        .route("/orders", get(list_orders))
        .route("/users", get(list_users))
        .route("/users/:id/verify-membership", post(verify_membership))
        .route("/users/:id/revoke-membership", post(revoke_membership))
        .route("/chapters", post(create_chapter))
        .route("/chapters/:id", put(update_chapter))
        .route("/chapters/:id/deactivate", post(deactivate_chapter))
        .route("/sellers", get(list_sellers))
        .route("/sellers/:id/approve", post(approve_seller))
        .route("/sellers/:id/reject", post(reject_seller))
        .route("/promoters", get(list_promoters))
        .route("/promoters/:id/approve", post(approve_promoter))
        .route("/promoters/:id/reject", post(reject_promoter))
        .route("/stewards", get(list_stewards))
        .route("/stewards/:id/approve", post(approve_steward))
        .route("/stewards/:id/reject", post(reject_steward))
        .with_admin()
        .with_auth()
}

/// Pending applications across all three roles
#[utoipa::path(
    get,
    path = "/api/v1/admin/approvals",
    responses(
        (status = 200, description = "Approval queue", body = crate::ApiResponse<ApprovalsOverview>),
        (status = 403, description = "Admin role required", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn approvals(State(state): State<AppState>) -> ApiResult<ApprovalsOverview> {
    Ok(ok(state.services.admin.approvals().await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/orders",
    params(ListQuery, OrderFilter),
    responses(
        (status = 200, description = "All orders", body = crate::ApiResponse<PaginatedResponse<order::Model>>)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Query(filter): Query<OrderFilter>,
) -> ApiResult<PaginatedResponse<order::Model>> {
    let page = state
        .services
        .orders
        .list_all(filter, query.pagination())
        .await?;
    Ok(ok(page))
}

// ----- users -----

#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    params(ListQuery, UserFilter),
    responses(
        (status = 200, description = "Users", body = crate::ApiResponse<PaginatedResponse<user::Model>>)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Query(filter): Query<UserFilter>,
) -> ApiResult<PaginatedResponse<user::Model>> {
    let page = state
        .services
        .users
        .list(filter, query.pagination())
        .await?;
    Ok(ok(page))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/verify-membership",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User marked as a verified member", body = crate::ApiResponse<user::Model>),
        (status = 404, description = "Unknown user", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn verify_membership(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<user::Model> {
    Ok(ok(state.services.users.set_membership(id, true).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/revoke-membership",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Membership revoked", body = crate::ApiResponse<user::Model>),
        (status = 404, description = "Unknown user", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn revoke_membership(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<user::Model> {
    Ok(ok(state.services.users.set_membership(id, false).await?))
}

// ----- chapters -----

#[utoipa::path(
    post,
    path = "/api/v1/admin/chapters",
    request_body = CreateChapterRequest,
    responses(
        (status = 201, description = "Chapter created", body = crate::ApiResponse<chapter::Model>),
        (status = 409, description = "Chapter name taken", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn create_chapter(
    State(state): State<AppState>,
    Json(payload): Json<CreateChapterRequest>,
) -> CreatedResult<chapter::Model> {
    Ok(created(state.services.chapters.create(payload).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/chapters/{id}",
    params(("id" = Uuid, Path, description = "Chapter id")),
    request_body = UpdateChapterRequest,
    responses(
        (status = 200, description = "Chapter updated", body = crate::ApiResponse<chapter::Model>),
        (status = 404, description = "Unknown chapter", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn update_chapter(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateChapterRequest>,
) -> ApiResult<chapter::Model> {
    Ok(ok(state.services.chapters.update(id, payload).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/chapters/{id}/deactivate",
    params(("id" = Uuid, Path, description = "Chapter id")),
    responses(
        (status = 200, description = "Chapter deactivated", body = crate::ApiResponse<chapter::Model>)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn deactivate_chapter(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<chapter::Model> {
    Ok(ok(state.services.chapters.deactivate(id).await?))
}

// ----- applications -----

#[utoipa::path(
    get,
    path = "/api/v1/admin/sellers",
    params(ListQuery, ApplicationFilter),
    responses(
        (status = 200, description = "Seller applications", body = crate::ApiResponse<PaginatedResponse<seller::Model>>)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn list_sellers(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Query(filter): Query<ApplicationFilter>,
) -> ApiResult<PaginatedResponse<seller::Model>> {
    let page = state
        .services
        .sellers
        .list(filter.status, query.pagination())
        .await?;
    Ok(ok(page))
}

/// Approve a seller; `stripe_account_id` sets where their payouts go
#[utoipa::path(
    post,
    path = "/api/v1/admin/sellers/{id}/approve",
    params(("id" = Uuid, Path, description = "Seller id")),
    request_body = ReviewApplicationRequest,
    responses(
        (status = 200, description = "Seller approved", body = crate::ApiResponse<seller::Model>),
        (status = 409, description = "Application already decided", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn approve_seller(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(review): Json<ReviewApplicationRequest>,
) -> ApiResult<seller::Model> {
    Ok(ok(state.services.sellers.approve(id, review).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/sellers/{id}/reject",
    params(("id" = Uuid, Path, description = "Seller id")),
    request_body = ReviewApplicationRequest,
    responses(
        (status = 200, description = "Seller rejected", body = crate::ApiResponse<seller::Model>),
        (status = 409, description = "Application already decided", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn reject_seller(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(review): Json<ReviewApplicationRequest>,
) -> ApiResult<seller::Model> {
    Ok(ok(state.services.sellers.reject(id, review).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/promoters",
    params(ListQuery, ApplicationFilter),
    responses(
        (status = 200, description = "Promoter applications", body = crate::ApiResponse<PaginatedResponse<promoter::Model>>)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn list_promoters(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Query(filter): Query<ApplicationFilter>,
) -> ApiResult<PaginatedResponse<promoter::Model>> {
    let page = state
        .services
        .promoters
        .list(filter.status, query.pagination())
        .await?;
    Ok(ok(page))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/promoters/{id}/approve",
    params(("id" = Uuid, Path, description = "Promoter id")),
    request_body = ReviewApplicationRequest,
    responses(
        (status = 200, description = "Promoter approved", body = crate::ApiResponse<promoter::Model>),
        (status = 409, description = "Application already decided", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn approve_promoter(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(review): Json<ReviewApplicationRequest>,
) -> ApiResult<promoter::Model> {
    Ok(ok(state.services.promoters.approve(id, review).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/promoters/{id}/reject",
    params(("id" = Uuid, Path, description = "Promoter id")),
    request_body = ReviewApplicationRequest,
    responses(
        (status = 200, description = "Promoter rejected", body = crate::ApiResponse<promoter::Model>)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn reject_promoter(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(review): Json<ReviewApplicationRequest>,
) -> ApiResult<promoter::Model> {
    Ok(ok(state.services.promoters.reject(id, review).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/stewards",
    params(ListQuery, ApplicationFilter),
    responses(
        (status = 200, description = "Steward applications", body = crate::ApiResponse<PaginatedResponse<steward::Model>>)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn list_stewards(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Query(filter): Query<ApplicationFilter>,
) -> ApiResult<PaginatedResponse<steward::Model>> {
    let page = state
        .services
        .stewards
        .list(filter.status, query.pagination())
        .await?;
    Ok(ok(page))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/stewards/{id}/approve",
    params(("id" = Uuid, Path, description = "Steward id")),
    request_body = ReviewApplicationRequest,
    responses(
        (status = 200, description = "Steward approved", body = crate::ApiResponse<steward::Model>),
        (status = 409, description = "Application already decided", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn approve_steward(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(review): Json<ReviewApplicationRequest>,
) -> ApiResult<steward::Model> {
    Ok(ok(state.services.stewards.approve(id, review).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/stewards/{id}/reject",
    params(("id" = Uuid, Path, description = "Steward id")),
    request_body = ReviewApplicationRequest,
    responses(
        (status = 200, description = "Steward rejected", body = crate::ApiResponse<steward::Model>)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn reject_steward(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(review): Json<ReviewApplicationRequest>,
) -> ApiResult<steward::Model> {
    Ok(ok(state.services.stewards.reject(id, review).await?))
}
