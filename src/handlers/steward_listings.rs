use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::{
    auth::{AuthRouterExt, AuthUser, MaybeAuthUser},
    entities::steward_listing,
    handlers::common::{created, ok, CreatedResult},
    services::{
        access::{Purchasable, Viewer},
        steward_listings::{CreateListingRequest, ListingFilter, UpdateListingRequest},
    },
    ApiResult, AppState, ListQuery, PaginatedResponse,
};

pub fn router() -> Router<AppState> {
    let protected = Router::new()
        .route("/steward-listings", post(create_listing))
        .route(
            "/steward-listings/:id",
            axum::routing::put(update_listing).delete(remove_listing),
        )
        .with_auth();

    let public = Router::new()
        .route("/steward-listings", get(list_listings))
        .route("/steward-listings/:id", get(get_listing))
        .with_optional_auth();

    public.merge(protected)
}

#[utoipa::path(
    get,
    path = "/api/v1/steward-listings",
    params(ListQuery, ListingFilter),
    responses(
        (status = 200, description = "Available legacy items", body = crate::ApiResponse<PaginatedResponse<Purchasable<steward_listing::Model>>>)
    ),
    tag = "Steward Listings"
)]
pub async fn list_listings(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Query(query): Query<ListQuery>,
    Query(filter): Query<ListingFilter>,
) -> ApiResult<PaginatedResponse<Purchasable<steward_listing::Model>>> {
    let viewer = Viewer::from(user.as_ref());
    let page = state
        .services
        .listings
        .list_public(filter, &viewer, query.pagination())
        .await?;
    Ok(ok(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/steward-listings/{id}",
    params(("id" = Uuid, Path, description = "Listing id")),
    responses(
        (status = 200, description = "Listing", body = crate::ApiResponse<Purchasable<steward_listing::Model>>),
        (status = 404, description = "Unknown or removed listing", body = crate::errors::ErrorResponse)
    ),
    tag = "Steward Listings"
)]
pub async fn get_listing(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Purchasable<steward_listing::Model>> {
    let viewer = Viewer::from(user.as_ref());
    Ok(ok(state.services.listings.get_public(id, &viewer).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/steward-listings",
    request_body = CreateListingRequest,
    responses(
        (status = 201, description = "Listing created", body = crate::ApiResponse<steward_listing::Model>),
        (status = 403, description = "Not an approved steward", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Steward Listings"
)]
pub async fn create_listing(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateListingRequest>,
) -> CreatedResult<steward_listing::Model> {
    let listing = state.services.listings.create(user.user_id, payload).await?;
    Ok(created(listing))
}

#[utoipa::path(
    put,
    path = "/api/v1/steward-listings/{id}",
    params(("id" = Uuid, Path, description = "Listing id")),
    request_body = UpdateListingRequest,
    responses(
        (status = 200, description = "Listing updated", body = crate::ApiResponse<steward_listing::Model>),
        (status = 403, description = "Listing belongs to another steward", body = crate::errors::ErrorResponse),
        (status = 409, description = "Listing is no longer active", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Steward Listings"
)]
pub async fn update_listing(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateListingRequest>,
) -> ApiResult<steward_listing::Model> {
    let listing = state
        .services
        .listings
        .update(user.user_id, id, payload)
        .await?;
    Ok(ok(listing))
}

/// Takes an ACTIVE listing down; reserved and claimed items cannot be removed
#[utoipa::path(
    delete,
    path = "/api/v1/steward-listings/{id}",
    params(("id" = Uuid, Path, description = "Listing id")),
    responses(
        (status = 200, description = "Listing removed", body = crate::ApiResponse<steward_listing::Model>),
        (status = 409, description = "Listing is no longer active", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Steward Listings"
)]
pub async fn remove_listing(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<steward_listing::Model> {
    Ok(ok(state.services.listings.remove(user.user_id, id).await?))
}
