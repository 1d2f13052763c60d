use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::{
    auth::{AuthRouterExt, AuthUser, MaybeAuthUser},
    entities::product,
    handlers::common::{created, ok, CreatedResult},
    services::{
        access::{Purchasable, Viewer},
        products::{CreateProductRequest, ProductFilter, UpdateProductRequest},
    },
    ApiResult, AppState, ListQuery, PaginatedResponse,
};

/// Creates the router for product endpoints
pub fn router() -> Router<AppState> {
    let protected = Router::new()
        .route("/products", post(create_product))
        .route("/products/:id", put(update_product))
        .route("/products/:id/deactivate", post(deactivate_product))
        .with_auth();

    let catalog = Router::new()
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
        .with_optional_auth();

    catalog.merge(protected)
}

/// Active catalog; each item says whether the caller may buy it
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(ListQuery, ProductFilter),
    responses(
        (status = 200, description = "Catalog page", body = crate::ApiResponse<PaginatedResponse<Purchasable<product::Model>>>)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Query(query): Query<ListQuery>,
    Query(filter): Query<ProductFilter>,
) -> ApiResult<PaginatedResponse<Purchasable<product::Model>>> {
    let viewer = Viewer::from(user.as_ref());
    let page = state
        .services
        .products
        .list_catalog(filter, &viewer, query.pagination())
        .await?;
    Ok(ok(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product", body = crate::ApiResponse<Purchasable<product::Model>>),
        (status = 404, description = "Unknown or inactive product", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Purchasable<product::Model>> {
    let viewer = Viewer::from(user.as_ref());
    Ok(ok(state.services.products.get_public(id, &viewer).await?))
}

/// Create a new product; approved sellers only
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = crate::ApiResponse<product::Model>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not an approved seller", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> CreatedResult<product::Model> {
    let product = state.services.products.create(user.user_id, payload).await?;
    Ok(created(product))
}

#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = crate::ApiResponse<product::Model>),
        (status = 403, description = "Not the owning seller", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown product", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> ApiResult<product::Model> {
    let product = state
        .services
        .products
        .update(user.user_id, id, payload)
        .await?;
    Ok(ok(product))
}

#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/deactivate",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product taken off the catalog", body = crate::ApiResponse<product::Model>),
        (status = 403, description = "Not the owning seller", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn deactivate_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<product::Model> {
    let product = state.services.products.deactivate(user.user_id, id).await?;
    Ok(ok(product))
}
