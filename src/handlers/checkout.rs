use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::{
    auth::{AuthRouterExt, MaybeAuthUser},
    handlers::common::{created, ok, CreatedResult},
    services::{
        access::Viewer,
        checkout::{
            CheckoutQuote, CheckoutResponse, ClaimCheckoutRequest, ProductCheckoutRequest,
            QuoteQuery, TicketCheckoutRequest,
        },
    },
    ApiResult, AppState,
};

pub fn router() -> Router<AppState> {
    let checkout = Router::new()
        .route("/checkout/products", post(checkout_product))
        .route("/checkout/events/:id/tickets", post(checkout_tickets))
        .route("/checkout/steward-listings/:id/claim", post(checkout_claim))
        .with_optional_auth();

    let quotes = Router::new()
        .route("/checkout/quote/products/:id", get(quote_product))
        .route("/checkout/quote/events/:id", get(quote_tickets))
        .route("/checkout/quote/steward-listings/:id", get(quote_claim));

    checkout.merge(quotes)
}

/// Buy merch; branded products require a verified member
#[utoipa::path(
    post,
    path = "/api/v1/checkout/products",
    request_body = ProductCheckoutRequest,
    responses(
        (status = 201, description = "Pending order with a checkout link", body = crate::ApiResponse<CheckoutResponse>),
        (status = 400, description = "Invalid quantity or address", body = crate::errors::ErrorResponse),
        (status = 401, description = "Sign in required; branded items answer AUTH_REQUIRED_FOR_KAPPA_BRANDED", body = crate::errors::ErrorResponse),
        (status = 403, description = "Branded item needs a verified member", body = crate::errors::ErrorResponse),
        (status = 409, description = "Not enough stock", body = crate::errors::ErrorResponse),
        (status = 502, description = "Payment provider failed", body = crate::errors::ErrorResponse)
    ),
    security((), ("Bearer" = [])),
    tag = "Checkout"
)]
pub async fn checkout_product(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Json(payload): Json<ProductCheckoutRequest>,
) -> CreatedResult<CheckoutResponse> {
    let viewer = Viewer::from(user.as_ref());
    let email = user.map(|u| u.email);
    let response = state
        .services
        .checkout
        .checkout_product(&viewer, email, payload)
        .await?;
    Ok(created(response))
}

/// Buy tickets; free events are confirmed immediately
#[utoipa::path(
    post,
    path = "/api/v1/checkout/events/{id}/tickets",
    params(("id" = Uuid, Path, description = "Event id")),
    request_body = TicketCheckoutRequest,
    responses(
        (status = 201, description = "Ticket order", body = crate::ApiResponse<CheckoutResponse>),
        (status = 401, description = "Sign in required", body = crate::errors::ErrorResponse),
        (status = 403, description = "Branded event needs a verified member", body = crate::errors::ErrorResponse),
        (status = 409, description = "Sold out or sales closed", body = crate::errors::ErrorResponse)
    ),
    security((), ("Bearer" = [])),
    tag = "Checkout"
)]
pub async fn checkout_tickets(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<TicketCheckoutRequest>,
) -> CreatedResult<CheckoutResponse> {
    let viewer = Viewer::from(user.as_ref());
    let email = user.map(|u| u.email);
    let response = state
        .services
        .checkout
        .checkout_tickets(&viewer, email, id, payload)
        .await?;
    Ok(created(response))
}

/// Claim a legacy item; the listing is held until payment settles or the session expires
#[utoipa::path(
    post,
    path = "/api/v1/checkout/steward-listings/{id}/claim",
    params(("id" = Uuid, Path, description = "Listing id")),
    request_body = ClaimCheckoutRequest,
    responses(
        (status = 201, description = "Claim order", body = crate::ApiResponse<CheckoutResponse>),
        (status = 401, description = "Sign in required", body = crate::errors::ErrorResponse),
        (status = 403, description = "Branded item needs a verified member", body = crate::errors::ErrorResponse),
        (status = 409, description = "Listing already reserved or claimed", body = crate::errors::ErrorResponse)
    ),
    security((), ("Bearer" = [])),
    tag = "Checkout"
)]
pub async fn checkout_claim(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ClaimCheckoutRequest>,
) -> CreatedResult<CheckoutResponse> {
    let viewer = Viewer::from(user.as_ref());
    let email = user.map(|u| u.email);
    let response = state
        .services
        .checkout
        .checkout_claim(&viewer, email, id, payload)
        .await?;
    Ok(created(response))
}

#[utoipa::path(
    get,
    path = "/api/v1/checkout/quote/products/{id}",
    params(("id" = Uuid, Path, description = "Product id"), QuoteQuery),
    responses(
        (status = 200, description = "Fee breakdown", body = crate::ApiResponse<CheckoutQuote>),
        (status = 400, description = "Missing postal code", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown product", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn quote_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<QuoteQuery>,
) -> ApiResult<CheckoutQuote> {
    Ok(ok(state.services.checkout.quote_product(id, query).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/checkout/quote/events/{id}",
    params(("id" = Uuid, Path, description = "Event id"), QuoteQuery),
    responses(
        (status = 200, description = "Fee breakdown", body = crate::ApiResponse<CheckoutQuote>),
        (status = 404, description = "Unknown event", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn quote_tickets(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<QuoteQuery>,
) -> ApiResult<CheckoutQuote> {
    Ok(ok(state.services.checkout.quote_tickets(id, query).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/checkout/quote/steward-listings/{id}",
    params(("id" = Uuid, Path, description = "Listing id"), QuoteQuery),
    responses(
        (status = 200, description = "Fee breakdown", body = crate::ApiResponse<CheckoutQuote>),
        (status = 404, description = "Unknown listing", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn quote_claim(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<QuoteQuery>,
) -> ApiResult<CheckoutQuote> {
    Ok(ok(state.services.checkout.quote_claim(id, query).await?))
}
