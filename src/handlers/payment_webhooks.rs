use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
    Router,
};

use crate::{handlers::common::ok, services::checkout::WebhookOutcome, ApiResult, AppState};

pub const STRIPE_SIGNATURE_HEADER: &str = "Stripe-Signature";

pub fn router() -> Router<AppState> {
    Router::new().route("/payments/webhook", post(stripe_webhook))
}

/// Stripe event delivery; the raw body is needed to check the signature
#[utoipa::path(
    post,
    path = "/api/v1/payments/webhook",
    request_body(content = String, description = "Raw Stripe event JSON", content_type = "application/json"),
    params(("Stripe-Signature" = String, Header, description = "Stripe signature header")),
    responses(
        (status = 200, description = "Event accepted", body = crate::ApiResponse<WebhookOutcome>),
        (status = 400, description = "Malformed event or bad signature", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<WebhookOutcome> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    let outcome = state
        .services
        .checkout
        .handle_webhook(&body, signature)
        .await?;
    Ok(ok(outcome))
}
