use axum::{extract::State, routing::post, Json, Router};

use crate::{
    handlers::common::ok,
    services::shipping::{ShipmentRequest, ShippingRate},
    ApiResult, AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/shipping/quote", post(quote_shipping))
}

/// Carrier rates for a parcel; falls back to the flat rate when the rate service is down
#[utoipa::path(
    post,
    path = "/api/v1/shipping/quote",
    request_body = ShipmentRequest,
    responses(
        (status = 200, description = "Available rates", body = crate::ApiResponse<Vec<ShippingRate>>),
        (status = 400, description = "Invalid parcel", body = crate::errors::ErrorResponse)
    ),
    tag = "Shipping"
)]
pub async fn quote_shipping(
    State(state): State<AppState>,
    Json(payload): Json<ShipmentRequest>,
) -> ApiResult<Vec<ShippingRate>> {
    let rates = state.services.shipping.quote(&payload).await?;
    Ok(ok(rates))
}
