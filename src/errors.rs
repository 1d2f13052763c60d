use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Unauthorized",
    "code": "AUTH_REQUIRED_FOR_KAPPA_BRANDED",
    "message": "Sign in with a verified member account to purchase Kappa-branded items",
    "request_id": "req-abc123xyz",
    "timestamp": "2024-12-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    #[schema(example = "Not Found")]
    pub error: String,
    /// Stable machine-readable code clients can branch on
    #[schema(example = "NOT_FOUND")]
    pub code: String,
    /// Human-readable error description
    pub message: String,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::error::DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Session expired, please sign in again")]
    TokenExpired,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Administrator access required")]
    AdminRequired,

    #[error("Membership required: {0}")]
    MembershipRequired(String),

    #[error("Sign in with a verified member account to purchase Kappa-branded items")]
    KappaBrandedAuthRequired,

    #[error("Kappa-branded items can only be purchased by verified members")]
    KappaBrandedMembershipRequired,

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Sold out: {0}")]
    SoldOut(String),

    #[error("Out of stock: {0}")]
    OutOfStock(String),

    #[error("Payment provider error: {0}")]
    PaymentProviderError(String),

    #[error("Shipping provider error: {0}")]
    ShippingProviderError(String),

    #[error("Invalid webhook signature")]
    InvalidWebhookSignature,

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) | Self::BadRequest(_) | Self::InvalidWebhookSignature => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized(_)
            | Self::InvalidToken(_)
            | Self::TokenExpired
            | Self::KappaBrandedAuthRequired => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_)
            | Self::AdminRequired
            | Self::MembershipRequired(_)
            | Self::KappaBrandedMembershipRequired => StatusCode::FORBIDDEN,
            Self::InvalidStatus(_) | Self::Conflict(_) | Self::SoldOut(_) | Self::OutOfStock(_) => {
                StatusCode::CONFLICT
            }
            Self::PaymentProviderError(_) | Self::ShippingProviderError(_) => {
                StatusCode::BAD_GATEWAY
            }
            Self::DatabaseError(_)
            | Self::SerializationError(_)
            | Self::InternalError(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable code clients use to decide how to react (redirect to sign-in, show upsell, ...)
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Unauthorized(_) => "AUTH_REQUIRED",
            Self::InvalidToken(_) => "AUTH_INVALID_TOKEN",
            Self::TokenExpired => "AUTH_TOKEN_EXPIRED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::AdminRequired => "ADMIN_REQUIRED",
            Self::MembershipRequired(_) => "MEMBERSHIP_REQUIRED",
            Self::KappaBrandedAuthRequired => "AUTH_REQUIRED_FOR_KAPPA_BRANDED",
            Self::KappaBrandedMembershipRequired => "MEMBERSHIP_REQUIRED_FOR_KAPPA_BRANDED",
            Self::InvalidStatus(_) => "INVALID_STATE",
            Self::Conflict(_) => "CONFLICT",
            Self::SoldOut(_) => "SOLD_OUT",
            Self::OutOfStock(_) => "OUT_OF_STOCK",
            Self::PaymentProviderError(_) => "PAYMENT_PROVIDER_ERROR",
            Self::ShippingProviderError(_) => "SHIPPING_PROVIDER_ERROR",
            Self::InvalidWebhookSignature => "INVALID_WEBHOOK_SIGNATURE",
            Self::DatabaseError(_)
            | Self::SerializationError(_)
            | Self::InternalError(_)
            | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::SerializationError(_) | Self::InternalError(_) | Self::Other(_) => {
                "Internal server error".to_string()
            }
            Self::PaymentProviderError(_) => "Payment provider is unavailable".to_string(),
            Self::ShippingProviderError(_) => "Shipping provider is unavailable".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.error_code(), "request failed");
        }

        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            code: self.error_code().to_string(),
            message: self.response_message(),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use rstest::rstest;

    #[rstest]
    #[case(ServiceError::KappaBrandedAuthRequired, StatusCode::UNAUTHORIZED, "AUTH_REQUIRED_FOR_KAPPA_BRANDED")]
    #[case(ServiceError::KappaBrandedMembershipRequired, StatusCode::FORBIDDEN, "MEMBERSHIP_REQUIRED_FOR_KAPPA_BRANDED")]
    #[case(ServiceError::TokenExpired, StatusCode::UNAUTHORIZED, "AUTH_TOKEN_EXPIRED")]
    #[case(ServiceError::AdminRequired, StatusCode::FORBIDDEN, "ADMIN_REQUIRED")]
    #[case(ServiceError::SoldOut("x".into()), StatusCode::CONFLICT, "SOLD_OUT")]
    #[case(ServiceError::InvalidWebhookSignature, StatusCode::BAD_REQUEST, "INVALID_WEBHOOK_SIGNATURE")]
    #[case(ServiceError::PaymentProviderError("boom".into()), StatusCode::BAD_GATEWAY, "PAYMENT_PROVIDER_ERROR")]
    fn maps_status_and_code(
        #[case] error: ServiceError,
        #[case] status: StatusCode,
        #[case] code: &str,
    ) {
        assert_eq!(error.status_code(), status);
        assert_eq!(error.error_code(), code);
    }

    #[test]
    fn internal_details_are_hidden() {
        let err = ServiceError::InternalError("connection string postgres://secret".into());
        assert_eq!(err.response_message(), "Internal server error");

        let err = ServiceError::DatabaseError(sea_orm::DbErr::Custom("boom".into()));
        assert_eq!(err.response_message(), "Database error");
    }

    #[tokio::test]
    async fn response_body_carries_code() {
        let response = ServiceError::KappaBrandedAuthRequired.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "AUTH_REQUIRED_FOR_KAPPA_BRANDED");
        assert_eq!(body["error"], "Unauthorized");
        assert!(body["timestamp"].is_string());
    }
}
