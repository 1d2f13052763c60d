//! Kappa Marketplace API
//!
//! Backend for a fraternity marketplace: members buy merchandise from
//! approved sellers, promoters sell tickets to chapter-sponsored events and
//! stewards give away legacy items for shipping, a platform fee and a
//! chapter donation. Kappa-branded items are reserved for verified members.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod health;
pub mod metrics;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{extract::Extension, response::Json, routing::get, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use utoipa::{IntoParams, ToSchema};

use crate::services::{
    payments::{gateway_from_config, PaymentGateway},
    shipping::ShippingService,
    Pagination,
};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: Arc<events::EventSender>,
    pub auth: Arc<auth::AuthService>,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
        gateway: Arc<dyn PaymentGateway>,
        shipping: ShippingService,
    ) -> Self {
        let event_sender = Arc::new(event_sender);
        let users = services::users::UserService::new(db.clone(), event_sender.clone());
        let auth = Arc::new(auth::AuthService::new(
            auth::AuthConfig::from_app_config(&config),
            users,
        ));
        let services =
            handlers::AppServices::new(db.clone(), event_sender.clone(), &config, gateway, shipping);

        Self {
            db,
            config,
            event_sender,
            auth,
            services,
        }
    }

    /// Wires Stripe and the shipping provider from configuration
    pub fn from_config(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Result<Self, errors::ServiceError> {
        let gateway = gateway_from_config(&config)?;
        let shipping = ShippingService::from_config(&config)?;
        Ok(Self::new(db, config, event_sender, gateway, shipping))
    }
}

// Common query parameters for list endpoints
#[derive(Debug, Clone, Copy, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

impl ListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.limit)
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::success(data)
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResponse<U> {
        PaginatedResponse {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
            total_pages: self.total_pages,
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .merge(handlers::users::router())
        .merge(handlers::chapters::router())
        .merge(handlers::sellers::router())
        .merge(handlers::promoters::router())
        .merge(handlers::stewards::router())
        .merge(handlers::products::router())
        .merge(handlers::events::router())
        .merge(handlers::steward_listings::router())
        .merge(handlers::shipping::router())
        .merge(handlers::checkout::router())
        .merge(handlers::orders::router())
        .merge(handlers::payment_webhooks::router())
        .nest("/admin", handlers::admin::router())
}

/// Full application: `/api/v1`, health, metrics and Swagger UI behind the
/// request-id, tracing and compression layers. CORS is left to the caller.
pub fn build_router(state: AppState) -> Router {
    let health_state = Arc::new(health::HealthState::new(
        state.db.clone(),
        state.config.stripe_secret_key.is_some(),
    ));
    let auth = state.auth.clone();

    Router::new()
        .route("/metrics", get(metrics::metrics_handler))
        .nest("/api/v1", api_v1_routes())
        .with_state(state)
        .nest("/health", health::health_routes(health_state))
        .merge(openapi::swagger_ui())
        .layer(crate::tracing::configure_http_tracing())
        .layer(CompressionLayer::new())
        // Auth middlewares look the service up in request extensions
        .layer(Extension(auth))
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
}
