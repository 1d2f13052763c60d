//! Shipping-rate lookups.
//!
//! Rates come from an external HTTP rate service when one is configured; any
//! provider failure falls back to the configured flat rate so checkout keeps
//! working.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::{config::AppConfig, errors::ServiceError, metrics::SHIPPING_FALLBACKS};

/// Used when an item has no weight on record
pub const DEFAULT_WEIGHT_OZ: i32 = 16;

/// Heaviest parcel the rate service quotes
pub const MAX_PARCEL_WEIGHT_OZ: i32 = 2400;

const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

fn default_country() -> String {
    "US".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct ShippingAddress {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 1, max = 200))]
    pub line1: String,
    #[validate(length(max = 200))]
    pub line2: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 2, max = 40))]
    pub state: String,
    #[validate(length(min = 3, max = 10))]
    pub postal_code: String,
    #[validate(length(equal = 2))]
    #[serde(default = "default_country")]
    pub country: String,
}

impl ShippingAddress {
    pub fn to_json(&self) -> Result<serde_json::Value, ServiceError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// What a rate lookup needs to know about a parcel
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ShipmentRequest {
    #[validate(length(min = 3, max = 10))]
    pub origin_postal_code: String,
    #[validate(length(min = 3, max = 10))]
    pub destination_postal_code: String,
    #[validate(length(equal = 2))]
    #[serde(default = "default_country")]
    pub destination_country: String,
    #[validate(range(min = 1, max = 2400))]
    pub weight_oz: i32,
}

impl ShipmentRequest {
    pub fn new(origin_postal_code: &str, destination: &ShippingAddress, weight_oz: i32) -> Self {
        Self {
            origin_postal_code: origin_postal_code.trim().to_string(),
            destination_postal_code: destination.postal_code.trim().to_string(),
            destination_country: destination.country.clone(),
            weight_oz,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ShippingRate {
    pub carrier: String,
    pub service: String,
    pub amount_cents: i64,
    #[serde(default)]
    pub estimated_days: Option<i32>,
}

#[async_trait]
pub trait ShippingRateProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn quote(&self, request: &ShipmentRequest) -> Result<Vec<ShippingRate>, ServiceError>;
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: Vec<ShippingRate>,
}

/// POSTs the shipment as JSON to a rate service and reads back `{ "rates": [...] }`
#[derive(Clone)]
pub struct HttpShippingRateProvider {
    http_client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpShippingRateProvider {
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Result<Self, ServiceError> {
        let http_client = reqwest::Client::builder()
            .timeout(PROVIDER_TIMEOUT)
            .build()
            .map_err(|e| ServiceError::InternalError(format!("HTTP client: {}", e)))?;
        Ok(Self {
            http_client,
            url: url.into(),
            api_key,
        })
    }
}

#[async_trait]
impl ShippingRateProvider for HttpShippingRateProvider {
    fn name(&self) -> &'static str {
        "http"
    }

    #[instrument(skip(self, request), fields(destination = %request.destination_postal_code))]
    async fn quote(&self, request: &ShipmentRequest) -> Result<Vec<ShippingRate>, ServiceError> {
        let mut builder = self
            .http_client
            .post(&self.url)
            .header("Accept", "application/json")
            .json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ServiceError::ShippingProviderError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::ShippingProviderError(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let parsed: RatesResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::ShippingProviderError(e.to_string()))?;

        Ok(parsed
            .rates
            .into_iter()
            .filter(|rate| rate.amount_cents >= 0)
            .collect())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FlatRateShippingProvider {
    amount_cents: i64,
}

impl FlatRateShippingProvider {
    pub fn new(amount_cents: i64) -> Self {
        Self { amount_cents }
    }

    fn rate(&self) -> ShippingRate {
        ShippingRate {
            carrier: "flat".to_string(),
            service: "standard".to_string(),
            amount_cents: self.amount_cents,
            estimated_days: None,
        }
    }
}

#[async_trait]
impl ShippingRateProvider for FlatRateShippingProvider {
    fn name(&self) -> &'static str {
        "flat"
    }

    async fn quote(&self, _request: &ShipmentRequest) -> Result<Vec<ShippingRate>, ServiceError> {
        Ok(vec![self.rate()])
    }
}

#[derive(Clone)]
pub struct ShippingService {
    provider: Arc<dyn ShippingRateProvider>,
    fallback: FlatRateShippingProvider,
}

impl ShippingService {
    pub fn new(provider: Arc<dyn ShippingRateProvider>, flat_rate_cents: i64) -> Self {
        Self {
            provider,
            fallback: FlatRateShippingProvider::new(flat_rate_cents),
        }
    }

    /// HTTP rates when `shipping_rates_url` is set, flat rate otherwise
    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        let provider: Arc<dyn ShippingRateProvider> = match &config.shipping_rates_url {
            Some(url) => Arc::new(HttpShippingRateProvider::new(
                url.clone(),
                config.shipping_api_key.clone(),
            )?),
            None => Arc::new(FlatRateShippingProvider::new(config.flat_shipping_cents)),
        };
        Ok(Self::new(provider, config.flat_shipping_cents))
    }

    /// All available rates; provider errors and empty answers fall back to the flat rate.
    #[instrument(skip(self, request), fields(provider = self.provider.name()))]
    pub async fn quote(&self, request: &ShipmentRequest) -> Result<Vec<ShippingRate>, ServiceError> {
        request.validate()?;

        match self.provider.quote(request).await {
            Ok(rates) if !rates.is_empty() => {
                debug!(count = rates.len(), "shipping rates received");
                Ok(rates)
            }
            Ok(_) => {
                warn!("shipping provider returned no rates, using flat rate");
                SHIPPING_FALLBACKS.with_label_values(&["empty"]).inc();
                Ok(vec![self.fallback.rate()])
            }
            Err(e) => {
                warn!(error = %e, "shipping provider failed, using flat rate");
                SHIPPING_FALLBACKS.with_label_values(&["error"]).inc();
                Ok(vec![self.fallback.rate()])
            }
        }
    }

    /// Cheapest available rate; parcels over [`MAX_PARCEL_WEIGHT_OZ`] ship at the flat rate.
    pub async fn cheapest_rate(&self, request: &ShipmentRequest) -> Result<ShippingRate, ServiceError> {
        if request.weight_oz > MAX_PARCEL_WEIGHT_OZ {
            warn!(weight_oz = request.weight_oz, "parcel too heavy to quote, using flat rate");
            SHIPPING_FALLBACKS.with_label_values(&["oversize"]).inc();
            return Ok(self.fallback.rate());
        }
        let rates = self.quote(request).await?;
        Ok(rates
            .into_iter()
            .min_by_key(|rate| rate.amount_cents)
            .unwrap_or_else(|| self.fallback.rate()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn address() -> ShippingAddress {
        ShippingAddress {
            name: "Jordan Brother".to_string(),
            line1: "1 Chapter House Way".to_string(),
            line2: None,
            city: "Durham".to_string(),
            state: "NC".to_string(),
            postal_code: "27701".to_string(),
            country: "US".to_string(),
        }
    }

    fn shipment(weight_oz: i32) -> ShipmentRequest {
        ShipmentRequest::new("40202", &address(), weight_oz)
    }

    struct FailingProvider;

    #[async_trait]
    impl ShippingRateProvider for FailingProvider {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn quote(&self, _request: &ShipmentRequest) -> Result<Vec<ShippingRate>, ServiceError> {
            Err(ServiceError::ShippingProviderError("down".to_string()))
        }
    }

    struct FixedProvider(Vec<ShippingRate>);

    #[async_trait]
    impl ShippingRateProvider for FixedProvider {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn quote(&self, _request: &ShipmentRequest) -> Result<Vec<ShippingRate>, ServiceError> {
            Ok(self.0.clone())
        }
    }

    fn rate(service: &str, amount_cents: i64) -> ShippingRate {
        ShippingRate {
            carrier: "usps".to_string(),
            service: service.to_string(),
            amount_cents,
            estimated_days: Some(3),
        }
    }

    #[tokio::test]
    async fn cheapest_rate_wins() {
        let service = ShippingService::new(
            Arc::new(FixedProvider(vec![
                rate("priority", 1_250),
                rate("ground", 780),
                rate("express", 3_100),
            ])),
            899,
        );
        let cheapest = service.cheapest_rate(&shipment(24)).await.unwrap();
        assert_eq!(cheapest.service, "ground");
        assert_eq!(cheapest.amount_cents, 780);
    }

    #[tokio::test]
    async fn provider_failure_falls_back_to_flat_rate() {
        let service = ShippingService::new(Arc::new(FailingProvider), 899);
        let rates = service.quote(&shipment(16)).await.unwrap();
        assert_eq!(rates.len(), 1);
        assert_eq!(rates[0].carrier, "flat");
        assert_eq!(rates[0].amount_cents, 899);
    }

    #[tokio::test]
    async fn empty_answer_falls_back_to_flat_rate() {
        let service = ShippingService::new(Arc::new(FixedProvider(vec![])), 650);
        let cheapest = service.cheapest_rate(&shipment(16)).await.unwrap();
        assert_eq!(cheapest.amount_cents, 650);
    }

    #[tokio::test]
    async fn oversize_parcel_ships_at_flat_rate() {
        let service = ShippingService::new(
            Arc::new(FixedProvider(vec![rate("freight", 9_900)])),
            899,
        );
        let rate = service
            .cheapest_rate(&shipment(MAX_PARCEL_WEIGHT_OZ + 600))
            .await
            .unwrap();
        assert_eq!(rate.carrier, "flat");
        assert_eq!(rate.amount_cents, 899);

        let rate = service
            .cheapest_rate(&shipment(MAX_PARCEL_WEIGHT_OZ))
            .await
            .unwrap();
        assert_eq!(rate.amount_cents, 9_900);
    }

    #[tokio::test]
    async fn rejects_bad_weight_and_address() {
        let service = ShippingService::new(Arc::new(FlatRateShippingProvider::new(899)), 899);
        assert_matches!(
            service.quote(&shipment(0)).await,
            Err(ServiceError::ValidationError(_))
        );

        let mut request = shipment(16);
        request.destination_postal_code = String::new();
        assert_matches!(
            service.quote(&request).await,
            Err(ServiceError::ValidationError(_))
        );
    }
}
