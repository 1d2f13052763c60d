//! Stripe Checkout / Connect integration.
//!
//! Orders are paid through hosted Checkout sessions. When the payee has a
//! Connect account the session routes `total - application_fee` to them.
//! Payment state comes back through signed webhooks.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{config::AppConfig, errors::ServiceError};

type HmacSha256 = Hmac<Sha256>;

const STRIPE_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLineItem {
    pub name: String,
    pub unit_amount_cents: i64,
    pub quantity: u32,
}

#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    pub order_id: Uuid,
    pub customer_email: Option<String>,
    pub currency: String,
    pub line_items: Vec<CheckoutLineItem>,
    pub application_fee_cents: i64,
    /// Connect account that receives the payee share
    pub destination_account: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutSessionHandle {
    #[serde(rename = "id")]
    pub session_id: String,
    pub url: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSessionHandle, ServiceError>;

    async fn expire_checkout_session(&self, session_id: &str) -> Result<(), ServiceError>;
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Form-encoded client for the Stripe REST API
#[derive(Clone)]
pub struct StripeGateway {
    http_client: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl StripeGateway {
    pub fn new(api_base: impl Into<String>, secret_key: impl Into<String>) -> Result<Self, ServiceError> {
        let http_client = reqwest::Client::builder()
            .timeout(STRIPE_TIMEOUT)
            .build()
            .map_err(|e| ServiceError::InternalError(format!("HTTP client: {}", e)))?;
        Ok(Self {
            http_client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        })
    }

    /// Flattens a session request into Stripe's bracketed form keys.
    pub fn session_params(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
        let order_id = request.order_id.to_string();
        let mut params = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
            ("client_reference_id".to_string(), order_id.clone()),
            ("metadata[order_id]".to_string(), order_id.clone()),
            (
                "payment_intent_data[metadata][order_id]".to_string(),
                order_id,
            ),
        ];

        if let Some(email) = &request.customer_email {
            params.push(("customer_email".to_string(), email.clone()));
        }

        for (i, item) in request.line_items.iter().enumerate() {
            let prefix = format!("line_items[{}]", i);
            params.push((
                format!("{}[price_data][currency]", prefix),
                request.currency.clone(),
            ));
            params.push((
                format!("{}[price_data][product_data][name]", prefix),
                item.name.clone(),
            ));
            params.push((
                format!("{}[price_data][unit_amount]", prefix),
                item.unit_amount_cents.to_string(),
            ));
            params.push((format!("{}[quantity]", prefix), item.quantity.to_string()));
        }

        if let Some(destination) = &request.destination_account {
            params.push((
                "payment_intent_data[application_fee_amount]".to_string(),
                request.application_fee_cents.to_string(),
            ));
            params.push((
                "payment_intent_data[transfer_data][destination]".to_string(),
                destination.clone(),
            ));
        }

        params
    }

    async fn error_from(response: reqwest::Response) -> ServiceError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<StripeErrorBody>(&body)
            .ok()
            .map(|b| {
                format!(
                    "{}: {}",
                    b.error.kind.unwrap_or_else(|| "error".to_string()),
                    b.error.message.unwrap_or_default()
                )
            })
            .unwrap_or(body);
        ServiceError::PaymentProviderError(format!("HTTP {}: {}", status, detail))
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSessionHandle, ServiceError> {
        let response = self
            .http_client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .header("Idempotency-Key", request.order_id.to_string())
            .form(&Self::session_params(request))
            .send()
            .await
            .map_err(|e| ServiceError::PaymentProviderError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let handle: CheckoutSessionHandle = response
            .json()
            .await
            .map_err(|e| ServiceError::PaymentProviderError(e.to_string()))?;
        info!(session_id = %handle.session_id, "checkout session created");
        Ok(handle)
    }

    #[instrument(skip(self))]
    async fn expire_checkout_session(&self, session_id: &str) -> Result<(), ServiceError> {
        let response = self
            .http_client
            .post(format!(
                "{}/v1/checkout/sessions/{}/expire",
                self.api_base, session_id
            ))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| ServiceError::PaymentProviderError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        Ok(())
    }
}

/// Used when no Stripe key is configured; only free orders can complete.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledPaymentGateway;

#[async_trait]
impl PaymentGateway for DisabledPaymentGateway {
    async fn create_checkout_session(
        &self,
        _request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSessionHandle, ServiceError> {
        Err(ServiceError::PaymentProviderError(
            "Payments are not configured".to_string(),
        ))
    }

    async fn expire_checkout_session(&self, _session_id: &str) -> Result<(), ServiceError> {
        Ok(())
    }
}

pub fn gateway_from_config(config: &AppConfig) -> Result<Arc<dyn PaymentGateway>, ServiceError> {
    Ok(match &config.stripe_secret_key {
        Some(key) => Arc::new(StripeGateway::new(
            config.stripe_api_base.clone(),
            key.clone(),
        )?),
        None => Arc::new(DisabledPaymentGateway),
    })
}

/// Envelope of a Stripe webhook delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub created: Option<i64>,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

impl StripeEvent {
    pub fn object_str(&self, key: &str) -> Option<&str> {
        self.data.object.get(key).and_then(|v| v.as_str())
    }

    /// `metadata.order_id`, falling back to `client_reference_id`
    pub fn order_id(&self) -> Option<Uuid> {
        self.data
            .object
            .get("metadata")
            .and_then(|m| m.get("order_id"))
            .and_then(|v| v.as_str())
            .or_else(|| self.object_str("client_reference_id"))
            .and_then(|s| Uuid::parse_str(s).ok())
    }
}

fn signature_for(secret: &str, timestamp: &str, payload: &[u8]) -> Result<HmacSha256, ServiceError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ServiceError::InternalError(format!("webhook secret: {}", e)))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Checks a `Stripe-Signature` header (`t=...,v1=...`) against the raw body.
pub fn verify_stripe_signature(
    header: &str,
    payload: &[u8],
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), ServiceError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(ServiceError::InvalidWebhookSignature)?;
    let issued_at: i64 = timestamp
        .parse()
        .map_err(|_| ServiceError::InvalidWebhookSignature)?;
    let skew = now
        .checked_sub(issued_at)
        .map(i64::unsigned_abs)
        .ok_or(ServiceError::InvalidWebhookSignature)?;
    if skew > tolerance_secs.unsigned_abs() {
        return Err(ServiceError::InvalidWebhookSignature);
    }

    let matches = signatures.iter().any(|candidate| {
        let Ok(bytes) = hex::decode(candidate) else {
            return false;
        };
        signature_for(secret, timestamp, payload)
            .map(|mac| mac.verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });

    if matches {
        Ok(())
    } else {
        Err(ServiceError::InvalidWebhookSignature)
    }
}

/// Builds a `Stripe-Signature` header value the way Stripe signs deliveries.
pub fn sign_stripe_payload(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, ServiceError> {
    let mac = signature_for(secret, &timestamp.to_string(), payload)?;
    Ok(format!(
        "t={},v1={}",
        timestamp,
        hex::encode(mac.finalize().into_bytes())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const SECRET: &str = "whsec_test_secret";

    #[test]
    fn valid_signature_is_accepted() {
        let body = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;
        let header = sign_stripe_payload(body, SECRET, 1_700_000_000).unwrap();
        assert!(verify_stripe_signature(&header, body, SECRET, 300, 1_700_000_100).is_ok());
    }

    #[test]
    fn any_matching_v1_is_enough() {
        let body = b"{}";
        let good = sign_stripe_payload(body, SECRET, 1_700_000_000).unwrap();
        let v1 = good.split("v1=").nth(1).unwrap();
        let header = format!("t=1700000000,v1={},v1={}", "00".repeat(32), v1);
        assert!(verify_stripe_signature(&header, body, SECRET, 300, 1_700_000_000).is_ok());
    }

    #[test]
    fn tampered_body_or_secret_is_rejected() {
        let body = br#"{"amount":100}"#;
        let header = sign_stripe_payload(body, SECRET, 1_700_000_000).unwrap();
        assert_matches!(
            verify_stripe_signature(&header, br#"{"amount":1}"#, SECRET, 300, 1_700_000_000),
            Err(ServiceError::InvalidWebhookSignature)
        );
        assert_matches!(
            verify_stripe_signature(&header, body, "whsec_other", 300, 1_700_000_000),
            Err(ServiceError::InvalidWebhookSignature)
        );
    }

    #[test]
    fn stale_or_malformed_headers_are_rejected() {
        let body = b"{}";
        let header = sign_stripe_payload(body, SECRET, 1_700_000_000).unwrap();
        assert_matches!(
            verify_stripe_signature(&header, body, SECRET, 300, 1_700_000_301),
            Err(ServiceError::InvalidWebhookSignature)
        );
        assert_matches!(
            verify_stripe_signature("v1=abcd", body, SECRET, 300, 0),
            Err(ServiceError::InvalidWebhookSignature)
        );
        assert_matches!(
            verify_stripe_signature("t=soon,v1=abcd", body, SECRET, 300, 0),
            Err(ServiceError::InvalidWebhookSignature)
        );
        assert_matches!(
            verify_stripe_signature("t=-9223372036854775808,v1=00", body, SECRET, 300, 1_700_000_000),
            Err(ServiceError::InvalidWebhookSignature)
        );
        assert_matches!(
            verify_stripe_signature("t=9223372036854775807,v1=00", body, SECRET, 300, -1),
            Err(ServiceError::InvalidWebhookSignature)
        );
    }

    #[test]
    fn connect_params_only_with_destination() {
        let mut request = CheckoutSessionRequest {
            order_id: Uuid::nil(),
            customer_email: Some("buyer@example.org".to_string()),
            currency: "usd".to_string(),
            line_items: vec![CheckoutLineItem {
                name: "Crest tee".to_string(),
                unit_amount_cents: 2_500,
                quantity: 2,
            }],
            application_fee_cents: 500,
            destination_account: None,
            success_url: "https://shop.test/ok".to_string(),
            cancel_url: "https://shop.test/cancel".to_string(),
        };

        let params = StripeGateway::session_params(&request);
        assert!(params
            .iter()
            .all(|(k, _)| !k.starts_with("payment_intent_data[application_fee_amount]")));
        assert!(params.contains(&(
            "line_items[0][price_data][unit_amount]".to_string(),
            "2500".to_string()
        )));
        assert!(params.contains(&("line_items[0][quantity]".to_string(), "2".to_string())));

        request.destination_account = Some("acct_123".to_string());
        let params = StripeGateway::session_params(&request);
        assert!(params.contains(&(
            "payment_intent_data[application_fee_amount]".to_string(),
            "500".to_string()
        )));
        assert!(params.contains(&(
            "payment_intent_data[transfer_data][destination]".to_string(),
            "acct_123".to_string()
        )));
    }

    #[test]
    fn order_id_from_metadata_or_reference() {
        let id = Uuid::new_v4();
        let event: StripeEvent = serde_json::from_value(serde_json::json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {"object": {"id": "cs_1", "metadata": {"order_id": id.to_string()}}}
        }))
        .unwrap();
        assert_eq!(event.order_id(), Some(id));

        let event: StripeEvent = serde_json::from_value(serde_json::json!({
            "id": "evt_2",
            "type": "checkout.session.expired",
            "data": {"object": {"id": "cs_2", "client_reference_id": id.to_string()}}
        }))
        .unwrap();
        assert_eq!(event.order_id(), Some(id));
    }
}
