//! Prometheus counters for domain activity, exposed as text at `/metrics`.

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::warn;

use crate::errors::ServiceError;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new_custom(Some("kappa_marketplace".into()), None)
        .unwrap_or_default();
    pub static ref DOMAIN_EVENTS: IntCounterVec = IntCounterVec::new(
        Opts::new("domain_events_total", "Domain events processed, by event name"),
        &["event"]
    )
    .expect("metric can be created");
    pub static ref CHECKOUT_SESSIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("checkout_sessions_total", "Checkout sessions opened, by order kind"),
        &["kind"]
    )
    .expect("metric can be created");
    pub static ref WEBHOOK_EVENTS: IntCounterVec = IntCounterVec::new(
        Opts::new("webhook_events_total", "Stripe webhook deliveries, by type and outcome"),
        &["event_type", "outcome"]
    )
    .expect("metric can be created");
    pub static ref SHIPPING_FALLBACKS: IntCounterVec = IntCounterVec::new(
        Opts::new("shipping_rate_fallbacks_total", "Flat-rate fallbacks after provider errors"),
        &["reason"]
    )
    .expect("metric can be created");
    pub static ref TICKET_OVERSELLS: IntCounter = IntCounter::new(
        "ticket_oversell_total",
        "Ticket payments settled after the event had already reached capacity"
    )
    .expect("metric can be created");
}

/// Registers the collectors once; repeated calls are harmless.
pub fn register_metrics() {
    let collectors: [Box<dyn prometheus::core::Collector>; 5] = [
        Box::new(DOMAIN_EVENTS.clone()),
        Box::new(CHECKOUT_SESSIONS.clone()),
        Box::new(WEBHOOK_EVENTS.clone()),
        Box::new(SHIPPING_FALLBACKS.clone()),
        Box::new(TICKET_OVERSELLS.clone()),
    ];
    for collector in collectors {
        if let Err(e) = REGISTRY.register(collector) {
            if !matches!(e, prometheus::Error::AlreadyReg) {
                warn!("Failed to register metric: {}", e);
            }
        }
    }
}

/// Renders all registered metrics in the Prometheus text format
pub fn render() -> Result<String, ServiceError> {
    register_metrics();
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| ServiceError::InternalError(format!("metrics encoding failed: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| ServiceError::InternalError(format!("metrics are not utf-8: {}", e)))
}

pub async fn metrics_handler() -> Result<String, ServiceError> {
    render()
}
