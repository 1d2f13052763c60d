use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::services::fees::FeePolicy;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEV_DEFAULT_JWT_SECRET: &str = "kappa_marketplace_development_secret_do_not_deploy_9f3b7c1e";

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Shared HS256 secret used by the hosted identity provider
    #[validate(length(min = 32), custom = "validate_jwt_secret")]
    pub auth_jwt_secret: String,

    /// Expected `iss` claim
    #[serde(default = "default_auth_issuer")]
    pub auth_issuer: String,

    /// Expected `aud` claim
    #[serde(default = "default_auth_audience")]
    pub auth_audience: String,

    /// Seconds before token expiry at which the session enters its warning window
    #[serde(default = "default_session_warning_secs")]
    #[validate(range(min = 1, max = 3600))]
    pub session_warning_secs: i64,

    /// Stripe secret API key; when unset checkout sessions cannot be created
    #[serde(default)]
    pub stripe_secret_key: Option<String>,

    /// Stripe webhook endpoint secret (`whsec_...`)
    #[serde(default)]
    pub stripe_webhook_secret: Option<String>,

    #[serde(default = "default_stripe_api_base")]
    #[validate(url)]
    pub stripe_api_base: String,

    /// Seconds a webhook timestamp may drift from the server clock
    #[serde(default = "default_webhook_tolerance_secs")]
    pub stripe_webhook_tolerance_secs: i64,

    #[serde(default = "default_checkout_success_url")]
    pub checkout_success_url: String,

    #[serde(default = "default_checkout_cancel_url")]
    pub checkout_cancel_url: String,

    /// Percentage of the subtotal charged as platform fee on product and ticket sales
    #[serde(default = "default_platform_fee_percent")]
    #[validate(custom = "validate_percent")]
    pub platform_fee_percent: Decimal,

    /// Flat platform fee charged on steward claims
    #[serde(default = "default_steward_platform_fee_cents")]
    #[validate(range(min = 0))]
    pub steward_platform_fee_cents: i64,

    /// Percentage of the platform fee passed on to the sponsoring chapter
    #[serde(default = "default_chapter_share_percent")]
    #[validate(custom = "validate_percent")]
    pub chapter_share_percent: Decimal,

    /// Rates endpoint of the shipping provider; flat rate is used when unset
    #[serde(default)]
    pub shipping_rates_url: Option<String>,

    #[serde(default)]
    pub shipping_api_key: Option<String>,

    #[serde(default = "default_flat_shipping_cents")]
    #[validate(range(min = 0))]
    pub flat_shipping_cents: i64,

    /// Postal code used as origin when a seller has not configured one
    #[serde(default = "default_origin_postal_code")]
    pub default_origin_postal_code: String,

    #[serde(default = "default_currency")]
    #[validate(length(equal = 3))]
    pub currency: String,

    #[serde(default = "default_event_channel_capacity")]
    #[validate(range(min = 1))]
    pub event_channel_capacity: usize,
}

impl AppConfig {
    /// Creates a configuration with defaults for everything but the essentials
    pub fn new(database_url: String, auth_jwt_secret: String, environment: String) -> Self {
        Self {
            database_url,
            host: "0.0.0.0".to_string(),
            port: default_port(),
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            auth_jwt_secret,
            auth_issuer: default_auth_issuer(),
            auth_audience: default_auth_audience(),
            session_warning_secs: default_session_warning_secs(),
            stripe_secret_key: None,
            stripe_webhook_secret: None,
            stripe_api_base: default_stripe_api_base(),
            stripe_webhook_tolerance_secs: default_webhook_tolerance_secs(),
            checkout_success_url: default_checkout_success_url(),
            checkout_cancel_url: default_checkout_cancel_url(),
            platform_fee_percent: default_platform_fee_percent(),
            steward_platform_fee_cents: default_steward_platform_fee_cents(),
            chapter_share_percent: default_chapter_share_percent(),
            shipping_rates_url: None,
            shipping_api_key: None,
            flat_shipping_cents: default_flat_shipping_cents(),
            default_origin_postal_code: default_origin_postal_code(),
            currency: default_currency(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Returns true if explicit CORS origins are configured
    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    /// Whether we should fall back to permissive CORS
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    pub fn fee_policy(&self) -> FeePolicy {
        FeePolicy {
            platform_fee_percent: self.platform_fee_percent,
            steward_platform_fee_cents: self.steward_platform_fee_cents,
            chapter_share_percent: self.chapter_share_percent,
        }
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.should_allow_permissive_cors() && !self.has_cors_allowed_origins() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message = Some(
                "Set APP__CORS_ALLOWED_ORIGINS for non-development environments or explicitly opt-in via APP__CORS_ALLOW_ANY_ORIGIN=true".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        if !self.is_development() && self.auth_jwt_secret.trim() == DEV_DEFAULT_JWT_SECRET {
            let mut err = ValidationError::new("auth_jwt_secret_default_dev");
            err.message = Some(
                "The bundled development secret must not be used outside development. Set APP__AUTH_JWT_SECRET to the identity provider's signing secret."
                    .into(),
            );
            errors.add("auth_jwt_secret", err);
        }

        if self.is_production() && self.stripe_secret_key.is_none() {
            let mut err = ValidationError::new("stripe_secret_key_required");
            err.message = Some("Set APP__STRIPE_SECRET_KEY in production".into());
            errors.add("stripe_secret_key", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_db_max_connections() -> u32 {
    20
}
fn default_db_min_connections() -> u32 {
    2
}
fn default_db_connect_timeout_secs() -> u64 {
    10
}
fn default_db_idle_timeout_secs() -> u64 {
    300
}
fn default_db_acquire_timeout_secs() -> u64 {
    10
}
fn default_auth_issuer() -> String {
    "https://auth.kappa-marketplace.local".to_string()
}
fn default_auth_audience() -> String {
    "kappa-marketplace-api".to_string()
}
fn default_session_warning_secs() -> i64 {
    120
}
fn default_stripe_api_base() -> String {
    "https://api.stripe.com".to_string()
}
fn default_webhook_tolerance_secs() -> i64 {
    300
}
fn default_checkout_success_url() -> String {
    "http://localhost:3000/checkout/success?session_id={CHECKOUT_SESSION_ID}".to_string()
}
fn default_checkout_cancel_url() -> String {
    "http://localhost:3000/checkout/cancelled".to_string()
}
fn default_platform_fee_percent() -> Decimal {
    dec!(10)
}
fn default_steward_platform_fee_cents() -> i64 {
    300
}
fn default_chapter_share_percent() -> Decimal {
    dec!(20)
}
fn default_flat_shipping_cents() -> i64 {
    899
}
fn default_origin_postal_code() -> String {
    "40202".to_string()
}
fn default_currency() -> String {
    "usd".to_string()
}
fn default_event_channel_capacity() -> usize {
    1024
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_jwt_secret(secret: &str) -> Result<(), ValidationError> {
    let trimmed = secret.trim();

    const DISALLOWED: [&str; 3] = ["your-secret-key", "default-secret-key", "changeme"];
    if DISALLOWED
        .iter()
        .any(|&bad| trimmed.eq_ignore_ascii_case(bad))
    {
        let mut err = ValidationError::new("auth_jwt_secret");
        err.message = Some("Identity provider secret must be a secure random value".into());
        return Err(err);
    }

    let unique_chars: std::collections::HashSet<char> = trimmed.chars().collect();
    if unique_chars.len() < 10 {
        let mut err = ValidationError::new("auth_jwt_secret");
        err.message =
            Some("Identity provider secret must have at least 10 unique characters".into());
        return Err(err);
    }

    Ok(())
}

fn validate_percent(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() || *value > dec!(100) {
        let mut err = ValidationError::new("percent");
        err.message = Some("Percentages must be between 0 and 100".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("kappa_marketplace={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let builder = fmt().with_env_filter(EnvFilter::new(filter_directive));
    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    // auth_jwt_secret has no default; it must come from the identity provider setup.
    let config = Config::builder()
        .set_default("database_url", "sqlite://kappa_marketplace.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if config.get_string("auth_jwt_secret").is_err() {
        error!("Identity provider secret is not configured. Set APP__AUTH_JWT_SECRET.");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "auth_jwt_secret is required but not configured. Set APP__AUTH_JWT_SECRET.".into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".into(),
            "prod_signing_secret_Qx81mZ-4kL0v9Tt2Wc7Hy3Rb".into(),
            "production".into(),
        )
    }

    #[test]
    fn non_dev_requires_cors_origins() {
        let mut cfg = base_config();
        cfg.stripe_secret_key = Some("sk_live_x".into());
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn non_dev_with_origins_passes() {
        let mut cfg = base_config();
        cfg.stripe_secret_key = Some("sk_live_x".into());
        cfg.cors_allowed_origins = Some("https://shop.example.org".into());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn production_requires_stripe_key() {
        let mut cfg = base_config();
        cfg.cors_allow_any_origin = true;
        let errors = cfg.validate_additional_constraints().unwrap_err();
        assert!(errors.field_errors().contains_key("stripe_secret_key"));
    }

    #[test]
    fn development_secret_rejected_outside_development() {
        let mut cfg = base_config();
        cfg.environment = "staging".into();
        cfg.cors_allow_any_origin = true;
        cfg.auth_jwt_secret = DEV_DEFAULT_JWT_SECRET.into();
        let errors = cfg.validate_additional_constraints().unwrap_err();
        assert!(errors.field_errors().contains_key("auth_jwt_secret"));
    }

    #[test]
    fn development_allows_permissive_by_default() {
        let mut cfg = base_config();
        cfg.environment = "development".into();
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn percentages_are_bounded() {
        let mut cfg = base_config();
        cfg.platform_fee_percent = dec!(120);
        assert!(cfg.validate().is_err());

        cfg.platform_fee_percent = dec!(7.5);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn weak_secret_fails_validation() {
        let mut cfg = base_config();
        cfg.auth_jwt_secret = "a".repeat(40);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn fee_policy_mirrors_settings() {
        let cfg = base_config();
        let policy = cfg.fee_policy();
        assert_eq!(policy.platform_fee_percent, dec!(10));
        assert_eq!(policy.steward_platform_fee_cents, 300);
        assert_eq!(policy.chapter_share_percent, dec!(20));
    }
}
