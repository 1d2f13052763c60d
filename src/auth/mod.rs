/*!
 * # Authentication and Authorization Module
 *
 * Identity is delegated to a hosted identity provider that issues HS256
 * bearer tokens. This module verifies those tokens, mirrors the account into
 * the local `users` table and exposes the result to handlers as [`AuthUser`].
 *
 * - `auth_middleware` requires a valid token
 * - `optional_auth_middleware` attaches the user when a valid token is present
 * - `admin_middleware` additionally requires the admin role
 */

use axum::{
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::services::users::UserService;

pub mod session;

pub use session::{SessionState, SessionStatus, SessionTimer};

pub const ADMIN_ROLE: &str = "admin";

/// Claims issued by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }
}

/// Authenticated user resolved from the bearer token and the local `users` row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub subject: String,
    pub email: String,
    pub name: String,
    pub is_member: bool,
    pub is_admin: bool,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No authentication token provided")]
    MissingToken,

    #[error("Invalid authentication token: {0}")]
    InvalidToken(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken => ServiceError::Unauthorized("Authentication required".into()),
            AuthError::InvalidToken(msg) => ServiceError::InvalidToken(msg),
            AuthError::TokenExpired => ServiceError::TokenExpired,
            AuthError::TokenCreation(msg) => ServiceError::InternalError(msg),
        }
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: String,
    pub audience: String,
    /// How long before expiry the session enters its warning window
    pub session_warning: ChronoDuration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        issuer: String,
        audience: String,
        session_warning: ChronoDuration,
    ) -> Self {
        Self {
            jwt_secret,
            issuer,
            audience,
            session_warning,
        }
    }

    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(
            config.auth_jwt_secret.clone(),
            config.auth_issuer.clone(),
            config.auth_audience.clone(),
            ChronoDuration::seconds(config.session_warning_secs),
        )
    }
}

/// Verifies identity-provider tokens and keeps local users in sync
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
    users: UserService,
}

impl AuthService {
    pub fn new(config: AuthConfig, users: UserService) -> Self {
        Self { config, users }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.issuer.as_str()]);
        validation.set_audience(&[self.config.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        validation.leeway = 5;
        validation
    }

    /// Validates signature, issuer, audience and expiry
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &self.validation(),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken(e.to_string()),
        })
    }

    /// Signs a token the way the identity provider does; used by tests and local tooling.
    pub fn issue_token(
        &self,
        subject: &str,
        email: &str,
        name: Option<&str>,
        roles: &[&str],
        ttl: ChronoDuration,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            email: email.to_string(),
            name: name.map(str::to_string),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Verifies the token and upserts the matching local user
    #[instrument(skip(self, token))]
    pub async fn authenticate(&self, token: &str) -> Result<AuthUser, ServiceError> {
        let claims = self.verify(token)?;
        let user = self.users.sync_from_claims(&claims).await?;

        Ok(AuthUser {
            user_id: user.id,
            subject: claims.sub.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            is_member: user.is_member,
            is_admin: user.is_admin() || claims.has_role(ADMIN_ROLE),
            expires_at: claims.expires_at(),
        })
    }

    pub fn session_timer(&self, user: &AuthUser) -> SessionTimer {
        SessionTimer::new(user.expires_at, self.config.session_warning)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn auth_service(request: &Request) -> Result<Arc<AuthService>, ServiceError> {
    request
        .extensions()
        .get::<Arc<AuthService>>()
        .cloned()
        .ok_or_else(|| ServiceError::InternalError("Authentication service not available".into()))
}

/// Authentication middleware that requires a valid bearer token
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let service = match auth_service(&request) {
        Ok(service) => service,
        Err(e) => return e.into_response(),
    };

    let token = match bearer_token(request.headers()) {
        Some(token) => token.to_string(),
        None => return ServiceError::from(AuthError::MissingToken).into_response(),
    };

    match service.authenticate(&token).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Attaches the user when a valid token is present; anonymous requests pass through.
pub async fn optional_auth_middleware(mut request: Request, next: Next) -> Response {
    let service = match auth_service(&request) {
        Ok(service) => service,
        Err(e) => return e.into_response(),
    };

    if let Some(token) = bearer_token(request.headers()).map(str::to_string) {
        match service.authenticate(&token).await {
            Ok(user) => {
                request.extensions_mut().insert(user);
            }
            Err(e) => debug!(error = %e, "ignoring unusable token on public route"),
        }
    }

    next.run(request).await
}

/// Requires an [`AuthUser`] with the admin role; runs after `auth_middleware`.
pub async fn admin_middleware(request: Request, next: Next) -> Response {
    match request.extensions().get::<AuthUser>() {
        Some(user) if user.is_admin => next.run(request).await,
        Some(_) => ServiceError::AdminRequired.into_response(),
        None => ServiceError::from(AuthError::MissingToken).into_response(),
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AuthError::MissingToken.into())
    }
}

/// The signed-in user on routes where authentication is optional
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(parts.extensions.get::<AuthUser>().cloned()))
    }
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_optional_auth(self) -> Self;
    fn with_admin(self) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_optional_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(optional_auth_middleware))
    }

    fn with_admin(self) -> Self {
        self.layer(axum::middleware::from_fn(admin_middleware))
            .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn service_with(secret: &str, issuer: &str) -> AuthConfig {
        AuthConfig::new(
            secret.to_string(),
            issuer.to_string(),
            "kappa-marketplace-api".to_string(),
            ChronoDuration::seconds(120),
        )
    }

    async fn service(config: AuthConfig) -> AuthService {
        let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
        let (sender, _rx) = crate::events::channel(8);
        AuthService::new(config, UserService::new(Arc::new(db), Arc::new(sender)))
    }

    const SECRET: &str = "unit-test-signing-secret-0123456789abcdef";

    #[tokio::test]
    async fn issued_tokens_verify() {
        let auth = service(service_with(SECRET, "https://idp.test")).await;
        let token = auth
            .issue_token(
                "idp|42",
                "brother@example.org",
                Some("Brother"),
                &["admin"],
                ChronoDuration::minutes(30),
            )
            .unwrap();

        let claims = auth.verify(&token).unwrap();
        assert_eq!(claims.sub, "idp|42");
        assert_eq!(claims.email, "brother@example.org");
        assert!(claims.has_role("admin"));
    }

    #[tokio::test]
    async fn expired_tokens_are_reported_as_expired() {
        let auth = service(service_with(SECRET, "https://idp.test")).await;
        let token = auth
            .issue_token("idp|1", "a@example.org", None, &[], ChronoDuration::minutes(-10))
            .unwrap();

        assert_matches!(auth.verify(&token), Err(AuthError::TokenExpired));
    }

    #[tokio::test]
    async fn wrong_issuer_or_secret_is_invalid() {
        let issuer_a = service(service_with(SECRET, "https://idp-a.test")).await;
        let issuer_b = service(service_with(SECRET, "https://idp-b.test")).await;
        let other_secret =
            service(service_with("another-signing-secret-abcdefghijklmnop", "https://idp-a.test"))
                .await;

        let token = issuer_a
            .issue_token("idp|1", "a@example.org", None, &[], ChronoDuration::minutes(5))
            .unwrap();

        assert_matches!(issuer_b.verify(&token), Err(AuthError::InvalidToken(_)));
        assert_matches!(other_secret.verify(&token), Err(AuthError::InvalidToken(_)));
    }

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());

        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert!(bearer_token(&headers).is_none());

        headers.insert(header::AUTHORIZATION, "Bearer   ".parse().unwrap());
        assert!(bearer_token(&headers).is_none());

        headers.insert(header::AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc.def"));
    }

    #[test]
    fn auth_errors_map_to_codes() {
        assert_eq!(
            ServiceError::from(AuthError::TokenExpired).error_code(),
            "AUTH_TOKEN_EXPIRED"
        );
        assert_eq!(
            ServiceError::from(AuthError::MissingToken).error_code(),
            "AUTH_REQUIRED"
        );
        assert_eq!(
            ServiceError::from(AuthError::InvalidToken("bad".into())).error_code(),
            "AUTH_INVALID_TOKEN"
        );
    }
}
