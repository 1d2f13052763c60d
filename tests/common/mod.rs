#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use kappa_marketplace::{
    config::AppConfig,
    db,
    entities::chapter::{self, ChapterType},
    errors::ServiceError,
    events,
    services::{
        admin::ReviewApplicationRequest,
        chapters::CreateChapterRequest,
        payments::{
            sign_stripe_payload, CheckoutSessionHandle, CheckoutSessionRequest, PaymentGateway,
        },
        promoters::PromoterApplicationRequest,
        sellers::SellerApplicationRequest,
        shipping::{FlatRateShippingProvider, ShippingService},
        stewards::StewardApplicationRequest,
    },
    AppState,
};

pub const JWT_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const FLAT_SHIPPING_CENTS: i64 = 899;

/// Payment gateway double that records every session it is asked to open
#[derive(Default)]
pub struct RecordingGateway {
    pub sessions: Mutex<Vec<CheckoutSessionRequest>>,
    pub expired: Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

impl RecordingGateway {
    pub fn session_id_for(order_id: Uuid) -> String {
        format!("cs_test_{}", order_id.simple())
    }

    pub fn last_session(&self) -> Option<CheckoutSessionRequest> {
        self.sessions.lock().unwrap().last().cloned()
    }

    pub fn fail_next_sessions(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentGateway for RecordingGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSessionHandle, ServiceError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ServiceError::PaymentProviderError(
                "card network unavailable".to_string(),
            ));
        }
        self.sessions.lock().unwrap().push(request.clone());
        let session_id = Self::session_id_for(request.order_id);
        Ok(CheckoutSessionHandle {
            url: format!("https://checkout.stripe.test/pay/{}", session_id),
            session_id,
        })
    }

    async fn expire_checkout_session(&self, session_id: &str) -> Result<(), ServiceError> {
        self.expired.lock().unwrap().push(session_id.to_string());
        Ok(())
    }
}

/// A signed-in test user
pub struct TestUser {
    pub id: Uuid,
    pub token: String,
    pub email: String,
}

/// Helper harness for spinning up the application backed by a throwaway SQLite file.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub gateway: Arc<RecordingGateway>,
    _db_dir: tempfile::TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let db_dir = tempfile::tempdir().expect("temp dir for test database");
        let db_path = db_dir.path().join("marketplace.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            JWT_SECRET.to_string(),
            "test".to_string(),
        );
        cfg.db_max_connections = 4;
        cfg.db_min_connections = 1;
        cfg.stripe_webhook_secret = Some(WEBHOOK_SECRET.to_string());
        cfg.flat_shipping_cents = FLAT_SHIPPING_CENTS;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_sender, event_rx) = events::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let gateway = Arc::new(RecordingGateway::default());
        let shipping = ShippingService::new(
            Arc::new(FlatRateShippingProvider::new(FLAT_SHIPPING_CENTS)),
            FLAT_SHIPPING_CENTS,
        );
        let state = AppState::new(
            Arc::new(pool),
            cfg,
            event_sender,
            gateway.clone(),
            shipping,
        );
        let router = kappa_marketplace::build_router(state.clone());

        Self {
            router,
            state,
            gateway,
            _db_dir: db_dir,
            _event_task: event_task,
        }
    }

    // ----- identities -----

    pub fn token(&self, subject: &str, email: &str, roles: &[&str]) -> String {
        self.token_with_ttl(subject, email, roles, Duration::hours(1))
    }

    pub fn token_with_ttl(&self, subject: &str, email: &str, roles: &[&str], ttl: Duration) -> String {
        self.state
            .auth
            .issue_token(subject, email, Some("Test Brother"), roles, ttl)
            .expect("issue test token")
    }

    /// Signs in a fresh user; no membership
    pub async fn guest(&self, name: &str) -> TestUser {
        let email = format!("{}@example.com", name);
        let token = self.token(&format!("idp|{}", name), &email, &[]);
        let user = self
            .state
            .auth
            .authenticate(&token)
            .await
            .expect("provision test user");
        TestUser {
            id: user.user_id,
            token,
            email,
        }
    }

    /// Signs in a fresh user and marks them a verified member
    pub async fn member(&self, name: &str) -> TestUser {
        let user = self.guest(name).await;
        self.state
            .services
            .users
            .set_membership(user.id, true)
            .await
            .expect("verify test member");
        user
    }

    pub async fn admin(&self) -> TestUser {
        let email = "admin@example.com".to_string();
        let token = self.token("idp|admin", &email, &["admin"]);
        let user = self
            .state
            .auth
            .authenticate(&token)
            .await
            .expect("provision admin");
        TestUser {
            id: user.user_id,
            token,
            email,
        }
    }

    // ----- fixtures -----

    pub async fn chapter(&self, name: &str) -> chapter::Model {
        self.state
            .services
            .chapters
            .create(CreateChapterRequest {
                name: name.to_string(),
                chapter_type: ChapterType::Alumni,
                province: "Middle Western".to_string(),
                city: "Louisville".to_string(),
                state: "KY".to_string(),
                contact_email: None,
                stripe_account_id: Some("acct_chapter".to_string()),
                social_links: None,
            })
            .await
            .expect("create test chapter")
    }

    fn approval(account: &str) -> ReviewApplicationRequest {
        ReviewApplicationRequest {
            notes: Some("looks good".to_string()),
            stripe_account_id: Some(account.to_string()),
        }
    }

    pub async fn approved_seller(&self, user: &TestUser, chapter_id: Option<Uuid>) -> Uuid {
        let sellers = &self.state.services.sellers;
        let seller = sellers
            .apply(
                user.id,
                SellerApplicationRequest {
                    business_name: "Crimson Threads".to_string(),
                    email: user.email.clone(),
                    vendor_license_number: None,
                    sponsoring_chapter_id: chapter_id,
                    ship_from_postal_code: Some("40202".to_string()),
                    social_links: None,
                },
            )
            .await
            .expect("seller application");
        sellers
            .approve(seller.id, Self::approval("acct_seller"))
            .await
            .expect("approve seller")
            .id
    }

    pub async fn approved_promoter(&self, user: &TestUser, chapter_id: Option<Uuid>) -> Uuid {
        let promoters = &self.state.services.promoters;
        let promoter = promoters
            .apply(
                user.id,
                PromoterApplicationRequest {
                    name: "Province Events".to_string(),
                    email: user.email.clone(),
                    sponsoring_chapter_id: chapter_id,
                    social_links: None,
                },
            )
            .await
            .expect("promoter application");
        promoters
            .approve(promoter.id, Self::approval("acct_promoter"))
            .await
            .expect("approve promoter")
            .id
    }

    pub async fn approved_steward(&self, user: &TestUser, chapter_id: Uuid) -> Uuid {
        let stewards = &self.state.services.stewards;
        let steward = stewards
            .apply(
                user.id,
                StewardApplicationRequest {
                    sponsoring_chapter_id: chapter_id,
                    ship_from_postal_code: "40202".to_string(),
                },
            )
            .await
            .expect("steward application");
        stewards
            .approve(steward.id, ReviewApplicationRequest::default())
            .await
            .expect("approve steward")
            .id
    }

    // ----- HTTP -----

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response {
        self.request(Method::GET, uri, None, token).await
    }

    pub async fn post(&self, uri: &str, body: Value, token: Option<&str>) -> Response {
        self.request(Method::POST, uri, Some(body), token).await
    }

    /// Delivers a Stripe event signed with the test webhook secret
    pub async fn deliver_webhook(&self, event: &Value) -> Response {
        let payload = serde_json::to_vec(event).expect("serialize webhook");
        let signature = sign_stripe_payload(&payload, WEBHOOK_SECRET, Utc::now().timestamp())
            .expect("sign webhook");
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/payments/webhook")
            .header("content-type", "application/json")
            .header("Stripe-Signature", signature)
            .body(Body::from(payload))
            .expect("failed to build webhook request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during webhook")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub async fn json_body(response: Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read response body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("response is json")
}

pub fn shipping_address() -> Value {
    serde_json::json!({
        "name": "Jordan Brother",
        "line1": "1 Chapter House Way",
        "city": "Louisville",
        "state": "KY",
        "postal_code": "40202",
        "country": "US"
    })
}

/// `checkout.session.completed` for the session opened for `order_id`
pub fn session_completed(event_id: &str, order_id: Uuid) -> Value {
    serde_json::json!({
        "id": event_id,
        "type": "checkout.session.completed",
        "created": Utc::now().timestamp(),
        "data": {
            "object": {
                "id": RecordingGateway::session_id_for(order_id),
                "object": "checkout.session",
                "payment_status": "paid",
                "payment_intent": format!("pi_{}", order_id.simple()),
                "client_reference_id": order_id.to_string(),
                "metadata": { "order_id": order_id.to_string() }
            }
        }
    })
}

pub fn session_expired(event_id: &str, order_id: Uuid) -> Value {
    serde_json::json!({
        "id": event_id,
        "type": "checkout.session.expired",
        "data": {
            "object": {
                "id": RecordingGateway::session_id_for(order_id),
                "object": "checkout.session",
                "metadata": { "order_id": order_id.to_string() }
            }
        }
    })
}
