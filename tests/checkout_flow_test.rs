//! End-to-end checkout: fee composition, Stripe sessions and webhook settlement.

mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use chrono::{Duration, Utc};
use common::{
    json_body, session_completed, session_expired, shipping_address, RecordingGateway, TestApp,
    TestUser, FLAT_SHIPPING_CENTS,
};
use kappa_marketplace::entities::{
    event, product,
    steward_listing::{self, ListingStatus},
};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

async fn seller_product(app: &TestApp, stock: i32) -> (TestUser, Uuid) {
    let chapter = app.chapter("Louisville Alumni").await;
    let seller = app.guest("threads").await;
    app.approved_seller(&seller, Some(chapter.id)).await;
    let response = app
        .post(
            "/api/v1/products",
            json!({
                "name": "Crimson Hoodie",
                "price_cents": 2500,
                "stock_quantity": stock,
                "weight_oz": 16
            }),
            Some(&seller.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    let id = body["data"]["id"].as_str().unwrap().parse().unwrap();
    (seller, id)
}

async fn promoter_event(app: &TestApp, price_cents: i64, capacity: Option<i32>) -> (TestUser, Uuid) {
    let promoter = app.member("promoter").await;
    app.approved_promoter(&promoter, None).await;
    let starts_at = Utc::now() + Duration::days(7);
    let response = app
        .post(
            "/api/v1/events",
            json!({
                "title": "Founders Day Gala",
                "location": "Galt House",
                "city": "Louisville",
                "state": "KY",
                "starts_at": starts_at,
                "ends_at": starts_at + Duration::hours(4),
                "ticket_price_cents": price_cents,
                "capacity": capacity
            }),
            Some(&promoter.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    let id = body["data"]["id"].as_str().unwrap().parse().unwrap();
    (promoter, id)
}

async fn steward_listing(app: &TestApp) -> (TestUser, Uuid) {
    let chapter = app.chapter("Beta").await;
    let steward = app.member("steward").await;
    app.approved_steward(&steward, chapter.id).await;
    let response = app
        .post(
            "/api/v1/steward-listings",
            json!({
                "name": "1975 Conclave Paddle",
                "shipping_cents": 1250,
                "chapter_donation_cents": 500
            }),
            Some(&steward.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    let id = body["data"]["id"].as_str().unwrap().parse().unwrap();
    (steward, id)
}

async fn checkout(app: &TestApp, uri: &str, body: Value, buyer: &TestUser) -> Value {
    let response = app.post(uri, body, Some(&buyer.token)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await
}

fn order_id(body: &Value) -> Uuid {
    body["data"]["order"]["id"].as_str().unwrap().parse().unwrap()
}

async fn order_status(app: &TestApp, id: Uuid, owner: &TestUser) -> String {
    let response = app
        .get(&format!("/api/v1/orders/{}", id), Some(&owner.token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    body["data"]["status"].as_str().unwrap().to_string()
}

async fn stored_event(app: &TestApp, id: Uuid) -> event::Model {
    event::Entity::find_by_id(id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap()
}

async fn stored_product(app: &TestApp, id: Uuid) -> product::Model {
    product::Entity::find_by_id(id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap()
}

async fn listing(app: &TestApp, id: Uuid) -> steward_listing::Model {
    steward_listing::Entity::find_by_id(id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn product_checkout_composes_fees_and_opens_a_session() {
    let app = TestApp::new().await;
    let (_seller, product_id) = seller_product(&app, 10).await;
    let buyer = app.guest("buyer").await;

    let body = checkout(
        &app,
        "/api/v1/checkout/products",
        json!({ "product_id": product_id, "quantity": 2, "shipping_address": shipping_address() }),
        &buyer,
    )
    .await;

    let breakdown = &body["data"]["breakdown"];
    assert_eq!(breakdown["subtotal_cents"], 5000);
    assert_eq!(breakdown["shipping_cents"], FLAT_SHIPPING_CENTS);
    assert_eq!(breakdown["platform_fee_cents"], 500);
    assert_eq!(breakdown["total_cents"], 6399);

    let order = &body["data"]["order"];
    assert_eq!(order["status"], "PENDING");
    assert_eq!(order["kind"], "PRODUCT");
    assert_eq!(order["chapter_share_cents"], 100);

    let id = order_id(&body);
    assert_eq!(
        body["data"]["checkout_url"],
        format!(
            "https://checkout.stripe.test/pay/{}",
            RecordingGateway::session_id_for(id)
        )
    );

    let session = app.gateway.last_session().expect("session opened");
    assert_eq!(session.order_id, id);
    assert_eq!(session.customer_email.as_deref(), Some(buyer.email.as_str()));
    assert_eq!(session.destination_account.as_deref(), Some("acct_seller"));
    assert_eq!(session.application_fee_cents, 500);
    let charged: i64 = session
        .line_items
        .iter()
        .map(|item| item.unit_amount_cents * i64::from(item.quantity))
        .sum();
    assert_eq!(charged, 6399);
}

#[tokio::test]
async fn quote_matches_checkout_without_creating_orders() {
    let app = TestApp::new().await;
    let (_seller, product_id) = seller_product(&app, 10).await;

    let response = app
        .get(
            &format!(
                "/api/v1/checkout/quote/products/{}?quantity=2&postal_code=40202",
                product_id
            ),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["breakdown"]["total_cents"], 6399);
    assert_eq!(body["data"]["payout"]["payee_cents"], 5000 + FLAT_SHIPPING_CENTS);
    assert_eq!(body["data"]["payout"]["platform_cents"], 400);
    assert_eq!(body["data"]["payout"]["chapter_cents"], 100);
    assert_eq!(body["data"]["currency"], "usd");
    assert!(app.gateway.last_session().is_none());
}

#[tokio::test]
async fn paid_webhook_settles_order_once_and_decrements_stock() {
    let app = TestApp::new().await;
    let (seller, product_id) = seller_product(&app, 10).await;
    let buyer = app.guest("buyer").await;
    let body = checkout(
        &app,
        "/api/v1/checkout/products",
        json!({ "product_id": product_id, "quantity": 3, "shipping_address": shipping_address() }),
        &buyer,
    )
    .await;
    let id = order_id(&body);

    let response = app.deliver_webhook(&session_completed("evt_paid_1", id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["data"], "processed");
    assert_eq!(order_status(&app, id, &buyer).await, "PAID");

    let response = app.deliver_webhook(&session_completed("evt_paid_1", id)).await;
    assert_eq!(json_body(response).await["data"], "duplicate");

    // A second event id for the same session must not decrement again.
    let response = app.deliver_webhook(&session_completed("evt_paid_2", id)).await;
    assert_eq!(json_body(response).await["data"], "processed");

    let stored = product::Entity::find_by_id(product_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.stock_quantity, 7);

    let response = app.get("/api/v1/sellers/me/orders", Some(&seller.token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let orders = json_body(response).await;
    assert_eq!(orders["data"]["total"], 1);
}

#[tokio::test]
async fn refund_webhook_marks_order_refunded() {
    let app = TestApp::new().await;
    let (_seller, product_id) = seller_product(&app, 5).await;
    let buyer = app.guest("buyer").await;
    let body = checkout(
        &app,
        "/api/v1/checkout/products",
        json!({ "product_id": product_id, "quantity": 1, "shipping_address": shipping_address() }),
        &buyer,
    )
    .await;
    let id = order_id(&body);
    app.deliver_webhook(&session_completed("evt_paid", id)).await;

    let refund = json!({
        "id": "evt_refund",
        "type": "charge.refunded",
        "data": { "object": {
            "id": "ch_1",
            "object": "charge",
            "refunded": true,
            "payment_intent": format!("pi_{}", id.simple())
        } }
    });
    let response = app.deliver_webhook(&refund).await;
    assert_eq!(json_body(response).await["data"], "processed");
    assert_eq!(order_status(&app, id, &buyer).await, "REFUNDED");
}

#[tokio::test]
async fn webhook_with_bad_signature_is_rejected() {
    let app = TestApp::new().await;
    let payload = serde_json::to_vec(&session_completed("evt_forged", Uuid::new_v4())).unwrap();

    for signature in [Some("t=1,v1=deadbeef"), None] {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/payments/webhook")
            .header("content-type", "application/json");
        if let Some(signature) = signature {
            builder = builder.header("Stripe-Signature", signature);
        }
        let request = builder.body(Body::from(payload.clone())).unwrap();
        let response = kappa_marketplace::build_router(app.state.clone())
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["code"], "INVALID_WEBHOOK_SIGNATURE");
    }
}

#[tokio::test]
async fn free_tickets_are_issued_without_payment() {
    let app = TestApp::new().await;
    let (_promoter, event_id) = promoter_event(&app, 0, Some(2)).await;
    let buyer = app.guest("buyer").await;

    let body = checkout(
        &app,
        &format!("/api/v1/checkout/events/{}/tickets", event_id),
        json!({ "quantity": 2 }),
        &buyer,
    )
    .await;
    assert_eq!(body["data"]["order"]["status"], "PAID");
    assert_eq!(body["data"]["order"]["kind"], "EVENT_TICKET");
    assert_eq!(body["data"]["breakdown"]["total_cents"], 0);
    assert!(body["data"]["checkout_url"].is_null());
    assert!(app.gateway.last_session().is_none());

    let stored = event::Entity::find_by_id(event_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.tickets_sold, 2);

    let late = app.guest("late").await;
    let response = app
        .post(
            &format!("/api/v1/checkout/events/{}/tickets", event_id),
            json!({ "quantity": 1 }),
            Some(&late.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(response).await["code"], "SOLD_OUT");
}

#[tokio::test]
async fn ticket_checkout_charges_fee_but_no_shipping() {
    let app = TestApp::new().await;
    let (_promoter, event_id) = promoter_event(&app, 1500, None).await;
    let buyer = app.guest("buyer").await;

    let body = checkout(
        &app,
        &format!("/api/v1/checkout/events/{}/tickets", event_id),
        json!({ "quantity": 2 }),
        &buyer,
    )
    .await;
    let breakdown = &body["data"]["breakdown"];
    assert_eq!(breakdown["subtotal_cents"], 3000);
    assert_eq!(breakdown["shipping_cents"], 0);
    assert_eq!(breakdown["platform_fee_cents"], 300);
    assert_eq!(breakdown["total_cents"], 3300);

    let session = app.gateway.last_session().unwrap();
    assert_eq!(session.destination_account.as_deref(), Some("acct_promoter"));
    assert!(session.line_items.iter().all(|item| item.name != "Shipping"));
}

#[tokio::test]
async fn steward_claim_reserves_until_the_session_ends() {
    let app = TestApp::new().await;
    let (_steward, listing_id) = steward_listing(&app).await;
    let claimant = app.member("claimant").await;
    let uri = format!("/api/v1/checkout/steward-listings/{}/claim", listing_id);

    let body = checkout(
        &app,
        &uri,
        json!({ "shipping_address": shipping_address() }),
        &claimant,
    )
    .await;
    let breakdown = &body["data"]["breakdown"];
    assert_eq!(breakdown["subtotal_cents"], 0);
    assert_eq!(breakdown["shipping_cents"], 1250);
    assert_eq!(breakdown["platform_fee_cents"], 300);
    assert_eq!(breakdown["donation_cents"], 500);
    assert_eq!(breakdown["total_cents"], 2050);
    assert!(app.gateway.last_session().unwrap().destination_account.is_none());

    let id = order_id(&body);
    assert_eq!(listing(&app, listing_id).await.status, ListingStatus::Reserved);

    let rival = app.member("rival").await;
    let response = app
        .post(&uri, json!({ "shipping_address": shipping_address() }), Some(&rival.token))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app.deliver_webhook(&session_expired("evt_expired", id)).await;
    assert_eq!(json_body(response).await["data"], "processed");
    assert_eq!(order_status(&app, id, &claimant).await, "CANCELLED");
    assert_eq!(listing(&app, listing_id).await.status, ListingStatus::Active);

    let body = checkout(
        &app,
        &uri,
        json!({ "shipping_address": shipping_address() }),
        &rival,
    )
    .await;
    let id = order_id(&body);
    app.deliver_webhook(&session_completed("evt_claim_paid", id)).await;

    let claimed = listing(&app, listing_id).await;
    assert_eq!(claimed.status, ListingStatus::Claimed);
    assert_eq!(claimed.claimed_by, Some(rival.id));
}

#[tokio::test]
async fn stewards_cannot_claim_their_own_items() {
    let app = TestApp::new().await;
    let (steward, listing_id) = steward_listing(&app).await;

    let response = app
        .post(
            &format!("/api/v1/checkout/steward-listings/{}/claim", listing_id),
            json!({ "shipping_address": shipping_address() }),
            Some(&steward.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn buyer_can_cancel_a_pending_order() {
    let app = TestApp::new().await;
    let (_seller, product_id) = seller_product(&app, 10).await;
    let buyer = app.guest("buyer").await;
    let body = checkout(
        &app,
        "/api/v1/checkout/products",
        json!({ "product_id": product_id, "quantity": 1, "shipping_address": shipping_address() }),
        &buyer,
    )
    .await;
    let id = order_id(&body);
    let cancel = format!("/api/v1/orders/{}/cancel", id);

    let stranger = app.guest("stranger").await;
    let response = app.post(&cancel, json!({}), Some(&stranger.token)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = app
        .get(&format!("/api/v1/orders/{}", id), Some(&stranger.token))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.post(&cancel, json!({}), Some(&buyer.token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["data"]["status"], "CANCELLED");
    assert_eq!(
        app.gateway.expired.lock().unwrap().clone(),
        vec![RecordingGateway::session_id_for(id)]
    );

    let response = app.post(&cancel, json!({}), Some(&buyer.token)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(response).await["code"], "INVALID_STATE");

    // Payment that arrives after cancellation is not applied.
    let response = app.deliver_webhook(&session_completed("evt_late", id)).await;
    assert_eq!(json_body(response).await["data"], "ignored");
}

#[tokio::test]
async fn payment_provider_failure_cancels_the_order() {
    let app = TestApp::new().await;
    let (_seller, product_id) = seller_product(&app, 10).await;
    let buyer = app.guest("buyer").await;
    app.gateway.fail_next_sessions(true);

    let response = app
        .post(
            "/api/v1/checkout/products",
            json!({ "product_id": product_id, "quantity": 1, "shipping_address": shipping_address() }),
            Some(&buyer.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(json_body(response).await["code"], "PAYMENT_PROVIDER_ERROR");

    let response = app.get("/api/v1/orders", Some(&buyer.token)).await;
    let body = json_body(response).await;
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["status"], "CANCELLED");
}

#[tokio::test]
async fn checkout_rejects_more_than_is_in_stock() {
    let app = TestApp::new().await;
    let (_seller, product_id) = seller_product(&app, 1).await;
    let buyer = app.guest("buyer").await;

    let response = app
        .post(
            "/api/v1/checkout/products",
            json!({ "product_id": product_id, "quantity": 2, "shipping_address": shipping_address() }),
            Some(&buyer.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(response).await["code"], "OUT_OF_STOCK");
}

async fn buy_ticket(app: &TestApp, event_id: Uuid, buyer: &TestUser) -> Uuid {
    let body = checkout(
        app,
        &format!("/api/v1/checkout/events/{}/tickets", event_id),
        json!({ "quantity": 1 }),
        buyer,
    )
    .await;
    assert_eq!(body["data"]["order"]["status"], "PENDING");
    order_id(&body)
}

#[tokio::test]
async fn pending_ticket_orders_hold_capacity() {
    let app = TestApp::new().await;
    let (_promoter, event_id) = promoter_event(&app, 1500, Some(1)).await;
    let first = app.guest("first").await;
    let second = app.guest("second").await;
    let uri = format!("/api/v1/checkout/events/{}/tickets", event_id);

    let held = buy_ticket(&app, event_id, &first).await;
    let response = app
        .post(&uri, json!({ "quantity": 1 }), Some(&second.token))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(response).await["code"], "SOLD_OUT");

    // The abandoned session frees the seat.
    app.deliver_webhook(&session_expired("evt_seat_released", held))
        .await;
    let id = buy_ticket(&app, event_id, &second).await;
    let response = app.deliver_webhook(&session_completed("evt_seat_paid", id)).await;
    assert_eq!(json_body(response).await["data"], "processed");

    let stored = stored_event(&app, event_id).await;
    assert_eq!(stored.capacity, Some(1));
    assert_eq!(stored.tickets_sold, 1);
}

#[tokio::test]
async fn settlement_never_pushes_tickets_past_capacity() {
    let app = TestApp::new().await;
    let (promoter, event_id) = promoter_event(&app, 1500, Some(2)).await;
    let first = app.guest("first").await;
    let second = app.guest("second").await;
    let first_order = buy_ticket(&app, event_id, &first).await;
    let second_order = buy_ticket(&app, event_id, &second).await;

    // Nothing is sold yet, so the promoter may still shrink the event.
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/events/{}", event_id),
            Some(json!({ "capacity": 1 })),
            Some(&promoter.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    app.deliver_webhook(&session_completed("evt_first_paid", first_order))
        .await;
    let response = app
        .deliver_webhook(&session_completed("evt_second_paid", second_order))
        .await;
    assert_eq!(json_body(response).await["data"], "processed");

    assert_eq!(order_status(&app, first_order, &first).await, "PAID");
    assert_eq!(order_status(&app, second_order, &second).await, "PAID");
    let stored = stored_event(&app, event_id).await;
    assert_eq!(stored.tickets_sold, 1);
}

#[tokio::test]
async fn closed_cancelled_and_ended_events_stop_selling() {
    let app = TestApp::new().await;
    let buyer = app.guest("buyer").await;

    let (promoter, closed_id) = promoter_event(&app, 1500, None).await;
    let response = app
        .post(
            &format!("/api/v1/events/{}/close", closed_id),
            json!({}),
            Some(&promoter.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["data"]["status"], "CLOSED");

    // Terminal events cannot move again.
    let response = app
        .post(
            &format!("/api/v1/events/{}/cancel", closed_id),
            json!({}),
            Some(&promoter.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(response).await["code"], "INVALID_STATE");

    let response = app
        .post(
            &format!("/api/v1/checkout/events/{}/tickets", closed_id),
            json!({ "quantity": 1 }),
            Some(&buyer.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(response).await["code"], "INVALID_STATE");

    let response = app
        .post(
            "/api/v1/events",
            json!({
                "title": "Province Council",
                "location": "Student Union",
                "starts_at": Utc::now() + Duration::days(3),
                "ends_at": Utc::now() + Duration::days(3) + Duration::hours(2),
                "ticket_price_cents": 1000
            }),
            Some(&promoter.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let cancelled_id = json_body(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();
    let response = app
        .post(
            &format!("/api/v1/events/{}/cancel", cancelled_id),
            json!({}),
            Some(&promoter.token),
        )
        .await;
    assert_eq!(json_body(response).await["data"]["status"], "CANCELLED");
    let response = app
        .post(
            &format!("/api/v1/checkout/events/{}/tickets", cancelled_id),
            json!({ "quantity": 1 }),
            Some(&buyer.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .post(
            "/api/v1/events",
            json!({
                "title": "Spring Formal",
                "location": "Chapter House",
                "starts_at": Utc::now() + Duration::days(5),
                "ends_at": Utc::now() + Duration::days(5) + Duration::hours(3),
                "ticket_price_cents": 2000
            }),
            Some(&promoter.token),
        )
        .await;
    let ended_id: Uuid = json_body(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    let mut past: event::ActiveModel = stored_event(&app, ended_id).await.into();
    past.starts_at = Set(Utc::now() - Duration::days(2));
    past.ends_at = Set(Utc::now() - Duration::days(1));
    past.update(&*app.state.db).await.unwrap();

    let response = app
        .post(
            &format!("/api/v1/checkout/events/{}/tickets", ended_id),
            json!({ "quantity": 1 }),
            Some(&buyer.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(response).await["code"], "INVALID_STATE");
}

#[tokio::test]
async fn stock_floors_at_zero_when_payments_outrun_it() {
    let app = TestApp::new().await;
    let (_seller, product_id) = seller_product(&app, 2).await;
    let first = app.guest("first").await;
    let second = app.guest("second").await;
    let body = json!({ "product_id": product_id, "quantity": 2, "shipping_address": shipping_address() });

    let first_order = order_id(&checkout(&app, "/api/v1/checkout/products", body.clone(), &first).await);
    let second_order = order_id(&checkout(&app, "/api/v1/checkout/products", body, &second).await);

    app.deliver_webhook(&session_completed("evt_first_stock", first_order))
        .await;
    assert_eq!(stored_product(&app, product_id).await.stock_quantity, 0);

    let response = app
        .deliver_webhook(&session_completed("evt_second_stock", second_order))
        .await;
    assert_eq!(json_body(response).await["data"], "processed");
    assert_eq!(order_status(&app, second_order, &second).await, "PAID");
    assert_eq!(stored_product(&app, product_id).await.stock_quantity, 0);
}

#[tokio::test]
async fn heavy_parcels_ship_at_the_flat_rate() {
    let app = TestApp::new().await;
    let seller = app.guest("anvils").await;
    app.approved_seller(&seller, None).await;
    let response = app
        .post(
            "/api/v1/products",
            json!({
                "name": "Cast Iron Crest",
                "price_cents": 4000,
                "stock_quantity": 5,
                "weight_oz": 1000
            }),
            Some(&seller.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let product_id = json_body(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();
    let buyer = app.guest("buyer").await;

    let body = checkout(
        &app,
        "/api/v1/checkout/products",
        json!({ "product_id": product_id, "quantity": 3, "shipping_address": shipping_address() }),
        &buyer,
    )
    .await;
    assert_eq!(body["data"]["breakdown"]["shipping_cents"], FLAT_SHIPPING_CENTS);
    assert_eq!(body["data"]["breakdown"]["subtotal_cents"], 12000);
}

#[tokio::test]
async fn stewards_edit_and_withdraw_active_listings_only() {
    let app = TestApp::new().await;
    let (steward, listing_id) = steward_listing(&app).await;
    let uri = format!("/api/v1/steward-listings/{}", listing_id);

    let response = app
        .request(
            Method::PUT,
            &uri,
            Some(json!({ "name": "1975 Conclave Paddle (signed)", "chapter_donation_cents": 750 })),
            Some(&steward.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["name"], "1975 Conclave Paddle (signed)");
    assert_eq!(body["data"]["chapter_donation_cents"], 750);

    let stranger = app.member("stranger").await;
    let response = app
        .request(Method::DELETE, &uri, None, Some(&stranger.token))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let claimant = app.member("claimant").await;
    checkout(
        &app,
        &format!("/api/v1/checkout/steward-listings/{}/claim", listing_id),
        json!({ "shipping_address": shipping_address() }),
        &claimant,
    )
    .await;
    let response = app
        .request(Method::DELETE, &uri, None, Some(&steward.token))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(response).await["code"], "INVALID_STATE");
    assert_eq!(listing(&app, listing_id).await.status, ListingStatus::Reserved);

    let response = app
        .post(
            "/api/v1/steward-listings",
            json!({ "name": "Province Banner", "shipping_cents": 800 }),
            Some(&steward.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let spare_id: Uuid = json_body(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/steward-listings/{}", spare_id),
            None,
            Some(&steward.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(listing(&app, spare_id).await.status, ListingStatus::Removed);
}

#[tokio::test]
async fn admin_order_listing_filters_by_status_and_kind() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let (_seller, product_id) = seller_product(&app, 10).await;
    let (_promoter, event_id) = promoter_event(&app, 0, None).await;
    let buyer = app.guest("buyer").await;

    checkout(
        &app,
        "/api/v1/checkout/products",
        json!({ "product_id": product_id, "quantity": 1, "shipping_address": shipping_address() }),
        &buyer,
    )
    .await;
    checkout(
        &app,
        &format!("/api/v1/checkout/events/{}/tickets", event_id),
        json!({ "quantity": 1 }),
        &buyer,
    )
    .await;

    let total = |body: &Value| body["data"]["total"].as_u64().unwrap();

    let body = json_body(app.get("/api/v1/admin/orders", Some(&admin.token)).await).await;
    assert_eq!(total(&body), 2);

    let body = json_body(
        app.get("/api/v1/admin/orders?status=PAID", Some(&admin.token))
            .await,
    )
    .await;
    assert_eq!(total(&body), 1);
    assert_eq!(body["data"]["items"][0]["kind"], "EVENT_TICKET");

    let body = json_body(
        app.get("/api/v1/admin/orders?kind=PRODUCT&status=PENDING", Some(&admin.token))
            .await,
    )
    .await;
    assert_eq!(total(&body), 1);
    assert_eq!(body["data"]["items"][0]["product_id"], product_id.to_string());

    let response = app.get("/api/v1/admin/orders", Some(&buyer.token)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
