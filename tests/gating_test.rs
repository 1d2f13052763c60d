//! Kappa-branded purchase gating and role checks over HTTP.

mod common;

use axum::http::{Method, StatusCode};
use common::{json_body, shipping_address, TestApp, TestUser};
use serde_json::{json, Value};

async fn product(app: &TestApp, seller: &TestUser, name: &str, branded: bool) -> String {
    let response = app
        .post(
            "/api/v1/products",
            json!({
                "name": name,
                "price_cents": 2500,
                "category": "apparel",
                "is_kappa_branded": branded,
                "stock_quantity": 10,
                "weight_oz": 8
            }),
            Some(&seller.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    body["data"]["id"].as_str().expect("product id").to_string()
}

async fn catalog_flags(app: &TestApp, token: Option<&str>) -> Vec<(String, bool)> {
    let response = app.get("/api/v1/products", token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let mut flags: Vec<(String, bool)> = body["data"]["items"]
        .as_array()
        .expect("items")
        .iter()
        .map(|item| {
            (
                item["name"].as_str().unwrap().to_string(),
                item["can_purchase"].as_bool().unwrap(),
            )
        })
        .collect();
    flags.sort();
    flags
}

fn checkout_body(product_id: &str) -> Value {
    json!({
        "product_id": product_id,
        "quantity": 1,
        "shipping_address": shipping_address()
    })
}

#[tokio::test]
async fn catalog_marks_what_each_caller_can_buy() {
    let app = TestApp::new().await;
    let seller = app.guest("threads").await;
    app.approved_seller(&seller, None).await;
    product(&app, &seller, "Crimson Hoodie", true).await;
    product(&app, &seller, "Plain Tee", false).await;

    let guest = app.guest("visitor").await;
    let member = app.member("nupe").await;

    assert_eq!(
        catalog_flags(&app, None).await,
        vec![("Crimson Hoodie".to_string(), false), ("Plain Tee".to_string(), true)]
    );
    assert_eq!(
        catalog_flags(&app, Some(&guest.token)).await,
        vec![("Crimson Hoodie".to_string(), false), ("Plain Tee".to_string(), true)]
    );
    assert_eq!(
        catalog_flags(&app, Some(&member.token)).await,
        vec![("Crimson Hoodie".to_string(), true), ("Plain Tee".to_string(), true)]
    );
}

#[tokio::test]
async fn anonymous_buyer_of_branded_item_is_asked_to_sign_in() {
    let app = TestApp::new().await;
    let seller = app.guest("threads").await;
    app.approved_seller(&seller, None).await;
    let hoodie = product(&app, &seller, "Crimson Hoodie", true).await;

    let response = app
        .post("/api/v1/checkout/products", checkout_body(&hoodie), None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["code"], "AUTH_REQUIRED_FOR_KAPPA_BRANDED");
    assert!(app.gateway.last_session().is_none());
}

#[tokio::test]
async fn signed_in_non_member_cannot_buy_branded_item() {
    let app = TestApp::new().await;
    let seller = app.guest("threads").await;
    app.approved_seller(&seller, None).await;
    let hoodie = product(&app, &seller, "Crimson Hoodie", true).await;
    let guest = app.guest("visitor").await;

    let response = app
        .post(
            "/api/v1/checkout/products",
            checkout_body(&hoodie),
            Some(&guest.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await;
    assert_eq!(body["code"], "MEMBERSHIP_REQUIRED_FOR_KAPPA_BRANDED");
}

#[tokio::test]
async fn verified_member_can_buy_branded_item() {
    let app = TestApp::new().await;
    let seller = app.guest("threads").await;
    app.approved_seller(&seller, None).await;
    let hoodie = product(&app, &seller, "Crimson Hoodie", true).await;
    let member = app.member("nupe").await;

    let response = app
        .post(
            "/api/v1/checkout/products",
            checkout_body(&hoodie),
            Some(&member.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["data"]["order"]["status"], "PENDING");
}

#[tokio::test]
async fn unbranded_checkout_still_needs_an_account() {
    let app = TestApp::new().await;
    let seller = app.guest("threads").await;
    app.approved_seller(&seller, None).await;
    let tee = product(&app, &seller, "Plain Tee", false).await;

    let response = app
        .post("/api/v1/checkout/products", checkout_body(&tee), None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["code"], "AUTH_REQUIRED");

    let guest = app.guest("visitor").await;
    let response = app
        .post("/api/v1/checkout/products", checkout_body(&tee), Some(&guest.token))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn revoking_membership_closes_the_gate_again() {
    let app = TestApp::new().await;
    let seller = app.guest("threads").await;
    app.approved_seller(&seller, None).await;
    let hoodie = product(&app, &seller, "Crimson Hoodie", true).await;
    let member = app.member("nupe").await;
    let admin = app.admin().await;

    let response = app
        .post(
            &format!("/api/v1/admin/users/{}/revoke-membership", member.id),
            json!({}),
            Some(&admin.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .post(
            "/api/v1/checkout/products",
            checkout_body(&hoodie),
            Some(&member.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn only_approved_sellers_list_products() {
    let app = TestApp::new().await;
    let guest = app.guest("visitor").await;

    let response = app
        .post(
            "/api/v1/products",
            json!({ "name": "Bootleg Tee", "price_cents": 1000, "stock_quantity": 1 }),
            Some(&guest.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_routes_reject_everyone_else() {
    let app = TestApp::new().await;
    let guest = app.guest("visitor").await;
    let member = app.member("nupe").await;

    let response = app.get("/api/v1/admin/approvals", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    for user in [&guest, &member] {
        let response = app.get("/api/v1/admin/approvals", Some(&user.token)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = json_body(response).await;
        assert_eq!(body["code"], "ADMIN_REQUIRED");
    }

    let admin = app.admin().await;
    let response = app
        .request(Method::GET, "/api/v1/admin/approvals", None, Some(&admin.token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn garbage_token_is_anonymous_on_public_routes_only() {
    let app = TestApp::new().await;
    let response = app.get("/api/v1/products", Some("not-a-jwt")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.get("/api/v1/orders", Some("not-a-jwt")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["code"], "AUTH_INVALID_TOKEN");
}
