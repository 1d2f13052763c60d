//! Profiles, session countdown and the application review workflow.

mod common;

use axum::http::{Method, StatusCode};
use chrono::Duration;
use common::{json_body, TestApp};
use serde_json::json;

#[tokio::test]
async fn first_request_provisions_a_guest_profile() {
    let app = TestApp::new().await;
    let token = app.token("idp|newcomer", "newcomer@example.com", &[]);

    let response = app.get("/api/v1/me", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let profile = &body["data"];
    assert_eq!(profile["user"]["email"], "newcomer@example.com");
    assert_eq!(profile["user"]["is_member"], false);
    assert_eq!(profile["is_admin"], false);
    assert!(profile["seller_status"].is_null());

    // Same subject again reuses the account.
    let response = app.get("/api/v1/me", Some(&token)).await;
    let again = json_body(response).await;
    assert_eq!(again["data"]["user"]["id"], profile["user"]["id"]);
}

#[tokio::test]
async fn profile_update_links_a_chapter() {
    let app = TestApp::new().await;
    let chapter = app.chapter("Louisville Alumni").await;
    let user = app.guest("brother").await;

    let response = app
        .request(
            Method::PUT,
            "/api/v1/me",
            Some(json!({ "name": "Jordan Brother", "chapter_id": chapter.id })),
            Some(&user.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(app.get("/api/v1/me", Some(&user.token)).await).await;
    assert_eq!(body["data"]["user"]["name"], "Jordan Brother");
    assert_eq!(body["data"]["chapter"]["name"], "Louisville Alumni");
}

#[tokio::test]
async fn provider_email_change_onto_another_account_conflicts() {
    let app = TestApp::new().await;
    app.guest("first").await;
    let second = app.guest("second").await;

    let moved = app.token("idp|second", "first@example.com", &[]);
    let response = app.get("/api/v1/me", Some(&moved)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(response).await["code"], "CONFLICT");

    // A free address is simply taken over.
    let renamed = app.token("idp|second", "second.new@example.com", &[]);
    let body = json_body(app.get("/api/v1/me", Some(&renamed)).await).await;
    assert_eq!(body["data"]["user"]["id"], second.id.to_string());
    assert_eq!(body["data"]["user"]["email"], "second.new@example.com");
}

#[tokio::test]
async fn session_reports_warning_near_expiry() {
    let app = TestApp::new().await;
    app.guest("brother").await;

    let fresh = app.token("idp|brother", "brother@example.com", &[]);
    let body = json_body(app.get("/api/v1/session", Some(&fresh)).await).await;
    assert_eq!(body["data"]["state"], "ACTIVE");
    assert_eq!(body["data"]["warning_threshold_secs"], 120);

    let closing = app.token_with_ttl(
        "idp|brother",
        "brother@example.com",
        &[],
        Duration::seconds(60),
    );
    let body = json_body(app.get("/api/v1/session", Some(&closing)).await).await;
    assert_eq!(body["data"]["state"], "WARNING");
    let remaining = body["data"]["remaining_secs"].as_i64().unwrap();
    assert!(remaining > 0 && remaining <= 60, "remaining {}", remaining);
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let app = TestApp::new().await;
    let stale = app.token_with_ttl(
        "idp|brother",
        "brother@example.com",
        &[],
        Duration::minutes(-10),
    );

    let response = app.get("/api/v1/session", Some(&stale)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["code"], "AUTH_TOKEN_EXPIRED");
}

#[tokio::test]
async fn seller_application_is_reviewed_by_an_admin() {
    let app = TestApp::new().await;
    let applicant = app.guest("threads").await;
    let admin = app.admin().await;

    let response = app
        .post(
            "/api/v1/sellers/apply",
            json!({
                "business_name": "Crimson Threads",
                "email": applicant.email,
                "ship_from_postal_code": "40202"
            }),
            Some(&applicant.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["data"]["status"], "PENDING");
    let seller_id = body["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .post(
            "/api/v1/sellers/apply",
            json!({ "business_name": "Crimson Threads", "email": applicant.email }),
            Some(&applicant.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = json_body(app.get("/api/v1/admin/approvals", Some(&admin.token)).await).await;
    assert_eq!(body["data"]["counts"]["sellers"], 1);
    assert_eq!(body["data"]["counts"]["total"], 1);
    assert_eq!(body["data"]["sellers"][0]["id"], seller_id.as_str());

    let response = app
        .post(
            &format!("/api/v1/admin/sellers/{}/approve", seller_id),
            json!({ "notes": "vendor license checked", "stripe_account_id": "acct_threads" }),
            Some(&admin.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["status"], "APPROVED");
    assert_eq!(body["data"]["stripe_account_id"], "acct_threads");

    let body = json_body(app.get("/api/v1/me", Some(&applicant.token)).await).await;
    assert_eq!(body["data"]["seller_status"], "APPROVED");

    let body = json_body(app.get("/api/v1/admin/approvals", Some(&admin.token)).await).await;
    assert_eq!(body["data"]["counts"]["total"], 0);
}

#[tokio::test]
async fn rejected_applicants_may_apply_again() {
    let app = TestApp::new().await;
    let applicant = app.member("promoter").await;
    let admin = app.admin().await;
    let apply = json!({ "name": "Province Events", "email": applicant.email });

    let body = json_body(
        app.post("/api/v1/promoters/apply", apply.clone(), Some(&applicant.token))
            .await,
    )
    .await;
    let promoter_id = body["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .post(
            &format!("/api/v1/admin/promoters/{}/reject", promoter_id),
            json!({ "notes": "missing chapter sponsor" }),
            Some(&admin.token),
        )
        .await;
    assert_eq!(json_body(response).await["data"]["status"], "REJECTED");

    let response = app
        .post("/api/v1/promoters/apply", apply, Some(&applicant.token))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["data"]["status"], "PENDING");
    assert!(body["data"]["review_notes"].is_null());
}

#[tokio::test]
async fn promoters_must_be_verified_members() {
    let app = TestApp::new().await;
    let guest = app.guest("outsider").await;

    let response = app
        .post(
            "/api/v1/promoters/apply",
            json!({ "name": "Outside Events", "email": guest.email }),
            Some(&guest.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["code"], "MEMBERSHIP_REQUIRED");

    let admin = app.admin().await;
    let response = app
        .post(
            &format!("/api/v1/admin/users/{}/verify-membership", guest.id),
            json!({}),
            Some(&admin.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["data"]["is_member"], true);

    let response = app
        .post(
            "/api/v1/promoters/apply",
            json!({ "name": "Outside Events", "email": guest.email }),
            Some(&guest.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn admins_manage_the_chapter_directory() {
    let app = TestApp::new().await;
    let admin = app.admin().await;

    let response = app
        .post(
            "/api/v1/admin/chapters",
            json!({
                "name": "Alpha",
                "chapter_type": "COLLEGIATE",
                "province": "Middle Western",
                "city": "Bloomington",
                "state": "IN"
            }),
            Some(&admin.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.get("/api/v1/chapters", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["name"], "Alpha");
    assert_eq!(body["data"]["items"][0]["chapter_type"], "COLLEGIATE");
}

#[tokio::test]
async fn operational_endpoints_are_public() {
    let app = TestApp::new().await;

    for uri in ["/health", "/health/live", "/metrics", "/api-docs/openapi.json"] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
    }
}
