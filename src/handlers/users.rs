use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;

use crate::{
    auth::{AuthRouterExt, AuthUser, SessionStatus},
    handlers::common::ok,
    services::users::{UpdateProfileRequest, UserProfile},
    ApiResult, AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me).put(update_me))
        .route("/session", get(get_session))
        .with_auth()
}

/// Profile of the signed-in user, including the marketplace roles they hold
#[utoipa::path(
    get,
    path = "/api/v1/me",
    responses(
        (status = 200, description = "Current profile", body = crate::ApiResponse<UserProfile>),
        (status = 401, description = "Missing or expired token", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Account"
)]
pub async fn get_me(State(state): State<AppState>, user: AuthUser) -> ApiResult<UserProfile> {
    let profile = state.services.users.profile(user.user_id).await?;
    Ok(ok(profile))
}

#[utoipa::path(
    put,
    path = "/api/v1/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = crate::ApiResponse<UserProfile>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or expired token", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Account"
)]
pub async fn update_me(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> ApiResult<UserProfile> {
    let profile = state
        .services
        .users
        .update_profile(user.user_id, payload)
        .await?;
    Ok(ok(profile))
}

/// Session countdown; clients show a warning once `state` is `WARNING`
#[utoipa::path(
    get,
    path = "/api/v1/session",
    responses(
        (status = 200, description = "Session status", body = crate::ApiResponse<SessionStatus>),
        (status = 401, description = "Missing or expired token", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Account"
)]
pub async fn get_session(State(state): State<AppState>, user: AuthUser) -> ApiResult<SessionStatus> {
    let status = state.auth.session_timer(&user).status(Utc::now());
    Ok(ok(status))
}
