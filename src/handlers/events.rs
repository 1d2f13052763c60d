use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::{
    auth::{AuthRouterExt, AuthUser, MaybeAuthUser},
    entities::event,
    handlers::common::{created, ok, CreatedResult},
    services::{
        access::{Purchasable, Viewer},
        ticketed_events::{CreateEventRequest, EventFilter, UpdateEventRequest},
    },
    ApiResult, AppState, ListQuery, PaginatedResponse,
};

pub fn router() -> Router<AppState> {
    let protected = Router::new()
        .route("/events", post(create_event))
        .route("/events/:id", put(update_event))
        .route("/events/:id/close", post(close_event))
        .route("/events/:id/cancel", post(cancel_event))
        .with_auth();

    let public = Router::new()
        .route("/events", get(list_events))
        .route("/events/:id", get(get_event))
        .with_optional_auth();

    public.merge(protected)
}

/// Active events, upcoming only unless `include_past=true`
#[utoipa::path(
    get,
    path = "/api/v1/events",
    params(ListQuery, EventFilter),
    responses(
        (status = 200, description = "Events", body = crate::ApiResponse<PaginatedResponse<Purchasable<event::Model>>>)
    ),
    tag = "Events"
)]
pub async fn list_events(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Query(query): Query<ListQuery>,
    Query(filter): Query<EventFilter>,
) -> ApiResult<PaginatedResponse<Purchasable<event::Model>>> {
    let viewer = Viewer::from(user.as_ref());
    let page = state
        .services
        .events
        .list_public(filter, &viewer, query.pagination())
        .await?;
    Ok(ok(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/events/{id}",
    params(("id" = Uuid, Path, description = "Event id")),
    responses(
        (status = 200, description = "Event", body = crate::ApiResponse<Purchasable<event::Model>>),
        (status = 404, description = "Unknown event", body = crate::errors::ErrorResponse)
    ),
    tag = "Events"
)]
pub async fn get_event(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Purchasable<event::Model>> {
    let viewer = Viewer::from(user.as_ref());
    Ok(ok(state.services.events.get_public(id, &viewer).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/events",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = crate::ApiResponse<event::Model>),
        (status = 400, description = "Invalid payload or schedule", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not an approved promoter", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Events"
)]
pub async fn create_event(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateEventRequest>,
) -> CreatedResult<event::Model> {
    let event = state.services.events.create(user.user_id, payload).await?;
    Ok(created(event))
}

#[utoipa::path(
    put,
    path = "/api/v1/events/{id}",
    params(("id" = Uuid, Path, description = "Event id")),
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Event updated", body = crate::ApiResponse<event::Model>),
        (status = 403, description = "Not the hosting promoter", body = crate::errors::ErrorResponse),
        (status = 409, description = "Event is closed or cancelled", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Events"
)]
pub async fn update_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEventRequest>,
) -> ApiResult<event::Model> {
    let event = state
        .services
        .events
        .update(user.user_id, id, payload)
        .await?;
    Ok(ok(event))
}

#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/close",
    params(("id" = Uuid, Path, description = "Event id")),
    responses(
        (status = 200, description = "Ticket sales closed", body = crate::ApiResponse<event::Model>),
        (status = 409, description = "Event is not active", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Events"
)]
pub async fn close_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<event::Model> {
    Ok(ok(state.services.events.close(user.user_id, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/cancel",
    params(("id" = Uuid, Path, description = "Event id")),
    responses(
        (status = 200, description = "Event cancelled", body = crate::ApiResponse<event::Model>),
        (status = 409, description = "Event is not active", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Events"
)]
pub async fn cancel_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<event::Model> {
    Ok(ok(state.services.events.cancel(user.user_id, id).await?))
}
