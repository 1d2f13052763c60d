use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::event::{self, EventStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        access::{Purchasable, Viewer},
        chapters::ensure_active_chapter,
        paginate,
        promoters::PromoterService,
        Pagination,
    },
    PaginatedResponse,
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 10000))]
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, max = 200))]
    pub location: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[validate(range(min = 0))]
    pub ticket_price_cents: i64,
    #[validate(range(min = 1))]
    pub capacity: Option<i32>,
    #[serde(default)]
    pub is_kappa_branded: bool,
    #[validate(url)]
    pub image_url: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub features: Option<serde_json::Value>,
    pub sponsoring_chapter_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateEventRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 10000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub location: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    #[validate(range(min = 0))]
    pub ticket_price_cents: Option<i64>,
    #[validate(range(min = 1))]
    pub capacity: Option<i32>,
    pub is_kappa_branded: Option<bool>,
    #[validate(url)]
    pub image_url: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub features: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct EventFilter {
    pub city: Option<String>,
    pub state: Option<String>,
    pub chapter_id: Option<Uuid>,
    /// Include events that have already ended
    #[serde(default)]
    pub include_past: bool,
}

fn ensure_schedule(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Result<(), ServiceError> {
    if ends_at < starts_at {
        return Err(ServiceError::ValidationError(
            "Event cannot end before it starts".to_string(),
        ));
    }
    Ok(())
}

/// Ticketed events hosted by approved promoters
#[derive(Clone)]
pub struct TicketedEventService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    promoters: PromoterService,
}

impl TicketedEventService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let promoters = PromoterService::new(db_pool.clone(), event_sender.clone());
        Self {
            db_pool,
            event_sender,
            promoters,
        }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, event_id: Uuid) -> Result<event::Model, ServiceError> {
        event::Entity::find_by_id(event_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Event {} not found", event_id)))
    }

    async fn get_owned(&self, user_id: Uuid, event_id: Uuid) -> Result<event::Model, ServiceError> {
        let promoter = self.promoters.ensure_approved(user_id).await?;
        let event = self.get(event_id).await?;
        if event.promoter_id != promoter.id {
            return Err(ServiceError::Forbidden(
                "Event belongs to another promoter".to_string(),
            ));
        }
        Ok(event)
    }

    #[instrument(skip(self, request), fields(title = %request.title))]
    pub async fn create(
        &self,
        user_id: Uuid,
        request: CreateEventRequest,
    ) -> Result<event::Model, ServiceError> {
        request.validate()?;
        ensure_schedule(request.starts_at, request.ends_at)?;
        let promoter = self.promoters.ensure_approved(user_id).await?;

        let chapter_id = request
            .sponsoring_chapter_id
            .or(promoter.sponsoring_chapter_id);
        if let Some(chapter_id) = chapter_id {
            ensure_active_chapter(&self.db_pool, chapter_id).await?;
        }

        let now = Utc::now();
        let created = event::ActiveModel {
            id: Set(Uuid::new_v4()),
            promoter_id: Set(promoter.id),
            sponsoring_chapter_id: Set(chapter_id),
            title: Set(request.title.trim().to_string()),
            description: Set(request.description),
            location: Set(request.location),
            city: Set(request.city),
            state: Set(request.state),
            starts_at: Set(request.starts_at),
            ends_at: Set(request.ends_at),
            ticket_price_cents: Set(request.ticket_price_cents),
            capacity: Set(request.capacity),
            tickets_sold: Set(0),
            is_kappa_branded: Set(request.is_kappa_branded),
            image_url: Set(request.image_url),
            features: Set(request.features),
            status: Set(EventStatus::Active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(event_id = %created.id, promoter_id = %promoter.id, "event created");
        self.event_sender
            .send_or_log(Event::EventCreated(created.id))
            .await;
        Ok(created)
    }

    /// Only active events can be edited; capacity cannot drop below tickets sold.
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        request: UpdateEventRequest,
    ) -> Result<event::Model, ServiceError> {
        request.validate()?;
        let existing = self.get_owned(user_id, event_id).await?;
        if existing.status != EventStatus::Active {
            return Err(ServiceError::InvalidStatus(format!(
                "Event is {:?} and can no longer be edited",
                existing.status
            )));
        }

        let starts_at = request.starts_at.unwrap_or(existing.starts_at);
        let ends_at = request.ends_at.unwrap_or(existing.ends_at);
        ensure_schedule(starts_at, ends_at)?;
        if let Some(capacity) = request.capacity {
            if capacity < existing.tickets_sold {
                return Err(ServiceError::ValidationError(format!(
                    "Capacity cannot be lower than the {} tickets already sold",
                    existing.tickets_sold
                )));
            }
        }

        let mut active: event::ActiveModel = existing.into();
        if let Some(title) = request.title {
            active.title = Set(title.trim().to_string());
        }
        if let Some(description) = request.description {
            active.description = Set(description);
        }
        if let Some(location) = request.location {
            active.location = Set(location);
        }
        if let Some(city) = request.city {
            active.city = Set(Some(city));
        }
        if let Some(state) = request.state {
            active.state = Set(Some(state));
        }
        active.starts_at = Set(starts_at);
        active.ends_at = Set(ends_at);
        if let Some(price) = request.ticket_price_cents {
            active.ticket_price_cents = Set(price);
        }
        if let Some(capacity) = request.capacity {
            active.capacity = Set(Some(capacity));
        }
        if let Some(branded) = request.is_kappa_branded {
            active.is_kappa_branded = Set(branded);
        }
        if let Some(image_url) = request.image_url {
            active.image_url = Set(Some(image_url));
        }
        if let Some(features) = request.features {
            active.features = Set(Some(features));
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db_pool).await?;
        self.event_sender
            .send_or_log(Event::EventUpdated(event_id))
            .await;
        Ok(updated)
    }

    async fn transition(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        next: EventStatus,
    ) -> Result<event::Model, ServiceError> {
        let existing = self.get_owned(user_id, event_id).await?;
        let status = existing.status.transition_to(next)?;

        let mut active: event::ActiveModel = existing.into();
        active.status = Set(status);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db_pool).await?)
    }

    #[instrument(skip(self))]
    pub async fn close(&self, user_id: Uuid, event_id: Uuid) -> Result<event::Model, ServiceError> {
        let closed = self.transition(user_id, event_id, EventStatus::Closed).await?;
        self.event_sender
            .send_or_log(Event::EventClosed(event_id))
            .await;
        Ok(closed)
    }

    #[instrument(skip(self))]
    pub async fn cancel(&self, user_id: Uuid, event_id: Uuid) -> Result<event::Model, ServiceError> {
        let cancelled = self
            .transition(user_id, event_id, EventStatus::Cancelled)
            .await?;
        info!(%event_id, "event cancelled");
        self.event_sender
            .send_or_log(Event::EventCancelled(event_id))
            .await;
        Ok(cancelled)
    }

    /// Active events, upcoming only unless `include_past` is set
    #[instrument(skip(self, viewer))]
    pub async fn list_public(
        &self,
        filter: EventFilter,
        viewer: &Viewer,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<Purchasable<event::Model>>, ServiceError> {
        let mut query = event::Entity::find()
            .filter(event::Column::Status.eq(EventStatus::Active))
            .order_by_asc(event::Column::StartsAt)
            .order_by_asc(event::Column::Id);

        if !filter.include_past {
            query = query.filter(event::Column::EndsAt.gt(Utc::now()));
        }
        if let Some(city) = filter.city.filter(|c| !c.trim().is_empty()) {
            query = query.filter(event::Column::City.eq(city.trim()));
        }
        if let Some(state) = filter.state.filter(|s| !s.trim().is_empty()) {
            query = query.filter(event::Column::State.eq(state.trim()));
        }
        if let Some(chapter_id) = filter.chapter_id {
            query = query.filter(event::Column::SponsoringChapterId.eq(chapter_id));
        }

        let page = paginate(&self.db_pool, query, pagination).await?;
        Ok(page.map(|e| {
            let branded = e.is_kappa_branded;
            Purchasable::new(e, branded, viewer)
        }))
    }

    /// Event detail page; closed and cancelled events stay visible.
    pub async fn get_public(
        &self,
        event_id: Uuid,
        viewer: &Viewer,
    ) -> Result<Purchasable<event::Model>, ServiceError> {
        let event = self.get(event_id).await?;
        let branded = event.is_kappa_branded;
        Ok(Purchasable::new(event, branded, viewer))
    }

    pub async fn list_mine(
        &self,
        user_id: Uuid,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<event::Model>, ServiceError> {
        let promoter = self.promoters.ensure_approved(user_id).await?;
        let query = event::Entity::find()
            .filter(event::Column::PromoterId.eq(promoter.id))
            .order_by_desc(event::Column::StartsAt);
        paginate(&self.db_pool, query, pagination).await
    }
}
