use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::chapter::{self, ChapterStatus, ChapterType},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{paginate, Pagination},
    PaginatedResponse,
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateChapterRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub chapter_type: ChapterType,
    #[validate(length(min = 1, max = 80))]
    pub province: String,
    #[validate(length(min = 1, max = 80))]
    pub city: String,
    #[validate(length(min = 2, max = 40))]
    pub state: String,
    #[validate(email)]
    pub contact_email: Option<String>,
    pub stripe_account_id: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub social_links: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateChapterRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    pub chapter_type: Option<ChapterType>,
    #[validate(length(min = 1, max = 80))]
    pub province: Option<String>,
    #[validate(length(min = 1, max = 80))]
    pub city: Option<String>,
    #[validate(length(min = 2, max = 40))]
    pub state: Option<String>,
    pub status: Option<ChapterStatus>,
    #[validate(email)]
    pub contact_email: Option<String>,
    pub stripe_account_id: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub social_links: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ChapterFilter {
    pub status: Option<ChapterStatus>,
    pub chapter_type: Option<ChapterType>,
    pub state: Option<String>,
}

/// Sponsoring chapters must exist and be active.
pub(crate) async fn ensure_active_chapter(
    db: &DatabaseConnection,
    chapter_id: Uuid,
) -> Result<chapter::Model, ServiceError> {
    let chapter = chapter::Entity::find_by_id(chapter_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Chapter {} not found", chapter_id)))?;
    if chapter.status != ChapterStatus::Active {
        return Err(ServiceError::ValidationError(format!(
            "Chapter {} is not active",
            chapter.name
        )));
    }
    Ok(chapter)
}

#[derive(Clone)]
pub struct ChapterService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl ChapterService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: ChapterFilter,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<chapter::Model>, ServiceError> {
        let mut query = chapter::Entity::find().order_by_asc(chapter::Column::Name);
        if let Some(status) = filter.status {
            query = query.filter(chapter::Column::Status.eq(status));
        }
        if let Some(chapter_type) = filter.chapter_type {
            query = query.filter(chapter::Column::ChapterType.eq(chapter_type));
        }
        if let Some(state) = filter.state.filter(|s| !s.trim().is_empty()) {
            query = query.filter(chapter::Column::State.eq(state.trim()));
        }
        paginate(&self.db_pool, query, pagination).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, chapter_id: Uuid) -> Result<chapter::Model, ServiceError> {
        chapter::Entity::find_by_id(chapter_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Chapter {} not found", chapter_id)))
    }

    pub async fn ensure_active(&self, chapter_id: Uuid) -> Result<chapter::Model, ServiceError> {
        ensure_active_chapter(&self.db_pool, chapter_id).await
    }

    async fn ensure_name_free(&self, name: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
        let mut query = chapter::Entity::find().filter(chapter::Column::Name.eq(name));
        if let Some(id) = except {
            query = query.filter(chapter::Column::Id.ne(id));
        }
        if query.one(&*self.db_pool).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "A chapter named {} already exists",
                name
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(&self, request: CreateChapterRequest) -> Result<chapter::Model, ServiceError> {
        request.validate()?;
        let name = request.name.trim().to_string();
        self.ensure_name_free(&name, None).await?;

        let now = Utc::now();
        let chapter = chapter::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            chapter_type: Set(request.chapter_type),
            province: Set(request.province),
            city: Set(request.city),
            state: Set(request.state),
            status: Set(ChapterStatus::Active),
            stripe_account_id: Set(request.stripe_account_id),
            contact_email: Set(request.contact_email),
            social_links: Set(request.social_links),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(chapter_id = %chapter.id, "chapter created");
        self.event_sender
            .send_or_log(Event::ChapterCreated(chapter.id))
            .await;
        Ok(chapter)
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        chapter_id: Uuid,
        request: UpdateChapterRequest,
    ) -> Result<chapter::Model, ServiceError> {
        request.validate()?;
        let existing = self.get(chapter_id).await?;

        let mut active: chapter::ActiveModel = existing.into();
        if let Some(name) = request.name {
            let name = name.trim().to_string();
            self.ensure_name_free(&name, Some(chapter_id)).await?;
            active.name = Set(name);
        }
        if let Some(chapter_type) = request.chapter_type {
            active.chapter_type = Set(chapter_type);
        }
        if let Some(province) = request.province {
            active.province = Set(province);
        }
        if let Some(city) = request.city {
            active.city = Set(city);
        }
        if let Some(state) = request.state {
            active.state = Set(state);
        }
        if let Some(status) = request.status {
            active.status = Set(status);
        }
        if let Some(email) = request.contact_email {
            active.contact_email = Set(Some(email));
        }
        if let Some(account) = request.stripe_account_id {
            active.stripe_account_id = Set(Some(account));
        }
        if let Some(links) = request.social_links {
            active.social_links = Set(Some(links));
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db_pool).await?;
        self.event_sender
            .send_or_log(Event::ChapterUpdated(chapter_id))
            .await;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn deactivate(&self, chapter_id: Uuid) -> Result<chapter::Model, ServiceError> {
        let existing = self.get(chapter_id).await?;
        if existing.status == ChapterStatus::Inactive {
            return Ok(existing);
        }

        let mut active: chapter::ActiveModel = existing.into();
        active.status = Set(ChapterStatus::Inactive);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db_pool).await?;

        info!(%chapter_id, "chapter deactivated");
        self.event_sender
            .send_or_log(Event::ChapterDeactivated(chapter_id))
            .await;
        Ok(updated)
    }
}
