use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{promoter, ApplicationStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        admin::ReviewApplicationRequest, chapters::ensure_active_chapter, paginate,
        users::ensure_verified_member, Pagination,
    },
    PaginatedResponse,
};

const KIND: &str = "Promoter";

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct PromoterApplicationRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub sponsoring_chapter_id: Option<Uuid>,
    #[schema(value_type = Option<Object>)]
    pub social_links: Option<serde_json::Value>,
}

/// Event hosts; promoters must be verified members
#[derive(Clone)]
pub struct PromoterService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl PromoterService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<promoter::Model>, ServiceError> {
        Ok(promoter::Entity::find()
            .filter(promoter::Column::UserId.eq(user_id))
            .one(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self, request))]
    pub async fn apply(
        &self,
        user_id: Uuid,
        request: PromoterApplicationRequest,
    ) -> Result<promoter::Model, ServiceError> {
        request.validate()?;
        ensure_verified_member(&self.db_pool, user_id, "apply as a promoter").await?;
        if let Some(chapter_id) = request.sponsoring_chapter_id {
            ensure_active_chapter(&self.db_pool, chapter_id).await?;
        }

        let now = Utc::now();
        let saved = match self.find_by_user(user_id).await? {
            Some(existing) => {
                existing.status.ensure_can_reapply(KIND)?;
                let mut active: promoter::ActiveModel = existing.into();
                active.name = Set(request.name);
                active.email = Set(request.email);
                active.sponsoring_chapter_id = Set(request.sponsoring_chapter_id);
                active.social_links = Set(request.social_links);
                active.status = Set(ApplicationStatus::Pending);
                active.review_notes = Set(None);
                active.reviewed_at = Set(None);
                active.updated_at = Set(now);
                active.update(&*self.db_pool).await?
            }
            None => {
                promoter::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    name: Set(request.name),
                    email: Set(request.email),
                    sponsoring_chapter_id: Set(request.sponsoring_chapter_id),
                    stripe_account_id: Set(None),
                    status: Set(ApplicationStatus::Pending),
                    review_notes: Set(None),
                    reviewed_at: Set(None),
                    social_links: Set(request.social_links),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(&*self.db_pool)
                .await?
            }
        };

        info!(promoter_id = %saved.id, "promoter application submitted");
        self.event_sender
            .send_or_log(Event::PromoterApplied(saved.id))
            .await;
        Ok(saved)
    }

    pub async fn get_mine(&self, user_id: Uuid) -> Result<promoter::Model, ServiceError> {
        self.find_by_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("No promoter application found".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, promoter_id: Uuid) -> Result<promoter::Model, ServiceError> {
        promoter::Entity::find_by_id(promoter_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Promoter {} not found", promoter_id)))
    }

    pub async fn get_public(&self, promoter_id: Uuid) -> Result<promoter::Model, ServiceError> {
        let promoter = self.get(promoter_id).await?;
        if promoter.status != ApplicationStatus::Approved {
            return Err(ServiceError::NotFound(format!(
                "Promoter {} not found",
                promoter_id
            )));
        }
        Ok(promoter)
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        status: Option<ApplicationStatus>,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<promoter::Model>, ServiceError> {
        let mut query = promoter::Entity::find().order_by_asc(promoter::Column::CreatedAt);
        if let Some(status) = status {
            query = query.filter(promoter::Column::Status.eq(status));
        }
        paginate(&self.db_pool, query, pagination).await
    }

    #[instrument(skip(self, review))]
    pub async fn approve(
        &self,
        promoter_id: Uuid,
        review: ReviewApplicationRequest,
    ) -> Result<promoter::Model, ServiceError> {
        review.validate()?;
        let existing = self.get(promoter_id).await?;
        existing.status.ensure_reviewable(KIND)?;

        let now = Utc::now();
        let mut active: promoter::ActiveModel = existing.into();
        active.status = Set(ApplicationStatus::Approved);
        active.review_notes = Set(review.notes);
        if let Some(account) = review.stripe_account_id {
            active.stripe_account_id = Set(Some(account));
        }
        active.reviewed_at = Set(Some(now));
        active.updated_at = Set(now);
        let approved = active.update(&*self.db_pool).await?;

        self.event_sender
            .send_or_log(Event::PromoterApproved(promoter_id))
            .await;
        Ok(approved)
    }

    #[instrument(skip(self, review))]
    pub async fn reject(
        &self,
        promoter_id: Uuid,
        review: ReviewApplicationRequest,
    ) -> Result<promoter::Model, ServiceError> {
        review.validate()?;
        let existing = self.get(promoter_id).await?;
        existing.status.ensure_reviewable(KIND)?;

        let now = Utc::now();
        let mut active: promoter::ActiveModel = existing.into();
        active.status = Set(ApplicationStatus::Rejected);
        active.review_notes = Set(review.notes);
        active.reviewed_at = Set(Some(now));
        active.updated_at = Set(now);
        let rejected = active.update(&*self.db_pool).await?;

        self.event_sender
            .send_or_log(Event::PromoterRejected(promoter_id))
            .await;
        Ok(rejected)
    }

    /// Only approved promoters can create events.
    pub async fn ensure_approved(&self, user_id: Uuid) -> Result<promoter::Model, ServiceError> {
        let promoter = self.find_by_user(user_id).await?.ok_or_else(|| {
            ServiceError::Forbidden("You need an approved promoter account".to_string())
        })?;
        if promoter.status != ApplicationStatus::Approved {
            return Err(ServiceError::Forbidden(
                "Promoter application has not been approved".to_string(),
            ));
        }
        Ok(promoter)
    }
}
