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
    entities::{steward, ApplicationStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        admin::ReviewApplicationRequest, chapters::ensure_active_chapter, paginate,
        users::ensure_verified_member, Pagination,
    },
    PaginatedResponse,
};

const KIND: &str = "Steward";

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct StewardApplicationRequest {
    pub sponsoring_chapter_id: Uuid,
    #[validate(length(min = 3, max = 10))]
    pub ship_from_postal_code: String,
}

/// Members who give away legacy items on behalf of a sponsoring chapter
#[derive(Clone)]
pub struct StewardService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl StewardService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<steward::Model>, ServiceError> {
        Ok(steward::Entity::find()
            .filter(steward::Column::UserId.eq(user_id))
            .one(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self, request), fields(chapter_id = %request.sponsoring_chapter_id))]
    pub async fn apply(
        &self,
        user_id: Uuid,
        request: StewardApplicationRequest,
    ) -> Result<steward::Model, ServiceError> {
        request.validate()?;
        ensure_verified_member(&self.db_pool, user_id, "apply as a steward").await?;
        ensure_active_chapter(&self.db_pool, request.sponsoring_chapter_id).await?;

        let now = Utc::now();
        let postal_code = request.ship_from_postal_code.trim().to_string();
        let saved = match self.find_by_user(user_id).await? {
            Some(existing) => {
                existing.status.ensure_can_reapply(KIND)?;
                let mut active: steward::ActiveModel = existing.into();
                active.sponsoring_chapter_id = Set(request.sponsoring_chapter_id);
                active.ship_from_postal_code = Set(postal_code);
                active.status = Set(ApplicationStatus::Pending);
                active.review_notes = Set(None);
                active.reviewed_at = Set(None);
                active.updated_at = Set(now);
                active.update(&*self.db_pool).await?
            }
            None => {
                steward::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    sponsoring_chapter_id: Set(request.sponsoring_chapter_id),
                    ship_from_postal_code: Set(postal_code),
                    status: Set(ApplicationStatus::Pending),
                    review_notes: Set(None),
                    reviewed_at: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(&*self.db_pool)
                .await?
            }
        };

        info!(steward_id = %saved.id, "steward application submitted");
        self.event_sender
            .send_or_log(Event::StewardApplied(saved.id))
            .await;
        Ok(saved)
    }

    pub async fn get_mine(&self, user_id: Uuid) -> Result<steward::Model, ServiceError> {
        self.find_by_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("No steward application found".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, steward_id: Uuid) -> Result<steward::Model, ServiceError> {
        steward::Entity::find_by_id(steward_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Steward {} not found", steward_id)))
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        status: Option<ApplicationStatus>,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<steward::Model>, ServiceError> {
        let mut query = steward::Entity::find().order_by_asc(steward::Column::CreatedAt);
        if let Some(status) = status {
            query = query.filter(steward::Column::Status.eq(status));
        }
        paginate(&self.db_pool, query, pagination).await
    }

    /// Stewards carry no Connect account, so `stripe_account_id` on the review is ignored.
    #[instrument(skip(self, review))]
    pub async fn approve(
        &self,
        steward_id: Uuid,
        review: ReviewApplicationRequest,
    ) -> Result<steward::Model, ServiceError> {
        review.validate()?;
        let existing = self.get(steward_id).await?;
        existing.status.ensure_reviewable(KIND)?;

        let now = Utc::now();
        let mut active: steward::ActiveModel = existing.into();
        active.status = Set(ApplicationStatus::Approved);
        active.review_notes = Set(review.notes);
        active.reviewed_at = Set(Some(now));
        active.updated_at = Set(now);
        let approved = active.update(&*self.db_pool).await?;

        self.event_sender
            .send_or_log(Event::StewardApproved(steward_id))
            .await;
        Ok(approved)
    }

    #[instrument(skip(self, review))]
    pub async fn reject(
        &self,
        steward_id: Uuid,
        review: ReviewApplicationRequest,
    ) -> Result<steward::Model, ServiceError> {
        review.validate()?;
        let existing = self.get(steward_id).await?;
        existing.status.ensure_reviewable(KIND)?;

        let now = Utc::now();
        let mut active: steward::ActiveModel = existing.into();
        active.status = Set(ApplicationStatus::Rejected);
        active.review_notes = Set(review.notes);
        active.reviewed_at = Set(Some(now));
        active.updated_at = Set(now);
        let rejected = active.update(&*self.db_pool).await?;

        self.event_sender
            .send_or_log(Event::StewardRejected(steward_id))
            .await;
        Ok(rejected)
    }

    pub async fn ensure_approved(&self, user_id: Uuid) -> Result<steward::Model, ServiceError> {
        let steward = self.find_by_user(user_id).await?.ok_or_else(|| {
            ServiceError::Forbidden("You need an approved steward account".to_string())
        })?;
        if steward.status != ApplicationStatus::Approved {
            return Err(ServiceError::Forbidden(
                "Steward application has not been approved".to_string(),
            ));
        }
        Ok(steward)
    }
}
