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
    entities::{seller, ApplicationStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        admin::ReviewApplicationRequest, chapters::ensure_active_chapter, paginate, Pagination,
    },
    PaginatedResponse,
};

const KIND: &str = "Seller";

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SellerApplicationRequest {
    #[validate(length(min = 1, max = 120))]
    pub business_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 60))]
    pub vendor_license_number: Option<String>,
    pub sponsoring_chapter_id: Option<Uuid>,
    #[validate(length(min = 3, max = 10))]
    pub ship_from_postal_code: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub social_links: Option<serde_json::Value>,
}

#[derive(Clone)]
pub struct SellerService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl SellerService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<seller::Model>, ServiceError> {
        Ok(seller::Entity::find()
            .filter(seller::Column::UserId.eq(user_id))
            .one(&*self.db_pool)
            .await?)
    }

    /// Submits an application; a rejected one may be resubmitted.
    #[instrument(skip(self, request))]
    pub async fn apply(
        &self,
        user_id: Uuid,
        request: SellerApplicationRequest,
    ) -> Result<seller::Model, ServiceError> {
        request.validate()?;
        if let Some(chapter_id) = request.sponsoring_chapter_id {
            ensure_active_chapter(&self.db_pool, chapter_id).await?;
        }

        let now = Utc::now();
        let saved = match self.find_by_user(user_id).await? {
            Some(existing) => {
                existing.status.ensure_can_reapply(KIND)?;
                let mut active: seller::ActiveModel = existing.into();
                active.business_name = Set(request.business_name);
                active.email = Set(request.email);
                active.vendor_license_number = Set(request.vendor_license_number);
                active.sponsoring_chapter_id = Set(request.sponsoring_chapter_id);
                active.ship_from_postal_code = Set(request.ship_from_postal_code);
                active.social_links = Set(request.social_links);
                active.status = Set(ApplicationStatus::Pending);
                active.review_notes = Set(None);
                active.reviewed_at = Set(None);
                active.updated_at = Set(now);
                active.update(&*self.db_pool).await?
            }
            None => {
                seller::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    business_name: Set(request.business_name),
                    email: Set(request.email),
                    vendor_license_number: Set(request.vendor_license_number),
                    sponsoring_chapter_id: Set(request.sponsoring_chapter_id),
                    ship_from_postal_code: Set(request.ship_from_postal_code),
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

        info!(seller_id = %saved.id, "seller application submitted");
        self.event_sender
            .send_or_log(Event::SellerApplied(saved.id))
            .await;
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn get_mine(&self, user_id: Uuid) -> Result<seller::Model, ServiceError> {
        self.find_by_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("No seller application found".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, seller_id: Uuid) -> Result<seller::Model, ServiceError> {
        seller::Entity::find_by_id(seller_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Seller {} not found", seller_id)))
    }

    /// Public storefront; unapproved sellers are invisible.
    pub async fn get_public(&self, seller_id: Uuid) -> Result<seller::Model, ServiceError> {
        let seller = self.get(seller_id).await?;
        if seller.status != ApplicationStatus::Approved {
            return Err(ServiceError::NotFound(format!("Seller {} not found", seller_id)));
        }
        Ok(seller)
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        status: Option<ApplicationStatus>,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<seller::Model>, ServiceError> {
        let mut query = seller::Entity::find().order_by_asc(seller::Column::CreatedAt);
        if let Some(status) = status {
            query = query.filter(seller::Column::Status.eq(status));
        }
        paginate(&self.db_pool, query, pagination).await
    }

    #[instrument(skip(self, review))]
    pub async fn approve(
        &self,
        seller_id: Uuid,
        review: ReviewApplicationRequest,
    ) -> Result<seller::Model, ServiceError> {
        review.validate()?;
        let existing = self.get(seller_id).await?;
        existing.status.ensure_reviewable(KIND)?;

        let mut active: seller::ActiveModel = existing.into();
        active.status = Set(ApplicationStatus::Approved);
        active.review_notes = Set(review.notes);
        if let Some(account) = review.stripe_account_id {
            active.stripe_account_id = Set(Some(account));
        }
        active.reviewed_at = Set(Some(Utc::now()));
        active.updated_at = Set(Utc::now());
        let approved = active.update(&*self.db_pool).await?;

        self.event_sender
            .send_or_log(Event::SellerApproved(seller_id))
            .await;
        Ok(approved)
    }

    #[instrument(skip(self, review))]
    pub async fn reject(
        &self,
        seller_id: Uuid,
        review: ReviewApplicationRequest,
    ) -> Result<seller::Model, ServiceError> {
        review.validate()?;
        let existing = self.get(seller_id).await?;
        existing.status.ensure_reviewable(KIND)?;

        let mut active: seller::ActiveModel = existing.into();
        active.status = Set(ApplicationStatus::Rejected);
        active.review_notes = Set(review.notes);
        active.reviewed_at = Set(Some(Utc::now()));
        active.updated_at = Set(Utc::now());
        let rejected = active.update(&*self.db_pool).await?;

        self.event_sender
            .send_or_log(Event::SellerRejected(seller_id))
            .await;
        Ok(rejected)
    }

    /// The caller's seller record, which must be approved.
    pub async fn ensure_approved(&self, user_id: Uuid) -> Result<seller::Model, ServiceError> {
        let seller = self.find_by_user(user_id).await?.ok_or_else(|| {
            ServiceError::Forbidden("You need an approved seller account".to_string())
        })?;
        if seller.status != ApplicationStatus::Approved {
            return Err(ServiceError::Forbidden(
                "Seller application has not been approved".to_string(),
            ));
        }
        Ok(seller)
    }
}
