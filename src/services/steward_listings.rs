use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::steward_listing::{self, ListingStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        access::{Purchasable, Viewer},
        paginate,
        stewards::StewardService,
        Pagination,
    },
    PaginatedResponse,
};

fn default_branded() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateListingRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 5000))]
    #[serde(default)]
    pub description: String,
    #[validate(url)]
    pub image_url: Option<String>,
    /// Fixed shipping charge; 0 means quote at claim time
    #[validate(range(min = 0))]
    #[serde(default)]
    pub shipping_cents: i64,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub chapter_donation_cents: i64,
    #[validate(range(min = 1))]
    pub weight_oz: Option<i32>,
    #[serde(default = "default_branded")]
    pub is_kappa_branded: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateListingRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(url)]
    pub image_url: Option<String>,
    #[validate(range(min = 0))]
    pub shipping_cents: Option<i64>,
    #[validate(range(min = 0))]
    pub chapter_donation_cents: Option<i64>,
    #[validate(range(min = 1))]
    pub weight_oz: Option<i32>,
    pub is_kappa_branded: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ListingFilter {
    pub chapter_id: Option<Uuid>,
    pub search: Option<String>,
}

/// Moves an ACTIVE listing to RESERVED; fails when someone else got there first.
pub(crate) async fn reserve<C: ConnectionTrait>(db: &C, listing_id: Uuid) -> Result<(), ServiceError> {
    let result = steward_listing::Entity::update_many()
        .col_expr(
            steward_listing::Column::Status,
            Expr::value(ListingStatus::Reserved),
        )
        .col_expr(steward_listing::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(steward_listing::Column::Id.eq(listing_id))
        .filter(steward_listing::Column::Status.eq(ListingStatus::Active))
        .exec(db)
        .await?;

    if result.rows_affected != 1 {
        return Err(ServiceError::Conflict(
            "Listing is no longer available".to_string(),
        ));
    }
    Ok(())
}

/// Returns a RESERVED listing to ACTIVE. No-op for any other state.
pub(crate) async fn release<C: ConnectionTrait>(db: &C, listing_id: Uuid) -> Result<bool, ServiceError> {
    let result = steward_listing::Entity::update_many()
        .col_expr(
            steward_listing::Column::Status,
            Expr::value(ListingStatus::Active),
        )
        .col_expr(steward_listing::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(steward_listing::Column::Id.eq(listing_id))
        .filter(steward_listing::Column::Status.eq(ListingStatus::Reserved))
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

/// RESERVED → CLAIMED with claimant and time.
pub(crate) async fn mark_claimed<C: ConnectionTrait>(
    db: &C,
    listing_id: Uuid,
    claimed_by: Uuid,
) -> Result<bool, ServiceError> {
    let now = Utc::now();
    let result = steward_listing::Entity::update_many()
        .col_expr(
            steward_listing::Column::Status,
            Expr::value(ListingStatus::Claimed),
        )
        .col_expr(steward_listing::Column::ClaimedBy, Expr::value(claimed_by))
        .col_expr(steward_listing::Column::ClaimedAt, Expr::value(now))
        .col_expr(steward_listing::Column::UpdatedAt, Expr::value(now))
        .filter(steward_listing::Column::Id.eq(listing_id))
        .filter(steward_listing::Column::Status.eq(ListingStatus::Reserved))
        .exec(db)
        .await?;

    if result.rows_affected != 1 {
        warn!(%listing_id, "paid claim for a listing that was not reserved");
    }
    Ok(result.rows_affected == 1)
}

/// Legacy items listed by approved stewards
#[derive(Clone)]
pub struct StewardListingService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    stewards: StewardService,
}

impl StewardListingService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let stewards = StewardService::new(db_pool.clone(), event_sender.clone());
        Self {
            db_pool,
            event_sender,
            stewards,
        }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, listing_id: Uuid) -> Result<steward_listing::Model, ServiceError> {
        steward_listing::Entity::find_by_id(listing_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Listing {} not found", listing_id)))
    }

    async fn get_owned_active(
        &self,
        user_id: Uuid,
        listing_id: Uuid,
    ) -> Result<steward_listing::Model, ServiceError> {
        let steward = self.stewards.ensure_approved(user_id).await?;
        let listing = self.get(listing_id).await?;
        if listing.steward_id != steward.id {
            return Err(ServiceError::Forbidden(
                "Listing belongs to another steward".to_string(),
            ));
        }
        if listing.status != ListingStatus::Active {
            return Err(ServiceError::InvalidStatus(format!(
                "Listing is {:?}; only active listings can be changed",
                listing.status
            )));
        }
        Ok(listing)
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(
        &self,
        user_id: Uuid,
        request: CreateListingRequest,
    ) -> Result<steward_listing::Model, ServiceError> {
        request.validate()?;
        let steward = self.stewards.ensure_approved(user_id).await?;

        let now = Utc::now();
        let listing = steward_listing::ActiveModel {
            id: Set(Uuid::new_v4()),
            steward_id: Set(steward.id),
            sponsoring_chapter_id: Set(steward.sponsoring_chapter_id),
            name: Set(request.name.trim().to_string()),
            description: Set(request.description),
            image_url: Set(request.image_url),
            shipping_cents: Set(request.shipping_cents),
            chapter_donation_cents: Set(request.chapter_donation_cents),
            weight_oz: Set(request.weight_oz),
            is_kappa_branded: Set(request.is_kappa_branded),
            status: Set(ListingStatus::Active),
            claimed_by: Set(None),
            claimed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(listing_id = %listing.id, steward_id = %steward.id, "steward listing created");
        self.event_sender
            .send_or_log(Event::ListingCreated(listing.id))
            .await;
        Ok(listing)
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        user_id: Uuid,
        listing_id: Uuid,
        request: UpdateListingRequest,
    ) -> Result<steward_listing::Model, ServiceError> {
        request.validate()?;
        let existing = self.get_owned_active(user_id, listing_id).await?;

        let mut active: steward_listing::ActiveModel = existing.into();
        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(description) = request.description {
            active.description = Set(description);
        }
        if let Some(image_url) = request.image_url {
            active.image_url = Set(Some(image_url));
        }
        if let Some(shipping) = request.shipping_cents {
            active.shipping_cents = Set(shipping);
        }
        if let Some(donation) = request.chapter_donation_cents {
            active.chapter_donation_cents = Set(donation);
        }
        if let Some(weight) = request.weight_oz {
            active.weight_oz = Set(Some(weight));
        }
        if let Some(branded) = request.is_kappa_branded {
            active.is_kappa_branded = Set(branded);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db_pool).await?;
        self.event_sender
            .send_or_log(Event::ListingUpdated(listing_id))
            .await;
        Ok(updated)
    }

    /// ACTIVE → REMOVED; reserved or claimed listings stay put.
    #[instrument(skip(self))]
    pub async fn remove(
        &self,
        user_id: Uuid,
        listing_id: Uuid,
    ) -> Result<steward_listing::Model, ServiceError> {
        let existing = self.get_owned_active(user_id, listing_id).await?;

        let mut active: steward_listing::ActiveModel = existing.into();
        active.status = Set(ListingStatus::Removed);
        active.updated_at = Set(Utc::now());
        let removed = active.update(&*self.db_pool).await?;

        self.event_sender
            .send_or_log(Event::ListingRemoved(listing_id))
            .await;
        Ok(removed)
    }

    #[instrument(skip(self, viewer))]
    pub async fn list_public(
        &self,
        filter: ListingFilter,
        viewer: &Viewer,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<Purchasable<steward_listing::Model>>, ServiceError> {
        let mut query = steward_listing::Entity::find()
            .filter(steward_listing::Column::Status.eq(ListingStatus::Active))
            .order_by_desc(steward_listing::Column::CreatedAt)
            .order_by_asc(steward_listing::Column::Id);

        if let Some(chapter_id) = filter.chapter_id {
            query = query.filter(steward_listing::Column::SponsoringChapterId.eq(chapter_id));
        }
        if let Some(search) = filter.search.filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", search.trim());
            query = query.filter(
                Condition::any()
                    .add(steward_listing::Column::Name.like(pattern.as_str()))
                    .add(steward_listing::Column::Description.like(pattern.as_str())),
            );
        }

        let page = paginate(&self.db_pool, query, pagination).await?;
        Ok(page.map(|l| {
            let branded = l.is_kappa_branded;
            Purchasable::new(l, branded, viewer)
        }))
    }

    /// Removed listings are hidden; reserved and claimed ones show their status.
    pub async fn get_public(
        &self,
        listing_id: Uuid,
        viewer: &Viewer,
    ) -> Result<Purchasable<steward_listing::Model>, ServiceError> {
        let listing = self.get(listing_id).await?;
        if listing.status == ListingStatus::Removed {
            return Err(ServiceError::NotFound(format!(
                "Listing {} not found",
                listing_id
            )));
        }
        let branded = listing.is_kappa_branded;
        Ok(Purchasable::new(listing, branded, viewer))
    }

    pub async fn list_mine(
        &self,
        user_id: Uuid,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<steward_listing::Model>, ServiceError> {
        let steward = self.stewards.ensure_approved(user_id).await?;
        let query = steward_listing::Entity::find()
            .filter(steward_listing::Column::StewardId.eq(steward.id))
            .order_by_desc(steward_listing::Column::CreatedAt);
        paginate(&self.db_pool, query, pagination).await
    }
}
