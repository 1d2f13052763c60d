use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{
        order::{self, OrderStatus},
        promoter, seller, steward, ApplicationStatus,
    },
    errors::ServiceError,
};

/// Moderator decision on a seller, promoter or steward application
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct ReviewApplicationRequest {
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    /// Connect account to pay out to; applied on approval only
    #[validate(length(min = 1, max = 255))]
    pub stripe_account_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApprovalCounts {
    pub sellers: u64,
    pub promoters: u64,
    pub stewards: u64,
    pub total: u64,
}

/// Applications waiting for a moderator, oldest first
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApprovalsOverview {
    pub counts: ApprovalCounts,
    pub sellers: Vec<seller::Model>,
    pub promoters: Vec<promoter::Model>,
    pub stewards: Vec<steward::Model>,
    pub pending_payment_orders: u64,
}

#[derive(Clone)]
pub struct AdminService {
    db_pool: Arc<DbPool>,
}

impl AdminService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn approvals(&self) -> Result<ApprovalsOverview, ServiceError> {
        let db = &*self.db_pool;

        let sellers = seller::Entity::find()
            .filter(seller::Column::Status.eq(ApplicationStatus::Pending))
            .order_by_asc(seller::Column::CreatedAt)
            .all(db)
            .await?;
        let promoters = promoter::Entity::find()
            .filter(promoter::Column::Status.eq(ApplicationStatus::Pending))
            .order_by_asc(promoter::Column::CreatedAt)
            .all(db)
            .await?;
        let stewards = steward::Entity::find()
            .filter(steward::Column::Status.eq(ApplicationStatus::Pending))
            .order_by_asc(steward::Column::CreatedAt)
            .all(db)
            .await?;
        let pending_payment_orders = order::Entity::find()
            .filter(order::Column::Status.eq(OrderStatus::Pending))
            .count(db)
            .await?;

        let counts = ApprovalCounts {
            sellers: sellers.len() as u64,
            promoters: promoters.len() as u64,
            stewards: stewards.len() as u64,
            total: (sellers.len() + promoters.len() + stewards.len()) as u64,
        };

        Ok(ApprovalsOverview {
            counts,
            sellers,
            promoters,
            stewards,
            pending_payment_orders,
        })
    }
}
