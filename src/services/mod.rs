use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, Select};

use crate::errors::ServiceError;
use crate::PaginatedResponse;

// Pricing and gating rules
pub mod access;
pub mod fees;

// Accounts and moderation
pub mod admin;
pub mod chapters;
pub mod promoters;
pub mod sellers;
pub mod stewards;
pub mod users;

// Catalog
pub mod products;
pub mod steward_listings;
pub mod ticketed_events;

// Checkout and external providers
pub mod checkout;
pub mod orders;
pub mod payments;
pub mod shipping;

pub const MAX_PAGE_SIZE: u64 = 100;

/// 1-based page selection for list operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
}

impl Pagination {
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, 20)
    }
}

pub(crate) async fn paginate<E>(
    db: &DatabaseConnection,
    select: Select<E>,
    pagination: Pagination,
) -> Result<PaginatedResponse<E::Model>, ServiceError>
where
    E: EntityTrait,
    E::Model: Sync,
{
    let paginator = select.paginate(db, pagination.limit);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(pagination.page - 1).await?;
    Ok(PaginatedResponse::new(
        items,
        total,
        pagination.page,
        pagination.limit,
    ))
}
