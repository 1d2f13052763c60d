use sea_orm::{
    sea_query::Query, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{
        event,
        order::{self, OrderKind, OrderStatus},
        product,
    },
    errors::ServiceError,
    events::EventSender,
    services::{
        paginate, promoters::PromoterService, sellers::SellerService, Pagination,
    },
    PaginatedResponse,
};

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub kind: Option<OrderKind>,
}

impl OrderFilter {
    fn apply(&self, mut query: sea_orm::Select<order::Entity>) -> sea_orm::Select<order::Entity> {
        if let Some(status) = self.status {
            query = query.filter(order::Column::Status.eq(status));
        }
        if let Some(kind) = self.kind {
            query = query.filter(order::Column::Kind.eq(kind));
        }
        query
    }
}

/// Read side of orders; state changes live in the checkout service
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    sellers: SellerService,
    promoters: PromoterService,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            sellers: SellerService::new(db_pool.clone(), event_sender.clone()),
            promoters: PromoterService::new(db_pool.clone(), event_sender),
            db_pool,
        }
    }

    #[instrument(skip(self))]
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: OrderFilter,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<order::Model>, ServiceError> {
        let query = order::Entity::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt);
        paginate(&self.db_pool, filter.apply(query), pagination).await
    }

    /// Buyers see their own orders, admins see every order; anyone else gets 404.
    #[instrument(skip(self))]
    pub async fn get_for_viewer(
        &self,
        user_id: Uuid,
        is_admin: bool,
        order_id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        order::Entity::find_by_id(order_id)
            .one(&*self.db_pool)
            .await?
            .filter(|o| is_admin || o.user_id == user_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }

    #[instrument(skip(self))]
    pub async fn list_all(
        &self,
        filter: OrderFilter,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<order::Model>, ServiceError> {
        let query = order::Entity::find().order_by_desc(order::Column::CreatedAt);
        paginate(&self.db_pool, filter.apply(query), pagination).await
    }

    /// Orders placed for the calling seller's products
    #[instrument(skip(self))]
    pub async fn list_for_seller(
        &self,
        user_id: Uuid,
        filter: OrderFilter,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<order::Model>, ServiceError> {
        let seller = self.sellers.ensure_approved(user_id).await?;
        let products = Query::select()
            .column(product::Column::Id)
            .from(product::Entity)
            .and_where(product::Column::SellerId.eq(seller.id))
            .to_owned();
        let query = order::Entity::find()
            .filter(order::Column::ProductId.in_subquery(products))
            .order_by_desc(order::Column::CreatedAt);
        paginate(&self.db_pool, filter.apply(query), pagination).await
    }

    /// Ticket orders for the calling promoter's events
    #[instrument(skip(self))]
    pub async fn list_for_promoter(
        &self,
        user_id: Uuid,
        filter: OrderFilter,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<order::Model>, ServiceError> {
        let promoter = self.promoters.ensure_approved(user_id).await?;
        let events = Query::select()
            .column(event::Column::Id)
            .from(event::Entity)
            .and_where(event::Column::PromoterId.eq(promoter.id))
            .to_owned();
        let query = order::Entity::find()
            .filter(order::Column::EventId.in_subquery(events))
            .order_by_desc(order::Column::CreatedAt);
        paginate(&self.db_pool, filter.apply(query), pagination).await
    }
}
