use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::product::{self, ProductStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        access::{Purchasable, Viewer},
        paginate,
        sellers::SellerService,
        Pagination,
    },
    PaginatedResponse,
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 5000))]
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 1))]
    pub price_cents: i64,
    #[validate(url)]
    pub image_url: Option<String>,
    #[validate(length(min = 1, max = 60))]
    pub category: Option<String>,
    #[serde(default)]
    pub is_kappa_branded: bool,
    #[validate(range(min = 0))]
    pub stock_quantity: i32,
    #[validate(range(min = 1))]
    pub weight_oz: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(range(min = 1))]
    pub price_cents: Option<i64>,
    #[validate(url)]
    pub image_url: Option<String>,
    #[validate(length(min = 1, max = 60))]
    pub category: Option<String>,
    pub is_kappa_branded: Option<bool>,
    #[validate(range(min = 0))]
    pub stock_quantity: Option<i32>,
    #[validate(range(min = 1))]
    pub weight_oz: Option<i32>,
    pub status: Option<ProductStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub seller_id: Option<Uuid>,
    pub kappa_branded: Option<bool>,
    pub search: Option<String>,
}

#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    sellers: SellerService,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let sellers = SellerService::new(db_pool.clone(), event_sender.clone());
        Self {
            db_pool,
            event_sender,
            sellers,
        }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, product_id: Uuid) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(product_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    /// Loads a product owned by the caller's approved seller account.
    async fn get_owned(&self, user_id: Uuid, product_id: Uuid) -> Result<product::Model, ServiceError> {
        let seller = self.sellers.ensure_approved(user_id).await?;
        let product = self.get(product_id).await?;
        if product.seller_id != seller.id {
            return Err(ServiceError::Forbidden(
                "Product belongs to another seller".to_string(),
            ));
        }
        Ok(product)
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(
        &self,
        user_id: Uuid,
        request: CreateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        request.validate()?;
        let seller = self.sellers.ensure_approved(user_id).await?;

        let now = Utc::now();
        let product = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            seller_id: Set(seller.id),
            name: Set(request.name.trim().to_string()),
            description: Set(request.description),
            price_cents: Set(request.price_cents),
            image_url: Set(request.image_url),
            category: Set(request.category),
            is_kappa_branded: Set(request.is_kappa_branded),
            stock_quantity: Set(request.stock_quantity),
            weight_oz: Set(request.weight_oz),
            status: Set(ProductStatus::Active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(product_id = %product.id, seller_id = %seller.id, "product created");
        self.event_sender
            .send_or_log(Event::ProductCreated(product.id))
            .await;
        Ok(product)
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        request.validate()?;
        let existing = self.get_owned(user_id, product_id).await?;

        let mut active: product::ActiveModel = existing.into();
        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(description) = request.description {
            active.description = Set(description);
        }
        if let Some(price) = request.price_cents {
            active.price_cents = Set(price);
        }
        if let Some(image_url) = request.image_url {
            active.image_url = Set(Some(image_url));
        }
        if let Some(category) = request.category {
            active.category = Set(Some(category));
        }
        if let Some(branded) = request.is_kappa_branded {
            active.is_kappa_branded = Set(branded);
        }
        if let Some(stock) = request.stock_quantity {
            active.stock_quantity = Set(stock);
        }
        if let Some(weight) = request.weight_oz {
            active.weight_oz = Set(Some(weight));
        }
        if let Some(status) = request.status {
            active.status = Set(status);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db_pool).await?;
        self.event_sender
            .send_or_log(Event::ProductUpdated(product_id))
            .await;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn deactivate(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<product::Model, ServiceError> {
        let existing = self.get_owned(user_id, product_id).await?;
        if existing.status == ProductStatus::Inactive {
            return Ok(existing);
        }

        let mut active: product::ActiveModel = existing.into();
        active.status = Set(ProductStatus::Inactive);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db_pool).await?;

        self.event_sender
            .send_or_log(Event::ProductDeactivated(product_id))
            .await;
        Ok(updated)
    }

    /// Public catalog of active products
    #[instrument(skip(self, viewer))]
    pub async fn list_catalog(
        &self,
        filter: ProductFilter,
        viewer: &Viewer,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<Purchasable<product::Model>>, ServiceError> {
        let mut query = product::Entity::find()
            .filter(product::Column::Status.eq(ProductStatus::Active))
            .order_by_desc(product::Column::CreatedAt)
            .order_by_asc(product::Column::Id);

        if let Some(category) = filter.category.filter(|c| !c.trim().is_empty()) {
            query = query.filter(product::Column::Category.eq(category.trim()));
        }
        if let Some(seller_id) = filter.seller_id {
            query = query.filter(product::Column::SellerId.eq(seller_id));
        }
        if let Some(branded) = filter.kappa_branded {
            query = query.filter(product::Column::IsKappaBranded.eq(branded));
        }
        if let Some(search) = filter.search.filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", search.trim());
            query = query.filter(
                Condition::any()
                    .add(product::Column::Name.like(pattern.as_str()))
                    .add(product::Column::Description.like(pattern.as_str())),
            );
        }

        let page = paginate(&self.db_pool, query, pagination).await?;
        Ok(page.map(|p| {
            let branded = p.is_kappa_branded;
            Purchasable::new(p, branded, viewer)
        }))
    }

    #[instrument(skip(self, viewer))]
    pub async fn get_public(
        &self,
        product_id: Uuid,
        viewer: &Viewer,
    ) -> Result<Purchasable<product::Model>, ServiceError> {
        let product = self.get(product_id).await?;
        if product.status != ProductStatus::Active {
            return Err(ServiceError::NotFound(format!(
                "Product {} not found",
                product_id
            )));
        }
        let branded = product.is_kappa_branded;
        Ok(Purchasable::new(product, branded, viewer))
    }

    /// Storefront of an approved seller
    pub async fn list_for_seller(
        &self,
        seller_id: Uuid,
        viewer: &Viewer,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<Purchasable<product::Model>>, ServiceError> {
        self.sellers.get_public(seller_id).await?;
        let filter = ProductFilter {
            seller_id: Some(seller_id),
            ..Default::default()
        };
        self.list_catalog(filter, viewer, pagination).await
    }

    /// Every product of the caller's seller account, inactive ones included
    pub async fn list_mine(
        &self,
        user_id: Uuid,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<product::Model>, ServiceError> {
        let seller = self.sellers.ensure_approved(user_id).await?;
        let query = product::Entity::find()
            .filter(product::Column::SellerId.eq(seller.id))
            .order_by_desc(product::Column::CreatedAt);
        paginate(&self.db_pool, query, pagination).await
    }
}
