//! Checkout for products, event tickets and steward claims.
//!
//! Every path runs the branded-item gate, composes fees, records a PENDING
//! order and opens a Stripe Checkout session. Payment webhooks then settle
//! the order through [`CheckoutService::mark_paid`] and friends.

use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    QueryFilter, QuerySelect, Set, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::AppConfig,
    db::DbPool,
    entities::{
        event::{self, EventStatus},
        order::{self, OrderKind, OrderStatus},
        processed_webhook,
        product::{self, ProductStatus},
        promoter, seller, steward,
        steward_listing::{self, ListingStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::{CHECKOUT_SESSIONS, TICKET_OVERSELLS, WEBHOOK_EVENTS},
    services::{
        access::{ensure_can_purchase, Viewer},
        fees::{FeeBreakdown, FeePolicy, PayoutSplit},
        payments::{
            verify_stripe_signature, CheckoutLineItem, CheckoutSessionRequest, PaymentGateway,
            StripeEvent,
        },
        shipping::{ShipmentRequest, ShippingAddress, ShippingRate, ShippingService, DEFAULT_WEIGHT_OZ},
        steward_listings,
    },
};

pub const MAX_PRODUCT_QUANTITY: u32 = 100;
pub const MAX_TICKET_QUANTITY: u32 = 20;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ProductCheckoutRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 100))]
    pub quantity: u32,
    #[validate]
    pub shipping_address: ShippingAddress,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct TicketCheckoutRequest {
    #[validate(range(min = 1, max = 20))]
    pub quantity: u32,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ClaimCheckoutRequest {
    #[validate]
    pub shipping_address: ShippingAddress,
}

/// Query for the quote endpoints; shipping needs only a destination postal code
#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct QuoteQuery {
    pub quantity: Option<u32>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckoutQuote {
    pub breakdown: FeeBreakdown,
    pub payout: PayoutSplit,
    pub shipping_rate: Option<ShippingRate>,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub order: order::Model,
    pub breakdown: FeeBreakdown,
    /// Where the buyer completes payment; absent for free orders
    pub checkout_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    Processed,
    Duplicate,
    Ignored,
}

impl WebhookOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Duplicate => "duplicate",
            Self::Ignored => "ignored",
        }
    }
}

/// Checkout-related settings, taken from configuration
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
    pub default_origin_postal_code: String,
    pub webhook_secret: Option<String>,
    pub webhook_tolerance_secs: i64,
}

impl From<&AppConfig> for CheckoutSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            currency: config.currency.to_lowercase(),
            success_url: config.checkout_success_url.clone(),
            cancel_url: config.checkout_cancel_url.clone(),
            default_origin_postal_code: config.default_origin_postal_code.clone(),
            webhook_secret: config.stripe_webhook_secret.clone(),
            webhook_tolerance_secs: config.stripe_webhook_tolerance_secs,
        }
    }
}

/// Everything a new PENDING order needs
struct OrderDraft {
    user_id: Uuid,
    kind: OrderKind,
    product_id: Option<Uuid>,
    event_id: Option<Uuid>,
    listing_id: Option<Uuid>,
    quantity: u32,
    unit_price_cents: i64,
    breakdown: FeeBreakdown,
    split: PayoutSplit,
    chapter_id: Option<Uuid>,
    payee_account_id: Option<String>,
    shipping_address: Option<serde_json::Value>,
    item_name: String,
}

#[derive(Clone)]
pub struct CheckoutService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    gateway: Arc<dyn PaymentGateway>,
    shipping: ShippingService,
    fees: FeePolicy,
    settings: CheckoutSettings,
}

impl CheckoutService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        gateway: Arc<dyn PaymentGateway>,
        shipping: ShippingService,
        fees: FeePolicy,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            gateway,
            shipping,
            fees,
            settings,
        }
    }

    pub fn fee_policy(&self) -> &FeePolicy {
        &self.fees
    }

    // ----- lookups -----

    async fn active_product(&self, product_id: Uuid) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(product_id)
            .one(&*self.db_pool)
            .await?
            .filter(|p| p.status == ProductStatus::Active)
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    async fn seller_of(&self, product: &product::Model) -> Result<seller::Model, ServiceError> {
        seller::Entity::find_by_id(product.seller_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Seller {} not found", product.seller_id)))
    }

    async fn on_sale_event(&self, event_id: Uuid) -> Result<event::Model, ServiceError> {
        let event = event::Entity::find_by_id(event_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Event {} not found", event_id)))?;
        if event.status != EventStatus::Active {
            return Err(ServiceError::InvalidStatus(format!(
                "Event is {:?}; tickets are not on sale",
                event.status
            )));
        }
        if event.has_ended(Utc::now()) {
            return Err(ServiceError::InvalidStatus(
                "Event has already ended".to_string(),
            ));
        }
        Ok(event)
    }

    async fn claimable_listing(
        &self,
        listing_id: Uuid,
    ) -> Result<(steward_listing::Model, steward::Model), ServiceError> {
        let listing = steward_listing::Entity::find_by_id(listing_id)
            .one(&*self.db_pool)
            .await?
            .filter(|l| l.status != ListingStatus::Removed)
            .ok_or_else(|| ServiceError::NotFound(format!("Listing {} not found", listing_id)))?;
        if listing.status != ListingStatus::Active {
            return Err(ServiceError::Conflict(
                "Listing is no longer available".to_string(),
            ));
        }
        let steward = steward::Entity::find_by_id(listing.steward_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Steward {} not found", listing.steward_id)))?;
        Ok((listing, steward))
    }

    async fn load_order(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        order::Entity::find_by_id(order_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }

    // ----- pricing -----

    fn ensure_quantity(quantity: u32, max: u32) -> Result<(), ServiceError> {
        if quantity == 0 || quantity > max {
            return Err(ServiceError::ValidationError(format!(
                "Quantity must be between 1 and {}",
                max
            )));
        }
        Ok(())
    }

    async fn product_shipping(
        &self,
        product: &product::Model,
        seller: &seller::Model,
        quantity: u32,
        destination_postal_code: &str,
        destination_country: &str,
    ) -> Result<ShippingRate, ServiceError> {
        let per_item = product.weight_oz.unwrap_or(DEFAULT_WEIGHT_OZ);
        let weight_oz = per_item.saturating_mul(i32::try_from(quantity).unwrap_or(i32::MAX));
        let origin = seller
            .ship_from_postal_code
            .clone()
            .unwrap_or_else(|| self.settings.default_origin_postal_code.clone());
        let request = ShipmentRequest {
            origin_postal_code: origin,
            destination_postal_code: destination_postal_code.trim().to_string(),
            destination_country: destination_country.to_string(),
            weight_oz,
        };
        self.shipping.cheapest_rate(&request).await
    }

    /// A listing's own shipping charge wins; zero means quote it live.
    async fn listing_shipping(
        &self,
        listing: &steward_listing::Model,
        steward: &steward::Model,
        destination_postal_code: &str,
        destination_country: &str,
    ) -> Result<Option<ShippingRate>, ServiceError> {
        if listing.shipping_cents > 0 {
            return Ok(None);
        }
        let request = ShipmentRequest {
            origin_postal_code: steward.ship_from_postal_code.clone(),
            destination_postal_code: destination_postal_code.trim().to_string(),
            destination_country: destination_country.to_string(),
            weight_oz: listing.weight_oz.unwrap_or(DEFAULT_WEIGHT_OZ),
        };
        Ok(Some(self.shipping.cheapest_rate(&request).await?))
    }

    fn quote_from(
        &self,
        breakdown: FeeBreakdown,
        shipping_rate: Option<ShippingRate>,
    ) -> Result<CheckoutQuote, ServiceError> {
        Ok(CheckoutQuote {
            payout: self.fees.payout_split(&breakdown)?,
            breakdown,
            shipping_rate,
            currency: self.settings.currency.clone(),
        })
    }

    // ----- quotes -----

    #[instrument(skip(self, query))]
    pub async fn quote_product(
        &self,
        product_id: Uuid,
        query: QuoteQuery,
    ) -> Result<CheckoutQuote, ServiceError> {
        let quantity = query.quantity.unwrap_or(1);
        Self::ensure_quantity(quantity, MAX_PRODUCT_QUANTITY)?;
        let postal_code = query.postal_code.ok_or_else(|| {
            ServiceError::ValidationError("postal_code is required for a shipping quote".to_string())
        })?;
        let country = query.country.unwrap_or_else(|| "US".to_string());

        let product = self.active_product(product_id).await?;
        let seller = self.seller_of(&product).await?;
        let rate = self
            .product_shipping(&product, &seller, quantity, &postal_code, &country)
            .await?;
        let breakdown = self
            .fees
            .product_checkout(product.price_cents, quantity, rate.amount_cents)?;
        self.quote_from(breakdown, Some(rate))
    }

    #[instrument(skip(self, query))]
    pub async fn quote_tickets(
        &self,
        event_id: Uuid,
        query: QuoteQuery,
    ) -> Result<CheckoutQuote, ServiceError> {
        let quantity = query.quantity.unwrap_or(1);
        Self::ensure_quantity(quantity, MAX_TICKET_QUANTITY)?;
        let event = self.on_sale_event(event_id).await?;
        let breakdown = self
            .fees
            .ticket_checkout(event.ticket_price_cents, quantity)?;
        self.quote_from(breakdown, None)
    }

    #[instrument(skip(self, query))]
    pub async fn quote_claim(
        &self,
        listing_id: Uuid,
        query: QuoteQuery,
    ) -> Result<CheckoutQuote, ServiceError> {
        let (listing, steward) = self.claimable_listing(listing_id).await?;
        let rate = match (listing.shipping_cents > 0, query.postal_code) {
            (true, _) => None,
            (false, Some(postal_code)) => {
                let country = query.country.unwrap_or_else(|| "US".to_string());
                self.listing_shipping(&listing, &steward, &postal_code, &country)
                    .await?
            }
            (false, None) => {
                return Err(ServiceError::ValidationError(
                    "postal_code is required for a shipping quote".to_string(),
                ))
            }
        };
        let shipping_cents = rate
            .as_ref()
            .map(|r| r.amount_cents)
            .unwrap_or(listing.shipping_cents);
        let breakdown = self
            .fees
            .steward_claim(shipping_cents, listing.chapter_donation_cents)?;
        self.quote_from(breakdown, rate)
    }

    // ----- checkout -----

    #[instrument(skip(self, viewer, request), fields(product_id = %request.product_id))]
    pub async fn checkout_product(
        &self,
        viewer: &Viewer,
        customer_email: Option<String>,
        request: ProductCheckoutRequest,
    ) -> Result<CheckoutResponse, ServiceError> {
        request.validate()?;
        let product = self.active_product(request.product_id).await?;
        ensure_can_purchase(product.is_kappa_branded, viewer)?;
        let user_id = signed_in(viewer)?;
        if i64::from(product.stock_quantity) < i64::from(request.quantity) {
            return Err(ServiceError::OutOfStock(format!(
                "Only {} of {} left",
                product.stock_quantity.max(0),
                product.name
            )));
        }

        let seller = self.seller_of(&product).await?;
        let rate = self
            .product_shipping(
                &product,
                &seller,
                request.quantity,
                &request.shipping_address.postal_code,
                &request.shipping_address.country,
            )
            .await?;
        let breakdown =
            self.fees
                .product_checkout(product.price_cents, request.quantity, rate.amount_cents)?;
        let split = self.fees.payout_split(&breakdown)?;

        let draft = OrderDraft {
            user_id,
            kind: OrderKind::Product,
            product_id: Some(product.id),
            event_id: None,
            listing_id: None,
            quantity: request.quantity,
            unit_price_cents: product.price_cents,
            breakdown,
            split,
            chapter_id: seller.sponsoring_chapter_id,
            payee_account_id: seller.stripe_account_id.clone(),
            shipping_address: Some(request.shipping_address.to_json()?),
            item_name: product.name.clone(),
        };
        let order = insert_order(&*self.db_pool, &draft, &self.settings.currency).await?;
        self.open_session(order, &draft, customer_email).await
    }

    #[instrument(skip(self, viewer, request))]
    pub async fn checkout_tickets(
        &self,
        viewer: &Viewer,
        customer_email: Option<String>,
        event_id: Uuid,
        request: TicketCheckoutRequest,
    ) -> Result<CheckoutResponse, ServiceError> {
        request.validate()?;
        let event = self.on_sale_event(event_id).await?;
        ensure_can_purchase(event.is_kappa_branded, viewer)?;
        let user_id = signed_in(viewer)?;
        if let Some(remaining) = event.remaining_capacity() {
            let held = held_tickets(&*self.db_pool, event.id).await?;
            let available = (i64::from(remaining) - held).max(0);
            if available < i64::from(request.quantity) {
                return Err(ServiceError::SoldOut(if available == 0 {
                    "Event is sold out".to_string()
                } else {
                    format!("Only {} tickets left", available)
                }));
            }
        }

        let promoter = promoter::Entity::find_by_id(event.promoter_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Promoter {} not found", event.promoter_id)))?;

        let breakdown = self
            .fees
            .ticket_checkout(event.ticket_price_cents, request.quantity)?;
        let split = self.fees.payout_split(&breakdown)?;

        let draft = OrderDraft {
            user_id,
            kind: OrderKind::EventTicket,
            product_id: None,
            event_id: Some(event.id),
            listing_id: None,
            quantity: request.quantity,
            unit_price_cents: event.ticket_price_cents,
            breakdown,
            split,
            chapter_id: event.sponsoring_chapter_id.or(promoter.sponsoring_chapter_id),
            payee_account_id: promoter.stripe_account_id.clone(),
            shipping_address: None,
            item_name: format!("Ticket: {}", event.title),
        };
        let order = insert_order(&*self.db_pool, &draft, &self.settings.currency).await?;

        if breakdown.total_cents == 0 {
            self.event_sender
                .send_or_log(Event::OrderCreated {
                    order_id: order.id,
                    kind: OrderKind::EventTicket.as_str().to_string(),
                })
                .await;
            let paid = self.mark_paid(order.id, None).await?;
            info!(order_id = %paid.id, "free tickets issued");
            return Ok(CheckoutResponse {
                order: paid,
                breakdown,
                checkout_url: None,
            });
        }

        self.open_session(order, &draft, customer_email).await
    }

    #[instrument(skip(self, viewer, request))]
    pub async fn checkout_claim(
        &self,
        viewer: &Viewer,
        customer_email: Option<String>,
        listing_id: Uuid,
        request: ClaimCheckoutRequest,
    ) -> Result<CheckoutResponse, ServiceError> {
        request.validate()?;
        let (listing, steward) = self.claimable_listing(listing_id).await?;
        ensure_can_purchase(listing.is_kappa_branded, viewer)?;
        let user_id = signed_in(viewer)?;
        if steward.user_id == user_id {
            return Err(ServiceError::Forbidden(
                "Stewards cannot claim their own listings".to_string(),
            ));
        }

        let rate = self
            .listing_shipping(
                &listing,
                &steward,
                &request.shipping_address.postal_code,
                &request.shipping_address.country,
            )
            .await?;
        let shipping_cents = rate
            .map(|r| r.amount_cents)
            .unwrap_or(listing.shipping_cents);
        let breakdown = self
            .fees
            .steward_claim(shipping_cents, listing.chapter_donation_cents)?;
        let split = self.fees.payout_split(&breakdown)?;

        let draft = OrderDraft {
            user_id,
            kind: OrderKind::StewardClaim,
            product_id: None,
            event_id: None,
            listing_id: Some(listing.id),
            quantity: 1,
            unit_price_cents: 0,
            breakdown,
            split,
            chapter_id: Some(listing.sponsoring_chapter_id),
            payee_account_id: None,
            shipping_address: Some(request.shipping_address.to_json()?),
            item_name: listing.name.clone(),
        };

        let txn = self.db_pool.begin().await?;
        steward_listings::reserve(&txn, listing.id).await?;
        let order = insert_order(&txn, &draft, &self.settings.currency).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::ListingReserved {
                listing_id: listing.id,
                order_id: order.id,
            })
            .await;

        self.open_session(order, &draft, customer_email).await
    }

    /// Opens the Stripe session for a fresh order; a provider failure cancels the order.
    async fn open_session(
        &self,
        order: order::Model,
        draft: &OrderDraft,
        customer_email: Option<String>,
    ) -> Result<CheckoutResponse, ServiceError> {
        let request = CheckoutSessionRequest {
            order_id: order.id,
            customer_email,
            currency: self.settings.currency.clone(),
            line_items: line_items(draft),
            application_fee_cents: draft.split.application_fee_cents(),
            destination_account: draft.payee_account_id.clone(),
            success_url: self.settings.success_url.clone(),
            cancel_url: self.settings.cancel_url.clone(),
        };

        let handle = match self.gateway.create_checkout_session(&request).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(order_id = %order.id, error = %e, "checkout session failed; cancelling order");
                if let Err(cancel_err) = self.mark_cancelled(order.id).await {
                    warn!(order_id = %order.id, error = %cancel_err, "could not cancel order");
                }
                return Err(e);
            }
        };

        let mut active: order::ActiveModel = order.into();
        active.stripe_session_id = Set(Some(handle.session_id.clone()));
        active.checkout_url = Set(Some(handle.url.clone()));
        active.updated_at = Set(Utc::now());
        let order = active.update(&*self.db_pool).await?;

        CHECKOUT_SESSIONS
            .with_label_values(&[draft.kind.as_str()])
            .inc();
        self.event_sender
            .send_or_log(Event::OrderCreated {
                order_id: order.id,
                kind: draft.kind.as_str().to_string(),
            })
            .await;

        Ok(CheckoutResponse {
            order,
            breakdown: draft.breakdown,
            checkout_url: Some(handle.url),
        })
    }

    // ----- settlement -----

    /// PENDING → PAID and its inventory effect. Repeated calls return the paid order.
    #[instrument(skip(self))]
    pub async fn mark_paid(
        &self,
        order_id: Uuid,
        payment_intent_id: Option<String>,
    ) -> Result<order::Model, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let existing = order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        match existing.status {
            OrderStatus::Paid => return Ok(existing),
            OrderStatus::Pending => {}
            other => {
                return Err(ServiceError::InvalidStatus(format!(
                    "Order is {:?} and cannot be marked paid",
                    other
                )))
            }
        }

        let quantity = existing.quantity;
        let kind = existing.kind;
        let user_id = existing.user_id;
        let product_id = existing.product_id;
        let event_id = existing.event_id;
        let listing_id = existing.listing_id;

        let now = Utc::now();
        let mut active: order::ActiveModel = existing.into();
        active.status = Set(OrderStatus::Paid);
        active.paid_at = Set(Some(now));
        if payment_intent_id.is_some() {
            active.payment_intent_id = Set(payment_intent_id);
        }
        active.updated_at = Set(now);
        let paid = active.update(&txn).await?;

        let mut claimed = None;
        match kind {
            OrderKind::Product => {
                if let Some(product_id) = product_id {
                    decrement_stock(&txn, product_id, quantity).await?;
                }
            }
            OrderKind::EventTicket => {
                if let Some(event_id) = event_id {
                    record_ticket_sale(&txn, event_id, order_id, quantity).await?;
                }
            }
            OrderKind::StewardClaim => {
                if let Some(listing_id) = listing_id {
                    if steward_listings::mark_claimed(&txn, listing_id, user_id).await? {
                        claimed = Some(listing_id);
                    }
                }
            }
        }

        txn.commit().await?;

        info!(%order_id, total_cents = paid.total_cents, "order paid");
        self.event_sender
            .send_or_log(Event::OrderPaid {
                order_id,
                total_cents: paid.total_cents,
            })
            .await;
        if let Some(listing_id) = claimed {
            self.event_sender
                .send_or_log(Event::ListingClaimed {
                    listing_id,
                    claimed_by: user_id,
                })
                .await;
        }
        Ok(paid)
    }

    /// PENDING → CANCELLED, releasing a reserved listing. Repeated calls are no-ops.
    #[instrument(skip(self))]
    pub async fn mark_cancelled(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let existing = order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        match existing.status {
            OrderStatus::Cancelled => return Ok(existing),
            OrderStatus::Pending => {}
            other => {
                return Err(ServiceError::InvalidStatus(format!(
                    "Order is {:?} and cannot be cancelled",
                    other
                )))
            }
        }

        let listing_id = existing.listing_id;
        let mut active: order::ActiveModel = existing.into();
        active.status = Set(OrderStatus::Cancelled);
        active.updated_at = Set(Utc::now());
        let cancelled = active.update(&txn).await?;

        let mut released = None;
        if let Some(listing_id) = listing_id {
            if steward_listings::release(&txn, listing_id).await? {
                released = Some(listing_id);
            }
        }
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderCancelled(order_id))
            .await;
        if let Some(listing_id) = released {
            self.event_sender
                .send_or_log(Event::ListingReleased(listing_id))
                .await;
        }
        Ok(cancelled)
    }

    /// PAID → REFUNDED. Inventory is left alone.
    #[instrument(skip(self))]
    pub async fn mark_refunded(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        let existing = self.load_order(order_id).await?;
        match existing.status {
            OrderStatus::Refunded => return Ok(existing),
            OrderStatus::Paid => {}
            other => {
                return Err(ServiceError::InvalidStatus(format!(
                    "Order is {:?} and cannot be refunded",
                    other
                )))
            }
        }

        let mut active: order::ActiveModel = existing.into();
        active.status = Set(OrderStatus::Refunded);
        active.updated_at = Set(Utc::now());
        let refunded = active.update(&*self.db_pool).await?;

        self.event_sender
            .send_or_log(Event::OrderRefunded(order_id))
            .await;
        Ok(refunded)
    }

    /// Buyer-initiated cancel of an unpaid order; the Stripe session is expired best-effort.
    #[instrument(skip(self))]
    pub async fn cancel_for_user(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        let order = self.load_order(order_id).await?;
        if order.user_id != user_id {
            return Err(ServiceError::NotFound(format!("Order {} not found", order_id)));
        }
        if order.status != OrderStatus::Pending {
            return Err(ServiceError::InvalidStatus(format!(
                "Order is {:?}; only pending orders can be cancelled",
                order.status
            )));
        }

        if let Some(session_id) = &order.stripe_session_id {
            if let Err(e) = self.gateway.expire_checkout_session(session_id).await {
                warn!(%order_id, error = %e, "could not expire checkout session");
            }
        }
        self.mark_cancelled(order_id).await
    }

    // ----- webhooks -----

    /// Verifies, deduplicates and applies a Stripe webhook delivery.
    #[instrument(skip(self, payload, signature))]
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, ServiceError> {
        let secret = self.settings.webhook_secret.as_deref().ok_or_else(|| {
            ServiceError::InternalError("Stripe webhook secret is not configured".to_string())
        })?;
        let signature = signature.ok_or(ServiceError::InvalidWebhookSignature)?;
        verify_stripe_signature(
            signature,
            payload,
            secret,
            self.settings.webhook_tolerance_secs,
            Utc::now().timestamp(),
        )?;

        let event: StripeEvent = serde_json::from_slice(payload)
            .map_err(|e| ServiceError::BadRequest(format!("Invalid webhook payload: {}", e)))?;

        let outcome = self.apply_webhook_event(&event).await?;
        WEBHOOK_EVENTS
            .with_label_values(&[event.event_type.as_str(), outcome.as_str()])
            .inc();
        Ok(outcome)
    }

    /// Applies an already-verified event once per event id.
    pub async fn apply_webhook_event(&self, event: &StripeEvent) -> Result<WebhookOutcome, ServiceError> {
        let db = &*self.db_pool;
        if processed_webhook::Entity::find_by_id(event.id.clone())
            .one(db)
            .await?
            .is_some()
        {
            info!(event_id = %event.id, "webhook already processed");
            return Ok(WebhookOutcome::Duplicate);
        }

        let outcome = match event.event_type.as_str() {
            "checkout.session.completed" => {
                if event.object_str("payment_status") == Some("unpaid") {
                    info!(event_id = %event.id, "session completed but payment is still pending");
                    WebhookOutcome::Ignored
                } else {
                    self.settle_paid(event).await?
                }
            }
            "checkout.session.async_payment_succeeded" => self.settle_paid(event).await?,
            "checkout.session.expired" | "checkout.session.async_payment_failed" => {
                match self.order_for_session(event).await? {
                    Some(order) => match self.mark_cancelled(order.id).await {
                        Ok(_) => WebhookOutcome::Processed,
                        Err(ServiceError::InvalidStatus(msg)) => {
                            warn!(order_id = %order.id, %msg, "ignoring session end for settled order");
                            WebhookOutcome::Ignored
                        }
                        Err(e) => return Err(e),
                    },
                    None => WebhookOutcome::Ignored,
                }
            }
            "charge.refunded" => {
                let fully_refunded = event
                    .data
                    .object
                    .get("refunded")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                match (fully_refunded, event.object_str("payment_intent")) {
                    (true, Some(intent)) => {
                        let order = order::Entity::find()
                            .filter(order::Column::PaymentIntentId.eq(intent))
                            .one(db)
                            .await?;
                        match order {
                            Some(order) => match self.mark_refunded(order.id).await {
                                Ok(_) => WebhookOutcome::Processed,
                                Err(ServiceError::InvalidStatus(msg)) => {
                                    warn!(order_id = %order.id, %msg, "ignoring refund");
                                    WebhookOutcome::Ignored
                                }
                                Err(e) => return Err(e),
                            },
                            None => {
                                warn!(payment_intent = intent, "refund for unknown payment");
                                WebhookOutcome::Ignored
                            }
                        }
                    }
                    _ => WebhookOutcome::Ignored,
                }
            }
            other => {
                info!(event_type = other, "unhandled webhook type");
                WebhookOutcome::Ignored
            }
        };

        record_webhook(db, event).await?;
        Ok(outcome)
    }

    async fn order_for_session(&self, event: &StripeEvent) -> Result<Option<order::Model>, ServiceError> {
        let db = &*self.db_pool;
        if let Some(order_id) = event.order_id() {
            if let Some(order) = order::Entity::find_by_id(order_id).one(db).await? {
                return Ok(Some(order));
            }
        }
        if let Some(session_id) = event.object_str("id") {
            let order = order::Entity::find()
                .filter(order::Column::StripeSessionId.eq(session_id))
                .one(db)
                .await?;
            if order.is_some() {
                return Ok(order);
            }
        }
        warn!(event_id = %event.id, "webhook does not match any order");
        Ok(None)
    }

    async fn settle_paid(&self, event: &StripeEvent) -> Result<WebhookOutcome, ServiceError> {
        let Some(order) = self.order_for_session(event).await? else {
            return Ok(WebhookOutcome::Ignored);
        };
        let intent = event.object_str("payment_intent").map(str::to_string);
        match self.mark_paid(order.id, intent).await {
            Ok(_) => Ok(WebhookOutcome::Processed),
            Err(ServiceError::InvalidStatus(msg)) => {
                warn!(order_id = %order.id, %msg, "payment for an order that is no longer pending");
                Ok(WebhookOutcome::Ignored)
            }
            Err(e) => Err(e),
        }
    }
}

/// Call after `ensure_can_purchase`; anonymous buyers of branded items get the gate's error.
fn signed_in(viewer: &Viewer) -> Result<Uuid, ServiceError> {
    viewer
        .user_id()
        .ok_or_else(|| ServiceError::Unauthorized("Sign in to check out".to_string()))
}

fn line_items(draft: &OrderDraft) -> Vec<CheckoutLineItem> {
    let mut items = Vec::new();
    if draft.breakdown.subtotal_cents > 0 {
        items.push(CheckoutLineItem {
            name: draft.item_name.clone(),
            unit_amount_cents: draft.unit_price_cents,
            quantity: draft.quantity,
        });
    }
    for (name, amount) in [
        ("Shipping", draft.breakdown.shipping_cents),
        ("Platform fee", draft.breakdown.platform_fee_cents),
        ("Chapter donation", draft.breakdown.donation_cents),
    ] {
        if amount > 0 {
            items.push(CheckoutLineItem {
                name: name.to_string(),
                unit_amount_cents: amount,
                quantity: 1,
            });
        }
    }
    items
}

async fn insert_order<C: ConnectionTrait>(
    db: &C,
    draft: &OrderDraft,
    currency: &str,
) -> Result<order::Model, ServiceError> {
    let quantity = i32::try_from(draft.quantity)
        .map_err(|_| ServiceError::ValidationError("Quantity is too large".to_string()))?;
    let now = Utc::now();
    let order = order::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(draft.user_id),
        kind: Set(draft.kind),
        product_id: Set(draft.product_id),
        event_id: Set(draft.event_id),
        listing_id: Set(draft.listing_id),
        quantity: Set(quantity),
        unit_price_cents: Set(draft.unit_price_cents),
        subtotal_cents: Set(draft.breakdown.subtotal_cents),
        shipping_cents: Set(draft.breakdown.shipping_cents),
        platform_fee_cents: Set(draft.breakdown.platform_fee_cents),
        donation_cents: Set(draft.breakdown.donation_cents),
        total_cents: Set(draft.breakdown.total_cents),
        chapter_share_cents: Set(draft.split.chapter_cents),
        currency: Set(currency.to_string()),
        chapter_id: Set(draft.chapter_id),
        payee_account_id: Set(draft.payee_account_id.clone()),
        stripe_session_id: Set(None),
        payment_intent_id: Set(None),
        checkout_url: Set(None),
        status: Set(OrderStatus::Pending),
        shipping_address: Set(draft.shipping_address.clone()),
        paid_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    info!(order_id = %order.id, kind = draft.kind.as_str(), total_cents = order.total_cents, "order created");
    Ok(order)
}

/// Decrements stock, flooring at zero when it has run out in the meantime.
async fn decrement_stock<C: ConnectionTrait>(
    db: &C,
    product_id: Uuid,
    quantity: i32,
) -> Result<(), ServiceError> {
    let now = Utc::now();
    let result = product::Entity::update_many()
        .col_expr(
            product::Column::StockQuantity,
            Expr::col(product::Column::StockQuantity).sub(quantity),
        )
        .col_expr(product::Column::UpdatedAt, Expr::value(now))
        .filter(product::Column::Id.eq(product_id))
        .filter(product::Column::StockQuantity.gte(quantity))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        warn!(%product_id, quantity, "stock ran out before payment settled; flooring at zero");
        product::Entity::update_many()
            .col_expr(product::Column::StockQuantity, Expr::value(0))
            .col_expr(product::Column::UpdatedAt, Expr::value(now))
            .filter(product::Column::Id.eq(product_id))
            .exec(db)
            .await?;
    }
    Ok(())
}

/// Tickets reserved by orders still waiting on payment
async fn held_tickets<C: ConnectionTrait>(db: &C, event_id: Uuid) -> Result<i64, ServiceError> {
    let held: Option<Option<i64>> = order::Entity::find()
        .select_only()
        .column_as(Expr::col(order::Column::Quantity).sum(), "held")
        .filter(order::Column::EventId.eq(event_id))
        .filter(order::Column::Kind.eq(OrderKind::EventTicket))
        .filter(order::Column::Status.eq(OrderStatus::Pending))
        .into_tuple()
        .one(db)
        .await?;
    Ok(held.flatten().unwrap_or(0))
}

/// Adds settled tickets to the event, never past its capacity.
async fn record_ticket_sale<C: ConnectionTrait>(
    db: &C,
    event_id: Uuid,
    order_id: Uuid,
    quantity: i32,
) -> Result<(), ServiceError> {
    let now = Utc::now();
    let result = event::Entity::update_many()
        .col_expr(
            event::Column::TicketsSold,
            Expr::col(event::Column::TicketsSold).add(quantity),
        )
        .col_expr(event::Column::UpdatedAt, Expr::value(now))
        .filter(event::Column::Id.eq(event_id))
        .filter(
            Condition::any()
                .add(event::Column::Capacity.is_null())
                .add(
                    Expr::expr(Expr::col(event::Column::TicketsSold).add(quantity))
                        .lte(Expr::col(event::Column::Capacity)),
                ),
        )
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        warn!(%event_id, %order_id, quantity, "paid tickets exceed event capacity; holding tickets_sold at capacity");
        TICKET_OVERSELLS.inc();
        event::Entity::update_many()
            .col_expr(event::Column::TicketsSold, Expr::col(event::Column::Capacity).into())
            .col_expr(event::Column::UpdatedAt, Expr::value(now))
            .filter(event::Column::Id.eq(event_id))
            .filter(event::Column::Capacity.is_not_null())
            .exec(db)
            .await?;
    }
    Ok(())
}

async fn record_webhook<C: ConnectionTrait>(db: &C, event: &StripeEvent) -> Result<(), ServiceError> {
    let record = processed_webhook::ActiveModel {
        event_id: Set(event.id.clone()),
        event_type: Set(event.event_type.clone()),
        received_at: Set(Utc::now()),
    };
    match processed_webhook::Entity::insert(record).exec(db).await {
        Ok(_) => Ok(()),
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            // A concurrent delivery of the same event got there first.
            warn!(event_id = %event.id, "webhook already recorded");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(breakdown: FeeBreakdown) -> OrderDraft {
        OrderDraft {
            user_id: Uuid::new_v4(),
            kind: OrderKind::Product,
            product_id: Some(Uuid::new_v4()),
            event_id: None,
            listing_id: None,
            quantity: 2,
            unit_price_cents: 2_500,
            breakdown,
            split: PayoutSplit {
                payee_cents: 0,
                platform_cents: 0,
                chapter_cents: 0,
            },
            chapter_id: None,
            payee_account_id: None,
            shipping_address: None,
            item_name: "Crest tee".to_string(),
        }
    }

    #[test]
    fn line_items_sum_to_total() {
        let breakdown = FeeBreakdown {
            subtotal_cents: 5_000,
            shipping_cents: 899,
            platform_fee_cents: 500,
            donation_cents: 0,
            total_cents: 6_399,
        };
        let items = line_items(&draft(breakdown));
        let sum: i64 = items
            .iter()
            .map(|i| i.unit_amount_cents * i64::from(i.quantity))
            .sum();
        assert_eq!(sum, breakdown.total_cents);
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|i| i.name != "Chapter donation"));
    }

    #[test]
    fn claims_list_fee_shipping_and_donation_only() {
        let breakdown = FeeBreakdown {
            subtotal_cents: 0,
            shipping_cents: 1_250,
            platform_fee_cents: 300,
            donation_cents: 500,
            total_cents: 2_050,
        };
        let mut d = draft(breakdown);
        d.kind = OrderKind::StewardClaim;
        d.quantity = 1;
        d.unit_price_cents = 0;
        let names: Vec<_> = line_items(&d).into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["Shipping", "Platform fee", "Chapter donation"]);
    }

    fn delivery(id: &str) -> StripeEvent {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "type": "checkout.session.completed",
            "data": { "object": {} }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn repeated_webhook_record_is_tolerated() {
        let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
        crate::db::run_migrations(&db).await.unwrap();
        let event = delivery("evt_repeat");

        record_webhook(&db, &event).await.unwrap();
        record_webhook(&db, &event).await.unwrap();
        let stored = processed_webhook::Entity::find().all(&db).await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn other_webhook_record_failures_propagate() {
        // No migrations, so the table is missing.
        let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
        let err = record_webhook(&db, &delivery("evt_lost")).await.unwrap_err();
        assert!(matches!(err, ServiceError::DatabaseError(_)), "{:?}", err);
    }
}
