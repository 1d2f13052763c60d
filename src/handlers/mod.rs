pub mod admin;
pub mod chapters;
pub mod checkout;
pub mod common;
pub mod events;
pub mod orders;
pub mod payment_webhooks;
pub mod products;
pub mod promoters;
pub mod sellers;
pub mod shipping;
pub mod steward_listings;
pub mod stewards;
pub mod users;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    admin::AdminService,
    chapters::ChapterService,
    checkout::{CheckoutService, CheckoutSettings},
    orders::OrderService,
    payments::PaymentGateway,
    products::ProductService,
    promoters::PromoterService,
    sellers::SellerService,
    shipping::ShippingService,
    steward_listings::StewardListingService,
    stewards::StewardService,
    ticketed_events::TicketedEventService,
    users::UserService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub users: Arc<UserService>,
    pub chapters: Arc<ChapterService>,
    pub sellers: Arc<SellerService>,
    pub promoters: Arc<PromoterService>,
    pub stewards: Arc<StewardService>,
    pub products: Arc<ProductService>,
    pub events: Arc<TicketedEventService>,
    pub listings: Arc<StewardListingService>,
    pub shipping: Arc<ShippingService>,
    pub checkout: Arc<CheckoutService>,
    pub orders: Arc<OrderService>,
    pub admin: Arc<AdminService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        config: &AppConfig,
        gateway: Arc<dyn PaymentGateway>,
        shipping: ShippingService,
    ) -> Self {
        let checkout = Arc::new(CheckoutService::new(
            db_pool.clone(),
            event_sender.clone(),
            gateway,
            shipping.clone(),
            config.fee_policy(),
            CheckoutSettings::from(config),
        ));

        Self {
            users: Arc::new(UserService::new(db_pool.clone(), event_sender.clone())),
            chapters: Arc::new(ChapterService::new(db_pool.clone(), event_sender.clone())),
            sellers: Arc::new(SellerService::new(db_pool.clone(), event_sender.clone())),
            promoters: Arc::new(PromoterService::new(db_pool.clone(), event_sender.clone())),
            stewards: Arc::new(StewardService::new(db_pool.clone(), event_sender.clone())),
            products: Arc::new(ProductService::new(db_pool.clone(), event_sender.clone())),
            events: Arc::new(TicketedEventService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            listings: Arc::new(StewardListingService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            shipping: Arc::new(shipping),
            checkout,
            orders: Arc::new(OrderService::new(db_pool.clone(), event_sender)),
            admin: Arc::new(AdminService::new(db_pool)),
        }
    }
}
