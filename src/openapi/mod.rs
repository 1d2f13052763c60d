use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Kappa Marketplace API",
        version = "1.0.0",
        description = r#"
# Kappa Marketplace API

Marketplace for chapter members and friends of the fraternity.

## Features

- **Merch**: approved sellers list products; buyers pay item price, shipping and a platform fee
- **Events**: approved promoters sell tickets to chapter events; free events confirm instantly
- **Legacy items**: stewards give away chapter items; the claimant covers shipping, a flat platform fee and a chapter donation
- **Moderation**: admins review seller, promoter and steward applications

## Kappa-branded items

Products, events and listings flagged `is_kappa_branded` can only be bought by
verified members. Anonymous buyers get `401 AUTH_REQUIRED_FOR_KAPPA_BRANDED`,
signed-in non-members get `403 MEMBERSHIP_REQUIRED_FOR_KAPPA_BRANDED`. List
endpoints mark each item with `can_purchase` for the caller.

## Authentication

Tokens are issued by the identity provider and sent as a bearer token:

```
Authorization: Bearer <your-jwt-token>
```

`GET /api/v1/session` reports how long the token has left.

## Money

All amounts are integer cents in the configured currency.

## Pagination

List endpoints take `page` (default 1) and `limit` (default 20, max 100).
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Account", description = "Profile and session"),
        (name = "Chapters", description = "Chapter directory"),
        (name = "Sellers", description = "Seller applications and storefronts"),
        (name = "Promoters", description = "Promoter applications"),
        (name = "Stewards", description = "Steward applications"),
        (name = "Products", description = "Merch catalog"),
        (name = "Events", description = "Ticketed chapter events"),
        (name = "Steward Listings", description = "Legacy items up for claim"),
        (name = "Shipping", description = "Shipping rate quotes"),
        (name = "Checkout", description = "Quotes and checkout sessions"),
        (name = "Orders", description = "Purchase history"),
        (name = "Payments", description = "Payment provider webhooks"),
        (name = "Admin", description = "Moderation endpoints")
    ),
    paths(
        // Account
        crate::handlers::users::get_me,
        crate::handlers::users::update_me,
        crate::handlers::users::get_session,

        // Chapters
        crate::handlers::chapters::list_chapters,
        crate::handlers::chapters::get_chapter,

        // Sellers
        crate::handlers::sellers::apply,
        crate::handlers::sellers::get_mine,
        crate::handlers::sellers::list_my_products,
        crate::handlers::sellers::list_my_orders,
        crate::handlers::sellers::get_seller,
        crate::handlers::sellers::list_seller_products,

        // Promoters
        crate::handlers::promoters::apply,
        crate::handlers::promoters::get_mine,
        crate::handlers::promoters::list_my_events,
        crate::handlers::promoters::list_my_orders,
        crate::handlers::promoters::get_promoter,

        // Stewards
        crate::handlers::stewards::apply,
        crate::handlers::stewards::get_mine,
        crate::handlers::stewards::list_my_listings,

        // Catalog
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::deactivate_product,
        crate::handlers::events::list_events,
        crate::handlers::events::get_event,
        crate::handlers::events::create_event,
        crate::handlers::events::update_event,
        crate::handlers::events::close_event,
        crate::handlers::events::cancel_event,
        crate::handlers::steward_listings::list_listings,
        crate::handlers::steward_listings::get_listing,
        crate::handlers::steward_listings::create_listing,
        crate::handlers::steward_listings::update_listing,
        crate::handlers::steward_listings::remove_listing,

        // Checkout
        crate::handlers::shipping::quote_shipping,
        crate::handlers::checkout::quote_product,
        crate::handlers::checkout::quote_tickets,
        crate::handlers::checkout::quote_claim,
        crate::handlers::checkout::checkout_product,
        crate::handlers::checkout::checkout_tickets,
        crate::handlers::checkout::checkout_claim,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::cancel_order,

        // Webhooks
        crate::handlers::payment_webhooks::stripe_webhook,

        // Admin
        crate::handlers::admin::approvals,
        crate::handlers::admin::list_orders,
        crate::handlers::admin::list_users,
        crate::handlers::admin::verify_membership,
        crate::handlers::admin::revoke_membership,
        crate::handlers::admin::create_chapter,
        crate::handlers::admin::update_chapter,
        crate::handlers::admin::deactivate_chapter,
        crate::handlers::admin::list_sellers,
        crate::handlers::admin::approve_seller,
        crate::handlers::admin::reject_seller,
        crate::handlers::admin::list_promoters,
        crate::handlers::admin::approve_promoter,
        crate::handlers::admin::reject_promoter,
        crate::handlers::admin::list_stewards,
        crate::handlers::admin::approve_steward,
        crate::handlers::admin::reject_steward,
    ),
    components(
        schemas(
            crate::ListQuery,
            crate::ResponseMeta,
            crate::entities::ApplicationStatus,
            crate::auth::SessionState,
            crate::services::fees::FeeBreakdown,
            crate::services::fees::PayoutSplit,
            crate::services::shipping::ShippingAddress,
            crate::services::checkout::WebhookOutcome,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

/// Registers the bearer scheme the handlers refer to as `Bearer`
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
