use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A checkout for a product, event tickets or a steward claim.
///
/// `total_cents` always equals `subtotal + shipping + platform_fee + donation`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "orders")]
#[schema(as = Order)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: OrderKind,
    #[sea_orm(nullable)]
    pub product_id: Option<Uuid>,
    #[sea_orm(nullable)]
    pub event_id: Option<Uuid>,
    #[sea_orm(nullable)]
    pub listing_id: Option<Uuid>,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
    pub shipping_cents: i64,
    pub platform_fee_cents: i64,
    pub donation_cents: i64,
    pub total_cents: i64,
    pub chapter_share_cents: i64,
    pub currency: String,
    #[sea_orm(nullable)]
    pub chapter_id: Option<Uuid>,
    #[sea_orm(nullable)]
    #[serde(skip_serializing)]
    pub payee_account_id: Option<String>,
    #[sea_orm(nullable)]
    pub stripe_session_id: Option<String>,
    #[sea_orm(nullable)]
    #[serde(skip_serializing)]
    pub payment_intent_id: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub checkout_url: Option<String>,
    pub status: OrderStatus,
    #[sea_orm(column_type = "Json", nullable)]
    #[schema(value_type = Option<Object>)]
    pub shipping_address: Option<Json>,
    #[sea_orm(nullable)]
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderKind {
    #[sea_orm(string_value = "PRODUCT")]
    Product,
    #[sea_orm(string_value = "EVENT_TICKET")]
    EventTicket,
    #[sea_orm(string_value = "STEWARD_CLAIM")]
    StewardClaim,
}

impl OrderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::EventTicket => "event_ticket",
            Self::StewardClaim => "steward_claim",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "PAID")]
    Paid,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
    #[sea_orm(string_value = "REFUNDED")]
    Refunded,
}
