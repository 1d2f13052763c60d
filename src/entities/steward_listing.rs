use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Legacy item a steward gives away; the claimant covers shipping, fee and donation
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "steward_listings")]
#[schema(as = StewardListing)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub steward_id: Uuid,
    pub sponsoring_chapter_id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(nullable)]
    pub image_url: Option<String>,
    pub shipping_cents: i64,
    pub chapter_donation_cents: i64,
    #[sea_orm(nullable)]
    pub weight_oz: Option<i32>,
    pub is_kappa_branded: bool,
    pub status: ListingStatus,
    #[sea_orm(nullable)]
    pub claimed_by: Option<Uuid>,
    #[sea_orm(nullable)]
    pub claimed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::steward::Entity",
        from = "Column::StewardId",
        to = "super::steward::Column::Id"
    )]
    Steward,
}

impl Related<super::steward::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Steward.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListingStatus {
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    /// Held by a pending claim checkout
    #[sea_orm(string_value = "RESERVED")]
    Reserved,
    #[sea_orm(string_value = "CLAIMED")]
    Claimed,
    #[sea_orm(string_value = "REMOVED")]
    Removed,
}
