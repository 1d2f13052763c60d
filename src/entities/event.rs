use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::ServiceError;

/// Ticketed event hosted by an approved promoter
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "events")]
#[schema(as = Event)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub promoter_id: Uuid,
    #[sea_orm(nullable)]
    pub sponsoring_chapter_id: Option<Uuid>,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub location: String,
    #[sea_orm(nullable)]
    pub city: Option<String>,
    #[sea_orm(nullable)]
    pub state: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub ticket_price_cents: i64,
    #[sea_orm(nullable)]
    pub capacity: Option<i32>,
    pub tickets_sold: i32,
    pub is_kappa_branded: bool,
    #[sea_orm(nullable)]
    pub image_url: Option<String>,
    #[sea_orm(column_type = "Json", nullable)]
    #[schema(value_type = Option<Object>)]
    pub features: Option<Json>,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::promoter::Entity",
        from = "Column::PromoterId",
        to = "super::promoter::Column::Id"
    )]
    Promoter,
}

impl Related<super::promoter::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Promoter.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Seats left, or `None` when the event is uncapped
    pub fn remaining_capacity(&self) -> Option<i32> {
        self.capacity
            .map(|capacity| (capacity - self.tickets_sold).max(0))
    }

    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.ends_at <= now
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    #[sea_orm(string_value = "CLOSED")]
    Closed,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

impl EventStatus {
    /// ACTIVE moves to CLOSED or CANCELLED; both are terminal.
    pub fn transition_to(self, next: EventStatus) -> Result<EventStatus, ServiceError> {
        match (self, next) {
            (Self::Active, Self::Closed) | (Self::Active, Self::Cancelled) => Ok(next),
            (from, to) => Err(ServiceError::InvalidStatus(format!(
                "Event cannot move from {:?} to {:?}",
                from, to
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(EventStatus::Active, EventStatus::Closed, true)]
    #[case(EventStatus::Active, EventStatus::Cancelled, true)]
    #[case(EventStatus::Active, EventStatus::Active, false)]
    #[case(EventStatus::Closed, EventStatus::Active, false)]
    #[case(EventStatus::Closed, EventStatus::Cancelled, false)]
    #[case(EventStatus::Cancelled, EventStatus::Closed, false)]
    fn transitions(#[case] from: EventStatus, #[case] to: EventStatus, #[case] allowed: bool) {
        assert_eq!(from.transition_to(to).is_ok(), allowed);
    }
}
