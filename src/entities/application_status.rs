use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::ServiceError;

/// Review state shared by seller, promoter and steward applications
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
}

impl ApplicationStatus {
    /// Only pending applications can be approved or rejected.
    pub fn ensure_reviewable(self, kind: &str) -> Result<(), ServiceError> {
        match self {
            Self::Pending => Ok(()),
            other => Err(ServiceError::InvalidStatus(format!(
                "{} application is {:?} and can no longer be reviewed",
                kind, other
            ))),
        }
    }

    /// A new application may replace a rejected one; pending or approved ones stand.
    pub fn ensure_can_reapply(self, kind: &str) -> Result<(), ServiceError> {
        match self {
            Self::Rejected => Ok(()),
            Self::Pending => Err(ServiceError::Conflict(format!(
                "{} application is already pending review",
                kind
            ))),
            Self::Approved => Err(ServiceError::Conflict(format!(
                "{} application has already been approved",
                kind
            ))),
        }
    }
}
