use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{Claims, ADMIN_ROLE},
    db::DbPool,
    entities::{
        chapter,
        promoter, seller, steward,
        user::{self, UserRole},
        ApplicationStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{chapters::ensure_active_chapter, paginate, Pagination},
    PaginatedResponse,
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 40))]
    pub membership_number: Option<String>,
    pub chapter_id: Option<Uuid>,
}

/// The signed-in user together with the marketplace roles they hold
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserProfile {
    pub user: user::Model,
    pub chapter: Option<chapter::Model>,
    pub is_admin: bool,
    pub seller_status: Option<ApplicationStatus>,
    pub promoter_status: Option<ApplicationStatus>,
    pub steward_status: Option<ApplicationStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct UserFilter {
    pub is_member: Option<bool>,
    pub search: Option<String>,
}

/// Fails with `MembershipRequired` unless the user is a verified member.
pub(crate) async fn ensure_verified_member(
    db: &DatabaseConnection,
    user_id: Uuid,
    action: &str,
) -> Result<user::Model, ServiceError> {
    let user = user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))?;
    if user.is_member || user.is_admin() {
        Ok(user)
    } else {
        Err(ServiceError::MembershipRequired(format!(
            "Only verified members can {}",
            action
        )))
    }
}

fn email_conflict() -> ServiceError {
    ServiceError::Conflict("Email address is linked to another account".to_string())
}

/// Service for the local mirror of identity-provider accounts
#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl UserService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Finds or creates the user behind a verified token.
    ///
    /// The profile name is only taken from the token on first sign-in; later
    /// edits through the profile endpoint win. Email follows the provider.
    #[instrument(skip(self, claims), fields(subject = %claims.sub))]
    pub async fn sync_from_claims(&self, claims: &Claims) -> Result<user::Model, ServiceError> {
        let db = &*self.db_pool;
        let claims_admin = claims.has_role(ADMIN_ROLE);
        let now = Utc::now();

        if let Some(existing) = user::Entity::find()
            .filter(user::Column::IdpSubject.eq(claims.sub.as_str()))
            .one(db)
            .await?
        {
            let promote = claims_admin && existing.role != UserRole::Admin;
            let email_changed = existing.email != claims.email;
            if !email_changed && !promote {
                return Ok(existing);
            }
            if email_changed && self.email_taken(&claims.email, Some(existing.id)).await? {
                return Err(email_conflict());
            }

            let mut active: user::ActiveModel = existing.into();
            active.email = Set(claims.email.clone());
            if promote {
                active.role = Set(UserRole::Admin);
            }
            active.updated_at = Set(now);
            return Ok(active.update(db).await?);
        }

        if self.email_taken(&claims.email, None).await? {
            return Err(email_conflict());
        }

        let name = claims
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(claims.email.as_str())
            .to_string();

        let created = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            idp_subject: Set(claims.sub.clone()),
            email: Set(claims.email.clone()),
            name: Set(name),
            role: Set(if claims_admin {
                UserRole::Admin
            } else {
                UserRole::Guest
            }),
            is_member: Set(false),
            membership_number: Set(None),
            chapter_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;

        info!(user_id = %created.id, "user created from identity provider");
        self.event_sender
            .send_or_log(Event::UserCreated(created.id))
            .await;

        Ok(created)
    }

    /// Whether another account already uses `email`
    async fn email_taken(&self, email: &str, except: Option<Uuid>) -> Result<bool, ServiceError> {
        let mut query = user::Entity::find().filter(user::Column::Email.eq(email));
        if let Some(id) = except {
            query = query.filter(user::Column::Id.ne(id));
        }
        Ok(query.one(&*self.db_pool).await?.is_some())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, user_id: Uuid) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(user_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))
    }

    pub async fn ensure_member(&self, user_id: Uuid, action: &str) -> Result<user::Model, ServiceError> {
        ensure_verified_member(&self.db_pool, user_id, action).await
    }

    #[instrument(skip(self))]
    pub async fn profile(&self, user_id: Uuid) -> Result<UserProfile, ServiceError> {
        let db = &*self.db_pool;
        let user = self.get(user_id).await?;

        let chapter = match user.chapter_id {
            Some(chapter_id) => chapter::Entity::find_by_id(chapter_id).one(db).await?,
            None => None,
        };
        let seller_status = seller::Entity::find()
            .filter(seller::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .map(|s| s.status);
        let promoter_status = promoter::Entity::find()
            .filter(promoter::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .map(|p| p.status);
        let steward_status = steward::Entity::find()
            .filter(steward::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .map(|s| s.status);

        Ok(UserProfile {
            is_admin: user.is_admin(),
            user,
            chapter,
            seller_status,
            promoter_status,
            steward_status,
        })
    }

    #[instrument(skip(self, request))]
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<UserProfile, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let user = self.get(user_id).await?;

        if let Some(chapter_id) = request.chapter_id {
            ensure_active_chapter(db, chapter_id).await?;
        }

        let mut active: user::ActiveModel = user.into();
        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(number) = request.membership_number {
            active.membership_number = Set(Some(number));
        }
        if let Some(chapter_id) = request.chapter_id {
            active.chapter_id = Set(Some(chapter_id));
        }
        active.updated_at = Set(Utc::now());
        active.update(db).await?;

        self.profile(user_id).await
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: UserFilter,
        pagination: Pagination,
    ) -> Result<PaginatedResponse<user::Model>, ServiceError> {
        let mut query = user::Entity::find().order_by_asc(user::Column::Email);
        if let Some(is_member) = filter.is_member {
            query = query.filter(user::Column::IsMember.eq(is_member));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", search.trim());
            query = query.filter(
                Condition::any()
                    .add(user::Column::Email.like(pattern.as_str()))
                    .add(user::Column::Name.like(pattern.as_str())),
            );
        }
        paginate(&self.db_pool, query, pagination).await
    }

    /// Admin toggle of the verified-member flag; admins keep their role.
    #[instrument(skip(self))]
    pub async fn set_membership(
        &self,
        user_id: Uuid,
        is_member: bool,
    ) -> Result<user::Model, ServiceError> {
        let user = self.get(user_id).await?;
        let role = match (user.role, is_member) {
            (UserRole::Admin, _) => UserRole::Admin,
            (_, true) => UserRole::Member,
            (_, false) => UserRole::Guest,
        };

        let mut active: user::ActiveModel = user.into();
        active.is_member = Set(is_member);
        active.role = Set(role);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db_pool).await?;

        let event = if is_member {
            Event::MembershipVerified(user_id)
        } else {
            Event::MembershipRevoked(user_id)
        };
        self.event_sender.send_or_log(event).await;
        info!(%user_id, is_member, "membership updated");

        Ok(updated)
    }
}
