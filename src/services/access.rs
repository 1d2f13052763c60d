//! Kappa-branded purchase gating.
//!
//! Branded merchandise, events and legacy items are purchasable only by
//! verified members: `is_kappa_branded ? is_member : true`.

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::ServiceError;

/// Who is looking at or buying an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Viewer {
    Anonymous,
    Authenticated {
        user_id: Uuid,
        is_member: bool,
        is_admin: bool,
    },
}

impl Viewer {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Viewer::Anonymous => None,
            Viewer::Authenticated { user_id, .. } => Some(*user_id),
        }
    }

    /// Admins count as members for purchase purposes.
    pub fn is_member(&self) -> bool {
        match self {
            Viewer::Anonymous => false,
            Viewer::Authenticated {
                is_member,
                is_admin,
                ..
            } => *is_member || *is_admin,
        }
    }
}

impl From<&AuthUser> for Viewer {
    fn from(user: &AuthUser) -> Self {
        Viewer::Authenticated {
            user_id: user.user_id,
            is_member: user.is_member,
            is_admin: user.is_admin,
        }
    }
}

impl From<Option<&AuthUser>> for Viewer {
    fn from(user: Option<&AuthUser>) -> Self {
        user.map(Viewer::from).unwrap_or(Viewer::Anonymous)
    }
}

pub fn can_purchase_branded(is_kappa_branded: bool, viewer: &Viewer) -> bool {
    if is_kappa_branded {
        viewer.is_member()
    } else {
        true
    }
}

/// A catalog item annotated with whether the viewer may buy it
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Purchasable<T> {
    #[serde(flatten)]
    pub item: T,
    pub can_purchase: bool,
}

impl<T> Purchasable<T> {
    pub fn new(item: T, is_kappa_branded: bool, viewer: &Viewer) -> Self {
        Self {
            item,
            can_purchase: can_purchase_branded(is_kappa_branded, viewer),
        }
    }
}

/// The single gate every purchase path goes through.
pub fn ensure_can_purchase(is_kappa_branded: bool, viewer: &Viewer) -> Result<(), ServiceError> {
    if can_purchase_branded(is_kappa_branded, viewer) {
        return Ok(());
    }
    match viewer {
        Viewer::Anonymous => Err(ServiceError::KappaBrandedAuthRequired),
        Viewer::Authenticated { .. } => Err(ServiceError::KappaBrandedMembershipRequired),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    fn member() -> Viewer {
        Viewer::Authenticated {
            user_id: Uuid::new_v4(),
            is_member: true,
            is_admin: false,
        }
    }

    fn guest() -> Viewer {
        Viewer::Authenticated {
            user_id: Uuid::new_v4(),
            is_member: false,
            is_admin: false,
        }
    }

    fn admin() -> Viewer {
        Viewer::Authenticated {
            user_id: Uuid::new_v4(),
            is_member: false,
            is_admin: true,
        }
    }

    #[rstest]
    #[case(false, Viewer::Anonymous, true)]
    #[case(false, guest(), true)]
    #[case(false, member(), true)]
    #[case(true, Viewer::Anonymous, false)]
    #[case(true, guest(), false)]
    #[case(true, member(), true)]
    #[case(true, admin(), true)]
    fn branded_gate(#[case] branded: bool, #[case] viewer: Viewer, #[case] allowed: bool) {
        assert_eq!(can_purchase_branded(branded, &viewer), allowed);
        assert_eq!(ensure_can_purchase(branded, &viewer).is_ok(), allowed);
    }

    #[test]
    fn purchasable_flattens_the_item() {
        let wrapped = Purchasable::new(serde_json::json!({"name": "Crest tee"}), true, &guest());
        let value = serde_json::to_value(&wrapped).unwrap();
        assert_eq!(value["name"], "Crest tee");
        assert_eq!(value["can_purchase"], false);
    }

    #[test]
    fn anonymous_buyers_are_asked_to_sign_in() {
        assert_matches!(
            ensure_can_purchase(true, &Viewer::Anonymous),
            Err(ServiceError::KappaBrandedAuthRequired)
        );
    }

    #[test]
    fn signed_in_non_members_are_refused() {
        assert_matches!(
            ensure_can_purchase(true, &guest()),
            Err(ServiceError::KappaBrandedMembershipRequired)
        );
    }
}
