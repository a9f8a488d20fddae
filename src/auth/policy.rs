//! Who may see or change what. Pure functions over already-resolved users.

use super::error::AuthError;
use crate::users::repo_types::User;

/// Ownership attributes carried by protected resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership {
    pub owner_id: i64,
    pub is_public: bool,
}

fn owns_or_admin(owner_id: i64, requester: &User) -> bool {
    requester.user_id == owner_id || requester.is_admin()
}

pub fn can_view(is_public: bool, owner_id: i64, requester: Option<&User>) -> bool {
    is_public || requester.is_some_and(|u| owns_or_admin(owner_id, u))
}

/// Visibility does not matter here: public resources are still only
/// changed by their owner or an admin.
pub fn can_mutate(owner_id: i64, requester: Option<&User>) -> bool {
    requester.is_some_and(|u| owns_or_admin(owner_id, u))
}

/// Admin passes every role check.
pub fn require_role(requester: &User, role: &str) -> bool {
    let wanted = role.trim().to_lowercase();
    requester.is_admin() || requester.role.as_str() == wanted
}

pub fn ensure_role(requester: &User, role: &str) -> Result<(), AuthError> {
    if require_role(requester, role) {
        Ok(())
    } else {
        Err(AuthError::forbidden(format!("Requires {} role", role.trim())))
    }
}

impl Ownership {
    pub fn visible_to(&self, requester: Option<&User>) -> bool {
        can_view(self.is_public, self.owner_id, requester)
    }

    pub fn ensure_visible(&self, requester: Option<&User>, what: &str) -> Result<(), AuthError> {
        if self.visible_to(requester) {
            Ok(())
        } else {
            Err(AuthError::forbidden(format!("Not authorized to view this {what}")))
        }
    }

    pub fn ensure_mutable(&self, requester: &User, action: &str, what: &str) -> Result<(), AuthError> {
        if can_mutate(self.owner_id, Some(requester)) {
            Ok(())
        } else {
            Err(AuthError::forbidden(format!("Not authorized to {action} this {what}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::{memory::user, repo_types::Role};

    #[test]
    fn view_rules() {
        let stranger = user(6, "s@x.com", Role::User);
        let owner = user(5, "o@x.com", Role::User);
        let admin = user(6, "ad@x.com", Role::Admin);

        assert!(can_view(true, 5, None));
        assert!(!can_view(false, 5, None));
        assert!(!can_view(false, 5, Some(&stranger)));
        assert!(can_view(false, 5, Some(&owner)));
        assert!(can_view(false, 5, Some(&admin)));
    }

    #[test]
    fn mutate_rules_ignore_visibility() {
        let owner = user(5, "o@x.com", Role::User);
        let stranger = user(6, "s@x.com", Role::User);
        let moderator = user(7, "m@x.com", Role::Moderator);
        let admin = user(8, "ad@x.com", Role::Admin);

        assert!(can_mutate(5, Some(&owner)));
        assert!(!can_mutate(5, None));
        assert!(!can_mutate(5, Some(&stranger)));
        assert!(!can_mutate(5, Some(&moderator)));
        assert!(can_mutate(5, Some(&admin)));

        let public = Ownership { owner_id: 5, is_public: true };
        assert!(public.visible_to(Some(&stranger)));
        assert!(public.ensure_mutable(&stranger, "update", "trail").is_err());
        assert!(public.ensure_mutable(&owner, "update", "trail").is_ok());
    }

    #[test]
    fn role_checks() {
        let admin = user(1, "ad@x.com", Role::Admin);
        let moderator = user(2, "m@x.com", Role::Moderator);
        let plain = user(3, "u@x.com", Role::User);

        assert!(require_role(&admin, "moderator"));
        assert!(require_role(&admin, "anything"));
        assert!(require_role(&moderator, " Moderator "));
        assert!(!require_role(&moderator, "admin"));
        assert!(require_role(&plain, "USER"));
        assert!(!require_role(&plain, "admin"));

        let err = ensure_role(&plain, "admin").unwrap_err();
        assert_eq!(err.detail(), "Requires admin role");
    }

    #[test]
    fn private_resource_message() {
        let private = Ownership { owner_id: 5, is_public: false };
        let err = private.ensure_visible(None, "trail").unwrap_err();
        assert_eq!(err.detail(), "Not authorized to view this trail");
    }
}
