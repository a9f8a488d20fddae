use tracing::{info, warn};

use super::{
    repo::UserStore,
    repo_types::{Role, User},
};
use crate::{
    auth::{error::AuthError, policy::ensure_role},
    error::ApiError,
};

/// Outcome of a role change, for the audit trail.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleChange {
    pub user_id: i64,
    pub from: Role,
    pub to: Role,
}

/// Admin-only. An admin can never change their own role through here.
pub async fn change_role(
    users: &dyn UserStore,
    actor: &User,
    target_id: i64,
    requested: Option<&str>,
) -> Result<RoleChange, ApiError> {
    ensure_role(actor, "admin")?;

    let to = requested.and_then(Role::parse).ok_or_else(|| {
        ApiError::bad_request("Invalid role. Must be 'admin', 'user', or 'moderator'")
    })?;

    if target_id == actor.user_id {
        warn!(user_id = actor.user_id, "admin tried to change own role");
        return Err(ApiError::bad_request("Cannot change your own role"));
    }

    let target = users
        .find_by_id(target_id)
        .await
        .map_err(AuthError::upstream)?
        .ok_or_else(|| ApiError::not_found(format!("User with ID {target_id} not found")))?;

    users
        .set_role(target_id, to)
        .await
        .map_err(AuthError::upstream)?;

    info!(actor = actor.user_id, target = target_id, from = %target.role, to = %to, "role changed");
    Ok(RoleChange {
        user_id: target_id,
        from: target.role,
        to,
    })
}
