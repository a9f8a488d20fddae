use std::{future::Future, sync::Arc, time::Duration};

use tracing::{error, warn};

use super::{error::AuthError, jwt::SessionKeys};
use crate::users::{repo::UserStore, repo_types::User};

/// Bounds a store or upstream call; an elapsed timer fails the request.
pub(crate) async fn within<F: Future>(
    limit: Duration,
    what: &'static str,
    fut: F,
) -> Result<F::Output, AuthError> {
    tokio::time::timeout(limit, fut).await.map_err(|_| {
        error!(what, ?limit, "timed out");
        AuthError::upstream(anyhow::anyhow!("{what} timed out after {limit:?}"))
    })
}

/// Maps a presented bearer token to a local user.
#[derive(Clone)]
pub struct SessionResolver {
    keys: SessionKeys,
    users: Arc<dyn UserStore>,
    timeout: Duration,
}

impl SessionResolver {
    pub fn new(keys: SessionKeys, users: Arc<dyn UserStore>, timeout: Duration) -> Self {
        Self { keys, users, timeout }
    }

    /// Never fails: anything short of a valid token for an existing user
    /// is treated as anonymous.
    pub async fn resolve_optional(&self, token: Option<&str>) -> Option<User> {
        let token = token?;
        let claims = match self.keys.validate(token) {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "ignoring invalid session token");
                return None;
            }
        };
        match within(self.timeout, "user lookup", self.users.find_by_id(claims.user_id)).await {
            Ok(Ok(user)) => user,
            Ok(Err(e)) => {
                error!(error = %e, user_id = claims.user_id, "user lookup failed");
                None
            }
            Err(_) => None,
        }
    }

    /// Touches `last_login` on success.
    pub async fn resolve_required(&self, token: Option<&str>) -> Result<User, AuthError> {
        let token = token.ok_or(AuthError::MissingToken)?;
        let claims = self.keys.validate(token).map_err(|e| {
            warn!(error = %e, "rejected session token");
            AuthError::InvalidOrExpiredToken
        })?;

        let mut user = within(self.timeout, "user lookup", self.users.find_by_id(claims.user_id))
            .await?
            .map_err(AuthError::upstream)?
            .ok_or_else(|| {
                warn!(user_id = claims.user_id, "token names an unknown user");
                AuthError::UserNotFound
            })?;

        let at = within(self.timeout, "last_login update", self.users.touch_last_login(user.user_id))
            .await?
            .map_err(AuthError::upstream)?;
        user.last_login = Some(at);
        Ok(user)
    }
}
