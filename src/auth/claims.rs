use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Signed payload of a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,   // email
    pub user_id: i64,
    pub email: String,
    pub iat: i64,      // issued at (unix timestamp)
    pub exp: i64,      // expires at (unix timestamp)
}

/// What a valid token proves about its holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub user_id: i64,
    pub email: String,
    pub exp: i64,
}

impl SessionClaims {
    pub fn expires_at(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp(self.exp).ok()
    }
}

impl From<Claims> for SessionClaims {
    fn from(c: Claims) -> Self {
        Self {
            user_id: c.user_id,
            email: c.email,
            exp: c.exp,
        }
    }
}
