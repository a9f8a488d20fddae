use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
    Moderator,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::User, Role::Moderator];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
            Role::Moderator => "moderator",
        }
    }

    /// Case-insensitive, ignores surrounding whitespace.
    pub fn parse(s: &str) -> Option<Role> {
        let wanted = s.trim().to_lowercase();
        Role::ALL.into_iter().find(|r| r.as_str() == wanted)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(s).ok_or_else(|| anyhow::anyhow!("unknown role {s:?}"))
    }
}

/// Raw `users` row as stored.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
    pub created_at: OffsetDateTime,
    pub last_login: Option<OffsetDateTime>,
}

/// Application user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            role: r.role.parse()?,
            user_id: r.user_id,
            username: r.username,
            email: r.email,
            created_at: r.created_at,
            last_login: r.last_login,
        })
    }
}

/// Filters for the admin user listing.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse_is_lenient_on_case_and_space() {
        assert_eq!(Role::parse(" Admin "), Some(Role::Admin));
        assert_eq!(Role::parse("MODERATOR"), Some(Role::Moderator));
        assert_eq!(Role::parse("user"), Some(Role::User));
        assert_eq!(Role::parse("superuser"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn row_with_unknown_role_is_rejected() {
        let row = UserRow {
            user_id: 1,
            username: "a".into(),
            email: "a@x.com".into(),
            role: "root".into(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            last_login: None,
        };
        assert!(User::try_from(row).is_err());
    }

    #[test]
    fn row_maps_into_user() {
        let row = UserRow {
            user_id: 3,
            username: "b".into(),
            email: "b@x.com".into(),
            role: "Moderator".into(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            last_login: None,
        };
        let user = User::try_from(row).unwrap();
        assert_eq!(user.role, Role::Moderator);
        assert!(!user.is_admin());
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["role"], "moderator");
    }
}
