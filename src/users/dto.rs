use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo_types::Role;
use crate::{audit::AuditEntry, trails::repo_types::TrailSummary};

#[derive(Debug, Serialize)]
pub struct ProfileStats {
    pub trails_created: i64,
    pub reviews_written: i64,
}

/// `GET /users/me`
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
    pub stats: ProfileStats,
    pub recent_activity: Vec<AuditEntry>,
}

#[derive(Debug, Serialize)]
pub struct PublicStats {
    pub public_trails: i64,
}

#[derive(Debug, Serialize)]
pub struct PrivateStats {
    pub total_trails: i64,
    pub private_trails: i64,
}

/// `GET /users/:id`; private fields only for the user themself or an admin.
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub user_id: i64,
    pub username: String,
    pub public_stats: PublicStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none", with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(skip_serializing_if = "Option::is_none", with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_stats: Option<PrivateStats>,
}

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub role: Option<String>,
    pub search: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Deserialize)]
pub struct RoleChangeRequest {
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RoleChangeResponse {
    pub message: String,
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct UserTrailsQuery {
    #[serde(default)]
    pub include_private: bool,
}

pub type UserTrails = Vec<TrailSummary>;

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn me_lists_recent_activity_newest_first() {
        let entry = |action: &str, at| AuditEntry {
            action: action.into(),
            action_date: at,
            details: Some(format!("{action} details")),
        };
        let me = MeResponse {
            user_id: 2,
            username: "hiker".into(),
            email: "hiker@x.com".into(),
            role: Role::User,
            last_login: None,
            stats: ProfileStats {
                trails_created: 1,
                reviews_written: 0,
            },
            recent_activity: vec![
                entry("UPDATE_TRAIL", datetime!(2024-05-02 08:00 UTC)),
                entry("CREATE_TRAIL", datetime!(2024-05-01 08:00 UTC)),
            ],
        };
        let json = serde_json::to_value(&me).unwrap();
        let activity = json["recent_activity"].as_array().unwrap();
        assert_eq!(activity.len(), 2);
        assert_eq!(activity[0]["action"], "UPDATE_TRAIL");
        assert_eq!(activity[0]["action_date"], "2024-05-02T08:00:00Z");
        assert_eq!(activity[1]["details"], "CREATE_TRAIL details");
    }
}
