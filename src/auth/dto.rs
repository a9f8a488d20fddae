use serde::{Deserialize, Serialize};

use crate::users::repo_types::{Role, User};

/// Login and credential-check body, form or JSON.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Registration body, form or JSON.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// Returned by login and registration.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: PublicUser,
    pub message: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicUser {
    pub user_id: i64,
    pub email: String,
    pub username: String,
    pub role: Role,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self {
            user_id: u.user_id,
            email: u.email.clone(),
            username: u.username.clone(),
            role: u.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: String,
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct CredentialsCheckResponse {
    pub valid: bool,
    pub message: String,
    pub email: String,
}
