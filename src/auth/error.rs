use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Failures of the authentication and authorization core.
///
/// Token problems and vanished users share one client-facing message so a
/// caller cannot tell a bad token from a deleted account.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("user already registered")]
    AlreadyRegistered,
    #[error("no authentication token provided")]
    MissingToken,
    #[error("invalid or expired session token")]
    InvalidOrExpiredToken,
    #[error("user in token not found")]
    UserNotFound,
    #[error("{0}")]
    Forbidden(String),
    #[error("authentication service error")]
    UpstreamUnavailable(#[source] anyhow::Error),
}

impl AuthError {
    pub fn forbidden(msg: impl Into<String>) -> Self {
        AuthError::Forbidden(msg.into())
    }

    pub fn upstream(err: impl Into<anyhow::Error>) -> Self {
        AuthError::UpstreamUnavailable(err.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials
            | AuthError::MissingToken
            | AuthError::InvalidOrExpiredToken
            | AuthError::UserNotFound => StatusCode::UNAUTHORIZED,
            AuthError::AlreadyRegistered => StatusCode::BAD_REQUEST,
            AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
            AuthError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message sent to the client.
    pub fn detail(&self) -> String {
        match self {
            AuthError::InvalidCredentials => "Invalid email or password".into(),
            AuthError::AlreadyRegistered => "User already registered".into(),
            AuthError::MissingToken
            | AuthError::InvalidOrExpiredToken
            | AuthError::UserNotFound => "Invalid or expired session".into(),
            AuthError::Forbidden(msg) => msg.clone(),
            AuthError::UpstreamUnavailable(_) => "Authentication service error".into(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "detail": self.detail() }));
        if let AuthError::UpstreamUnavailable(ref source) = self {
            error!(error = ?source, "authentication backend failure");
        }
        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}
