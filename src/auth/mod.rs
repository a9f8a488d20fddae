use crate::state::AppState;
use axum::Router;

mod claims;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod policy;
pub mod resolver;
pub mod services;
pub mod verifier;

pub fn router() -> Router<AppState> {
    Router::new().nest("/auth", handlers::auth_routes())
}
