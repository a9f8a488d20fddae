use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{
            CredentialsCheckResponse, LoginRequest, LogoutResponse, RegisterRequest,
            SessionResponse, VerifyResponse,
        },
        extractors::{CurrentUser, FormOrJson},
        services::{is_valid_email, AuthService},
    },
    error::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/logout", post(logout))
        .route("/verify", get(verify))
        .route("/test", post(test_credentials))
}

fn check_email(email: &str) -> Result<(), ApiError> {
    if is_valid_email(email.trim()) {
        Ok(())
    } else {
        warn!(email, "invalid email");
        Err(ApiError::bad_request("Invalid email"))
    }
}

#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn login(
    State(state): State<AppState>,
    FormOrJson(payload): FormOrJson<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    check_email(&payload.email)?;
    let auth = AuthService::from_ref(&state);
    Ok(Json(auth.login(&payload.email, &payload.password).await?))
}

#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn register(
    State(state): State<AppState>,
    FormOrJson(payload): FormOrJson<RegisterRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    check_email(&payload.email)?;
    let auth = AuthService::from_ref(&state);
    let session = auth
        .register(&payload.email, &payload.password, payload.username.as_deref())
        .await?;
    Ok(Json(session))
}

#[instrument(skip(state, user), fields(user_id = user.user_id))]
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Json<LogoutResponse> {
    Json(AuthService::from_ref(&state).logout(&user))
}

#[instrument(skip(state, user), fields(user_id = user.user_id))]
pub async fn verify(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Json<VerifyResponse> {
    Json(AuthService::from_ref(&state).verify(&user))
}

#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn test_credentials(
    State(state): State<AppState>,
    FormOrJson(payload): FormOrJson<LoginRequest>,
) -> Result<Json<CredentialsCheckResponse>, ApiError> {
    let auth = AuthService::from_ref(&state);
    Ok(Json(auth.check_credentials(&payload.email, &payload.password).await?))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::{
        app::build_app,
        auth::verifier::fake::FakeVerifier,
        state::AppState,
        users::memory::MemoryUserStore,
    };

    fn app(store: Arc<MemoryUserStore>) -> axum::Router {
        let state = AppState::fake(store, Arc::new(FakeVerifier::accepting("a@x.com", "secret")));
        build_app(state)
    }

    fn form(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(res: axum::response::Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn login_then_verify_then_logout() {
        let store = Arc::new(MemoryUserStore::new());
        let app = app(store.clone());

        let res = app
            .clone()
            .oneshot(form("/api/v1/auth/login", "email=a%40x.com&password=secret"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        assert_eq!(body["token_type"], "bearer");
        assert_eq!(body["expires_in"], 86_400);
        assert_eq!(body["user"]["username"], "a");
        assert_eq!(body["user"]["role"], "user");
        assert_eq!(body["message"], "Login successful");
        let token = body["access_token"].as_str().unwrap().to_string();

        let res = app
            .clone()
            .oneshot(
                Request::get("/api/v1/auth/verify")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        assert_eq!(body["valid"], true);
        assert_eq!(body["user"]["email"], "a@x.com");

        let res = app
            .oneshot(
                Request::post("/api/v1/auth/logout")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["user_id"], 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn login_accepts_json_body() {
        let res = app(Arc::new(MemoryUserStore::new()))
            .oneshot(
                Request::post("/api/v1/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"email":"a@x.com","password":"secret"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["user"]["email"], "a@x.com");
    }

    #[tokio::test]
    async fn bad_credentials_are_401_with_challenge() {
        let res = app(Arc::new(MemoryUserStore::new()))
            .oneshot(form("/api/v1/auth/login", "email=a%40x.com&password=nope"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(res.headers()[header::WWW_AUTHENTICATE], "Bearer");
        assert_eq!(json_body(res).await["detail"], "Invalid email or password");
    }

    #[tokio::test]
    async fn malformed_email_is_400() {
        let res = app(Arc::new(MemoryUserStore::new()))
            .oneshot(form("/api/v1/auth/login", "email=not-an-email&password=secret"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn verify_without_token_is_401() {
        let res = app(Arc::new(MemoryUserStore::new()))
            .oneshot(Request::get("/api/v1/auth/verify").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(res.headers()[header::WWW_AUTHENTICATE], "Bearer");
        assert_eq!(json_body(res).await["detail"], "Invalid or expired session");
    }

    #[tokio::test]
    async fn second_registration_is_400() {
        let store = Arc::new(MemoryUserStore::new());
        let app = app(store.clone());
        let body = "email=a%40x.com&password=secret&username=trailblazer";

        let res = app.clone().oneshot(form("/api/v1/auth/register", body)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["user"]["username"], "trailblazer");

        let res = app.oneshot(form("/api/v1/auth/register", body)).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(res).await["detail"], "User already registered");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn credential_check_endpoint() {
        let store = Arc::new(MemoryUserStore::new());
        let res = app(store.clone())
            .oneshot(form("/api/v1/auth/test", "email=a%40x.com&password=secret"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["valid"], true);
        assert_eq!(store.len(), 0);
    }
}
