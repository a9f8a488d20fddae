use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{
        MeResponse, PrivateStats, ProfileStats, PublicStats, RoleChangeRequest,
        RoleChangeResponse, UserListQuery, UserProfile, UserTrails, UserTrailsQuery,
    },
    repo::{count_reviews, count_trails},
    repo_types::{Role, User, UserFilter},
    services::change_role,
};
use crate::{
    audit,
    auth::{
        error::AuthError,
        extractors::{CurrentUser, MaybeUser},
        policy::ensure_role,
    },
    error::ApiError,
    state::AppState,
    trails::repo::list_by_owner,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/me", get(me))
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user))
        .route("/users/:id/role", put(update_role))
        .route("/users/:id/trails", get(user_trails))
}

#[instrument(skip(state, user), fields(user_id = user.user_id))]
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<MeResponse>, ApiError> {
    let trails_created = count_trails(&state.db, user.user_id, false).await?;
    let reviews_written = count_reviews(&state.db, user.user_id).await?;
    let recent_activity = audit::recent_activity(&state.db, user.user_id).await?;
    Ok(Json(MeResponse {
        user_id: user.user_id,
        username: user.username,
        email: user.email,
        role: user.role,
        last_login: user.last_login,
        stats: ProfileStats {
            trails_created,
            reviews_written,
        },
        recent_activity,
    }))
}

#[instrument(skip(state, user, q), fields(user_id = user.user_id))]
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(q): Query<UserListQuery>,
) -> Result<Json<Vec<User>>, ApiError> {
    ensure_role(&user, "admin")?;
    if !(1..=100).contains(&q.limit) || q.offset < 0 {
        return Err(ApiError::bad_request("limit must be between 1 and 100"));
    }
    let role = match q.role.as_deref() {
        Some(r) => Some(Role::parse(r).ok_or_else(|| ApiError::bad_request("Invalid role"))?),
        None => None,
    };
    let filter = UserFilter {
        role,
        search: q.search.filter(|s| !s.trim().is_empty()),
        limit: q.limit,
        offset: q.offset,
    };
    let users = state.users.list(&filter).await.map_err(AuthError::upstream)?;
    Ok(Json(users))
}

#[instrument(skip(state, requester))]
pub async fn get_user(
    State(state): State<AppState>,
    MaybeUser(requester): MaybeUser,
    Path(user_id): Path<i64>,
) -> Result<Json<UserProfile>, ApiError> {
    let target = state
        .users
        .find_by_id(user_id)
        .await
        .map_err(AuthError::upstream)?
        .ok_or_else(|| ApiError::not_found(format!("User with ID {user_id} not found")))?;

    let public_trails = count_trails(&state.db, user_id, true).await?;
    let mut profile = UserProfile {
        user_id: target.user_id,
        username: target.username.clone(),
        public_stats: PublicStats { public_trails },
        email: None,
        role: None,
        created_at: None,
        last_login: None,
        private_stats: None,
    };

    if sees_private(requester.as_ref(), user_id) {
        let total_trails = count_trails(&state.db, user_id, false).await?;
        profile.email = Some(target.email);
        profile.role = Some(target.role);
        profile.created_at = Some(target.created_at);
        profile.last_login = target.last_login;
        profile.private_stats = Some(PrivateStats {
            total_trails,
            private_trails: total_trails - public_trails,
        });
    }
    Ok(Json(profile))
}

#[instrument(skip(state, actor, body), fields(actor = actor.user_id))]
pub async fn update_role(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(user_id): Path<i64>,
    Json(body): Json<RoleChangeRequest>,
) -> Result<Json<RoleChangeResponse>, ApiError> {
    let change = change_role(state.users.as_ref(), &actor, user_id, body.role.as_deref()).await?;

    audit::record(
        &state.db,
        None,
        actor.user_id,
        "UPDATE_USER_ROLE",
        &format!(
            "Changed user {} role from {} to {}",
            change.user_id, change.from, change.to
        ),
    )
    .await;

    Ok(Json(RoleChangeResponse {
        message: format!("User role updated to {}", change.to),
        user_id: change.user_id,
    }))
}

/// The user themself or an admin.
fn sees_private(requester: Option<&User>, user_id: i64) -> bool {
    requester.is_some_and(|r| r.user_id == user_id || r.is_admin())
}

/// Private trails are added only when asked for by the owner or an admin;
/// anyone else gets the public ones.
#[instrument(skip(state, requester, q))]
pub async fn user_trails(
    State(state): State<AppState>,
    MaybeUser(requester): MaybeUser,
    Path(user_id): Path<i64>,
    Query(q): Query<UserTrailsQuery>,
) -> Result<Json<UserTrails>, ApiError> {
    state
        .users
        .find_by_id(user_id)
        .await
        .map_err(AuthError::upstream)?
        .ok_or_else(|| ApiError::not_found(format!("User with ID {user_id} not found")))?;

    let include_private = q.include_private && sees_private(requester.as_ref(), user_id);
    let trails = list_by_owner(&state.db, user_id, include_private).await?;
    Ok(Json(trails))
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

    use super::sees_private;
    use crate::{
        app::build_app,
        auth::verifier::fake::FakeVerifier,
        state::AppState,
        users::{
            memory::{user, MemoryUserStore},
            repo_types::Role,
        },
    };

    fn setup() -> (Arc<MemoryUserStore>, AppState) {
        let store = Arc::new(MemoryUserStore::with_users(vec![
            user(1, "admin@x.com", Role::Admin),
            user(2, "hiker@x.com", Role::User),
        ]));
        let state = AppState::fake(store.clone(), Arc::new(FakeVerifier::default()));
        (store, state)
    }

    fn put_role(uri: &str, token: &str, role: &str) -> Request<Body> {
        Request::put(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(format!(r#"{{"role":"{role}"}}"#)))
            .unwrap()
    }

    async fn detail(res: axum::response::Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice::<Value>(&bytes).unwrap()["detail"].clone()
    }

    #[tokio::test]
    async fn non_admin_cannot_change_roles() {
        let (store, state) = setup();
        let token = state.keys.issue("hiker@x.com", 2).unwrap();
        let res = build_app(state)
            .oneshot(put_role("/api/v1/users/1/role", &token, "user"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert_eq!(detail(res).await, "Requires admin role");
        assert_eq!(store.get(1).unwrap().role, Role::Admin);
    }

    #[tokio::test]
    async fn admin_cannot_change_own_role() {
        let (store, state) = setup();
        let token = state.keys.issue("admin@x.com", 1).unwrap();
        let res = build_app(state)
            .oneshot(put_role("/api/v1/users/1/role", &token, "user"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(detail(res).await, "Cannot change your own role");
        assert_eq!(store.get(1).unwrap().role, Role::Admin);
    }

    #[tokio::test]
    async fn listing_users_is_admin_only() {
        let (_, state) = setup();
        let hiker = state.keys.issue("hiker@x.com", 2).unwrap();
        let admin = state.keys.issue("admin@x.com", 1).unwrap();
        let app = build_app(state);

        let get = |token: &str| {
            Request::get("/api/v1/users?role=user")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap()
        };

        let res = app.clone().oneshot(get(&hiker)).await.unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let res = app.oneshot(get(&admin)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let users: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(users.as_array().unwrap().len(), 1);
        assert_eq!(users[0]["email"], "hiker@x.com");
    }

    #[tokio::test]
    async fn trails_of_unknown_user_are_not_found() {
        let (_, state) = setup();
        let res = build_app(state)
            .oneshot(
                Request::get("/api/v1/users/99/trails?include_private=true")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(detail(res).await, "User with ID 99 not found");
    }

    #[test]
    fn private_trails_need_owner_or_admin() {
        let admin = user(1, "admin@x.com", Role::Admin);
        let hiker = user(2, "hiker@x.com", Role::User);
        assert!(sees_private(Some(&hiker), 2));
        assert!(sees_private(Some(&admin), 2));
        assert!(!sees_private(Some(&hiker), 1));
        assert!(!sees_private(None, 2));
    }
}
