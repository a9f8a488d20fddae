use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use time::OffsetDateTime;

use super::repo_types::{Role, User, UserFilter, UserRow};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("user store: {0:#}")]
    Backend(#[source] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateEmail,
            _ => StoreError::Backend(e.into()),
        }
    }
}

impl From<anyhow::Error> for StoreError {
    fn from(e: anyhow::Error) -> Self {
        StoreError::Backend(e)
    }
}

/// Local user records, keyed by id and by email.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, user_id: i64) -> Result<Option<User>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn create(&self, email: &str, username: &str, role: Role) -> Result<User, StoreError>;
    /// Sets `last_login` to now and returns the stored value.
    async fn touch_last_login(&self, user_id: i64) -> Result<OffsetDateTime, StoreError>;
    async fn set_role(&self, user_id: i64, role: Role) -> Result<(), StoreError>;
    async fn list(&self, filter: &UserFilter) -> Result<Vec<User>, StoreError>;
}

const USER_COLUMNS: &str = "user_id, username, email, role, created_at, last_login";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn into_user(row: UserRow) -> Result<User, StoreError> {
    Ok(User::try_from(row).context("decode users row")?)
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, user_id: i64) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        row.map(into_user).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        row.map(into_user).transpose()
    }

    async fn create(&self, email: &str, username: &str, role: Role) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (username, email, role, last_login)
            VALUES ($1, $2, $3, now())
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(username)
        .bind(email)
        .bind(role.as_str())
        .fetch_one(&self.db)
        .await?;
        into_user(row)
    }

    async fn touch_last_login(&self, user_id: i64) -> Result<OffsetDateTime, StoreError> {
        let (at,): (OffsetDateTime,) = sqlx::query_as(
            "UPDATE users SET last_login = now() WHERE user_id = $1 RETURNING last_login",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;
        Ok(at)
    }

    async fn set_role(&self, user_id: i64, role: Role) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET role = $1 WHERE user_id = $2")
            .bind(role.as_str())
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn list(&self, filter: &UserFilter) -> Result<Vec<User>, StoreError> {
        let pattern = filter.search.as_ref().map(|s| format!("%{s}%"));
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE ($1::text IS NULL OR role = $1)
              AND ($2::text IS NULL OR username ILIKE $2 OR email ILIKE $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(filter.role.map(Role::as_str))
        .bind(pattern)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(into_user).collect()
    }
}

// ---- Profile stats ----

pub async fn count_trails(db: &PgPool, user_id: i64, public_only: bool) -> anyhow::Result<i64> {
    let (n,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM trails WHERE user_id = $1 AND (NOT $2 OR is_public)",
    )
    .bind(user_id)
    .bind(public_only)
    .fetch_one(db)
    .await
    .context("count trails by user")?;
    Ok(n)
}

pub async fn count_reviews(db: &PgPool, user_id: i64) -> anyhow::Result<i64> {
    let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM reviews WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(db)
        .await
        .context("count reviews by user")?;
    Ok(n)
}
