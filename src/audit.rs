use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use tracing::warn;

const MAX_DETAILS: usize = 500;
const RECENT_ACTIVITY_LIMIT: i64 = 10;

/// One `trail_log` row as shown to its author.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AuditEntry {
    pub action: String,
    #[serde(with = "time::serde::rfc3339")]
    pub action_date: OffsetDateTime,
    pub details: Option<String>,
}

fn truncate(details: &str) -> &str {
    match details.char_indices().nth(MAX_DETAILS) {
        Some((idx, _)) => &details[..idx],
        None => details,
    }
}

async fn insert(
    db: &PgPool,
    trail_id: Option<i64>,
    user_id: i64,
    action: &str,
    details: &str,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO trail_log (trail_id, user_id, action, details)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(trail_id)
    .bind(user_id)
    .bind(action)
    .bind(truncate(details))
    .execute(db)
    .await
    .context("insert trail_log")?;
    Ok(())
}

/// Best-effort audit entry; failures are logged, never returned.
pub async fn record(db: &PgPool, trail_id: Option<i64>, user_id: i64, action: &str, details: &str) {
    if let Err(e) = insert(db, trail_id, user_id, action, details).await {
        warn!(error = %e, action, user_id, "audit log write failed");
    }
}

/// Newest entries first.
pub async fn recent_activity(db: &PgPool, user_id: i64) -> anyhow::Result<Vec<AuditEntry>> {
    let rows = sqlx::query_as::<_, AuditEntry>(
        r#"
        SELECT action, action_date, details
          FROM trail_log
         WHERE user_id = $1
         ORDER BY action_date DESC, log_id DESC
         LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(RECENT_ACTIVITY_LIMIT)
    .fetch_all(db)
    .await
    .context("read trail_log")?;
    Ok(rows)
}
