use anyhow::Context;
use sqlx::{PgPool, Postgres, Transaction};

use super::{
    dto::{PointInput, TrailInput},
    repo_types::{Feature, ReviewSummary, Trail, TrailFilter, TrailPoint, TrailSummary},
};

const TRAIL_COLUMNS: &str = "t.trail_id, t.trail_name, t.location_id, t.difficulty, t.length, \
     t.elevation_gain, t.est_time_min, t.est_time_max, t.route_type, t.description, \
     t.user_id, t.is_public, t.created_at, t.updated_at";

const POINT_COLUMNS: &str =
    "point_id, trail_id, point_order, latitude, longitude, description, elevation, created_at";

// ---- Queries ----

/// Public trails plus the viewer's own.
pub async fn list_visible(
    db: &PgPool,
    viewer: Option<i64>,
    filter: &TrailFilter,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<TrailSummary>> {
    let rows = sqlx::query_as::<_, TrailSummary>(&format!(
        r#"
        SELECT {TRAIL_COLUMNS}, u.username, l.location_name
          FROM trails t
          LEFT JOIN users u ON u.user_id = t.user_id
          LEFT JOIN locations l ON l.location_id = t.location_id
         WHERE (t.is_public OR t.user_id = $1)
           AND ($2::text IS NULL OR t.difficulty = $2)
           AND ($3::float8 IS NULL OR t.length >= $3)
           AND ($4::float8 IS NULL OR t.length <= $4)
           AND ($5::bigint IS NULL OR t.location_id = $5)
         ORDER BY t.created_at DESC
         LIMIT $6 OFFSET $7
        "#
    ))
    .bind(viewer)
    .bind(filter.difficulty.map(|d| d.as_str()))
    .bind(filter.min_length)
    .bind(filter.max_length)
    .bind(filter.location_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list trails")?;
    Ok(rows)
}

pub async fn count_visible(db: &PgPool, viewer: Option<i64>, filter: &TrailFilter) -> anyhow::Result<i64> {
    let (n,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
          FROM trails t
         WHERE (t.is_public OR t.user_id = $1)
           AND ($2::text IS NULL OR t.difficulty = $2)
           AND ($3::float8 IS NULL OR t.length >= $3)
           AND ($4::float8 IS NULL OR t.length <= $4)
           AND ($5::bigint IS NULL OR t.location_id = $5)
        "#,
    )
    .bind(viewer)
    .bind(filter.difficulty.map(|d| d.as_str()))
    .bind(filter.min_length)
    .bind(filter.max_length)
    .bind(filter.location_id)
    .fetch_one(db)
    .await
    .context("count trails")?;
    Ok(n)
}

pub async fn list_by_owner(
    db: &PgPool,
    owner_id: i64,
    include_private: bool,
) -> anyhow::Result<Vec<TrailSummary>> {
    let rows = sqlx::query_as::<_, TrailSummary>(&format!(
        r#"
        SELECT {TRAIL_COLUMNS}, u.username, l.location_name
          FROM trails t
          LEFT JOIN users u ON u.user_id = t.user_id
          LEFT JOIN locations l ON l.location_id = t.location_id
         WHERE t.user_id = $1 AND ($2 OR t.is_public)
         ORDER BY t.created_at DESC
        "#
    ))
    .bind(owner_id)
    .bind(include_private)
    .fetch_all(db)
    .await
    .context("list trails by owner")?;
    Ok(rows)
}

pub async fn find_by_id(db: &PgPool, trail_id: i64) -> anyhow::Result<Option<TrailSummary>> {
    let row = sqlx::query_as::<_, TrailSummary>(&format!(
        r#"
        SELECT {TRAIL_COLUMNS}, u.username, l.location_name
          FROM trails t
          LEFT JOIN users u ON u.user_id = t.user_id
          LEFT JOIN locations l ON l.location_id = t.location_id
         WHERE t.trail_id = $1
        "#
    ))
    .bind(trail_id)
    .fetch_optional(db)
    .await
    .context("get trail")?;
    Ok(row)
}

pub async fn list_points(db: &PgPool, trail_id: i64) -> anyhow::Result<Vec<TrailPoint>> {
    let rows = sqlx::query_as::<_, TrailPoint>(&format!(
        "SELECT {POINT_COLUMNS} FROM trail_points WHERE trail_id = $1 ORDER BY point_order ASC"
    ))
    .bind(trail_id)
    .fetch_all(db)
    .await
    .context("list trail points")?;
    Ok(rows)
}

pub async fn list_features(db: &PgPool, trail_id: i64) -> anyhow::Result<Vec<Feature>> {
    let rows = sqlx::query_as::<_, Feature>(
        r#"
        SELECT f.feature_id, f.feature_name, f.description, f.icon_url
          FROM features f
          JOIN trail_features tf ON tf.feature_id = f.feature_id
         WHERE tf.trail_id = $1
         ORDER BY f.feature_name
        "#,
    )
    .bind(trail_id)
    .fetch_all(db)
    .await
    .context("list trail features")?;
    Ok(rows)
}

pub async fn review_summary(db: &PgPool, trail_id: i64) -> anyhow::Result<ReviewSummary> {
    let row = sqlx::query_as::<_, ReviewSummary>(
        r#"
        SELECT COUNT(*)                                  AS total_reviews,
               ROUND(AVG(rating)::numeric, 2)::float8    AS average_rating,
               COUNT(*) FILTER (WHERE rating = 5)        AS five_star,
               COUNT(*) FILTER (WHERE rating = 4)        AS four_star,
               COUNT(*) FILTER (WHERE rating = 3)        AS three_star,
               COUNT(*) FILTER (WHERE rating = 2)        AS two_star,
               COUNT(*) FILTER (WHERE rating = 1)        AS one_star
          FROM reviews
         WHERE trail_id = $1
        "#,
    )
    .bind(trail_id)
    .fetch_one(db)
    .await
    .context("review summary")?;
    Ok(row)
}

// ---- Writes ----

/// Fully validated values for a new trail row.
#[derive(Debug, Clone)]
pub struct NewTrail<'a> {
    pub trail_name: &'a str,
    pub location_id: Option<i64>,
    pub difficulty: &'a str,
    pub length: f64,
    pub elevation_gain: Option<i32>,
    pub est_time: (i32, i32),
    pub route_type: &'a str,
    pub description: Option<&'a str>,
    pub owner_id: i64,
    pub is_public: bool,
}

async fn insert_points_tx(
    tx: &mut Transaction<'_, Postgres>,
    trail_id: i64,
    points: &[PointInput],
) -> anyhow::Result<()> {
    for (i, p) in points.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO trail_points (trail_id, point_order, latitude, longitude, description, elevation)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(trail_id)
        .bind(i as i32 + 1)
        .bind(p.latitude)
        .bind(p.longitude)
        .bind(p.description.as_deref())
        .bind(p.elevation)
        .execute(&mut **tx)
        .await
        .context("insert trail point")?;
    }
    Ok(())
}

async fn link_features_tx(
    tx: &mut Transaction<'_, Postgres>,
    trail_id: i64,
    feature_ids: &[i64],
) -> anyhow::Result<()> {
    for id in feature_ids {
        sqlx::query(
            "INSERT INTO trail_features (trail_id, feature_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(trail_id)
        .bind(id)
        .execute(&mut **tx)
        .await
        .context("link trail feature")?;
    }
    Ok(())
}

/// Trail, its points and feature links go in together or not at all.
pub async fn create_with_children(
    db: &PgPool,
    trail: &NewTrail<'_>,
    points: &[PointInput],
    feature_ids: &[i64],
) -> anyhow::Result<Trail> {
    let mut tx = db.begin().await.context("begin tx")?;

    let row = sqlx::query_as::<_, Trail>(&format!(
        r#"
        INSERT INTO trails AS t (trail_name, location_id, difficulty, length, elevation_gain,
                                 est_time_min, est_time_max, route_type, description,
                                 user_id, is_public)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING {TRAIL_COLUMNS}
        "#
    ))
    .bind(trail.trail_name)
    .bind(trail.location_id)
    .bind(trail.difficulty)
    .bind(trail.length)
    .bind(trail.elevation_gain)
    .bind(trail.est_time.0)
    .bind(trail.est_time.1)
    .bind(trail.route_type)
    .bind(trail.description)
    .bind(trail.owner_id)
    .bind(trail.is_public)
    .fetch_one(&mut *tx)
    .await
    .context("insert trail")?;

    insert_points_tx(&mut tx, row.trail_id, points).await?;
    link_features_tx(&mut tx, row.trail_id, feature_ids).await?;

    tx.commit().await.context("commit tx")?;
    Ok(row)
}

/// Partial update; absent fields keep their stored value. Non-empty
/// `points` or `feature_ids` replace the existing set.
pub async fn update(
    db: &PgPool,
    trail_id: i64,
    input: &TrailInput,
    est_time: (Option<i32>, Option<i32>),
) -> anyhow::Result<Option<Trail>> {
    let mut tx = db.begin().await.context("begin tx")?;

    let row = sqlx::query_as::<_, Trail>(&format!(
        r#"
        UPDATE trails AS t SET
            trail_name     = COALESCE($2, t.trail_name),
            location_id    = COALESCE($3, t.location_id),
            difficulty     = COALESCE($4, t.difficulty),
            length         = COALESCE($5, t.length),
            elevation_gain = COALESCE($6, t.elevation_gain),
            route_type     = COALESCE($7, t.route_type),
            description    = COALESCE($8, t.description),
            is_public      = COALESCE($9, t.is_public),
            est_time_min   = COALESCE($10, t.est_time_min),
            est_time_max   = COALESCE($11, t.est_time_max),
            updated_at     = now()
        WHERE t.trail_id = $1
        RETURNING {TRAIL_COLUMNS}
        "#
    ))
    .bind(trail_id)
    .bind(input.trail_name.as_deref().map(str::trim))
    .bind(input.location_id)
    .bind(input.difficulty.as_deref())
    .bind(input.length)
    .bind(input.elevation_gain)
    .bind(input.route_type.as_deref())
    .bind(input.description.as_deref())
    .bind(input.is_public)
    .bind(est_time.0)
    .bind(est_time.1)
    .fetch_optional(&mut *tx)
    .await
    .context("update trail")?;

    let Some(row) = row else {
        return Ok(None);
    };

    if !input.points.is_empty() {
        sqlx::query("DELETE FROM trail_points WHERE trail_id = $1")
            .bind(trail_id)
            .execute(&mut *tx)
            .await
            .context("clear trail points")?;
        insert_points_tx(&mut tx, trail_id, &input.points).await?;
    }
    if !input.feature_ids.is_empty() {
        sqlx::query("DELETE FROM trail_features WHERE trail_id = $1")
            .bind(trail_id)
            .execute(&mut *tx)
            .await
            .context("clear trail features")?;
        link_features_tx(&mut tx, trail_id, &input.feature_ids).await?;
    }

    tx.commit().await.context("commit tx")?;
    Ok(Some(row))
}

/// Points, feature links and reviews go with the trail (ON DELETE CASCADE).
pub async fn delete(db: &PgPool, trail_id: i64) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM trails WHERE trail_id = $1")
        .bind(trail_id)
        .execute(db)
        .await
        .context("delete trail")?;
    Ok(res.rows_affected() > 0)
}

/// Appends after the current last point.
pub async fn insert_point_next(
    db: &PgPool,
    trail_id: i64,
    latitude: f64,
    longitude: f64,
    description: Option<&str>,
    elevation: Option<f64>,
) -> anyhow::Result<TrailPoint> {
    let row = sqlx::query_as::<_, TrailPoint>(&format!(
        r#"
        INSERT INTO trail_points (trail_id, point_order, latitude, longitude, description, elevation)
        SELECT $1, COALESCE(MAX(point_order), 0) + 1, $2, $3, $4, $5
          FROM trail_points
         WHERE trail_id = $1
        RETURNING {POINT_COLUMNS}
        "#
    ))
    .bind(trail_id)
    .bind(latitude)
    .bind(longitude)
    .bind(description)
    .bind(elevation)
    .fetch_one(db)
    .await
    .context("append trail point")?;
    Ok(row)
}
