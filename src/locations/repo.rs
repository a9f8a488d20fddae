use anyhow::Context;
use sqlx::PgPool;

use super::repo_types::{City, Country, Location, LocationFilter};

const LOCATION_SELECT: &str = r#"
    SELECT l.location_id, l.location_name, l.coordinates, l.city_id, l.country_id,
           c.city_name, co.country_name
      FROM locations l
      LEFT JOIN cities c ON c.city_id = l.city_id
      LEFT JOIN countries co ON co.country_id = l.country_id
"#;

/// `ILIKE` pattern for a name filter; blank names match everything.
pub fn name_pattern(name: Option<&str>) -> Option<String> {
    name.map(str::trim)
        .filter(|n| !n.is_empty())
        .map(|n| format!("%{n}%"))
}

pub async fn list(
    db: &PgPool,
    filter: &LocationFilter,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<Location>> {
    let pattern = name_pattern(filter.name.as_deref());
    let rows = sqlx::query_as::<_, Location>(&format!(
        r#"
        {LOCATION_SELECT}
         WHERE ($1::bigint IS NULL OR l.city_id = $1)
           AND ($2::bigint IS NULL OR l.country_id = $2)
           AND ($3::text IS NULL OR l.location_name ILIKE $3)
         ORDER BY l.location_name
         LIMIT $4 OFFSET $5
        "#
    ))
    .bind(filter.city_id)
    .bind(filter.country_id)
    .bind(pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list locations")?;
    Ok(rows)
}

pub async fn find_by_id(db: &PgPool, location_id: i64) -> anyhow::Result<Option<Location>> {
    let row = sqlx::query_as::<_, Location>(&format!("{LOCATION_SELECT} WHERE l.location_id = $1"))
        .bind(location_id)
        .fetch_optional(db)
        .await
        .context("get location")?;
    Ok(row)
}

pub async fn city_exists(db: &PgPool, city_id: i64) -> anyhow::Result<bool> {
    let (found,): (bool,) =
        sqlx::query_as("SELECT EXISTS (SELECT 1 FROM cities WHERE city_id = $1)")
            .bind(city_id)
            .fetch_one(db)
            .await
            .context("check city")?;
    Ok(found)
}

pub async fn country_exists(db: &PgPool, country_id: i64) -> anyhow::Result<bool> {
    let (found,): (bool,) =
        sqlx::query_as("SELECT EXISTS (SELECT 1 FROM countries WHERE country_id = $1)")
            .bind(country_id)
            .fetch_one(db)
            .await
            .context("check country")?;
    Ok(found)
}

pub async fn list_countries(db: &PgPool, name: Option<&str>) -> anyhow::Result<Vec<Country>> {
    let rows = sqlx::query_as::<_, Country>(
        r#"
        SELECT country_id, country_name
          FROM countries
         WHERE ($1::text IS NULL OR country_name ILIKE $1)
         ORDER BY country_name
        "#,
    )
    .bind(name_pattern(name))
    .fetch_all(db)
    .await
    .context("list countries")?;
    Ok(rows)
}

pub async fn list_cities(
    db: &PgPool,
    country_id: i64,
    name: Option<&str>,
) -> anyhow::Result<Vec<City>> {
    let rows = sqlx::query_as::<_, City>(
        r#"
        SELECT city_id, city_name, country_id
          FROM cities
         WHERE country_id = $1
           AND ($2::text IS NULL OR city_name ILIKE $2)
         ORDER BY city_name
        "#,
    )
    .bind(country_id)
    .bind(name_pattern(name))
    .fetch_all(db)
    .await
    .context("list cities")?;
    Ok(rows)
}

/// Returns `None` when the name is already taken.
pub async fn create(
    db: &PgPool,
    name: &str,
    city_id: Option<i64>,
    country_id: Option<i64>,
    coordinates: Option<&str>,
) -> anyhow::Result<Option<i64>> {
    let res = sqlx::query_as::<_, (i64,)>(
        r#"
        INSERT INTO locations (location_name, city_id, country_id, coordinates)
        VALUES ($1, $2, $3, $4)
        RETURNING location_id
        "#,
    )
    .bind(name)
    .bind(city_id)
    .bind(country_id)
    .bind(coordinates)
    .fetch_one(db)
    .await;

    match res {
        Ok((id,)) => Ok(Some(id)),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(None),
        Err(e) => Err(e).context("insert location"),
    }
}
