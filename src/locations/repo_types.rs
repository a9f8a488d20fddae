use serde::Serialize;
use sqlx::FromRow;

/// Location joined with its city and country names.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Location {
    pub location_id: i64,
    pub location_name: String,
    pub coordinates: Option<String>,
    pub city_id: Option<i64>,
    pub country_id: Option<i64>,
    pub city_name: Option<String>,
    pub country_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Country {
    pub country_id: i64,
    pub country_name: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct City {
    pub city_id: i64,
    pub city_name: String,
    pub country_id: i64,
}

#[derive(Debug, Clone, Default)]
pub struct LocationFilter {
    pub city_id: Option<i64>,
    pub country_id: Option<i64>,
    pub name: Option<String>,
}
